//! Explicitly-scoped authentication context.
//!
//! [`Session`] owns the token store handle and the derived display name.
//! It is passed to the components that need it rather than living in an
//! ambient global; clone the handle freely, state lives behind a shared
//! [`watch`] channel.
//!
//! The display name is derived from the bearer token's JWT claims with
//! signature validation disabled -- the client only reads the payload for
//! presentation, the server remains the authority on the token itself.

use std::sync::Arc;

use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::watch;

use crate::token::TokenStore;

/// Snapshot of the authentication state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub token: Option<String>,
    pub display_name: Option<String>,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

/// Claims we read from the token payload, all optional.
#[derive(Debug, Deserialize, Default)]
struct TokenClaims {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    preferred_username: Option<String>,
}

/// Shared authentication context.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn TokenStore>,
    state: Arc<watch::Sender<SessionState>>,
}

impl Session {
    /// Wrap a token store, hydrating the initial state from it.
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        let token = store.get();
        let display_name = token.as_deref().and_then(|t| derive_display_name(t, None));
        let (state, _) = watch::channel(SessionState {
            token,
            display_name,
        });
        Self {
            store,
            state: Arc::new(state),
        }
    }

    /// Persist a token and derive the display name from its claims.
    ///
    /// `fallback_name` (typically the email entered on the login form) is
    /// used when the token carries no usable name claim.
    pub fn save_token(&self, token: &str, fallback_name: Option<&str>) {
        self.store.set(token);
        let display_name = derive_display_name(token, fallback_name);
        self.state.send_replace(SessionState {
            token: Some(token.to_string()),
            display_name,
        });
    }

    /// Clear the token and reset the state. Used for explicit logout and
    /// for forced invalidation on a 401/403 response.
    pub fn invalidate(&self) {
        self.store.clear();
        self.state.send_replace(SessionState::default());
    }

    /// Current bearer token, re-read from the store so out-of-band store
    /// changes are picked up.
    pub fn token(&self) -> Option<String> {
        self.store.get()
    }

    pub fn display_name(&self) -> Option<String> {
        self.state.borrow().display_name.clone()
    }

    /// Receiver that yields the session state after every change. A
    /// transition to an unauthenticated state is the redirect-to-login
    /// signal.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}

/// Best-effort display name from a JWT payload.
///
/// Priority: token `name`, then a non-email fallback, then token `email`,
/// `sub`, `preferred_username`, and finally the fallback as-is. Decode
/// failures degrade to the fallback; this never errors.
fn derive_display_name(token: &str, fallback: Option<&str>) -> Option<String> {
    let fallback_owned = fallback.map(str::to_owned);
    let claims = match decode_claims(token) {
        Some(claims) => claims,
        None => return fallback_owned,
    };

    let non_email_fallback = fallback.filter(|f| !f.contains('@')).map(str::to_owned);

    claims
        .name
        .or(non_email_fallback)
        .or(claims.email)
        .or(claims.sub)
        .or(claims.preferred_username)
        .or(fallback_owned)
}

/// Decode the token payload without verifying the signature.
fn decode_claims(token: &str) -> Option<TokenClaims> {
    let header = decode_header(token).ok()?;
    let mut validation = Validation::new(header.alg);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .ok()
        .map(|data| data.claims)
}
