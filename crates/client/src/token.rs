//! Bearer token persistence.
//!
//! The token is a single opaque string under one well-known key. The store
//! is deliberately a trait so a browser shell can back it with local
//! storage while tests and native hosts use [`MemoryTokenStore`]. Change
//! notifications let other holders of the store resync their in-memory auth
//! state when the token changes underneath them (the cross-tab storage
//! event analog).

use tokio::sync::watch;

/// Well-known persistence key for storage-backed implementations.
pub const TOKEN_STORAGE_KEY: &str = "jewelai_token";

/// Persists the opaque bearer token.
pub trait TokenStore: Send + Sync {
    /// Current token, if any.
    fn get(&self) -> Option<String>;

    /// Persist a new token, replacing any previous one.
    fn set(&self, token: &str);

    /// Remove the token. Called on explicit logout and on any 401/403.
    fn clear(&self);

    /// Receiver that yields the token value after every change.
    fn subscribe(&self) -> watch::Receiver<Option<String>>;
}

/// In-memory token store backed by a [`watch`] channel.
///
/// The channel doubles as the storage cell, so every mutation is observable
/// through [`TokenStore::subscribe`] without extra bookkeeping.
pub struct MemoryTokenStore {
    cell: watch::Sender<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        let (cell, _) = watch::channel(None);
        Self { cell }
    }
}

impl Default for MemoryTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<String> {
        self.cell.borrow().clone()
    }

    fn set(&self, token: &str) {
        self.cell.send_replace(Some(token.to_string()));
    }

    fn clear(&self) {
        self.cell.send_replace(None);
    }

    fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.cell.subscribe()
    }
}
