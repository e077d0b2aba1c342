//! Typed HTTP client for the JewelAI design workflow API.
//!
//! Layers, bottom up: a [`token::TokenStore`] persisting the opaque bearer
//! token, a [`session::Session`] wrapping the store with display-name
//! derivation and logout signalling, and the [`api::DesignApi`] request
//! wrapper that attaches the token, classifies HTTP failures, and
//! invalidates the session on auth failures.

pub mod api;
pub mod error;
pub mod session;
pub mod token;

pub use api::DesignApi;
pub use error::{ApiError, ApiResult};
pub use session::{Session, SessionState};
pub use token::{MemoryTokenStore, TokenStore, TOKEN_STORAGE_KEY};
