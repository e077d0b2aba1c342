//! Reverse proxy in front of the JewelAI backend.
//!
//! Forwards `/api/**` and `/generated/**` to the configured backend
//! origin, preserving method, query, headers, and body. The upstream
//! timeout is long (10 minutes by default) to accommodate slow generation
//! jobs; connection failures surface as 502 and timeouts as 504.
//!
//! Exposed as a library so integration tests build the same router the
//! binary serves.

pub mod config;
pub mod forward;
pub mod router;

pub use config::ProxyConfig;
pub use router::build_router;
