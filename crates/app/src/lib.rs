//! Client-side view state for the JewelAI frontend shell.
//!
//! Three pieces keep a view consistent with the server-owned state
//! machine: a shared keyed [`cache::ProcessCache`], the
//! [`poller::StatusPoller`] that watches long-running generation jobs, and
//! the [`selection::Selection`] logic that keeps the selected process id
//! consistent with the URL parameter and the list actually known to exist.

pub mod cache;
pub mod poller;
pub mod selection;

pub use cache::ProcessCache;
pub use poller::{PollerConfig, PollerEvent, PollerHandle, PollerPhase, StatusPoller};
pub use selection::{Selection, UrlEffect};
