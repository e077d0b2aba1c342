//! Domain model for the JewelAI design workflow client.
//!
//! Pure types and logic shared by the API client and the view-state
//! layer: the server-owned status pipeline, the quiz question/answer
//! normalizer, and presentation-time formatting helpers. Nothing in this
//! crate performs I/O.

pub mod process;
pub mod quiz;
pub mod timefmt;
pub mod types;
