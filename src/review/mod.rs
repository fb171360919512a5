//! Human review routing.
//!
//! Generated content is handed to an external review service, which returns a
//! shareable link right away and later reports the reviewer's decision through
//! the HTTP entry point.

mod client;
mod types;

// Re-export key components
pub use client::GotoHumanClient;
pub use types::{ReviewLink, ReviewRequest, ReviewService};
