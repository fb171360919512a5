//! Workflow engine for the agent pipelines.
//!
//! The lead workflow is a directed graph of named steps:
//!
//! ```text
//! extract_domain -> agent <-> tools
//!                     |
//!                 ask_human --retry--> agent
//!                     |  \--approve--> send_email -> end
//!                     \----abort-----> end
//! ```
//!
//! Its state is checkpointed per thread with an explicit continuation, so a
//! thread suspended at `ask_human` can be resumed by a later process once the
//! reviewer's decision arrives. The blog pipeline reuses the agent step in a
//! plain loop and keeps nothing.

/// The model step shared by both pipelines
pub mod agent;
/// Blog-post pipeline
pub mod blog;
/// Delivery of approved emails
pub mod email;
/// Lead workflow engine
pub mod engine;
/// Review decisions and resume signals
pub mod signal;
/// Thread state and checkpoints
pub mod state;
/// Step names and pure step logic
pub mod step;

// Re-export key components
pub use agent::AgentStep;
pub use blog::{BlogOutcome, BlogPipeline};
pub use email::{EmailSender, LogEmailSender};
pub use engine::{EngineConfig, LeadWorkflow, RunOutcome};
pub use signal::{Decision, ResumeSignal, ReviewDecision};
pub use state::{Checkpoint, LeadState, SuspensionPoint, ThreadStatus};
pub use step::{extract_domain, lead_website_url, Step, Transition};
