#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![deny(rustdoc::missing_crate_level_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::invalid_codeblock_attributes)]
#![deny(rustdoc::invalid_html_tags)]
#![deny(rustdoc::bare_urls)]
#![deny(clippy::missing_panics_doc)]

//! hitl-agent runs agentic workflows that chain language-model calls, tool
//! invocations and a human approval step.
//!
//! The sales-outreach workflow researches a new lead, drafts an email and
//! suspends until a reviewer approves, edits, retries or aborts it. Threads
//! are checkpointed after every invocation, so the decision can arrive in a
//! later request, or a later process, and the thread resumes exactly where it
//! stopped. The blog-post pipeline writes and illustrates a post and hands it
//! to a reviewer.
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use hitl_agent::config::get_settings;
//! use hitl_agent::workflow::{ResumeSignal, ReviewDecision};
//! use hitl_agent::wiring::build_lead_workflow;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = get_settings(None)?;
//!     let workflow = build_lead_workflow(&settings)?;
//!
//!     // Runs until the draft is ready for review
//!     let outcome = workflow.start("thread-1", "jane@initech.com").await?;
//!     println!("suspended: {}", outcome.is_suspended());
//!
//!     // Later, when the reviewer approves an edited draft
//!     let outcome = workflow
//!         .resume("thread-1", ResumeSignal::new(ReviewDecision::approve("Hi Jane...")))
//!         .await?;
//!     println!("sent: {:?}", outcome.checkpoint().state.email_to_send);
//!
//!     Ok(())
//! }
//! ```

/// Configuration management
pub mod config;

/// Error types for the agent
pub mod error;

/// LLM integrations
pub mod llm;

/// Human review service integration
pub mod review;

/// HTTP entry point
pub mod server;

/// Thread checkpoint persistence
pub mod store;

/// Logging and metrics
pub mod telemetry;

/// Tools the agents can call
pub mod tools;

/// Workflow engine and pipelines
pub mod workflow;

/// Service construction from settings
pub mod wiring;

// Re-export error types
pub use error::{Error, Result};

/// Re-export telemetry types and functions for easier access
pub use telemetry::{add_metric, init_telemetry, TelemetryConfig};

/// Re-export LLM types for easier access
pub use llm::{Completion, CompletionRequest, LlmClient, LlmConfig, Message, MessageRole};

// Re-export workflow types
pub use workflow::{
    BlogPipeline, Checkpoint, Decision, LeadWorkflow, ResumeSignal, ReviewDecision, RunOutcome,
};
