//! Error types for the HITL agent
//!
//! One error enum covers the library. External-service failures, malformed
//! internal state and persistence conflicts are kept apart so the HTTP entry
//! point can map each to the right status code.

use thiserror::Error;

/// Result type for HITL agent operations
pub type Result<T> = std::result::Result<T, Error>;

/// HITL agent error types
#[derive(Debug, Error)]
pub enum Error {
    /// The language model service failed or returned something unusable
    #[error("LLM error: {0}")]
    Llm(String),

    /// A tool could not be registered or executed
    #[error("Tool error: {0}")]
    Tool(String),

    /// The scraping service failed
    #[error("Scrape error: {0}")]
    Scrape(String),

    /// The human-review service failed
    #[error("Review service error: {0}")]
    Review(String),

    /// Transport-level failure of an outbound HTTP call
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The thread store failed
    #[error("Store error: {0}")]
    Store(String),

    /// Optimistic concurrency check failed while committing a checkpoint
    #[error("Version conflict on thread {thread_id}: expected {expected:?}, found {actual:?}")]
    VersionConflict {
        /// Thread whose checkpoint was being committed
        thread_id: String,
        /// Version the writer loaded (`None` when it expected a new thread)
        expected: Option<u64>,
        /// Version currently stored (`None` when the thread does not exist)
        actual: Option<u64>,
    },

    /// Thread not found
    #[error("Thread not found: {0}")]
    NotFound(String),

    /// Workflow state does not satisfy a step's preconditions
    #[error("Contract violation: {0}")]
    Contract(String),

    /// A run kept going without suspending or terminating
    #[error("Step limit of {0} exceeded without reaching a suspension point or the end")]
    StepLimitExceeded(usize),

    /// Inbound request could not be interpreted
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error originates from a collaborator outside this process
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            Error::Llm(_) | Error::Scrape(_) | Error::Review(_) | Error::Http(_)
        )
    }

    /// Build a contract violation error
    pub fn contract(msg: impl Into<String>) -> Self {
        Error::Contract(msg.into())
    }
}
