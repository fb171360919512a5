use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A reviewer's verdict on a draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Revise the draft with the reviewer's comment
    Retry,
    /// Send the (possibly edited) draft
    Approve,
    /// Stop the thread without sending
    Abort,
}

impl Decision {
    /// Interpret a decision value from a review callback.
    ///
    /// Only the exact values `retry` and `approve` are recognized. Anything
    /// else, including no value at all, is an abort.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("retry") => Decision::Retry,
            Some("approve") => Decision::Approve,
            _ => Decision::Abort,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Retry => write!(f, "retry"),
            Decision::Approve => write!(f, "approve"),
            Decision::Abort => write!(f, "abort"),
        }
    }
}

/// Decision payload delivered by the review service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDecision {
    /// The verdict
    pub decision: Decision,

    /// Draft text as approved, possibly edited by the reviewer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_content: Option<String>,

    /// Reviewer guidance for a retry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ReviewDecision {
    /// Create a decision without content or comment
    pub fn new(decision: Decision) -> Self {
        Self {
            decision,
            reviewed_content: None,
            comment: None,
        }
    }

    /// Approve with the given text
    pub fn approve(reviewed_content: impl Into<String>) -> Self {
        Self::new(Decision::Approve).with_reviewed_content(reviewed_content)
    }

    /// Ask for a revision
    pub fn retry(comment: impl Into<String>) -> Self {
        Self::new(Decision::Retry).with_comment(comment)
    }

    /// Abort the thread
    pub fn abort() -> Self {
        Self::new(Decision::Abort)
    }

    /// Set the reviewed content
    pub fn with_reviewed_content(mut self, content: impl Into<String>) -> Self {
        self.reviewed_content = Some(content.into());
        self
    }

    /// Set the comment
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// A review callback addressed to a suspended thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeSignal {
    /// The decision to inject
    pub decision: ReviewDecision,

    /// Suspension point the decision answers, when the callback carries it
    pub interrupt_id: Option<String>,

    /// Time the callback was received
    pub received_at: DateTime<Utc>,
}

impl ResumeSignal {
    /// Create a signal for a decision
    pub fn new(decision: ReviewDecision) -> Self {
        Self {
            decision,
            interrupt_id: None,
            received_at: Utc::now(),
        }
    }

    /// Address the signal to a specific suspension point
    pub fn for_interrupt(mut self, interrupt_id: impl Into<String>) -> Self {
        self.interrupt_id = Some(interrupt_id.into());
        self
    }
}
