use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use uuid::Uuid;

use crate::llm::{Message, MessageRole};

use super::signal::ReviewDecision;
use super::step::Step;

/// Working state of a lead thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadState {
    /// Conversation log, append-only
    pub messages: Vec<Message>,

    /// The lead's email address
    pub email_address: String,

    /// Company website derived from the address
    #[serde(default)]
    pub lead_website_url: Option<String>,

    /// Approved email body, set once a reviewer approves
    #[serde(default)]
    pub email_to_send: Option<String>,
}

impl LeadState {
    /// Create the state for a new lead
    pub fn new(email_address: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            email_address: email_address.into(),
            lead_website_url: None,
            email_to_send: None,
        }
    }

    /// Append a message to the log
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// The newest message
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The newest message written by the model
    pub fn last_assistant_message(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Assistant)
    }
}

/// Lifecycle of a thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadStatus {
    /// Steps remain to run
    Running,
    /// Waiting for a human decision
    Suspended,
    /// Reached the terminal node
    Completed,
}

impl fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadStatus::Running => write!(f, "running"),
            ThreadStatus::Suspended => write!(f, "suspended"),
            ThreadStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Where a thread is paused, and what the reviewer is shown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspensionPoint {
    /// Unique id, echoed back by the review callback
    pub id: String,

    /// Step the thread resumes at
    pub step: Step,

    /// Content handed to the reviewer
    pub payload: Value,

    /// Link returned by the review service
    #[serde(default)]
    pub review_link: Option<String>,

    /// Time the thread was suspended
    pub created_at: DateTime<Utc>,
}

impl SuspensionPoint {
    /// Suspend for review of an email draft
    pub fn ask_human(email_draft: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            step: Step::AskHuman,
            payload: json!({ "email_draft": email_draft }),
            review_link: None,
            created_at: Utc::now(),
        }
    }

    /// Draft under review
    pub fn email_draft(&self) -> Option<&str> {
        self.payload.get("email_draft").and_then(Value::as_str)
    }
}

/// Persisted unit of a thread: state plus the explicit continuation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Thread identifier
    pub thread_id: String,

    /// Committed version, zero before the first save
    #[serde(default)]
    pub version: u64,

    /// Workflow state
    pub state: LeadState,

    /// Step to run when the thread continues, none once completed
    pub next_step: Option<Step>,

    /// Active suspension, at most one
    #[serde(default)]
    pub suspension: Option<SuspensionPoint>,

    /// Thread status
    pub status: ThreadStatus,

    /// Most recently consumed review decision
    #[serde(default)]
    pub last_decision: Option<ReviewDecision>,

    /// Time the thread was created
    pub created_at: DateTime<Utc>,

    /// Time of the last change
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Create an unsaved checkpoint positioned at the initial step
    pub fn new(thread_id: impl Into<String>, email_address: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            thread_id: thread_id.into(),
            version: 0,
            state: LeadState::new(email_address),
            next_step: Some(Step::ExtractDomain),
            suspension: None,
            status: ThreadStatus::Running,
            last_decision: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the thread waits for a human decision
    pub fn is_suspended(&self) -> bool {
        self.status == ThreadStatus::Suspended && self.suspension.is_some()
    }

    /// Whether the thread reached its terminal node
    pub fn is_completed(&self) -> bool {
        self.status == ThreadStatus::Completed
    }

    /// Review link of the active suspension
    pub fn review_link(&self) -> Option<&str> {
        self.suspension.as_ref()?.review_link.as_deref()
    }

    /// Mark the checkpoint as changed
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_assistant_message_skips_tool_messages() {
        let mut state = LeadState::new("jane@initech.com");
        state.push(Message::user("seed"));
        state.push(Message::assistant("draft one"));
        state.push(Message::user("Please revise"));
        assert_eq!(state.last_assistant_message().map(|m| m.content.as_str()), Some("draft one"));
        assert_eq!(state.last_message().map(|m| m.content.as_str()), Some("Please revise"));
    }

    #[test]
    fn test_new_checkpoint_starts_at_extract_domain() {
        let checkpoint = Checkpoint::new("t-1", "jane@initech.com");
        assert_eq!(checkpoint.version, 0);
        assert_eq!(checkpoint.next_step, Some(Step::ExtractDomain));
        assert!(!checkpoint.is_suspended());
        assert!(!checkpoint.is_completed());
    }

    #[test]
    fn test_checkpoint_json_shape() {
        let mut checkpoint = Checkpoint::new("t-1", "jane@initech.com");
        checkpoint.suspension = Some(SuspensionPoint::ask_human("Hi Jane"));
        checkpoint.status = ThreadStatus::Suspended;
        checkpoint.next_step = Some(Step::AskHuman);

        let value = serde_json::to_value(&checkpoint).unwrap();
        assert_eq!(value["status"], "suspended");
        assert_eq!(value["next_step"], "ask_human");
        assert_eq!(value["suspension"]["payload"]["email_draft"], "Hi Jane");

        let back: Checkpoint = serde_json::from_value(value).unwrap();
        assert_eq!(back, checkpoint);
        assert_eq!(back.suspension.unwrap().email_draft(), Some("Hi Jane"));
    }
}
