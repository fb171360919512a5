use serde_json::Value;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::workflow::{Decision, ReviewDecision};

/// A call to the entry point, after classification
#[derive(Debug, Clone, PartialEq)]
pub enum InboundRequest {
    /// Start (or restart) a thread for a lead
    Trigger {
        /// Thread to run, generated when the caller gave none
        thread_id: String,
        /// The lead's email address
        email: String,
    },
    /// Deliver a reviewer's decision to a suspended thread
    Review {
        /// Thread the review belongs to
        thread_id: String,
        /// Suspension point the review answers
        interrupt_id: Option<String>,
        /// The decision
        decision: ReviewDecision,
    },
}

impl InboundRequest {
    /// Classify a request body.
    ///
    /// Triggers carry `type: "trigger"` or a non-empty top-level `email`; reviews carry
    /// `type: "review"`. Anything else is rejected.
    pub fn parse(body: &Value) -> Result<Self> {
        if !body.is_object() {
            return Err(Error::InvalidRequest("request body must be a JSON object".to_string()));
        }

        let kind = body.get("type").and_then(Value::as_str);
        let meta = body.get("meta");
        let thread_id = meta
            .and_then(|m| m.get("threadId"))
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        let has_email = body
            .get("email")
            .and_then(Value::as_str)
            .is_some_and(|e| !e.is_empty());

        if kind == Some("trigger") || has_email {
            let email = body
                .get("email")
                .and_then(Value::as_str)
                .filter(|e| !e.is_empty())
                .or_else(|| response_value(body, "email"))
                .filter(|e| !e.is_empty())
                .ok_or_else(|| Error::InvalidRequest("trigger without an email address".to_string()))?;

            return Ok(InboundRequest::Trigger {
                thread_id: thread_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
                email: email.to_string(),
            });
        }

        if kind == Some("review") {
            let thread_id = thread_id
                .ok_or_else(|| Error::InvalidRequest("review without meta.threadId".to_string()))?;
            let interrupt_id = meta
                .and_then(|m| m.get("interruptId"))
                .and_then(Value::as_str)
                .map(str::to_string);

            let decision = ReviewDecision {
                decision: Decision::parse(response_value(body, "emailApproval")),
                reviewed_content: response_value(body, "emailDraft").map(str::to_string),
                comment: response_value(body, "retryComment").map(str::to_string),
            };

            return Ok(InboundRequest::Review {
                thread_id,
                interrupt_id,
                decision,
            });
        }

        Err(Error::InvalidRequest(format!(
            "unsupported request type: {}",
            kind.unwrap_or("<none>")
        )))
    }
}

/// A form value from `responseValues`, either `{"value": ...}` or a bare string
fn response_value<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    let value = body.get("responseValues")?.get(key)?;
    match value {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => map.get("value").and_then(Value::as_str),
        _ => None,
    }
}
