use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// A request for human review of generated content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    /// Review form the content is shown in
    pub form_id: String,

    /// Content fields, keyed by form field id
    pub fields: Map<String, Value>,

    /// Metadata echoed back with the reviewer's decision
    pub meta: Map<String, Value>,

    /// Reviewers to assign, service default when empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assign_to: Vec<String>,
}

impl ReviewRequest {
    /// Create a new review request for a form
    pub fn new(form_id: impl Into<String>) -> Self {
        Self {
            form_id: form_id.into(),
            fields: Map::new(),
            meta: Map::new(),
            assign_to: Vec::new(),
        }
    }

    /// Add a content field
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Add a metadata entry
    pub fn with_meta(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(name.into(), value.into());
        self
    }

    /// Assign the review to a reviewer
    pub fn assign_to(mut self, reviewer: impl Into<String>) -> Self {
        self.assign_to.push(reviewer.into());
        self
    }
}

/// What the review service hands back for a submitted request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewLink {
    /// Shareable link to the review
    pub link: String,

    /// Service-side id of the review, when reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_id: Option<String>,
}

/// A service that routes content to a human reviewer
#[async_trait]
pub trait ReviewService: Send + Sync + std::fmt::Debug {
    /// Submit a review request and return its link
    async fn request_review(&self, request: ReviewRequest) -> Result<ReviewLink>;
}
