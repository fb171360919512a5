use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;
use crate::tools::ToolDefinition;

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Instructions for the model
    System,
    /// Message from the human side of the conversation
    User,
    /// Message produced by the model
    Assistant,
    /// Result of a tool call
    Tool,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::Tool => write!(f, "tool"),
        }
    }
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Provider-assigned call id, echoed back on the result message
    pub id: String,
    /// Name of the tool to run
    pub name: String,
    /// Arguments as produced by the model
    pub arguments: serde_json::Value,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// A message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,
    /// Content of the message
    pub content: String,
    /// Tool calls requested by an assistant message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Call this tool message answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Name of the tool that produced a tool message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Optional metadata for the message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl Message {
    fn with_role(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
            metadata: None,
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::System, content)
    }

    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::User, content)
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::Assistant, content)
    }

    /// Create an assistant message requesting tool calls
    pub fn assistant_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        let mut message = Self::with_role(MessageRole::Assistant, content);
        message.tool_calls = tool_calls;
        message
    }

    /// Create the result message for a tool call
    pub fn tool(call: &ToolCall, content: impl Into<String>) -> Self {
        let mut message = Self::with_role(MessageRole::Tool, content);
        message.tool_call_id = Some(call.id.clone());
        message.name = Some(call.name.clone());
        message
    }

    /// Add metadata to the message
    pub fn with_metadata(mut self, metadata: HashMap<String, serde_json::Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Whether the message asks for at least one tool call
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Connection settings for an LLM provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL for the API
    pub api_url: String,

    /// API key for authentication (if required)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            timeout_secs: 120,
        }
    }
}

/// Model selection and sampling settings for one kind of call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Name of the model to use
    pub model: String,

    /// Temperature for sampling (higher = more random)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum number of tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ModelSettings {
    /// Settings for the given model with provider defaults
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// A completion request to an LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model to use for the request
    pub model: String,

    /// Messages in the conversation
    pub messages: Vec<Message>,

    /// Tools the model may call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,

    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Temperature for sampling (higher = more random)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// Build a request from model settings and a message list
    pub fn new(settings: &ModelSettings, messages: Vec<Message>) -> Self {
        Self {
            model: settings.model.clone(),
            messages,
            tools: Vec::new(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        }
    }

    /// Bind tools to the request
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }
}

/// A completion response from an LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    /// Generated message, either text or tool-call requests
    pub message: Message,

    /// Model that generated the completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Number of tokens in the prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u32>,

    /// Number of tokens in the completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u32>,

    /// Total number of tokens used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u32>,
}

impl Completion {
    /// Completion carrying only a message
    pub fn from_message(message: Message) -> Self {
        Self {
            message,
            model: None,
            prompt_tokens: None,
            completion_tokens: None,
            total_tokens: None,
        }
    }
}

/// Trait for LLM clients
#[async_trait]
pub trait LlmClient: Send + Sync + std::fmt::Debug {
    /// Generate a completion from the LLM
    async fn complete(&self, request: CompletionRequest) -> Result<Completion>;
}

/// Request for a batch of generated images
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRequest {
    /// Text prompt
    pub prompt: String,
    /// Number of images
    pub count: u32,
    /// Image style
    pub style: String,
    /// Image model, provider default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Trait for image generation backends
#[async_trait]
pub trait ImageGenerator: Send + Sync + std::fmt::Debug {
    /// Generate images and return their URLs
    async fn generate_images(&self, request: ImageRequest) -> Result<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_message_links_call() {
        let call = ToolCall::new("call_1", "web_scrape_tool", json!({"url": "https://acme.io"}));
        let message = Message::tool(&call, "# Acme");

        assert_eq!(message.role, MessageRole::Tool);
        assert_eq!(message.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(message.name.as_deref(), Some("web_scrape_tool"));
        assert!(!message.has_tool_calls());
    }

    #[test]
    fn test_message_serialization_skips_empty_fields() {
        let value = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(value, json!({"role": "user", "content": "hi"}));

        let restored: Message = serde_json::from_value(value).unwrap();
        assert_eq!(restored, Message::user("hi"));
    }

    #[test]
    fn test_completion_request_uses_model_settings() {
        let settings = ModelSettings::new("gpt-4o-mini").with_temperature(0.5);
        let request = CompletionRequest::new(&settings, vec![Message::user("x")]);
        assert_eq!(request.model, "gpt-4o-mini");
        assert_eq!(request.temperature, Some(0.5));
        assert!(request.tools.is_empty());
    }
}
