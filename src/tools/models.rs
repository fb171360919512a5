use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Represents a single tool that can be invoked by a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique identifier for the tool
    pub name: String,

    /// Human-readable description of functionality
    pub description: String,

    /// JSON Schema defining expected parameters
    pub input_schema: Value,
}

impl ToolDefinition {
    /// Creates a new tool with the given name, description, and input schema
    pub fn new(name: &str, description: &str, input_schema: Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}

/// Represents different content types for tool results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ToolResultContent {
    /// Text content
    #[serde(rename = "text")]
    Text {
        /// The text content
        text: String,
    },

    /// Structured content
    #[serde(rename = "json")]
    Json {
        /// The structured value
        value: Value,
    },
}

/// Represents the result of a tool execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// List of content items in the result
    pub content: Vec<ToolResultContent>,

    /// Whether the tool execution resulted in an error
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResult {
    /// Creates a new success result with text content
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolResultContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Creates a new success result with structured content
    pub fn json(value: Value) -> Self {
        Self {
            content: vec![ToolResultContent::Json { value }],
            is_error: false,
        }
    }

    /// Creates a new error result with text content
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolResultContent::Text { text: text.into() }],
            is_error: true,
        }
    }

    /// Render the result as the text content of a tool message
    pub fn to_message_content(&self) -> String {
        self.content
            .iter()
            .map(|item| match item {
                ToolResultContent::Text { text } => text.clone(),
                ToolResultContent::Json { value } => value.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
