//! LLM integrations for the agent.
//!
//! Provider-neutral message and request types plus an OpenAI-compatible
//! client for chat completions (with tool calling) and image generation.

/// OpenAI-compatible HTTP client
pub mod openai;
/// Common types for LLM integrations
pub mod types;

// Re-export key components
pub use openai::OpenAiClient;
pub use types::{
    Completion, CompletionRequest, ImageGenerator, ImageRequest, LlmClient, LlmConfig, Message,
    MessageRole, ModelSettings, ToolCall,
};
