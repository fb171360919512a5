use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use async_trait::async_trait;
use tracing::{debug, error, instrument};

use crate::error::{Error, Result};
use crate::telemetry::add_metric;
use crate::tools::ToolDefinition;

use super::types::{
    Completion, CompletionRequest, ImageGenerator, ImageRequest, LlmClient, LlmConfig, Message,
    ToolCall,
};

/// Client for OpenAI-compatible chat completion and image APIs
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    /// Configuration for the client
    config: LlmConfig,

    /// HTTP client for making requests
    client: Client,
}

/// Request to the chat completions endpoint
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ChatTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// Message in wire format
#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ChatToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

/// Tool call in wire format; arguments travel as a JSON string
#[derive(Debug, Serialize, Deserialize)]
struct ChatToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    kind: String,
    function: ChatFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatFunctionCall {
    name: String,
    arguments: String,
}

/// Bound tool in wire format
#[derive(Debug, Serialize)]
struct ChatTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: ChatFunction,
}

#[derive(Debug, Serialize)]
struct ChatFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
    total_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
}

fn function_type() -> String {
    "function".to_string()
}

impl OpenAiClient {
    /// Create a new client
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    /// Get the configuration for the client
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn post(&self, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.config.api_url.trim_end_matches('/'), path);
        let builder = self.client.post(url);
        match &self.config.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Convert messages to wire format
    fn convert_messages(messages: &[Message]) -> Vec<ChatMessage> {
        messages
            .iter()
            .map(|msg| ChatMessage {
                role: msg.role.to_string(),
                content: Some(msg.content.clone()),
                tool_calls: if msg.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        msg.tool_calls
                            .iter()
                            .map(|call| ChatToolCall {
                                id: call.id.clone(),
                                kind: function_type(),
                                function: ChatFunctionCall {
                                    name: call.name.clone(),
                                    arguments: call.arguments.to_string(),
                                },
                            })
                            .collect(),
                    )
                },
                tool_call_id: msg.tool_call_id.clone(),
            })
            .collect()
    }

    fn convert_tools(tools: &[ToolDefinition]) -> Vec<ChatTool> {
        tools
            .iter()
            .map(|tool| ChatTool {
                kind: "function",
                function: ChatFunction {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters: tool.input_schema.clone(),
                },
            })
            .collect()
    }

    /// Convert a wire message back into a conversation message
    fn convert_response_message(message: ChatMessage) -> Message {
        let content = message.content.unwrap_or_default();
        let tool_calls: Vec<ToolCall> = message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| {
                // Malformed argument JSON is passed through as a string so the
                // tool reports it back to the model instead of failing the step.
                let arguments = serde_json::from_str(&call.function.arguments)
                    .unwrap_or(serde_json::Value::String(call.function.arguments));
                ToolCall::new(call.id, call.function.name, arguments)
            })
            .collect();

        if message.role != "assistant" {
            debug!("Unexpected role in completion: {}", message.role);
        }

        if tool_calls.is_empty() {
            Message::assistant(content)
        } else {
            Message::assistant_tool_calls(content, tool_calls)
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    #[instrument(skip(self, request), fields(model = %request.model, tools = request.tools.len()))]
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        let start = std::time::Instant::now();

        let chat_request = ChatRequest {
            model: request.model.clone(),
            messages: Self::convert_messages(&request.messages),
            tools: Self::convert_tools(&request.tools),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        debug!("Sending chat completion request with {} messages", request.messages.len());
        let response = self.post("chat/completions").json(&chat_request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("LLM API error ({}): {}", status, error_text);
            return Err(Error::Llm(format!("API error ({}): {}", status, error_text)));
        }

        let chat_response: ChatResponse = response.json().await?;
        let duration = start.elapsed();

        let choice = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Llm("completion contained no choices".to_string()))?;

        add_metric("llm_request_duration_ms", duration.as_millis() as f64, &[
            ("model", request.model.clone()),
            ("provider", "openai".to_string()),
        ]);

        let usage = chat_response.usage;
        if let Some(tokens) = usage.as_ref().and_then(|u| u.total_tokens) {
            add_metric("llm_tokens_total", tokens as f64, &[
                ("model", request.model.clone()),
                ("provider", "openai".to_string()),
            ]);
        }

        Ok(Completion {
            message: Self::convert_response_message(choice.message),
            model: chat_response.model,
            prompt_tokens: usage.as_ref().and_then(|u| u.prompt_tokens),
            completion_tokens: usage.as_ref().and_then(|u| u.completion_tokens),
            total_tokens: usage.as_ref().and_then(|u| u.total_tokens),
        })
    }
}

#[async_trait]
impl ImageGenerator for OpenAiClient {
    #[instrument(skip(self, request), fields(count = request.count))]
    async fn generate_images(&self, request: ImageRequest) -> Result<Vec<String>> {
        let mut body = json!({
            "prompt": request.prompt,
            "n": request.count,
            "style": request.style,
            "response_format": "url",
        });
        if let Some(model) = &request.model {
            body["model"] = json!(model);
        }

        let response = self.post("images/generations").json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("Image API error ({}): {}", status, error_text);
            return Err(Error::Llm(format!("Image API error ({}): {}", status, error_text)));
        }

        let images: ImageResponse = response.json().await?;
        Ok(images.data.into_iter().filter_map(|image| image.url).collect())
    }
}
