use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::error::{Error, Result};
use crate::llm::{CompletionRequest, LlmClient, Message, ModelSettings};
use crate::telemetry::add_metric;
use crate::tools::ToolRegistry;

/// A model bound to a tool table.
///
/// Shared by the lead workflow and the blog pipeline. The step never looks at
/// tool names; the registry decides what a call does.
#[derive(Debug, Clone)]
pub struct AgentStep {
    /// Model client
    llm: Arc<dyn LlmClient>,
    /// Tools offered to the model
    tools: Arc<ToolRegistry>,
    /// Model settings for the agent
    model: ModelSettings,
}

impl AgentStep {
    /// Create a new agent step
    pub fn new(llm: Arc<dyn LlmClient>, tools: Arc<ToolRegistry>, model: ModelSettings) -> Self {
        Self { llm, tools, model }
    }

    /// The tool table
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Ask the model for exactly one next message given the full log
    #[instrument(skip(self, messages), fields(message_count = messages.len()))]
    pub async fn respond(&self, messages: &[Message]) -> Result<Message> {
        if messages.is_empty() {
            return Err(Error::contract("agent step called with an empty message log"));
        }

        let request = CompletionRequest::new(&self.model, messages.to_vec())
            .with_tools(self.tools.definitions());
        let completion = self.llm.complete(request).await?;
        let message = completion.message;

        if message.has_tool_calls() {
            let names: Vec<&str> = message.tool_calls.iter().map(|c| c.name.as_str()).collect();
            info!("Agent requested tools: {}", names.join(", "));
        } else {
            debug!("Agent replied without tool calls");
        }

        Ok(message)
    }

    /// Run every tool call of `message` in request order.
    ///
    /// Returns one tool message per call. Unknown tools and invalid arguments
    /// come back as error results for the model to see; failures of a tool's
    /// backing service are returned as errors.
    #[instrument(skip(self, message), fields(calls = message.tool_calls.len()))]
    pub async fn execute_tool_calls(&self, message: &Message) -> Result<Vec<Message>> {
        let mut results = Vec::with_capacity(message.tool_calls.len());

        for call in &message.tool_calls {
            let start = Instant::now();
            let outcome = self.tools.call_tool(&call.name, &call.arguments).await;
            add_metric(
                "tool_call_duration_ms",
                start.elapsed().as_millis() as f64,
                &[
                    ("tool", call.name.clone()),
                    ("success", outcome.as_ref().map(|r| !r.is_error).unwrap_or(false).to_string()),
                ],
            );

            let result = outcome?;
            let mut tool_message = Message::tool(call, result.to_message_content());
            if result.is_error {
                warn!("Tool {} returned an error: {}", call.name, tool_message.content);
                tool_message = tool_message.with_metadata(HashMap::from([(
                    "is_error".to_string(),
                    json!(true),
                )]));
            }
            results.push(tool_message);
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Completion, MessageRole, ToolCall};
    use crate::tools::{ToolDefinition, ToolResult};
    use async_trait::async_trait;
    use serde::Deserialize;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct EchoLlm {
        tool_counts: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl LlmClient for EchoLlm {
        async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
            self.tool_counts.lock().unwrap().push(request.tools.len());
            let last = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(Completion::from_message(Message::assistant(format!("echo: {}", last))))
        }
    }

    #[derive(Deserialize)]
    struct Word {
        word: String,
    }

    fn registry() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry
            .register_fn(
                ToolDefinition::new(
                    "shout",
                    "Upper-case a word",
                    json!({"type": "object", "properties": {"word": {"type": "string"}}}),
                ),
                |input: Word| async move { Ok(ToolResult::text(input.word.to_uppercase())) },
            )
            .unwrap();
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_respond_binds_tools() {
        let llm = Arc::new(EchoLlm::default());
        let agent = AgentStep::new(llm.clone(), registry(), ModelSettings::new("gpt-4o"));

        let reply = agent.respond(&[Message::user("hello")]).await.unwrap();
        assert_eq!(reply.content, "echo: hello");
        assert_eq!(*llm.tool_counts.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_respond_rejects_empty_log() {
        let agent = AgentStep::new(Arc::new(EchoLlm::default()), registry(), ModelSettings::new("gpt-4o"));
        let err = agent.respond(&[]).await.unwrap_err();
        assert!(matches!(err, Error::Contract(_)));
    }

    #[tokio::test]
    async fn test_tool_calls_run_in_order() {
        let agent = AgentStep::new(Arc::new(EchoLlm::default()), registry(), ModelSettings::new("gpt-4o"));
        let message = Message::assistant_tool_calls(
            "",
            vec![
                ToolCall::new("c1", "shout", json!({"word": "first"})),
                ToolCall::new("c2", "missing", json!({})),
                ToolCall::new("c3", "shout", json!({"word": "third"})),
            ],
        );

        let results = agent.execute_tool_calls(&message).await.unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|m| m.role == MessageRole::Tool));
        assert_eq!(results[0].content, "FIRST");
        assert_eq!(results[0].tool_call_id.as_deref(), Some("c1"));
        assert_eq!(results[1].tool_call_id.as_deref(), Some("c2"));
        assert!(results[1].metadata.as_ref().is_some_and(|m| m["is_error"] == json!(true)));
        assert_eq!(results[2].content, "THIRD");
    }
}
