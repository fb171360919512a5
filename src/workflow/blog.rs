use tracing::{info, instrument};

use crate::error::{Error, Result};
use crate::llm::Message;
use crate::tools::blog::REQUEST_APPROVAL_TOOL;

use super::agent::AgentStep;

/// Result of a blog-post run
#[derive(Debug, Clone, PartialEq)]
pub struct BlogOutcome {
    /// Full conversation, seed included
    pub messages: Vec<Message>,
    /// Review link returned by the approval tool, if it was called
    pub review_link: Option<String>,
    /// The model's closing reply
    pub final_message: String,
}

/// A tool-using loop that writes a post, illustrates it and asks for approval.
///
/// Runs until the model answers without tool calls. Nothing is persisted.
#[derive(Debug, Clone)]
pub struct BlogPipeline {
    agent: AgentStep,
    max_steps: usize,
}

impl BlogPipeline {
    /// Create a pipeline around an agent bound to the blog tools
    pub fn new(agent: AgentStep, max_steps: usize) -> Self {
        Self { agent, max_steps }
    }

    /// First human message of a run
    pub fn seed_message(topic: &str) -> String {
        format!(
            "Write a blog post about {}, create images for it, and then request approval from a human reviewer",
            topic
        )
    }

    /// Run the pipeline for one topic
    #[instrument(skip(self))]
    pub async fn run(&self, topic: &str) -> Result<BlogOutcome> {
        let mut messages = vec![Message::user(Self::seed_message(topic))];
        let mut review_link = None;
        let mut steps = 0;

        loop {
            if steps >= self.max_steps {
                return Err(Error::StepLimitExceeded(self.max_steps));
            }
            steps += 1;

            let reply = self.agent.respond(&messages).await?;
            messages.push(reply.clone());
            if !reply.has_tool_calls() {
                info!("Blog pipeline finished after {} steps", steps);
                return Ok(BlogOutcome {
                    messages,
                    review_link,
                    final_message: reply.content,
                });
            }

            steps += 1;
            for result in self.agent.execute_tool_calls(&reply).await? {
                let is_error = result.metadata.as_ref().is_some_and(|m| m.contains_key("is_error"));
                if result.name.as_deref() == Some(REQUEST_APPROVAL_TOOL) && !is_error {
                    info!("Blog post sent for review: {}", result.content);
                    review_link = Some(result.content.clone());
                }
                messages.push(result);
            }
        }
    }
}
