//! Tools used by the sales-outreach workflow: scrape, summarize, draft.

use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::config::LeadSettings;
use crate::error::Result;
use crate::llm::{CompletionRequest, LlmClient, Message, ModelSettings};
use crate::telemetry::preview;
use crate::tools::models::{ToolDefinition, ToolResult};
use crate::tools::registry::ToolRegistry;
use crate::tools::scrape::Scraper;

/// Name of the scraping tool
pub const WEB_SCRAPE_TOOL: &str = "web_scrape_tool";
/// Name of the summarizing tool
pub const SUMMARIZER_TOOL: &str = "summarizer_tool";
/// Name of the drafting tool
pub const DRAFT_TOOL: &str = "draft_tool";

const SUMMARIZER_PROMPT: &str = "You are a helpful website content summarizer. You will be passed \
the content of a scraped company website. Please summarize it in 250-300 words focusing on what \
kind of company this is, the services they offer and how they operate.";

/// Collaborators the sales tools are built from
#[derive(Debug, Clone)]
pub struct SalesToolDeps {
    /// Model client shared by the summarizer and the drafter
    pub llm: Arc<dyn LlmClient>,
    /// Scraping backend
    pub scraper: Arc<dyn Scraper>,
    /// Model settings for summaries
    pub summarizer: ModelSettings,
    /// Model settings for drafts
    pub drafter: ModelSettings,
    /// Sender details used in drafts
    pub lead: LeadSettings,
}

/// Arguments of the scraping tool
#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeInput {
    /// Page to scrape
    pub url: String,
}

/// Arguments of the summarizing tool
#[derive(Debug, Clone, Deserialize)]
pub struct SummarizeInput {
    /// Scraped website content
    pub content: String,
}

/// Arguments of the drafting tool
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DraftInput {
    /// Prospect's email address
    pub email_address: String,
    /// Summary of the prospect's company website, empty when unknown
    #[serde(default)]
    pub company_description: Option<String>,
    /// Draft being revised
    #[serde(default)]
    pub previous_draft: Option<String>,
    /// Reviewer guidance for the revision
    #[serde(default)]
    pub retry_comment: Option<String>,
}

/// Build the message list for a website summary
pub fn summarizer_messages(content: &str) -> Vec<Message> {
    vec![Message::system(SUMMARIZER_PROMPT), Message::user(content)]
}

/// Build the message list for writing or revising an outreach email
pub fn draft_messages(input: &DraftInput, lead: &LeadSettings) -> Vec<Message> {
    let description = input
        .company_description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());

    let mut system = format!(
        "You are a helpful sales expert, great at writing enticing emails.\n\
         You will write an email for {sender} who wants to reach out to a new prospect who left \
         their email address: {email}. {sender} works for the following company:\n\
         {company}\n\
         Write no more than 300 words.",
        sender = lead.sender_name,
        email = input.email_address,
        company = lead.sender_company_description,
    );
    if description.is_some() {
        system.push_str(
            "\nIt must be tailored as much as possible to the prospect's company based on the \
             website information we fetched. Don't mention that we got the information from the \
             website. Include no placeholders! Your response should be nothing but the pure email body!",
        );
    }

    let mut messages = vec![
        Message::system(system),
        Message::user(match description {
            Some(d) => format!("#Company website summary:\n{}", d),
            None => "No additional information found about the prospect".to_string(),
        }),
    ];

    if let Some(draft) = input.previous_draft.as_deref().filter(|d| !d.is_empty()) {
        messages.push(Message::assistant(draft));
    }
    if let Some(comment) = input.retry_comment.as_deref().filter(|c| !c.is_empty()) {
        messages.push(Message::user(comment));
    }

    messages
}

async fn complete_text(llm: &dyn LlmClient, settings: &ModelSettings, messages: Vec<Message>) -> Result<String> {
    let completion = llm.complete(CompletionRequest::new(settings, messages)).await?;
    Ok(completion.message.content)
}

/// Build the tool table of the sales-outreach workflow
pub fn sales_tools(deps: SalesToolDeps) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();

    let scraper = deps.scraper.clone();
    registry.register_fn(
        ToolDefinition::new(
            WEB_SCRAPE_TOOL,
            "Scrape a website",
            json!({
                "type": "object",
                "properties": {"url": {"type": "string", "description": "Website URL"}},
                "required": ["url"]
            }),
        ),
        move |input: ScrapeInput| {
            let scraper = scraper.clone();
            async move {
                let markdown = scraper.scrape(&input.url).await?;
                info!("Scraped website {}: {}", input.url, preview(&markdown, 50));
                Ok(ToolResult::text(markdown))
            }
        },
    )?;

    let llm = deps.llm.clone();
    let summarizer = deps.summarizer.clone();
    registry.register_fn(
        ToolDefinition::new(
            SUMMARIZER_TOOL,
            "Summarize scraped website content",
            json!({
                "type": "object",
                "properties": {"content": {"type": "string", "description": "Scraped website content"}},
                "required": ["content"]
            }),
        ),
        move |input: SummarizeInput| {
            let llm = llm.clone();
            let summarizer = summarizer.clone();
            async move {
                let summary = complete_text(llm.as_ref(), &summarizer, summarizer_messages(&input.content)).await?;
                info!("Summarized website: {}", preview(&summary, 100));
                Ok(ToolResult::text(summary))
            }
        },
    )?;

    let llm = deps.llm.clone();
    let drafter = deps.drafter.clone();
    let lead = deps.lead.clone();
    registry.register_fn(
        ToolDefinition::new(
            DRAFT_TOOL,
            "Write or revise a sales email.",
            json!({
                "type": "object",
                "properties": {
                    "email_address": {"type": "string"},
                    "company_description": {"type": ["string", "null"]},
                    "previous_draft": {"type": ["string", "null"]},
                    "retry_comment": {"type": ["string", "null"]}
                },
                "required": ["email_address", "company_description", "previous_draft", "retry_comment"]
            }),
        ),
        move |input: DraftInput| {
            let llm = llm.clone();
            let drafter = drafter.clone();
            let lead = lead.clone();
            async move {
                let draft = complete_text(llm.as_ref(), &drafter, draft_messages(&input, &lead)).await?;
                info!("Drafted email: {}", preview(&draft, 100));
                Ok(ToolResult::text(draft))
            }
        },
    )?;

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Completion, MessageRole};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct RecordingLlm {
        requests: Mutex<Vec<crate::llm::CompletionRequest>>,
    }

    #[async_trait]
    impl LlmClient for RecordingLlm {
        async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
            let reply = format!("reply from {}", request.model);
            self.requests.lock().unwrap().push(request);
            Ok(Completion::from_message(Message::assistant(reply)))
        }
    }

    #[derive(Debug)]
    struct StaticScraper;

    #[async_trait]
    impl Scraper for StaticScraper {
        async fn scrape(&self, url: &str) -> Result<String> {
            Ok(format!("# Home of {}", url))
        }
    }

    fn deps(llm: Arc<RecordingLlm>) -> SalesToolDeps {
        SalesToolDeps {
            llm,
            scraper: Arc::new(StaticScraper),
            summarizer: ModelSettings::new("summarizer").with_temperature(0.5),
            drafter: ModelSettings::new("drafter").with_temperature(0.75),
            lead: LeadSettings::default(),
        }
    }

    #[test]
    fn test_draft_messages_without_company_description() {
        let input = DraftInput {
            email_address: "jane@gmail.com".to_string(),
            ..Default::default()
        };
        let messages = draft_messages(&input, &LeadSettings::default());

        assert_eq!(messages.len(), 2);
        assert!(messages[0].content.contains("jane@gmail.com"));
        assert!(!messages[0].content.contains("Include no placeholders"));
        assert_eq!(messages[1].content, "No additional information found about the prospect");
    }

    #[test]
    fn test_draft_messages_for_revision() {
        let input = DraftInput {
            email_address: "jane@initech.com".to_string(),
            company_description: Some("Initech builds TPS tooling.".to_string()),
            previous_draft: Some("Hi Jane".to_string()),
            retry_comment: Some("Shorter please".to_string()),
        };
        let messages = draft_messages(&input, &LeadSettings::default());

        assert_eq!(messages.len(), 4);
        assert!(messages[0].content.contains("Include no placeholders"));
        assert_eq!(messages[1].content, "#Company website summary:\nInitech builds TPS tooling.");
        assert_eq!(messages[2].role, MessageRole::Assistant);
        assert_eq!(messages[3].content, "Shorter please");
    }

    #[tokio::test]
    async fn test_sales_tools_dispatch() {
        let llm = Arc::new(RecordingLlm::default());
        let registry = sales_tools(deps(llm.clone())).unwrap();
        assert_eq!(registry.names(), vec![DRAFT_TOOL, SUMMARIZER_TOOL, WEB_SCRAPE_TOOL]);

        let scraped = registry
            .call_tool(WEB_SCRAPE_TOOL, &json!({"url": "https://initech.com"}))
            .await
            .unwrap();
        assert_eq!(scraped.to_message_content(), "# Home of https://initech.com");

        let summary = registry
            .call_tool(SUMMARIZER_TOOL, &json!({"content": "# Home"}))
            .await
            .unwrap();
        assert_eq!(summary.to_message_content(), "reply from summarizer");

        let draft = registry
            .call_tool(DRAFT_TOOL, &json!({"email_address": "jane@initech.com", "company_description": null}))
            .await
            .unwrap();
        assert_eq!(draft.to_message_content(), "reply from drafter");

        let requests = llm.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].temperature, Some(0.5));
        assert_eq!(requests[1].temperature, Some(0.75));
    }
}
