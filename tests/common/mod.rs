#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use hitl_agent::config::LeadSettings;
use hitl_agent::llm::{
    Completion, CompletionRequest, ImageGenerator, ImageRequest, LlmClient, Message, ModelSettings, ToolCall,
};
use hitl_agent::review::{ReviewLink, ReviewRequest, ReviewService};
use hitl_agent::server::AppState;
use hitl_agent::store::{MemoryStore, ThreadStore};
use hitl_agent::tools::blog::{blog_tools, BlogToolDeps};
use hitl_agent::tools::sales::{sales_tools, SalesToolDeps};
use hitl_agent::tools::Scraper;
use hitl_agent::workflow::{AgentStep, BlogPipeline, EmailSender, LeadWorkflow};
use hitl_agent::{Error, Result};

pub const AGENT_MODEL: &str = "agent-model";
pub const SUMMARIZER_MODEL: &str = "summarizer-model";
pub const DRAFTER_MODEL: &str = "drafter-model";
pub const COPYWRITER_MODEL: &str = "copywriter-model";

/// Model fake: agent turns come from a script, tool models get fixed replies
#[derive(Debug, Default)]
pub struct ScriptedLlm {
    script: Mutex<VecDeque<Message>>,
    replies: HashMap<String, String>,
    pub agent_requests: Mutex<Vec<CompletionRequest>>,
    pub tool_requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    pub fn new(script: Vec<Message>) -> Self {
        let replies = HashMap::from([
            (SUMMARIZER_MODEL.to_string(), "Initech builds TPS report tooling.".to_string()),
            (DRAFTER_MODEL.to_string(), "Hi Jane, fresh fruit for Initech?".to_string()),
            (COPYWRITER_MODEL.to_string(), "# Weather in NYC\n\nIt rains.".to_string()),
        ]);
        Self {
            script: Mutex::new(script.into()),
            replies,
            ..Default::default()
        }
    }

    pub fn push(&self, message: Message) {
        self.script.lock().unwrap().push_back(message);
    }

    pub fn agent_calls(&self) -> usize {
        self.agent_requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        if let Some(reply) = self.replies.get(&request.model) {
            self.tool_requests.lock().unwrap().push(request.clone());
            return Ok(Completion::from_message(Message::assistant(reply.clone())));
        }

        self.agent_requests.lock().unwrap().push(request);
        let message = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Llm("script exhausted".to_string()))?;
        Ok(Completion::from_message(message))
    }
}

#[derive(Debug, Default)]
pub struct FakeScraper {
    pub urls: Mutex<Vec<String>>,
}

#[async_trait]
impl Scraper for FakeScraper {
    async fn scrape(&self, url: &str) -> Result<String> {
        self.urls.lock().unwrap().push(url.to_string());
        Ok(format!("# {}\n\nWe make TPS reports.", url))
    }
}

#[derive(Debug, Default)]
pub struct FakeReview {
    pub requests: Mutex<Vec<ReviewRequest>>,
    pub fail: bool,
}

impl FakeReview {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last(&self) -> ReviewRequest {
        self.requests.lock().unwrap().last().cloned().expect("no review requested")
    }
}

#[async_trait]
impl ReviewService for FakeReview {
    async fn request_review(&self, request: ReviewRequest) -> Result<ReviewLink> {
        if self.fail {
            return Err(Error::Review("service unavailable".to_string()));
        }
        let mut requests = self.requests.lock().unwrap();
        requests.push(request);
        Ok(ReviewLink {
            link: format!("https://app.gotohuman.com/review/{}", requests.len()),
            review_id: Some(format!("r{}", requests.len())),
        })
    }
}

#[derive(Debug, Default)]
pub struct FakeImages {
    pub prompts: Mutex<Vec<ImageRequest>>,
}

#[async_trait]
impl ImageGenerator for FakeImages {
    async fn generate_images(&self, request: ImageRequest) -> Result<Vec<String>> {
        let urls = (1..=request.count).map(|i| format!("https://img.test/{}.png", i)).collect();
        self.prompts.lock().unwrap().push(request);
        Ok(urls)
    }
}

#[derive(Debug, Default)]
pub struct RecordingSender {
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl EmailSender for RecordingSender {
    async fn send(&self, recipient: &str, body: &str) -> Result<()> {
        self.sent.lock().unwrap().push((recipient.to_string(), body.to_string()));
        Ok(())
    }
}

pub fn tool_call(id: &str, name: &str, arguments: Value) -> Message {
    Message::assistant_tool_calls("", vec![ToolCall::new(id, name, arguments)])
}

/// Agent turns that research initech.com and end with `draft`
pub fn research_script(draft: &str) -> Vec<Message> {
    vec![
        tool_call("c1", "web_scrape_tool", serde_json::json!({"url": "https://initech.com"})),
        tool_call("c2", "summarizer_tool", serde_json::json!({"content": "# https://initech.com"})),
        tool_call(
            "c3",
            "draft_tool",
            serde_json::json!({
                "email_address": "jane@initech.com",
                "company_description": "Initech builds TPS report tooling.",
                "previous_draft": null,
                "retry_comment": null
            }),
        ),
        Message::assistant(draft),
    ]
}

/// Lead workflow wired to in-process fakes
#[derive(Debug)]
pub struct LeadHarness {
    pub workflow: Arc<LeadWorkflow>,
    pub llm: Arc<ScriptedLlm>,
    pub scraper: Arc<FakeScraper>,
    pub review: Arc<FakeReview>,
    pub sender: Arc<RecordingSender>,
    pub store: Arc<dyn ThreadStore>,
}

impl LeadHarness {
    pub fn new(script: Vec<Message>) -> Self {
        Self::with_store(script, Arc::new(MemoryStore::new()))
    }

    pub fn with_store(script: Vec<Message>, store: Arc<dyn ThreadStore>) -> Self {
        Self::build(script, store, Arc::new(FakeReview::default()))
    }

    pub fn build(script: Vec<Message>, store: Arc<dyn ThreadStore>, review: Arc<FakeReview>) -> Self {
        let llm = Arc::new(ScriptedLlm::new(script));
        let scraper = Arc::new(FakeScraper::default());
        let sender = Arc::new(RecordingSender::default());

        let tools = sales_tools(SalesToolDeps {
            llm: llm.clone(),
            scraper: scraper.clone(),
            summarizer: ModelSettings::new(SUMMARIZER_MODEL),
            drafter: ModelSettings::new(DRAFTER_MODEL),
            lead: LeadSettings::default(),
        })
        .unwrap();
        let agent = AgentStep::new(llm.clone(), Arc::new(tools), ModelSettings::new(AGENT_MODEL));
        let workflow = LeadWorkflow::new(agent, store.clone()).with_email_sender(sender.clone());

        Self {
            workflow: Arc::new(workflow),
            llm,
            scraper,
            review,
            sender,
            store,
        }
    }

    pub fn app_state(&self) -> AppState {
        AppState {
            workflow: self.workflow.clone(),
            review: self.review.clone(),
            form_id: "email-form".to_string(),
        }
    }
}

/// Blog pipeline wired to in-process fakes
#[derive(Debug)]
pub struct BlogHarness {
    pub pipeline: BlogPipeline,
    pub llm: Arc<ScriptedLlm>,
    pub images: Arc<FakeImages>,
    pub review: Arc<FakeReview>,
}

impl BlogHarness {
    pub fn new(script: Vec<Message>, review: FakeReview) -> Self {
        let llm = Arc::new(ScriptedLlm::new(script));
        let images = Arc::new(FakeImages::default());
        let review = Arc::new(review);

        let tools = blog_tools(BlogToolDeps {
            llm: llm.clone(),
            images: images.clone(),
            review: review.clone(),
            copywriter: ModelSettings::new(COPYWRITER_MODEL),
            image_settings: Default::default(),
            form_id: "blog-form".to_string(),
        })
        .unwrap();
        let agent = AgentStep::new(llm.clone(), Arc::new(tools), ModelSettings::new(AGENT_MODEL));

        Self {
            pipeline: BlogPipeline::new(agent, 25),
            llm,
            images,
            review,
        }
    }
}
