//! Tools used by the blog-post pipeline: copywriting, header images and review.

use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::ImageSettings;
use crate::error::Result;
use crate::llm::{CompletionRequest, ImageGenerator, ImageRequest, LlmClient, Message, ModelSettings};
use crate::review::{ReviewRequest, ReviewService};
use crate::tools::models::{ToolDefinition, ToolResult};
use crate::tools::registry::ToolRegistry;

/// Name of the copywriting tool
pub const WRITE_BLOG_POST_TOOL: &str = "write_blog_post";
/// Name of the image tool
pub const GENERATE_IMAGES_TOOL: &str = "generate_images";
/// Name of the review tool
pub const REQUEST_APPROVAL_TOOL: &str = "request_approval";

const COPYWRITER_PROMPT: &str = "You are a senior copywriter. Write an engaging blog post about the \
given topic. Maximum 300 words. Output only markdown format.";

/// Collaborators the blog tools are built from
#[derive(Debug, Clone)]
pub struct BlogToolDeps {
    /// Model client for copywriting
    pub llm: Arc<dyn LlmClient>,
    /// Image backend
    pub images: Arc<dyn ImageGenerator>,
    /// Review backend
    pub review: Arc<dyn ReviewService>,
    /// Model settings for copywriting
    pub copywriter: ModelSettings,
    /// Image generation settings
    pub image_settings: ImageSettings,
    /// Review form for blog posts
    pub form_id: String,
}

/// Arguments of the copywriting and image tools
#[derive(Debug, Clone, Deserialize)]
pub struct TopicInput {
    /// The topic of the blog post
    pub topic: String,
}

/// Arguments of the review tool
#[derive(Debug, Clone, Deserialize)]
pub struct ApprovalInput {
    /// The text of the blog post
    pub ai_text: String,
    /// The URLs of the suggested images
    #[serde(default)]
    pub ai_image_urls: Vec<String>,
}

/// Build the review request for a blog post and its image suggestions
pub fn approval_request(form_id: &str, input: &ApprovalInput) -> ReviewRequest {
    let images: Vec<Value> = input
        .ai_image_urls
        .iter()
        .enumerate()
        .map(|(i, url)| json!({"url": url, "label": format!("AI image suggestion {}", i + 1)}))
        .collect();

    ReviewRequest::new(form_id)
        .with_field("ai_markdown", input.ai_text.clone())
        .with_field("ai_image", images)
}

/// Build the tool table of the blog-post pipeline
pub fn blog_tools(deps: BlogToolDeps) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    let topic_schema = json!({
        "type": "object",
        "properties": {"topic": {"type": "string", "description": "The topic of the blog post"}},
        "required": ["topic"]
    });

    let llm = deps.llm.clone();
    let copywriter = deps.copywriter.clone();
    registry.register_fn(
        ToolDefinition::new(WRITE_BLOG_POST_TOOL, "Write a blog post.", topic_schema.clone()),
        move |input: TopicInput| {
            let llm = llm.clone();
            let copywriter = copywriter.clone();
            async move {
                let messages = vec![
                    Message::system(COPYWRITER_PROMPT),
                    Message::user(format!("The topic is: {}", input.topic)),
                ];
                match llm.complete(CompletionRequest::new(&copywriter, messages)).await {
                    Ok(completion) => Ok(ToolResult::text(completion.message.content)),
                    Err(e) => {
                        warn!("Copywriting failed: {}", e);
                        Ok(ToolResult::error(format!(
                            "An error occurred while writing the blog post: {}",
                            e
                        )))
                    }
                }
            }
        },
    )?;

    let images = deps.images.clone();
    let image_settings = deps.image_settings.clone();
    registry.register_fn(
        ToolDefinition::new(
            GENERATE_IMAGES_TOOL,
            "Generate header images for a blog post.",
            topic_schema,
        ),
        move |input: TopicInput| {
            let images = images.clone();
            let image_settings = image_settings.clone();
            async move {
                let urls = images
                    .generate_images(ImageRequest {
                        prompt: format!("Photorealistic image about: {}.", input.topic),
                        count: image_settings.count,
                        style: image_settings.style.clone(),
                        model: image_settings.model.clone(),
                    })
                    .await?;
                info!("Generated {} images", urls.len());
                Ok(ToolResult::json(json!(urls)))
            }
        },
    )?;

    let review = deps.review.clone();
    let form_id = deps.form_id.clone();
    registry.register_fn(
        ToolDefinition::new(
            REQUEST_APPROVAL_TOOL,
            "Request approval from a human reviewer for a blog post written in markdown with images to choose from.",
            json!({
                "type": "object",
                "properties": {
                    "ai_text": {"type": "string", "description": "The text of the blog post"},
                    "ai_image_urls": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "The URLs of the suggested images"
                    }
                },
                "required": ["ai_text", "ai_image_urls"]
            }),
        ),
        move |input: ApprovalInput| {
            let review = review.clone();
            let request = approval_request(&form_id, &input);
            async move {
                match review.request_review(request).await {
                    Ok(link) => Ok(ToolResult::text(link.link)),
                    Err(e) => {
                        warn!("Review request failed: {}", e);
                        Ok(ToolResult::error(format!(
                            "An error occurred while sending the review request: {}",
                            e
                        )))
                    }
                }
            }
        },
    )?;

    Ok(registry)
}
