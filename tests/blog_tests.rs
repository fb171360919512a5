mod common;

use common::{tool_call, BlogHarness, FakeReview};
use hitl_agent::llm::{Message, MessageRole};
use hitl_agent::workflow::BlogPipeline;
use hitl_agent::Error;
use serde_json::json;

fn blog_script() -> Vec<Message> {
    vec![
        tool_call("c1", "write_blog_post", json!({"topic": "the weather in NYC"})),
        tool_call("c2", "generate_images", json!({"topic": "the weather in NYC"})),
        tool_call(
            "c3",
            "request_approval",
            json!({
                "ai_text": "# Weather in NYC\n\nIt rains.",
                "ai_image_urls": ["https://img.test/1.png", "https://img.test/2.png", "https://img.test/3.png"]
            }),
        ),
        Message::assistant("The blog post was sent for approval."),
    ]
}

#[tokio::test]
async fn test_blog_pipeline_returns_review_link() {
    let harness = BlogHarness::new(blog_script(), FakeReview::default());

    let outcome = harness.pipeline.run("the weather in NYC").await.unwrap();

    assert_eq!(outcome.review_link.as_deref(), Some("https://app.gotohuman.com/review/1"));
    assert_eq!(outcome.final_message, "The blog post was sent for approval.");
    assert_eq!(
        outcome.messages[0].content,
        BlogPipeline::seed_message("the weather in NYC")
    );
    assert_eq!(outcome.messages[2].content, "# Weather in NYC\n\nIt rains.");
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&outcome.messages[4].content).unwrap(),
        json!(["https://img.test/1.png", "https://img.test/2.png", "https://img.test/3.png"])
    );

    let prompts = harness.images.prompts.lock().unwrap();
    assert_eq!(prompts[0].prompt, "Photorealistic image about: the weather in NYC.");
    assert_eq!(prompts[0].count, 3);
    assert_eq!(prompts[0].style, "natural");

    let request = harness.review.last();
    assert_eq!(request.form_id, "blog-form");
    assert_eq!(request.fields["ai_markdown"], "# Weather in NYC\n\nIt rains.");
    assert_eq!(request.fields["ai_image"][2]["label"], "AI image suggestion 3");

    let copy_requests = harness.llm.tool_requests.lock().unwrap();
    assert_eq!(copy_requests[0].messages[1].content, "The topic is: the weather in NYC");
}

#[tokio::test]
async fn test_review_failure_is_reported_to_the_model() {
    let harness = BlogHarness::new(blog_script(), FakeReview::failing());

    let outcome = harness.pipeline.run("the weather in NYC").await.unwrap();

    assert_eq!(outcome.review_link, None);
    let approval = &outcome.messages[6];
    assert_eq!(approval.role, MessageRole::Tool);
    assert!(approval.content.starts_with("An error occurred while sending the review request"));
}

#[tokio::test]
async fn test_blog_pipeline_step_budget() {
    let looping = (0..30)
        .map(|i| tool_call(&format!("c{}", i), "generate_images", json!({"topic": "loops"})))
        .collect();
    let harness = BlogHarness::new(looping, FakeReview::default());

    let err = harness.pipeline.run("loops").await.unwrap_err();
    assert!(matches!(err, Error::StepLimitExceeded(25)));
}
