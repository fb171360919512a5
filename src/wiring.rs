//! Construction of the services from [`Settings`].
//!
//! Every client is built here once and passed down explicitly.

use std::sync::Arc;
use tracing::info;

use crate::config::{Settings, StoreBackend, StoreSettings};
use crate::error::Result;
use crate::llm::OpenAiClient;
use crate::review::GotoHumanClient;
use crate::server::AppState;
use crate::store::{FileStore, MemoryStore, ThreadStore};
use crate::tools::blog::{blog_tools, BlogToolDeps};
use crate::tools::sales::{sales_tools, SalesToolDeps};
use crate::tools::FirecrawlClient;
use crate::workflow::{AgentStep, BlogPipeline, EngineConfig, LeadWorkflow};

/// Build the configured thread store
pub fn build_store(settings: &StoreSettings) -> Arc<dyn ThreadStore> {
    match settings.backend {
        StoreBackend::Memory => {
            info!("Using in-memory thread store");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::File => {
            info!("Using file thread store at {}", settings.path.display());
            Arc::new(FileStore::new(settings.path.clone()))
        }
    }
}

/// Build the lead workflow with the sales tools
pub fn build_lead_workflow(settings: &Settings) -> Result<LeadWorkflow> {
    let llm = Arc::new(OpenAiClient::new(settings.llm.client_config())?);
    let scraper = Arc::new(FirecrawlClient::new(&settings.scraper, settings.llm.timeout_secs)?);

    let tools = sales_tools(SalesToolDeps {
        llm: llm.clone(),
        scraper,
        summarizer: settings.llm.summarizer.clone(),
        drafter: settings.llm.drafter.clone(),
        lead: settings.lead.clone(),
    })?;
    let agent = AgentStep::new(llm, Arc::new(tools), settings.llm.agent.clone());

    Ok(LeadWorkflow::new(agent, build_store(&settings.store))
        .with_config(EngineConfig::from_settings(&settings.engine, &settings.lead)))
}

/// Build the HTTP handler state
pub fn build_app_state(settings: &Settings) -> Result<AppState> {
    let form_id = settings.review.email_form()?.to_string();
    let review = Arc::new(GotoHumanClient::new(&settings.review, settings.llm.timeout_secs)?);

    Ok(AppState {
        workflow: Arc::new(build_lead_workflow(settings)?),
        review,
        form_id,
    })
}

/// Build the blog-post pipeline
pub fn build_blog_pipeline(settings: &Settings) -> Result<BlogPipeline> {
    let llm = Arc::new(OpenAiClient::new(settings.llm.client_config())?);
    let review = Arc::new(GotoHumanClient::new(&settings.review, settings.llm.timeout_secs)?);

    let tools = blog_tools(BlogToolDeps {
        llm: llm.clone(),
        images: llm.clone(),
        review,
        copywriter: settings.llm.copywriter.clone(),
        image_settings: settings.images.clone(),
        form_id: settings.review.blog_form()?.to_string(),
    })?;
    let agent = AgentStep::new(llm, Arc::new(tools), settings.llm.agent.clone());

    Ok(BlogPipeline::new(agent, settings.engine.max_steps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_backend_selected() {
        let temp_dir = TempDir::new().unwrap();
        let settings = StoreSettings {
            backend: StoreBackend::File,
            path: temp_dir.path().to_path_buf(),
        };
        let store = build_store(&settings);
        assert!(format!("{:?}", store).contains("FileStore"));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[test]
    fn test_app_state_requires_review_form() {
        let settings = Settings::default();
        let err = build_app_state(&settings).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
