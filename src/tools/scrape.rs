use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, instrument};

use crate::config::ScraperSettings;
use crate::error::{Error, Result};
use crate::telemetry::add_metric;

/// Turns a web page into markdown
#[async_trait]
pub trait Scraper: Send + Sync + std::fmt::Debug {
    /// Scrape `url` and return its content as markdown
    async fn scrape(&self, url: &str) -> Result<String>;
}

/// Client for a Firecrawl-compatible scraping API
#[derive(Debug, Clone)]
pub struct FirecrawlClient {
    /// Base URL for the API
    api_url: String,
    /// API key
    api_key: Option<String>,
    /// HTTP client for making requests
    client: Client,
}

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    data: Option<ScrapeData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScrapeData {
    #[serde(default)]
    markdown: Option<String>,
}

impl FirecrawlClient {
    /// Create a new client
    pub fn new(settings: &ScraperSettings, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            client,
        })
    }
}

#[async_trait]
impl Scraper for FirecrawlClient {
    #[instrument(skip(self))]
    async fn scrape(&self, url: &str) -> Result<String> {
        let start = std::time::Instant::now();
        let endpoint = format!("{}/v1/scrape", self.api_url);
        debug!("Scraping {} via {}", url, endpoint);

        let mut request = self
            .client
            .post(&endpoint)
            .json(&json!({ "url": url, "formats": ["markdown"] }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("Scrape API error ({}): {}", status, error_text);
            return Err(Error::Scrape(format!("API error ({}): {}", status, error_text)));
        }

        let body: ScrapeResponse = response.json().await?;
        if body.success == Some(false) {
            return Err(Error::Scrape(
                body.error.unwrap_or_else(|| format!("scrape of {} failed", url)),
            ));
        }

        let markdown = body
            .data
            .and_then(|data| data.markdown)
            .ok_or_else(|| Error::Scrape(format!("no markdown returned for {}", url)))?;

        add_metric("scrape_duration_ms", start.elapsed().as_millis() as f64, &[
            ("bytes", markdown.len().to_string()),
        ]);

        Ok(markdown)
    }
}
