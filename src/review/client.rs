use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

use crate::config::ReviewSettings;
use crate::error::{Error, Result};
use crate::review::types::{ReviewLink, ReviewRequest, ReviewService};

/// Client for a gotoHuman-compatible review API
#[derive(Debug, Clone)]
pub struct GotoHumanClient {
    /// Base URL for the API
    api_url: String,
    /// API key sent as `x-api-key`
    api_key: String,
    /// HTTP client for making requests
    client: Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestReviewResponse {
    #[serde(default)]
    gth_link: Option<String>,
    #[serde(default)]
    review_id: Option<String>,
}

impl GotoHumanClient {
    /// Create a new client; an API key is required
    pub fn new(settings: &ReviewSettings, timeout_secs: u64) -> Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| Error::Config("review.api_key (GOTOHUMAN_API_KEY) is not set".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl ReviewService for GotoHumanClient {
    #[instrument(skip(self, request), fields(form_id = %request.form_id))]
    async fn request_review(&self, request: ReviewRequest) -> Result<ReviewLink> {
        let endpoint = format!("{}/requestReview", self.api_url);
        debug!("Requesting review via {}", endpoint);

        let response = self
            .client
            .post(&endpoint)
            .header("x-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("Review API error ({}): {}", status, error_text);
            return Err(Error::Review(format!("API error ({}): {}", status, error_text)));
        }

        let body: RequestReviewResponse = response.json().await?;
        let link = body
            .gth_link
            .ok_or_else(|| Error::Review("response did not include a review link".to_string()))?;

        info!("Requested human review: {}", link);
        Ok(ReviewLink {
            link,
            review_id: body.review_id,
        })
    }
}
