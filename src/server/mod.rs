//! HTTP entry point.
//!
//! ```text
//! POST /                    trigger a lead thread or deliver a review
//! GET  /health              liveness
//! GET  /threads/:thread_id  inspect a thread checkpoint
//! ```

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::error::{Error, Result};
use crate::review::{ReviewRequest, ReviewService};
use crate::workflow::{Checkpoint, LeadWorkflow, ResumeSignal, RunOutcome};

mod request;
mod response;

pub use request::InboundRequest;
pub use response::ApiError;

/// Shared state of the HTTP handlers
#[derive(Debug, Clone)]
pub struct AppState {
    /// The lead workflow
    pub workflow: Arc<LeadWorkflow>,
    /// Review service drafts are sent to
    pub review: Arc<dyn ReviewService>,
    /// Review form for email drafts
    pub form_id: String,
}

/// Build the router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(process_request))
        .route("/health", get(health))
        .route("/threads/:thread_id", get(get_thread))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until the process stops
pub async fn serve(state: AppState, addr: &str) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn get_thread(
    Path(thread_id): Path<String>,
    State(state): State<AppState>,
) -> std::result::Result<Json<Checkpoint>, ApiError> {
    let checkpoint = state
        .workflow
        .checkpoint(&thread_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("thread {}", thread_id)))?;
    Ok(Json(checkpoint))
}

#[instrument(skip_all)]
async fn process_request(
    State(state): State<AppState>,
    body: Bytes,
) -> std::result::Result<Json<Value>, ApiError> {
    let body: Value = serde_json::from_slice(&body)
        .map_err(|e| Error::InvalidRequest(format!("malformed JSON body: {}", e)))?;

    let outcome = match InboundRequest::parse(&body)? {
        InboundRequest::Trigger { thread_id, email } => {
            info!("Starting graph for thread {} with email address: {}", thread_id, email);
            state.workflow.start(&thread_id, &email).await?
        }
        InboundRequest::Review {
            thread_id,
            interrupt_id,
            decision,
        } => {
            info!("Review for thread {}: {}", thread_id, decision.decision);
            let mut signal = ResumeSignal::new(decision);
            if let Some(id) = interrupt_id {
                signal = signal.for_interrupt(id);
            }
            state.workflow.resume(&thread_id, signal).await?
        }
    };

    let checkpoint = match outcome {
        RunOutcome::Suspended(checkpoint) if checkpoint.review_link().is_none() => {
            state
                .workflow
                .ensure_review_link(&checkpoint.thread_id, |checkpoint| request_review(&state, checkpoint))
                .await?
        }
        outcome => outcome.into_checkpoint(),
    };

    if checkpoint.is_suspended() {
        let link = checkpoint
            .review_link()
            .ok_or_else(|| Error::contract("suspended thread without a review link"))?;
        return Ok(Json(json!({
            "message": "The email draft needs human review.",
            "link": link,
            "threadId": checkpoint.thread_id,
        })));
    }

    info!("Graph ended for thread {}", checkpoint.thread_id);
    Ok(Json(json!({
        "message": "Graph ended",
        "threadId": checkpoint.thread_id,
    })))
}

/// Send the pending draft of a suspended thread for review
async fn request_review(state: &AppState, checkpoint: Checkpoint) -> Result<String> {
    let suspension = checkpoint
        .suspension
        .as_ref()
        .ok_or_else(|| Error::contract("suspended thread without a suspension point"))?;
    let draft = suspension
        .email_draft()
        .ok_or_else(|| Error::contract("suspension point without an email draft"))?;

    let request = ReviewRequest::new(&state.form_id)
        .with_field("email", checkpoint.state.email_address.clone())
        .with_field(
            "emailDomain",
            json!({
                "url": checkpoint.state.lead_website_url.clone().unwrap_or_default(),
                "label": "Website checked",
            }),
        )
        .with_field("emailDraft", draft)
        .with_meta("threadId", checkpoint.thread_id.clone())
        .with_meta("interruptId", suspension.id.clone());

    let link = state.review.request_review(request).await?;
    Ok(link.link)
}
