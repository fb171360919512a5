use async_trait::async_trait;
use std::fmt;
use tracing::info;

use crate::error::Result;
use crate::telemetry::preview;

/// Delivers an approved outreach email
#[async_trait]
pub trait EmailSender: Send + Sync + fmt::Debug {
    /// Send `body` to `recipient`
    async fn send(&self, recipient: &str, body: &str) -> Result<()>;
}

/// Sender that only records the email in the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, recipient: &str, body: &str) -> Result<()> {
        info!(recipient, "Sending email: {}", preview(body, 100));
        Ok(())
    }
}
