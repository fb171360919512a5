//! Logging and metrics for the agent
//!
//! Everything goes through `tracing`. Metrics are structured events on the
//! `metrics` target so any subscriber can pick them up without a separate
//! metrics pipeline.

use tracing::span;

use crate::config::LoggerSettings;

/// Configuration for the telemetry system
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Name of the service
    pub service_name: String,
    /// Colored console output
    pub enable_ansi: bool,
    /// Log level used when `RUST_LOG` is not set
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "hitl-agent".to_string(),
            enable_ansi: true,
            log_level: "info".to_string(),
        }
    }
}

impl From<&LoggerSettings> for TelemetryConfig {
    fn from(settings: &LoggerSettings) -> Self {
        Self {
            enable_ansi: settings.ansi,
            log_level: settings.level.clone(),
            ..Self::default()
        }
    }
}

/// Initialize the global tracing subscriber
pub fn init_telemetry(config: TelemetryConfig) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_ansi(config.enable_ansi)
        .try_init()?;

    tracing::debug!(service = %config.service_name, "Telemetry initialized");
    Ok(())
}

/// Set an error flag and message on the current span
pub fn set_error_on_current_span(err: &dyn std::error::Error) {
    span::Span::current().record("error", true);
    span::Span::current().record("error.msg", err.to_string().as_str());
}

/// Add a single metric with tags to the telemetry system
pub fn add_metric(name: &str, value: f64, tags: &[(&str, String)]) {
    let tags_str = tags
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",");

    tracing::info!(
        target: "metrics",
        metric_name = %name,
        metric_value = %value,
        metric_tags = %tags_str,
        "Recorded metric"
    );
}

/// First `max_chars` characters of `text`, for log lines
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
