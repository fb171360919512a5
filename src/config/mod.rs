use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use url::Url;

use crate::error::{Error, Result};
use crate::llm::{LlmConfig, ModelSettings};

/// Settings for the HITL agent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// HTTP entry point settings
    #[serde(default)]
    pub server: ServerSettings,

    /// Language model settings
    #[serde(default)]
    pub llm: LlmSettings,

    /// Image generation settings
    #[serde(default)]
    pub images: ImageSettings,

    /// Web scraping service settings
    #[serde(default)]
    pub scraper: ScraperSettings,

    /// Human-review service settings
    #[serde(default)]
    pub review: ReviewSettings,

    /// Thread persistence settings
    #[serde(default)]
    pub store: StoreSettings,

    /// Logger settings
    #[serde(default)]
    pub logger: LoggerSettings,

    /// Lead handling settings
    #[serde(default)]
    pub lead: LeadSettings,

    /// Workflow engine settings
    #[serde(default)]
    pub engine: EngineSettings,
}

/// Settings for the HTTP entry point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Address to bind, e.g. `0.0.0.0:8000`
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Settings for the language model provider and the models each role uses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_llm_url")]
    pub api_url: String,

    /// API key
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Model driving the tool-calling agent step
    #[serde(default = "default_agent_model")]
    pub agent: ModelSettings,

    /// Model used by the website summarizer tool
    #[serde(default = "default_summarizer_model")]
    pub summarizer: ModelSettings,

    /// Model used by the email drafting tool
    #[serde(default = "default_drafter_model")]
    pub drafter: ModelSettings,

    /// Model used by the blog copywriter tool
    #[serde(default = "default_copywriter_model")]
    pub copywriter: ModelSettings,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_url: default_llm_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            agent: default_agent_model(),
            summarizer: default_summarizer_model(),
            drafter: default_drafter_model(),
            copywriter: default_copywriter_model(),
        }
    }
}

impl LlmSettings {
    /// Connection settings for the LLM client
    pub fn client_config(&self) -> LlmConfig {
        LlmConfig {
            api_url: self.api_url.clone(),
            api_key: self.api_key.clone(),
            timeout_secs: self.timeout_secs,
        }
    }
}

/// Settings for header image generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSettings {
    /// Image model, provider default when unset
    pub model: Option<String>,

    /// Number of images to request
    #[serde(default = "default_image_count")]
    pub count: u32,

    /// Image style
    #[serde(default = "default_image_style")]
    pub style: String,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            model: None,
            count: default_image_count(),
            style: default_image_style(),
        }
    }
}

/// Settings for the scraping service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperSettings {
    /// Base URL of the Firecrawl-compatible API
    #[serde(default = "default_scraper_url")]
    pub api_url: String,

    /// API key
    pub api_key: Option<String>,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            api_url: default_scraper_url(),
            api_key: None,
        }
    }
}

/// Settings for the human-review service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSettings {
    /// Base URL of the gotoHuman-compatible API
    #[serde(default = "default_review_url")]
    pub api_url: String,

    /// API key
    pub api_key: Option<String>,

    /// Review form for outreach email drafts
    pub form_id: Option<String>,

    /// Review form for blog posts, falls back to `form_id`
    pub blog_form_id: Option<String>,
}

impl Default for ReviewSettings {
    fn default() -> Self {
        Self {
            api_url: default_review_url(),
            api_key: None,
            form_id: None,
            blog_form_id: None,
        }
    }
}

impl ReviewSettings {
    /// Form used for outreach email reviews
    pub fn email_form(&self) -> Result<&str> {
        self.form_id
            .as_deref()
            .ok_or_else(|| Error::Config("review.form_id is not set".to_string()))
    }

    /// Form used for blog post reviews
    pub fn blog_form(&self) -> Result<&str> {
        self.blog_form_id
            .as_deref()
            .or(self.form_id.as_deref())
            .ok_or_else(|| Error::Config("review.blog_form_id is not set".to_string()))
    }
}

/// Thread store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Keep threads in process memory
    #[default]
    Memory,
    /// One JSON file per thread
    File,
}

/// Settings for thread persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Backend to use
    #[serde(default)]
    pub backend: StoreBackend,

    /// Directory for the file backend
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
        }
    }
}

/// Logger settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerSettings {
    /// Log level, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Colored console output
    #[serde(default = "default_true")]
    pub ansi: bool,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            ansi: true,
        }
    }
}

/// Settings describing how leads are handled
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadSettings {
    /// Consumer email providers whose domains never point at a company website
    #[serde(default = "default_consumer_providers")]
    pub consumer_providers: Vec<String>,

    /// Name the outreach email is written for
    #[serde(default = "default_sender_name")]
    pub sender_name: String,

    /// Description of the sender's company
    #[serde(default = "default_sender_company")]
    pub sender_company_description: String,
}

impl Default for LeadSettings {
    fn default() -> Self {
        Self {
            consumer_providers: default_consumer_providers(),
            sender_name: default_sender_name(),
            sender_company_description: default_sender_company(),
        }
    }
}

/// Workflow engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Maximum steps per invocation before the run is aborted
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_llm_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_agent_model() -> ModelSettings {
    ModelSettings::new("gpt-4o").with_temperature(0.0)
}

fn default_summarizer_model() -> ModelSettings {
    ModelSettings::new("gpt-4o-mini").with_temperature(0.5)
}

fn default_drafter_model() -> ModelSettings {
    ModelSettings::new("gpt-4o-mini").with_temperature(0.75)
}

fn default_copywriter_model() -> ModelSettings {
    ModelSettings::new("gpt-4o-mini")
}

fn default_image_count() -> u32 {
    3
}

fn default_image_style() -> String {
    "natural".to_string()
}

fn default_scraper_url() -> String {
    "https://api.firecrawl.dev".to_string()
}

fn default_review_url() -> String {
    "https://api.gotohuman.com".to_string()
}

fn default_store_path() -> PathBuf {
    PathBuf::from("data/threads")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

/// Consumer mail providers recognised when deriving a lead's website
pub fn default_consumer_providers() -> Vec<String> {
    [
        "gmail", "yahoo", "ymail", "rocketmail", "outlook", "hotmail", "live", "msn", "icloud",
        "me", "mac", "aol", "zoho", "protonmail", "mail", "gmx",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_sender_name() -> String {
    "Jess".to_string()
}

fn default_sender_company() -> String {
    "FreshFruits is a premier subscription-based delivery service that brings farm-fresh, \
     seasonal fruit to offices and homes every week."
        .to_string()
}

fn default_max_steps() -> usize {
    25
}

impl Settings {
    /// Apply overrides from well-known environment variables
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            self.llm.api_url = url;
        }
        if let Some(key) = lookup("FIRECRAWL_API_KEY") {
            self.scraper.api_key = Some(key);
        }
        if let Some(key) = lookup("GOTOHUMAN_API_KEY") {
            self.review.api_key = Some(key);
        }
        if let Some(form) = lookup("GOTOHUMAN_FORM_ID") {
            self.review.form_id = Some(form);
        }
        if let Some(path) = lookup("HITL_STORE_PATH") {
            self.store.backend = StoreBackend::File;
            self.store.path = PathBuf::from(path);
        }
        if let Some(bind) = lookup("HITL_BIND") {
            self.server.bind = bind;
        }
    }
}

impl Settings {
    /// Check that every service URL parses
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("llm.api_url", &self.llm.api_url),
            ("scraper.api_url", &self.scraper.api_url),
            ("review.api_url", &self.review.api_url),
        ] {
            Url::parse(value).map_err(|e| Error::Config(format!("Invalid {} {:?}: {}", name, value, e)))?;
        }
        if self.engine.max_steps == 0 {
            return Err(Error::Config("engine.max_steps must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Load settings from a YAML file
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    let mut file = File::open(path)
        .map_err(|e| Error::Config(format!("Failed to open config file {}: {}", path.display(), e)))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| Error::Config(format!("Failed to read config file {}: {}", path.display(), e)))?;

    let settings: Settings = serde_yaml::from_str(&contents)?;
    Ok(settings)
}

/// Get settings, optionally from a specific file, with environment overrides applied
pub fn get_settings(config_path: Option<&Path>) -> Result<Settings> {
    let mut settings = match config_path {
        Some(path) => load_settings(path)?,
        None => {
            let default_paths = ["hitl_agent.config.yaml", "config/hitl_agent.config.yaml"];

            match default_paths.iter().map(Path::new).find(|p| p.exists()) {
                Some(path) => load_settings(path)?,
                None => Settings::default(),
            }
        }
    };

    settings.apply_env_overrides();
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.server.bind, "0.0.0.0:8000");
        assert_eq!(settings.llm.agent.model, "gpt-4o");
        assert_eq!(settings.llm.agent.temperature, Some(0.0));
        assert_eq!(settings.llm.drafter.temperature, Some(0.75));
        assert_eq!(settings.engine.max_steps, 25);
        assert_eq!(settings.store.backend, StoreBackend::Memory);
        assert_eq!(settings.lead.consumer_providers.len(), 16);
        assert!(settings.review.email_form().is_err());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
server:
  bind: "127.0.0.1:9000"
llm:
  agent:
    model: gpt-4.1
store:
  backend: file
  path: /tmp/threads
review:
  form_id: form-42
"#;
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.server.bind, "127.0.0.1:9000");
        assert_eq!(settings.llm.agent.model, "gpt-4.1");
        assert_eq!(settings.llm.agent.temperature, None);
        assert_eq!(settings.llm.summarizer.model, "gpt-4o-mini");
        assert_eq!(settings.store.backend, StoreBackend::File);
        assert_eq!(settings.review.email_form().unwrap(), "form-42");
        assert_eq!(settings.review.blog_form().unwrap(), "form-42");
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("OPENAI_API_KEY", "sk-test"),
            ("GOTOHUMAN_FORM_ID", "form-7"),
            ("HITL_STORE_PATH", "/var/lib/hitl"),
            ("FIRECRAWL_API_KEY", " "),
        ]);

        let mut settings = Settings::default();
        settings.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(settings.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(settings.review.form_id.as_deref(), Some("form-7"));
        assert_eq!(settings.store.backend, StoreBackend::File);
        assert_eq!(settings.store.path, PathBuf::from("/var/lib/hitl"));
        assert!(settings.scraper.api_key.is_none());
    }

    #[test]
    fn test_validate_rejects_bad_urls() {
        assert!(Settings::default().validate().is_ok());

        let mut settings = Settings::default();
        settings.scraper.api_url = "not a url".to_string();
        assert!(matches!(settings.validate(), Err(Error::Config(_))));

        let mut settings = Settings::default();
        settings.engine.max_steps = 0;
        assert!(matches!(settings.validate(), Err(Error::Config(_))));
    }
}
