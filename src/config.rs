//! Environment-provided application settings.
//!
//! Settings are built once at startup from embedded defaults overlaid with
//! environment variables (`JIRA_URL` maps to `jira_url`, and so on) and then
//! passed by reference to whichever component needs them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while building [`Settings`]
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("required environment variable {0} is not set")]
    Missing(&'static str),
}

/// Which completion API to talk to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    #[default]
    OpenAi,
    Anthropic,
}

impl LlmProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProviderKind::OpenAi => "openai",
            LlmProviderKind::Anthropic => "anthropic",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Jira base URL, e.g. `https://your-domain.atlassian.net`
    pub jira_url: String,
    pub jira_username: String,
    pub jira_api_token: String,
    /// Fallback project key when neither the story nor the global block sets one
    pub jira_project_key: String,

    pub openai_api_key: String,
    pub anthropic_api_key: String,
    pub openai_base_url: String,
    pub anthropic_base_url: String,

    pub llm_provider: LlmProviderKind,
    pub llm_model: String,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,

    /// Only read by the vector-store collaborator
    pub chroma_persist_directory: String,

    pub log_level: String,
    /// When set, logs are also written to a timestamped file in this directory
    #[serde(default)]
    pub log_dir: Option<String>,

    pub max_retries: u32,
    pub timeout_seconds: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            jira_url: String::new(),
            jira_username: String::new(),
            jira_api_token: String::new(),
            jira_project_key: String::new(),
            openai_api_key: String::new(),
            anthropic_api_key: String::new(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            anthropic_base_url: "https://api.anthropic.com".to_string(),
            llm_provider: LlmProviderKind::OpenAi,
            llm_model: "gpt-4".to_string(),
            llm_temperature: 0.7,
            llm_max_tokens: 1000,
            chroma_persist_directory: "./data/chroma_db".to_string(),
            log_level: "info".to_string(),
            log_dir: None,
            max_retries: 3,
            timeout_seconds: 30,
        }
    }
}

impl Settings {
    /// Load settings from the process environment
    pub fn load() -> Result<Self, SettingsError> {
        Self::build(config::Environment::default())
    }

    /// Load settings from an explicit variable map instead of the process environment
    pub fn from_env_map(vars: HashMap<String, String>) -> Result<Self, SettingsError> {
        let source = vars.into_iter().collect();
        Self::build(config::Environment::default().source(Some(source)))
    }

    fn build(env: config::Environment) -> Result<Self, SettingsError> {
        // Start with embedded defaults so only credentials are mandatory
        let defaults = serde_json::to_string(&Settings::default())
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let settings = config::Config::builder()
            .add_source(config::File::from_str(&defaults, config::FileFormat::Json))
            // Values stay strings; numeric fields are converted on deserialize
            .add_source(env)
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Check that every setting the tracker needs is present
    pub fn validate(&self) -> Result<(), SettingsError> {
        let required = [
            ("JIRA_URL", &self.jira_url),
            ("JIRA_USERNAME", &self.jira_username),
            ("JIRA_API_TOKEN", &self.jira_api_token),
            ("JIRA_PROJECT_KEY", &self.jira_project_key),
        ];

        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(SettingsError::Missing(name));
            }
        }
        Ok(())
    }

    /// API key for the selected completion provider (may be empty)
    pub fn llm_api_key(&self) -> &str {
        match self.llm_provider {
            LlmProviderKind::OpenAi => &self.openai_api_key,
            LlmProviderKind::Anthropic => &self.anthropic_api_key,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}
