//! Completion provider trait and implementations
//!
//! Supports OpenAI chat completions and Anthropic messages for story expansion.

mod anthropic;
mod openai;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::api::error::ApiError;
use crate::config::{LlmProviderKind, Settings};

/// Speaker of a conversational message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of a conversation sent to a completion provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Generation settings fixed when a provider is constructed
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
    /// Transport-level retry attempts after the first request
    pub max_retries: u32,
    /// First backoff delay between transport retries
    pub retry_min_delay: Duration,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_min_delay: Duration::from_millis(500),
        }
    }
}

impl CompletionOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            model: settings.llm_model.clone(),
            temperature: settings.llm_temperature,
            max_tokens: settings.llm_max_tokens,
            timeout: settings.timeout(),
            max_retries: settings.max_retries,
            ..Self::default()
        }
    }

    fn retry_strategy(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.retry_min_delay)
            .with_max_delay(Duration::from_secs(10))
            .with_max_times(self.max_retries as usize)
    }
}

/// Trait for language-model completion services
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Get the provider name (e.g., "openai", "anthropic")
    fn name(&self) -> &str;

    /// Check if the provider has an API key
    fn is_configured(&self) -> bool;

    fn options(&self) -> &CompletionOptions;

    /// Generate text with an explicit output token limit for this call only
    async fn complete_with_max_tokens(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
    ) -> Result<String, ApiError>;

    /// Generate text for a conversation using the configured token limit
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ApiError> {
        self.complete_with_max_tokens(messages, self.options().max_tokens)
            .await
    }

    /// Expand a rendered story prompt
    async fn generate_story_expansion(&self, prompt: &str) -> Result<String, ApiError> {
        self.complete(&[ChatMessage::user(prompt)]).await
    }

    /// Single-prompt completion, optionally overriding the output token limit
    async fn generate_completion(
        &self,
        prompt: &str,
        max_tokens: Option<u32>,
    ) -> Result<String, ApiError> {
        let max_tokens = max_tokens.unwrap_or(self.options().max_tokens);
        self.complete_with_max_tokens(&[ChatMessage::user(prompt)], max_tokens)
            .await
    }
}

/// Build the provider selected by `LLM_PROVIDER`
pub fn provider_from_settings(
    settings: &Settings,
) -> Result<Box<dyn CompletionProvider>, ApiError> {
    let options = CompletionOptions::from_settings(settings);
    let api_key = settings.llm_api_key().to_string();
    let provider: Box<dyn CompletionProvider> = match settings.llm_provider {
        LlmProviderKind::OpenAi => Box::new(OpenAiProvider::with_base_url(
            api_key,
            settings.openai_base_url.clone(),
            options,
        )?),
        LlmProviderKind::Anthropic => Box::new(AnthropicProvider::with_base_url(
            api_key,
            settings.anthropic_base_url.clone(),
            options,
        )?),
    };

    if !provider.is_configured() {
        warn!(
            provider = provider.name(),
            "No API key configured; story expansion will fail"
        );
    }
    Ok(provider)
}

/// Run one request, retrying transport-level failures with exponential backoff
pub(crate) async fn with_transport_retries<F, Fut>(
    options: &CompletionOptions,
    provider: &str,
    op: F,
) -> Result<String, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String, ApiError>>,
{
    op.retry(options.retry_strategy())
        .when(ApiError::is_retryable)
        .notify(|err, dur| {
            warn!(provider, "Retrying completion after {:?}: {}", dur, err);
        })
        .await
}

/// Extract a text candidate, rejecting missing or blank output
pub(crate) fn non_empty(provider: &str, text: Option<String>) -> Result<String, ApiError> {
    match text {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(ApiError::empty_response(provider)),
    }
}
