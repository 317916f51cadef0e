//! Anthropic messages API provider

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::{
    non_empty, with_transport_retries, ChatMessage, CompletionOptions, CompletionProvider, Role,
};
use crate::api::error::{retry_after_secs, ApiError};

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com";
const ANTHROPIC_API_VERSION: &str = "2023-06-01";
const PROVIDER_NAME: &str = "anthropic";

pub struct AnthropicProvider {
    api_key: String,
    base_url: String,
    options: CompletionOptions,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct MessageRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>, options: CompletionOptions) -> Result<Self, ApiError> {
        Self::with_base_url(api_key, ANTHROPIC_API_BASE, options)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        options: CompletionOptions,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("agent-jira/", env!("CARGO_PKG_VERSION")))
            .timeout(options.timeout)
            .build()
            .map_err(|e| ApiError::network(PROVIDER_NAME, e.to_string()))?;

        Ok(Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            options,
            client,
        })
    }

    /// System messages travel in the top-level `system` field
    fn build_request<'a>(&'a self, messages: &'a [ChatMessage], max_tokens: u32) -> MessageRequest<'a> {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();

        MessageRequest {
            model: &self.options.model,
            max_tokens,
            temperature: self.options.temperature,
            system: if system.is_empty() {
                None
            } else {
                Some(system.join("\n\n"))
            },
            messages: messages
                .iter()
                .filter(|m| m.role != Role::System)
                .map(|m| Message {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
        }
    }

    async fn send_once(&self, messages: &[ChatMessage], max_tokens: u32) -> Result<String, ApiError> {
        let url = format!("{}/v1/messages", self.base_url);
        debug!(model = %self.options.model, max_tokens, "Anthropic POST: {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .json(&self.build_request(messages, max_tokens))
            .send()
            .await
            .map_err(|e| {
                ApiError::from_reqwest(PROVIDER_NAME, &e, self.options.timeout.as_secs())
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after_secs(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(
                PROVIDER_NAME,
                status.as_u16(),
                body,
                retry_after,
            ));
        }

        let parsed: MessageResponse = response
            .json()
            .await
            .map_err(|e| ApiError::http(PROVIDER_NAME, status.as_u16(), format!("Parse error: {}", e)))?;

        let text: String = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();

        non_empty(PROVIDER_NAME, Some(text))
    }
}

#[async_trait]
impl CompletionProvider for AnthropicProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn options(&self) -> &CompletionOptions {
        &self.options
    }

    async fn complete_with_max_tokens(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
    ) -> Result<String, ApiError> {
        if !self.is_configured() {
            return Err(ApiError::not_configured(PROVIDER_NAME));
        }

        let result = with_transport_retries(&self.options, PROVIDER_NAME, move || async move {
            self.send_once(messages, max_tokens).await
        })
        .await;

        if let Err(ref e) = result {
            error!("Anthropic generation failed: {}", e);
        }
        result
    }
}
