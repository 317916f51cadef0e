//! OpenAI chat completions provider

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::{non_empty, with_transport_retries, ChatMessage, CompletionOptions, CompletionProvider};
use crate::api::error::{retry_after_secs, ApiError};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const PROVIDER_NAME: &str = "openai";

pub struct OpenAiProvider {
    api_key: String,
    base_url: String,
    options: CompletionOptions,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>, options: CompletionOptions) -> Result<Self, ApiError> {
        Self::with_base_url(api_key, OPENAI_API_BASE, options)
    }

    /// Create a provider against a custom endpoint (proxies, compatible servers, tests)
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

    async fn send_once(&self, messages: &[ChatMessage], max_tokens: u32) -> Result<String, ApiError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %self.options.model, max_tokens, "OpenAI POST: {}", url);

        let body = ChatCompletionRequest {
            model: &self.options.model,
            messages,
            temperature: self.options.temperature,
            max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                ApiError::from_reqwest(PROVIDER_NAME, &e, self.options.timeout.as_secs())
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after_secs(response.headers());
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(
                PROVIDER_NAME,
                status.as_u16(),
                text,
                retry_after,
            ));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ApiError::http(PROVIDER_NAME, status.as_u16(), format!("Parse error: {}", e)))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content);

        non_empty(PROVIDER_NAME, text)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
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
            error!("OpenAI generation failed: {}", e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_name() {
        let provider = OpenAiProvider::new("sk-test", CompletionOptions::default()).unwrap();
        assert_eq!(provider.name(), "openai");
        assert!(provider.is_configured());
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let provider = OpenAiProvider::with_base_url(
            "sk-test",
            "http://localhost:8080/v1/",
            CompletionOptions::default(),
        )
        .unwrap();
        assert_eq!(provider.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_request_body_shape() {
        let messages = [ChatMessage::user("Expand this")];
        let body = ChatCompletionRequest {
            model: "gpt-4",
            messages: &messages,
            temperature: 0.5,
            max_tokens: 256,
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-4");
        assert_eq!(json["max_tokens"], 256);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Expand this");
    }

    #[tokio::test]
    async fn test_unconfigured_fails_before_network() {
        let provider = OpenAiProvider::with_base_url(
            "",
            "http://127.0.0.1:9",
            CompletionOptions::default(),
        )
        .unwrap();

        let err = provider.complete(&[ChatMessage::user("hi")]).await.unwrap_err();
        assert_eq!(err, ApiError::not_configured("openai"));
    }
}
