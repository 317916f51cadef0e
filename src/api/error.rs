//! API error types shared by the completion and tracker clients

use std::fmt;

/// Errors that can occur when interacting with external APIs
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// 401 Unauthorized - credentials invalid or expired
    Unauthorized { provider: String },
    /// 403 Forbidden - credentials lack required permissions
    Forbidden { provider: String },
    /// 429 Rate Limited
    RateLimited {
        provider: String,
        retry_after_secs: Option<u64>,
    },
    /// Connection or transport error
    NetworkError { provider: String, message: String },
    /// Request exceeded the configured timeout
    Timeout { provider: String, timeout_secs: u64 },
    /// Other HTTP errors
    HttpError {
        provider: String,
        status: u16,
        message: String,
    },
    /// Provider not configured (no credentials in environment)
    NotConfigured { provider: String },
    /// Upstream answered successfully but returned no candidate text
    EmptyResponse { provider: String },
    /// Request rejected locally before any network call
    Validation { provider: String, field: String },
}

impl ApiError {
    /// Check if this is an authentication error (401 or 403)
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            ApiError::Unauthorized { .. } | ApiError::Forbidden { .. }
        )
    }

    /// Check if this is a rate limiting error
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ApiError::RateLimited { .. })
    }

    /// Transport-level failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::NetworkError { .. }
            | ApiError::Timeout { .. }
            | ApiError::RateLimited { .. } => true,
            ApiError::HttpError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Get the provider name for this error
    pub fn provider_name(&self) -> &str {
        match self {
            ApiError::Unauthorized { provider }
            | ApiError::Forbidden { provider }
            | ApiError::RateLimited { provider, .. }
            | ApiError::NetworkError { provider, .. }
            | ApiError::Timeout { provider, .. }
            | ApiError::HttpError { provider, .. }
            | ApiError::NotConfigured { provider }
            | ApiError::EmptyResponse { provider }
            | ApiError::Validation { provider, .. } => provider,
        }
    }

    /// Get retry-after seconds if rate limited
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            ApiError::RateLimited {
                retry_after_secs, ..
            } => *retry_after_secs,
            _ => None,
        }
    }

    pub fn unauthorized(provider: impl Into<String>) -> Self {
        ApiError::Unauthorized {
            provider: provider.into(),
        }
    }

    pub fn forbidden(provider: impl Into<String>) -> Self {
        ApiError::Forbidden {
            provider: provider.into(),
        }
    }

    pub fn rate_limited(provider: impl Into<String>, retry_after: Option<u64>) -> Self {
        ApiError::RateLimited {
            provider: provider.into(),
            retry_after_secs: retry_after,
        }
    }

    pub fn network(provider: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::NetworkError {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn timeout(provider: impl Into<String>, timeout_secs: u64) -> Self {
        ApiError::Timeout {
            provider: provider.into(),
            timeout_secs,
        }
    }

    pub fn http(provider: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        ApiError::HttpError {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    pub fn not_configured(provider: impl Into<String>) -> Self {
        ApiError::NotConfigured {
            provider: provider.into(),
        }
    }

    pub fn empty_response(provider: impl Into<String>) -> Self {
        ApiError::EmptyResponse {
            provider: provider.into(),
        }
    }

    pub fn validation(provider: impl Into<String>, field: impl Into<String>) -> Self {
        ApiError::Validation {
            provider: provider.into(),
            field: field.into(),
        }
    }

    /// Map a non-success HTTP status to the matching variant.
    ///
    /// `retry_after` is only consulted for 429 responses.
    pub fn from_status(
        provider: impl Into<String>,
        status: u16,
        body: impl Into<String>,
        retry_after: Option<u64>,
    ) -> Self {
        match status {
            401 => ApiError::unauthorized(provider),
            403 => ApiError::forbidden(provider),
            429 => ApiError::rate_limited(provider, retry_after),
            _ => ApiError::http(provider, status, body),
        }
    }

    /// Classify a reqwest transport failure
    pub fn from_reqwest(provider: impl Into<String>, err: &reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            ApiError::timeout(provider, timeout_secs)
        } else {
            ApiError::network(provider, err.to_string())
        }
    }
}

/// Seconds from a `Retry-After` header, when present and numeric
pub fn retry_after_secs(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized { provider } => {
                write!(f, "{}: Unauthorized (401) - check credentials", provider)
            }
            ApiError::Forbidden { provider } => {
                write!(
                    f,
                    "{}: Forbidden (403) - insufficient permissions",
                    provider
                )
            }
            ApiError::RateLimited {
                provider,
                retry_after_secs,
            } => {
                if let Some(secs) = retry_after_secs {
                    write!(f, "{}: Rate limited - retry after {}s", provider, secs)
                } else {
                    write!(f, "{}: Rate limited", provider)
                }
            }
            ApiError::NetworkError { provider, message } => {
                write!(f, "{}: Network error - {}", provider, message)
            }
            ApiError::Timeout {
                provider,
                timeout_secs,
            } => {
                write!(f, "{}: Request timed out after {}s", provider, timeout_secs)
            }
            ApiError::HttpError {
                provider,
                status,
                message,
            } => {
                write!(f, "{}: HTTP {} - {}", provider, status, message)
            }
            ApiError::NotConfigured { provider } => {
                write!(f, "{}: Not configured (no API credentials)", provider)
            }
            ApiError::EmptyResponse { provider } => {
                write!(f, "{}: Empty response from model", provider)
            }
            ApiError::Validation { provider, field } => {
                write!(
                    f,
                    "{}: Required field '{}' is missing from issue data",
                    provider, field
                )
            }
        }
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};

    #[test]
    fn test_retry_after_secs() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after_secs(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("30"));
        assert_eq!(retry_after_secs(&headers), Some(30));

        // HTTP-date form is not interpreted
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(retry_after_secs(&headers), None);
    }

    #[test]
    fn test_is_auth_error() {
        assert!(ApiError::unauthorized("test").is_auth_error());
        assert!(ApiError::forbidden("test").is_auth_error());
        assert!(!ApiError::rate_limited("test", None).is_auth_error());
        assert!(!ApiError::network("test", "timeout").is_auth_error());
    }

    #[test]
    fn test_is_retryable() {
        assert!(ApiError::network("openai", "connection reset").is_retryable());
        assert!(ApiError::timeout("openai", 30).is_retryable());
        assert!(ApiError::rate_limited("openai", Some(2)).is_retryable());
        assert!(ApiError::http("openai", 503, "unavailable").is_retryable());

        assert!(!ApiError::http("openai", 400, "bad request").is_retryable());
        assert!(!ApiError::unauthorized("openai").is_retryable());
        assert!(!ApiError::empty_response("openai").is_retryable());
        assert!(!ApiError::validation("jira", "summary").is_retryable());
    }

    #[test]
    fn test_from_status() {
        assert_eq!(
            ApiError::from_status("jira", 401, "", None),
            ApiError::unauthorized("jira")
        );
        assert_eq!(
            ApiError::from_status("jira", 429, "", Some(10)),
            ApiError::rate_limited("jira", Some(10))
        );
        assert_eq!(
            ApiError::from_status("jira", 400, "Field 'summary' is required", None),
            ApiError::http("jira", 400, "Field 'summary' is required")
        );
    }

    #[test]
    fn test_provider_name() {
        assert_eq!(
            ApiError::unauthorized("anthropic").provider_name(),
            "anthropic"
        );
        assert_eq!(ApiError::empty_response("openai").provider_name(), "openai");
        assert_eq!(
            ApiError::validation("jira", "project").provider_name(),
            "jira"
        );
    }

    #[test]
    fn test_display() {
        let err = ApiError::rate_limited("anthropic", Some(30));
        assert_eq!(err.to_string(), "anthropic: Rate limited - retry after 30s");

        let err = ApiError::empty_response("openai");
        assert_eq!(err.to_string(), "openai: Empty response from model");

        let err = ApiError::validation("jira", "issuetype");
        assert_eq!(
            err.to_string(),
            "jira: Required field 'issuetype' is missing from issue data"
        );
    }
}
