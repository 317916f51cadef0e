//! Jira issue tracker implementation

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::{CreatedIssue, IssueDetails, IssueRequest, IssueSummary, IssueTracker};
use crate::api::error::{retry_after_secs, ApiError};
use crate::config::Settings;

const PROVIDER_NAME: &str = "jira";

/// Jira REST API (v2) provider
pub struct JiraProvider {
    base_url: String,
    username: String,
    api_token: String,
    timeout_secs: u64,
    client: Client,
}

impl JiraProvider {
    /// Create a new Jira provider
    ///
    /// `base_url` is the site root, e.g. `https://your-domain.atlassian.net`.
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        api_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(concat!("agent-jira/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::network(PROVIDER_NAME, e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            username: username.into(),
            api_token: api_token.into(),
            timeout_secs: timeout.as_secs(),
            client,
        })
    }

    /// Create from `JIRA_URL`, `JIRA_USERNAME` and `JIRA_API_TOKEN`
    pub fn from_settings(settings: &Settings) -> Result<Self, ApiError> {
        let provider = Self::new(
            settings.jira_url.clone(),
            settings.jira_username.clone(),
            settings.jira_api_token.clone(),
            settings.timeout(),
        )?;

        if provider.is_configured() {
            Ok(provider)
        } else {
            Err(ApiError::not_configured(PROVIDER_NAME))
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/rest/api/2{}", self.base_url, path)
    }

    /// Browse URL for an issue key
    pub fn browse_url(&self, issue_key: &str) -> String {
        format!("{}/browse/{}", self.base_url, issue_key)
    }

    /// Send an authenticated request and map non-success statuses
    async fn execute(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request
            .basic_auth(&self.username, Some(&self.api_token))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(PROVIDER_NAME, &e, self.timeout_secs))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = retry_after_secs(response.headers());
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_status(
            PROVIDER_NAME,
            status.as_u16(),
            body,
            retry_after,
        ))
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status().as_u16();
        response
            .json()
            .await
            .map_err(|e| ApiError::http(PROVIDER_NAME, status, format!("Parse error: {}", e)))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.api_url(path);
        debug!("Jira GET: {}", url);
        let response = self.execute(self.client.get(&url)).await?;
        Self::parse(response).await
    }
}

// Jira API response types
#[derive(Debug, Deserialize)]
struct JiraCreatedIssue {
    id: String,
    key: String,
}

#[derive(Debug, Deserialize)]
struct JiraIssue {
    id: String,
    key: String,
    fields: JiraIssueFields,
}

#[derive(Debug, Deserialize)]
struct JiraIssueFields {
    #[serde(default)]
    summary: String,
    description: Option<String>,
    status: Option<JiraStatus>,
    assignee: Option<JiraUser>,
    reporter: Option<JiraUser>,
    created: Option<String>,
    updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JiraStatus {
    name: String,
}

#[derive(Debug, Deserialize)]
struct JiraUser {
    #[serde(rename = "displayName")]
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct JiraSearchResponse {
    #[serde(default)]
    issues: Vec<JiraIssue>,
}

impl JiraIssue {
    fn status_name(&self) -> String {
        self.fields
            .status
            .as_ref()
            .map(|s| s.name.clone())
            .unwrap_or_default()
    }

    fn into_summary(self) -> IssueSummary {
        let status = self.status_name();
        IssueSummary {
            key: self.key,
            id: self.id,
            summary: self.fields.summary,
            status,
            assignee: self.fields.assignee.map(|u| u.display_name),
        }
    }

    fn into_details(self) -> IssueDetails {
        let status = self.status_name();
        IssueDetails {
            key: self.key,
            id: self.id,
            summary: self.fields.summary,
            description: self.fields.description,
            status,
            assignee: self.fields.assignee.map(|u| u.display_name),
            reporter: self.fields.reporter.map(|u| u.display_name),
            created: self.fields.created,
            updated: self.fields.updated,
        }
    }
}

#[async_trait]
impl IssueTracker for JiraProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn is_configured(&self) -> bool {
        !self.base_url.is_empty() && !self.username.is_empty() && !self.api_token.is_empty()
    }

    async fn create_issue(&self, request: IssueRequest) -> Result<CreatedIssue, ApiError> {
        request.validate(PROVIDER_NAME)?;

        let url = self.api_url("/issue");
        debug!("Jira POST: {}", url);

        let result = async {
            let response = self
                .execute(self.client.post(&url).json(&json!({ "fields": &request })))
                .await?;
            Self::parse::<JiraCreatedIssue>(response).await
        }
        .await;

        match result {
            Ok(created) => {
                info!(key = %created.key, "Created Jira issue");
                Ok(CreatedIssue {
                    url: self.browse_url(&created.key),
                    key: created.key,
                    id: created.id,
                    summary: request.summary,
                    project: request.project.key,
                    dry_run: false,
                })
            }
            Err(e) => {
                error!("Failed to create Jira issue: {}", e);
                Err(e)
            }
        }
    }

    async fn get_issue(&self, issue_key: &str) -> Result<IssueDetails, ApiError> {
        self.get::<JiraIssue>(&format!("/issue/{}", issue_key))
            .await
            .map(JiraIssue::into_details)
            .inspect_err(|e| error!("Failed to get Jira issue {}: {}", issue_key, e))
    }

    async fn update_issue(
        &self,
        issue_key: &str,
        fields: serde_json::Value,
    ) -> Result<bool, ApiError> {
        let url = self.api_url(&format!("/issue/{}", issue_key));
        debug!("Jira PUT: {}", url);

        self.execute(self.client.put(&url).json(&json!({ "fields": fields })))
            .await
            .inspect_err(|e| error!("Failed to update Jira issue {}: {}", issue_key, e))?;

        info!(key = %issue_key, "Updated Jira issue");
        Ok(true)
    }

    async fn search_issues(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<IssueSummary>, ApiError> {
        let url = self.api_url("/search");
        debug!(jql = %query, max_results, "Jira GET: {}", url);

        let max = max_results.to_string();
        let result = async {
            let response = self
                .execute(
                    self.client
                        .get(&url)
                        .query(&[("jql", query), ("maxResults", max.as_str())]),
                )
                .await?;
            Self::parse::<JiraSearchResponse>(response).await
        }
        .await;

        match result {
            Ok(found) => Ok(found
                .issues
                .into_iter()
                .take(max_results as usize)
                .map(JiraIssue::into_summary)
                .collect()),
            Err(e) => {
                error!("Failed to search Jira issues: {}", e);
                Err(e)
            }
        }
    }

    async fn test_connection(&self) -> Result<bool, ApiError> {
        // Current user lookup verifies credentials
        #[derive(Deserialize)]
        struct MySelf {
            #[serde(rename = "accountId")]
            #[allow(dead_code)]
            account_id: Option<String>,
        }

        match self.get::<MySelf>("/myself").await {
            Ok(_) => Ok(true),
            Err(e) if e.is_auth_error() => {
                warn!("Jira authentication failed");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
