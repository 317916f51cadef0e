//! Issue tracker trait and request/response types
//!
//! The workflow talks to the tracker only through [`IssueTracker`]; Jira is the
//! one implementation.

mod jira;

pub use jira::JiraProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;

/// Custom field Jira Cloud uses for the epic link
pub const EPIC_LINK_FIELD: &str = "customfield_10014";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueTypeRef {
    pub name: String,
}

/// Named reference, as used for components
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub name: String,
}

/// Field set for a new issue, serialized as the tracker's `fields` object.
///
/// Empty `labels`/`components` and a missing epic link are left out of the
/// payload entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRequest {
    pub project: ProjectRef,
    pub summary: String,
    pub description: String,
    #[serde(rename = "issuetype")]
    pub issue_type: IssueTypeRef,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<NamedRef>,
    #[serde(
        rename = "customfield_10014",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub epic_link: Option<String>,
}

impl IssueRequest {
    /// Check required fields, naming the first one that is empty
    pub fn validate(&self, provider: &str) -> Result<(), ApiError> {
        if self.project.key.trim().is_empty() {
            return Err(ApiError::validation(provider, "project"));
        }
        if self.summary.trim().is_empty() {
            return Err(ApiError::validation(provider, "summary"));
        }
        if self.issue_type.name.trim().is_empty() {
            return Err(ApiError::validation(provider, "issuetype"));
        }
        Ok(())
    }
}

/// Reference to an issue that was just created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedIssue {
    pub key: String,
    pub id: String,
    /// Browse URL in the tracker's web UI
    pub url: String,
    pub summary: String,
    pub project: String,
    /// True when no write happened
    #[serde(default)]
    pub dry_run: bool,
}

/// Full view of an existing issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueDetails {
    pub key: String,
    pub id: String,
    pub summary: String,
    pub description: Option<String>,
    pub status: String,
    pub assignee: Option<String>,
    pub reporter: Option<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
}

/// Row returned by a search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSummary {
    pub key: String,
    pub id: String,
    pub summary: String,
    pub status: String,
    pub assignee: Option<String>,
}

/// Trait for issue trackers that receive generated stories
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Get the provider name (e.g., "jira")
    fn name(&self) -> &str;

    /// Check if the provider has credentials
    fn is_configured(&self) -> bool;

    /// Create an issue. Required fields are validated before any network call.
    async fn create_issue(&self, request: IssueRequest) -> Result<CreatedIssue, ApiError>;

    /// Fetch an issue by key (e.g., "PROJ-123")
    async fn get_issue(&self, issue_key: &str) -> Result<IssueDetails, ApiError>;

    /// Update fields on an existing issue
    async fn update_issue(
        &self,
        issue_key: &str,
        fields: serde_json::Value,
    ) -> Result<bool, ApiError>;

    /// Search with the tracker's query language, returning at most `max_results` rows
    async fn search_issues(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<IssueSummary>, ApiError>;

    /// Test connectivity and credentials
    async fn test_connection(&self) -> Result<bool, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> IssueRequest {
        IssueRequest {
            project: ProjectRef {
                key: "PROJ".to_string(),
            },
            summary: "User login".to_string(),
            description: "Expanded".to_string(),
            issue_type: IssueTypeRef {
                name: "Story".to_string(),
            },
            labels: vec![],
            components: vec![],
            epic_link: None,
        }
    }

    #[test]
    fn test_minimal_payload_omits_optional_keys() {
        let json = serde_json::to_value(request()).unwrap();

        assert_eq!(
            json,
            json!({
                "project": {"key": "PROJ"},
                "summary": "User login",
                "description": "Expanded",
                "issuetype": {"name": "Story"},
            })
        );
    }

    #[test]
    fn test_full_payload_shape() {
        let mut req = request();
        req.labels = vec!["auth".to_string()];
        req.components = vec![NamedRef {
            name: "backend".to_string(),
        }];
        req.epic_link = Some("PROJ-1".to_string());

        let json = serde_json::to_value(req).unwrap();
        assert_eq!(json["labels"], json!(["auth"]));
        assert_eq!(json["components"], json!([{"name": "backend"}]));
        assert_eq!(json[EPIC_LINK_FIELD], "PROJ-1");
    }

    #[test]
    fn test_validate_names_missing_field() {
        assert!(request().validate("jira").is_ok());

        let mut req = request();
        req.project.key = String::new();
        assert_eq!(
            req.validate("jira").unwrap_err(),
            ApiError::validation("jira", "project")
        );

        let mut req = request();
        req.summary = "  ".to_string();
        assert_eq!(
            req.validate("jira").unwrap_err(),
            ApiError::validation("jira", "summary")
        );

        let mut req = request();
        req.issue_type.name = String::new();
        assert_eq!(
            req.validate("jira").unwrap_err(),
            ApiError::validation("jira", "issuetype")
        );
    }
}
