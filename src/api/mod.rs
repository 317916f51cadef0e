//! API client modules for external service integrations
//!
//! This module provides:
//! - Provider traits for completion and issue-tracker services
//! - Error handling shared by every provider

pub mod error;
pub mod providers;

// Re-export commonly used types from providers
pub use error::ApiError;
pub use providers::ai::{
    provider_from_settings, AnthropicProvider, ChatMessage, CompletionOptions, CompletionProvider,
    OpenAiProvider, Role,
};
pub use providers::kanban::{
    CreatedIssue, IssueDetails, IssueRequest, IssueSummary, IssueTracker, JiraProvider,
};
