//! Provider trait definitions for external service integrations
//!
//! - AI providers (OpenAI, Anthropic) expand story outlines
//! - Kanban providers (Jira) receive the generated issues

pub mod ai;
pub mod kanban;

// Re-export commonly used types
pub use ai::{ChatMessage, CompletionOptions, CompletionProvider, Role};
pub use kanban::{CreatedIssue, IssueRequest, IssueTracker};
