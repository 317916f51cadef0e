//! agent-jira - expand terse story outlines into detailed Jira issues
//!
//! Stories are read from a YAML file, expanded one at a time by a language
//! model, and submitted to the issue tracker by the [`workflow`] controller.

pub mod api;
pub mod config;
pub mod logging;
pub mod prompts;
pub mod stories;
pub mod workflow;
