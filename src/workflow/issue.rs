//! Issue field derivation: story outline + global defaults + expansion → request

use thiserror::Error;

use crate::api::providers::kanban::{IssueRequest, IssueTypeRef, NamedRef, ProjectRef};
use crate::stories::{GlobalDefaults, StoryOutline};

pub const DEFAULT_SUMMARY: &str = "Generated Story";
pub const DEFAULT_ISSUE_TYPE: &str = "Story";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DerivationError {
    #[error("required field '{0}' could not be resolved")]
    MissingField(&'static str),
}

/// Build the issue request for one story.
///
/// Precedence for each optional field is story, then global defaults, then the
/// static fallback. Blank strings and empty lists count as absent.
pub fn derive_issue_request(
    story: &StoryOutline,
    global: &GlobalDefaults,
    expanded: &str,
    fallback_project: &str,
) -> Result<IssueRequest, DerivationError> {
    let project = first_present(&[
        story.project.as_deref(),
        global.project.as_deref(),
        Some(fallback_project),
    ])
    .ok_or(DerivationError::MissingField("project"))?;

    let summary = first_present(&[story.title.as_deref()]).unwrap_or(DEFAULT_SUMMARY);
    let issue_type = first_present(&[story.issue_type.as_deref()]).unwrap_or(DEFAULT_ISSUE_TYPE);

    let labels = first_non_empty(&story.labels, &global.labels).to_vec();
    let components = first_non_empty(&story.components, &global.components)
        .iter()
        .map(|name| NamedRef { name: name.clone() })
        .collect();

    let epic_link = first_present(&[story.epic.as_deref(), global.epic.as_deref()])
        .map(str::to_string);

    Ok(IssueRequest {
        project: ProjectRef {
            key: project.to_string(),
        },
        summary: summary.to_string(),
        description: expanded.to_string(),
        issue_type: IssueTypeRef {
            name: issue_type.to_string(),
        },
        labels,
        components,
        epic_link,
    })
}

fn first_present<'a>(candidates: &[Option<&'a str>]) -> Option<&'a str> {
    candidates
        .iter()
        .flatten()
        .copied()
        .find(|value| !value.trim().is_empty())
}

fn first_non_empty<'a>(own: &'a [String], fallback: &'a [String]) -> &'a [String] {
    if own.is_empty() {
        fallback
    } else {
        own
    }
}
