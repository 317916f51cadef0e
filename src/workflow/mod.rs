//! Story workflow controller.
//!
//! A finite-state loop over a FIFO queue of story outlines:
//!
//! ```text
//! LOAD → DEQUEUE → EXPAND → SUBMIT → DEQUEUE → … → DONE
//!                     ↘        ↘
//!                      ERROR → DEQUEUE
//! ```
//!
//! Stories are processed one at a time. A failure while expanding or
//! submitting abandons that story only; it is never retried or requeued.

pub mod events;
pub mod issue;

pub use events::{
    RecordingObserver, TracingObserver, WorkflowEvent, WorkflowObserver, WorkflowStep,
};
pub use issue::{derive_issue_request, DerivationError};

use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;

use crate::api::error::ApiError;
use crate::api::providers::ai::CompletionProvider;
use crate::api::providers::kanban::{CreatedIssue, IssueTracker};
use crate::prompts::{PromptBuilder, PromptError};
use crate::stories::{GlobalDefaults, StoriesFile, StoryOutline};

/// Placeholder key recorded for issues "created" during a dry run
pub const DRY_RUN_ISSUE_KEY: &str = "DRY-RUN-123";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Load,
    Dequeue,
    Expand,
    Submit,
    Error,
    Done,
}

impl WorkflowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::Load => "load",
            WorkflowState::Dequeue => "dequeue",
            WorkflowState::Expand => "expand",
            WorkflowState::Submit => "submit",
            WorkflowState::Error => "error",
            WorkflowState::Done => "done",
        }
    }
}

/// Why the current story was abandoned
#[derive(Error, Debug)]
pub enum StoryError {
    #[error("no current story to expand")]
    NoCurrentStory,

    #[error("missing expanded story or current story")]
    NothingToSubmit,

    #[error("error building prompt: {0}")]
    Prompt(#[from] PromptError),

    #[error("error expanding story: {0}")]
    Expansion(#[source] ApiError),

    #[error("error preparing issue: {0}")]
    Derivation(#[from] DerivationError),

    #[error("error creating issue: {0}")]
    Submission(#[source] ApiError),
}

impl StoryError {
    pub fn step(&self) -> WorkflowStep {
        match self {
            StoryError::NoCurrentStory | StoryError::Prompt(_) | StoryError::Expansion(_) => {
                WorkflowStep::Expand
            }
            StoryError::NothingToSubmit
            | StoryError::Derivation(_)
            | StoryError::Submission(_) => WorkflowStep::Submit,
        }
    }
}

/// The controller's working memory for a single run
#[derive(Debug, Default)]
pub struct RunState {
    pub pending: VecDeque<StoryOutline>,
    pub current: Option<StoryOutline>,
    /// 1-based position of `current` in the loaded story list
    pub current_index: usize,
    pub expanded: Option<String>,
    pub issue: Option<CreatedIssue>,
    pub error: Option<StoryError>,
}

impl RunState {
    /// Drop everything tied to the current story
    fn clear_story(&mut self) {
        self.current = None;
        self.expanded = None;
        self.issue = None;
        self.error = None;
    }

    fn current_title(&self) -> String {
        self.current
            .as_ref()
            .map(|s| s.display_title().to_string())
            .unwrap_or_else(|| "<none>".to_string())
    }
}

/// A story that was abandoned, and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedStory {
    pub title: String,
    pub step: WorkflowStep,
    pub reason: String,
}

/// Outcome of a full run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub dry_run: bool,
    pub created: Vec<CreatedIssue>,
    pub failed: Vec<FailedStory>,
}

/// Drives stories through expand and submit
pub struct WorkflowController {
    completion: Arc<dyn CompletionProvider>,
    tracker: Arc<dyn IssueTracker>,
    prompts: PromptBuilder,
    fallback_project: String,
    dry_run: bool,
}

/// Mutable context threaded through the transition function
struct Run<'o> {
    state: RunState,
    input: Vec<StoryOutline>,
    global: GlobalDefaults,
    summary: RunSummary,
    observer: &'o mut dyn WorkflowObserver,
}

impl WorkflowController {
    pub fn new(
        completion: Arc<dyn CompletionProvider>,
        tracker: Arc<dyn IssueTracker>,
        prompts: PromptBuilder,
        fallback_project: impl Into<String>,
    ) -> Self {
        Self {
            completion,
            tracker,
            prompts,
            fallback_project: fallback_project.into(),
            dry_run: false,
        }
    }

    /// Replace tracker writes with a placeholder result
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Process every story in `stories`, reporting progress to `observer`
    pub async fn run(
        &self,
        stories: StoriesFile,
        observer: &mut dyn WorkflowObserver,
    ) -> RunSummary {
        let mut run = Run {
            state: RunState::default(),
            input: stories.stories,
            global: stories.global,
            summary: RunSummary {
                dry_run: self.dry_run,
                ..RunSummary::default()
            },
            observer,
        };

        let mut state = WorkflowState::Load;
        while state != WorkflowState::Done {
            let next = self.transition(state, &mut run).await;
            run.observer
                .on_event(&WorkflowEvent::Transition { from: state, to: next });
            state = next;
        }

        run.observer.on_event(&WorkflowEvent::RunFinished {
            created: run.summary.created.len(),
            failed: run.summary.failed.len(),
        });
        run.summary
    }

    async fn transition(&self, state: WorkflowState, run: &mut Run<'_>) -> WorkflowState {
        match state {
            WorkflowState::Load => {
                run.state.pending = std::mem::take(&mut run.input).into();
                run.observer.on_event(&WorkflowEvent::StoriesLoaded {
                    count: run.state.pending.len(),
                });
                WorkflowState::Dequeue
            }
            WorkflowState::Dequeue => {
                run.state.clear_story();
                match run.state.pending.pop_front() {
                    Some(story) => {
                        run.state.current_index += 1;
                        run.observer.on_event(&WorkflowEvent::StoryStarted {
                            index: run.state.current_index,
                            title: story.display_title().to_string(),
                        });
                        run.state.current = Some(story);
                        WorkflowState::Expand
                    }
                    None => WorkflowState::Done,
                }
            }
            WorkflowState::Expand => match self.expand(&run.state).await {
                Ok(expanded) => {
                    run.observer.on_event(&WorkflowEvent::StoryExpanded {
                        title: run.state.current_title(),
                        chars: expanded.chars().count(),
                    });
                    run.state.expanded = Some(expanded);
                    WorkflowState::Submit
                }
                Err(e) => {
                    run.state.error = Some(e);
                    WorkflowState::Error
                }
            },
            WorkflowState::Submit => match self.submit(run).await {
                Ok(issue) => {
                    run.observer.on_event(&WorkflowEvent::IssueCreated {
                        title: run.state.current_title(),
                        issue: issue.clone(),
                    });
                    run.summary.created.push(issue.clone());
                    run.state.issue = Some(issue);
                    WorkflowState::Dequeue
                }
                Err(e) => {
                    run.state.error = Some(e);
                    WorkflowState::Error
                }
            },
            WorkflowState::Error => {
                if let Some(error) = run.state.error.take() {
                    let failed = FailedStory {
                        title: run.state.current_title(),
                        step: error.step(),
                        reason: error.to_string(),
                    };
                    run.observer.on_event(&WorkflowEvent::StoryFailed {
                        title: failed.title.clone(),
                        step: failed.step,
                        reason: failed.reason.clone(),
                    });
                    run.summary.failed.push(failed);
                }
                run.state.clear_story();
                WorkflowState::Dequeue
            }
            WorkflowState::Done => WorkflowState::Done,
        }
    }

    async fn expand(&self, state: &RunState) -> Result<String, StoryError> {
        let story = state.current.as_ref().ok_or(StoryError::NoCurrentStory)?;
        let prompt = self.prompts.expansion_prompt(story)?;

        self.completion
            .generate_story_expansion(&prompt)
            .await
            .map_err(StoryError::Expansion)
    }

    async fn submit(&self, run: &mut Run<'_>) -> Result<CreatedIssue, StoryError> {
        let (Some(story), Some(expanded)) = (&run.state.current, &run.state.expanded) else {
            return Err(StoryError::NothingToSubmit);
        };

        let request = derive_issue_request(story, &run.global, expanded, &self.fallback_project)?;
        run.observer.on_event(&WorkflowEvent::IssuePrepared {
            title: story.display_title().to_string(),
            request: request.clone(),
            dry_run: self.dry_run,
        });

        if self.dry_run {
            return Ok(CreatedIssue {
                key: DRY_RUN_ISSUE_KEY.to_string(),
                id: String::new(),
                url: String::new(),
                summary: request.summary,
                project: request.project.key,
                dry_run: true,
            });
        }

        self.tracker
            .create_issue(request)
            .await
            .map_err(StoryError::Submission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_steps() {
        assert_eq!(StoryError::NoCurrentStory.step(), WorkflowStep::Expand);
        assert_eq!(
            StoryError::Expansion(ApiError::empty_response("openai")).step(),
            WorkflowStep::Expand
        );
        assert_eq!(
            StoryError::Derivation(DerivationError::MissingField("project")).step(),
            WorkflowStep::Submit
        );
        assert_eq!(
            StoryError::Submission(ApiError::validation("jira", "summary")).step(),
            WorkflowStep::Submit
        );
    }

    #[test]
    fn test_error_messages_carry_context() {
        let err = StoryError::Expansion(ApiError::empty_response("openai"));
        assert_eq!(
            err.to_string(),
            "error expanding story: openai: Empty response from model"
        );
    }

    #[test]
    fn test_clear_story_resets_together() {
        let mut state = RunState {
            current: Some(StoryOutline::default()),
            expanded: Some("text".to_string()),
            error: Some(StoryError::NothingToSubmit),
            ..RunState::default()
        };

        state.clear_story();

        assert!(state.current.is_none());
        assert!(state.expanded.is_none());
        assert!(state.issue.is_none());
        assert!(state.error.is_none());
    }
}
