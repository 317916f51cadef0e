//! Structured workflow events and the observers that render them

use serde::Serialize;
use tracing::{debug, error, info, trace};

use super::WorkflowState;
use crate::api::providers::kanban::{CreatedIssue, IssueRequest};

/// Pipeline step a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStep {
    Expand,
    Submit,
}

impl WorkflowStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStep::Expand => "expand",
            WorkflowStep::Submit => "submit",
        }
    }
}

/// Something the controller did, emitted in order
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    Transition {
        from: WorkflowState,
        to: WorkflowState,
    },
    StoriesLoaded {
        count: usize,
    },
    StoryStarted {
        /// 1-based position in the original story list
        index: usize,
        title: String,
    },
    StoryExpanded {
        title: String,
        chars: usize,
    },
    IssuePrepared {
        title: String,
        request: IssueRequest,
        dry_run: bool,
    },
    IssueCreated {
        title: String,
        issue: CreatedIssue,
    },
    StoryFailed {
        title: String,
        step: WorkflowStep,
        reason: String,
    },
    RunFinished {
        created: usize,
        failed: usize,
    },
}

/// Receives every event the controller emits
pub trait WorkflowObserver: Send {
    fn on_event(&mut self, event: &WorkflowEvent);
}

/// Renders events as `tracing` log lines
#[derive(Debug, Default)]
pub struct TracingObserver;

impl WorkflowObserver for TracingObserver {
    fn on_event(&mut self, event: &WorkflowEvent) {
        match event {
            WorkflowEvent::Transition { from, to } => {
                trace!(from = from.as_str(), to = to.as_str(), "Workflow transition");
            }
            WorkflowEvent::StoriesLoaded { count } => {
                info!(count, "Loaded {} stories from configuration", count);
            }
            WorkflowEvent::StoryStarted { index, title } => {
                info!(index, story = %title, "Processing story");
            }
            WorkflowEvent::StoryExpanded { title, chars } => {
                info!(story = %title, chars, "Story expanded successfully");
            }
            WorkflowEvent::IssuePrepared {
                title,
                request,
                dry_run,
            } => {
                let payload = serde_json::to_string(request).unwrap_or_default();
                if *dry_run {
                    info!(story = %title, "[DRY RUN] Would create issue: {}", payload);
                } else {
                    debug!(story = %title, "Issue payload: {}", payload);
                }
            }
            WorkflowEvent::IssueCreated { title, issue } => {
                info!(story = %title, key = %issue.key, dry_run = issue.dry_run, "Issue created");
            }
            WorkflowEvent::StoryFailed {
                title,
                step,
                reason,
            } => {
                error!(story = %title, step = step.as_str(), "Skipping story: {}", reason);
            }
            WorkflowEvent::RunFinished { created, failed } => {
                info!(created, failed, "All stories processed");
            }
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub events: Vec<WorkflowEvent>,
}

impl RecordingObserver {
    /// States visited, starting with the initial state
    pub fn states(&self) -> Vec<WorkflowState> {
        let mut states = Vec::new();
        for event in &self.events {
            if let WorkflowEvent::Transition { from, to } = event {
                if states.is_empty() {
                    states.push(*from);
                }
                states.push(*to);
            }
        }
        states
    }

    pub fn failures(&self) -> Vec<&WorkflowEvent> {
        self.events
            .iter()
            .filter(|e| matches!(e, WorkflowEvent::StoryFailed { .. }))
            .collect()
    }
}

impl WorkflowObserver for RecordingObserver {
    fn on_event(&mut self, event: &WorkflowEvent) {
        self.events.push(event.clone());
    }
}
