//! Prompt rendering for story expansion and refinement.

use handlebars::Handlebars;
use serde_json::json;
use thiserror::Error;

use crate::stories::StoryOutline;

const EXPANSION_TEMPLATE: &str = "story_expansion";
const REFINEMENT_TEMPLATE: &str = "story_refinement";

/// Placeholder rendered for an empty labels or components list
const NONE_PLACEHOLDER: &str = "None";

#[derive(Error, Debug)]
pub enum PromptError {
    #[error("failed to parse prompt template: {0}")]
    Template(#[from] Box<handlebars::TemplateError>),

    #[error("failed to render prompt: {0}")]
    Render(#[from] handlebars::RenderError),
}

/// Renders the fixed prompt templates
pub struct PromptBuilder {
    handlebars: Handlebars<'static>,
}

impl PromptBuilder {
    pub fn new() -> Result<Self, PromptError> {
        let mut handlebars = Handlebars::new();
        // Prompts are plain text
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.set_strict_mode(false);

        handlebars
            .register_template_string(EXPANSION_TEMPLATE, include_str!("story_expansion.hbs"))
            .map_err(Box::new)?;
        handlebars
            .register_template_string(REFINEMENT_TEMPLATE, include_str!("story_refinement.hbs"))
            .map_err(Box::new)?;

        Ok(Self { handlebars })
    }

    /// Build the expansion request for a story outline
    pub fn expansion_prompt(&self, story: &StoryOutline) -> Result<String, PromptError> {
        let context = json!({
            "title": story.title.as_deref().unwrap_or("Untitled Story"),
            "description": story.description.as_deref().unwrap_or("No description provided"),
            "priority": story.priority.as_deref().unwrap_or("Medium"),
            "labels": join_or_none(&story.labels),
            "components": join_or_none(&story.components),
        });

        let rendered = self.handlebars.render(EXPANSION_TEMPLATE, &context)?;
        Ok(rendered.trim().to_string())
    }

    /// Build a refinement request for an already-expanded story
    pub fn refinement_prompt(
        &self,
        original_story: &str,
        feedback: &str,
    ) -> Result<String, PromptError> {
        let context = json!({
            "original_story": original_story,
            "feedback": feedback,
        });

        let rendered = self.handlebars.render(REFINEMENT_TEMPLATE, &context)?;
        Ok(rendered.trim().to_string())
    }
}

fn join_or_none(values: &[String]) -> String {
    if values.is_empty() {
        NONE_PLACEHOLDER.to_string()
    } else {
        values.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> PromptBuilder {
        PromptBuilder::new().unwrap()
    }

    #[test]
    fn test_expansion_prompt_fills_fields() {
        let story = StoryOutline {
            title: Some("User login".to_string()),
            description: Some("Sign in with email & password".to_string()),
            priority: Some("High".to_string()),
            labels: vec!["auth".to_string(), "mvp".to_string()],
            components: vec!["backend".to_string()],
            ..Default::default()
        };

        let prompt = builder().expansion_prompt(&story).unwrap();

        assert!(prompt.contains("Title: User login"));
        // No HTML escaping
        assert!(prompt.contains("Description: Sign in with email & password"));
        assert!(prompt.contains("Priority: High"));
        assert!(prompt.contains("Labels: auth, mvp"));
        assert!(prompt.contains("Components: backend"));
    }

    #[test]
    fn test_expansion_prompt_defaults() {
        let prompt = builder().expansion_prompt(&StoryOutline::default()).unwrap();

        assert!(prompt.contains("Title: Untitled Story"));
        assert!(prompt.contains("Description: No description provided"));
        assert!(prompt.contains("Priority: Medium"));
        assert!(prompt.contains("Labels: None"));
        assert!(prompt.contains("Components: None"));
    }

    #[test]
    fn test_expansion_prompt_sections() {
        let prompt = builder().expansion_prompt(&StoryOutline::default()).unwrap();

        for section in [
            "User Story",
            "Description",
            "Acceptance Criteria",
            "Technical Considerations",
            "Definition of Done",
        ] {
            assert!(prompt.contains(section), "missing section {}", section);
        }
        assert!(!prompt.starts_with('\n'));
    }

    #[test]
    fn test_expansion_prompt_is_idempotent() {
        let builder = builder();
        let story = StoryOutline {
            title: Some("Export CSV".to_string()),
            ..Default::default()
        };
        assert_eq!(
            builder.expansion_prompt(&story).unwrap(),
            builder.expansion_prompt(&story).unwrap()
        );
    }

    #[test]
    fn test_refinement_prompt_verbatim() {
        let original = "## User Story\nAs a <user>, I want {{things}}";
        let prompt = builder()
            .refinement_prompt(original, "Add \"error\" cases")
            .unwrap();

        assert!(prompt.contains(original));
        assert!(prompt.contains("Add \"error\" cases"));
        assert!(prompt.starts_with("Refine the following Jira story"));
    }
}
