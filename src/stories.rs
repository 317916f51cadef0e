//! Stories file: the YAML document listing story outlines to expand.
//!
//! ```yaml
//! global:
//!   project: "PROJ"
//!   labels: ["generated"]
//! stories:
//!   - title: "User login"
//!     description: "Users sign in with email and password"
//!     priority: "High"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that abort a run before any story is attempted
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

/// A terse story description awaiting expansion
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryOutline {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub labels: Vec<String>,
    pub components: Vec<String>,
    /// Overrides the global project
    pub project: Option<String>,
    pub issue_type: Option<String>,
    pub epic: Option<String>,
}

impl StoryOutline {
    /// Title used in log lines and run summaries
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("Untitled")
    }
}

/// Values applied to every story that does not set its own
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalDefaults {
    pub project: Option<String>,
    pub labels: Vec<String>,
    pub components: Vec<String>,
    pub epic: Option<String>,
}

/// Parsed contents of a stories file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoriesFile {
    pub global: GlobalDefaults,
    pub stories: Vec<StoryOutline>,
}

impl StoriesFile {
    /// Parse stories from YAML text. `path` is only used in error messages.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason,
        };

        let value: serde_yaml::Value =
            serde_yaml::from_str(content).map_err(|e| invalid(e.to_string()))?;

        match value {
            serde_yaml::Value::Null => Err(invalid("file is empty".to_string())),
            serde_yaml::Value::Mapping(_) => {
                serde_yaml::from_value(value).map_err(|e| invalid(e.to_string()))
            }
            _ => Err(invalid("top level must be a mapping".to_string())),
        }
    }

    pub fn story_count(&self) -> usize {
        self.stories.len()
    }
}

/// Load and parse a stories file from disk
pub fn load_stories(path: &Path) -> Result<StoriesFile, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    StoriesFile::parse(&content, path)
}
