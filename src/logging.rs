//! Logging initialization.
//!
//! Always logs to stderr. When `LOG_DIR` is set, a copy of every line also goes
//! to `{LOG_DIR}/agent-jira-{datetime}.log`.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Settings;

/// Result of logging initialization
pub struct LoggingHandle {
    /// Guard that must be kept alive for the duration of the program.
    /// When dropped, ensures all buffered logs are flushed.
    pub _guard: Option<WorkerGuard>,

    /// Path to the log file (only set when `LOG_DIR` is configured)
    pub log_file_path: Option<PathBuf>,
}

/// Pick the filter directive: `--verbose` beats `LOG_LEVEL`
pub fn effective_level(settings: &Settings, verbose: bool) -> String {
    if verbose {
        "debug".to_string()
    } else {
        settings.log_level.to_lowercase()
    }
}

/// Timestamped log file name inside `dir`
pub fn log_file_path(dir: &Path) -> PathBuf {
    let timestamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
    dir.join(format!("agent-jira-{}.log", timestamp))
}

/// Initialize logging. `RUST_LOG`, when set, overrides the computed level.
pub fn init_logging(settings: &Settings, verbose: bool) -> Result<LoggingHandle> {
    let level = effective_level(settings, verbose);
    let filter = tracing_subscriber::EnvFilter::new(std::env::var("RUST_LOG").unwrap_or(level));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    match settings.log_dir.as_deref().filter(|d| !d.is_empty()) {
        Some(dir) => {
            let logs_dir = PathBuf::from(dir);
            std::fs::create_dir_all(&logs_dir)?;

            let path = log_file_path(&logs_dir);
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "agent-jira.log".to_string());

            let file_appender = tracing_appender::rolling::never(&logs_dir, &file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(false)
                        .with_ansi(false) // No ANSI codes in log files
                        .with_writer(non_blocking),
                )
                .init();

            Ok(LoggingHandle {
                _guard: Some(guard),
                log_file_path: Some(path),
            })
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .init();

            Ok(LoggingHandle {
                _guard: None,
                log_file_path: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_verbose_overrides_level() {
        let settings = Settings {
            log_level: "WARN".to_string(),
            ..Settings::default()
        };

        assert_eq!(effective_level(&settings, false), "warn");
        assert_eq!(effective_level(&settings, true), "debug");
    }

    #[test]
    fn test_log_file_path_format() {
        let temp_dir = TempDir::new().unwrap();
        let path = log_file_path(temp_dir.path());

        assert!(path.starts_with(temp_dir.path()));
        assert!(path.to_string_lossy().contains("agent-jira-"));
        assert!(path.to_string_lossy().ends_with(".log"));
    }
}
