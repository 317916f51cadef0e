//! Command-line tests that run the compiled `agent-jira` binary
//!
//! Outbound HTTP goes to local `wiremock` servers only.

use serde_json::json;
use std::fs;
use std::process::Command;
use tempfile::TempDir;
use wiremock::matchers::{any, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn agent_jira() -> Command {
    Command::new(env!("CARGO_BIN_EXE_agent-jira"))
}

#[test]
fn test_version_command() {
    let output = agent_jira().arg("version").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(&format!("agent-jira v{}", env!("CARGO_PKG_VERSION"))));
}

#[test]
fn test_validate_reports_stories() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("stories.yaml");
    fs::write(
        &config,
        "global:\n  project: PROJ\nstories:\n  - title: Login\n  - description: no title\n",
    )
    .unwrap();

    let output = agent_jira()
        .args(["validate", "--config"])
        .arg(&config)
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("is valid!"));
    assert!(stdout.contains("Found 2 stories to process"));
    assert!(stdout.contains("1. Login"));
    assert!(stdout.contains("2. Untitled"));
}

#[test]
fn test_validate_missing_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("nope.yaml");

    let output = agent_jira()
        .args(["validate", "--config"])
        .arg(&missing)
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found"));
}

#[test]
fn test_run_without_jira_settings_fails_before_work() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("stories.yaml");
    fs::write(&config, "stories:\n  - title: Login\n").unwrap();

    let output = agent_jira()
        .args(["run", "--dry-run", "--config"])
        .arg(&config)
        .env_remove("JIRA_URL")
        .env_remove("JIRA_USERNAME")
        .env_remove("JIRA_API_TOKEN")
        .env_remove("JIRA_PROJECT_KEY")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("JIRA_URL"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_run_dry_run_makes_no_tracker_calls() {
    let llm = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "## User Story\nAs a user I can log in"}}]
        })))
        .expect(1)
        .mount(&llm)
        .await;

    let jira = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&jira)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("stories.yaml");
    fs::write(&config, "stories:\n  - title: Login\n    description: Sign in\n").unwrap();

    let output = tokio::process::Command::new(env!("CARGO_BIN_EXE_agent-jira"))
        .args(["run", "--dry-run", "--config"])
        .arg(&config)
        .env("JIRA_URL", jira.uri())
        .env("JIRA_USERNAME", "me@example.com")
        .env("JIRA_API_TOKEN", "token")
        .env("JIRA_PROJECT_KEY", "PROJ")
        .env("LLM_PROVIDER", "openai")
        .env("OPENAI_API_KEY", "sk-test")
        .env("OPENAI_BASE_URL", llm.uri())
        .env("MAX_RETRIES", "0")
        .env_remove("LOG_DIR")
        .output()
        .await
        .unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(stdout.contains("Dry run: true"));
    assert!(stdout.contains("DRY-RUN-123"));
    assert!(stdout.contains("Login"));
}
