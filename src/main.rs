use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use agent_jira::api::{provider_from_settings, CompletionProvider, IssueTracker, JiraProvider};
use agent_jira::config::Settings;
use agent_jira::logging;
use agent_jira::prompts::PromptBuilder;
use agent_jira::stories::load_stories;
use agent_jira::workflow::{TracingObserver, WorkflowController};

const DEFAULT_CONFIG: &str = "stories.yaml";

#[derive(Parser)]
#[command(name = "agent-jira")]
#[command(about = "Expand story outlines into detailed Jira issues using an LLM")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand every story in the config file and create Jira issues
    Run {
        /// Path to the YAML stories file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,

        /// Run without creating Jira issues
        #[arg(long)]
        dry_run: bool,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },

    /// Check that a stories file parses, without running the workflow
    Validate {
        /// Path to the YAML stories file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },

    /// Show the application version
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            dry_run,
            verbose,
        } => cmd_run(&config, dry_run, verbose).await,
        Commands::Validate { config } => cmd_validate(&config),
        Commands::Version => {
            println!("agent-jira v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn cmd_run(config_path: &Path, dry_run: bool, verbose: bool) -> Result<()> {
    let settings = Settings::load().context("Failed to load settings")?;
    let _logging = logging::init_logging(&settings, verbose)?;

    settings.validate()?;

    let stories = load_stories(config_path)?;
    tracing::info!(path = %config_path.display(), "Loaded configuration");

    let completion: Arc<dyn CompletionProvider> = Arc::from(provider_from_settings(&settings)?);
    let tracker: Arc<dyn IssueTracker> = Arc::new(JiraProvider::from_settings(&settings)?);
    let prompts = PromptBuilder::new().context("Failed to load prompt templates")?;

    let controller = WorkflowController::new(
        completion,
        tracker,
        prompts,
        settings.jira_project_key.clone(),
    )
    .with_dry_run(dry_run);

    println!("Starting agent-jira");
    println!("Config file: {}", config_path.display());
    println!("Dry run: {}", dry_run);

    let summary = controller.run(stories, &mut TracingObserver).await;

    for issue in &summary.created {
        if issue.dry_run {
            println!("  [dry run] {} {}", issue.key, issue.summary);
        } else {
            println!("  {} {} {}", issue.key, issue.summary, issue.url);
        }
    }
    println!("Agent execution completed successfully!");

    Ok(())
}

fn cmd_validate(config_path: &Path) -> Result<()> {
    let stories = load_stories(config_path).context("Configuration validation failed")?;

    println!("Configuration file {} is valid!", config_path.display());
    println!("Found {} stories to process", stories.story_count());

    if let Some(project) = &stories.global.project {
        println!("Default project: {}", project);
    }
    for (i, story) in stories.stories.iter().enumerate() {
        println!("  {}. {}", i + 1, story.display_title());
    }

    Ok(())
}
