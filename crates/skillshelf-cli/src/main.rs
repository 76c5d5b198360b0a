mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::Settings;
use skillshelf_logging::init_logging;
use skillshelf_skills::{DefaultLocations, SkillRequest};
use skillshelf_tool::config::DirList;
use skillshelf_tool::{LoadSkillTool, ToolConfig};
use std::path::PathBuf;
use tracing::debug;

/// Browse and load agent skills from the command line
#[derive(Debug, Parser)]
#[command(name = "skillshelf", version, about)]
struct Cli {
    /// Skills directory to search instead of the configured ones (repeatable)
    #[arg(long = "skills-dir", value_name = "DIR", global = true)]
    skills_dirs: Vec<PathBuf>,

    /// Print the structured JSON payload instead of markdown
    #[arg(long, global = true)]
    json: bool,

    /// Log level (overrides settings; RUST_LOG overrides both)
    #[arg(long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List every available skill
    List,
    /// Search skills by name, description or metadata
    Search { term: String },
    /// Show a skill's metadata without loading it
    Info { name: String },
    /// Print a skill's full content
    Load { name: String },
}

impl From<Command> for SkillRequest {
    fn from(command: Command) -> Self {
        match command {
            Command::List => SkillRequest::List,
            Command::Search { term } => SkillRequest::Search { term },
            Command::Info { name } => SkillRequest::Info { name },
            Command::Load { name } => SkillRequest::Load { name },
        }
    }
}

impl Cli {
    fn tool_config(&self) -> ToolConfig {
        let dirs: Vec<String> = self
            .skills_dirs
            .iter()
            .map(|d| d.to_string_lossy().into_owned())
            .collect();

        ToolConfig {
            skills_dirs: (!dirs.is_empty()).then_some(DirList::Many(dirs)),
            skills_dir: None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    let settings = Settings::load(&cwd)?;

    let level = cli.log_level.as_deref().unwrap_or(&settings.logging.level);
    init_logging(level, settings.logging.format)?;

    let tool = LoadSkillTool::mount(
        &cli.tool_config(),
        settings.skill_layers.clone(),
        DefaultLocations::detect(&cwd),
    )
    .await?;

    let snapshot = tool.service().snapshot().await;
    for diagnostic in snapshot.diagnostics() {
        debug!("{:?}", diagnostic);
    }

    let json = cli.json;
    let output = tool.call(&SkillRequest::from(cli.command)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if let Some(message) = output.get("message").and_then(|m| m.as_str()) {
        println!("{message}");
    }

    Ok(())
}
