//! Coursemate CLI
//!
//! Main entry point for the coursemate command-line tool.
//! Answers questions about indexed course materials with tool-augmented retrieval.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ChatCommand, ClearCommand, CoursesCommand, LearnCommand, ToolsCommand};
use coursemate_core::{
    config::{AppConfig, CliOverrides},
    logging::{self, LogFormat},
    AppResult,
};
use std::path::PathBuf;

/// Coursemate - ask questions about your course materials
#[derive(Parser, Debug)]
#[command(name = "coursemate")]
#[command(about = "Ask questions about your course materials", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "COURSEMATE_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "COURSEMATE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Model provider (anthropic, ollama)
    #[arg(short, long, global = true, env = "COURSEMATE_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "COURSEMATE_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a question about the indexed courses
    Ask(AskCommand),

    /// Interactive question session
    Chat(ChatCommand),

    /// Index course documents from a folder
    Learn(LearnCommand),

    /// List indexed courses
    Courses(CoursesCommand),

    /// Show the tools offered to the model
    Tools(ToolsCommand),

    /// Drop the course index
    Clear(ClearCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Ask(_) => "ask",
            Commands::Chat(_) => "chat",
            Commands::Learn(_) => "learn",
            Commands::Courses(_) => "courses",
            Commands::Tools(_) => "tools",
            Commands::Clear(_) => "clear",
        }
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let overrides = CliOverrides {
        workspace: cli.workspace,
        config_file: cli.config,
        provider: cli.provider,
        model: cli.model,
        log_level: cli.log_level,
        verbose: cli.verbose,
        no_color: cli.no_color,
    };
    let config = AppConfig::load_with(overrides)?;

    logging::init_logging(
        config.log_level.as_deref(),
        config.no_color,
        LogFormat::parse(&config.log_format),
    )?;

    tracing::info!("Coursemate CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let result = match &cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::Learn(cmd) => cmd.execute(&config).await,
        Commands::Courses(cmd) => cmd.execute(&config).await,
        Commands::Tools(cmd) => cmd.execute(&config).await,
        Commands::Clear(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
