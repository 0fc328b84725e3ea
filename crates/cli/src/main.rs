//! Lexrag CLI
//!
//! Main entry point for the lexrag command-line tool.
//! Indexes a legal document corpus and serves ranked citation queries.

mod commands;

use clap::{Parser, Subcommand};
use commands::{CleanCommand, IndexCommand, QueryCommand, StatsCommand};
use lexrag_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Lexrag - retrieval over a legal document corpus
#[derive(Parser, Debug)]
#[command(name = "lexrag")]
#[command(about = "Index a legal document corpus and query it for citations", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "LEXRAG_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Corpus directory (default: <workspace>/documents)
    #[arg(long, global = true, env = "LEXRAG_CORPUS")]
    corpus: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "LEXRAG_CONFIG")]
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

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build or refresh the corpus index
    Index(IndexCommand),

    /// Query the corpus for the most relevant passages
    Query(QueryCommand),

    /// Show index statistics
    Stats(StatsCommand),

    /// Remove the persisted index snapshot
    Clean(CleanCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load base configuration from environment
    let config = AppConfig::load()?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.workspace,
        cli.corpus,
        cli.config,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Corpus: {:?}", config.corpus_dir());

    // Ensure .lexrag directory exists
    config.ensure_lexrag_dir()?;

    let command_name = match &cli.command {
        Commands::Index(_) => "index",
        Commands::Query(_) => "query",
        Commands::Stats(_) => "stats",
        Commands::Clean(_) => "clean",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    // Route to command handlers
    let result = match cli.command {
        Commands::Index(cmd) => cmd.execute(&config).await,
        Commands::Query(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
        Commands::Clean(cmd) => cmd.execute(&config).await,
    };

    if let Err(e) = &result {
        tracing::error!("Command failed: {}", e);
    }

    result
}
