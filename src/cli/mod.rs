//! CLI parser and dispatch.

mod commands;
mod helpers;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Settings;

#[derive(Parser)]
#[command(name = "presswatch")]
#[command(about = "Enforcement press release ingestion pipeline")]
#[command(version)]
pub struct Cli {
    /// Config file path (defaults to presswatch.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and database
    Init,

    /// Manage press release sources
    Source {
        #[command(subcommand)]
        command: SourceCommands,
    },

    /// Scrape press releases from one or more sources
    Scrape {
        /// Source IDs to scrape (or use --all)
        source_ids: Vec<String>,
        /// Scrape all enabled sources
        #[arg(short, long)]
        all: bool,
        /// How many days back to scrape
        #[arg(short, long, default_value = "7")]
        days: u32,
        /// Range start (YYYY-MM-DD); overrides --days together with --to
        #[arg(long)]
        from: Option<String>,
        /// Range end (YYYY-MM-DD); defaults to today when --from is set
        #[arg(long)]
        to: Option<String>,
        /// Fetch with plain HTTP instead of a headless browser
        #[arg(long)]
        no_browser: bool,
    },

    /// Show recent runs and per-source article counts
    Status,
}

#[derive(Subcommand)]
enum SourceCommands {
    /// List configured sources
    List {
        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },
    /// Enable a source
    Enable { source_id: String },
    /// Disable a source
    Disable { source_id: String },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Init => commands::cmd_init(&settings).await,
        Commands::Source { command } => match command {
            SourceCommands::List { format } => {
                commands::cmd_source_list(&settings, &format).await
            }
            SourceCommands::Enable { source_id } => {
                commands::cmd_source_set_enabled(&settings, &source_id, true).await
            }
            SourceCommands::Disable { source_id } => {
                commands::cmd_source_set_enabled(&settings, &source_id, false).await
            }
        },
        Commands::Scrape {
            source_ids,
            all,
            days,
            from,
            to,
            no_browser,
        } => {
            commands::cmd_scrape(
                &settings,
                &source_ids,
                all,
                days,
                from.as_deref(),
                to.as_deref(),
                no_browser,
            )
            .await
        }
        Commands::Status => commands::cmd_status(&settings).await,
    }
}
