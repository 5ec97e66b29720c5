//! pagetrack CLI - scheduled web page captures
//!
//! Usage:
//!   pagetrack run                    Capture every job in the CONFIG sheet
//!   pagetrack run --config <file>    Use a different configuration file

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pagetrack_browser::{BrowserConfig, ChromeLauncher};
use pagetrack_core::config::DEFAULT_CONFIG_FILE;
use pagetrack_core::PagetrackConfig;
use pagetrack_orchestrator::JobOrchestrator;
use pagetrack_remote::{fetch_jobs, RemoteContext};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "pagetrack")]
#[command(author, version, about = "Capture web pages to Drive and log them in Sheets")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture, upload and log every configured job
    Run {
        /// Configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run { config } => cmd_run(config).await,
    }
}

/// Load and validate configuration, writing a template when none exists
fn load_config(path: &Path) -> Result<PagetrackConfig> {
    if !path.exists() {
        PagetrackConfig::write_default(path)
            .with_context(|| format!("Failed to write default config to {}", path.display()))?;
        bail!(
            "No configuration found; wrote a template to {}. Set source.spreadsheet_id and run again.",
            path.display()
        );
    }

    let config = PagetrackConfig::load_or_default(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn cmd_run(config_path: PathBuf) -> Result<()> {
    let config = load_config(&config_path)?;
    info!("Starting web capture run with {}", config_path.display());

    let scratch_dir = &config.paths.scratch_dir;
    tokio::fs::create_dir_all(scratch_dir)
        .await
        .with_context(|| format!("Could not create scratch directory {}", scratch_dir.display()))?;
    info!("Temporary files directory: {}", scratch_dir.display());

    let remote = RemoteContext::connect_google(&config.paths.token_file, &config.source.spreadsheet_id)
        .await
        .context("Failed to authenticate with Google services")?;

    let jobs = fetch_jobs(remote.tables.as_ref(), &remote.spreadsheet_id, &config.source.config_sheet)
        .await
        .context("Failed to read the job list")?;
    if jobs.is_empty() {
        warn!("No valid jobs found in sheet '{}'", config.source.config_sheet);
        return Ok(());
    }

    let launcher = Arc::new(ChromeLauncher::new(BrowserConfig::from(&config.capture)));
    let orchestrator = JobOrchestrator::from_config(&config, launcher, remote);
    let summary = orchestrator.run_batch(&jobs).await;

    info!("Processing complete: {}", summary);
    Ok(())
}
