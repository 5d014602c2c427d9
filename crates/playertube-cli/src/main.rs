//! PlayerTube - browse and track a local video library from the command line.
//!
//! This is the main entry point for the `playertube` binary.

mod commands;
mod logging;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use playertube_core::AppConfig;
use tracing::{Level, info};

use crate::commands::Command;
use crate::logging::LoggingConfig;

/// Turn folders of videos into channels and playlists, and remember where
/// you left off.
#[derive(Parser, Debug)]
#[command(name = "playertube", version, about)]
struct Cli {
    /// Configuration file to use instead of the default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Fraction of a video that counts as watched, for this run only
    #[arg(long, global = true)]
    watched_threshold: Option<f64>,

    /// Show debug output on the console
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut logging_config = LoggingConfig::auto();
    if cli.verbose {
        logging_config = logging_config.with_console_level(Level::DEBUG);
    }
    let _guard = logging::init(&logging_config).context("Failed to initialize logging")?;

    let config_path = cli.config.unwrap_or_else(AppConfig::config_file_path);
    let mut config = AppConfig::load_from(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    if let Some(threshold) = cli.watched_threshold {
        config
            .set_watched_threshold(threshold)
            .context("Invalid --watched-threshold")?;
    }
    info!("Using library {}", config.library_file.display());

    let mut stdout = std::io::stdout().lock();
    commands::run(cli.command, &config, &mut stdout).await
}
