//! Offer Tracker main entry point
//!
//! This is the command-line interface for the listing URL tracker.

use anyhow::Context;
use clap::Parser;
use offer_tracker::config::{load_config_with_hash, Config};
use offer_tracker::crawler::Coordinator;
use offer_tracker::output::{export_listings, load_statistics, print_statistics};
use offer_tracker::storage::open_storage;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Offer Tracker: keeps a live set of real-estate listing URLs
///
/// Offer Tracker crawls marketplace searches for every configured city,
/// offer type and estate type, and keeps the stored listings in sync:
/// new URLs are inserted, vanished URLs deactivated and returning URLs
/// reactivated.
#[derive(Parser, Debug)]
#[command(name = "offer-tracker")]
#[command(version)]
#[command(about = "Tracks real-estate listing URLs across marketplaces", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Run a single sweep and exit
    #[arg(long, conflicts_with_all = ["stats", "export_json"])]
    once: bool,

    /// Run a single sweep and report what would change without writing
    #[arg(long, conflicts_with_all = ["stats", "export_json"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_json"])]
    stats: bool,

    /// Export stored listings as JSON and exit
    #[arg(long, value_name = "PATH", conflicts_with_all = ["dry_run", "stats"])]
    export_json: Option<PathBuf>,

    /// Export only active listings
    #[arg(long, requires = "export_json")]
    active_only: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.stats {
        handle_stats(&config)
    } else if let Some(path) = &cli.export_json {
        handle_export(&config, path, cli.active_only)
    } else {
        handle_sweeps(config, config_hash, cli.once, cli.dry_run).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("offer_tracker=info,warn"),
            1 => EnvFilter::new("offer_tracker=debug,info"),
            2 => EnvFilter::new("offer_tracker=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export-json mode
fn handle_export(config: &Config, path: &Path, active_only: bool) -> anyhow::Result<()> {
    let storage = open_storage(Path::new(&config.output.database_path))?;
    let count = export_listings(&storage, path, active_only)
        .with_context(|| format!("Failed to export listings to {}", path.display()))?;

    println!("✓ Exported {} listings to: {}", count, path.display());
    Ok(())
}

/// Handles the sweep loop, a single sweep, or a dry run
async fn handle_sweeps(
    config: Config,
    config_hash: String,
    once: bool,
    dry_run: bool,
) -> anyhow::Result<()> {
    tracing::info!(
        "Tracking {} cities on {} offer types and {} estate types, every {}s",
        config.tracker.cities.len(),
        config.tracker.offers.len(),
        config.tracker.estates.len(),
        config.tracker.interval_secs
    );

    let coordinator = Coordinator::new(config, config_hash)?.with_dry_run(dry_run);

    let token = coordinator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current pages (press Ctrl-C again to exit now)");
            token.cancel();
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(130);
            }
        }
    });

    if once || dry_run {
        let summary = coordinator.run_once().await?;
        if dry_run {
            println!("Dry run, nothing written: {}", summary);
        } else {
            println!("Sweep finished: {}", summary);
        }
    } else {
        coordinator.run_forever().await?;
    }

    Ok(())
}
