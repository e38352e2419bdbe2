//! Shiori main entry point
//!
//! This is the command-line interface for the Shiori catalog crawler.

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use shiori::config::{load_config_with_hash, Config};
use shiori::crawler::{Coordinator, SyncOptions, UpdatePolicy};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Shiori: an incremental catalog crawler
///
/// Shiori walks the paginated listings of a catalog site, keeps one record
/// per item in a local database and caches every item's cover once.
#[derive(Parser, Debug)]
#[command(name = "shiori")]
#[command(version)]
#[command(about = "An incremental catalog crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add new items from the configured listings and refresh stale ones
    Sync {
        /// Re-extract every listed item and never stop early
        #[arg(long, conflicts_with = "stale_before")]
        force: bool,

        /// Re-extract known items uploaded before this day (YYYY-MM-DD)
        #[arg(long, value_name = "DATE", value_parser = parse_day)]
        stale_before: Option<DateTime<Utc>>,

        /// First listing page to request
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        start_page: u32,
    },

    /// Label the items of the positive and negative listings
    Label {
        /// Relabel items that already carry the listing's label
        #[arg(long)]
        update_all: bool,
    },

    /// Show catalog statistics from the database and exit
    Stats,

    /// Copy the covers of labelled items into <DIR>/true and <DIR>/false
    ExportCovers {
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },

    /// Validate the configuration and show what would be crawled
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    match cli.command {
        Command::Check => handle_check(&config),
        Command::Stats => handle_stats(config, config_hash).await,
        Command::ExportCovers { dir } => handle_export(config, config_hash, &dir).await,
        Command::Label { update_all } => handle_label(config, config_hash, update_all).await,
        Command::Sync {
            force,
            stale_before,
            start_page,
        } => {
            let policy = match (force, stale_before) {
                (true, _) => UpdatePolicy::force_all(),
                (false, Some(cutoff)) => UpdatePolicy::stale_before(cutoff),
                (false, None) => UpdatePolicy::new_only(),
            };
            handle_sync(config, config_hash, SyncOptions { policy, start_page }).await
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("shiori=info,warn"),
            1 => EnvFilter::new("shiori=debug,info"),
            2 => EnvFilter::new("shiori=trace,debug"),
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

/// Parses a `YYYY-MM-DD` day into the start of that day in UTC
fn parse_day(value: &str) -> Result<DateTime<Utc>, String> {
    let day = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD: {}", e))?;
    Ok(day.and_time(chrono::NaiveTime::MIN).and_utc())
}

fn handle_check(config: &Config) -> anyhow::Result<()> {
    println!("=== Shiori Configuration ===\n");

    println!("Site: {}", config.site.base_url());
    println!(
        "  Session cookie: {}",
        if config.site.cookie.is_empty() { "none" } else { "set" }
    );

    println!("\nCrawler:");
    println!("  Page size: {}", config.crawler.page_size);
    println!("  Batch size: {}", config.crawler.batch_size);
    println!("  Max retries: {}", config.crawler.max_retries);
    println!("  Backoff base: {}", config.crawler.backoff_base);
    println!("  Timeout: {}s", config.crawler.timeout_secs);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Covers: {}", config.output.covers_dir);

    println!("\nListings ({}):", config.listings.len());
    for listing in &config.listings {
        println!("  - {}", listing.path);
    }

    println!("\nLabels:");
    for path in &config.labels.positive {
        println!("  + {}", path);
    }
    for path in &config.labels.negative {
        println!("  - {}", path);
    }

    if let Some(favorites) = &config.favorites {
        println!("\nFavorites probe: item {} (mode {})", favorites.probe_id, favorites.mode);
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

async fn handle_stats(config: Config, config_hash: String) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let coordinator = Coordinator::open(config, config_hash)
        .await
        .context("Failed to open the catalog")?;
    println!("{}", coordinator.stats()?);

    Ok(())
}

async fn handle_export(config: Config, config_hash: String, dir: &Path) -> anyhow::Result<()> {
    let coordinator = Coordinator::open(config, config_hash)
        .await
        .context("Failed to open the catalog")?;

    let report = coordinator
        .export_covers(dir)
        .await
        .with_context(|| format!("Failed to export covers to {}", dir.display()))?;

    println!("✓ Exported {} covers to {}", report.exported, dir.display());
    if report.missing > 0 {
        println!("  {} covers were missing from the cache", report.missing);
    }
    Ok(())
}

async fn handle_label(config: Config, config_hash: String, update_all: bool) -> anyhow::Result<()> {
    tracing::info!(
        "Positive listings: {}, negative listings: {}",
        config.labels.positive.len(),
        config.labels.negative.len()
    );

    let mut coordinator = Coordinator::open(config, config_hash)
        .await
        .context("Failed to open the catalog")?;
    let report = coordinator.label(update_all).await.context("Label run failed")?;

    tracing::info!(
        "Labelled {} items across {} listings",
        report.processed,
        report.listings
    );
    Ok(())
}

async fn handle_sync(config: Config, config_hash: String, options: SyncOptions) -> anyhow::Result<()> {
    tracing::info!("Listings: {}", config.listings.len());

    let mut coordinator = Coordinator::open(config, config_hash)
        .await
        .context("Failed to open the catalog")?;
    let report = coordinator.sync(options).await.context("Sync run failed")?;

    tracing::info!(
        "Sync finished: {} items processed, {} skipped, {} listings stopped early",
        report.processed,
        report.skipped,
        report.stopped_early
    );
    Ok(())
}
