//! ISNA archiver main entry point
//!
//! This is the command-line interface for the date-bounded archive crawler.

use anyhow::Context;
use clap::Parser;
use isna_archiver::calendar::{now_in, resolve_target_dates, JalaliDate, TargetDateSet};
use isna_archiver::config::{load_config_with_hash, parse_utc_offset, Config};
use isna_archiver::crawler::{crawl, listing_url, watch_interrupts};
use isna_archiver::output::{format_crawl_report, load_statistics, print_statistics};
use isna_archiver::state::DoneReason;
use isna_archiver::storage::open_storage;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// ISNA archiver: crawls a news archive day by day
///
/// Walks the archive's daily listings newest day first, extracts and
/// classifies each article and stores it once per (source, article id).
/// Without a date window, yesterday's archive is crawled.
#[derive(Parser, Debug)]
#[command(name = "isna-archiver")]
#[command(version)]
#[command(about = "A date-bounded news archive crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// First day to crawl (YYYYMMDD, archive calendar); give with --date-to
    #[arg(long, value_name = "YYYYMMDD")]
    date_from: Option<String>,

    /// Last day to crawl (YYYYMMDD, archive calendar); give with --date-from
    #[arg(long, value_name = "YYYYMMDD")]
    date_to: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.stats {
        return handle_stats(&config);
    }

    // Bad bounds are fatal before anything is fetched
    let targets = resolve_targets(
        &config,
        cli.date_from.as_deref(),
        cli.date_to.as_deref(),
    )?;

    if cli.dry_run {
        handle_dry_run(&config, &targets);
        return Ok(());
    }

    handle_crawl(&config, &config_hash, targets).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("isna_archiver=info,warn"),
            1 => EnvFilter::new("isna_archiver=debug,info"),
            2 => EnvFilter::new("isna_archiver=trace,debug"),
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

fn resolve_targets(
    config: &Config,
    date_from: Option<&str>,
    date_to: Option<&str>,
) -> anyhow::Result<TargetDateSet> {
    let date_from = date_from.map(str::parse::<JalaliDate>).transpose()?;
    let date_to = date_to.map(str::parse::<JalaliDate>).transpose()?;
    let offset = parse_utc_offset(&config.crawler.timezone)?;

    let targets = resolve_target_dates(
        date_from,
        date_to,
        now_in(offset),
        config.crawler.max_range_days,
    )?;
    Ok(targets)
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config, targets: &TargetDateSet) {
    println!("=== ISNA Archiver Dry Run ===\n");

    println!("Source:");
    println!("  Name: {}", config.source.name);
    println!("  Base URL: {}", config.source.base_url);

    println!("\nCrawler Configuration:");
    println!(
        "  Max concurrent articles: {}",
        config.crawler.max_concurrent_articles
    );
    println!("  Retry attempts: {}", config.crawler.retry_attempts);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  Timezone: {}", config.crawler.timezone);
    println!("  Earliest date: {}", config.crawler.earliest_date);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Raw pages: {}", config.output.raw_archive_dir);

    println!("\nTopic overrides: {} extra", config.topic_overrides.len());

    println!("\nTarget Dates ({}):", targets.len());
    for date in targets.iter() {
        println!("  - {}", date);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would start at {}",
        listing_url(&config.source.listing_url, targets.last(), 1)
    );
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))
        .context("failed to open database")?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: &Config,
    config_hash: &str,
    targets: TargetDateSet,
) -> anyhow::Result<()> {
    tracing::info!(
        "Crawling {} from {} back to {}",
        config.source.name,
        targets.last(),
        targets.first()
    );

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, on_interrupt).await {
            // The run row stays `running` until a later run finds it stale
            tracing::error!("Second interrupt received, exiting immediately");
            std::process::exit(130);
        }
    });

    let report = crawl(config, config_hash, targets, cancel)
        .await
        .context("crawl failed")?;

    println!("{}", format_crawl_report(&report));

    if report.done == DoneReason::Cancelled {
        tracing::warn!(
            "Run {} was interrupted; re-run the same window to finish",
            report.run_id
        );
    }

    Ok(())
}
