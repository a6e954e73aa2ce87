//! web-crawler main entry point
//!
//! This is the command-line interface for the single-domain site crawler.

use anyhow::Context;
use clap::Parser;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;
use web_crawler::config::{load_config_with_hash, Config, OUTPUT_DIR_ENV};
use web_crawler::crawler::Coordinator;
use web_crawler::output::{print_statistics, RunPaths};

/// web-crawler: a breadth-first crawler for one site
///
/// Starting from one URL, web-crawler visits every reachable page of the same
/// domain in batches, records status, title, h1, meta description and
/// canonical URL for each, and publishes a url-sorted CSV result.
#[derive(Parser, Debug)]
#[command(name = "web-crawler")]
#[command(version)]
#[command(about = "A breadth-first single-domain site crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    let paths = RunPaths::for_today(&config.output.directory);

    // The log file lives in the output root, so it must exist first
    let log_file = if cli.dry_run {
        None
    } else {
        Some(open_log_file(&paths.log)?)
    };
    setup_logging(cli.verbose, cli.quiet, log_file);

    tracing::info!(
        "Configuration loaded from {} (hash: {})",
        cli.config.display(),
        config_hash
    );

    if cli.dry_run {
        handle_dry_run(&config, &paths);
        return Ok(());
    }

    handle_crawl(config, paths).await
}

fn open_log_file(path: &Path) -> anyhow::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Events go to stderr and, during a crawl, to the run's log file.
fn setup_logging(verbose: u8, quiet: bool, log_file: Option<File>) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("web_crawler=info,warn"),
            1 => EnvFilter::new("web_crawler=debug,info"),
            2 => EnvFilter::new("web_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);

    let file_layer = log_file.map(|file| {
        tracing_subscriber::fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
}

/// Handles the --dry-run mode: shows the settings and where results would go
fn handle_dry_run(config: &Config, paths: &RunPaths) {
    println!("=== web-crawler Dry Run ===\n");

    println!("Start URL: {}", config.start_url);
    println!("User agent: {}", config.user_agent);
    println!("Respect robots.txt: {}", config.use_robots_txt);

    println!("\nCrawler Configuration:");
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Max URLs: {}", config.crawler.max_urls);
    println!("  Workers: {}", config.crawler.workers);
    println!("  Batch delay: {}ms", config.crawler.batch_delay_ms);
    println!("  Max attempts: {}", config.crawler.max_attempts);
    println!("  Retry delay: {}ms", config.crawler.retry_delay_ms);
    println!("  Request timeout: {}ms", config.crawler.request_timeout_ms);
    println!(
        "  Fetch mode: {}",
        if config.crawler.shared_fetch {
            "shared (one fetch per URL)"
        } else {
            "dual (separate discovery and record fetches)"
        }
    );

    println!("\nOutput (override with {}):", OUTPUT_DIR_ENV);
    println!("  Append log: {}", paths.temp.display());
    println!("  Result: {}", paths.final_file.display());
    println!("  Latest: {}", paths.latest.display());
    println!("  Manifest: {}", paths.manifest.display());
    println!("  Log: {}", paths.log.display());

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, paths: RunPaths) -> anyhow::Result<()> {
    let coordinator =
        Coordinator::with_paths(config, paths).context("Failed to start the crawl")?;

    match coordinator.run().await {
        Ok(run) => {
            tracing::info!("Crawl completed successfully");
            println!("Result: {}", run.final_path.display());
            println!("Latest: {}", run.latest_path.display());
            println!("Manifest: {}\n", run.manifest_path.display());
            print_statistics(&run.statistics);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
