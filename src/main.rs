//! Netsieve main entry point
//!
//! This is the command-line interface for the Netsieve crawl-and-capture engine.

use anyhow::Context;
use clap::Parser;
use netsieve::browser::launcher_for;
use netsieve::config::{load_config_with_hash, Config};
use netsieve::crawler::run_crawl;
use netsieve::extract::{extract_listing, ListingStrategy};
use netsieve::output::{load_statistics, print_records, print_statistics, write_report};
use netsieve::storage::open_storage;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Netsieve: crawl a site and capture the JSON endpoints its pages call
///
/// Netsieve walks a site's link graph in a headless browser, remembers which
/// pages it has visited across runs and records every JSON API the pages
/// talk to. It can also extract product listings from lazily-loaded pages,
/// from the command line or over HTTP.
#[derive(Parser, Debug)]
#[command(name = "netsieve")]
#[command(version)]
#[command(about = "Crawl a site and capture the JSON endpoints its pages call", long_about = None)]
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

    /// Start the crawl here instead of at the configured seed
    #[arg(long, value_name = "URL")]
    seed: Option<String>,

    /// Forget every visited URL before crawling
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "extract", "serve"])]
    dry_run: bool,

    /// Show capture statistics and exit
    #[arg(long, conflicts_with_all = ["dry_run", "extract", "serve"])]
    stats: bool,

    /// Extract the product listing at URL, print it and write the HTML report
    #[arg(long, value_name = "URL", conflicts_with_all = ["dry_run", "stats", "serve"])]
    extract: Option<String>,

    /// Serve the extraction endpoint
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "extract"])]
    serve: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let cancel = CancellationToken::new();
    spawn_ctrl_c_handler(cancel.clone());

    if cli.dry_run {
        handle_dry_run(&config, cli.seed.as_deref());
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(url) = cli.extract.as_deref() {
        handle_extract(&config, url, &cancel).await?;
    } else if cli.serve {
        let launcher = launcher_for(&config);
        netsieve::server::serve(config, launcher, cancel).await?;
    } else {
        handle_crawl(&config, cli.seed.as_deref(), cli.fresh, cancel).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("netsieve=info,warn"),
            1 => EnvFilter::new("netsieve=debug,info"),
            2 => EnvFilter::new("netsieve=trace,debug"),
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

/// Cancels `token` on the first Ctrl-C
fn spawn_ctrl_c_handler(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, shutting down...");
            token.cancel();
        }
    });
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config, seed: Option<&str>) {
    println!("=== Netsieve Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Seed: {}", seed.unwrap_or(&config.crawler.seed_url));
    println!("  Traversal: {:?}", config.crawler.traversal);
    println!("  Wait condition: {:?}", config.crawler.wait_condition);
    println!(
        "  Navigation timeout: {}ms",
        config.crawler.navigation_timeout_ms
    );
    match config.crawler.max_pages {
        Some(max) => println!("  Max pages: {}", max),
        None => println!("  Max pages: unbounded"),
    }
    if config.crawler.discovery.enabled {
        println!("  Menu discovery: {}", config.crawler.discovery.menu_selector);
    } else {
        println!("  Menu discovery: disabled");
    }

    println!(
        "\nAllowed Domains ({}):",
        config.crawler.allowed_domains.len()
    );
    for pattern in &config.crawler.allowed_domains {
        println!("  - {}", pattern);
    }
    println!(
        "\nExcluded Domains ({}):",
        config.crawler.excluded_domains.len()
    );
    for pattern in &config.crawler.excluded_domains {
        println!("  - {}", pattern);
    }

    println!("\nBrowser:");
    println!("  Engine: {:?}", config.browser.engine);
    println!("  Headless: {}", config.browser.headless);

    println!("\nExtraction:");
    println!("  Item selector: {}", config.extraction.item_selector);
    println!("  Max attempts: {}", config.extraction.max_attempts);
    println!("  Recovery: {:?}", config.extraction.recovery);

    println!("\nOutput:");
    println!("  Backend: {:?}", config.output.backend);
    println!("  Visited: {}", config.output.visited_path);
    println!(
        "  Exchanges: {} ({:?})",
        config.output.exchanges_path, config.output.exchanges_format
    );
    println!("  Database: {}", config.output.database_path);
    println!("  Report: {}", config.output.report_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from storage
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let (visited, exchanges) = open_storage(&config.output).context("failed to open storage")?;
    let stats = load_statistics(&visited, &exchanges)?;
    print_statistics(&stats);
    Ok(())
}

/// Handles the --extract mode: one listing, printed and written as a report
async fn handle_extract(config: &Config, url: &str, cancel: &CancellationToken) -> anyhow::Result<()> {
    let launcher = launcher_for(config);
    let strategy = ListingStrategy::from_config(&config.extraction);

    let extraction = extract_listing(launcher.as_ref(), config, &strategy, url, cancel).await?;

    tracing::info!("Total products: {}", extraction.expected);
    print_records(&extraction.records);
    write_report(&extraction.records, Path::new(&config.output.report_path))?;
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: &Config,
    seed: Option<&str>,
    fresh: bool,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let (visited, exchanges) = open_storage(&config.output).context("failed to open storage")?;

    if fresh {
        tracing::info!("Starting fresh crawl (forgetting previously visited pages)");
        visited
            .lock()
            .map_err(|_| anyhow::anyhow!("visited store lock poisoned"))?
            .clear()?;
    }

    let seed = seed.unwrap_or(&config.crawler.seed_url);
    let launcher = launcher_for(config);

    match run_crawl(config, launcher.as_ref(), visited, exchanges, seed, cancel).await {
        Ok(summary) => {
            tracing::info!(
                "Crawl completed successfully: {} pages visited, {} APIs captured",
                summary.pages_visited,
                summary.captured
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
