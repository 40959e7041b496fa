//! Catalog-Ripper main entry point
//!
//! This is the command-line interface for the Catalog-Ripper image harvester.

use catalog_ripper::config::{load_config_with_hash, Config, RetailerEntry};
use catalog_ripper::crawler::{Fetch, HttpFetcher, RetailerScraper, Scraper};
use catalog_ripper::output::print_report;
use catalog_ripper::{Result, RipperError};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Catalog-Ripper: a product image harvester
///
/// Catalog-Ripper walks retailer category pages, discovers every product
/// page reachable through pagination, and downloads each product photo
/// into a local directory.
#[derive(Parser, Debug)]
#[command(name = "catalog-ripper")]
#[command(version)]
#[command(about = "A product image harvester", long_about = None)]
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

    /// Only harvest these retailers (repeatable); defaults to all
    #[arg(short, long, value_name = "NAME")]
    retailer: Vec<String>,

    /// Download images from these product pages instead of discovering them
    /// (repeatable; requires exactly one retailer)
    #[arg(long, value_name = "URL")]
    product: Vec<String>,

    /// Number of individual failures listed in each report
    #[arg(long, default_value_t = 20)]
    max_failures: usize,

    /// Validate config and show what would be harvested without fetching anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let retailers = select_retailers(&config, &cli.retailer)?;

    if cli.dry_run {
        handle_dry_run(&config, &retailers, &cli.product);
        return Ok(());
    }

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let fetcher: Arc<dyn Fetch> = Arc::new(HttpFetcher::new(&config.user_agent, &config.fetch)?);

    if cli.product.is_empty() {
        handle_harvest(&config, &retailers, fetcher, &cancel, cli.max_failures).await
    } else {
        handle_products(&config, &retailers, fetcher, cli.product, &cancel, cli.max_failures).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_ripper=info,warn"),
            1 => EnvFilter::new("catalog_ripper=debug,info"),
            2 => EnvFilter::new("catalog_ripper=trace,debug"),
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

/// Cancels the harvest on Ctrl-C; in-flight items finish or abort promptly
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("Interrupt received, stopping harvest");
                cancel.cancel();
            }
            Err(e) => tracing::error!("Could not listen for interrupt: {}", e),
        }
    });
}

/// Resolves `--retailer` names against the config
fn select_retailers<'a>(
    config: &'a Config,
    names: &[String],
) -> Result<Vec<&'a RetailerEntry>> {
    if names.is_empty() {
        return Ok(config.retailers.iter().collect());
    }

    names
        .iter()
        .map(|name| {
            config
                .retailer(name)
                .ok_or_else(|| RipperError::UnknownRetailer(name.clone()))
        })
        .collect()
}

/// Handles the --dry-run mode: validates config and shows what would be harvested
fn handle_dry_run(config: &Config, retailers: &[&RetailerEntry], products: &[String]) {
    println!("=== Catalog-Ripper Dry Run ===\n");

    println!("Harvest Configuration:");
    println!("  Workers: {}", config.harvest.workers);
    println!("  Frontier capacity: {}", config.harvest.frontier_capacity);
    println!("  Delay after each product: {}ms", config.harvest.product_delay_ms);
    println!("  Max file name length: {}", config.harvest.max_filename_len);
    println!("  Swatch marker: {:?}", config.harvest.swatch_marker);

    println!("\nFetch:");
    println!("  User agent: {}", config.user_agent.value);
    println!(
        "  Per-domain parallelism: {}",
        config.fetch.per_domain_parallelism
    );
    println!("  Per-domain delay: {}ms", config.fetch.per_domain_delay_ms);
    println!("  Timeout: {}s", config.fetch.timeout_secs);
    match &config.fetch.cache_dir {
        Some(dir) => println!("  Cache: {}", dir),
        None => println!("  Cache: off"),
    }

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);
    println!("  Extension: .{}", config.output.extension);

    println!("\nRetailers ({}):", retailers.len());
    for entry in retailers {
        println!("  - {} ({} root pages)", entry.name, entry.root_pages.len());
        for page in &entry.root_pages {
            println!("    * {}", page);
        }
    }

    if !products.is_empty() {
        println!("\nProduct pages ({}):", products.len());
        for product in products {
            println!("  * {}", product);
        }
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main harvest: every selected retailer in turn
async fn handle_harvest(
    config: &Config,
    retailers: &[&RetailerEntry],
    fetcher: Arc<dyn Fetch>,
    cancel: &CancellationToken,
    max_failures: usize,
) -> Result<()> {
    let scrapers: Vec<Box<dyn Scraper>> = retailers
        .iter()
        .map(|entry| {
            Box::new(RetailerScraper::from_config(entry, config, fetcher.clone()))
                as Box<dyn Scraper>
        })
        .collect();

    for scraper in scrapers {
        match scraper.process(cancel).await {
            Ok(report) => print_report(&report, max_failures),
            Err(RipperError::Cancelled) => {
                tracing::warn!("Skipping {}: harvest cancelled", scraper.name());
                break;
            }
            Err(e) => {
                tracing::error!("Harvest of {} failed: {}", scraper.name(), e);
                return Err(e);
            }
        }
    }

    Ok(())
}

/// Handles --product mode: downloads images from the given product pages
async fn handle_products(
    config: &Config,
    retailers: &[&RetailerEntry],
    fetcher: Arc<dyn Fetch>,
    products: Vec<String>,
    cancel: &CancellationToken,
    max_failures: usize,
) -> Result<()> {
    let [entry] = retailers else {
        return Err(RipperError::ProductRetailerCount(retailers.len()));
    };

    let scraper = RetailerScraper::from_config(entry, config, fetcher);
    let report = scraper.process_products(products, cancel).await?;
    print_report(&report, max_failures);
    Ok(())
}
