//! brainpool-crawler main entry point
//!
//! This is the command-line interface for the Brainpool site crawler. It is
//! meant to be invoked by an external scheduler (cron, systemd timer) for the
//! periodic run, and by operators for manual crawls and inspection.

use anyhow::{Context, Result};
use brainpool_crawler::config::{load_config_with_hash, load_seed_list_json, validate, Config};
use brainpool_crawler::output::{print_context, print_listing, print_status};
use brainpool_crawler::{CrawlReport, Crawler, SqliteStorage};
use clap::{ArgGroup, Parser};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Characters of content shown per search hit
const SEARCH_PREVIEW_CHARS: usize = 200;

/// brainpool-crawler: site crawler feeding chat context
///
/// Crawls the configured seed sites, extracts the main text of each page and
/// keeps it in a searchable store. Without a mode flag, performs the scheduled
/// (auto) crawl.
#[derive(Parser, Debug)]
#[command(name = "brainpool-crawler")]
#[command(version = "1.0.0")]
#[command(about = "Site crawler feeding chat context", long_about = None)]
#[command(group(
    ArgGroup::new("mode")
        .args(["now", "url", "status", "list", "search", "clear", "dry_run"])
))]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// JSON array of seed URLs replacing [sites].seeds
    #[arg(long, value_name = "FILE")]
    sites_json: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Crawl every site now, ignoring the auto-crawl switch
    #[arg(long)]
    now: bool,

    /// Crawl a single URL on one of the configured sites
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Show crawl status and exit
    #[arg(long)]
    status: bool,

    /// List stored pages, most recently updated first
    #[arg(long)]
    list: bool,

    /// Search crawled content the way chat context is gathered
    #[arg(long, value_name = "QUERY")]
    search: Option<String>,

    /// Maximum rows for --list and --search
    #[arg(long)]
    limit: Option<usize>,

    /// Rows to skip for --list
    #[arg(long, default_value_t = 0, requires = "list")]
    offset: usize,

    /// Delete one URL's record, or everything when no URL is given
    #[arg(long, value_name = "URL", num_args = 0..=1)]
    clear: Option<Option<String>>,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(path) = &cli.sites_json {
        config.sites.seeds = load_seed_list_json(path)
            .with_context(|| format!("Failed to load site list {}", path.display()))?;
        validate(&config).context("Site list is invalid")?;
        tracing::info!("Loaded {} seed(s) from {}", config.sites.seeds.len(), path.display());
    }

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let crawler = open_crawler(config)?;

    if cli.now {
        let report = crawler.crawl_all_sites().await.context("Crawl failed")?;
        print_report(&report);
    } else if let Some(url) = &cli.url {
        handle_single_url(&crawler, url).await?;
    } else if cli.status {
        let status = crawler
            .get_crawl_status()
            .context("Failed to load crawl status")?;
        print_status(&status);
    } else if cli.list {
        let pages = crawler
            .list_crawled_content(cli.limit.unwrap_or(20), cli.offset)
            .context("Failed to list crawled content")?;
        print_listing(&pages);
    } else if let Some(query) = &cli.search {
        let entries = crawler
            .get_context(query, cli.limit.unwrap_or(5))
            .context("Search failed")?;
        print_context(&entries, SEARCH_PREVIEW_CHARS);
    } else if let Some(target) = &cli.clear {
        let removed = crawler
            .clear_crawled_content(target.as_deref())
            .context("Failed to clear crawled content")?;
        println!("Removed {} record(s)", removed);
    } else {
        let report = crawler.run_auto_crawl().await.context("Scheduled crawl failed")?;
        print_report(&report);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("brainpool_crawler=info,warn"),
            1 => EnvFilter::new("brainpool_crawler=debug,info"),
            2 => EnvFilter::new("brainpool_crawler=trace,debug"),
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

fn open_crawler(config: Config) -> Result<Crawler> {
    let db_path = Path::new(&config.storage.database_path);
    let storage = SqliteStorage::new(db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    Crawler::new(config, storage).context("Failed to initialize crawler")
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== brainpool-crawler Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Enabled: {}", config.crawler.enabled);
    println!("  Auto crawl: {}", config.crawler.auto_crawl_enabled);
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Delay between requests: {}ms", config.crawler.delay_ms);
    println!(
        "  Recrawl window: {}h",
        config.crawler.recrawl_window_hours
    );
    println!(
        "  Request timeout: {}s (max {} redirects)",
        config.crawler.request_timeout_secs, config.crawler.max_redirects
    );
    println!("  Run timeout: {}s", config.crawler.run_timeout_secs);
    println!(
        "  Concurrent sites: {}",
        config.crawler.max_concurrent_sites
    );
    println!(
        "  Content selectors: {}",
        config.crawler.content_selectors.join(", ")
    );

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    println!("\nSites ({}):", config.sites.seeds.len());
    for seed in &config.sites.seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --url mode
async fn handle_single_url(crawler: &Crawler, url: &str) -> Result<()> {
    let result = crawler
        .crawl_single_url(url)
        .await
        .with_context(|| format!("Failed to crawl {}", url))?;

    println!("Crawled {}", url);
    println!("  Title: {}", result.title);
    println!("  Content length: {} chars", result.content_length);
    println!("  Status: {}", result.status);
    Ok(())
}

fn print_report(report: &CrawlReport) {
    println!("=== Crawl Report ===\n");
    println!("  Sites: {}", report.seeds);
    println!("  Fetched: {}", report.fetched);
    println!("  Stored: {}", report.stored);
    println!("  Unchanged: {}", report.unchanged);
    println!("  Skipped: {}", report.skipped);
    println!("  Errors: {}", report.errors);
    println!("  Elapsed: {:.1}s", report.elapsed.as_secs_f64());
    if report.timed_out {
        println!("  Stopped at the run deadline");
    }
}
