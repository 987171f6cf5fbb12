//! Site-Mirror main entry point
//!
//! This is the command-line interface for the Site-Mirror crawler.

use clap::Parser;
use site_mirror::config::{load_config, validate, Config, OutputConfig};
use site_mirror::crawler::{
    build_http_client, Coordinator, CrawlEvent, HttpAssetFetcher, HttpPageLoader, NullCapturer,
};
use site_mirror::output::{load_statistics, print_statistics, FsOutput, OutputSink};
use site_mirror::storage::open_storage;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

/// Site-Mirror: a single-site crawler that builds a local mirror
///
/// Site-Mirror walks one website breadth-first up to a depth limit, saves
/// every page with its metadata, downloads the page assets, and writes a
/// sitemap and run summary next to them.
#[derive(Parser, Debug)]
#[command(name = "site-mirror")]
#[command(version)]
#[command(about = "Mirror a single website to disk", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Start URL (overrides the config file)
    #[arg(long)]
    url: Option<String>,

    /// Maximum link depth from the start page
    #[arg(long)]
    max_depth: Option<u32>,

    /// Pause between pages in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Exclude URLs matching PATTERN (`*` wildcard); may be repeated
    #[arg(long = "exclude", value_name = "PATTERN")]
    exclude: Vec<String>,

    /// Skip desktop screenshots
    #[arg(long)]
    no_desktop: bool,

    /// Skip mobile screenshots
    #[arg(long)]
    no_mobile: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with = "status")]
    dry_run: bool,

    /// Show the persisted state of the current or last run and exit
    #[arg(long, conflicts_with = "dry_run")]
    status: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    if cli.status {
        let output = match &cli.config {
            Some(path) => load_config(path)?.output,
            None => OutputConfig::default(),
        };
        return handle_status(&output);
    }

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };
    tracing::info!(
        "Configuration loaded (fingerprint: {})",
        config.crawl.fingerprint()
    );

    if cli.dry_run {
        handle_dry_run(&config);
    } else {
        handle_crawl(config).await?;
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
            0 => EnvFilter::new("site_mirror=info,warn"),
            1 => EnvFilter::new("site_mirror=debug,info"),
            2 => EnvFilter::new("site_mirror=trace,debug"),
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

/// Loads the config file (if any), applies command-line overrides and validates
fn resolve_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match (&cli.config, &cli.url) {
        (Some(path), _) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)?
        }
        (None, Some(url)) => Config::for_url(url.clone()),
        (None, None) => return Err("either a CONFIG file or --url is required".into()),
    };

    if let Some(url) = &cli.url {
        config.crawl.url = url.clone();
    }
    if let Some(depth) = cli.max_depth {
        config.crawl.max_depth = depth;
    }
    if let Some(delay) = cli.delay_ms {
        config.crawl.crawl_delay_ms = delay;
    }
    config
        .crawl
        .exclude_patterns
        .extend(cli.exclude.iter().cloned());
    if cli.no_desktop {
        config.crawl.screenshot_desktop = false;
    }
    if cli.no_mobile {
        config.crawl.screenshot_mobile = false;
    }

    validate(&config)?;
    Ok(config)
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config) {
    let crawl = &config.crawl;

    println!("=== Site Mirror Dry Run ===\n");

    println!("Crawl:");
    println!("  Start URL: {}", crawl.url);
    println!("  Max depth: {}", crawl.max_depth);
    println!("  Delay between pages: {}ms", crawl.crawl_delay_ms);
    println!("  Page load timeout: {}s", crawl.page_load_timeout_secs);
    println!(
        "  Concurrent asset downloads: {}",
        crawl.max_concurrent_downloads
    );
    println!(
        "  Screenshots: desktop={}, mobile={}",
        crawl.screenshot_desktop, crawl.screenshot_mobile
    );

    println!("\nExclude Patterns ({}):", crawl.exclude_patterns.len());
    for pattern in &crawl.exclude_patterns {
        println!("  - {}", pattern);
    }

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);
    println!("  Run state: {}", config.output.state_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the --status mode: shows the persisted run state
fn handle_status(output: &OutputConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", output.state_path);

    let storage = open_storage(Path::new(&output.state_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let timeout = Duration::from_secs(config.crawl.page_load_timeout_secs);
    let client = build_http_client(&config.user_agent, timeout)?;

    let output: Arc<dyn OutputSink> = Arc::new(FsOutput::new(&config.output.directory));
    let storage = open_storage(Path::new(&config.output.state_path))?;

    let coordinator = Arc::new(
        Coordinator::new(
            Arc::new(HttpPageLoader::with_client(client.clone())),
            Arc::new(NullCapturer),
            Arc::new(HttpAssetFetcher::new(client, output.clone())),
            output,
        )
        .with_storage(Arc::new(Mutex::new(storage))),
    );

    if config.crawl.wants_screenshots() {
        tracing::info!("No rendering backend available, screenshots will be skipped");
    }

    let forwarder = tokio::spawn(forward_events(coordinator.subscribe()));

    let interrupt = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, finishing the current page");
                coordinator.cancel().await;
            }
        })
    };

    let result = coordinator.start(config.crawl).await;
    interrupt.abort();

    // Let the forwarder log the final event
    let _ = tokio::time::timeout(Duration::from_secs(1), forwarder).await;

    match result {
        Ok(summary) => {
            println!(
                "✓ {} pages and {} assets saved to {}",
                summary.total_pages,
                summary.assets.completed(),
                summary.output_folder
            );
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Logs crawl events until the run ends
async fn forward_events(mut events: tokio::sync::broadcast::Receiver<CrawlEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                match &event {
                    CrawlEvent::Status { message } => tracing::info!("{}", message),
                    CrawlEvent::Progress {
                        processed, total, ..
                    } => tracing::debug!("Progress: {}/{} pages", processed, total),
                    CrawlEvent::Completed {
                        total_pages,
                        total_assets,
                        screenshot_count,
                        output_folder,
                    } => tracing::info!(
                        "Completed: {} pages, {} assets, {} screenshots in {}",
                        total_pages,
                        total_assets,
                        screenshot_count,
                        output_folder
                    ),
                    CrawlEvent::Cancelled => tracing::warn!("Crawl cancelled"),
                    CrawlEvent::Failed { error } => tracing::error!("Crawl failed: {}", error),
                }
                if event.is_terminal() {
                    break;
                }
            }
            Err(RecvError::Lagged(missed)) => {
                tracing::debug!("Event log lagging, {} events skipped", missed);
            }
            Err(RecvError::Closed) => break,
        }
    }
}
