//! LinkScout main entry point
//!
//! This is the command-line interface for the LinkScout broken link crawler.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use linkscout::config::{load_config_with_hash, BrowserBackend, Config};
use linkscout::crawler::{build_http_client, crawl_site, CrawlFailure, CrawlOutput};
use linkscout::output::{
    print_statistics, validate_report_name, write_reports, CrawlStatistics, ProgressSink,
};
use linkscout::port::{launch_chrome, ChromeOptions, StaticPort};
use linkscout::service::{server, ChromeLauncher, CrawlService, StaticLauncher};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// LinkScout: a browser-driven broken link crawler
///
/// LinkScout opens every reachable page of a site in a real browser, checks
/// each internal page, external link, and PDF it finds, and writes the valid
/// and broken links to two CSV reports.
#[derive(Parser, Debug)]
#[command(name = "linkscout")]
#[command(version)]
#[command(about = "A browser-driven broken link crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    /// Browser backend, overriding the configuration
    #[arg(long, value_enum, global = true)]
    backend: Option<Backend>,

    /// Show the browser window instead of running headless
    #[arg(long, global = true)]
    headed: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl one site and write its reports
    Crawl {
        /// Page the crawl starts from
        #[arg(value_name = "URL")]
        url: String,

        /// Report name prefix (`<NAME>_valid.csv`, `<NAME>_broken.csv`)
        #[arg(short, long)]
        name: String,

        /// Directory the reports are written to, overriding the configuration
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Stop descending below this depth
        #[arg(long)]
        max_depth: Option<u32>,

        /// Validate arguments and configuration without crawling
        #[arg(long)]
        dry_run: bool,
    },

    /// Run the HTTP crawl service
    Serve {
        /// Address to listen on, overriding the configuration
        #[arg(short, long)]
        bind: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Backend {
    Chrome,
    Static,
}

impl From<Backend> for BrowserBackend {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Chrome => BrowserBackend::Chrome,
            Backend::Static => BrowserBackend::Static,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::debug!("No configuration file given, using defaults");
            Config::default()
        }
    };

    if let Some(backend) = cli.backend {
        config.browser.backend = backend.into();
    }
    if cli.headed {
        config.browser.headless = false;
    }

    match cli.command {
        Command::Crawl {
            url,
            name,
            output,
            max_depth,
            dry_run,
        } => {
            if let Some(dir) = output {
                config.output.report_dir = dir;
            }
            if max_depth.is_some() {
                config.crawler.max_depth = max_depth;
            }
            if dry_run {
                handle_dry_run(&config, &url, &name)
            } else {
                handle_crawl(&config, &url, &name).await
            }
        }
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            handle_serve(config).await
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("linkscout=info,warn"),
            1 => EnvFilter::new("linkscout=debug,info"),
            2 => EnvFilter::new("linkscout=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles `crawl --dry-run`: validates inputs and shows what would happen
fn handle_dry_run(config: &Config, url: &str, name: &str) -> anyhow::Result<()> {
    let host = linkscout::url::base_host(url)?;
    validate_report_name(name)?;

    println!("=== LinkScout Dry Run ===\n");
    println!("Start URL: {}", url);
    println!("Base host: {}", host);
    println!("Backend: {:?}", config.browser.backend);
    println!("Load timeout: {}s", config.crawler.load_timeout_secs);
    println!("Minimum body length: {} chars", config.crawler.min_body_chars);
    match config.crawler.max_depth {
        Some(depth) => println!("Max depth: {}", depth),
        None => println!("Max depth: unlimited"),
    }
    println!(
        "Reports: {}",
        config
            .output
            .report_dir
            .join(linkscout::output::valid_file_name(name))
            .display()
    );
    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the one-off crawl
async fn handle_crawl(config: &Config, url: &str, name: &str) -> anyhow::Result<()> {
    linkscout::url::base_host(url)?;
    validate_report_name(name)?;

    let progress: Box<dyn ProgressSink> = Box::new(|line: &str| println!("{}", line));

    println!("=== CRAWL STARTED ===");
    let result = match config.browser.backend {
        BrowserBackend::Chrome => {
            let port = launch_chrome(&ChromeOptions::from(&config.browser)).await?;
            crawl_site(port, config, url, progress).await
        }
        BrowserBackend::Static => {
            let port = StaticPort::new(build_http_client(&config.probe)?);
            crawl_site(port, config, url, progress).await
        }
    };

    let (output, failure) = match result {
        Ok(output) => (output, None),
        Err(CrawlFailure {
            error,
            report,
            diagnostics,
        }) => (
            CrawlOutput {
                report,
                diagnostics,
            },
            Some(error),
        ),
    };

    // Partial reports are written too
    let files = write_reports(&output.report, &config.output.report_dir, name)?;
    println!("DONE.");
    println!("Valid Links  : {}", files.valid.display());
    println!("Broken Links : {}", files.broken.display());

    print_statistics(&CrawlStatistics::from_report(
        &output.report,
        &output.diagnostics,
    ));

    match failure {
        Some(error) => Err(anyhow::Error::new(error).context("Crawl aborted")),
        None => {
            tracing::info!("Crawl completed successfully");
            Ok(())
        }
    }
}

/// Handles the HTTP service
async fn handle_serve(config: Config) -> anyhow::Result<()> {
    let bind = config.server.bind.clone();
    tracing::info!("Reports directory: {}", config.output.report_dir.display());

    match config.browser.backend {
        BrowserBackend::Chrome => {
            let launcher = ChromeLauncher::from(&config.browser);
            server::serve(CrawlService::new(launcher, config), &bind).await?;
        }
        BrowserBackend::Static => {
            let launcher = StaticLauncher::new(build_http_client(&config.probe)?);
            server::serve(CrawlService::new(launcher, config), &bind).await?;
        }
    }

    Ok(())
}
