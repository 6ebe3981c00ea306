//! Crawler module for browser-driven link checking
//!
//! This module contains the core crawling logic, including:
//! - The depth-first traversal engine
//! - HTTP liveness probing for targets that are not visited
//! - The broken-page heuristic applied to visited pages

mod engine;
mod prober;
mod verdict;

pub use engine::{CrawlError, CrawlFailure, CrawlOptions, CrawlOutput, Crawler};
pub use prober::{build_http_client, HttpProber, LivenessProbe};
pub use verdict::{inspect_page, judge_page, PageVerdict};

use crate::config::Config;
use crate::output::ProgressSink;
use crate::port::BrowserPort;

/// Runs a complete crawl over an already launched browser
///
/// This is the main entry point for a one-off crawl. It will:
/// 1. Build the HTTP liveness prober from the probe configuration
/// 2. Traverse the site of `start_url` inside `port`
/// 3. Shut the browser down, whether or not the traversal finished
///
/// # Arguments
///
/// * `port` - The browser to drive
/// * `config` - The crawler configuration
/// * `start_url` - Page the traversal starts from
/// * `progress` - Receiver of progress lines
///
/// # Returns
///
/// * `Ok(CrawlOutput)` - Crawl completed
/// * `Err(CrawlFailure)` - Crawl failed, with the partial report
pub async fn crawl_site<P: BrowserPort>(
    port: P,
    config: &Config,
    start_url: &str,
    progress: Box<dyn ProgressSink>,
) -> Result<CrawlOutput, CrawlFailure> {
    let prober = HttpProber::from_config(&config.probe).map_err(CrawlFailure::new)?;
    let mut crawler = Crawler::new(port, prober, CrawlOptions::from(&config.crawler));

    let result = crawler.run(start_url, progress).await;
    crawler.shutdown().await;
    result
}
