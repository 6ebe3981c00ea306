//! LinkScout: a browser-driven broken link crawler
//!
//! This crate walks every reachable page of a website inside a real browser,
//! classifies each outbound reference (internal page, external site, PDF),
//! checks whether it is alive, and produces a deduplicated report of valid
//! and broken links.

pub mod config;
pub mod crawler;
pub mod output;
pub mod port;
pub mod service;
pub mod state;
pub mod url;

use thiserror::Error;

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl_site, CrawlFailure, Crawler};
pub use output::{Report, ReportSink};
pub use state::{LinkKind, LinkRecord, LinkStatus};
pub use url::{classify, visit_key, Classification};
