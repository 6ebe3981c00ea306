//! Configuration module for LinkScout
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use linkscout::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("linkscout.toml")).unwrap();
//! println!("Reports go to: {}", config.output.report_dir.display());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BrowserBackend, BrowserSettings, Config, CrawlerConfig, OutputConfig, ProbeConfig,
    ServerConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
