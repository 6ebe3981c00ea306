//! Output module for crawl reports
//!
//! This module handles:
//! - Collecting link records into deduplicated valid/broken buckets
//! - Streaming human-readable progress lines while the crawl runs
//! - Writing the final report as a pair of CSV files
//! - Summarizing a finished crawl

mod csv_report;
mod progress;
mod sink;
pub mod stats;

pub use csv_report::{
    broken_file_name, valid_file_name, validate_report_name, write_reports, ReportFiles,
};
pub use progress::{ProgressEvent, ProgressSink, SilentProgress};
pub use sink::{Report, ReportSink};
pub use stats::{print_statistics, CrawlCounters, CrawlStatistics};

use thiserror::Error;

/// Errors that can occur while persisting a report
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Invalid report name: {0}")]
    InvalidName(String),

    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for report operations
pub type ReportResult<T> = Result<T, ReportError>;
