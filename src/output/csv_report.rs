//! CSV report files
//!
//! A finished crawl is persisted as two files in the report directory:
//! `<name>_valid.csv` and `<name>_broken.csv`. Both share the header
//! `FromPage,Link,Type,Status,Depth` and hold one row per bucket record.

use super::{Report, ReportError, ReportResult};
use crate::state::LinkRecord;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

const HEADER: [&str; 5] = ["FromPage", "Link", "Type", "Status", "Depth"];

/// Paths of the two files written for one report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFiles {
    pub valid: PathBuf,
    pub broken: PathBuf,
}

/// File name of the valid-links report for `name`
pub fn valid_file_name(name: &str) -> String {
    format!("{}_valid.csv", name)
}

/// File name of the broken-links report for `name`
pub fn broken_file_name(name: &str) -> String {
    format!("{}_broken.csv", name)
}

/// Checks that a report name can be used as a file name prefix
///
/// Names must be non-empty and may not contain path separators, `..`, or
/// control characters.
pub fn validate_report_name(name: &str) -> ReportResult<()> {
    if name.trim().is_empty() {
        return Err(ReportError::InvalidName("name is empty".to_string()));
    }
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(ReportError::InvalidName(format!(
            "'{}' contains a path separator",
            name
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(ReportError::InvalidName(format!(
            "'{}' contains control characters",
            name
        )));
    }
    Ok(())
}

fn write_bucket(path: &Path, records: &[LinkRecord]) -> ReportResult<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(HEADER)?;

    for record in records {
        writer.write_record([
            record.from_page.as_str(),
            record.to_target.as_str(),
            record.kind.as_token(),
            record.status.as_token(),
            &record.depth.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes the valid and broken buckets of a report to CSV files
///
/// The directory is created if it does not exist. Existing files with the
/// same names are overwritten.
///
/// # Arguments
///
/// * `report` - The drained report
/// * `dir` - Directory to write into
/// * `name` - Report name used as the file name prefix
///
/// # Returns
///
/// * `Ok(ReportFiles)` - Paths of the two written files
/// * `Err(ReportError)` - The name was rejected or a write failed
pub fn write_reports(report: &Report, dir: &Path, name: &str) -> ReportResult<ReportFiles> {
    validate_report_name(name)?;
    fs::create_dir_all(dir)?;

    let files = ReportFiles {
        valid: dir.join(valid_file_name(name)),
        broken: dir.join(broken_file_name(name)),
    };

    write_bucket(&files.valid, &report.valid)?;
    write_bucket(&files.broken, &report.broken)?;

    tracing::info!(
        valid = %files.valid.display(),
        broken = %files.broken.display(),
        "Reports written"
    );

    Ok(files)
}
