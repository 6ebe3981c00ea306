//! Crawl statistics
//!
//! This module summarizes a finished crawl from its report and diagnostics,
//! and keeps live counters over the progress stream for status queries.

use super::{ProgressEvent, Report};
use crate::state::{CrawlDiagnostics, LinkKind, LinkStatus};
use crate::url::SkipReason;
use serde::Serialize;
use std::collections::HashMap;

/// Crawl statistics summary
#[derive(Debug, Clone, Default)]
pub struct CrawlStatistics {
    /// Number of distinct pages entered
    pub pages_entered: u64,

    /// Total records emitted, revisits included
    pub total_records: u64,

    /// Distinct valid targets
    pub valid_links: u64,

    /// Distinct broken targets
    pub broken_links: u64,

    /// Records for internal pages that had already been entered
    pub skipped_visited: u64,

    /// Emitted records by kind, as (ok, broken)
    pub by_kind: HashMap<LinkKind, (u64, u64)>,

    /// Elements left out of the report, by reason
    pub skipped_elements: HashMap<SkipReason, u64>,

    /// Elements whose processing failed
    pub failed_elements: u64,

    /// Tabs that could not be closed after an abandoned descent
    pub orphaned_tabs: u64,
}

impl CrawlStatistics {
    /// Builds statistics from a drained report and its diagnostics
    pub fn from_report(report: &Report, diagnostics: &CrawlDiagnostics) -> Self {
        let mut by_kind: HashMap<LinkKind, (u64, u64)> = HashMap::new();
        for record in &report.records {
            let entry = by_kind.entry(record.kind).or_insert((0, 0));
            match record.status {
                LinkStatus::Ok => entry.0 += 1,
                LinkStatus::Broken => entry.1 += 1,
                LinkStatus::SkippedVisited => {}
            }
        }

        Self {
            pages_entered: diagnostics.pages_entered,
            total_records: report.records.len() as u64,
            valid_links: report.valid.len() as u64,
            broken_links: report.broken.len() as u64,
            skipped_visited: report.skipped_count() as u64,
            by_kind,
            skipped_elements: diagnostics.skipped.clone(),
            failed_elements: diagnostics.failures.len() as u64,
            orphaned_tabs: diagnostics.orphaned_tabs.len() as u64,
        }
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Pages entered: {}", stats.pages_entered);
    println!("  Records emitted: {}", stats.total_records);
    println!("  Valid links: {}", stats.valid_links);
    println!("  Broken links: {}", stats.broken_links);
    println!("  Revisits skipped: {}", stats.skipped_visited);
    println!();

    if !stats.by_kind.is_empty() {
        println!("Records by Type:");
        for kind in [LinkKind::Internal, LinkKind::External, LinkKind::Pdf] {
            if let Some((ok, broken)) = stats.by_kind.get(&kind) {
                println!("  {}: {} ok, {} broken", kind, ok, broken);
            }
        }
        println!();
    }

    if !stats.skipped_elements.is_empty() || stats.failed_elements > 0 {
        println!("Elements Not Reported:");
        let mut skipped: Vec<_> = stats.skipped_elements.iter().collect();
        skipped.sort_by(|a, b| b.1.cmp(a.1));
        for (reason, count) in skipped {
            println!("  {:?}: {}", reason, count);
        }
        if stats.failed_elements > 0 {
            println!("  Failed: {}", stats.failed_elements);
        }
        println!();
    }

    if stats.orphaned_tabs > 0 {
        println!("Tabs left open: {}\n", stats.orphaned_tabs);
    }

    let checked = stats.valid_links + stats.broken_links;
    let health = if checked > 0 {
        (stats.valid_links as f64 / checked as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Link Health: {:.1}% ({} / {} distinct targets alive)",
        health, stats.valid_links, checked
    );
}

/// Running counters over the progress stream
///
/// `links` counts every emitted record; `ok` and `broken` count records by
/// status, revisits excluded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CrawlCounters {
    pub pages: u64,
    pub links: u64,
    pub ok: u64,
    pub broken: u64,
}

impl CrawlCounters {
    pub fn observe(&mut self, event: &ProgressEvent<'_>) {
        match event {
            ProgressEvent::PageEntered { .. } => self.pages += 1,
            ProgressEvent::Link(record) => {
                self.links += 1;
                match record.status {
                    LinkStatus::Ok => self.ok += 1,
                    LinkStatus::Broken => self.broken += 1,
                    LinkStatus::SkippedVisited => {}
                }
            }
            ProgressEvent::Notice(_) => {}
        }
    }
}
