//! Report sink
//!
//! Collects every emitted record and maintains the two deduplicated report
//! buckets while the crawl runs, so a crawl that dies halfway still has a
//! usable partial report.

use crate::state::{LinkRecord, LinkStatus};
use std::collections::HashSet;

/// The drained result of a crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    /// First record for every target that was found alive, in emission order
    pub valid: Vec<LinkRecord>,

    /// First record for every target that was found broken, in emission order
    pub broken: Vec<LinkRecord>,

    /// Every record emitted, including skipped revisits
    pub records: Vec<LinkRecord>,
}

impl Report {
    /// Number of records that were revisits of an already entered page
    pub fn skipped_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.status == LinkStatus::SkippedVisited)
            .count()
    }
}

/// Accumulates link records with per-bucket, first-write-wins deduplication
#[derive(Debug, Default)]
pub struct ReportSink {
    records: Vec<LinkRecord>,
    valid: Vec<LinkRecord>,
    broken: Vec<LinkRecord>,
    seen_valid: HashSet<String>,
    seen_broken: HashSet<String>,
}

impl ReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of a record
    ///
    /// `Ok` records land in the valid bucket and `Broken` records in the
    /// broken bucket, each only if its target has not been seen in that
    /// bucket before. `SkippedVisited` records only go to the full log.
    pub fn emit(&mut self, record: LinkRecord) {
        match record.status {
            LinkStatus::Ok => {
                if self.seen_valid.insert(record.to_target.clone()) {
                    self.valid.push(record.clone());
                }
            }
            LinkStatus::Broken => {
                if self.seen_broken.insert(record.to_target.clone()) {
                    self.broken.push(record.clone());
                }
            }
            LinkStatus::SkippedVisited => {}
        }
        self.records.push(record);
    }

    /// Consumes the sink and returns the ordered buckets
    pub fn drain(self) -> Report {
        Report {
            valid: self.valid,
            broken: self.broken,
            records: self.records,
        }
    }
}
