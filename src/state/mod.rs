//! State module for tracking crawl progress
//!
//! This module provides the records a crawl produces and the per-run state
//! the traversal threads through every step.
//!
//! # Components
//!
//! - `LinkKind` / `LinkStatus` / `LinkRecord`: what was found and what was concluded
//! - `CrawlSession`: visited pages, open tabs, report sink and diagnostics for one run

mod link_state;
mod session;

// Re-export main types
pub use link_state::{LinkKind, LinkRecord, LinkStatus};
pub use session::{
    CrawlDiagnostics, CrawlSession, ElementFailure, ElementOutcome, OrphanedTab, TabStack,
    VisitedSet,
};
