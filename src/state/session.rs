use crate::output::{ProgressEvent, ProgressSink, Report, ReportSink};
use crate::port::TabHandle;
use crate::state::{LinkRecord, LinkStatus};
use crate::url::SkipReason;
use std::collections::{HashMap, HashSet};

/// Normalized URLs of every page entered during one crawl
///
/// The set only ever grows. It is what keeps the traversal from looping on
/// cyclic link graphs.
#[derive(Debug, Default)]
pub struct VisitedSet {
    pages: HashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pages.contains(key)
    }

    /// Inserts a page key, returning false if it was already present
    pub fn insert(&mut self, key: impl Into<String>) -> bool {
        self.pages.insert(key.into())
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Open browser tabs, mirroring the current descent
///
/// Position 0 is the root tab. Every descent pushes one handle and every
/// return pops it, so during a live traversal the stack holds exactly
/// `depth + 1` handles.
#[derive(Debug, Clone)]
pub struct TabStack {
    handles: Vec<TabHandle>,
}

impl TabStack {
    pub fn new(root: TabHandle) -> Self {
        Self {
            handles: vec![root],
        }
    }

    pub fn push(&mut self, handle: TabHandle) {
        self.handles.push(handle);
    }

    /// Pops the active tab. The root tab is never popped.
    pub fn pop(&mut self) -> Option<TabHandle> {
        if self.handles.len() > 1 {
            self.handles.pop()
        } else {
            None
        }
    }

    /// The tab the engine is currently working in
    pub fn active(&self) -> &TabHandle {
        // The root is never popped, so the stack is never empty
        &self.handles[self.handles.len() - 1]
    }

    pub fn contains(&self, handle: &TabHandle) -> bool {
        self.handles.contains(handle)
    }

    /// Number of open tabs tracked by the stack
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

/// Result of processing a single element on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementOutcome {
    /// A record was emitted with the given status
    Emitted(LinkStatus),

    /// The element carried no checkable target
    Skipped(SkipReason),

    /// Processing the element failed and it was left out of the report
    Failed(String),
}

/// A single element that could not be processed
#[derive(Debug, Clone)]
pub struct ElementFailure {
    pub page: String,
    pub message: String,
}

/// A tab left open after an abandoned descent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrphanedTab {
    /// The target the tab was opened for
    pub target: String,
    /// `None` when the browser could not tell which tab was opened
    pub handle: Option<TabHandle>,
}

/// Per-element bookkeeping aggregated over a whole crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlDiagnostics {
    pub pages_entered: u64,
    pub records_emitted: u64,
    pub skipped: HashMap<SkipReason, u64>,
    pub failures: Vec<ElementFailure>,
    /// Tabs that were opened but could not be closed again
    pub orphaned_tabs: Vec<OrphanedTab>,
}

impl CrawlDiagnostics {
    pub fn record(&mut self, page: &str, outcome: &ElementOutcome) {
        match outcome {
            ElementOutcome::Emitted(_) => self.records_emitted += 1,
            ElementOutcome::Skipped(reason) => *self.skipped.entry(*reason).or_insert(0) += 1,
            ElementOutcome::Failed(message) => self.failures.push(ElementFailure {
                page: page.to_string(),
                message: message.clone(),
            }),
        }
    }

    pub fn total_skipped(&self) -> u64 {
        self.skipped.values().sum()
    }
}

/// Everything one crawl run owns
///
/// A session is created when a crawl starts and consumed when it ends. It is
/// passed explicitly through the traversal instead of living in globals, so
/// two runs can never observe each other's state.
pub struct CrawlSession {
    base_host: String,
    visited: VisitedSet,
    tabs: TabStack,
    sink: ReportSink,
    progress: Box<dyn ProgressSink>,
    diagnostics: CrawlDiagnostics,
}

impl CrawlSession {
    /// Creates a session for a crawl rooted at `root_tab`
    ///
    /// # Arguments
    ///
    /// * `base_host` - Authority of the start URL, lowercase
    /// * `root_tab` - Handle of the tab the start page is loaded in
    /// * `progress` - Receiver of human-readable progress events
    pub fn new(
        base_host: impl Into<String>,
        root_tab: TabHandle,
        progress: Box<dyn ProgressSink>,
    ) -> Self {
        Self {
            base_host: base_host.into(),
            visited: VisitedSet::new(),
            tabs: TabStack::new(root_tab),
            sink: ReportSink::new(),
            progress,
            diagnostics: CrawlDiagnostics::default(),
        }
    }

    pub fn base_host(&self) -> &str {
        &self.base_host
    }

    pub fn is_visited(&self, key: &str) -> bool {
        self.visited.contains(key)
    }

    /// Marks a page as entered and announces it
    ///
    /// Returns false, doing nothing else, when the page was entered before.
    pub fn enter_page(&mut self, key: &str, depth: u32) -> bool {
        if !self.visited.insert(key) {
            return false;
        }
        self.diagnostics.pages_entered += 1;
        tracing::info!(depth, page = key, "Entering page");
        self.progress
            .on_event(&ProgressEvent::PageEntered { depth, url: key });
        true
    }

    /// Hands a finished record to the report sink and announces it
    pub fn emit(&mut self, record: LinkRecord) {
        self.progress.on_event(&ProgressEvent::Link(&record));
        self.sink.emit(record);
    }

    pub fn record_orphaned_tab(&mut self, target: &str, handle: Option<TabHandle>) {
        tracing::warn!(target, tab = ?handle, "Tab left open");
        self.diagnostics.orphaned_tabs.push(OrphanedTab {
            target: target.to_string(),
            handle,
        });
    }

    pub fn record_outcome(&mut self, page: &str, outcome: &ElementOutcome) {
        self.diagnostics.record(page, outcome);
    }

    pub fn tabs(&self) -> &TabStack {
        &self.tabs
    }

    pub fn tabs_mut(&mut self) -> &mut TabStack {
        &mut self.tabs
    }

    pub fn visited(&self) -> &VisitedSet {
        &self.visited
    }

    pub fn diagnostics(&self) -> &CrawlDiagnostics {
        &self.diagnostics
    }

    /// Ends the session, draining the report sink
    pub fn finish(self) -> (Report, CrawlDiagnostics) {
        (self.sink.drain(), self.diagnostics)
    }
}
