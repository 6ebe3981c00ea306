//! Crawl engine - depth-first traversal of a site inside a browser
//!
//! The engine walks every reachable page of the start URL's site:
//! - Each page is entered once, keyed by its normalized URL
//! - Header menus are hovered open before the page's targets are enumerated
//! - PDFs and external targets are probed over HTTP
//! - Internal targets are opened in a new tab, judged, and descended into
//! - After a descent the child tab is closed and its parent tab restored
//!
//! Descent is driven by an explicit frame stack rather than recursion, so
//! site depth never grows the call stack. The frame stack and the session's
//! tab stack always have the same height.

use crate::config::CrawlerConfig;
use crate::crawler::prober::LivenessProbe;
use crate::crawler::verdict::inspect_page;
use crate::output::{ProgressSink, Report};
use crate::port::{BrowserPort, ElementQuery, MarkStyle, PortError, PortResult, TabHandle};
use crate::state::{
    CrawlDiagnostics, CrawlSession, ElementOutcome, LinkKind, LinkRecord, LinkStatus,
};
use crate::url::{base_host, link_kind, skip_reason, visit_key, SkipReason};
use crate::UrlError;
use std::time::Duration;
use thiserror::Error;

/// Tunables for one crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlOptions {
    /// How long a page may take to report its load as complete
    pub load_timeout: Duration,

    /// Body text threshold of the broken-page heuristic
    pub min_body_chars: usize,

    /// Pause after hovering each collapsed menu
    pub menu_settle: Duration,

    /// Pause after scrolling an element into view
    pub scroll_settle: Duration,

    /// Pause after marking an element
    pub mark_settle: Duration,

    /// Deepest descent allowed; `None` means unbounded
    pub max_depth: Option<u32>,
}

impl From<&CrawlerConfig> for CrawlOptions {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            load_timeout: config.load_timeout(),
            min_body_chars: config.min_body_chars,
            menu_settle: Duration::from_millis(config.menu_settle_ms),
            scroll_settle: Duration::from_millis(config.scroll_settle_ms),
            mark_settle: Duration::from_millis(config.mark_settle_ms),
            max_depth: config.max_depth,
        }
    }
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self::from(&CrawlerConfig::default())
    }
}

/// Why a crawl ended early
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Invalid start URL: {0}")]
    StartUrl(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("{0}")]
    Port(#[from] PortError),
}

/// A crawl that could not finish
///
/// Everything emitted before the failure is kept in `report`.
#[derive(Debug, Error)]
#[error("Crawl aborted: {error}")]
pub struct CrawlFailure {
    #[source]
    pub error: CrawlError,
    pub report: Report,
    pub diagnostics: CrawlDiagnostics,
}

impl CrawlFailure {
    pub fn new(error: impl Into<CrawlError>) -> Self {
        Self {
            error: error.into(),
            report: Report::default(),
            diagnostics: CrawlDiagnostics::default(),
        }
    }
}

/// Result of a completed crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlOutput {
    pub report: Report,
    pub diagnostics: CrawlDiagnostics,
}

/// A page being worked through
struct Frame<E> {
    /// Visited key of the page, used as `from_page` of its records
    page: String,
    depth: u32,
    elements: std::vec::IntoIter<E>,
}

/// What processing one element led to
enum Step<E> {
    /// Finished without leaving the current page
    Done(ElementOutcome),

    /// A child tab was opened and is now active. `None` means nothing to
    /// descend into and the tab must be closed right away.
    Opened(ElementOutcome, Option<Frame<E>>),
}

/// Swallows a non-fatal port error from a best-effort action
fn best_effort(result: PortResult<()>, action: &str) -> PortResult<()> {
    match result {
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            tracing::trace!(action, error = %e, "Best-effort action failed");
            Ok(())
        }
        Ok(()) => Ok(()),
    }
}

async fn settle(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Depth-first, browser-driven link crawler
pub struct Crawler<P, L> {
    port: P,
    prober: L,
    options: CrawlOptions,
}

impl<P, L> Crawler<P, L>
where
    P: BrowserPort,
    L: LivenessProbe,
{
    /// Creates a crawler over a browser port and a liveness probe
    ///
    /// # Arguments
    ///
    /// * `port` - Browser with a single open root tab
    /// * `prober` - Probe used for PDF, external and depth-limited targets
    /// * `options` - Timeouts, delays and limits
    pub fn new(port: P, prober: L, options: CrawlOptions) -> Self {
        Self {
            port,
            prober,
            options,
        }
    }

    /// Crawls the site of `start_url` and returns its report
    ///
    /// # Returns
    ///
    /// * `Ok(Report)` - The traversal finished
    /// * `Err(CrawlFailure)` - The start URL was invalid or the browser
    ///   session was lost; the failure carries the partial report
    pub async fn crawl(
        &mut self,
        start_url: &str,
        progress: impl ProgressSink + 'static,
    ) -> Result<Report, CrawlFailure> {
        self.run(start_url, Box::new(progress))
            .await
            .map(|output| output.report)
    }

    /// Crawls the site of `start_url`, returning the report with diagnostics
    pub async fn run(
        &mut self,
        start_url: &str,
        progress: Box<dyn ProgressSink>,
    ) -> Result<CrawlOutput, CrawlFailure> {
        let base = base_host(start_url).map_err(CrawlFailure::new)?;
        let root = self.load_root(start_url).await.map_err(CrawlFailure::new)?;

        tracing::info!(start_url, base_host = %base, "Starting crawl");

        let mut session = CrawlSession::new(base, root, progress);
        let result = self.traverse(&mut session, start_url).await;
        let (report, diagnostics) = session.finish();

        match result {
            Ok(()) => {
                tracing::info!(
                    pages = diagnostics.pages_entered,
                    records = report.records.len(),
                    valid = report.valid.len(),
                    broken = report.broken.len(),
                    "Crawl complete"
                );
                Ok(CrawlOutput {
                    report,
                    diagnostics,
                })
            }
            Err(e) => {
                // Callers report the failure itself
                tracing::debug!(records = report.records.len(), "Traversal stopped early");
                Err(CrawlFailure {
                    error: e.into(),
                    report,
                    diagnostics,
                })
            }
        }
    }

    /// Releases the browser
    pub async fn shutdown(&mut self) {
        if let Err(e) = self.port.shutdown().await {
            tracing::warn!(error = %e, "Browser shutdown failed");
        }
    }

    /// Loads the start page in the root tab and returns the tab's handle
    async fn load_root(&mut self, start_url: &str) -> PortResult<TabHandle> {
        best_effort(self.port.navigate(start_url).await, "navigate to start page")?;
        if let Err(e) = self.port.wait_until_loaded(self.options.load_timeout).await {
            if e.is_fatal() {
                return Err(e);
            }
            tracing::warn!(start_url, error = %e, "Start page did not finish loading");
        }
        self.port.current_tab().await
    }

    async fn traverse(&mut self, session: &mut CrawlSession, start_url: &str) -> PortResult<()> {
        let mut stack: Vec<Frame<P::Element>> = Vec::new();
        stack.extend(self.enter(session, start_url, 0).await?);

        while let Some(frame) = stack.last_mut() {
            let Some(element) = frame.elements.next() else {
                stack.pop();
                if !stack.is_empty() {
                    self.return_to_parent(session).await?;
                }
                continue;
            };
            let page = frame.page.clone();
            let depth = frame.depth;

            match self.process_element(session, &page, depth, &element).await {
                Ok(Step::Done(outcome)) => session.record_outcome(&page, &outcome),
                Ok(Step::Opened(outcome, child)) => {
                    session.record_outcome(&page, &outcome);
                    match child {
                        Some(child) => stack.push(child),
                        None => self.return_to_parent(session).await?,
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::debug!(page = %page, error = %e, "Skipping element");
                    session.record_outcome(&page, &ElementOutcome::Failed(e.to_string()));
                }
            }

            debug_assert_eq!(stack.len(), session.tabs().len());
        }

        Ok(())
    }

    /// Enters the page in the active tab
    ///
    /// Returns `None` when the page, after any redirect, was already entered.
    async fn enter(
        &mut self,
        session: &mut CrawlSession,
        requested_url: &str,
        depth: u32,
    ) -> PortResult<Option<Frame<P::Element>>> {
        let url = match self.port.current_url().await {
            Ok(url) if !url.is_empty() => url,
            Ok(_) => requested_url.to_string(),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::debug!(requested_url, error = %e, "Could not read current URL");
                requested_url.to_string()
            }
        };

        let key = visit_key(&url);
        if !session.enter_page(&key, depth) {
            tracing::debug!(page = %key, "Already entered, not descending");
            return Ok(None);
        }

        self.reveal_menus().await?;

        let elements = match self.port.find_elements(ElementQuery::NavigationTargets).await {
            Ok(elements) => elements,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!(page = %key, error = %e, "Could not enumerate page elements");
                session.record_outcome(&key, &ElementOutcome::Failed(e.to_string()));
                Vec::new()
            }
        };
        tracing::debug!(page = %key, depth, count = elements.len(), "Enumerated targets");

        Ok(Some(Frame {
            page: key,
            depth,
            elements: elements.into_iter(),
        }))
    }

    /// Hovers every collapsed header menu so its links become reachable
    async fn reveal_menus(&mut self) -> PortResult<()> {
        let menus = match self.port.find_elements(ElementQuery::CollapsedMenus).await {
            Ok(menus) => menus,
            Err(e) if e.is_fatal() => return Err(e),
            Err(_) => return Ok(()),
        };

        for menu in &menus {
            best_effort(self.port.hover(menu).await, "hover menu")?;
            settle(self.options.menu_settle).await;
        }
        Ok(())
    }

    /// Reads an element's target: its `href`, or failing that its `onclick`
    async fn read_target(&mut self, element: &P::Element) -> PortResult<Option<String>> {
        if let Some(href) = self.port.attribute(element, "href").await? {
            if !href.trim().is_empty() {
                return Ok(Some(href));
            }
        }
        Ok(self
            .port
            .attribute(element, "onclick")
            .await?
            .filter(|onclick| !onclick.trim().is_empty()))
    }

    async fn scroll_to(&mut self, element: &P::Element) -> PortResult<()> {
        best_effort(self.port.scroll_into_view(element).await, "scroll")?;
        settle(self.options.scroll_settle).await;
        Ok(())
    }

    async fn mark(&mut self, element: &P::Element, style: MarkStyle) -> PortResult<()> {
        best_effort(self.port.mark(element, style).await, "mark")?;
        settle(self.options.mark_settle).await;
        Ok(())
    }

    async fn process_element(
        &mut self,
        session: &mut CrawlSession,
        page: &str,
        depth: u32,
        element: &P::Element,
    ) -> PortResult<Step<P::Element>> {
        let Some(raw) = self.read_target(element).await? else {
            return Ok(Step::Done(ElementOutcome::Skipped(SkipReason::Empty)));
        };
        if let Some(reason) = skip_reason(&raw, Some(page)) {
            tracing::trace!(target = %raw, ?reason, "Skipping target");
            return Ok(Step::Done(ElementOutcome::Skipped(reason)));
        }

        let target = raw.trim();
        let kind = link_kind(target, session.base_host());
        self.scroll_to(element).await?;

        if !kind.is_probed() {
            return self.follow_internal(session, page, depth, element, target).await;
        }

        let status = LinkStatus::from_alive(self.prober.probe(target).await);
        self.mark(element, MarkStyle::Informational).await?;
        session.emit(LinkRecord::new(page, target, kind, status, depth));
        Ok(Step::Done(ElementOutcome::Emitted(status)))
    }

    async fn follow_internal(
        &mut self,
        session: &mut CrawlSession,
        page: &str,
        depth: u32,
        element: &P::Element,
        target: &str,
    ) -> PortResult<Step<P::Element>> {
        if session.is_visited(&visit_key(target)) {
            self.mark(element, MarkStyle::Informational).await?;
            let status = LinkStatus::SkippedVisited;
            session.emit(LinkRecord::new(page, target, LinkKind::Internal, status, depth));
            return Ok(Step::Done(ElementOutcome::Emitted(status)));
        }

        if self.options.max_depth.is_some_and(|max| depth >= max) {
            tracing::debug!(target, depth, "Depth limit reached, probing instead");
            self.mark(element, MarkStyle::Informational).await?;
            return self.probe_instead(session, page, depth, target).await;
        }

        self.mark(element, MarkStyle::Navigating).await?;
        self.open_child(session, page, depth, target).await
    }

    /// Records an internal target from an HTTP probe instead of a visit
    async fn probe_instead(
        &mut self,
        session: &mut CrawlSession,
        page: &str,
        depth: u32,
        target: &str,
    ) -> PortResult<Step<P::Element>> {
        let status = LinkStatus::from_alive(self.prober.probe(target).await);
        session.emit(LinkRecord::new(page, target, LinkKind::Internal, status, depth));
        Ok(Step::Done(ElementOutcome::Emitted(status)))
    }

    /// Opens an internal target in a new tab, judges it, and prepares descent
    async fn open_child(
        &mut self,
        session: &mut CrawlSession,
        page: &str,
        depth: u32,
        target: &str,
    ) -> PortResult<Step<P::Element>> {
        let before = match self.port.tab_handles().await {
            Ok(handles) => handles,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!(target, error = %e, "Could not list tabs");
                return self.probe_instead(session, page, depth, target).await;
            }
        };

        if let Err(e) = self.port.open_in_new_tab(target).await {
            if e.is_fatal() {
                return Err(e);
            }
            tracing::warn!(target, error = %e, "Could not open tab");
            self.restore_active(session.tabs().active().clone()).await?;
            return self.probe_instead(session, page, depth, target).await;
        }

        let opened = match self.port.tab_handles().await {
            Ok(handles) => handles
                .into_iter()
                .find(|handle| !before.contains(handle) && !session.tabs().contains(handle)),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                // The new tab exists but cannot be identified, so it cannot be closed
                tracing::warn!(target, error = %e, "Could not list tabs after opening");
                session.record_orphaned_tab(target, None);
                self.restore_active(session.tabs().active().clone()).await?;
                return self.probe_instead(session, page, depth, target).await;
            }
        };

        let Some(child) = opened else {
            tracing::warn!(target, "New tab did not appear");
            self.restore_active(session.tabs().active().clone()).await?;
            return self.probe_instead(session, page, depth, target).await;
        };

        if let Err(e) = self.port.switch_to_tab(&child).await {
            if e.is_fatal() {
                return Err(e);
            }
            tracing::warn!(target, tab = %child, error = %e, "Could not switch to new tab");
            self.discard_tab(session, target, child).await?;
            self.restore_active(session.tabs().active().clone()).await?;
            return self.probe_instead(session, page, depth, target).await;
        }
        session.tabs_mut().push(child);

        let status = match self.port.wait_until_loaded(self.options.load_timeout).await {
            Ok(()) => {
                let verdict = inspect_page(&mut self.port, self.options.min_body_chars).await?;
                tracing::debug!(target, ?verdict, "Judged page");
                verdict.status()
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!(target, error = %e, "Page did not finish loading");
                let status = LinkStatus::Broken;
                session.emit(LinkRecord::new(page, target, LinkKind::Internal, status, depth));
                return Ok(Step::Opened(ElementOutcome::Emitted(status), None));
            }
        };

        session.emit(LinkRecord::new(page, target, LinkKind::Internal, status, depth));
        let frame = self.enter(session, target, depth + 1).await?;
        Ok(Step::Opened(ElementOutcome::Emitted(status), frame))
    }

    /// Switches back to `active`, the tab on top of the session's tab stack
    async fn restore_active(&mut self, active: TabHandle) -> PortResult<()> {
        best_effort(self.port.switch_to_tab(&active).await, "restore tab")
    }

    /// Closes a child tab that was opened but never entered
    async fn discard_tab(
        &mut self,
        session: &mut CrawlSession,
        target: &str,
        tab: TabHandle,
    ) -> PortResult<()> {
        match self.port.close_tab(&tab).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                tracing::warn!(target, tab = %tab, error = %e, "Could not close abandoned tab");
                session.record_orphaned_tab(target, Some(tab));
                Ok(())
            }
        }
    }

    /// Closes the active child tab and returns to the tab that opened it
    async fn return_to_parent(&mut self, session: &mut CrawlSession) -> PortResult<()> {
        best_effort(self.port.close_current_tab().await, "close tab")?;
        session.tabs_mut().pop();

        let parent = session.tabs().active().clone();
        if let Err(e) = self.port.switch_to_tab(&parent).await {
            if e.is_fatal() {
                return Err(e);
            }
            tracing::warn!(tab = %parent, error = %e, "Could not return to parent tab");
            return Ok(());
        }

        if let Err(e) = self.port.wait_until_loaded(self.options.load_timeout).await {
            if e.is_fatal() {
                return Err(e);
            }
            tracing::warn!(tab = %parent, error = %e, "Parent tab did not finish loading");
        }
        Ok(())
    }
}
