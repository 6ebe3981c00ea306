//! Browser automation port
//!
//! The crawl engine never talks to a browser directly. It drives a
//! [`BrowserPort`], which exposes the small set of capabilities the traversal
//! needs: navigation, page reads, element queries, tab management and a
//! load-completion wait.
//!
//! Two adapters are provided:
//! - [`ChromePort`] drives a real Chromium over the DevTools protocol
//! - [`StaticPort`] emulates tabs over plain HTTP fetches and parsed HTML

mod chrome;
mod static_page;

pub use chrome::{launch_chrome, ChromeOptions, ChromePort};
pub use static_page::{StaticElement, StaticPort};

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a browser port
#[derive(Debug, Error)]
pub enum PortError {
    /// The browser or its connection is gone. No further call can succeed.
    #[error("Browser session lost: {0}")]
    SessionLost(String),

    /// A navigation or load wait did not complete in time
    #[error("Timed out: {0}")]
    Timeout(String),

    /// The element no longer exists in the page
    #[error("Stale element: {0}")]
    StaleElement(String),

    /// The requested tab is not open
    #[error("No such tab: {0}")]
    NoSuchTab(String),

    /// A script or DOM call failed inside the page
    #[error("Script error: {0}")]
    Script(String),

    /// A page could not be fetched or opened
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// The browser could not be started
    #[error("Browser launch failed: {0}")]
    Launch(String),
}

impl PortError {
    /// Returns true if the error ends the whole crawl
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SessionLost(_) | Self::Launch(_))
    }
}

/// Result type alias for port operations
pub type PortResult<T> = std::result::Result<T, PortError>;

/// Opaque identifier of an open tab
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TabHandle(String);

impl TabHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TabHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The element sets the engine asks a page for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementQuery {
    /// Anchors with an `href`, and button-like elements with an `onclick`
    NavigationTargets,

    /// Collapsed menu entries inside the header navigation
    CollapsedMenus,
}

impl ElementQuery {
    /// XPath form, for adapters backed by a live DOM
    pub fn xpath(&self) -> &'static str {
        match self {
            Self::NavigationTargets => {
                "//a[@href] | //button[@onclick] | //*[@role='button' and @onclick]"
            }
            Self::CollapsedMenus => {
                "//header//nav//li[contains(@class,'menu') or contains(@class,'has-children')]"
            }
        }
    }

    /// CSS selector form, for adapters backed by parsed HTML
    pub fn css(&self) -> &'static str {
        match self {
            Self::NavigationTargets => "a[href], button[onclick], [role='button'][onclick]",
            Self::CollapsedMenus => {
                "header nav li[class*='menu'], header nav li[class*='has-children']"
            }
        }
    }
}

/// Visual marking applied to an element while it is processed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkStyle {
    /// The element was probed or skipped
    Informational,

    /// The engine is about to open the element's target
    Navigating,
}

impl MarkStyle {
    /// Background colour painted on the element
    pub fn background(&self) -> &'static str {
        match self {
            Self::Informational => "#fff6b3",
            Self::Navigating => "#ffd6d6",
        }
    }

    /// Outline colour painted around the element
    pub fn outline(&self) -> &'static str {
        match self {
            Self::Informational => "gold",
            Self::Navigating => "red",
        }
    }

    /// Function declaration that paints the element it is called on
    pub fn script(&self) -> String {
        format!(
            "function() {{ this.style.outline = '3px solid {}'; this.style.backgroundColor = '{}'; }}",
            self.outline(),
            self.background()
        )
    }
}

/// Capabilities the crawl engine consumes from a browser
///
/// All methods act on the currently active tab unless they take a handle.
/// Hrefs returned by [`BrowserPort::attribute`] are absolute, resolved
/// against the page they were found on, the way a browser reports them.
#[async_trait]
pub trait BrowserPort: Send {
    /// Handle to an element of the active page
    type Element: Send + Sync;

    async fn navigate(&mut self, url: &str) -> PortResult<()>;

    async fn current_url(&mut self) -> PortResult<String>;

    async fn title(&mut self) -> PortResult<String>;

    async fn body_text(&mut self) -> PortResult<String>;

    /// Enumerates the elements matching `query`, in document order
    async fn find_elements(&mut self, query: ElementQuery) -> PortResult<Vec<Self::Element>>;

    /// Reads an attribute, `None` when the element does not carry it
    async fn attribute(&mut self, element: &Self::Element, name: &str)
        -> PortResult<Option<String>>;

    async fn scroll_into_view(&mut self, element: &Self::Element) -> PortResult<()>;

    async fn hover(&mut self, element: &Self::Element) -> PortResult<()>;

    async fn mark(&mut self, element: &Self::Element, style: MarkStyle) -> PortResult<()>;

    /// Evaluates a script in the active page and returns its string result
    async fn run_script(&mut self, script: &str) -> PortResult<Option<String>>;

    /// Opens `url` in a new tab without switching to it
    async fn open_in_new_tab(&mut self, url: &str) -> PortResult<()>;

    /// Handle of the active tab
    async fn current_tab(&mut self) -> PortResult<TabHandle>;

    /// Handles of every open tab
    async fn tab_handles(&mut self) -> PortResult<Vec<TabHandle>>;

    async fn switch_to_tab(&mut self, handle: &TabHandle) -> PortResult<()>;

    /// Closes the active tab. The caller must switch to another tab afterwards.
    async fn close_current_tab(&mut self) -> PortResult<()>;

    /// Closes the tab with `handle` without switching to it
    async fn close_tab(&mut self, handle: &TabHandle) -> PortResult<()>;

    /// Waits until the active page reports its load as complete
    async fn wait_until_loaded(&mut self, timeout: Duration) -> PortResult<()>;

    /// Releases the browser
    async fn shutdown(&mut self) -> PortResult<()>;
}
