//! Chromium adapter
//!
//! Drives a real browser over the DevTools protocol with `chromiumoxide`.
//! Tabs are CDP page targets; the adapter keeps its own ordered list of the
//! pages it opened and an index of the active one, since CDP has no notion
//! of a "current" tab that outlives a focus change.

use super::{BrowserPort, ElementQuery, MarkStyle, PortError, PortResult, TabHandle};
use crate::config::BrowserSettings;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;

/// How often the load wait re-reads `document.readyState`
const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Options for launching Chromium
#[derive(Debug, Clone)]
pub struct ChromeOptions {
    pub headless: bool,
    pub executable: Option<PathBuf>,
    pub window_width: u32,
    pub window_height: u32,
    pub no_sandbox: bool,
}

impl Default for ChromeOptions {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            window_width: 1366,
            window_height: 900,
            no_sandbox: false,
        }
    }
}

impl From<&BrowserSettings> for ChromeOptions {
    fn from(settings: &BrowserSettings) -> Self {
        Self {
            headless: settings.headless,
            executable: settings.chrome_executable.clone(),
            window_width: settings.window_width,
            window_height: settings.window_height,
            no_sandbox: settings.no_sandbox,
        }
    }
}

/// Launches Chromium and returns a port with one blank root tab
///
/// The CDP handler stream is polled on a spawned task for the lifetime of
/// the port.
///
/// # Errors
///
/// Returns `PortError::Launch` if the browser config is rejected, the
/// executable cannot be started, or the first tab cannot be created.
pub async fn launch_chrome(options: &ChromeOptions) -> PortResult<ChromePort> {
    let mut builder =
        BrowserConfig::builder().window_size(options.window_width, options.window_height);

    if !options.headless {
        builder = builder.with_head();
    }
    if options.no_sandbox {
        builder = builder.no_sandbox();
    }
    if let Some(path) = &options.executable {
        builder = builder.chrome_executable(path);
    }

    let config = builder
        .build()
        .map_err(|e| PortError::Launch(format!("invalid browser config: {}", e)))?;

    tracing::info!(
        headless = options.headless,
        executable = ?options.executable,
        "Launching Chromium"
    );

    let (browser, mut handler) = Browser::launch(config)
        .await
        .map_err(|e| PortError::Launch(e.to_string()))?;

    let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

    let root = browser
        .new_page("about:blank")
        .await
        .map_err(|e| PortError::Launch(format!("failed to open root tab: {}", e)))?;

    Ok(ChromePort {
        browser,
        handler_task,
        tabs: vec![(handle_of(&root), root)],
        active: 0,
    })
}

fn handle_of(page: &Page) -> TabHandle {
    TabHandle::new(page.target_id().inner().clone())
}

/// Maps a CDP failure onto the port's error kinds
///
/// Transport failures mean the browser is gone; everything else is local to
/// the call that raised it.
fn map_cdp(error: CdpError) -> PortError {
    match error {
        CdpError::Ws(_)
        | CdpError::Io(_)
        | CdpError::NoResponse
        | CdpError::ChannelSendError(_)
        | CdpError::LaunchExit(..)
        | CdpError::LaunchTimeout(_)
        | CdpError::LaunchIo(..) => PortError::SessionLost(error.to_string()),
        CdpError::Timeout => PortError::Timeout(error.to_string()),
        CdpError::NotFound | CdpError::ScrollingFailed(_) => {
            PortError::StaleElement(error.to_string())
        }
        other => PortError::Script(other.to_string()),
    }
}

/// Keeps fatal errors fatal and relabels the rest as navigation failures
fn map_navigation(error: CdpError) -> PortError {
    match map_cdp(error) {
        PortError::Script(message) | PortError::StaleElement(message) => {
            PortError::Navigation(message)
        }
        other => other,
    }
}

/// A [`BrowserPort`] backed by a live Chromium instance
pub struct ChromePort {
    browser: Browser,
    handler_task: JoinHandle<()>,
    tabs: Vec<(TabHandle, Page)>,
    active: usize,
}

impl ChromePort {
    fn ensure_alive(&self) -> PortResult<()> {
        if self.handler_task.is_finished() {
            return Err(PortError::SessionLost(
                "DevTools connection closed".to_string(),
            ));
        }
        Ok(())
    }

    fn active_page(&self) -> PortResult<&Page> {
        self.ensure_alive()?;
        self.tabs
            .get(self.active)
            .map(|(_, page)| page)
            .ok_or_else(|| PortError::NoSuchTab("no active tab".to_string()))
    }

    async fn evaluate_string(&self, script: &str) -> PortResult<Option<String>> {
        let result = self.active_page()?.evaluate(script).await.map_err(map_cdp)?;
        Ok(match result.value() {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        })
    }
}

#[async_trait]
impl BrowserPort for ChromePort {
    type Element = Element;

    async fn navigate(&mut self, url: &str) -> PortResult<()> {
        self.active_page()?.goto(url).await.map_err(map_navigation)?;
        Ok(())
    }

    async fn current_url(&mut self) -> PortResult<String> {
        let url = self.active_page()?.url().await.map_err(map_cdp)?;
        Ok(url.unwrap_or_default())
    }

    async fn title(&mut self) -> PortResult<String> {
        let title = self.active_page()?.get_title().await.map_err(map_cdp)?;
        Ok(title.unwrap_or_default())
    }

    async fn body_text(&mut self) -> PortResult<String> {
        let text = self
            .evaluate_string("document.body ? document.body.innerText : ''")
            .await?;
        Ok(text.unwrap_or_default())
    }

    async fn find_elements(&mut self, query: ElementQuery) -> PortResult<Vec<Element>> {
        self.active_page()?
            .find_xpaths(query.xpath())
            .await
            .map_err(map_cdp)
    }

    async fn attribute(&mut self, element: &Element, name: &str) -> PortResult<Option<String>> {
        self.ensure_alive()?;

        // The href property is already resolved against the document base
        if name == "href" {
            if let Some(Value::String(href)) = element.property("href").await.map_err(map_cdp)? {
                if !href.is_empty() {
                    return Ok(Some(href));
                }
            }
        }

        element.attribute(name).await.map_err(map_cdp)
    }

    async fn scroll_into_view(&mut self, element: &Element) -> PortResult<()> {
        self.ensure_alive()?;
        element.scroll_into_view().await.map_err(map_cdp)?;
        Ok(())
    }

    async fn hover(&mut self, element: &Element) -> PortResult<()> {
        self.ensure_alive()?;
        element.hover().await.map_err(map_cdp)?;
        Ok(())
    }

    async fn mark(&mut self, element: &Element, style: MarkStyle) -> PortResult<()> {
        self.ensure_alive()?;
        element
            .call_js_fn(style.script(), false)
            .await
            .map_err(map_cdp)?;
        Ok(())
    }

    async fn run_script(&mut self, script: &str) -> PortResult<Option<String>> {
        self.evaluate_string(script).await
    }

    async fn open_in_new_tab(&mut self, url: &str) -> PortResult<()> {
        self.ensure_alive()?;
        let page = self.browser.new_page(url).await.map_err(map_navigation)?;
        let handle = handle_of(&page);
        tracing::debug!(tab = %handle, url, "Opened tab");
        self.tabs.push((handle, page));
        Ok(())
    }

    async fn current_tab(&mut self) -> PortResult<TabHandle> {
        self.ensure_alive()?;
        self.tabs
            .get(self.active)
            .map(|(handle, _)| handle.clone())
            .ok_or_else(|| PortError::NoSuchTab("no active tab".to_string()))
    }

    async fn tab_handles(&mut self) -> PortResult<Vec<TabHandle>> {
        self.ensure_alive()?;
        Ok(self.tabs.iter().map(|(handle, _)| handle.clone()).collect())
    }

    async fn switch_to_tab(&mut self, handle: &TabHandle) -> PortResult<()> {
        self.ensure_alive()?;
        let index = self
            .tabs
            .iter()
            .position(|(h, _)| h == handle)
            .ok_or_else(|| PortError::NoSuchTab(handle.to_string()))?;

        self.tabs[index].1.activate().await.map_err(map_cdp)?;
        self.active = index;
        Ok(())
    }

    async fn close_current_tab(&mut self) -> PortResult<()> {
        self.ensure_alive()?;
        if self.active >= self.tabs.len() {
            return Err(PortError::NoSuchTab("no active tab".to_string()));
        }

        let (handle, page) = self.tabs.remove(self.active);
        self.active = 0;
        tracing::debug!(tab = %handle, "Closing tab");
        page.close().await.map_err(map_cdp)
    }

    async fn close_tab(&mut self, handle: &TabHandle) -> PortResult<()> {
        self.ensure_alive()?;
        let index = self
            .tabs
            .iter()
            .position(|(h, _)| h == handle)
            .ok_or_else(|| PortError::NoSuchTab(handle.to_string()))?;

        let (_, page) = self.tabs.remove(index);
        if index < self.active {
            self.active -= 1;
        } else if index == self.active {
            self.active = 0;
        }
        tracing::debug!(tab = %handle, "Closing background tab");
        page.close().await.map_err(map_cdp)
    }

    async fn wait_until_loaded(&mut self, timeout: Duration) -> PortResult<()> {
        let wait = async {
            loop {
                let state = self.evaluate_string("document.readyState").await?;
                if state.as_deref() == Some("complete") {
                    return Ok::<(), PortError>(());
                }
                tokio::time::sleep(READY_POLL_INTERVAL).await;
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result,
            Err(_) => Err(PortError::Timeout(format!(
                "page not complete after {}s",
                timeout.as_secs()
            ))),
        }
    }

    async fn shutdown(&mut self) -> PortResult<()> {
        self.tabs.clear();
        let closed = self.browser.close().await;
        if let Err(e) = self.browser.wait().await {
            tracing::warn!(error = %e, "Browser process did not exit cleanly");
        }
        self.handler_task.abort();
        closed.map(|_| ()).map_err(map_cdp)
    }
}
