//! Script-less browser emulation over HTTP
//!
//! This adapter fetches pages with `reqwest` and reads them with `scraper`,
//! emulating tabs as a list of loaded documents. It cannot run page scripts
//! or reveal menus, but it behaves like a browser in everything the crawl
//! engine observes: hrefs come back resolved against the page, failed loads
//! still leave an (empty) page in the tab, and titles and body text are
//! read from the parsed document.

use super::{BrowserPort, ElementQuery, MarkStyle, PortError, PortResult, TabHandle};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Node, Selector};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Element snapshot taken from a parsed page
///
/// Attribute values are captured when the element is enumerated. `href` is
/// stored already resolved against the page's base URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticElement {
    pub tag: String,
    pub attributes: HashMap<String, String>,
}

/// A document loaded into an emulated tab
#[derive(Debug, Clone, Default)]
struct LoadedPage {
    url: String,
    html: String,
}

impl LoadedPage {
    fn blank() -> Self {
        Self {
            url: "about:blank".to_string(),
            html: String::new(),
        }
    }
}

#[derive(Debug)]
struct StaticTab {
    handle: TabHandle,
    page: LoadedPage,
}

/// A [`BrowserPort`] backed by plain HTTP fetches
pub struct StaticPort {
    client: Client,
    tabs: Vec<StaticTab>,
    active: usize,
    next_tab: u64,
}

impl StaticPort {
    /// Creates a port with one blank root tab
    pub fn new(client: Client) -> Self {
        let mut port = Self {
            client,
            tabs: Vec::new(),
            active: 0,
            next_tab: 0,
        };
        let root = port.allocate_handle();
        port.tabs.push(StaticTab {
            handle: root,
            page: LoadedPage::blank(),
        });
        port
    }

    fn allocate_handle(&mut self) -> TabHandle {
        let handle = TabHandle::new(format!("static-tab-{}", self.next_tab));
        self.next_tab += 1;
        handle
    }

    fn active_tab(&self) -> PortResult<&StaticTab> {
        self.tabs
            .get(self.active)
            .ok_or_else(|| PortError::NoSuchTab("no active tab".to_string()))
    }

    /// Fetches a page the way a browser tab would load it
    ///
    /// Transport failures do not fail the load; they leave an empty document
    /// behind, like a browser's error page. Non-HTML responses are kept
    /// without a document body.
    async fn load(&self, url: &str) -> LoadedPage {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url, error = %e, "Page fetch failed");
                return LoadedPage {
                    url: url.to_string(),
                    html: String::new(),
                };
            }
        };

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("text/html") || ct.contains("application/xhtml"))
            .unwrap_or(true);

        let html = if is_html {
            response.text().await.unwrap_or_else(|e| {
                tracing::warn!(url, error = %e, "Failed to read page body");
                String::new()
            })
        } else {
            String::new()
        };

        tracing::debug!(url, status, final_url = %final_url, "Loaded page");

        LoadedPage {
            url: final_url,
            html,
        }
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> String {
    Selector::parse("title")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .map(|element| element.text().collect::<String>().trim().to_string())
        })
        .unwrap_or_default()
}

/// Collects the rendered text of `<body>`, leaving out script and style content
fn extract_body_text(document: &Html) -> String {
    let Ok(selector) = Selector::parse("body") else {
        return String::new();
    };
    let Some(body) = document.select(&selector).next() else {
        return String::new();
    };

    let mut words = Vec::new();
    for node in body.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|parent| parent.value().as_element().map(|e| e.name()))
            .is_some_and(|name| matches!(name, "script" | "style" | "noscript" | "template"));
        if !hidden {
            words.extend(text.split_whitespace());
        }
    }

    words.join(" ")
}

/// Resolves the document base, honouring a `<base href>` element
fn document_base(document: &Html, page_url: &str) -> Option<Url> {
    let page = Url::parse(page_url).ok()?;
    let base_href = Selector::parse("base[href]").ok().and_then(|selector| {
        document
            .select(&selector)
            .next()
            .and_then(|element| element.value().attr("href").map(str::to_string))
    });

    match base_href {
        Some(href) => page.join(href.trim()).ok().or(Some(page)),
        None => Some(page),
    }
}

/// Snapshots every element matching `query`, in document order
fn snapshot_elements(html: &str, page_url: &str, query: ElementQuery) -> Vec<StaticElement> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse(query.css()) else {
        return Vec::new();
    };
    let base = document_base(&document, page_url);

    document
        .select(&selector)
        .map(|element| {
            let mut attributes: HashMap<String, String> = element
                .value()
                .attrs()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect();

            if let (Some(href), Some(base)) = (attributes.get_mut("href"), base.as_ref()) {
                if let Ok(resolved) = base.join(href.trim()) {
                    *href = resolved.to_string();
                }
            }

            StaticElement {
                tag: element.value().name().to_string(),
                attributes,
            }
        })
        .collect()
}

#[async_trait]
impl BrowserPort for StaticPort {
    type Element = StaticElement;

    async fn navigate(&mut self, url: &str) -> PortResult<()> {
        self.active_tab()?;
        let page = self.load(url).await;
        self.tabs[self.active].page = page;
        Ok(())
    }

    async fn current_url(&mut self) -> PortResult<String> {
        Ok(self.active_tab()?.page.url.clone())
    }

    async fn title(&mut self) -> PortResult<String> {
        let tab = self.active_tab()?;
        Ok(extract_title(&Html::parse_document(&tab.page.html)))
    }

    async fn body_text(&mut self) -> PortResult<String> {
        let tab = self.active_tab()?;
        Ok(extract_body_text(&Html::parse_document(&tab.page.html)))
    }

    async fn find_elements(&mut self, query: ElementQuery) -> PortResult<Vec<StaticElement>> {
        let tab = self.active_tab()?;
        Ok(snapshot_elements(&tab.page.html, &tab.page.url, query))
    }

    async fn attribute(
        &mut self,
        element: &StaticElement,
        name: &str,
    ) -> PortResult<Option<String>> {
        Ok(element.attributes.get(name).cloned())
    }

    async fn scroll_into_view(&mut self, _element: &StaticElement) -> PortResult<()> {
        Ok(())
    }

    async fn hover(&mut self, _element: &StaticElement) -> PortResult<()> {
        Ok(())
    }

    async fn mark(&mut self, element: &StaticElement, style: MarkStyle) -> PortResult<()> {
        tracing::trace!(tag = %element.tag, ?style, "Marking element");
        Ok(())
    }

    /// Answers the few page queries that need no script engine
    async fn run_script(&mut self, script: &str) -> PortResult<Option<String>> {
        match script.trim() {
            "document.readyState" => {
                self.active_tab()?;
                Ok(Some("complete".to_string()))
            }
            "document.title" => self.title().await.map(Some),
            "document.URL" | "location.href" => self.current_url().await.map(Some),
            _ => Err(PortError::Script(
                "scripts are not supported without a browser".to_string(),
            )),
        }
    }

    async fn open_in_new_tab(&mut self, url: &str) -> PortResult<()> {
        let page = self.load(url).await;
        let handle = self.allocate_handle();
        tracing::debug!(tab = %handle, url, "Opened tab");
        self.tabs.push(StaticTab { handle, page });
        Ok(())
    }

    async fn current_tab(&mut self) -> PortResult<TabHandle> {
        Ok(self.active_tab()?.handle.clone())
    }

    async fn tab_handles(&mut self) -> PortResult<Vec<TabHandle>> {
        Ok(self.tabs.iter().map(|tab| tab.handle.clone()).collect())
    }

    async fn switch_to_tab(&mut self, handle: &TabHandle) -> PortResult<()> {
        self.active = self
            .tabs
            .iter()
            .position(|tab| &tab.handle == handle)
            .ok_or_else(|| PortError::NoSuchTab(handle.to_string()))?;
        Ok(())
    }

    async fn close_current_tab(&mut self) -> PortResult<()> {
        self.active_tab()?;
        let tab = self.tabs.remove(self.active);
        self.active = 0;
        tracing::debug!(tab = %tab.handle, "Closing tab");
        Ok(())
    }

    async fn close_tab(&mut self, handle: &TabHandle) -> PortResult<()> {
        let index = self
            .tabs
            .iter()
            .position(|tab| &tab.handle == handle)
            .ok_or_else(|| PortError::NoSuchTab(handle.to_string()))?;

        self.tabs.remove(index);
        if index < self.active {
            self.active -= 1;
        } else if index == self.active {
            self.active = 0;
        }
        tracing::debug!(tab = %handle, "Closing background tab");
        Ok(())
    }

    async fn wait_until_loaded(&mut self, _timeout: Duration) -> PortResult<()> {
        // Loads complete before navigate/open return
        self.active_tab().map(|_| ())
    }

    async fn shutdown(&mut self) -> PortResult<()> {
        self.tabs.clear();
        Ok(())
    }
}
