//! Simulated browser and liveness checker for driving the crawl engine
//!
//! `SimSite` describes a site as a map of pages; `SimPort` plays a browser
//! over it with real tab bookkeeping so tests can check that every opened
//! tab is closed again.

use async_trait::async_trait;
use linkscout::crawler::LivenessProbe;
use linkscout::port::{BrowserPort, ElementQuery, MarkStyle, PortError, PortResult, TabHandle};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BODY: &str = "This page has plenty of ordinary content so the broken page \
    heuristic treats it as a real, healthy page of the site.";

/// One element of a simulated page
#[derive(Debug, Clone, Default)]
pub struct SimElement {
    pub href: Option<String>,
    pub onclick: Option<String>,
}

impl SimElement {
    pub fn link(href: &str) -> Self {
        Self {
            href: Some(href.to_string()),
            onclick: None,
        }
    }

    pub fn button(onclick: &str) -> Self {
        Self {
            href: None,
            onclick: Some(onclick.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimPage {
    pub title: String,
    pub body: String,
    pub elements: Vec<SimElement>,
}

/// A site the simulated browser can visit
#[derive(Debug, Clone, Default)]
pub struct SimSite {
    pages: HashMap<String, SimPage>,
    redirects: HashMap<String, String>,
    slow: HashSet<String>,
    session_killers: HashSet<String>,
    unopenable: HashSet<String>,
    unswitchable: HashSet<String>,
    unclosable: HashSet<String>,
    hides_tabs: HashSet<String>,
}

impl SimSite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a healthy page whose elements are plain links
    pub fn page(self, url: &str, links: &[&str]) -> Self {
        let elements = links.iter().map(|href| SimElement::link(href)).collect();
        self.page_with(url, "Welcome", BODY, elements)
    }

    pub fn page_with(mut self, url: &str, title: &str, body: &str, elements: Vec<SimElement>) -> Self {
        self.pages.insert(
            url.to_string(),
            SimPage {
                title: title.to_string(),
                body: body.to_string(),
                elements,
            },
        );
        self
    }

    /// Opening `from` lands on `to`
    pub fn redirect(mut self, from: &str, to: &str) -> Self {
        self.redirects.insert(from.to_string(), to.to_string());
        self
    }

    /// The page never finishes loading
    pub fn slow(mut self, url: &str) -> Self {
        self.slow.insert(url.to_string());
        self
    }

    /// Loading the page kills the browser session
    pub fn kills_session(mut self, url: &str) -> Self {
        self.session_killers.insert(url.to_string());
        self
    }

    /// Opening the page in a new tab silently does nothing
    pub fn unopenable(mut self, url: &str) -> Self {
        self.unopenable.insert(url.to_string());
        self
    }

    /// The browser refuses to activate a tab showing the page
    pub fn unswitchable(mut self, url: &str) -> Self {
        self.unswitchable.insert(url.to_string());
        self
    }

    /// The browser refuses to close a tab showing the page
    pub fn unclosable(mut self, url: &str) -> Self {
        self.unclosable.insert(url.to_string());
        self
    }

    /// Listing tabs fails once, right after the page is opened in a new tab
    pub fn hides_tabs(mut self, url: &str) -> Self {
        self.hides_tabs.insert(url.to_string());
        self
    }

    fn lookup(&self, url: &str) -> Option<&SimPage> {
        self.pages
            .get(url)
            .or_else(|| self.pages.get(url.trim_end_matches('/')))
            .or_else(|| self.pages.get(&format!("{}/", url)))
    }
}

/// Counters shared between a `SimPort` and the test that created it
#[derive(Debug, Default)]
pub struct SimStats {
    pub tabs_opened: usize,
    pub tabs_closed: usize,
    pub max_open_tabs: usize,
    pub loads: Vec<String>,
    pub marks: Vec<MarkStyle>,
}

pub struct SimPort {
    site: SimSite,
    tabs: Vec<(TabHandle, String)>,
    active: usize,
    next_id: usize,
    dead: bool,
    tab_list_broken: bool,
    stats: Arc<Mutex<SimStats>>,
}

impl SimPort {
    pub fn new(site: SimSite) -> (Self, Arc<Mutex<SimStats>>) {
        let stats = Arc::new(Mutex::new(SimStats::default()));
        let port = Self {
            site,
            tabs: vec![(TabHandle::new("tab-0"), "about:blank".to_string())],
            active: 0,
            next_id: 1,
            dead: false,
            tab_list_broken: false,
            stats: Arc::clone(&stats),
        };
        (port, stats)
    }

    fn alive(&self) -> PortResult<()> {
        if self.dead {
            Err(PortError::SessionLost("browser crashed".to_string()))
        } else {
            Ok(())
        }
    }

    fn current(&self) -> &str {
        &self.tabs[self.active].1
    }

    fn resolve(&self, url: &str) -> String {
        self.site
            .redirects
            .get(url)
            .cloned()
            .unwrap_or_else(|| url.to_string())
    }
}

#[async_trait]
impl BrowserPort for SimPort {
    type Element = SimElement;

    async fn navigate(&mut self, url: &str) -> PortResult<()> {
        self.alive()?;
        let url = self.resolve(url);
        self.tabs[self.active].1 = url;
        Ok(())
    }

    async fn current_url(&mut self) -> PortResult<String> {
        self.alive()?;
        Ok(self.current().to_string())
    }

    async fn title(&mut self) -> PortResult<String> {
        self.alive()?;
        Ok(self
            .site
            .lookup(self.current())
            .map(|page| page.title.clone())
            .unwrap_or_else(|| "404 Not Found".to_string()))
    }

    async fn body_text(&mut self) -> PortResult<String> {
        self.alive()?;
        Ok(self
            .site
            .lookup(self.current())
            .map(|page| page.body.clone())
            .unwrap_or_default())
    }

    async fn find_elements(&mut self, query: ElementQuery) -> PortResult<Vec<SimElement>> {
        self.alive()?;
        match query {
            ElementQuery::CollapsedMenus => Ok(Vec::new()),
            ElementQuery::NavigationTargets => Ok(self
                .site
                .lookup(self.current())
                .map(|page| page.elements.clone())
                .unwrap_or_default()),
        }
    }

    async fn attribute(&mut self, element: &SimElement, name: &str) -> PortResult<Option<String>> {
        self.alive()?;
        Ok(match name {
            "href" => element.href.clone(),
            "onclick" => element.onclick.clone(),
            _ => None,
        })
    }

    async fn scroll_into_view(&mut self, _element: &SimElement) -> PortResult<()> {
        self.alive()
    }

    async fn hover(&mut self, _element: &SimElement) -> PortResult<()> {
        self.alive()
    }

    async fn mark(&mut self, _element: &SimElement, style: MarkStyle) -> PortResult<()> {
        self.alive()?;
        self.stats.lock().unwrap().marks.push(style);
        Ok(())
    }

    async fn run_script(&mut self, _script: &str) -> PortResult<Option<String>> {
        self.alive()?;
        Ok(None)
    }

    async fn open_in_new_tab(&mut self, url: &str) -> PortResult<()> {
        self.alive()?;
        if self.site.unopenable.contains(url) {
            return Ok(());
        }
        let handle = TabHandle::new(format!("tab-{}", self.next_id));
        self.next_id += 1;
        self.tab_list_broken = self.site.hides_tabs.contains(url);
        let url = self.resolve(url);
        self.tabs.push((handle, url));

        let mut stats = self.stats.lock().unwrap();
        stats.tabs_opened += 1;
        stats.max_open_tabs = stats.max_open_tabs.max(self.tabs.len());
        Ok(())
    }

    async fn current_tab(&mut self) -> PortResult<TabHandle> {
        self.alive()?;
        Ok(self.tabs[self.active].0.clone())
    }

    async fn tab_handles(&mut self) -> PortResult<Vec<TabHandle>> {
        self.alive()?;
        if std::mem::take(&mut self.tab_list_broken) {
            return Err(PortError::Script("tab list unavailable".to_string()));
        }
        Ok(self.tabs.iter().map(|(handle, _)| handle.clone()).collect())
    }

    async fn switch_to_tab(&mut self, handle: &TabHandle) -> PortResult<()> {
        self.alive()?;
        match self.tabs.iter().position(|(h, _)| h == handle) {
            Some(index) if self.site.unswitchable.contains(&self.tabs[index].1) => {
                Err(PortError::Script(format!("cannot activate {}", handle)))
            }
            Some(index) => {
                self.active = index;
                Ok(())
            }
            None => Err(PortError::NoSuchTab(handle.to_string())),
        }
    }

    async fn close_current_tab(&mut self) -> PortResult<()> {
        self.alive()?;
        if self.tabs.len() == 1 {
            return Err(PortError::NoSuchTab("refusing to close the last tab".to_string()));
        }
        self.tabs.remove(self.active);
        self.active = 0;
        self.stats.lock().unwrap().tabs_closed += 1;
        Ok(())
    }

    async fn close_tab(&mut self, handle: &TabHandle) -> PortResult<()> {
        self.alive()?;
        let index = self
            .tabs
            .iter()
            .position(|(h, _)| h == handle)
            .ok_or_else(|| PortError::NoSuchTab(handle.to_string()))?;
        if self.site.unclosable.contains(&self.tabs[index].1) {
            return Err(PortError::Script(format!("cannot close {}", handle)));
        }

        self.tabs.remove(index);
        if index < self.active {
            self.active -= 1;
        } else if index == self.active {
            self.active = 0;
        }
        self.stats.lock().unwrap().tabs_closed += 1;
        Ok(())
    }

    async fn wait_until_loaded(&mut self, _timeout: Duration) -> PortResult<()> {
        self.alive()?;
        let url = self.current().to_string();
        if self.site.session_killers.contains(&url) {
            self.dead = true;
            return Err(PortError::SessionLost("browser crashed".to_string()));
        }
        if self.site.slow.contains(&url) {
            return Err(PortError::Timeout(format!("{} did not load", url)));
        }
        self.stats.lock().unwrap().loads.push(url);
        Ok(())
    }

    async fn shutdown(&mut self) -> PortResult<()> {
        Ok(())
    }
}

/// Liveness checker answering from a fixed set of live URLs
#[derive(Debug, Clone, Default)]
pub struct FakeLiveness {
    alive: HashSet<String>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl FakeLiveness {
    pub fn alive(urls: &[&str]) -> Self {
        Self {
            alive: urls.iter().map(|url| url.to_string()).collect(),
            calls: Arc::default(),
        }
    }

    pub fn checked(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LivenessProbe for FakeLiveness {
    async fn probe(&self, url: &str) -> bool {
        self.calls.lock().unwrap().push(url.to_string());
        self.alive.contains(url)
    }
}

/// Progress sink that keeps every rendered line
pub fn collect_lines() -> (impl FnMut(&str) + Send + 'static, Arc<Mutex<Vec<String>>>) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink_lines = Arc::clone(&lines);
    (
        move |line: &str| sink_lines.lock().unwrap().push(line.to_string()),
        lines,
    )
}
