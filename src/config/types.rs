use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for LinkScout
///
/// Every section is optional; an empty file yields the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub probe: ProbeConfig,
    pub browser: BrowserSettings,
    pub output: OutputConfig,
    pub server: ServerConfig,
}

/// Traversal behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Seconds to wait for a page to report its load as complete
    pub load_timeout_secs: u64,

    /// Pages whose body text is shorter than this are judged broken
    pub min_body_chars: usize,

    /// Pause after hovering a collapsed menu (milliseconds)
    pub menu_settle_ms: u64,

    /// Pause after scrolling an element into view (milliseconds)
    pub scroll_settle_ms: u64,

    /// Pause after marking an element (milliseconds)
    pub mark_settle_ms: u64,

    /// Deepest descent allowed; internal pages below it are probed instead
    pub max_depth: Option<u32>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            load_timeout_secs: 15,
            min_body_chars: 80,
            menu_settle_ms: 120,
            scroll_settle_ms: 120,
            mark_settle_ms: 90,
            max_depth: None,
        }
    }
}

impl CrawlerConfig {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }
}

/// Liveness probe configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProbeConfig {
    /// Connect timeout for HEAD probes (seconds)
    pub connect_timeout_secs: u64,

    /// Overall timeout for a single request (seconds)
    pub request_timeout_secs: u64,

    /// User agent sent with probes and static page fetches
    pub user_agent: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 6,
            request_timeout_secs: 20,
            user_agent: format!("linkscout/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Which browser adapter drives the crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserBackend {
    /// Chromium over the DevTools protocol
    #[default]
    Chrome,
    /// Plain HTTP fetches with parsed HTML
    Static,
}

/// Browser provisioning configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BrowserSettings {
    pub backend: BrowserBackend,
    pub headless: bool,
    pub chrome_executable: Option<PathBuf>,
    pub window_width: u32,
    pub window_height: u32,
    pub no_sandbox: bool,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            backend: BrowserBackend::Chrome,
            headless: true,
            chrome_executable: None,
            window_width: 1366,
            window_height: 900,
            no_sandbox: false,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Directory the CSV reports are written to and served from
    pub report_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            report_dir: PathBuf::from("reports"),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ServerConfig {
    /// Socket address the HTTP surface listens on
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}
