//! Crawl service
//!
//! Runs at most one crawl at a time in the background and exposes its live
//! status. Each crawl launches its own browser through a [`BrowserLauncher`],
//! writes the CSV report pair when it ends, and appends a final
//! `=== COMPLETED ===` or `ERROR: <message>` line to the status log.

pub mod server;

use crate::config::{BrowserSettings, Config};
use crate::crawler::crawl_site;
use crate::output::{
    validate_report_name, write_reports, CrawlCounters, ProgressEvent, ProgressSink, Report,
};
use crate::port::{launch_chrome, BrowserPort, ChromeOptions, ChromePort, PortResult, StaticPort};
use crate::url::base_host;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Provisions a fresh browser for each crawl
#[async_trait]
pub trait BrowserLauncher: Send + Sync + 'static {
    type Port: BrowserPort + 'static;

    async fn launch(&self) -> PortResult<Self::Port>;
}

/// Launches Chromium
#[derive(Debug, Clone, Default)]
pub struct ChromeLauncher {
    options: ChromeOptions,
}

impl ChromeLauncher {
    pub fn new(options: ChromeOptions) -> Self {
        Self { options }
    }
}

impl From<&BrowserSettings> for ChromeLauncher {
    fn from(settings: &BrowserSettings) -> Self {
        Self::new(ChromeOptions::from(settings))
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    type Port = ChromePort;

    async fn launch(&self) -> PortResult<ChromePort> {
        launch_chrome(&self.options).await
    }
}

/// Hands out script-less HTTP browsers sharing one client
#[derive(Debug, Clone)]
pub struct StaticLauncher {
    client: Client,
}

impl StaticLauncher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BrowserLauncher for StaticLauncher {
    type Port = StaticPort;

    async fn launch(&self) -> PortResult<StaticPort> {
        Ok(StaticPort::new(self.client.clone()))
    }
}

/// Errors returned when a crawl cannot be started
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("A crawl is already running. Please wait.")]
    AlreadyRunning,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Snapshot of the current or most recent crawl
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlStatus {
    pub running: bool,
    /// Every progress and lifecycle line, newline-terminated
    pub log: String,
    pub pages: u64,
    pub links: u64,
    pub ok: u64,
    pub broken: u64,
    pub name: Option<String>,
    pub start_url: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Report files written by the crawl, relative to the report directory
    pub files: Vec<String>,
}

impl CrawlStatus {
    fn push_line(&mut self, line: &str) {
        self.log.push_str(line);
        self.log.push('\n');
    }

    fn apply(&mut self, counters: CrawlCounters) {
        self.pages = counters.pages;
        self.links = counters.links;
        self.ok = counters.ok;
        self.broken = counters.broken;
    }
}

struct ServiceState {
    status: CrawlStatus,
    counters: CrawlCounters,
}

type SharedState = Arc<Mutex<ServiceState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, ServiceState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Feeds the engine's progress stream into the shared status
struct StatusProgress {
    state: SharedState,
}

impl ProgressSink for StatusProgress {
    fn on_event(&mut self, event: &ProgressEvent<'_>) {
        let mut state = lock(&self.state);
        state.counters.observe(event);
        let counters = state.counters;
        state.status.apply(counters);
        state.status.push_line(&event.to_string());
    }
}

/// Single-flight crawl runner
pub struct CrawlService<L> {
    launcher: Arc<L>,
    config: Arc<Config>,
    state: SharedState,
}

impl<L> Clone for CrawlService<L> {
    fn clone(&self) -> Self {
        Self {
            launcher: Arc::clone(&self.launcher),
            config: Arc::clone(&self.config),
            state: Arc::clone(&self.state),
        }
    }
}

impl<L: BrowserLauncher> CrawlService<L> {
    pub fn new(launcher: L, config: Config) -> Self {
        Self {
            launcher: Arc::new(launcher),
            config: Arc::new(config),
            state: Arc::new(Mutex::new(ServiceState {
                status: CrawlStatus::default(),
                counters: CrawlCounters::default(),
            })),
        }
    }

    /// Directory reports are written to
    pub fn report_dir(&self) -> &Path {
        &self.config.output.report_dir
    }

    /// Starts a crawl of `url` in the background
    ///
    /// Must be called from within a tokio runtime. The previous crawl's log
    /// and counters are cleared.
    ///
    /// # Errors
    ///
    /// * `ServiceError::AlreadyRunning` - Another crawl has not finished yet
    /// * `ServiceError::InvalidRequest` - The URL or report name is unusable
    pub fn start(&self, url: &str, name: &str) -> Result<(), ServiceError> {
        let url = url.trim();
        let name = name.trim();
        base_host(url).map_err(|e| ServiceError::InvalidRequest(e.to_string()))?;
        validate_report_name(name).map_err(|e| ServiceError::InvalidRequest(e.to_string()))?;

        {
            let mut state = lock(&self.state);
            if state.status.running {
                return Err(ServiceError::AlreadyRunning);
            }
            state.counters = CrawlCounters::default();
            state.status = CrawlStatus {
                running: true,
                name: Some(name.to_string()),
                start_url: Some(url.to_string()),
                started_at: Some(Utc::now()),
                ..CrawlStatus::default()
            };
        }

        tracing::info!(url, name, "Crawl accepted");
        tokio::spawn(self.clone().run_job(url.to_string(), name.to_string()));
        Ok(())
    }

    /// Returns a snapshot of the current or last crawl
    pub fn status(&self) -> CrawlStatus {
        lock(&self.state).status.clone()
    }

    pub fn is_running(&self) -> bool {
        lock(&self.state).status.running
    }

    /// Appends a lifecycle line to the status log
    fn log_line(&self, line: &str) {
        let mut progress = StatusProgress {
            state: Arc::clone(&self.state),
        };
        progress.on_event(&ProgressEvent::Notice(line));
    }

    async fn run_job(self, url: String, name: String) {
        self.log_line("=== CRAWL STARTED ===");

        let files = match self.crawl_and_write(&url, &name).await {
            Ok(files) => {
                self.log_line("DONE.");
                for (label, file) in ["Valid Links  : ", "Broken Links : "].iter().zip(&files) {
                    self.log_line(&format!("{}{}", label, file));
                }
                self.log_line("=== COMPLETED ===");
                tracing::info!(name = %name, "Crawl finished");
                files
            }
            Err((message, files)) => {
                self.log_line(&format!("ERROR: {}", message));
                tracing::error!(name = %name, error = %message, "Crawl failed");
                files
            }
        };
        self.finish(files);
    }

    fn finish(&self, files: Vec<String>) {
        let mut state = lock(&self.state);
        state.status.files = files;
        state.status.finished_at = Some(Utc::now());
        state.status.running = false;
    }

    /// Runs one crawl and writes its reports
    ///
    /// On failure returns the message together with any files that were
    /// still written from the partial report.
    async fn crawl_and_write(
        &self,
        url: &str,
        name: &str,
    ) -> Result<Vec<String>, (String, Vec<String>)> {
        let port = self
            .launcher
            .launch()
            .await
            .map_err(|e| (e.to_string(), Vec::new()))?;

        let progress = Box::new(StatusProgress {
            state: Arc::clone(&self.state),
        });

        match crawl_site(port, &self.config, url, progress).await {
            Ok(output) => self
                .write(&output.report, name)
                .map_err(|e| (e, Vec::new())),
            Err(failure) => {
                let files = self.write(&failure.report, name).unwrap_or_default();
                Err((failure.to_string(), files))
            }
        }
    }

    fn write(&self, report: &Report, name: &str) -> Result<Vec<String>, String> {
        let files = write_reports(report, self.report_dir(), name).map_err(|e| e.to_string())?;
        Ok([files.valid, files.broken]
            .iter()
            .filter_map(|path| file_name(path))
            .collect())
    }
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().into_owned())
}
