//! Liveness prober
//!
//! Decides whether a link target is alive with a single HEAD request. The
//! probe never fails: every transport problem, timeout, or malformed target
//! simply means "dead".

use crate::config::ProbeConfig;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Something that can tell whether a URL answers
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    /// Returns true if `url` responds with a status below 400
    async fn probe(&self, url: &str) -> bool;
}

/// Builds an HTTP client with proper configuration
///
/// The same client serves liveness probes and static page fetches. Redirects
/// are followed with reqwest's default policy.
///
/// # Arguments
///
/// * `config` - The probe configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use linkscout::config::ProbeConfig;
/// use linkscout::crawler::build_http_client;
///
/// let client = build_http_client(&ProbeConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &ProbeConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// HEAD-request liveness probe
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Creates a prober with its own client built from `config`
    pub fn from_config(config: &ProbeConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(config)?))
    }
}

#[async_trait]
impl LivenessProbe for HttpProber {
    async fn probe(&self, url: &str) -> bool {
        if Url::parse(url).is_err() {
            tracing::debug!(url, "Probe target is not an absolute URL");
            return false;
        }

        match self.client.head(url).send().await {
            Ok(response) => {
                let status = response.status();
                tracing::debug!(url, status = status.as_u16(), "Probed");
                status.as_u16() < 400
            }
            Err(e) => {
                if e.is_timeout() {
                    tracing::debug!(url, "Probe timed out");
                } else if e.is_connect() {
                    tracing::debug!(url, "Probe connection refused");
                } else {
                    tracing::debug!(url, error = %e, "Probe failed");
                }
                false
            }
        }
    }
}
