//! HTTP surface of the crawl service
//!
//! | Method | Path               | Purpose                              |
//! |--------|--------------------|--------------------------------------|
//! | POST   | `/crawl`           | Start a crawl from `{url, name}`     |
//! | GET    | `/status`          | Current or last crawl status as JSON |
//! | GET    | `/download/:file`  | Download a written CSV report        |

use super::{BrowserLauncher, CrawlService, CrawlStatus, ServiceError};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::io;

/// Body of `POST /crawl`
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlRequest {
    pub url: String,
    pub name: String,
}

/// Builds the service router
pub fn router<L: BrowserLauncher>(service: CrawlService<L>) -> Router {
    Router::new()
        .route("/crawl", post(start_crawl::<L>))
        .route("/status", get(crawl_status::<L>))
        .route("/download/:file", get(download_report::<L>))
        .with_state(service)
}

/// Binds `bind` and serves the router until the process stops
pub async fn serve<L: BrowserLauncher>(service: CrawlService<L>, bind: &str) -> io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(service)).await
}

async fn start_crawl<L: BrowserLauncher>(
    State(service): State<CrawlService<L>>,
    Json(request): Json<CrawlRequest>,
) -> (StatusCode, String) {
    match service.start(&request.url, &request.name) {
        Ok(()) => (StatusCode::ACCEPTED, "Crawl started...\n".to_string()),
        Err(e @ ServiceError::AlreadyRunning) => (StatusCode::CONFLICT, format!("{}\n", e)),
        Err(e @ ServiceError::InvalidRequest(_)) => (StatusCode::BAD_REQUEST, format!("{}\n", e)),
    }
}

async fn crawl_status<L: BrowserLauncher>(
    State(service): State<CrawlService<L>>,
) -> Json<CrawlStatus> {
    Json(service.status())
}

/// Only bare file names are served, never paths
fn is_bare_file_name(file: &str) -> bool {
    !file.is_empty() && !file.contains('/') && !file.contains('\\') && !file.contains("..")
}

async fn download_report<L: BrowserLauncher>(
    State(service): State<CrawlService<L>>,
    Path(file): Path<String>,
) -> Response {
    if !is_bare_file_name(&file) {
        return (StatusCode::BAD_REQUEST, "Invalid file name\n").into_response();
    }

    let path = service.report_dir().join(&file);
    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", file),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            (StatusCode::NOT_FOUND, "File not found\n").into_response()
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read report");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read file\n").into_response()
        }
    }
}
