// Web server — Axum-based JSON API for the grabber UI.
//
// All routes serve JSON. Background work is fire-and-forget: POST
// endpoints allocate a task record and return its id immediately, and
// clients poll the matching status endpoint until the record goes
// terminal.

use std::sync::Arc;

use anyhow::Result;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tokio::sync::Semaphore;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::aggregator::client::HubClient;
use crate::config::Config;
use crate::extractor::MediaExtractor;
use crate::task::download::DownloadStore;
use crate::task::TaskStore;

pub mod handlers;

/// Shared application state threaded through all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub hub: Arc<HubClient>,
    pub extractor: Arc<MediaExtractor>,
    pub tasks: Arc<TaskStore>,
    pub downloads: Arc<DownloadStore>,
    pub grab_permits: Arc<Semaphore>,
    pub download_permits: Arc<Semaphore>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let hub = HubClient::new(&config.api_base_url, &config.api_key)?;
        let extractor =
            MediaExtractor::new(config.extractor_bin.clone(), config.extractor_timeout);
        Ok(Self {
            hub: Arc::new(hub),
            extractor: Arc::new(extractor),
            tasks: Arc::new(TaskStore::new(config.task_ttl)),
            downloads: Arc::new(DownloadStore::new(config.task_ttl)),
            grab_permits: Arc::new(Semaphore::new(config.max_concurrent_grabs)),
            download_permits: Arc::new(Semaphore::new(config.max_concurrent_downloads)),
            config: Arc::new(config),
        })
    }
}

/// Start the Axum web server and block until it exits.
pub async fn run_server(config: Config, port: u16, bind: &str) -> Result<()> {
    let state = AppState::new(config)?;
    let app = build_router(state);

    let addr = format!("{bind}:{port}");
    info!("Magpie API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/platforms", get(handlers::platforms::list_platforms))
        .route("/api/profile/grab", post(handlers::grab::grab_profile))
        .route(
            "/api/profile/status/{task_id}",
            get(handlers::status::profile_status),
        )
        .route("/api/download", post(handlers::download::start_download))
        .route(
            "/api/download/status/{task_id}",
            get(handlers::download::download_status),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check — always returns 200 OK.
async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({ "status": "ok" })),
    )
}

/// Typed JSON error response helper.
pub fn api_error(status: StatusCode, message: &str) -> Response {
    (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
}
