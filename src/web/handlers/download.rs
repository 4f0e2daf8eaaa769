// POST /api/download and GET /api/download/status/{task_id}.
//
// Downloads accept any http(s) URL — the extractor handles far more
// sites than the platform table knows, so unrecognized platforms are
// still worth attempting here (unlike profile grabs).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::task::download::{launch_download, DownloadTask};
use crate::web::{api_error, AppState};

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub url: String,
}

pub async fn start_download(
    State(state): State<AppState>,
    Json(req): Json<DownloadRequest>,
) -> Response {
    let url = req.url.trim();
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return api_error(StatusCode::BAD_REQUEST, "Missing or invalid url");
    }

    let Ok(permit) = state.download_permits.clone().try_acquire_owned() else {
        return api_error(
            StatusCode::TOO_MANY_REQUESTS,
            "Too many concurrent downloads — try again shortly",
        );
    };

    let task_id = state.downloads.create(DownloadTask::new(url)).await;
    launch_download(
        state.downloads.clone(),
        task_id.clone(),
        url.to_string(),
        state.extractor.clone(),
        state.config.download_dir.clone(),
        permit,
    );

    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "task_id": task_id })),
    )
        .into_response()
}

pub async fn download_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> impl IntoResponse {
    match state.downloads.get(&task_id).await {
        Some(task) => Json(serde_json::json!({
            "status": task.status,
            "percent": task.percent,
            "filename": task.filename,
            "error": task.error,
        })),
        None => Json(serde_json::json!({ "status": "unknown" })),
    }
}
