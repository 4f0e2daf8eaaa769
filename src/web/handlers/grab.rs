// POST /api/profile/grab — start a background profile grab.
//
// Validates the URL up front: an unrecognized platform is a 400 and no
// task is created. A saturated worker pool is a 429 — backpressure
// instead of queueing unbounded outbound crawls.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::grab::{tiers_for, GrabContext};
use crate::platform::{extract_username, Platform};
use crate::task::{runner, ProfileTask, TaskHandle};
use crate::web::{api_error, AppState};

#[derive(Debug, Deserialize)]
pub struct GrabRequest {
    pub url: String,
    /// Item cap; 0 (the default) means unlimited.
    #[serde(default)]
    pub max_videos: usize,
}

pub async fn grab_profile(
    State(state): State<AppState>,
    Json(req): Json<GrabRequest>,
) -> Response {
    let url = req.url.trim();
    if url.is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "Missing url");
    }
    let Some(platform) = Platform::detect(url) else {
        return api_error(StatusCode::BAD_REQUEST, "Unrecognized or unsupported URL");
    };

    let Ok(permit) = state.grab_permits.clone().try_acquire_owned() else {
        return api_error(
            StatusCode::TOO_MANY_REQUESTS,
            "Too many concurrent grabs — try again shortly",
        );
    };

    let task_id = state.tasks.create(ProfileTask::new(url, platform)).await;
    let ctx = GrabContext {
        url: url.to_string(),
        platform,
        username: extract_username(url, platform),
        max_items: req.max_videos,
        task: TaskHandle::new(state.tasks.clone(), task_id.clone()),
    };
    let tiers = tiers_for(platform, state.hub.clone(), state.extractor.clone());
    runner::launch_grab(ctx, tiers, permit);

    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "task_id": task_id, "platform": platform })),
    )
        .into_response()
}
