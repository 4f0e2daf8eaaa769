// GET /api/profile/status/{task_id} — poll one grab's progress.
//
// Unknown ids answer with the `unknown` sentinel status rather than an
// HTTP error; clients poll this endpoint in a loop and a 404 would force
// them to special-case the race between task creation and first poll.
// The item list rides along only once the grab completed — progress polls
// stay small.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;

use crate::task::GrabStatus;
use crate::web::AppState;

pub async fn profile_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> impl IntoResponse {
    let Some(task) = state.tasks.get(&task_id).await else {
        return Json(serde_json::json!({ "status": "unknown" }));
    };

    let mut body = serde_json::json!({
        "status": task.status,
        "message": task.message,
        "total": task.total,
        "profile": task.profile,
        "platform": task.platform,
    });
    if task.status == GrabStatus::Completed {
        body["videos"] = serde_json::json!(task.videos);
    }
    Json(body)
}
