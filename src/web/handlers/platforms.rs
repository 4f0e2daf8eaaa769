// GET /api/platforms — the supported-platform catalog for the UI.

use axum::response::IntoResponse;
use axum::Json;

use crate::platform::ALL_PLATFORMS;

pub async fn list_platforms() -> impl IntoResponse {
    let platforms: Vec<_> = ALL_PLATFORMS
        .iter()
        .map(|p| {
            serde_json::json!({
                "id": p.as_str(),
                "name": p.display_name(),
            })
        })
        .collect();
    Json(serde_json::json!({ "platforms": platforms }))
}
