// HTTP surface tests — the router driven in-process via tower::oneshot.
//
// The aggregator base URL points at an unroutable local port and the
// extractor binary doesn't exist, so every tier fails fast without any
// network. That is exactly the fallback-exhaustion path: tasks created
// through the real handlers must land on terminal `error` with an empty
// item list.

use std::path::PathBuf;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use magpie::config::Config;
use magpie::web::{build_router, AppState};

fn test_config(max_grabs: usize) -> Config {
    Config {
        api_base_url: "http://127.0.0.1:9".to_string(),
        api_key: String::new(),
        extractor_bin: PathBuf::from("/nonexistent/yt-dlp"),
        extractor_timeout: Duration::from_secs(2),
        download_dir: std::env::temp_dir(),
        max_concurrent_grabs: max_grabs,
        max_concurrent_downloads: 1,
        task_ttl: chrono::Duration::hours(6),
    }
}

fn test_app(max_grabs: usize) -> Router {
    build_router(AppState::new(test_config(max_grabs)).unwrap())
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// ============================================================
// Basics
// ============================================================

#[tokio::test]
async fn health_is_ok() {
    let response = test_app(1).oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn platform_catalog_lists_all() {
    let response = test_app(1).oneshot(get("/api/platforms")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["platforms"].as_array().unwrap().len(), 19);
    assert_eq!(body["platforms"][0]["id"], "tiktok");
}

// ============================================================
// POST /api/profile/grab — validation before task creation
// ============================================================

#[tokio::test]
async fn grab_rejects_empty_url() {
    let response = test_app(1)
        .oneshot(post_json("/api/profile/grab", r#"{"url": "  "}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("url"));
}

#[tokio::test]
async fn grab_rejects_unrecognized_platform_without_starting_a_task() {
    let app = test_app(1);
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/profile/grab",
            r#"{"url": "https://example.com/@alice"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn grab_saturated_pool_is_rejected_with_backpressure() {
    let response = test_app(0)
        .oneshot(post_json(
            "/api/profile/grab",
            r#"{"url": "https://www.tiktok.com/@alice"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

// ============================================================
// Grab lifecycle — accepted, polled, fallback-exhausted
// ============================================================

#[tokio::test]
async fn grab_accepts_and_exhausts_all_tiers_to_error() {
    let app = test_app(2);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/profile/grab",
            r#"{"url": "https://www.tiktok.com/@alice", "max_videos": 10}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = body_json(response).await;
    assert_eq!(body["platform"], "tiktok");
    let task_id = body["task_id"].as_str().unwrap().to_string();
    assert_eq!(task_id.len(), 8);

    // Poll until terminal. Both tiers fail instantly (unroutable API,
    // missing binary), so this converges in a few iterations.
    let mut last = Value::Null;
    for _ in 0..100 {
        let response = app
            .clone()
            .oneshot(get(&format!("/api/profile/status/{task_id}")))
            .await
            .unwrap();
        last = body_json(response).await;
        if last["status"] == "error" || last["status"] == "completed" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    assert_eq!(last["status"], "error");
    assert!(!last["message"].as_str().unwrap().is_empty());
    assert_eq!(last["total"], 0);
    // Terminal error never carries an item list.
    assert!(last.get("videos").is_none());
}

#[tokio::test]
async fn status_unknown_id_is_sentinel_not_404() {
    let response = test_app(1)
        .oneshot(get("/api/profile/status/deadbeef"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "unknown");
}

// ============================================================
// Downloads
// ============================================================

#[tokio::test]
async fn download_rejects_non_http_url() {
    let response = test_app(1)
        .oneshot(post_json("/api/download", r#"{"url": "ftp://example.com/f"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn download_status_unknown_id_is_sentinel() {
    let response = test_app(1)
        .oneshot(get("/api/download/status/deadbeef"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "unknown");
}

#[tokio::test]
async fn download_accepted_then_fails_with_missing_binary() {
    let app = test_app(1);
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/download",
            r#"{"url": "https://www.youtube.com/watch?v=x"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let task_id = body_json(response).await["task_id"]
        .as_str()
        .unwrap()
        .to_string();

    let mut last = Value::Null;
    for _ in 0..100 {
        let response = app
            .clone()
            .oneshot(get(&format!("/api/download/status/{task_id}")))
            .await
            .unwrap();
        last = body_json(response).await;
        if last["status"] == "error" || last["status"] == "completed" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    assert_eq!(last["status"], "error");
    assert!(!last["error"].as_str().unwrap().is_empty());
}
