//! Tests for health check and metrics endpoints.

use api::{router, AppState};
use axum::http::StatusCode;
use axum_test::TestServer;
use inference::{AnswerVocab, InferenceConfig, ModelClient};
use integration_tests::{fixtures, setup::TestContext};
use sessions::{SessionConfig, SessionStore};
use std::sync::Arc;

/// Test /health endpoint returns proper structure
#[tokio::test]
async fn test_health_endpoint_structure() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model_loaded"], true);
    assert_eq!(body["active_sessions"], 0);
}

/// Test /health counts live sessions
#[tokio::test]
async fn test_health_reports_active_sessions() {
    let ctx = TestContext::new();
    let server = ctx.server();

    ctx.upload(&server).await;
    ctx.upload(&server).await;

    let body: serde_json::Value = server.get("/health").await.json();
    assert_eq!(body["active_sessions"], 2);
}

/// Test /health answers 503 while the model is not ready
#[tokio::test]
async fn test_health_unavailable_without_model() {
    let ctx = TestContext::new();
    let server = ctx.server();
    ctx.engine.set_ready(false);

    let response = server.get("/health").await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);

    let body: serde_json::Value = response.json();
    assert_eq!(body["model_loaded"], false);
    assert_eq!(body["status"], "unhealthy");
}

/// Test /health follows the model client's last connection check
#[tokio::test]
async fn test_health_unavailable_when_model_server_down() {
    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(SessionStore::new(&SessionConfig::with_upload_dir(tmp.path())).unwrap());
    let config = InferenceConfig {
        url: "http://127.0.0.1:9".into(),
        timeout_secs: 1,
        ..InferenceConfig::default()
    };
    let client = Arc::new(ModelClient::new(&config, AnswerVocab::builtin()).unwrap());
    assert!(!client.check_connection().await);

    let server = TestServer::new(router(AppState::new(store, client))).unwrap();
    let response = server.get("/health").await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);

    let body: serde_json::Value = response.json();
    assert_eq!(body["model_loaded"], false);
}

/// Test /health/ready endpoint
#[tokio::test]
async fn test_ready_endpoint() {
    let ctx = TestContext::new();
    let server = ctx.server();

    server.get("/health/ready").await.assert_status_ok();
}

/// Test /health/live endpoint always returns 200 when service is running
#[tokio::test]
async fn test_live_endpoint() {
    let ctx = TestContext::new();
    let server = ctx.server();

    server.get("/health/live").await.assert_status_ok();
}

/// Test /metrics reflects uploads and answers
#[tokio::test]
async fn test_metrics_snapshot_counts_activity() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let id = ctx.upload(&server).await;
    server
        .post("/api/vqa/ask")
        .json(&fixtures::ask_body(id, "what color?"))
        .await
        .assert_status_ok();

    let response = server.get("/metrics").await;
    response.assert_status_ok();

    // Counters are process-wide and other tests run concurrently.
    let body: serde_json::Value = response.json();
    assert!(body["uploads_received"].as_u64().unwrap() >= 1);
    assert!(body["sessions_created"].as_u64().unwrap() >= 1);
    assert!(body["answers_recorded"].as_u64().unwrap() >= 1);
    assert!(body["inference_count"].as_u64().unwrap() >= 1);
    assert_eq!(body["inference_latency_buckets"].as_array().unwrap().len(), 11);
    assert!(body["timestamp"].is_string());
}
