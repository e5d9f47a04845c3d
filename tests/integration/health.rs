//! Health endpoint integration tests
//!
//! Tests for the health check endpoints:
//! - GET /health - Full health check with dependency status
//! - GET /health/ready - Readiness probe
//! - GET /health/live - Liveness probe

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::Value;

use crate::common::TestHarness;

#[tokio::test]
async fn test_health_reports_dependencies() {
    let harness = TestHarness::new().await;

    let response = harness.server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["cache"]["status"], "healthy");
    assert_eq!(body["checks"]["chat_provider"]["status"], "healthy");
    assert_eq!(body["stats"]["registered_sessions"], 0);
    assert!(body["version"].is_string());
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_health_degraded_without_openai_key() {
    let harness = TestHarness::with_config(|config| config.openai_api_key = None).await;

    let response = harness.server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["checks"]["chat_provider"]["status"], "degraded");
    assert!(body["checks"]["chat_provider"]["error"].is_string());
}

#[tokio::test]
async fn test_health_counts_registered_sessions() {
    let harness = TestHarness::new().await;
    harness.get("/api/session").await.assert_status_ok();

    let body: Value = harness.server.get("/health").await.json();
    assert_eq!(body["stats"]["registered_sessions"], 1);
}

#[tokio::test]
async fn test_liveness_probe() {
    let harness = TestHarness::new().await;

    let response = harness.server.get("/health/live").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_health_rejects_post() {
    let harness = TestHarness::new().await;

    let response = harness.server.post("/health/live").await;
    response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
}
