//! Usage endpoint integration tests
//!
//! - GET /api/usage - trial usage summary
//! - POST /api/usage/reset - administrative reset (debug only)

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::Value;

use crate::common::{constants::TEST_USER_ID, TestHarness};

#[tokio::test]
async fn test_usage_summary_for_trial_user() {
    let harness = TestHarness::new().await;
    harness.set_trial_minutes(4);

    let response = harness.get("/api/usage").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["subscribed"], false);
    assert_eq!(body["total_seconds"], 240);
    assert_eq!(body["used_minutes"], 4);
    assert_eq!(body["used_seconds_remainder"], 0);
    assert_eq!(body["remaining_seconds"], 360);
    assert_eq!(body["remaining_minutes"], 6);
    assert_eq!(body["limit_seconds"], 600);
    assert_eq!(body["limit_minutes"], 10);
    assert_eq!(body["exceeded"], false);
    assert!(body["month"].is_string());
}

#[tokio::test]
async fn test_usage_summary_reflects_live_meter() {
    let harness = TestHarness::new().await;
    harness.get("/api/usage").await.assert_status_ok();

    harness
        .state
        .sessions
        .get(TEST_USER_ID)
        .unwrap()
        .meter
        .add_usage(95);

    let body: Value = harness.get("/api/usage").await.json();
    assert_eq!(body["total_seconds"], 95);
    assert_eq!(body["used_minutes"], 1);
    assert_eq!(body["used_seconds_remainder"], 35);
}

#[tokio::test]
async fn test_usage_for_subscriber() {
    let harness = TestHarness::new().await;
    harness.set_trial_minutes(10);
    harness.subscribe_test_user();

    let body: Value = harness.get("/api/usage").await.json();

    assert_eq!(body["subscribed"], true);
    assert_eq!(body["exceeded"], true);
}

#[tokio::test]
async fn test_usage_clamps_overlong_persisted_value() {
    let harness = TestHarness::new().await;
    harness.set_trial_minutes(500);

    let body: Value = harness.get("/api/usage").await.json();

    assert_eq!(body["total_seconds"], 660);
    assert_eq!(body["remaining_seconds"], 0);
}

#[tokio::test]
async fn test_reset_hidden_without_debug() {
    let harness = TestHarness::new().await;
    harness.set_trial_minutes(7);

    let response = harness.post("/api/usage/reset").await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(
        harness.store.profile(TEST_USER_ID).unwrap().free_trial_minutes_used,
        7
    );
}

#[tokio::test]
async fn test_reset_in_debug_mode() {
    let harness = TestHarness::with_config(|config| config.debug_enabled = true).await;
    harness.set_trial_minutes(7);

    let response = harness.post("/api/usage/reset").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["flush"]["result"], "persisted");
    assert_eq!(body["flush"]["minutes"], 0);
    assert_eq!(body["usage"]["total_seconds"], 0);
    assert_eq!(
        harness.store.profile(TEST_USER_ID).unwrap().free_trial_minutes_used,
        0
    );
}

#[tokio::test]
async fn test_reset_lets_exhausted_user_start_again() {
    let harness = TestHarness::with_config(|config| config.debug_enabled = true).await;
    harness.set_trial_minutes(10);

    harness
        .post("/api/session/start")
        .await
        .assert_status(StatusCode::PAYMENT_REQUIRED);
    harness.post("/api/usage/reset").await.assert_status_ok();

    harness.post("/api/session/start").await.assert_status_ok();
}
