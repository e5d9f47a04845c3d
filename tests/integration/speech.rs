//! Text-to-speech endpoint integration tests

use axum::http::{header, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::TestHarness;
use crate::mocks::FAKE_MP3;

#[tokio::test]
async fn test_speech_streams_mpeg_audio() {
    let harness = TestHarness::new().await;
    harness.openai.mock_speech().await;

    let response = harness
        .post("/api/text-to-speech")
        .json(&json!({"text": "Le carte parlano chiaro.", "category": "LAVORO"}))
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "audio/mpeg"
    );
    assert_eq!(response.as_bytes().as_ref(), FAKE_MP3);
}

#[tokio::test]
async fn test_speech_request_uses_configured_voice() {
    let harness = TestHarness::new().await;
    harness.openai.mock_speech().await;

    harness
        .post("/api/text-to-speech")
        .json(&json!({"text": "Buonasera"}))
        .await
        .assert_status_ok();

    let requests = harness.openai.received_requests().await;
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["model"], "tts-1");
    assert_eq!(body["voice"], "nova");
    assert_eq!(body["input"], "Buonasera");
    assert_eq!(body["response_format"], "mp3");
}

#[tokio::test]
async fn test_speech_empty_text() {
    let harness = TestHarness::new().await;

    let response = harness
        .post("/api/text-to-speech")
        .json(&json!({"text": ""}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_speech_text_too_long() {
    let harness = TestHarness::new().await;
    let text = "a".repeat(4097);

    let response = harness
        .post("/api/text-to-speech")
        .json(&json!({"text": text}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(harness.openai.received_requests().await.is_empty());
}

#[tokio::test]
async fn test_speech_upstream_failure() {
    let harness = TestHarness::new().await;
    harness.openai.mock_speech_error(503).await;

    let response = harness
        .post("/api/text-to-speech")
        .json(&json!({"text": "Ciao"}))
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_speech_blocked_when_trial_used_up() {
    let harness = TestHarness::new().await;
    harness.set_trial_minutes(11);

    let response = harness
        .post("/api/text-to-speech")
        .json(&json!({"text": "Ciao"}))
        .await;

    response.assert_status(StatusCode::PAYMENT_REQUIRED);
}
