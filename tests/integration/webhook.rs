//! Stripe webhook integration tests
//!
//! - POST /api/stripe/webhook - signature verification and subscription
//!   lifecycle updates

use axum::{
    body::Bytes,
    http::{HeaderName, HeaderValue, StatusCode},
};
use cartomante::{billing::sign_payload, store::SubscriptionStatus};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::{constants::*, TestHarness};

const SIGNATURE: HeaderName = HeaderName::from_static("stripe-signature");

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

async fn post_signed(
    harness: &TestHarness,
    event: &Value,
    secret: &str,
    timestamp: i64,
) -> axum_test::TestResponse {
    let payload = event.to_string();
    let signature = sign_payload(payload.as_bytes(), secret, timestamp);
    harness
        .server
        .post("/api/stripe/webhook")
        .add_header(SIGNATURE, HeaderValue::from_str(&signature).unwrap())
        .bytes(Bytes::from(payload))
        .await
}

fn checkout_event(user_id: Option<&str>, customer: &str) -> Value {
    let metadata = match user_id {
        Some(id) => json!({"user_id": id}),
        None => json!({}),
    };
    json!({
        "id": "evt_checkout",
        "type": "checkout.session.completed",
        "data": {"object": {"customer": customer, "metadata": metadata}}
    })
}

#[tokio::test]
async fn test_checkout_activates_subscription() {
    let harness = TestHarness::new().await;

    let response = post_signed(
        &harness,
        &checkout_event(Some(TEST_USER_ID), "cus_new"),
        TEST_WEBHOOK_SECRET,
        now(),
    )
    .await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!({"received": true}));

    let profile = harness.store.profile(TEST_USER_ID).unwrap();
    assert_eq!(profile.subscription_status, SubscriptionStatus::Active);
    assert_eq!(profile.stripe_customer_id.as_deref(), Some("cus_new"));
    assert!(profile.subscription_started_at.is_some());
}

#[tokio::test]
async fn test_checkout_invalidates_cached_profile() {
    let harness = TestHarness::new().await;

    let before: Value = harness.get("/api/usage").await.json();
    assert_eq!(before["subscribed"], false);

    post_signed(
        &harness,
        &checkout_event(Some(TEST_USER_ID), "cus_new"),
        TEST_WEBHOOK_SECRET,
        now(),
    )
    .await
    .assert_status_ok();

    let after: Value = harness.get("/api/usage").await.json();
    assert_eq!(after["subscribed"], true);
}

#[tokio::test]
async fn test_checkout_without_user_id() {
    let harness = TestHarness::new().await;

    let response = post_signed(
        &harness,
        &checkout_event(None, "cus_new"),
        TEST_WEBHOOK_SECRET,
        now(),
    )
    .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["message"], "No user_id found");
}

#[tokio::test]
async fn test_checkout_store_failure() {
    let harness = TestHarness::new().await;
    harness.store.fail_writes(true);

    let response = post_signed(
        &harness,
        &checkout_event(Some(TEST_USER_ID), "cus_new"),
        TEST_WEBHOOK_SECRET,
        now(),
    )
    .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "DATABASE_ERROR");
    assert_eq!(body["error"]["retryable"], true);
}

#[tokio::test]
async fn test_subscription_deleted_deactivates() {
    let harness = TestHarness::new().await;
    harness.subscribe_test_user();

    let event = json!({
        "id": "evt_deleted",
        "type": "customer.subscription.deleted",
        "data": {"object": {"customer": "cus_test", "status": "canceled"}}
    });
    post_signed(&harness, &event, TEST_WEBHOOK_SECRET, now())
        .await
        .assert_status_ok();

    let profile = harness.store.profile(TEST_USER_ID).unwrap();
    assert_eq!(profile.subscription_status, SubscriptionStatus::Inactive);
}

#[tokio::test]
async fn test_subscription_updated_past_due_deactivates() {
    let harness = TestHarness::new().await;
    harness.subscribe_test_user();

    let event = json!({
        "type": "customer.subscription.updated",
        "data": {"object": {"customer": {"id": "cus_test"}, "status": "past_due"}}
    });
    post_signed(&harness, &event, TEST_WEBHOOK_SECRET, now())
        .await
        .assert_status_ok();

    let profile = harness.store.profile(TEST_USER_ID).unwrap();
    assert_eq!(profile.subscription_status, SubscriptionStatus::Inactive);
}

#[tokio::test]
async fn test_subscription_event_for_unknown_customer() {
    let harness = TestHarness::new().await;

    let event = json!({
        "type": "customer.subscription.updated",
        "data": {"object": {"customer": "cus_unknown", "status": "active"}}
    });
    let response = post_signed(&harness, &event, TEST_WEBHOOK_SECRET, now()).await;

    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>(),
        json!({"received": true, "message": "Customer not yet in database"})
    );
}

#[tokio::test]
async fn test_unhandled_event_type_is_acknowledged() {
    let harness = TestHarness::new().await;

    let event = json!({
        "type": "invoice.paid",
        "data": {"object": {"customer": "cus_test"}}
    });
    let response = post_signed(&harness, &event, TEST_WEBHOOK_SECRET, now()).await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!({"received": true}));
}

#[tokio::test]
async fn test_wrong_secret_is_rejected() {
    let harness = TestHarness::new().await;

    let response = post_signed(
        &harness,
        &checkout_event(Some(TEST_USER_ID), "cus_new"),
        "whsec_someone_else",
        now(),
    )
    .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "INVALID_SIGNATURE");

    let profile = harness.store.profile(TEST_USER_ID).unwrap();
    assert_eq!(profile.subscription_status, SubscriptionStatus::Inactive);
}

#[tokio::test]
async fn test_stale_timestamp_is_rejected() {
    let harness = TestHarness::new().await;

    let response = post_signed(
        &harness,
        &checkout_event(Some(TEST_USER_ID), "cus_new"),
        TEST_WEBHOOK_SECRET,
        now() - 3600,
    )
    .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_signature_header() {
    let harness = TestHarness::new().await;

    let response = harness
        .server
        .post("/api/stripe/webhook")
        .json(&checkout_event(Some(TEST_USER_ID), "cus_new"))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "INVALID_SIGNATURE");
}

#[tokio::test]
async fn test_signed_garbage_payload() {
    let harness = TestHarness::new().await;
    let payload = "not json";
    let signature = sign_payload(payload.as_bytes(), TEST_WEBHOOK_SECRET, now());

    let response = harness
        .server
        .post("/api/stripe/webhook")
        .add_header(SIGNATURE, HeaderValue::from_str(&signature).unwrap())
        .bytes(Bytes::from(payload))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}
