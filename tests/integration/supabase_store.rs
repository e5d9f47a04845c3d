//! Supabase profile store tests against a mocked REST API

use cartomante::{
    error::AppError,
    store::{ProfileStore, SubscriptionStatus},
    SupabaseClient,
};
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::{constants::*, test_config};
use crate::mocks::MockSupabaseServer;

async fn client() -> (SupabaseClient, MockSupabaseServer) {
    let server = MockSupabaseServer::start().await;
    let config = test_config(&server.uri(), "http://127.0.0.1:9");
    (SupabaseClient::new(reqwest::Client::new(), &config), server)
}

#[tokio::test]
async fn test_validate_jwt() {
    let (client, server) = client().await;
    server
        .mock_auth_user(TEST_JWT_TOKEN, TEST_USER_ID, TEST_EMAIL)
        .await;

    let user = client.validate_jwt(TEST_JWT_TOKEN).await.unwrap();

    assert_eq!(user.id, TEST_USER_ID);
    assert_eq!(user.email.as_deref(), Some(TEST_EMAIL));
}

#[tokio::test]
async fn test_validate_jwt_rejected() {
    let (client, server) = client().await;
    server.mock_auth_invalid().await;

    let result = client.validate_jwt("expired").await;

    assert!(matches!(result, Err(AppError::InvalidToken)));
}

#[tokio::test]
async fn test_get_usage_minutes() {
    let (client, server) = client().await;
    server
        .mock_select_profiles(
            "id",
            TEST_USER_ID,
            json!([{"free_trial_minutes_used": 6}]),
        )
        .await;

    let minutes = client.get_usage_minutes(TEST_USER_ID).await.unwrap();

    assert_eq!(minutes, Some(6));
}

#[tokio::test]
async fn test_get_usage_minutes_null_column_is_zero() {
    let (client, server) = client().await;
    server
        .mock_select_profiles(
            "id",
            TEST_USER_ID,
            json!([{"free_trial_minutes_used": null}]),
        )
        .await;

    assert_eq!(client.get_usage_minutes(TEST_USER_ID).await.unwrap(), Some(0));
}

#[tokio::test]
async fn test_get_usage_minutes_missing_row() {
    let (client, server) = client().await;
    server.mock_select_profiles("id", "ghost", json!([])).await;

    assert_eq!(client.get_usage_minutes("ghost").await.unwrap(), None);
}

#[tokio::test]
async fn test_find_profile_by_customer() {
    let (client, server) = client().await;
    server
        .mock_select_profiles(
            "stripe_customer_id",
            "cus_1",
            json!([{
                "id": TEST_USER_ID,
                "subscription_status": "active",
                "stripe_customer_id": "cus_1",
                "free_trial_minutes_used": 3
            }]),
        )
        .await;

    let profile = client
        .find_profile_by_customer("cus_1")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(profile.id, TEST_USER_ID);
    assert!(profile.is_subscribed());
}

#[tokio::test]
async fn test_set_usage_minutes_patches_row() {
    let (client, server) = client().await;
    server.mock_patch_profile(TEST_USER_ID).await;

    client.set_usage_minutes(TEST_USER_ID, 8).await.unwrap();

    let bodies = server.patch_bodies().await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["free_trial_minutes_used"], 8);
    assert!(bodies[0]["updated_at"].is_string());
}

#[tokio::test]
async fn test_activate_subscription_patches_row() {
    let (client, server) = client().await;
    server.mock_patch_profile(TEST_USER_ID).await;

    client
        .activate_subscription(TEST_USER_ID, "cus_9")
        .await
        .unwrap();

    let bodies = server.patch_bodies().await;
    assert_eq!(bodies[0]["stripe_customer_id"], "cus_9");
    assert_eq!(bodies[0]["subscription_status"], "active");
    assert!(bodies[0]["subscription_started_at"].is_string());
}

#[tokio::test]
async fn test_set_subscription_status_leaves_customer_untouched() {
    let (client, server) = client().await;
    server.mock_patch_profile(TEST_USER_ID).await;

    client
        .set_subscription_status(TEST_USER_ID, SubscriptionStatus::Inactive)
        .await
        .unwrap();

    let bodies = server.patch_bodies().await;
    assert_eq!(bodies[0]["subscription_status"], "inactive");
    assert!(bodies[0].get("stripe_customer_id").is_none());
}

#[tokio::test]
async fn test_patch_matching_no_rows_is_not_found() {
    let (client, server) = client().await;
    server.mock_patch_profile_no_rows().await;

    let result = client.set_usage_minutes("ghost", 1).await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_server_error_is_upstream_error() {
    let (client, server) = client().await;
    server.mock_profiles_server_error().await;

    let result = client.get_profile(TEST_USER_ID).await;

    assert!(matches!(result, Err(AppError::UpstreamError(_))));
}
