//! Mock Supabase server for testing
//!
//! Provides wiremock-based mocks for:
//! - GET /auth/v1/user - JWT validation
//! - GET /rest/v1/profiles - profile selects
//! - PATCH /rest/v1/profiles - profile updates

use serde_json::{json, Value};
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

/// Mock Supabase server wrapper
pub struct MockSupabaseServer {
    server: MockServer,
}

impl MockSupabaseServer {
    /// Start a new mock Supabase server
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Get the mock server URI
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Get all received requests (for assertion in tests)
    pub async fn received_requests(&self) -> Vec<wiremock::Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    /// Number of auth lookups received so far
    pub async fn auth_request_count(&self) -> usize {
        self.received_requests()
            .await
            .iter()
            .filter(|r| r.url.path() == "/auth/v1/user")
            .count()
    }

    // =========================================================================
    // GET /auth/v1/user
    // =========================================================================

    /// Accept `token` as the JWT of `user_id`
    pub async fn mock_auth_user(&self, token: &str, user_id: &str, email: &str) {
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header("Authorization", format!("Bearer {}", token).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": user_id,
                "aud": "authenticated",
                "role": "authenticated",
                "email": email,
            })))
            .with_priority(1)
            .mount(&self.server)
            .await;
    }

    /// Reject every other token
    pub async fn mock_auth_invalid(&self) {
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "code": 401,
                "msg": "invalid JWT"
            })))
            .mount(&self.server)
            .await;
    }

    // =========================================================================
    // /rest/v1/profiles
    // =========================================================================

    /// Return `rows` for a select filtered on `column = value`
    pub async fn mock_select_profiles(&self, column: &str, value: &str, rows: Value) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/profiles"))
            .and(query_param(column, format!("eq.{}", value).as_str()))
            .and(header("apikey", crate::common::constants::TEST_SERVICE_KEY))
            .respond_with(ResponseTemplate::new(200).set_body_json(rows))
            .mount(&self.server)
            .await;
    }

    /// Accept updates for `user_id`
    pub async fn mock_patch_profile(&self, user_id: &str) {
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/profiles"))
            .and(query_param("id", format!("eq.{}", user_id).as_str()))
            .and(header("Prefer", "return=representation"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": user_id }])))
            .mount(&self.server)
            .await;
    }

    /// Updates that match no row
    pub async fn mock_patch_profile_no_rows(&self) {
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/profiles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&self.server)
            .await;
    }

    /// Every profile request fails
    pub async fn mock_profiles_server_error(&self) {
        Mock::given(path("/rest/v1/profiles"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "message": "database unavailable"
            })))
            .mount(&self.server)
            .await;
    }

    /// JSON bodies of PATCH requests received so far
    pub async fn patch_bodies(&self) -> Vec<Value> {
        self.received_requests()
            .await
            .into_iter()
            .filter(|r| r.method.as_str() == "PATCH")
            .filter_map(|r| serde_json::from_slice(&r.body).ok())
            .collect()
    }
}
