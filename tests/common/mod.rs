//! Common test utilities for Cartomante
//!
//! Shared fixtures and the harness that wires the real router to mock
//! upstream services and an in-memory profile store.

#![allow(dead_code)]

use std::sync::Arc;

use axum::http::{header, HeaderValue};
use axum_test::{TestRequest, TestServer};
use cartomante::{
    routes, store::InMemoryProfileStore, AppState, Config, OpenAIProvider, ProfileStore,
};

use crate::mocks::{MockOpenAI, MockSupabaseServer};

/// Test configuration constants
pub mod constants {
    pub const TEST_SERVICE_KEY: &str = "test-supabase-service-key";
    pub const TEST_OPENAI_API_KEY: &str = "test-openai-api-key";
    pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";
    pub const TEST_JWT_TOKEN: &str =
        "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.eyJzdWIiOiJ1c2VyXzEyMyJ9.test";
    pub const TEST_USER_ID: &str = "user_123";
    pub const TEST_EMAIL: &str = "test@test.com";
}

/// Config pointing at the mock servers
pub fn test_config(supabase_url: &str, openai_url: &str) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        redis_url: "redis://localhost:6379".to_string(),
        supabase_url: supabase_url.to_string(),
        supabase_service_key: constants::TEST_SERVICE_KEY.to_string(),
        openai_api_url: openai_url.to_string(),
        openai_api_key: Some(constants::TEST_OPENAI_API_KEY.to_string()),
        chat_model: "gpt-4o-mini".to_string(),
        chat_temperature: 0.8,
        chat_max_tokens: 300,
        tts_model: "tts-1".to_string(),
        tts_voice: "nova".to_string(),
        stripe_webhook_secret: constants::TEST_WEBHOOK_SECRET.to_string(),
        stripe_webhook_tolerance_seconds: 300,
        cache_ttl_seconds: 60,
        jwt_cache_ttl_seconds: 60,
        session_idle_timeout_seconds: 120,
        debug_enabled: false,
    }
}

/// Test harness for API tests
///
/// - Mock Supabase auth (wiremock), accepting `TEST_JWT_TOKEN`
/// - Mock OpenAI (wiremock)
/// - In-memory profile store seeded with `TEST_USER_ID`
/// - In-memory cache
/// - Real router with all middleware
pub struct TestHarness {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub store: Arc<InMemoryProfileStore>,
    pub supabase: MockSupabaseServer,
    pub openai: MockOpenAI,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Build a harness, letting the caller adjust the config first
    pub async fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let supabase = MockSupabaseServer::start().await;
        let openai = MockOpenAI::start().await;

        supabase
            .mock_auth_user(
                constants::TEST_JWT_TOKEN,
                constants::TEST_USER_ID,
                constants::TEST_EMAIL,
            )
            .await;
        supabase.mock_auth_invalid().await;

        let mut config = test_config(&supabase.uri(), &openai.uri());
        adjust(&mut config);

        let store = Arc::new(InMemoryProfileStore::new());
        store.insert_user(constants::TEST_USER_ID, 0);

        let provider = Arc::new(OpenAIProvider::new(reqwest::Client::new(), &config));
        let profile_store: Arc<dyn ProfileStore> = store.clone();
        let state = Arc::new(AppState::new_for_testing(
            config,
            profile_store,
            provider.clone(),
            provider,
        ));

        let server = TestServer::new(routes::create_router(state.clone()))
            .expect("Failed to create test server");

        Self {
            server,
            state,
            store,
            supabase,
            openai,
        }
    }

    /// Authorization header value for the test user
    pub fn bearer() -> HeaderValue {
        HeaderValue::from_str(&format!("Bearer {}", constants::TEST_JWT_TOKEN))
            .expect("valid header value")
    }

    /// GET as the test user
    pub fn get(&self, path: &str) -> TestRequest {
        self.server
            .get(path)
            .add_header(header::AUTHORIZATION, Self::bearer())
    }

    /// POST as the test user
    pub fn post(&self, path: &str) -> TestRequest {
        self.server
            .post(path)
            .add_header(header::AUTHORIZATION, Self::bearer())
    }

    /// DELETE as the test user
    pub fn delete(&self, path: &str) -> TestRequest {
        self.server
            .delete(path)
            .add_header(header::AUTHORIZATION, Self::bearer())
    }

    /// Give the test user an active subscription
    pub fn subscribe_test_user(&self) {
        let mut profile = self
            .store
            .profile(constants::TEST_USER_ID)
            .expect("test user is seeded");
        profile.subscription_status = cartomante::store::SubscriptionStatus::Active;
        profile.stripe_customer_id = Some("cus_test".to_string());
        self.store.insert(profile);
    }

    /// Set the persisted trial minutes of the test user
    pub fn set_trial_minutes(&self, minutes: i64) {
        self.store.insert_user(constants::TEST_USER_ID, minutes);
    }
}
