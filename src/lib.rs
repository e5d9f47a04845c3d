//! Cartomante - fortune-teller conversation backend
//!
//! This library provides the core functionality for the Cartomante server:
//! authenticated chat and speech proxies, server-side conversation sessions
//! with trial usage metering, and Stripe subscription webhooks.

pub mod billing;
pub mod cache;
pub mod config;
pub mod error;
pub mod middleware;
pub mod persona;
pub mod proxy;
pub mod routes;
pub mod session;
pub mod store;
pub mod supabase;
pub mod usage;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;

pub use crate::cache::{CacheBackend, ProfileCache, RedisCache};
pub use crate::config::Config;
pub use crate::proxy::{ChatService, OpenAIProvider, SpeechService};
pub use crate::session::{SessionRegistry, TracingObserver};
pub use crate::store::ProfileStore;
pub use crate::supabase::SupabaseClient;
pub use crate::usage::UsageMeter;

/// Application state shared across all request handlers
pub struct AppState {
    pub config: Config,
    pub start_time: Instant,
    pub supabase: Arc<SupabaseClient>,
    /// Profile rows (usage minutes and subscription linkage)
    pub store: Arc<dyn ProfileStore>,
    pub profile_cache: Arc<ProfileCache>,
    pub chat: Arc<dyn ChatService>,
    pub speech: Arc<dyn SpeechService>,
    /// One meter and one session controller per signed-in user
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    /// Create a new application state
    pub async fn new(config: Config) -> Result<Self> {
        let redis_client = redis::Client::open(config.redis_url.as_str())?;
        let redis = redis::aio::ConnectionManager::new(redis_client).await?;

        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(100)
            .timeout(Duration::from_secs(120))
            .build()?;

        let supabase = Arc::new(SupabaseClient::new(http_client.clone(), &config));
        let store: Arc<dyn ProfileStore> = supabase.clone();

        let profile_cache = Arc::new(ProfileCache::new(
            CacheBackend::Redis(Arc::new(RedisCache::new(redis))),
            supabase.clone(),
            store.clone(),
            config.cache_ttl_seconds,
            config.jwt_cache_ttl_seconds,
        ));

        let openai = Arc::new(OpenAIProvider::new(http_client, &config));
        if !openai.is_configured() {
            tracing::warn!("OPENAI_API_KEY is not set, chat and speech will answer 503");
        }

        let state = Self::assemble(
            config,
            supabase,
            store,
            profile_cache,
            openai.clone(),
            openai,
        );
        state
            .sessions
            .spawn_eviction(session::EVICTION_SWEEP_INTERVAL, session::IDLE_ENTRY_TTL);
        Ok(state)
    }

    fn assemble(
        config: Config,
        supabase: Arc<SupabaseClient>,
        store: Arc<dyn ProfileStore>,
        profile_cache: Arc<ProfileCache>,
        chat: Arc<dyn ChatService>,
        speech: Arc<dyn SpeechService>,
    ) -> Self {
        let sessions = Arc::new(SessionRegistry::new(
            store.clone(),
            chat.clone(),
            Arc::new(TracingObserver),
            Duration::from_secs(config.session_idle_timeout_seconds),
        ));

        Self {
            config,
            start_time: Instant::now(),
            supabase,
            store,
            profile_cache,
            chat,
            speech,
            sessions,
        }
    }

    /// Create an application state for testing with an in-memory cache
    ///
    /// Supabase auth still goes over HTTP (point `supabase_url` at a mock
    /// server); profile rows come from the given store.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn new_for_testing(
        config: Config,
        store: Arc<dyn ProfileStore>,
        chat: Arc<dyn ChatService>,
        speech: Arc<dyn SpeechService>,
    ) -> Self {
        let supabase = Arc::new(SupabaseClient::new(reqwest::Client::new(), &config));
        let profile_cache = Arc::new(ProfileCache::new(
            CacheBackend::InMemory(Arc::new(cache::InMemoryCache::new())),
            supabase.clone(),
            store.clone(),
            60,
            60,
        ));

        Self::assemble(config, supabase, store, profile_cache, chat, speech)
    }
}
