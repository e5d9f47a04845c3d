//! Profile cache service
//!
//! Provides caching for JWT validation results and profile rows.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, instrument, warn};

use crate::{
    cache::redis::{keys, RedisCache},
    error::AppResult,
    store::{Profile, ProfileStore},
    supabase::{AuthUser, SupabaseClient},
};

#[cfg(any(test, feature = "test-utils"))]
use crate::cache::InMemoryCache;

/// Cache backend abstraction
///
/// Lets ProfileCache run against Redis in production and an in-memory map
/// in isolated integration tests.
pub enum CacheBackend {
    /// Redis-based cache for production use
    Redis(Arc<RedisCache>),
    /// In-memory cache for testing (only available with test-utils feature)
    #[cfg(any(test, feature = "test-utils"))]
    InMemory(Arc<InMemoryCache>),
}

impl CacheBackend {
    async fn get<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        match self {
            CacheBackend::Redis(cache) => cache.get(key).await,
            #[cfg(any(test, feature = "test-utils"))]
            CacheBackend::InMemory(cache) => cache.get(key).await,
        }
    }

    async fn set_with_ttl<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: u64,
    ) -> AppResult<()> {
        match self {
            CacheBackend::Redis(cache) => cache.set_with_ttl(key, value, ttl_seconds).await,
            #[cfg(any(test, feature = "test-utils"))]
            CacheBackend::InMemory(cache) => cache.set_with_ttl(key, value, ttl_seconds).await,
        }
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        match self {
            CacheBackend::Redis(cache) => cache.delete(key).await,
            #[cfg(any(test, feature = "test-utils"))]
            CacheBackend::InMemory(cache) => cache.delete(key).await,
        }
    }

    /// Check connectivity of the backend
    pub async fn ping(&self) -> AppResult<()> {
        match self {
            CacheBackend::Redis(cache) => cache.ping().await,
            #[cfg(any(test, feature = "test-utils"))]
            CacheBackend::InMemory(_) => Ok(()),
        }
    }

    /// Backend name for health reporting
    pub fn name(&self) -> &'static str {
        match self {
            CacheBackend::Redis(_) => "redis",
            #[cfg(any(test, feature = "test-utils"))]
            CacheBackend::InMemory(_) => "in_memory",
        }
    }
}

/// Profile cache service
///
/// A caching layer in front of Supabase auth and the profile store. Cache
/// failures degrade to a direct lookup instead of failing the request.
pub struct ProfileCache {
    cache: CacheBackend,
    supabase: Arc<SupabaseClient>,
    store: Arc<dyn ProfileStore>,
    profile_ttl: u64,
    jwt_ttl: u64,
}

impl ProfileCache {
    /// Create a new profile cache
    pub fn new(
        cache: CacheBackend,
        supabase: Arc<SupabaseClient>,
        store: Arc<dyn ProfileStore>,
        profile_ttl: u64,
        jwt_ttl: u64,
    ) -> Self {
        Self {
            cache,
            supabase,
            store,
            profile_ttl,
            jwt_ttl,
        }
    }

    /// Underlying cache backend
    pub fn backend(&self) -> &CacheBackend {
        &self.cache
    }

    /// Validate JWT and get the authenticated user, using cache if available
    ///
    /// The jwt_hash should be a SHA256 hash of the JWT token.
    #[instrument(skip(self, jwt), fields(jwt_hash = %jwt_hash))]
    pub async fn validate_jwt(&self, jwt: &str, jwt_hash: &str) -> AppResult<AuthUser> {
        let cache_key = keys::jwt_validation(jwt_hash);

        match self.cache.get::<AuthUser>(&cache_key).await {
            Ok(Some(user)) => {
                debug!("Cache hit for JWT validation");
                return Ok(user);
            }
            Ok(None) => debug!("Cache miss for JWT validation, validating with Supabase"),
            Err(e) => warn!(error = %e, "JWT cache read failed, validating with Supabase"),
        }

        let user = self.supabase.validate_jwt(jwt).await?;

        if let Err(e) = self.cache.set_with_ttl(&cache_key, &user, self.jwt_ttl).await {
            warn!(error = %e, "Failed to cache JWT validation");
        }

        Ok(user)
    }

    /// Get a profile row, using cache if available
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_profile(&self, user_id: &str) -> AppResult<Option<Profile>> {
        let cache_key = keys::profile(user_id);

        match self.cache.get::<Profile>(&cache_key).await {
            Ok(Some(profile)) => {
                debug!("Cache hit for profile");
                return Ok(Some(profile));
            }
            Ok(None) => debug!("Cache miss for profile, fetching from store"),
            Err(e) => warn!(error = %e, "Profile cache read failed, fetching from store"),
        }

        let profile = self.store.get_profile(user_id).await?;

        if let Some(ref p) = profile {
            if let Err(e) = self.cache.set_with_ttl(&cache_key, p, self.profile_ttl).await {
                warn!(error = %e, "Failed to cache profile");
            }
        }

        Ok(profile)
    }

    /// Invalidate a cached profile
    ///
    /// Call this after the subscription or usage columns change.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn invalidate_profile(&self, user_id: &str) {
        debug!("Invalidating profile cache");
        if let Err(e) = self.cache.delete(&keys::profile(user_id)).await {
            warn!(error = %e, "Failed to invalidate profile cache");
        }
    }
}
