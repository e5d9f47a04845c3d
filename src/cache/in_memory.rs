//! In-memory cache implementation for testing
//!
//! This module provides an in-memory cache that can be used in place of Redis
//! during integration testing, eliminating the need for a real Redis instance.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::AppResult;

/// Entry in the in-memory cache with expiration
struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.map(|exp| Instant::now() > exp).unwrap_or(false)
    }
}

/// In-memory cache for testing
///
/// Same API as `RedisCache` so `CacheBackend` can swap one for the other.
pub struct InMemoryCache {
    data: RwLock<HashMap<String, CacheEntry>>,
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Get a value from cache
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let data = self.data.read().unwrap();

        match data.get(key) {
            Some(entry) if !entry.is_expired() => {
                let parsed: T = serde_json::from_str(&entry.value)?;
                Ok(Some(parsed))
            }
            _ => Ok(None),
        }
    }

    /// Set a value in cache with a TTL (0 means no expiry)
    pub async fn set_with_ttl<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: u64,
    ) -> AppResult<()> {
        let serialized = serde_json::to_string(value)?;
        let expires_at = if ttl_seconds > 0 {
            Some(Instant::now() + Duration::from_secs(ttl_seconds))
        } else {
            None
        };

        let mut data = self.data.write().unwrap();
        data.insert(
            key.to_string(),
            CacheEntry {
                value: serialized,
                expires_at,
            },
        );
        Ok(())
    }

    /// Delete a key from cache
    pub async fn delete(&self, key: &str) -> AppResult<()> {
        let mut data = self.data.write().unwrap();
        data.remove(key);
        Ok(())
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let data = self.data.read().unwrap();
        data.values().filter(|e| !e.is_expired()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
