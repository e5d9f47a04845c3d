//! Cache module
//!
//! Provides Redis-based caching for JWT validation and profile rows.

#[cfg(any(test, feature = "test-utils"))]
pub mod in_memory;
pub mod profile;
pub mod redis;

#[cfg(any(test, feature = "test-utils"))]
pub use self::in_memory::InMemoryCache;
pub use self::profile::{CacheBackend, ProfileCache};
pub use self::redis::RedisCache;
