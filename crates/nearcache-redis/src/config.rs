//! Configuration for the Redis backend and the cache facade.

use serde::{Deserialize, Serialize};

use nearcache_core::CacheError;

/// Redis connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Connection URL, e.g. `redis://127.0.0.1:6379`.
    #[serde(default = "default_url")]
    pub url: String,
    /// Command connection pool size.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            pool_size: default_pool_size(),
        }
    }
}

impl RedisConfig {
    pub fn validate(&self) -> Result<(), CacheError> {
        if self.url.is_empty() {
            return Err(CacheError::configuration("redis.url must not be empty"));
        }
        if self.pool_size == 0 {
            return Err(CacheError::configuration("redis.pool_size must be > 0"));
        }
        Ok(())
    }
}

/// Facade settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Pub/sub channel carrying invalidation broadcasts. Every instance of
    /// one logical cache must use the same channel.
    #[serde(default = "default_channel")]
    pub channel: String,
    /// Capacity of the local tier.
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            channel: default_channel(),
            max_entries: default_max_entries(),
        }
    }
}

impl CacheSettings {
    pub fn validate(&self) -> Result<(), CacheError> {
        if self.channel.is_empty() {
            return Err(CacheError::configuration("cache.channel must not be empty"));
        }
        if self.max_entries == 0 {
            return Err(CacheError::configuration("cache.max_entries must be > 0"));
        }
        Ok(())
    }
}

fn default_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_pool_size() -> usize {
    16
}

fn default_channel() -> String {
    "nearcache:invalidate".to_string()
}

fn default_max_entries() -> u64 {
    10_000
}
