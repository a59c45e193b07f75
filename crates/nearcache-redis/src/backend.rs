//! The shared backend contract and its Redis implementation.
//!
//! The cache issues exactly three operations against the backend, each an
//! atomic server-side script, plus one subscription. Keeping the publish
//! inside the same script as the write means no peer can observe an old
//! value after its invalidation has been delivered.

use std::sync::LazyLock;

use async_trait::async_trait;
use deadpool_redis::Pool;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use redis::Script;
use tracing::debug;

use nearcache_core::{CacheError, Result};

use crate::config::RedisConfig;

/// Stream of raw invalidation payloads from the backend's pub/sub channel.
pub type PayloadStream = BoxStream<'static, Vec<u8>>;

/// Contract of the shared key-value backend.
///
/// Implementations must be thread-safe (`Send + Sync`). The three write/read
/// operations are atomic on the backend side; `subscribe` yields every
/// payload published on the channel, including this process's own.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Write `value` under `key` (with expiry when `ttl_secs > 0`), then
    /// publish `payload` on `channel`, atomically.
    async fn set_and_publish(
        &self,
        key: &str,
        value: &[u8],
        ttl_secs: u64,
        channel: &str,
        payload: &[u8],
    ) -> Result<()>;

    /// Fetch `key` and its remaining TTL in one round trip.
    ///
    /// Returns `None` when the key is absent. The TTL follows the backend's
    /// native semantics: seconds remaining, or negative for "no expiry".
    async fn get_with_ttl(&self, key: &str) -> Result<Option<(Vec<u8>, i64)>>;

    /// Delete `key`, then publish `payload` on `channel`, atomically.
    async fn delete_and_publish(&self, key: &str, channel: &str, payload: &[u8]) -> Result<()>;

    /// Subscribe to `channel`. The stream ends when the subscription is
    /// dropped or the connection closes.
    async fn subscribe(&self, channel: &str) -> Result<PayloadStream>;
}

static SET_AND_PUBLISH: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r#"
        if ARGV[2] == "0" then
            redis.call("SET", KEYS[1], ARGV[1])
        else
            redis.call("SET", KEYS[1], ARGV[1], "EX", ARGV[2])
        end
        redis.call("PUBLISH", ARGV[3], ARGV[4])
        "#,
    )
});

static GET_WITH_TTL: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r#"
        local result = {}
        result[1] = redis.call("GET", KEYS[1])
        result[2] = redis.call("TTL", KEYS[1])
        return result
        "#,
    )
});

static DELETE_AND_PUBLISH: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r#"
        redis.call("DEL", KEYS[1])
        redis.call("PUBLISH", ARGV[1], ARGV[2])
        "#,
    )
});

/// Redis implementation of the backend contract.
///
/// Command traffic goes through a connection pool; SUBSCRIBE needs a
/// dedicated connection, so each subscription opens its own client from the
/// configured URL.
pub struct RedisBackend {
    pool: Pool,
    url: String,
}

impl RedisBackend {
    /// Build a pooled backend from configuration.
    pub fn connect(config: &RedisConfig) -> Result<Self> {
        config.validate()?;

        let mut pool_config = deadpool_redis::Config::from_url(config.url.clone());
        pool_config.pool = Some(deadpool_redis::PoolConfig::new(config.pool_size));
        let pool = pool_config
            .create_pool(Some(deadpool_redis::Runtime::Tokio1))
            .map_err(|e| CacheError::configuration(format!("failed to create Redis pool: {e}")))?;

        Ok(Self {
            pool,
            url: config.url.clone(),
        })
    }

    /// Wrap an existing pool. The URL is still needed for pub/sub
    /// subscriptions.
    pub fn from_pool(pool: Pool, url: impl Into<String>) -> Self {
        Self {
            pool,
            url: url.into(),
        }
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::backend(format!("failed to get Redis connection: {e}")))
    }
}

#[async_trait]
impl Backend for RedisBackend {
    async fn set_and_publish(
        &self,
        key: &str,
        value: &[u8],
        ttl_secs: u64,
        channel: &str,
        payload: &[u8],
    ) -> Result<()> {
        let mut conn = self.connection().await?;
        SET_AND_PUBLISH
            .key(key)
            .arg(value)
            .arg(ttl_secs)
            .arg(channel)
            .arg(payload)
            .invoke_async::<()>(&mut conn)
            .await
            .map_err(|e| CacheError::backend(e.to_string()))?;
        debug!(key = %key, ttl_secs = ttl_secs, "set-and-publish executed");
        Ok(())
    }

    async fn get_with_ttl(&self, key: &str) -> Result<Option<(Vec<u8>, i64)>> {
        let mut conn = self.connection().await?;
        let (value, ttl): (Option<Vec<u8>>, i64) = GET_WITH_TTL
            .key(key)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| CacheError::backend(e.to_string()))?;
        Ok(value.map(|bytes| (bytes, ttl)))
    }

    async fn delete_and_publish(&self, key: &str, channel: &str, payload: &[u8]) -> Result<()> {
        let mut conn = self.connection().await?;
        DELETE_AND_PUBLISH
            .key(key)
            .arg(channel)
            .arg(payload)
            .invoke_async::<()>(&mut conn)
            .await
            .map_err(|e| CacheError::backend(e.to_string()))?;
        debug!(key = %key, "delete-and-publish executed");
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<PayloadStream> {
        // Pooled connections cannot SUBSCRIBE; open a dedicated one.
        let client = redis::Client::open(self.url.as_str())
            .map_err(|e| CacheError::backend(format!("failed to create Redis client: {e}")))?;
        let mut pubsub = client
            .get_async_pubsub()
            .await
            .map_err(|e| CacheError::backend(format!("failed to open pub/sub connection: {e}")))?;
        pubsub
            .subscribe(channel)
            .await
            .map_err(|e| CacheError::backend(format!("failed to subscribe: {e}")))?;
        debug!(channel = %channel, "subscribed to invalidation channel");

        let stream = pubsub
            .into_on_message()
            .map(|msg| msg.get_payload_bytes().to_vec());
        Ok(stream.boxed())
    }
}
