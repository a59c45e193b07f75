//! # nearcache-redis
//!
//! Coherent two-tier cache: a bounded in-memory tier per process in front of
//! a shared Redis backend, with cross-instance invalidation over pub/sub.
//!
//! ## Architecture
//!
//! - **Local tier**: bounded map + LRU with per-entry TTL, microsecond
//!   latency, per-instance (`nearcache-core`)
//! - **Backend**: Redis, shared across instances, written through atomic
//!   scripts that also publish an invalidation
//! - **Pub/Sub**: one channel carrying 18-byte `[uuid][slot]` invalidations;
//!   a background listener marks slots stale as peers write
//!
//! A read is served locally only while the entry's write timestamp is newer
//! than the last peer update its slot has seen; otherwise the backend is the
//! source of truth and the local copy is refreshed from it.
//!
//! ```ignore
//! let backend = RedisBackend::connect(&RedisConfig::default())?;
//! let cache = NearCache::builder()
//!     .with_backend(Arc::new(backend))
//!     .with_channel("nearcache:invalidate")
//!     .with_max_entries(10_000)
//!     .build()
//!     .await?;
//!
//! cache.set("user:42", "alice", Duration::from_secs(60)).await?;
//! let mut name = String::new();
//! cache.get("user:42", &mut name).await?;
//! ```

pub mod backend;
pub mod cache;
pub mod config;
mod listener;

pub use backend::{Backend, RedisBackend};
pub use cache::{NearCache, NearCacheBuilder};
pub use config::{CacheSettings, RedisConfig};

// Re-exported so callers need only this crate for the common path.
pub use nearcache_core::{
    CacheError, FromPayload, Packed, PayloadError, Result, ToPayload,
};
