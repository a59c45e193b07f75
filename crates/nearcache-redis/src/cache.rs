//! The coherent cache facade.
//!
//! Orchestrates the local tier, the slot freshness table, the invalidation
//! listener, and the backend scripts. See the crate docs for the read/write
//! protocol.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use nearcache_core::{
    key_slot, now_micros, CacheError, FromPayload, InvalidationMessage, MemoryCache, Result,
    SlotFreshness, ToPayload,
};

use crate::backend::Backend;
use crate::config::CacheSettings;
use crate::listener::InvalidationListener;

/// A bounded local cache kept coherent with a shared backend.
///
/// Writes go to the backend through an atomic script that also publishes an
/// invalidation, then land in the local tier. Reads are served locally while
/// the entry is fresher than every known peer update to its slot; otherwise
/// they fall through to the backend and refresh the local copy.
pub struct NearCache {
    backend: Arc<dyn Backend>,
    uuid: Uuid,
    local: MemoryCache,
    freshness: Arc<SlotFreshness>,
    channel: String,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for NearCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NearCache")
            .field("uuid", &self.uuid)
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

impl NearCache {
    pub fn builder() -> NearCacheBuilder {
        NearCacheBuilder::new()
    }

    /// Read `key` into `dest`.
    ///
    /// Returns [`CacheError::Miss`] when the key is absent from both tiers.
    /// The timestamp recorded for a refreshed entry is captured before the
    /// freshness check, so a peer update racing this read still wins the
    /// next freshness comparison.
    pub async fn get<D: FromPayload>(&self, key: &str, dest: &mut D) -> Result<()> {
        let timestamp = now_micros();

        let mut slot_hint = None;
        if let Some(hit) = self.local.get(key) {
            let peer_ts = self.freshness.last_updated(hit.slot);
            if peer_ts < hit.write_ts {
                debug!(key = %key, "served from local tier");
                dest.merge_payload(&hit.payload)?;
                return Ok(());
            }
            debug!(key = %key, slot = hit.slot, "local copy stale, refetching");
            slot_hint = Some(hit.slot);
        }

        let (bytes, ttl_secs) = match self.backend.get_with_ttl(key).await? {
            Some(found) => found,
            None => return Err(CacheError::Miss),
        };

        let slot = slot_hint.unwrap_or_else(|| key_slot(key));
        dest.merge_payload(&bytes)?;

        let ttl = if ttl_secs > 0 {
            Duration::from_secs(ttl_secs as u64)
        } else {
            Duration::ZERO
        };
        self.local
            .insert(key, Arc::new(bytes), ttl, slot, timestamp);
        Ok(())
    }

    /// Write `key` to the backend and the local tier.
    ///
    /// A zero `ttl` means no expiry. The backend write and the invalidation
    /// publish execute as one atomic script.
    pub async fn set<V: ToPayload + ?Sized>(
        &self,
        key: &str,
        value: &V,
        ttl: Duration,
    ) -> Result<()> {
        let slot = key_slot(key);
        let timestamp = now_micros();
        let bytes = value.to_payload()?;

        let message = InvalidationMessage::new(self.uuid, slot);
        self.backend
            .set_and_publish(key, &bytes, ttl.as_secs(), &self.channel, &message.encode())
            .await?;

        self.local.insert(key, Arc::new(bytes), ttl, slot, timestamp);
        Ok(())
    }

    /// Delete `key` everywhere, best-effort on the backend side.
    ///
    /// Backend failures are logged and swallowed; the local delete always
    /// happens.
    pub async fn delete(&self, key: &str) {
        let message = InvalidationMessage::new(self.uuid, key_slot(key));
        if let Err(e) = self
            .backend
            .delete_and_publish(key, &self.channel, &message.encode())
            .await
        {
            warn!(key = %key, error = %e, "backend delete failed");
        }
        self.local.remove(key);
    }

    /// Number of entries in the local tier.
    pub fn len(&self) -> usize {
        self.local.len()
    }

    pub fn is_empty(&self) -> bool {
        self.local.is_empty()
    }

    /// This process's invalidation uuid.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Stop the invalidation listener: drops the subscription and joins the
    /// task. Idempotent. Reads keep working afterwards, but the local tier
    /// no longer learns about peer writes.
    pub async fn shutdown(&self) {
        let handle = self.listener.lock().take();
        if let Some(handle) = handle {
            handle.abort();
            let _ = handle.await;
        }
    }
}

impl Drop for NearCache {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.lock().take() {
            handle.abort();
        }
    }
}

/// Builder for [`NearCache`].
///
/// The backend handle is required; everything else has defaults from
/// [`CacheSettings`].
pub struct NearCacheBuilder {
    backend: Option<Arc<dyn Backend>>,
    settings: CacheSettings,
}

impl NearCacheBuilder {
    pub fn new() -> Self {
        Self {
            backend: None,
            settings: CacheSettings::default(),
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.settings.channel = channel.into();
        self
    }

    pub fn with_max_entries(mut self, max_entries: u64) -> Self {
        self.settings.max_entries = max_entries;
        self
    }

    pub fn with_settings(mut self, settings: CacheSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Subscribe to the invalidation channel, spawn the listener, and hand
    /// back the cache. Fails if the backend handle is missing or the
    /// settings are invalid.
    pub async fn build(self) -> Result<NearCache> {
        let backend = self
            .backend
            .ok_or_else(|| CacheError::configuration("backend handle is required"))?;
        self.settings.validate()?;

        let uuid = Uuid::new_v4();
        let freshness = Arc::new(SlotFreshness::new());

        let stream = backend.subscribe(&self.settings.channel).await?;
        let listener = InvalidationListener::new(uuid, Arc::clone(&freshness));
        let handle = tokio::spawn(listener.run(stream));

        Ok(NearCache {
            backend,
            uuid,
            local: MemoryCache::new(self.settings.max_entries),
            freshness,
            channel: self.settings.channel,
            listener: Mutex::new(Some(handle)),
        })
    }
}

impl Default for NearCacheBuilder {
    fn default() -> Self {
        Self::new()
    }
}
