use std::sync::Arc;
use std::time::{Duration, Instant};

/// One entry in the in-memory tier.
///
/// The value is the encoded byte payload, not the caller's live object, so
/// identity and lifetime across the cache boundary are irrelevant. Wrapped in
/// `Arc` so hits hand out the payload without copying it.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub value: Arc<Vec<u8>>,
    /// Zero means no expiry.
    pub ttl: Duration,
    pub created: Instant,
    pub last_updated: Instant,
    pub last_accessed: Instant,
    pub access_count: u64,
    /// Slot of the key, shared with the invalidation protocol.
    pub slot: u16,
    /// Microsecond timestamp of the local write that produced this value.
    /// Compared against the slot freshness table on every read.
    pub write_ts: i64,
}

impl CacheEntry {
    pub(crate) fn new(
        key: &str,
        value: Arc<Vec<u8>>,
        ttl: Duration,
        slot: u16,
        write_ts: i64,
        now: Instant,
    ) -> Self {
        Self {
            key: key.to_owned(),
            value,
            ttl,
            created: now,
            last_updated: now,
            last_accessed: now,
            access_count: 0,
            slot,
            write_ts,
        }
    }

    /// TTL expiry: `ttl > 0 && now > last_updated + ttl`.
    pub fn is_expired(&self) -> bool {
        !self.ttl.is_zero() && self.last_updated.elapsed() > self.ttl
    }
}

/// Snapshot handed out by [`MemoryCache::get`](super::MemoryCache::get):
/// the payload plus the fields the coherency check needs.
#[derive(Debug, Clone)]
pub struct CachedValue {
    pub payload: Arc<Vec<u8>>,
    pub slot: u16,
    pub write_ts: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn entry(ttl: Duration) -> CacheEntry {
        CacheEntry::new(
            "k",
            Arc::new(b"v".to_vec()),
            ttl,
            0,
            0,
            Instant::now(),
        )
    }

    #[test]
    fn test_zero_ttl_never_expires() {
        let e = entry(Duration::ZERO);
        assert!(!e.is_expired());
    }

    #[test]
    fn test_expires_after_ttl() {
        let e = entry(Duration::from_millis(20));
        assert!(!e.is_expired());
        sleep(Duration::from_millis(40));
        assert!(e.is_expired());
    }

    #[test]
    fn test_update_resets_expiry() {
        let mut e = entry(Duration::from_millis(50));
        sleep(Duration::from_millis(30));
        e.last_updated = Instant::now();
        sleep(Duration::from_millis(30));
        // 60ms since creation but only 30ms since the last update.
        assert!(!e.is_expired());
    }
}
