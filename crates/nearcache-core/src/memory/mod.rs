//! Bounded in-memory tier: concurrent map plus recency list with per-entry
//! TTL.
//!
//! The map stores arena indices into the recency list; the list owns the
//! entries and is the single source of truth. Lock discipline: the map is
//! never touched while the list mutex is held — eviction victims are
//! detached under the list lock and their map entries removed afterwards,
//! guarded by an index comparison so a concurrent re-insert of the same key
//! is never clobbered.
//!
//! This tier produces no errors: every operation succeeds or silently
//! misses.

mod entry;
mod list;

pub use entry::{CacheEntry, CachedValue};

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use list::{LruList, NodeIndex};

/// Bounded map-plus-LRU with TTL-preferring eviction.
pub struct MemoryCache {
    map: DashMap<String, NodeIndex>,
    list: Mutex<LruList<CacheEntry>>,
    max_entries: AtomicU64,
    num_entries: AtomicI64,
}

impl MemoryCache {
    pub fn new(max_entries: u64) -> Self {
        Self {
            map: DashMap::new(),
            list: Mutex::new(LruList::new()),
            max_entries: AtomicU64::new(max_entries),
            num_entries: AtomicI64::new(0),
        }
    }

    /// Look up a key. Misses on absent or expired entries; expired entries
    /// are removed on the way out. A hit refreshes the entry's recency and
    /// access bookkeeping and returns the stored payload — decoding is the
    /// caller's job.
    pub fn get(&self, key: &str) -> Option<CachedValue> {
        let idx = *self.map.get(key)?;

        let mut list = self.list.lock();
        let hit = match list.get_mut(idx) {
            Some(entry) if entry.key == key => {
                if entry.is_expired() {
                    None
                } else {
                    entry.last_accessed = Instant::now();
                    entry.access_count += 1;
                    Some(CachedValue {
                        payload: Arc::clone(&entry.value),
                        slot: entry.slot,
                        write_ts: entry.write_ts,
                    })
                }
            }
            // The index was recycled under us; the mapping is stale.
            _ => return None,
        };

        match hit {
            Some(value) => {
                list.move_to_front(idx);
                Some(value)
            }
            None => {
                list.remove(idx);
                drop(list);
                self.map.remove_if(key, |_, &v| v == idx);
                self.num_entries.fetch_sub(1, Ordering::Relaxed);
                debug!(key = %key, "expired entry dropped on read");
                None
            }
        }
    }

    /// Store a key. An existing entry is updated in place and marked most
    /// recently used; a new entry may first evict (see [`Self::evict_locked`]).
    pub fn insert(
        &self,
        key: &str,
        value: Arc<Vec<u8>>,
        ttl: Duration,
        slot: u16,
        write_ts: i64,
    ) {
        let now = Instant::now();
        let mut evicted = Vec::new();

        match self.map.entry(key.to_owned()) {
            Entry::Occupied(mut occupied) => {
                let idx = *occupied.get();
                let mut list = self.list.lock();
                match list.get_mut(idx) {
                    Some(entry) if entry.key == key => {
                        entry.value = value;
                        entry.ttl = ttl;
                        entry.last_updated = now;
                        entry.last_accessed = now;
                        entry.access_count += 1;
                        entry.slot = slot;
                        entry.write_ts = write_ts;
                        list.move_to_front(idx);
                    }
                    _ => {
                        // Stale mapping: the node behind this index was
                        // detached (and counted down) by whoever removed it,
                        // so the fresh node counts up like any other push.
                        let new_idx = list.push_front(CacheEntry::new(
                            key, value, ttl, slot, write_ts, now,
                        ));
                        drop(list);
                        occupied.insert(new_idx);
                        self.num_entries.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
            Entry::Vacant(vacant) => {
                let mut list = self.list.lock();
                evicted = self.evict_locked(&mut list);
                let idx = list.push_front(CacheEntry::new(key, value, ttl, slot, write_ts, now));
                drop(list);
                vacant.insert(idx);
                self.num_entries.fetch_add(1, Ordering::Relaxed);
            }
        }

        // Victim map entries are cleaned outside both locks; the index guard
        // keeps a concurrently re-inserted key intact.
        for (vidx, vkey) in evicted {
            self.map.remove_if(&vkey, |_, &v| v == vidx);
            self.num_entries.fetch_sub(1, Ordering::Relaxed);
        }
    }

    /// Remove a key. Absent keys are a silent no-op and leave the count
    /// unchanged.
    pub fn remove(&self, key: &str) {
        if let Some((_, idx)) = self.map.remove(key) {
            let mut list = self.list.lock();
            let removed = matches!(list.get(idx), Some(entry) if entry.key == key)
                && list.remove(idx).is_some();
            drop(list);
            if removed {
                self.num_entries.fetch_sub(1, Ordering::Relaxed);
            }
        }
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.num_entries.load(Ordering::Relaxed).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured capacity.
    pub fn max_entries(&self) -> u64 {
        self.max_entries.load(Ordering::Relaxed)
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut list = self.list.lock();
        list.clear();
        drop(list);
        self.map.clear();
        self.num_entries.store(0, Ordering::Relaxed);
    }

    /// TTL-preferring eviction, run under the same list lock as the
    /// admission that triggered it. At capacity, expired entries are swept
    /// first (linear in the tier size, bounded by `max_entries`); only if
    /// none were found does the LRU victim go. Returns the detached victims
    /// whose map entries still need cleanup.
    fn evict_locked(&self, list: &mut LruList<CacheEntry>) -> Vec<(NodeIndex, String)> {
        let max = self.max_entries.load(Ordering::Relaxed);
        if max == 0 || (list.len() as u64) < max {
            return Vec::new();
        }

        let expired: Vec<NodeIndex> = list
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(idx, _)| idx)
            .collect();
        if !expired.is_empty() {
            debug!(count = expired.len(), "eviction sweep reclaimed expired entries");
            return expired
                .into_iter()
                .filter_map(|idx| list.remove(idx).map(|entry| (idx, entry.key)))
                .collect();
        }

        match list.pop_back() {
            Some((idx, entry)) => {
                debug!(key = %entry.key, "evicted least recently used entry");
                vec![(idx, entry.key)]
            }
            None => Vec::new(),
        }
    }
}
