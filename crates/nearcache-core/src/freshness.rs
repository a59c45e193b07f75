//! Per-slot freshness table.
//!
//! A fixed array of 16384 microsecond timestamps, one per slot, recording the
//! latest moment this process learned of a peer-originated update to any key
//! in that slot. All entries start at zero. The read path takes a read lock
//! for a single load; the listener takes a write lock for a single store, so
//! one lock over the whole array is enough.

use parking_lot::RwLock;

use crate::slot::SLOT_COUNT;

/// The slot freshness table. Lives for the process lifetime.
pub struct SlotFreshness {
    slots: RwLock<Box<[i64]>>,
}

impl SlotFreshness {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(vec![0i64; SLOT_COUNT as usize].into_boxed_slice()),
        }
    }

    /// Microsecond timestamp of the last known peer update to `slot`, or
    /// zero if no peer has ever touched it.
    pub fn last_updated(&self, slot: u16) -> i64 {
        self.slots.read()[slot as usize]
    }

    /// Record a peer update to `slot` at `ts` (microseconds).
    pub fn mark(&self, slot: u16, ts: i64) {
        self.slots.write()[slot as usize] = ts;
    }
}

impl Default for SlotFreshness {
    fn default() -> Self {
        Self::new()
    }
}
