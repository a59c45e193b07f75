//! # nearcache-core
//!
//! Backend-independent engine for the nearcache coherent two-tier cache.
//!
//! This crate holds everything that does not talk to the network: the bounded
//! in-memory tier with TTL and LRU eviction, the slot hash shared with peers,
//! the payload codec, the 18-byte invalidation message, and the per-slot
//! freshness table. The Redis-facing facade lives in `nearcache-redis`.

pub mod error;
pub mod freshness;
pub mod memory;
pub mod message;
pub mod payload;
pub mod slot;
pub mod time;

pub use error::{CacheError, PayloadError, Result};
pub use freshness::SlotFreshness;
pub use memory::{CachedValue, MemoryCache};
pub use message::{InvalidationMessage, INVALIDATION_LEN};
pub use payload::{FromPayload, Packed, ToPayload};
pub use slot::{crc16, key_slot, SLOT_COUNT};
pub use time::now_micros;
