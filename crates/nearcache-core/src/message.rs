//! Wire format of the invalidation broadcast.
//!
//! Every write publishes one fixed-layout message on the shared channel:
//! 16 uuid bytes identifying the originating process, then the affected slot
//! as 2 big-endian bytes. No version field; the layout is identical on every
//! peer.

use uuid::Uuid;

use crate::error::CacheError;

/// Encoded size of an invalidation message.
pub const INVALIDATION_LEN: usize = 18;

/// An invalidation broadcast: which process updated a key in which slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidationMessage {
    /// Per-process identifier chosen at startup. Used for self-loop
    /// suppression: a listener drops messages carrying its own uuid.
    pub uuid: Uuid,
    /// Slot of the affected key, in `[0, 16384)`.
    pub slot: u16,
}

impl InvalidationMessage {
    pub fn new(uuid: Uuid, slot: u16) -> Self {
        Self { uuid, slot }
    }

    /// Serialize to the fixed 18-byte layout `[uuid:16][slot:2 BE]`.
    pub fn encode(&self) -> [u8; INVALIDATION_LEN] {
        let mut buf = [0u8; INVALIDATION_LEN];
        buf[..16].copy_from_slice(self.uuid.as_bytes());
        buf[16..].copy_from_slice(&self.slot.to_be_bytes());
        buf
    }

    /// Deserialize from the fixed layout. Any other length is a protocol
    /// error; the listener logs and drops such payloads.
    pub fn decode(buf: &[u8]) -> Result<Self, CacheError> {
        if buf.len() != INVALIDATION_LEN {
            return Err(CacheError::Protocol {
                expected: INVALIDATION_LEN,
                len: buf.len(),
            });
        }
        let mut uuid_bytes = [0u8; 16];
        uuid_bytes.copy_from_slice(&buf[..16]);
        let slot = u16::from_be_bytes([buf[16], buf[17]]);
        Ok(Self {
            uuid: Uuid::from_bytes(uuid_bytes),
            slot,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_is_18_bytes() {
        let msg = InvalidationMessage::new(Uuid::new_v4(), 1);
        assert_eq!(msg.encode().len(), INVALIDATION_LEN);
    }

    #[test]
    fn test_roundtrip_restores_both_fields() {
        let msg = InvalidationMessage::new(Uuid::new_v4(), 1);
        let decoded = InvalidationMessage::decode(&msg.encode()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_slot_is_big_endian() {
        let msg = InvalidationMessage::new(Uuid::nil(), 0x1234);
        let buf = msg.encode();
        assert_eq!(buf[16], 0x12);
        assert_eq!(buf[17], 0x34);
    }

    #[test]
    fn test_max_slot_roundtrip() {
        let msg = InvalidationMessage::new(Uuid::new_v4(), 16383);
        let decoded = InvalidationMessage::decode(&msg.encode()).unwrap();
        assert_eq!(decoded.slot, 16383);
    }

    #[test]
    fn test_short_payload_is_protocol_error() {
        let err = InvalidationMessage::decode(&[0u8; 4]).unwrap_err();
        assert!(matches!(err, CacheError::Protocol { len: 4, .. }));
    }

    #[test]
    fn test_long_payload_is_protocol_error() {
        assert!(InvalidationMessage::decode(&[0u8; 32]).is_err());
    }
}
