//! Conversion between cache values and their wire bytes.
//!
//! Values cross the cache boundary as opaque byte payloads; the conversions
//! here decide how a typed value becomes bytes and back. Byte buffers travel
//! verbatim and strings travel as raw UTF-8, so peers in other runtimes read
//! the same representation. Everything else opts in to a self-describing
//! MessagePack encoding through the [`Packed`] wrapper.
//!
//! Decoding an empty buffer into any destination is a success no-op: the
//! backend reports deleted or never-written keys as empty payloads, and
//! callers must be able to pass a destination they do not care about.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::PayloadError;

/// Encode a value to its payload bytes.
pub trait ToPayload {
    fn to_payload(&self) -> Result<Vec<u8>, PayloadError>;
}

/// Decode payload bytes into an existing destination.
///
/// `merge_payload` mutates the destination in place so that an empty buffer
/// can leave it untouched while still reporting success.
pub trait FromPayload {
    fn merge_payload(&mut self, buf: &[u8]) -> Result<(), PayloadError>;
}

impl ToPayload for Vec<u8> {
    fn to_payload(&self) -> Result<Vec<u8>, PayloadError> {
        Ok(self.clone())
    }
}

impl ToPayload for [u8] {
    fn to_payload(&self) -> Result<Vec<u8>, PayloadError> {
        Ok(self.to_vec())
    }
}

impl ToPayload for String {
    fn to_payload(&self) -> Result<Vec<u8>, PayloadError> {
        Ok(self.as_bytes().to_vec())
    }
}

impl ToPayload for str {
    fn to_payload(&self) -> Result<Vec<u8>, PayloadError> {
        Ok(self.as_bytes().to_vec())
    }
}

impl<T: ToPayload + ?Sized> ToPayload for &T {
    fn to_payload(&self) -> Result<Vec<u8>, PayloadError> {
        (**self).to_payload()
    }
}

/// `None` encodes to an empty payload.
impl<T: ToPayload> ToPayload for Option<T> {
    fn to_payload(&self) -> Result<Vec<u8>, PayloadError> {
        match self {
            Some(value) => value.to_payload(),
            None => Ok(Vec::new()),
        }
    }
}

impl FromPayload for Vec<u8> {
    fn merge_payload(&mut self, buf: &[u8]) -> Result<(), PayloadError> {
        if buf.is_empty() {
            return Ok(());
        }
        *self = buf.to_vec();
        Ok(())
    }
}

impl FromPayload for String {
    fn merge_payload(&mut self, buf: &[u8]) -> Result<(), PayloadError> {
        if buf.is_empty() {
            return Ok(());
        }
        let text = std::str::from_utf8(buf)
            .map_err(|e| PayloadError::decode(format!("payload is not valid UTF-8: {e}")))?;
        *self = text.to_owned();
        Ok(())
    }
}

/// Null destination: accepts any payload without looking at it.
impl FromPayload for () {
    fn merge_payload(&mut self, _buf: &[u8]) -> Result<(), PayloadError> {
        Ok(())
    }
}

impl<T: FromPayload + Default> FromPayload for Option<T> {
    fn merge_payload(&mut self, buf: &[u8]) -> Result<(), PayloadError> {
        if buf.is_empty() {
            return Ok(());
        }
        self.get_or_insert_with(T::default).merge_payload(buf)
    }
}

/// Wrapper that encodes the inner value as self-describing MessagePack.
///
/// Structs serialize as maps keyed by field name, so the wire format is
/// stable across peers regardless of field order or language.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packed<T>(pub T);

impl<T> Packed<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: Serialize> ToPayload for Packed<T> {
    fn to_payload(&self) -> Result<Vec<u8>, PayloadError> {
        rmp_serde::to_vec_named(&self.0).map_err(|e| PayloadError::encode(e.to_string()))
    }
}

impl<T: DeserializeOwned> FromPayload for Packed<T> {
    fn merge_payload(&mut self, buf: &[u8]) -> Result<(), PayloadError> {
        if buf.is_empty() {
            return Ok(());
        }
        self.0 = rmp_serde::from_slice(buf).map_err(|e| PayloadError::decode(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;

    #[test]
    fn test_bytes_roundtrip_verbatim() {
        let value = vec![0u8, 1, 2, 0xFF];
        let encoded = value.to_payload().unwrap();
        assert_eq!(encoded, value);

        let mut dest = Vec::new();
        dest.merge_payload(&encoded).unwrap();
        assert_eq!(dest, value);
    }

    #[test]
    fn test_text_roundtrip_raw_utf8() {
        let value = "v\u{00e9}rit\u{00e9}".to_string();
        let encoded = value.to_payload().unwrap();
        assert_eq!(encoded, value.as_bytes());

        let mut dest = String::new();
        dest.merge_payload(&encoded).unwrap();
        assert_eq!(dest, value);
    }

    #[test]
    fn test_str_encodes_like_string() {
        assert_eq!("v1".to_payload().unwrap(), b"v1".to_vec());
    }

    #[test]
    fn test_none_encodes_empty() {
        let value: Option<String> = None;
        assert!(value.to_payload().unwrap().is_empty());
    }

    #[test]
    fn test_empty_buffer_decode_is_noop() {
        let mut dest = "untouched".to_string();
        dest.merge_payload(&[]).unwrap();
        assert_eq!(dest, "untouched");

        let mut bytes = vec![1, 2, 3];
        bytes.merge_payload(&[]).unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);

        let mut opt: Option<String> = None;
        opt.merge_payload(&[]).unwrap();
        assert!(opt.is_none());
    }

    #[test]
    fn test_null_destination_accepts_anything() {
        let mut dest = ();
        dest.merge_payload(b"whatever").unwrap();
    }

    #[test]
    fn test_invalid_utf8_is_decode_error() {
        let mut dest = String::new();
        let err = dest.merge_payload(&[0xFF, 0xFE]).unwrap_err();
        assert!(matches!(err, PayloadError::Decode(_)));
    }

    #[test]
    fn test_packed_map_roundtrip() {
        let mut map = HashMap::new();
        map.insert("k1".to_string(), "v1".to_string());
        map.insert("k2".to_string(), "v2".to_string());

        let encoded = Packed(map.clone()).to_payload().unwrap();
        let mut dest: Packed<HashMap<String, String>> = Packed(HashMap::new());
        dest.merge_payload(&encoded).unwrap();
        assert_eq!(dest.0, map);
    }

    #[test]
    fn test_packed_sequence_roundtrip() {
        let seq = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let encoded = Packed(seq.clone()).to_payload().unwrap();
        let mut dest: Packed<Vec<String>> = Packed(Vec::new());
        dest.merge_payload(&encoded).unwrap();
        assert_eq!(dest.0, seq);
    }

    #[test]
    fn test_packed_record_roundtrip() {
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        struct Account {
            name: String,
            balance: i64,
        }

        let account = Account {
            name: "alice".to_string(),
            balance: 42,
        };
        let encoded = Packed(account.clone()).to_payload().unwrap();
        let mut dest: Packed<Account> = Packed::default();
        dest.merge_payload(&encoded).unwrap();
        assert_eq!(dest.0, account);
    }

    #[test]
    fn test_packed_type_mismatch_is_decode_error() {
        let encoded = Packed(vec![1u32, 2, 3]).to_payload().unwrap();
        let mut dest: Packed<HashMap<String, String>> = Packed(HashMap::new());
        let err = dest.merge_payload(&encoded).unwrap_err();
        assert!(matches!(err, PayloadError::Decode(_)));
    }

    #[test]
    fn test_packed_truncated_input_is_decode_error() {
        let mut encoded = Packed("hello world".to_string()).to_payload().unwrap();
        encoded.truncate(encoded.len() - 4);
        let mut dest: Packed<String> = Packed(String::new());
        assert!(dest.merge_payload(&encoded).is_err());
    }
}
