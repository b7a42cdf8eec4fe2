//! UTF-8 text codec for string fields
//!
//! String payloads are decoded through this module boundary so the codec
//! stays swappable. [`decode`] is the strict, validating path used by the
//! kernel; [`decode_lossy`] is a non-validating fallback for callers that
//! must tolerate malformed text (replacement characters instead of errors).

use alloc::string::String;
use bytes::Bytes;

use crate::error::{Error, Result};

/// Decode bytes as UTF-8, rejecting malformed input
#[inline]
pub fn decode(bytes: &[u8]) -> Result<String> {
    match core::str::from_utf8(bytes) {
        Ok(s) => Ok(String::from(s)),
        Err(_) => Err(Error::InvalidUtf8),
    }
}

/// Decode bytes as UTF-8, substituting U+FFFD for malformed sequences
#[inline]
pub fn decode_lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Encode text as UTF-8 bytes
#[inline]
pub fn encode(text: &str) -> Bytes {
    Bytes::copy_from_slice(text.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_decode() {
        assert_eq!(decode(b"caf\xC3\xA9").unwrap(), "café");
        assert_eq!(decode(&[0xC3]), Err(Error::InvalidUtf8));
    }

    #[test]
    fn test_lossy_decode() {
        assert_eq!(decode_lossy(&[b'a', 0xFF, b'b']), "a\u{FFFD}b");
    }

    #[test]
    fn test_encode_roundtrip() {
        let bytes = encode("héllo");
        assert_eq!(decode(&bytes).unwrap(), "héllo");
    }
}
