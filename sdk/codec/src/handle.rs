//! Ciphertext handle normalization.
//!
//! Co-processor libraries hand back handles in whatever shape their FFI
//! produced: raw bytes, a big unsigned integer, or a hex string with or
//! without a `0x` prefix. Everything downstream wants exactly one form,
//! so every representation funnels through [`Handle::normalize`] and
//! comes out as 32 bytes rendering to `0x` + 64 lowercase hex chars.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CodecError;

/// Opaque 32-byte reference to a ciphertext held by the co-processor.
///
/// The all-zero handle is a reserved sentinel meaning "nothing computed
/// yet" and must never be sent to the co-processor for decryption.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle(pub [u8; 32]);

/// A handle as received from an external source, before normalization.
#[derive(Debug, Clone)]
pub enum RawHandle {
    /// Raw byte sequence, at most 32 bytes.
    Bytes(Vec<u8>),
    /// Unsigned integer value. Caps at 128 bits; sources that hand
    /// back full 256-bit handles use the `Bytes` or `Hex` forms.
    Uint(u128),
    /// Hex string, `0x` prefix optional, at most 64 digits.
    Hex(String),
}

impl Handle {
    pub const LEN: usize = 32;

    /// Reserved sentinel: the contract returns this when no result
    /// has been computed for the account.
    pub const ZERO: Handle = Handle([0u8; 32]);

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Canonical rendering: `0x` followed by exactly 64 lowercase hex chars.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Normalize any supported representation into a canonical handle.
    ///
    /// Integers are big-endian encoded and left-zero-padded; byte
    /// sequences shorter than 32 bytes are left-zero-padded; hex
    /// strings gain a prefix and padding as needed. Anything encoding
    /// to more than 32 bytes is rejected.
    pub fn normalize(raw: RawHandle) -> Result<Handle, CodecError> {
        match raw {
            RawHandle::Bytes(bytes) => Self::from_bytes(&bytes),
            RawHandle::Uint(value) => {
                let be = value.to_be_bytes();
                Self::from_bytes(&be)
            }
            RawHandle::Hex(s) => Self::from_hex(&s),
        }
    }

    /// Left-zero-pad a byte sequence of at most 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Handle, CodecError> {
        if bytes.len() > Self::LEN {
            return Err(CodecError::TooLong {
                got: bytes.len(),
                max: Self::LEN,
            });
        }
        let mut out = [0u8; Self::LEN];
        out[Self::LEN - bytes.len()..].copy_from_slice(bytes);
        Ok(Handle(out))
    }

    /// Parse a hex string, `0x` prefix optional, left-padding short bodies.
    pub fn from_hex(s: &str) -> Result<Handle, CodecError> {
        let body = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if body.is_empty() {
            return Err(CodecError::Format("empty hex string".into()));
        }
        if !body.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CodecError::Format(format!("not a hex string: {s:?}")));
        }
        if body.len() > Self::LEN * 2 {
            return Err(CodecError::TooLong {
                got: body.len().div_ceil(2),
                max: Self::LEN,
            });
        }
        let mut padded = String::with_capacity(Self::LEN * 2);
        for _ in 0..(Self::LEN * 2 - body.len()) {
            padded.push('0');
        }
        padded.push_str(body);
        let bytes = hex::decode(&padded)
            .map_err(|e| CodecError::Format(format!("invalid hex: {e}")))?;
        let mut out = [0u8; Self::LEN];
        out.copy_from_slice(&bytes);
        Ok(Handle(out))
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.to_hex())
    }
}

impl FromStr for Handle {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; 32]> for Handle {
    fn from(bytes: [u8; 32]) -> Self {
        Handle(bytes)
    }
}

impl From<Vec<u8>> for RawHandle {
    fn from(bytes: Vec<u8>) -> Self {
        RawHandle::Bytes(bytes)
    }
}

impl From<&[u8]> for RawHandle {
    fn from(bytes: &[u8]) -> Self {
        RawHandle::Bytes(bytes.to_vec())
    }
}

impl From<u128> for RawHandle {
    fn from(value: u128) -> Self {
        RawHandle::Uint(value)
    }
}

impl From<&str> for RawHandle {
    fn from(s: &str) -> Self {
        RawHandle::Hex(s.to_string())
    }
}

impl From<String> for RawHandle {
    fn from(s: String) -> Self {
        RawHandle::Hex(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_representations_agree() {
        let value: u128 = 0xdead_beef;
        let from_uint = Handle::normalize(RawHandle::Uint(value)).unwrap();
        let from_hex = Handle::normalize(RawHandle::Hex("0xdeadbeef".into())).unwrap();
        let from_bare_hex = Handle::normalize(RawHandle::Hex("deadbeef".into())).unwrap();
        let from_bytes =
            Handle::normalize(RawHandle::Bytes(vec![0xde, 0xad, 0xbe, 0xef])).unwrap();

        assert_eq!(from_uint, from_hex);
        assert_eq!(from_hex, from_bare_hex);
        assert_eq!(from_bare_hex, from_bytes);
        assert_eq!(
            from_uint.to_hex(),
            "0x00000000000000000000000000000000000000000000000000000000deadbeef"
        );
    }

    #[test]
    fn output_is_always_64_hex_chars() {
        let cases = [
            Handle::normalize(RawHandle::Uint(0)).unwrap(),
            Handle::normalize(RawHandle::Uint(1)).unwrap(),
            Handle::normalize(RawHandle::Uint(u128::MAX)).unwrap(),
            Handle::normalize(RawHandle::Bytes(vec![0xff; 32])).unwrap(),
            Handle::normalize(RawHandle::Hex("f".into())).unwrap(),
        ];
        for h in cases {
            let s = h.to_hex();
            assert_eq!(s.len(), 2 + 64);
            assert!(s.starts_with("0x"));
            assert!(s[2..].bytes().all(|b| b.is_ascii_hexdigit()));
            assert_eq!(s, s.to_lowercase());
        }
    }

    #[test]
    fn full_width_handles_arrive_as_bytes_or_hex() {
        let bytes = vec![0xabu8; 32];
        let from_bytes = Handle::normalize(RawHandle::Bytes(bytes.clone())).unwrap();
        let from_hex = Handle::normalize(RawHandle::Hex("ab".repeat(32))).unwrap();
        assert_eq!(from_bytes, from_hex);
        assert_eq!(from_bytes.as_bytes(), &[0xab; 32]);
    }

    #[test]
    fn uppercase_hex_normalizes_to_lowercase() {
        let h = Handle::from_hex("0xDEADBEEF").unwrap();
        assert_eq!(
            h.to_hex(),
            "0x00000000000000000000000000000000000000000000000000000000deadbeef"
        );
    }

    #[test]
    fn odd_length_hex_is_left_padded() {
        let h = Handle::from_hex("f").unwrap();
        assert_eq!(h.0[31], 0x0f);
    }

    #[test]
    fn oversized_input_is_rejected() {
        let err = Handle::normalize(RawHandle::Bytes(vec![1u8; 33])).unwrap_err();
        assert_eq!(err, CodecError::TooLong { got: 33, max: 32 });

        let long_hex = "ff".repeat(33);
        let err = Handle::normalize(RawHandle::Hex(long_hex)).unwrap_err();
        assert!(matches!(err, CodecError::TooLong { .. }));
    }

    #[test]
    fn garbage_hex_is_rejected() {
        assert!(matches!(
            Handle::from_hex("0xzzzz"),
            Err(CodecError::Format(_))
        ));
        assert!(matches!(Handle::from_hex(""), Err(CodecError::Format(_))));
        assert!(matches!(Handle::from_hex("0x"), Err(CodecError::Format(_))));
    }

    #[test]
    fn zero_sentinel() {
        assert!(Handle::ZERO.is_zero());
        assert!(!Handle::from_hex("0x01").unwrap().is_zero());
        assert_eq!(
            Handle::ZERO.to_hex(),
            "0x0000000000000000000000000000000000000000000000000000000000000000"
        );
    }
}
