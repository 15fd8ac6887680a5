pub mod address;
pub mod handle;

pub use address::Address;
pub use handle::{Handle, RawHandle};

use thiserror::Error;

/// Errors produced while normalizing binary representations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("malformed input: {0}")]
    Format(String),

    #[error("value encodes to {got} bytes, maximum is {max}")]
    TooLong { got: usize, max: usize },
}

/// Hex-encode arbitrary bytes with a `0x` prefix (two lowercase digits per byte).
///
/// Used for variable-length payloads like input proofs, where the
/// fixed-width rules of [`Handle`] do not apply.
pub fn to_prefixed_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_hex_is_lowercase() {
        assert_eq!(to_prefixed_hex(&[0xAB, 0x01]), "0xab01");
        assert_eq!(to_prefixed_hex(&[]), "0x");
    }
}
