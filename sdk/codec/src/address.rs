//! 20-byte account and contract addresses, hex-encoded on the wire.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::CodecError;

/// An account or contract address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const LEN: usize = 20;
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Derive an address from a signer's 32-byte public key.
    /// Formula: first 20 bytes of SHA256(public_key).
    pub fn from_public_key(public_key: &[u8; 32]) -> Address {
        let digest = Sha256::digest(public_key);
        let mut out = [0u8; Self::LEN];
        out.copy_from_slice(&digest[..Self::LEN]);
        Address(out)
    }
}

impl FromStr for Address {
    type Err = CodecError;

    /// Parse a `0x`-prefixed (prefix optional) 40-hex-char address.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if body.len() != Self::LEN * 2 {
            return Err(CodecError::Format(format!(
                "address must be {} hex chars, got {}",
                Self::LEN * 2,
                body.len()
            )));
        }
        let bytes =
            hex::decode(body).map_err(|e| CodecError::Format(format!("invalid address: {e}")))?;
        let mut out = [0u8; Self::LEN];
        out.copy_from_slice(&bytes);
        Ok(Address(out))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let addr: Address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
            .parse()
            .unwrap();
        assert_eq!(addr.to_hex(), "0x5fbdb2315678afecb367f032d93f642f64180aa3");
        assert_eq!(addr.to_hex().parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn wrong_length_rejected() {
        assert!("0x1234".parse::<Address>().is_err());
        assert!("".parse::<Address>().is_err());
    }

    #[test]
    fn derived_addresses_are_stable() {
        let pk = [7u8; 32];
        assert_eq!(Address::from_public_key(&pk), Address::from_public_key(&pk));
        assert_ne!(Address::from_public_key(&pk), Address::ZERO);
    }
}
