//! Time-bounded decryption authorization.
//!
//! A grant authorizes decryption of handles belonging to a specific set
//! of contracts, for a bounded window of time, under an ephemeral
//! public key. The wallet signs a domain-separated digest of the grant;
//! the digest binds every field, so a signature cannot be replayed for
//! a different contract set or window.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use veil_codec::Address;

use crate::FheError;

pub const SECONDS_PER_DAY: u64 = 86_400;

/// Domain separation context for grant digests.
const GRANT_DOMAIN: &str = "veil-user-decrypt-v1";

/// Current unix timestamp in seconds.
pub fn unix_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// An unsigned decryption grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationGrant {
    /// Ephemeral public key the decryption response is bound to.
    pub public_key: [u8; 32],
    /// Contracts whose handles this grant covers.
    pub contracts: Vec<Address>,
    /// Start of the validity window (unix seconds).
    pub start_timestamp: u64,
    /// Window length in days.
    pub duration_days: u64,
}

impl AuthorizationGrant {
    /// Domain-separated digest over every grant field. This is what
    /// the wallet signs.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new_derive_key(GRANT_DOMAIN);
        hasher.update(&self.public_key);
        hasher.update(&(self.contracts.len() as u32).to_le_bytes());
        for contract in &self.contracts {
            hasher.update(contract.as_bytes());
        }
        hasher.update(&self.start_timestamp.to_le_bytes());
        hasher.update(&self.duration_days.to_le_bytes());
        *hasher.finalize().as_bytes()
    }

    /// End of the validity window (exclusive).
    pub fn expires_at(&self) -> u64 {
        self.start_timestamp
            .saturating_add(self.duration_days.saturating_mul(SECONDS_PER_DAY))
    }

    pub fn window_contains(&self, now: u64) -> bool {
        now >= self.start_timestamp && now < self.expires_at()
    }

    pub fn covers(&self, contract: &Address) -> bool {
        self.contracts.contains(contract)
    }
}

/// A grant plus the wallet signature over its digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedGrant {
    pub grant: AuthorizationGrant,
    /// Verifying key of the wallet that signed.
    pub signer: [u8; 32],
    #[serde(with = "serde_bytes64")]
    pub signature: [u8; 64],
}

impl SignedGrant {
    /// Check the window and contract coverage at use time. Runs before
    /// any co-processor contact so misuse fails fast.
    pub fn ensure_valid(&self, contract: &Address, now: u64) -> Result<(), FheError> {
        if !self.grant.window_contains(now) {
            return Err(FheError::Authorization(format!(
                "grant valid in [{}, {}), now is {}",
                self.grant.start_timestamp,
                self.grant.expires_at(),
                now
            )));
        }
        if !self.grant.covers(contract) {
            return Err(FheError::Authorization(format!(
                "grant does not cover contract {contract}"
            )));
        }
        Ok(())
    }

    /// Verify the wallet signature over the grant digest.
    pub fn verify_signature(&self) -> Result<(), FheError> {
        let key = VerifyingKey::from_bytes(&self.signer)
            .map_err(|e| FheError::Authorization(format!("invalid signer key: {e}")))?;
        let signature = Signature::from_bytes(&self.signature);
        key.verify(&self.grant.digest(), &signature)
            .map_err(|_| FheError::Authorization("grant signature does not verify".into()))
    }
}

/// Serde support for the fixed 64-byte signature array.
mod serde_bytes64 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 64], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<[u8; 64], D::Error> {
        let v = Vec::<u8>::deserialize(de)?;
        v.try_into()
            .map_err(|_| serde::de::Error::custom("signature must be 64 bytes"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    fn contract() -> Address {
        "0x5fbdb2315678afecb367f032d93f642f64180aa3".parse().unwrap()
    }

    fn grant_at(start: u64, days: u64) -> AuthorizationGrant {
        AuthorizationGrant {
            public_key: [9u8; 32],
            contracts: vec![contract()],
            start_timestamp: start,
            duration_days: days,
        }
    }

    fn sign(grant: AuthorizationGrant) -> SignedGrant {
        let key = SigningKey::from_bytes(&[3u8; 32]);
        let signature = key.sign(&grant.digest()).to_bytes();
        SignedGrant {
            grant,
            signer: key.verifying_key().to_bytes(),
            signature,
        }
    }

    #[test]
    fn window_boundaries() {
        let grant = grant_at(1_000, 10);
        assert!(!grant.window_contains(999));
        assert!(grant.window_contains(1_000));
        assert!(grant.window_contains(1_000 + 10 * SECONDS_PER_DAY - 1));
        assert!(!grant.window_contains(1_000 + 10 * SECONDS_PER_DAY));
    }

    #[test]
    fn expired_grant_rejected() {
        let signed = sign(grant_at(1_000, 1));
        let after_expiry = 1_000 + SECONDS_PER_DAY;
        let err = signed.ensure_valid(&contract(), after_expiry).unwrap_err();
        assert!(matches!(err, FheError::Authorization(_)));
    }

    #[test]
    fn not_yet_valid_grant_rejected() {
        let signed = sign(grant_at(10_000, 1));
        assert!(signed.ensure_valid(&contract(), 9_999).is_err());
        assert!(signed.ensure_valid(&contract(), 10_000).is_ok());
    }

    #[test]
    fn uncovered_contract_rejected() {
        let signed = sign(grant_at(1_000, 1));
        let other: Address = "0x0000000000000000000000000000000000000001".parse().unwrap();
        let err = signed.ensure_valid(&other, 1_500).unwrap_err();
        assert!(matches!(err, FheError::Authorization(_)));
    }

    #[test]
    fn digest_binds_every_field() {
        let base = grant_at(1_000, 10);
        let mut other_key = base.clone();
        other_key.public_key = [8u8; 32];
        let mut other_window = base.clone();
        other_window.start_timestamp += 1;
        let mut other_contracts = base.clone();
        other_contracts.contracts.push(Address::ZERO);

        assert_ne!(base.digest(), other_key.digest());
        assert_ne!(base.digest(), other_window.digest());
        assert_ne!(base.digest(), other_contracts.digest());
    }

    #[test]
    fn signature_verifies_and_tamper_fails() {
        let mut signed = sign(grant_at(1_000, 10));
        assert!(signed.verify_signature().is_ok());

        // Any field change invalidates the signature.
        signed.grant.duration_days += 1;
        assert!(signed.verify_signature().is_err());
    }
}
