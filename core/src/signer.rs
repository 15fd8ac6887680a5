//! Wallet signing boundary.
//!
//! The wallet is the only holder of the account key. The client never
//! sees it; it only asks for signatures over pre-computed digests and
//! the user may decline.

use ed25519_dalek::{Signer, SigningKey};
use thiserror::Error;
use veil_codec::Address;

#[derive(Debug, Error)]
pub enum SignerError {
    /// The user declined the signature prompt.
    #[error("signature request rejected")]
    Rejected,

    #[error("wallet unavailable: {0}")]
    Unavailable(String),
}

/// A connected wallet able to sign typed digests.
#[allow(async_fn_in_trait)]
pub trait WalletSigner: Send + Sync {
    fn address(&self) -> Address;

    fn public_key(&self) -> [u8; 32];

    /// Sign a 32-byte typed-data digest. May take arbitrarily long
    /// while the user considers the prompt; callers must not time it
    /// out.
    async fn sign_typed_data(&self, digest: &[u8; 32]) -> Result<[u8; 64], SignerError>;
}

/// In-process wallet for dev mode and tests.
pub struct LocalSigner {
    key: SigningKey,
    /// When set, the next signature request is declined.
    reject_next: std::sync::atomic::AtomicBool,
}

impl LocalSigner {
    pub fn random() -> Self {
        use chacha20poly1305::aead::OsRng;
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(&seed))
    }

    fn from_signing_key(key: SigningKey) -> Self {
        Self {
            key,
            reject_next: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Decline the next signature request, as a user dismissing the
    /// wallet prompt would.
    pub fn reject_next_signature(&self) {
        self.reject_next
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }
}

impl WalletSigner for LocalSigner {
    fn address(&self) -> Address {
        Address::from_public_key(&self.public_key())
    }

    fn public_key(&self) -> [u8; 32] {
        self.key.verifying_key().to_bytes()
    }

    async fn sign_typed_data(&self, digest: &[u8; 32]) -> Result<[u8; 64], SignerError> {
        if self
            .reject_next
            .swap(false, std::sync::atomic::Ordering::SeqCst)
        {
            return Err(SignerError::Rejected);
        }
        Ok(self.key.sign(digest).to_bytes())
    }
}
