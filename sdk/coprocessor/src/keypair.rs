//! Ephemeral decryption keypairs.

use chacha20poly1305::aead::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};

/// An ephemeral X25519 keypair generated per decryption attempt.
///
/// Never persisted: generate, bind into a grant, hand to the
/// co-processor request, then drop.
pub struct DecryptionKeypair {
    secret: StaticSecret,
    public: PublicKey,
}

impl DecryptionKeypair {
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.public.to_bytes()
    }

    /// Raw secret bytes. Only ever placed into a co-processor request.
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes()
    }
}
