//! Client boundary to the FHE co-processor.
//!
//! The co-processor is the off-chain service that encrypts plaintext
//! inputs into ciphertext handles and decrypts result handles for
//! authorized users. This crate defines the [`Coprocessor`] trait, the
//! client types that sit in front of it ([`EncryptionClient`],
//! [`DecryptionClient`]), the time-bounded [`AuthorizationGrant`] a
//! wallet signs to permit decryption, and an in-process
//! [`MockCoprocessor`] for dev mode and tests.

pub mod encrypt;
pub mod grant;
pub mod keypair;
pub mod mock;

mod decrypt;

use std::collections::HashMap;

use thiserror::Error;
use veil_codec::{Address, CodecError, Handle, RawHandle};

pub use decrypt::DecryptionClient;
pub use encrypt::{EncryptedInput, EncryptionClient};
pub use grant::{AuthorizationGrant, SignedGrant, SECONDS_PER_DAY, unix_timestamp};
pub use keypair::DecryptionKeypair;
pub use mock::MockCoprocessor;

/// Errors from the encryption/decryption boundary.
#[derive(Debug, Error)]
pub enum FheError {
    #[error("plaintext {value} does not fit in {bit_width} bits")]
    OutOfRange { value: u64, bit_width: u32 },

    #[error("no ciphertext exists for this handle")]
    HandleNotFound,

    #[error("decryption not authorized: {0}")]
    Authorization(String),

    #[error("co-processor failure: {0}")]
    Backend(String),

    #[error(transparent)]
    Encoding(#[from] CodecError),
}

/// An encrypted input as returned by the co-processor, before the
/// handle has been normalized. Different co-processor builds return the
/// handle as bytes, an integer, or a hex string.
#[derive(Debug, Clone)]
pub struct RawCiphertext {
    pub handle: RawHandle,
    pub proof: Vec<u8>,
}

/// One handle/contract pair in a user decryption request.
#[derive(Debug, Clone)]
pub struct HandleRequest {
    pub handle: Handle,
    pub contract: Address,
}

/// A full user decryption request: the handles to open, the ephemeral
/// keypair the response is bound to, the signed grant, and the account
/// the grant was signed by.
#[derive(Debug, Clone)]
pub struct UserDecryptRequest {
    pub requests: Vec<HandleRequest>,
    pub private_key: [u8; 32],
    pub public_key: [u8; 32],
    pub grant: SignedGrant,
    pub account: Address,
}

/// The co-processor service boundary. Every call is a suspension
/// point; implementations may be remote.
#[allow(async_fn_in_trait)]
pub trait Coprocessor: Send + Sync {
    /// Encrypt `value` into a ciphertext handle plus an input proof
    /// binding the handle to `(contract, account)` so it cannot be
    /// replayed elsewhere.
    async fn encrypt(
        &self,
        contract: Address,
        account: Address,
        value: u64,
        bit_width: u32,
    ) -> Result<RawCiphertext, FheError>;

    /// Decrypt the requested handles for an authorized user. Returns
    /// one plaintext per requested handle.
    async fn user_decrypt(
        &self,
        request: UserDecryptRequest,
    ) -> Result<HashMap<Handle, u64>, FheError>;
}
