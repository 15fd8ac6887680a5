//! In-process co-processor for dev mode and tests.
//!
//! Stands in for the real FHE service: plaintexts are sealed with
//! ChaCha20-Poly1305 under a per-instance service key, handles are
//! blake3-derived references into the ciphertext store, and input
//! proofs are keyed hashes binding a handle to one contract and caller.
//! The homomorphic comparison is evaluated by [`MockCoprocessor::eval_ge`],
//! which the dev chain calls at confirmation time.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chacha20poly1305::{
    ChaCha20Poly1305, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use veil_codec::{Address, Handle, RawHandle};

use crate::grant::unix_timestamp;
use crate::{Coprocessor, FheError, RawCiphertext, UserDecryptRequest};

const HANDLE_DOMAIN: &str = "veil-handle-v1";

/// One sealed plaintext in the store.
struct Sealed {
    nonce: [u8; 12],
    ciphertext: Vec<u8>,
}

pub struct MockCoprocessor {
    service_key: [u8; 32],
    proof_key: [u8; 32],
    store: Mutex<HashMap<Handle, Sealed>>,
    decrypt_calls: AtomicU64,
}

impl MockCoprocessor {
    pub fn new() -> Self {
        Self {
            service_key: ChaCha20Poly1305::generate_key(&mut OsRng).into(),
            proof_key: ChaCha20Poly1305::generate_key(&mut OsRng).into(),
            store: Mutex::new(HashMap::new()),
            decrypt_calls: AtomicU64::new(0),
        }
    }

    /// How many times `user_decrypt` has been reached. Lets tests
    /// assert that early rejections never contact the co-processor.
    pub fn decrypt_calls(&self) -> u64 {
        self.decrypt_calls.load(Ordering::Relaxed)
    }

    /// Check an input proof against the handle/contract/caller binding.
    /// Called by the dev chain when a submission is executed.
    pub fn verify_input_proof(
        &self,
        handle: Handle,
        proof: &[u8],
        contract: Address,
        account: Address,
    ) -> bool {
        proof == self.bind_proof(handle, contract, account)
    }

    /// Evaluate `stored(handle) >= threshold` over the ciphertext and
    /// store the boolean result under a fresh handle.
    pub fn eval_ge(
        &self,
        handle: Handle,
        threshold: u64,
        contract: Address,
        account: Address,
    ) -> Result<Handle, FheError> {
        let value = self.open(handle)?;
        let result = u64::from(value >= threshold);
        Ok(self.seal(result, contract, account))
    }

    /// Seal a plaintext and allocate a non-zero handle for it.
    fn seal(&self, value: u64, contract: Address, account: Address) -> Handle {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.service_key)
            .expect("service key is 32 bytes");
        loop {
            let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
            let ciphertext = cipher
                .encrypt(&nonce, value.to_le_bytes().as_slice())
                .expect("sealing a fixed-size plaintext cannot fail");

            let mut hasher = blake3::Hasher::new_derive_key(HANDLE_DOMAIN);
            hasher.update(contract.as_bytes());
            hasher.update(account.as_bytes());
            hasher.update(&nonce);
            hasher.update(&ciphertext);
            let handle = Handle(*hasher.finalize().as_bytes());

            // The zero handle is the reserved "nothing computed"
            // sentinel; never allocate it.
            if handle.is_zero() {
                continue;
            }

            self.store.lock().expect("store lock").insert(
                handle,
                Sealed {
                    nonce: nonce.into(),
                    ciphertext,
                },
            );
            return handle;
        }
    }

    fn open(&self, handle: Handle) -> Result<u64, FheError> {
        let store = self.store.lock().expect("store lock");
        let sealed = store.get(&handle).ok_or(FheError::HandleNotFound)?;

        let cipher = ChaCha20Poly1305::new_from_slice(&self.service_key)
            .expect("service key is 32 bytes");
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&sealed.nonce), sealed.ciphertext.as_slice())
            .map_err(|_| FheError::Backend("ciphertext store corrupted".into()))?;
        let bytes: [u8; 8] = plaintext
            .as_slice()
            .try_into()
            .map_err(|_| FheError::Backend("unexpected plaintext length".into()))?;
        Ok(u64::from_le_bytes(bytes))
    }

    fn bind_proof(&self, handle: Handle, contract: Address, account: Address) -> Vec<u8> {
        let mut material = Vec::with_capacity(Handle::LEN + Address::LEN * 2);
        material.extend_from_slice(handle.as_bytes());
        material.extend_from_slice(contract.as_bytes());
        material.extend_from_slice(account.as_bytes());
        blake3::keyed_hash(&self.proof_key, &material)
            .as_bytes()
            .to_vec()
    }
}

impl Default for MockCoprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Coprocessor for MockCoprocessor {
    async fn encrypt(
        &self,
        contract: Address,
        account: Address,
        value: u64,
        _bit_width: u32,
    ) -> Result<RawCiphertext, FheError> {
        let handle = self.seal(value, contract, account);
        let proof = self.bind_proof(handle, contract, account);

        // Returned as an unprefixed hex string: real co-processor
        // builds disagree on the representation, and clients must
        // normalize anyway.
        Ok(RawCiphertext {
            handle: RawHandle::Hex(hex::encode(handle.as_bytes())),
            proof,
        })
    }

    async fn user_decrypt(
        &self,
        request: UserDecryptRequest,
    ) -> Result<HashMap<Handle, u64>, FheError> {
        self.decrypt_calls.fetch_add(1, Ordering::Relaxed);

        request.grant.verify_signature()?;

        let signer_account = Address::from_public_key(&request.grant.signer);
        if signer_account != request.account {
            return Err(FheError::Authorization(
                "grant signer does not match requesting account".into(),
            ));
        }
        if request.grant.grant.public_key != request.public_key {
            return Err(FheError::Authorization(
                "grant is bound to a different decryption key".into(),
            ));
        }
        if !request.grant.grant.window_contains(unix_timestamp()) {
            return Err(FheError::Authorization(
                "grant validity window does not contain now".into(),
            ));
        }

        let mut values = HashMap::with_capacity(request.requests.len());
        for req in &request.requests {
            if !request.grant.grant.covers(&req.contract) {
                return Err(FheError::Authorization(format!(
                    "grant does not cover contract {}",
                    req.contract
                )));
            }
            values.insert(req.handle, self.open(req.handle)?);
        }
        Ok(values)
    }
}
