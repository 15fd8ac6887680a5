//! Turning a plaintext value into an encrypted input.

use std::sync::Arc;

use veil_codec::{Address, Handle};

use crate::{Coprocessor, FheError};

/// A ciphertext handle plus the proof binding it to one contract and
/// caller. Single-use: consumed by exactly one transaction attempt, so
/// submission takes it by value.
#[derive(Debug)]
pub struct EncryptedInput {
    pub handle: Handle,
    pub proof: Vec<u8>,
}

/// Client-side encryption front end.
///
/// Pure computation on the co-processor side; no shared state is
/// mutated here. Encryption may be CPU-intensive, so callers should
/// keep it off any latency-sensitive path.
pub struct EncryptionClient<P> {
    coprocessor: Arc<P>,
    contract: Address,
    caller: Address,
}

impl<P: Coprocessor> EncryptionClient<P> {
    pub fn new(coprocessor: Arc<P>, contract: Address, caller: Address) -> Self {
        Self {
            coprocessor,
            contract,
            caller,
        }
    }

    /// Encrypt a 32-bit plaintext, the width the eligibility contract
    /// expects.
    pub async fn encrypt(&self, plaintext: u64) -> Result<EncryptedInput, FheError> {
        self.encrypt_with_width(plaintext, 32).await
    }

    /// Encrypt with an explicit bit width. Fails before contacting the
    /// co-processor if the plaintext does not fit.
    pub async fn encrypt_with_width(
        &self,
        plaintext: u64,
        bit_width: u32,
    ) -> Result<EncryptedInput, FheError> {
        if bit_width < u64::BITS && (plaintext >> bit_width) != 0 {
            return Err(FheError::OutOfRange {
                value: plaintext,
                bit_width,
            });
        }

        let raw = self
            .coprocessor
            .encrypt(self.contract, self.caller, plaintext, bit_width)
            .await?;

        // Whatever representation the co-processor returned, the
        // handle leaves here canonical.
        let handle = Handle::normalize(raw.handle)?;
        Ok(EncryptedInput {
            handle,
            proof: raw.proof,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockCoprocessor;

    fn client() -> EncryptionClient<MockCoprocessor> {
        let contract: Address = "0x5fbdb2315678afecb367f032d93f642f64180aa3"
            .parse()
            .unwrap();
        let caller = Address([1u8; 20]);
        EncryptionClient::new(Arc::new(MockCoprocessor::new()), contract, caller)
    }

    #[tokio::test]
    async fn in_range_plaintext_encrypts() {
        let input = client().encrypt(25).await.unwrap();
        assert!(!input.handle.is_zero());
        assert!(!input.proof.is_empty());
    }

    #[tokio::test]
    async fn out_of_range_plaintext_is_rejected() {
        let err = client()
            .encrypt_with_width(1 << 32, 32)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FheError::OutOfRange {
                value,
                bit_width: 32
            } if value == 1 << 32
        ));
    }

    #[tokio::test]
    async fn boundary_values() {
        let c = client();
        assert!(c.encrypt_with_width((1 << 32) - 1, 32).await.is_ok());
        assert!(c.encrypt_with_width(0, 32).await.is_ok());
        // Full width: every u64 fits.
        assert!(c.encrypt_with_width(u64::MAX, 64).await.is_ok());
    }
}
