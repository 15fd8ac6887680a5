//! Exchanging a handle plus a signed grant for a plaintext boolean.

use std::sync::Arc;

use veil_codec::{Address, Handle};

use crate::grant::{SignedGrant, unix_timestamp};
use crate::keypair::DecryptionKeypair;
use crate::{Coprocessor, FheError, HandleRequest, UserDecryptRequest};

/// Client-side decryption front end for a single user account.
pub struct DecryptionClient<P> {
    coprocessor: Arc<P>,
    account: Address,
}

impl<P: Coprocessor> DecryptionClient<P> {
    pub fn new(coprocessor: Arc<P>, account: Address) -> Self {
        Self {
            coprocessor,
            account,
        }
    }

    /// Decrypt one result handle into a boolean.
    ///
    /// The zero sentinel and an invalid grant are rejected before any
    /// co-processor contact.
    pub async fn decrypt(
        &self,
        handle: Handle,
        contract: Address,
        keypair: &DecryptionKeypair,
        grant: &SignedGrant,
    ) -> Result<bool, FheError> {
        if handle.is_zero() {
            return Err(FheError::HandleNotFound);
        }
        grant.ensure_valid(&contract, unix_timestamp())?;

        let request = UserDecryptRequest {
            requests: vec![HandleRequest { handle, contract }],
            private_key: keypair.secret_bytes(),
            public_key: keypair.public_key(),
            grant: grant.clone(),
            account: self.account,
        };

        let mut values = self.coprocessor.user_decrypt(request).await?;
        let value = values
            .remove(&handle)
            .ok_or_else(|| FheError::Backend("co-processor returned no value for handle".into()))?;
        Ok(value != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grant::{AuthorizationGrant, SECONDS_PER_DAY};
    use crate::mock::MockCoprocessor;
    use ed25519_dalek::{Signer, SigningKey};

    fn contract() -> Address {
        "0x5fbdb2315678afecb367f032d93f642f64180aa3".parse().unwrap()
    }

    fn signed_grant(key: &SigningKey, keypair: &DecryptionKeypair, start: u64) -> SignedGrant {
        let grant = AuthorizationGrant {
            public_key: keypair.public_key(),
            contracts: vec![contract()],
            start_timestamp: start,
            duration_days: 10,
        };
        let signature = key.sign(&grant.digest()).to_bytes();
        SignedGrant {
            grant,
            signer: key.verifying_key().to_bytes(),
            signature,
        }
    }

    #[tokio::test]
    async fn zero_sentinel_fails_without_coprocessor_contact() {
        let coprocessor = Arc::new(MockCoprocessor::new());
        let wallet = SigningKey::from_bytes(&[5u8; 32]);
        let account = Address::from_public_key(&wallet.verifying_key().to_bytes());
        let client = DecryptionClient::new(coprocessor.clone(), account);

        let keypair = DecryptionKeypair::generate();
        let grant = signed_grant(&wallet, &keypair, unix_timestamp());

        let err = client
            .decrypt(Handle::ZERO, contract(), &keypair, &grant)
            .await
            .unwrap_err();
        assert!(matches!(err, FheError::HandleNotFound));
        assert_eq!(coprocessor.decrypt_calls(), 0);
    }

    #[tokio::test]
    async fn expired_grant_fails_without_coprocessor_contact() {
        let coprocessor = Arc::new(MockCoprocessor::new());
        let wallet = SigningKey::from_bytes(&[5u8; 32]);
        let account = Address::from_public_key(&wallet.verifying_key().to_bytes());
        let client = DecryptionClient::new(coprocessor.clone(), account);

        let keypair = DecryptionKeypair::generate();
        // Window ended long before now.
        let start = unix_timestamp() - 11 * SECONDS_PER_DAY;
        let grant = signed_grant(&wallet, &keypair, start);

        let handle = Handle::from_bytes(&[1u8]).unwrap();
        let err = client
            .decrypt(handle, contract(), &keypair, &grant)
            .await
            .unwrap_err();
        assert!(matches!(err, FheError::Authorization(_)));
        assert_eq!(coprocessor.decrypt_calls(), 0);
    }
}
