//! Decryption grant construction and wallet authorization.

use std::sync::Arc;

use veil_codec::Address;
use veil_coprocessor::{AuthorizationGrant, DecryptionKeypair, SignedGrant};

use crate::error::WorkflowError;
use crate::signer::{SignerError, WalletSigner};

/// Builds decryption grants and collects the wallet signature over
/// their digest.
pub struct DecryptionAuthorizer<S> {
    signer: Arc<S>,
}

impl<S: WalletSigner> DecryptionAuthorizer<S> {
    pub fn new(signer: Arc<S>) -> Self {
        Self { signer }
    }

    /// Assemble an unsigned grant binding the ephemeral decryption key
    /// to the contract set and validity window.
    pub fn build_grant(
        &self,
        keypair: &DecryptionKeypair,
        contracts: Vec<Address>,
        start_timestamp: u64,
        duration_days: u64,
    ) -> AuthorizationGrant {
        AuthorizationGrant {
            public_key: keypair.public_key(),
            contracts,
            start_timestamp,
            duration_days,
        }
    }

    /// Ask the wallet to sign the grant digest. Waits for as long as
    /// the user takes to respond; a declined prompt surfaces as
    /// [`WorkflowError::Authorization`].
    pub async fn request_signature(
        &self,
        grant: AuthorizationGrant,
    ) -> Result<SignedGrant, WorkflowError> {
        let digest = grant.digest();
        let signature = self
            .signer
            .sign_typed_data(&digest)
            .await
            .map_err(|e| match e {
                SignerError::Rejected => {
                    WorkflowError::Authorization("user declined the grant signature".into())
                }
                other => WorkflowError::Authorization(other.to_string()),
            })?;

        Ok(SignedGrant {
            grant,
            signer: self.signer.public_key(),
            signature,
        })
    }
}
