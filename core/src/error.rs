//! Workflow error taxonomy.
//!
//! Every failure is terminal for the current attempt; there are no
//! automatic retries anywhere. Recovery means re-invoking the stage
//! that failed: re-encrypt after a submission or chain failure (an
//! encrypted input is single-use), re-authorize after an authorization
//! failure (a signed grant is a single-attempt artifact).

use thiserror::Error;
use veil_codec::CodecError;
use veil_coprocessor::FheError;

#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Out-of-range or malformed plaintext input.
    #[error("invalid input: {0}")]
    Input(String),

    /// Malformed handle or proof representation.
    #[error("encoding failed: {0}")]
    Encoding(#[from] CodecError),

    /// Signer rejection or network failure before a transaction hash
    /// was produced.
    #[error("submission failed: {0}")]
    Submission(String),

    /// The transaction reverted on-chain.
    #[error("transaction reverted: {0}")]
    Chain(String),

    /// Reading the eligibility handle failed.
    #[error("eligibility read failed: {0}")]
    Fetch(String),

    /// The grant is expired, not yet valid, or does not cover the
    /// contract.
    #[error("decryption authorization failed: {0}")]
    Authorization(String),

    /// Co-processor failure or a handle it does not know.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// A workflow stage is already in flight; commands are only
    /// re-enterable from a terminal state.
    #[error("another workflow stage is in flight")]
    Busy,
}

impl From<FheError> for WorkflowError {
    fn from(err: FheError) -> Self {
        match err {
            FheError::OutOfRange { .. } => WorkflowError::Input(err.to_string()),
            FheError::Authorization(msg) => WorkflowError::Authorization(msg),
            FheError::HandleNotFound | FheError::Backend(_) => {
                WorkflowError::Decryption(err.to_string())
            }
            FheError::Encoding(e) => WorkflowError::Encoding(e),
        }
    }
}
