//! Veil client core.
//!
//! Coordinates the actors involved in a private eligibility check: the
//! wallet (signs transactions and decryption grants), the chain (holds
//! the per-account result handle), and the FHE co-processor (encrypts
//! inputs and decrypts results). The [`workflow::WorkflowController`]
//! drives the whole thing as one linear, user-triggered flow.

pub mod authorize;
pub mod chain;
pub mod error;
pub mod fetch;
pub mod signer;
pub mod submit;
pub mod workflow;

pub use authorize::DecryptionAuthorizer;
pub use chain::{ChainClient, ChainError, MockChain, TxHash, TxStatus};
pub use error::WorkflowError;
pub use fetch::ResultFetcher;
pub use signer::{LocalSigner, SignerError, WalletSigner};
pub use submit::{FHE_GAS_LIMIT, PendingTransaction, TransactionSubmitter};
pub use workflow::{WorkflowController, WorkflowState};
