//! Result handle retrieval.

use std::sync::Arc;

use veil_codec::{Address, Handle};

use crate::chain::ChainClient;
use crate::error::WorkflowError;

/// Reads the per-account eligibility result handle from the contract.
///
/// The read is free and repeatable; a zero handle means no result has
/// been computed for the account yet.
pub struct ResultFetcher<C> {
    chain: Arc<C>,
}

impl<C: ChainClient> ResultFetcher<C> {
    pub fn new(chain: Arc<C>) -> Self {
        Self { chain }
    }

    pub async fn fetch(&self, account: Address) -> Result<Handle, WorkflowError> {
        let handle = self
            .chain
            .read_eligibility(account)
            .await
            .map_err(|e| WorkflowError::Fetch(e.to_string()))?;
        tracing::debug!(account = %account, handle = %handle, "fetched result handle");
        Ok(handle)
    }
}
