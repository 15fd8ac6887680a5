//! Transaction submission and confirmation tracking.

use std::sync::Arc;
use std::time::Duration;

use veil_codec::Address;
use veil_coprocessor::EncryptedInput;

use crate::chain::{ChainClient, ChainError, TxHash, TxStatus};
use crate::error::WorkflowError;

/// Gas limit for the eligibility submission. FHE operations are far
/// heavier than plain contract calls, so the default estimate is not
/// usable here.
pub const FHE_GAS_LIMIT: u64 = 10_000_000;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// A submitted transaction and its last observed status.
#[derive(Debug, Clone, Copy)]
pub struct PendingTransaction {
    pub hash: TxHash,
    pub status: TxStatus,
}

/// Sends the encrypted input on-chain and polls it to a terminal
/// status.
pub struct TransactionSubmitter<C> {
    chain: Arc<C>,
    contract: Address,
    gas_limit: u64,
    poll_interval: Duration,
}

impl<C: ChainClient> TransactionSubmitter<C> {
    pub fn new(chain: Arc<C>, contract: Address) -> Self {
        Self {
            chain,
            contract,
            gas_limit: FHE_GAS_LIMIT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Submit the encrypted input. Takes the input by value: a
    /// handle/proof pair is accepted on-chain at most once, so after
    /// submission it must not be reused.
    pub async fn submit(
        &self,
        from: Address,
        input: EncryptedInput,
    ) -> Result<PendingTransaction, WorkflowError> {
        let hash = self
            .chain
            .submit_eligibility(from, input.handle, &input.proof, self.gas_limit)
            .await
            .map_err(|e| match e {
                ChainError::Rejected(msg) => WorkflowError::Submission(msg),
                other => WorkflowError::Submission(other.to_string()),
            })?;

        tracing::info!(tx = %hash, "eligibility transaction submitted");
        Ok(PendingTransaction {
            hash,
            status: TxStatus::Submitted,
        })
    }

    /// Poll the transaction until it reaches a terminal status,
    /// updating `tx.status` on every observation. A revert surfaces as
    /// [`WorkflowError::Chain`].
    pub async fn track(&self, tx: &mut PendingTransaction) -> Result<(), WorkflowError> {
        loop {
            let status = self
                .chain
                .transaction_status(tx.hash)
                .await
                .map_err(|e| WorkflowError::Chain(e.to_string()))?;
            tx.status = status;

            match status {
                TxStatus::Submitted => {
                    tokio::time::sleep(self.poll_interval).await;
                }
                TxStatus::Confirmed => {
                    tracing::info!(tx = %tx.hash, "transaction confirmed");
                    return Ok(());
                }
                TxStatus::Reverted => {
                    return Err(WorkflowError::Chain(format!(
                        "transaction {} reverted",
                        tx.hash
                    )));
                }
                TxStatus::Failed => {
                    return Err(WorkflowError::Chain(format!(
                        "transaction {} failed",
                        tx.hash
                    )));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_coprocessor::{Coprocessor, MockCoprocessor};

    use crate::chain::MockChain;
    use veil_codec::Handle;

    async fn input(
        coprocessor: &MockCoprocessor,
        contract: Address,
        account: Address,
        value: u64,
    ) -> EncryptedInput {
        let raw = coprocessor.encrypt(contract, account, value, 32).await.unwrap();
        EncryptedInput {
            handle: Handle::normalize(raw.handle).unwrap(),
            proof: raw.proof,
        }
    }

    #[tokio::test]
    async fn submit_reports_pending_then_track_confirms() {
        let coprocessor = Arc::new(MockCoprocessor::new());
        let contract = Address([0xc0; 20]);
        let account = Address([0x01; 20]);
        let chain = Arc::new(MockChain::new(coprocessor.clone(), contract));
        let submitter = TransactionSubmitter::new(chain, contract)
            .with_poll_interval(Duration::from_millis(1));

        let input = input(&coprocessor, contract, account, 30).await;
        let mut tx = submitter.submit(account, input).await.unwrap();
        // Submission never reports confirmation by itself.
        assert_eq!(tx.status, TxStatus::Submitted);

        submitter.track(&mut tx).await.unwrap();
        assert_eq!(tx.status, TxStatus::Confirmed);
    }

    #[tokio::test]
    async fn rejection_surfaces_as_submission_error() {
        let coprocessor = Arc::new(MockCoprocessor::new());
        let contract = Address([0xc0; 20]);
        let account = Address([0x01; 20]);
        let chain = Arc::new(MockChain::new(coprocessor.clone(), contract));
        chain.reject_next_submission();
        let submitter = TransactionSubmitter::new(chain, contract);

        let input = input(&coprocessor, contract, account, 30).await;
        let err = submitter.submit(account, input).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Submission(_)));
    }

    #[tokio::test]
    async fn revert_surfaces_as_chain_error() {
        let coprocessor = Arc::new(MockCoprocessor::new());
        let contract = Address([0xc0; 20]);
        let account = Address([0x01; 20]);
        let chain = Arc::new(MockChain::new(coprocessor.clone(), contract));
        chain.revert_next_submission();
        let submitter = TransactionSubmitter::new(chain, contract)
            .with_poll_interval(Duration::from_millis(1));

        let input = input(&coprocessor, contract, account, 30).await;
        let mut tx = submitter.submit(account, input).await.unwrap();
        let err = submitter.track(&mut tx).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Chain(_)));
        assert_eq!(tx.status, TxStatus::Reverted);
    }
}
