//! Chain boundary.
//!
//! The eligibility contract exposes exactly two calls: a state-mutating
//! submission taking an encrypted handle plus its input proof, and a
//! per-account read of the 32-byte result handle (zero = nothing
//! computed yet). [`ChainClient`] is that boundary; [`MockChain`] is
//! the in-process dev implementation backed by the mock co-processor.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use veil_codec::{Address, Handle};
use veil_coprocessor::MockCoprocessor;

/// A transaction hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHash(pub [u8; 32]);

impl TxHash {
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self.to_hex())
    }
}

/// Lifecycle of a submitted transaction. `Submitted` is the only
/// non-terminal status; the others are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Submitted,
    Confirmed,
    Reverted,
    Failed,
}

impl TxStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TxStatus::Submitted)
    }
}

#[derive(Debug, Error)]
pub enum ChainError {
    /// The wallet refused to sign, or signing failed before a hash
    /// existed.
    #[error("signer rejected the transaction: {0}")]
    Rejected(String),

    #[error("rpc failure: {0}")]
    Rpc(String),

    #[error("unknown transaction {0}")]
    UnknownTransaction(TxHash),
}

/// The contract boundary consumed by this client.
#[allow(async_fn_in_trait)]
pub trait ChainClient: Send + Sync {
    /// Submit an encrypted eligibility input. No direct return value
    /// on-chain; the result becomes observable via `read_eligibility`
    /// after confirmation.
    async fn submit_eligibility(
        &self,
        from: Address,
        handle: Handle,
        proof: &[u8],
        gas_limit: u64,
    ) -> Result<TxHash, ChainError>;

    /// Current status of a submitted transaction.
    async fn transaction_status(&self, hash: TxHash) -> Result<TxStatus, ChainError>;

    /// Read the per-account result handle. Zero means nothing has been
    /// computed for this account. Read-only and freely repeatable.
    async fn read_eligibility(&self, account: Address) -> Result<Handle, ChainError>;
}

// ============================================================================
// Mock Chain (dev mode / testing)
// ============================================================================

/// Age threshold enforced by the eligibility contract.
const MIN_ELIGIBLE_AGE: u64 = 18;

/// Below this gas the FHE comparison runs out of gas and the call
/// reverts, mirroring real co-processor-backed contracts.
const MIN_FHE_GAS: u64 = 1_000_000;

/// Dev-account seed balance: 10 000 ETH in wei.
const DEV_BALANCE_WEI: u128 = 10_000 * 10u128.pow(18);

struct MockTx {
    from: Address,
    handle: Handle,
    /// Status polls remaining before the transaction leaves the pool.
    polls_left: u32,
    will_revert: bool,
    outcome: Option<TxStatus>,
}

/// In-process chain holding the eligibility contract's state.
///
/// Submissions verify the input proof and, at confirmation time, run
/// the encrypted `age >= 18` comparison through the co-processor,
/// storing the boolean result handle under the sender's account. A
/// configurable number of `Submitted` polls precedes confirmation so
/// the pending stage is always observable.
pub struct MockChain {
    coprocessor: Arc<MockCoprocessor>,
    contract: Address,
    confirm_after_polls: u32,
    txs: Mutex<HashMap<TxHash, MockTx>>,
    results: Mutex<HashMap<Address, Handle>>,
    balances: Mutex<HashMap<Address, u128>>,
    reject_next: AtomicBool,
    revert_next: AtomicBool,
    tx_counter: AtomicU64,
    reads: AtomicU64,
}

impl MockChain {
    pub fn new(coprocessor: Arc<MockCoprocessor>, contract: Address) -> Self {
        Self {
            coprocessor,
            contract,
            confirm_after_polls: 2,
            txs: Mutex::new(HashMap::new()),
            results: Mutex::new(HashMap::new()),
            balances: Mutex::new(HashMap::new()),
            reject_next: AtomicBool::new(false),
            revert_next: AtomicBool::new(false),
            tx_counter: AtomicU64::new(0),
            reads: AtomicU64::new(0),
        }
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Make the next submission fail as if the wallet declined to sign.
    pub fn reject_next_submission(&self) {
        self.reject_next.store(true, Ordering::SeqCst);
    }

    /// Make the next submission revert on-chain regardless of its
    /// proof, as when no co-processor node is reachable.
    pub fn revert_next_submission(&self) {
        self.revert_next.store(true, Ordering::SeqCst);
    }

    /// How many `read_eligibility` calls have been served.
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Seed a dev account with test funds.
    pub fn register_dev_account(&self, account: Address) {
        self.balances
            .lock()
            .expect("balances lock")
            .insert(account, DEV_BALANCE_WEI);
    }

    /// Registered dev accounts with balances in wei.
    pub fn accounts(&self) -> Vec<(Address, u128)> {
        let balances = self.balances.lock().expect("balances lock");
        let mut out: Vec<_> = balances.iter().map(|(a, b)| (*a, *b)).collect();
        out.sort_by_key(|(a, _)| *a.as_bytes());
        out
    }

    fn next_hash(&self, from: Address, handle: Handle, proof: &[u8]) -> TxHash {
        let counter = self.tx_counter.fetch_add(1, Ordering::Relaxed);
        let mut hasher = blake3::Hasher::new();
        hasher.update(&counter.to_le_bytes());
        hasher.update(from.as_bytes());
        hasher.update(handle.as_bytes());
        hasher.update(proof);
        TxHash(*hasher.finalize().as_bytes())
    }

    /// Execute the contract call for a confirmed transaction: run the
    /// encrypted comparison and store the result handle.
    fn apply(&self, from: Address, handle: Handle) -> TxStatus {
        match self
            .coprocessor
            .eval_ge(handle, MIN_ELIGIBLE_AGE, self.contract, from)
        {
            Ok(result) => {
                self.results.lock().expect("results lock").insert(from, result);
                TxStatus::Confirmed
            }
            Err(e) => {
                tracing::warn!("eligibility evaluation failed, reverting: {e}");
                TxStatus::Reverted
            }
        }
    }
}

impl ChainClient for MockChain {
    async fn submit_eligibility(
        &self,
        from: Address,
        handle: Handle,
        proof: &[u8],
        gas_limit: u64,
    ) -> Result<TxHash, ChainError> {
        if self.reject_next.swap(false, Ordering::SeqCst) {
            return Err(ChainError::Rejected("user denied transaction signature".into()));
        }

        let will_revert = self.revert_next.swap(false, Ordering::SeqCst)
            || gas_limit < MIN_FHE_GAS
            || !self
                .coprocessor
                .verify_input_proof(handle, proof, self.contract, from);

        let hash = self.next_hash(from, handle, proof);
        self.txs.lock().expect("txs lock").insert(
            hash,
            MockTx {
                from,
                handle,
                polls_left: self.confirm_after_polls,
                will_revert,
                outcome: None,
            },
        );
        Ok(hash)
    }

    async fn transaction_status(&self, hash: TxHash) -> Result<TxStatus, ChainError> {
        let mut txs = self.txs.lock().expect("txs lock");
        let tx = txs
            .get_mut(&hash)
            .ok_or(ChainError::UnknownTransaction(hash))?;

        if let Some(outcome) = tx.outcome {
            return Ok(outcome);
        }
        if tx.polls_left > 0 {
            tx.polls_left -= 1;
            return Ok(TxStatus::Submitted);
        }

        let outcome = if tx.will_revert {
            TxStatus::Reverted
        } else {
            self.apply(tx.from, tx.handle)
        };
        tx.outcome = Some(outcome);
        Ok(outcome)
    }

    async fn read_eligibility(&self, account: Address) -> Result<Handle, ChainError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let results = self.results.lock().expect("results lock");
        Ok(results.get(&account).copied().unwrap_or(Handle::ZERO))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_coprocessor::Coprocessor;

    fn setup() -> (Arc<MockCoprocessor>, MockChain, Address) {
        let coprocessor = Arc::new(MockCoprocessor::new());
        let contract = Address([0xc0; 20]);
        let chain = MockChain::new(coprocessor.clone(), contract);
        (coprocessor, chain, Address([0x01; 20]))
    }

    async fn encrypted(
        coprocessor: &MockCoprocessor,
        contract: Address,
        account: Address,
        value: u64,
    ) -> (Handle, Vec<u8>) {
        let raw = coprocessor.encrypt(contract, account, value, 32).await.unwrap();
        (Handle::normalize(raw.handle).unwrap(), raw.proof)
    }

    async fn drive_to_terminal(chain: &MockChain, hash: TxHash) -> TxStatus {
        loop {
            let status = chain.transaction_status(hash).await.unwrap();
            if status.is_terminal() {
                return status;
            }
        }
    }

    #[tokio::test]
    async fn confirmation_is_never_immediate() {
        let (coprocessor, chain, account) = setup();
        let (handle, proof) = encrypted(&coprocessor, chain.contract(), account, 25).await;

        let hash = chain
            .submit_eligibility(account, handle, &proof, 10_000_000)
            .await
            .unwrap();
        // The first poll always sees the transaction pending.
        assert_eq!(
            chain.transaction_status(hash).await.unwrap(),
            TxStatus::Submitted
        );
        assert_eq!(drive_to_terminal(&chain, hash).await, TxStatus::Confirmed);
    }

    #[tokio::test]
    async fn bad_proof_reverts() {
        let (coprocessor, chain, account) = setup();
        let (handle, mut proof) = encrypted(&coprocessor, chain.contract(), account, 25).await;
        proof[0] ^= 0x01;

        let hash = chain
            .submit_eligibility(account, handle, &proof, 10_000_000)
            .await
            .unwrap();
        assert_eq!(drive_to_terminal(&chain, hash).await, TxStatus::Reverted);
        // A reverted submission writes no result.
        assert!(chain.read_eligibility(account).await.unwrap().is_zero());
    }

    #[tokio::test]
    async fn insufficient_gas_reverts() {
        let (coprocessor, chain, account) = setup();
        let (handle, proof) = encrypted(&coprocessor, chain.contract(), account, 25).await;

        let hash = chain
            .submit_eligibility(account, handle, &proof, 21_000)
            .await
            .unwrap();
        assert_eq!(drive_to_terminal(&chain, hash).await, TxStatus::Reverted);
    }

    #[tokio::test]
    async fn terminal_status_is_stable() {
        let (coprocessor, chain, account) = setup();
        let (handle, proof) = encrypted(&coprocessor, chain.contract(), account, 25).await;

        let hash = chain
            .submit_eligibility(account, handle, &proof, 10_000_000)
            .await
            .unwrap();
        assert_eq!(drive_to_terminal(&chain, hash).await, TxStatus::Confirmed);
        assert_eq!(
            chain.transaction_status(hash).await.unwrap(),
            TxStatus::Confirmed
        );
    }

    #[tokio::test]
    async fn unknown_transaction_is_an_error() {
        let (_, chain, _) = setup();
        assert!(matches!(
            chain.transaction_status(TxHash([9u8; 32])).await,
            Err(ChainError::UnknownTransaction(_))
        ));
    }
}
