//! The end-to-end eligibility workflow.
//!
//! One controller per account/contract pair drives the linear flow:
//! encrypt the age, submit it, track the transaction, fetch the result
//! handle, then (on a separate user command) authorize and decrypt.
//! State transitions are published through a watch channel so a UI can
//! render progress without polling the controller.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use veil_codec::{Address, Handle};
use veil_coprocessor::{
    Coprocessor, DecryptionClient, DecryptionKeypair, EncryptionClient, unix_timestamp,
};

use crate::authorize::DecryptionAuthorizer;
use crate::chain::{ChainClient, TxHash};
use crate::error::WorkflowError;
use crate::fetch::ResultFetcher;
use crate::signer::WalletSigner;
use crate::submit::TransactionSubmitter;

/// Oldest verifiable age accepted as input.
const MAX_AGE: u64 = 120;

/// Observable workflow state. `Idle`, `Confirmed`, `Decided` and
/// `Failed` are terminal: commands are only accepted from them.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowState {
    Idle,
    Encrypting,
    Submitting,
    PendingConfirmation { tx: TxHash },
    Confirmed { handle: Handle },
    Decrypting { handle: Handle },
    Decided { eligible: bool },
    Failed { message: String },
}

impl WorkflowState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowState::Idle
                | WorkflowState::Confirmed { .. }
                | WorkflowState::Decided { .. }
                | WorkflowState::Failed { .. }
        )
    }
}

/// Drives the eligibility flow for one account against one contract.
///
/// Commands are user-triggered and strictly sequential; a command
/// issued while a previous one is still in flight is refused with
/// [`WorkflowError::Busy`] rather than queued.
pub struct WorkflowController<C, P, S> {
    account: Address,
    contract: Address,
    grant_duration_days: u64,
    encryption: EncryptionClient<P>,
    decryption: DecryptionClient<P>,
    submitter: TransactionSubmitter<C>,
    fetcher: ResultFetcher<C>,
    authorizer: DecryptionAuthorizer<S>,
    /// Latest result handle fetched from the chain. Zero until a
    /// submission confirms.
    result_handle: Mutex<Handle>,
    state: watch::Sender<WorkflowState>,
}

impl<C, P, S> WorkflowController<C, P, S>
where
    C: ChainClient,
    P: Coprocessor,
    S: WalletSigner,
{
    pub fn new(
        chain: Arc<C>,
        coprocessor: Arc<P>,
        signer: Arc<S>,
        contract: Address,
        grant_duration_days: u64,
    ) -> Self {
        let account = signer.address();
        let (state, _) = watch::channel(WorkflowState::Idle);
        Self {
            account,
            contract,
            grant_duration_days,
            encryption: EncryptionClient::new(coprocessor.clone(), contract, account),
            decryption: DecryptionClient::new(coprocessor, account),
            submitter: TransactionSubmitter::new(chain.clone(), contract),
            fetcher: ResultFetcher::new(chain),
            authorizer: DecryptionAuthorizer::new(signer),
            result_handle: Mutex::new(Handle::ZERO),
            state,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.submitter = self.submitter.with_poll_interval(interval);
        self
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Subscribe to state transitions.
    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.state.subscribe()
    }

    /// Current state snapshot.
    pub fn state(&self) -> WorkflowState {
        self.state.borrow().clone()
    }

    fn set(&self, state: WorkflowState) {
        tracing::debug!(?state, "workflow transition");
        self.state.send_replace(state);
    }

    fn fail(&self, err: WorkflowError) -> WorkflowError {
        self.set(WorkflowState::Failed {
            message: err.to_string(),
        });
        err
    }

    fn ensure_idle(&self) -> Result<(), WorkflowError> {
        if self.state.borrow().is_terminal() {
            Ok(())
        } else {
            Err(WorkflowError::Busy)
        }
    }

    fn stored_handle(&self) -> Handle {
        *self.result_handle.lock().expect("handle lock")
    }

    fn store_handle(&self, handle: Handle) {
        *self.result_handle.lock().expect("handle lock") = handle;
    }

    /// Encrypt an age, submit it on-chain, wait for confirmation and
    /// fetch the resulting handle.
    ///
    /// Any failure is terminal for this attempt: the encrypted input is
    /// single-use, so retrying means starting over from encryption.
    pub async fn submit_age(&self, age: u64) -> Result<Handle, WorkflowError> {
        self.ensure_idle()?;
        if age > MAX_AGE {
            return Err(WorkflowError::Input(format!(
                "age {age} is outside 0..={MAX_AGE}"
            )));
        }

        self.set(WorkflowState::Encrypting);
        let input = match self.encryption.encrypt(age).await {
            Ok(input) => input,
            Err(e) => return Err(self.fail(e.into())),
        };

        self.set(WorkflowState::Submitting);
        let mut tx = match self.submitter.submit(self.account, input).await {
            Ok(tx) => tx,
            Err(e) => return Err(self.fail(e)),
        };

        self.set(WorkflowState::PendingConfirmation { tx: tx.hash });
        if let Err(e) = self.submitter.track(&mut tx).await {
            return Err(self.fail(e));
        }

        let handle = match self.fetcher.fetch(self.account).await {
            Ok(handle) => handle,
            Err(e) => return Err(self.fail(e)),
        };

        self.store_handle(handle);
        self.set(WorkflowState::Confirmed { handle });
        tracing::info!(handle = %handle, "eligibility result available");
        Ok(handle)
    }

    /// Authorize and decrypt the stored result handle.
    ///
    /// Generates a fresh ephemeral keypair and asks the wallet to sign
    /// a grant for it; the signed grant is used for this one attempt
    /// and dropped.
    pub async fn decrypt_result(&self) -> Result<bool, WorkflowError> {
        self.ensure_idle()?;
        let handle = self.stored_handle();
        if handle.is_zero() {
            return Err(WorkflowError::Decryption(
                "no eligibility result to decrypt".into(),
            ));
        }

        self.set(WorkflowState::Decrypting { handle });

        let keypair = DecryptionKeypair::generate();
        let grant = self.authorizer.build_grant(
            &keypair,
            vec![self.contract],
            unix_timestamp(),
            self.grant_duration_days,
        );
        let signed = match self.authorizer.request_signature(grant).await {
            Ok(signed) => signed,
            Err(e) => return Err(self.fail(e)),
        };

        let eligible = match self
            .decryption
            .decrypt(handle, self.contract, &keypair, &signed)
            .await
        {
            Ok(eligible) => eligible,
            Err(e) => return Err(self.fail(e.into())),
        };

        self.set(WorkflowState::Decided { eligible });
        tracing::info!(eligible, "eligibility decided");
        Ok(eligible)
    }

    /// Re-read the result handle from the chain, e.g. after reopening
    /// the client with a result already on-chain.
    pub async fn refresh_handle(&self) -> Result<Handle, WorkflowError> {
        self.ensure_idle()?;
        let handle = self.fetcher.fetch(self.account).await?;
        self.store_handle(handle);
        if !handle.is_zero() {
            self.set(WorkflowState::Confirmed { handle });
        }
        Ok(handle)
    }
}
