//! In-process demo of the full eligibility flow.
//!
//! Wires a mock chain, mock co-processor and local wallet together and
//! drives one submit + decrypt round, printing every observable state
//! transition along the way.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use veil_codec::Address;
use veil_config::VeilConfig;
use veil_coprocessor::MockCoprocessor;
use veil_core::{LocalSigner, MockChain, WalletSigner, WorkflowController, WorkflowState};

pub struct DemoConfig {
    pub age: u64,
    pub poll_interval_ms: u64,
}

pub async fn run_demo(config: DemoConfig) -> Result<()> {
    let veil = VeilConfig::global();
    let contract: Address = veil.contract_address()?;

    println!("🔧 Starting in-process dev stack");
    println!("   contract: {contract}");

    let coprocessor = Arc::new(MockCoprocessor::new());
    let chain = Arc::new(MockChain::new(coprocessor.clone(), contract));
    let signer = Arc::new(LocalSigner::random());
    chain.register_dev_account(signer.address());
    println!("   wallet:   {}", signer.address());

    let controller = WorkflowController::new(
        chain,
        coprocessor,
        signer,
        contract,
        veil.grant.duration_days,
    )
    .with_poll_interval(Duration::from_millis(config.poll_interval_ms));

    let mut states = controller.subscribe();
    let printer = tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = states.borrow_and_update().clone();
            match &state {
                WorkflowState::Encrypting => println!("🔒 Encrypting age..."),
                WorkflowState::Submitting => println!("📤 Submitting transaction..."),
                WorkflowState::PendingConfirmation { tx } => {
                    println!("⏳ Waiting for confirmation of {tx}")
                }
                WorkflowState::Confirmed { handle } => {
                    println!("✅ Confirmed, result handle {handle}")
                }
                WorkflowState::Decrypting { .. } => println!("🔓 Decrypting result..."),
                WorkflowState::Decided { .. } | WorkflowState::Failed { .. } => break,
                WorkflowState::Idle => {}
            }
        }
    });

    println!("🚀 Submitting age {}", config.age);
    controller.submit_age(config.age).await?;
    let eligible = controller.decrypt_result().await?;
    let _ = printer.await;

    if eligible {
        println!("🎉 Eligible: age is 18 or over");
    } else {
        println!("🚫 Not eligible: age is under 18");
    }
    Ok(())
}

/// Deterministic dev wallet seeds, one per funded account.
const DEV_SEEDS: [u8; 5] = [1, 2, 3, 4, 5];

pub fn list_dev_accounts() -> Result<()> {
    let coprocessor = Arc::new(MockCoprocessor::new());
    let contract: Address = VeilConfig::global().contract_address()?;
    let chain = MockChain::new(coprocessor, contract);

    for seed in DEV_SEEDS {
        let signer = LocalSigner::from_seed([seed; 32]);
        chain.register_dev_account(signer.address());
    }

    println!("Dev accounts (in-process chain):");
    for (address, balance_wei) in chain.accounts() {
        let eth = balance_wei / 10u128.pow(18);
        println!("  {address}  {eth} ETH");
    }
    Ok(())
}
