use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use crate::chain::{confirm_batch, ChainClient, ChainError, MockChain};
use crate::chain::abi;
use crate::chain::mock::{MOCK_GAS_PRICE, MOCK_MINT_GAS_USED};
use crate::types::constants::DEFAULT_GAS;
use crate::types::{Account, Address, BatchResult, TransactionDraft, TransactionRecord, TxOutcome};

const TIMEOUT: Duration = Duration::from_secs(1);

/// Log lines captured by a thread-local subscriber
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        let bytes = self.0.lock().map(|buf| buf.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Ok(mut logs) = self.0.lock() {
            logs.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn contract() -> Address {
    "0x2222222222222222222222222222222222222222".parse().unwrap()
}

fn account(byte: u8) -> Account {
    Account::from_bytes(byte as u64, &[byte; 32]).unwrap()
}

fn transfer(from: &Account, to: &Account, value: u128, nonce: u64) -> TransactionDraft {
    TransactionDraft {
        from: from.address,
        to: to.address,
        value,
        gas: DEFAULT_GAS,
        gas_price: MOCK_GAS_PRICE,
        nonce: Some(nonce),
        data: Vec::new(),
        chain_id: 1,
    }
}

/// Tests basic mock ledger behaviour:
/// - a transfer moves value and charges the fee
/// - the nonce advances
/// - the receipt is available right away
#[tokio::test]
async fn test_transfer_and_receipt() {
    println!("\n=== Starting test_transfer_and_receipt ===");
    let chain = MockChain::new(1, contract());
    let alice = account(1);
    let bob = account(2);
    chain.set_balance(alice.address, 1_000_000_000_000_000);

    let hash = chain.build_and_send(&transfer(&alice, &bob, 1000, 0), &alice.wallet).await.unwrap();

    let fee = DEFAULT_GAS as u128 * MOCK_GAS_PRICE;
    assert_eq!(chain.get_balance(&bob.address).await.unwrap(), 1000);
    assert_eq!(chain.balance_of(&alice.address), 1_000_000_000_000_000 - 1000 - fee);
    assert_eq!(chain.get_transaction_count(&alice.address).await.unwrap(), 1);

    let receipt = chain.wait_for_receipt(&hash, TIMEOUT).await.unwrap();
    assert_eq!(receipt.hash, hash);
    assert_eq!(receipt.gas_used, DEFAULT_GAS);
    assert!(receipt.success);
}

/// Tests nonce ordering: low nonces are rejected, high nonces wait until the gap is filled
#[tokio::test]
async fn test_nonce_ordering() {
    println!("\n=== Starting test_nonce_ordering ===");
    let chain = MockChain::new(1, contract());
    let alice = account(1);
    let bob = account(2);
    chain.set_balance(alice.address, 1_000_000_000_000_000);

    let later = chain.build_and_send(&transfer(&alice, &bob, 1, 1), &alice.wallet).await.unwrap();
    assert_eq!(chain.queued_count(), 1);
    assert!(matches!(
        chain.wait_for_receipt(&later, TIMEOUT).await,
        Err(ChainError::Timeout(_, _))
    ));

    chain.build_and_send(&transfer(&alice, &bob, 1, 0), &alice.wallet).await.unwrap();
    assert_eq!(chain.queued_count(), 0);
    assert_eq!(chain.nonce_of(&alice.address), 2);
    assert!(chain.wait_for_receipt(&later, TIMEOUT).await.is_ok());

    let stale = chain.build_and_send(&transfer(&alice, &bob, 1, 0), &alice.wallet).await;
    assert!(matches!(stale, Err(ChainError::Rejected(_))));
}

/// Tests the submission checks: signer, chain ID and funds
#[tokio::test]
async fn test_rejections() {
    println!("\n=== Starting test_rejections ===");
    let chain = MockChain::new(1, contract());
    let alice = account(1);
    let bob = account(2);
    chain.set_balance(alice.address, 1000);

    let wrong_signer = chain.build_and_send(&transfer(&alice, &bob, 1, 0), &bob.wallet).await;
    assert!(matches!(wrong_signer, Err(ChainError::Rejected(_))));

    let mut other_chain = transfer(&alice, &bob, 1, 0);
    other_chain.chain_id = 5;
    assert!(matches!(
        chain.build_and_send(&other_chain, &alice.wallet).await,
        Err(ChainError::Rejected(_))
    ));

    let broke = chain.build_and_send(&transfer(&alice, &bob, 1, 0), &alice.wallet).await;
    assert!(matches!(broke, Err(ChainError::Rejected(_))));
    assert!(chain.transactions().is_empty());
    assert_eq!(chain.nonce_of(&alice.address), 0);
}

/// Tests contract calls: minting is counted and gas estimation reflects the call
#[tokio::test]
async fn test_contract_calls() {
    println!("\n=== Starting test_contract_calls ===");
    let chain = MockChain::new(1, contract());
    chain.set_mint_gas_used(80_000);
    let alice = account(1);
    chain.set_balance(alice.address, 1_000_000_000_000_000_000);

    let draft = TransactionDraft {
        from: alice.address,
        to: contract(),
        value: 5,
        gas: 500_000,
        gas_price: MOCK_GAS_PRICE,
        nonce: Some(0),
        data: abi::encode_call("mint", &[]),
        chain_id: 1,
    };
    assert_eq!(chain.estimate_gas(&draft).await.unwrap(), 80_000);
    let hash = chain.build_and_send(&draft, &alice.wallet).await.unwrap();
    assert_eq!(chain.mints_by(&alice.address), 1);
    assert_eq!(chain.wait_for_receipt(&hash, TIMEOUT).await.unwrap().gas_used, 80_000);
    assert_eq!(chain.balance_of(&contract()), 5);

    chain.revert_simulations(true);
    assert!(matches!(chain.estimate_gas(&draft).await, Err(ChainError::Reverted(_))));
}

/// Every trait call is counted, and an offline chain fails every call
#[tokio::test]
async fn test_network_calls_and_outage() {
    println!("\n=== Starting test_network_calls_and_outage ===");
    let chain = MockChain::new(1, contract());
    let alice = account(1);
    assert_eq!(chain.network_calls(), 0);

    chain.get_gas_price().await.unwrap();
    chain.get_balance(&alice.address).await.unwrap();
    assert_eq!(chain.network_calls(), 2);

    chain.set_unavailable(true);
    assert!(matches!(chain.get_gas_price().await, Err(ChainError::Unavailable(_))));
    assert_eq!(chain.network_calls(), 3);
}

/// Tests that confirming a batch waits on its last submitted transaction only
#[tokio::test]
async fn test_confirm_batch() {
    println!("\n=== Starting test_confirm_batch ===");
    let chain = MockChain::new(1, contract());
    let alice = account(1);
    let bob = account(2);
    chain.set_balance(alice.address, 1_000_000_000_000_000);

    let empty = BatchResult::new();
    let calls = chain.network_calls();
    assert_eq!(confirm_batch(&chain, &empty, TIMEOUT).await.unwrap(), None);
    assert_eq!(chain.network_calls(), calls);

    let hash = chain.build_and_send(&transfer(&alice, &bob, 1, 0), &alice.wallet).await.unwrap();
    let mut batch = BatchResult::new();
    batch.push(bob.address, TxOutcome::Submitted(TransactionRecord {
        sender: alice.address,
        receiver: bob.address,
        value: 1,
        gas: DEFAULT_GAS,
        gas_price: MOCK_GAS_PRICE,
        nonce: 0,
        hash,
    }));
    batch.push(bob.address, TxOutcome::Failed("rejected".to_string()));

    assert_eq!(batch.anchor(), Some(&hash));
    let receipt = confirm_batch(&chain, &batch, TIMEOUT).await.unwrap().expect("No receipt");
    assert_eq!(receipt.hash, hash);

    chain.withhold_receipts(true);
    assert!(matches!(
        confirm_batch(&chain, &batch, TIMEOUT).await,
        Err(ChainError::Timeout(_, _))
    ));
}

/// Tests that a mined but reverted anchor is returned with its failed status and warned about
#[tokio::test]
async fn test_confirm_batch_reverted_anchor() {
    println!("\n=== Starting test_confirm_batch_reverted_anchor ===");
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let chain = MockChain::new(1, contract());
    chain.revert_calls(true);
    let alice = account(1);
    chain.set_balance(alice.address, 1_000_000_000_000_000_000);
    let draft = TransactionDraft {
        from: alice.address,
        to: contract(),
        value: 5,
        gas: 500_000,
        gas_price: MOCK_GAS_PRICE,
        nonce: Some(0),
        data: abi::encode_call("mint", &[]),
        chain_id: 1,
    };

    println!("[TEST]   Submitting a call that reverts...");
    let hash = chain.build_and_send(&draft, &alice.wallet).await.unwrap();
    let mut batch = BatchResult::new();
    batch.push(alice.address, TxOutcome::Submitted(TransactionRecord {
        sender: alice.address,
        receiver: contract(),
        value: 5,
        gas: 500_000,
        gas_price: MOCK_GAS_PRICE,
        nonce: 0,
        hash,
    }));

    let receipt = confirm_batch(&chain, &batch, TIMEOUT).await.unwrap().expect("No receipt");
    assert!(!receipt.success);
    assert_eq!(chain.mints_by(&alice.address), 0);
    assert_eq!(chain.balance_of(&contract()), 0);
    assert_eq!(chain.nonce_of(&alice.address), 1);
    assert_eq!(
        chain.balance_of(&alice.address),
        1_000_000_000_000_000_000 - MOCK_MINT_GAS_USED as u128 * MOCK_GAS_PRICE
    );

    let logs = logs.contents();
    println!("[TEST]   Captured logs: {}", logs.trim());
    assert!(logs.contains("WARN"));
    assert!(logs.contains("reverted"));
}
