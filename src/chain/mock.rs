use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use async_trait::async_trait;
use ethers::signers::LocalWallet;
use crate::types::constants::DEFAULT_GAS;
use crate::types::{Address, Receipt, TransactionDraft, TransactionRecord, TxHash};
use super::{abi, sign_draft, ChainClient, ChainError};

/// Gas a mock mint call consumes unless configured otherwise
pub const MOCK_MINT_GAS_USED: u64 = 100_000;

/// Default gas price of the mock chain: 1 gwei
pub const MOCK_GAS_PRICE: u128 = 1_000_000_000;

/// The internal state of the MockChain
struct MockState {
    gas_price: u128,
    balances: HashMap<Address, u128>,
    /// Next expected nonce per sender
    nonces: HashMap<Address, u64>,
    /// Accepted transactions waiting for a nonce gap to be filled
    queued: HashMap<Address, BTreeMap<u64, (TransactionDraft, TxHash)>>,
    receipts: HashMap<TxHash, Receipt>,
    /// Executed transactions in execution order
    executed: Vec<TransactionRecord>,
    mint_gas_used: u64,
    mints: HashMap<Address, u64>,
    call_results: HashMap<[u8; 4], Vec<u8>>,
    block_number: u64,
    network_calls: usize,
    failing_submissions: usize,
    failing_senders: HashSet<Address>,
    withhold_receipts: bool,
    revert_simulations: bool,
    revert_calls: bool,
    failing_nonce_reads: bool,
    unavailable: bool,
}

/// An in-memory chain with a single payable contract.
///
/// - Transfers cost `DEFAULT_GAS * gas_price`, calls into the contract cost `mint_gas_used * gas_price`.
/// - A transaction with the sender's next nonce executes immediately.
/// - A transaction with a higher nonce is queued and gets no receipt until the gap is filled.
/// - A transaction with a lower nonce, or without funds for value and gas, is rejected.
/// - With `revert_calls`, contract calls are mined with a failed status.
pub struct MockChain {
    chain_id: u64,
    contract: Address,
    state: Mutex<MockState>,
}

impl MockChain {
    /// Create a mock chain whose contract lives at `contract`
    pub fn new(chain_id: u64, contract: Address) -> Self {
        Self {
            chain_id,
            contract,
            state: Mutex::new(MockState {
                gas_price: MOCK_GAS_PRICE,
                balances: HashMap::new(),
                nonces: HashMap::new(),
                queued: HashMap::new(),
                receipts: HashMap::new(),
                executed: Vec::new(),
                mint_gas_used: MOCK_MINT_GAS_USED,
                mints: HashMap::new(),
                call_results: HashMap::new(),
                block_number: 0,
                network_calls: 0,
                failing_submissions: 0,
                failing_senders: HashSet::new(),
                withhold_receipts: false,
                revert_simulations: false,
                revert_calls: false,
                failing_nonce_reads: false,
                unavailable: false,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Count a network call and fail if the chain is switched off
    fn touch(&self) -> Result<MutexGuard<'_, MockState>, ChainError> {
        let mut state = self.state();
        state.network_calls += 1;
        if state.unavailable {
            return Err(ChainError::Unavailable("mock chain is offline".to_string()));
        }
        Ok(state)
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn set_balance(&self, address: Address, balance: u128) {
        self.state().balances.insert(address, balance);
    }

    pub fn balance_of(&self, address: &Address) -> u128 {
        self.state().balances.get(address).copied().unwrap_or(0)
    }

    pub fn nonce_of(&self, address: &Address) -> u64 {
        self.state().nonces.get(address).copied().unwrap_or(0)
    }

    pub fn set_gas_price(&self, gas_price: u128) {
        self.state().gas_price = gas_price;
    }

    pub fn set_mint_gas_used(&self, gas: u64) {
        self.state().mint_gas_used = gas;
    }

    /// Fix the result of a read-only call to `function()`
    pub fn set_call_result(&self, function: &str, result: Vec<u8>) {
        let selector = abi::selector(function, &[]);
        self.state().call_results.insert(selector, result);
    }

    /// Reject the next `count` submissions, whoever sends them
    pub fn fail_next_submissions(&self, count: usize) {
        self.state().failing_submissions = count;
    }

    /// Reject every submission from `address`
    pub fn fail_sender(&self, address: Address) {
        self.state().failing_senders.insert(address);
    }

    /// Never hand out receipts
    pub fn withhold_receipts(&self, withhold: bool) {
        self.state().withhold_receipts = withhold;
    }

    /// Make every gas estimation revert
    pub fn revert_simulations(&self, revert: bool) {
        self.state().revert_simulations = revert;
    }

    /// Mine contract calls as reverted: the fee is charged, the value stays with the sender
    pub fn revert_calls(&self, revert: bool) {
        self.state().revert_calls = revert;
    }

    /// Make nonce reads fail as if the node were unreachable, leaving other calls working
    pub fn fail_nonce_reads(&self, fail: bool) {
        self.state().failing_nonce_reads = fail;
    }

    /// Make every call fail as if the node were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    /// Executed transactions in execution order
    pub fn transactions(&self) -> Vec<TransactionRecord> {
        self.state().executed.clone()
    }

    pub fn transactions_from(&self, address: &Address) -> Vec<TransactionRecord> {
        self.state()
            .executed
            .iter()
            .filter(|tx| tx.sender == *address)
            .cloned()
            .collect()
    }

    /// Transactions accepted but stuck behind a nonce gap
    pub fn queued_count(&self) -> usize {
        self.state().queued.values().map(BTreeMap::len).sum()
    }

    pub fn mints_by(&self, address: &Address) -> u64 {
        self.state().mints.get(address).copied().unwrap_or(0)
    }

    pub fn total_mints(&self) -> u64 {
        self.state().mints.values().sum()
    }

    /// Number of trait calls made so far
    pub fn network_calls(&self) -> usize {
        self.state().network_calls
    }

    fn gas_used(&self, state: &MockState, draft: &TransactionDraft) -> u64 {
        if draft.to == self.contract && !draft.data.is_empty() {
            state.mint_gas_used
        } else {
            DEFAULT_GAS
        }
    }

    /// Apply a transaction whose nonce is the sender's next one
    fn execute(&self, state: &mut MockState, draft: &TransactionDraft, hash: &TxHash) -> Result<(), ChainError> {
        let nonce = draft.nonce.unwrap_or_default();
        let gas_used = self.gas_used(state, draft);
        let fee = gas_used as u128 * draft.gas_price;
        let cost = draft.value.checked_add(fee)
            .ok_or_else(|| ChainError::Rejected("value overflow".to_string()))?;
        let balance = state.balances.get(&draft.from).copied().unwrap_or(0);
        if balance < cost {
            return Err(ChainError::Rejected(format!(
                "insufficient funds for gas * price + value: balance {}, cost {}",
                balance, cost
            )));
        }

        let is_call = draft.to == self.contract && !draft.data.is_empty();
        let success = !(is_call && state.revert_calls);
        if success {
            state.balances.insert(draft.from, balance - cost);
            *state.balances.entry(draft.to).or_insert(0) += draft.value;
            if is_call {
                *state.mints.entry(draft.from).or_insert(0) += 1;
            }
        } else {
            state.balances.insert(draft.from, balance - fee);
        }
        state.nonces.insert(draft.from, nonce + 1);
        state.block_number += 1;
        state.receipts.insert(*hash, Receipt {
            hash: *hash,
            block_number: state.block_number,
            gas_used,
            success,
        });
        state.executed.push(TransactionRecord {
            sender: draft.from,
            receiver: draft.to,
            value: draft.value,
            gas: draft.gas,
            gas_price: draft.gas_price,
            nonce,
            hash: *hash,
        });
        Ok(())
    }

    /// Execute queued transactions of `sender` that are no longer blocked by a gap
    fn drain_queue(&self, state: &mut MockState, sender: &Address) {
        loop {
            let next = state.nonces.get(sender).copied().unwrap_or(0);
            let Some((draft, hash)) = state.queued.get_mut(sender).and_then(|queue| queue.remove(&next)) else {
                return;
            };
            if self.execute(state, &draft, &hash).is_err() {
                return;
            }
        }
    }
}

#[async_trait]
impl ChainClient for MockChain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn get_balance(&self, address: &Address) -> Result<u128, ChainError> {
        let state = self.touch()?;
        Ok(state.balances.get(address).copied().unwrap_or(0))
    }

    async fn get_transaction_count(&self, address: &Address) -> Result<u64, ChainError> {
        let state = self.touch()?;
        if state.failing_nonce_reads {
            return Err(ChainError::Unavailable("mock nonce read failed".to_string()));
        }
        Ok(state.nonces.get(address).copied().unwrap_or(0))
    }

    async fn get_gas_price(&self) -> Result<u128, ChainError> {
        let state = self.touch()?;
        Ok(state.gas_price)
    }

    async fn estimate_gas(&self, draft: &TransactionDraft) -> Result<u64, ChainError> {
        let state = self.touch()?;
        if state.revert_simulations {
            return Err(ChainError::Reverted("mock simulation reverted".to_string()));
        }
        Ok(self.gas_used(&state, draft))
    }

    async fn call(&self, contract: &Address, data: &[u8]) -> Result<Vec<u8>, ChainError> {
        let state = self.touch()?;
        if *contract != self.contract || data.len() < 4 {
            return Err(ChainError::Reverted("no such contract function".to_string()));
        }
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&data[..4]);
        state
            .call_results
            .get(&selector)
            .cloned()
            .ok_or_else(|| ChainError::Reverted(format!("no result for selector 0x{}", hex::encode(selector))))
    }

    async fn build_and_send(&self, draft: &TransactionDraft, wallet: &LocalWallet) -> Result<TxHash, ChainError> {
        let mut state = self.touch()?;
        if draft.chain_id != self.chain_id {
            return Err(ChainError::Rejected(format!("invalid chain id {}", draft.chain_id)));
        }
        if state.failing_submissions > 0 {
            state.failing_submissions -= 1;
            return Err(ChainError::Rejected("injected submission failure".to_string()));
        }
        if state.failing_senders.contains(&draft.from) {
            return Err(ChainError::Rejected(format!("sender {:?} is blocked", draft.from)));
        }

        let (_, hash) = sign_draft(draft, wallet)?;
        let nonce = draft.nonce.unwrap_or_default();
        let expected = state.nonces.get(&draft.from).copied().unwrap_or(0);
        if nonce < expected {
            return Err(ChainError::Rejected(format!("nonce too low: {} < {}", nonce, expected)));
        }
        if nonce > expected {
            state
                .queued
                .entry(draft.from)
                .or_default()
                .insert(nonce, (draft.clone(), hash));
            return Ok(hash);
        }

        self.execute(&mut state, draft, &hash)?;
        self.drain_queue(&mut state, &draft.from);
        Ok(hash)
    }

    async fn wait_for_receipt(&self, hash: &TxHash, timeout: Duration) -> Result<Receipt, ChainError> {
        let state = self.touch()?;
        if state.withhold_receipts {
            return Err(ChainError::Timeout(*hash, timeout));
        }
        state
            .receipts
            .get(hash)
            .cloned()
            .ok_or(ChainError::Timeout(*hash, timeout))
    }
}
