use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, TransactionRequest, TxHash};
use serde::{Deserialize, Serialize};

/// An unsigned transaction, used both for gas simulation and for submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDraft {
    /// The sending address
    pub from: Address,
    /// Receiver of a transfer, or the contract being called
    pub to: Address,
    /// Value transferred, in wei
    pub value: u128,
    /// Gas limit
    pub gas: u64,
    /// Gas price in wei
    pub gas_price: u128,
    /// Sender nonce. Simulations leave it unset
    pub nonce: Option<u64>,
    /// Call data, empty for plain transfers
    pub data: Vec<u8>,
    /// EIP-155 chain ID
    pub chain_id: u64,
}

impl TransactionDraft {
    /// The draft as a legacy transaction request. Zero gas fields are left for the node to fill
    pub fn to_typed(&self) -> TypedTransaction {
        let mut request = TransactionRequest::new()
            .from(self.from)
            .to(self.to)
            .value(self.value)
            .data(self.data.clone())
            .chain_id(self.chain_id);
        if self.gas > 0 {
            request = request.gas(self.gas);
        }
        if self.gas_price > 0 {
            request = request.gas_price(self.gas_price);
        }
        if let Some(nonce) = self.nonce {
            request = request.nonce(nonce);
        }
        request.into()
    }
}

/// Receipt of a confirmed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub hash: TxHash,
    pub block_number: u64,
    pub gas_used: u64,
    /// false if the transaction was mined but reverted
    pub success: bool,
}

/// A submitted transaction, kept for reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub sender: Address,
    pub receiver: Address,
    pub value: u128,
    pub gas: u64,
    pub gas_price: u128,
    pub nonce: u64,
    pub hash: TxHash,
}

/// What happened to one account inside a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutcome {
    /// The transaction was accepted by the network
    Submitted(TransactionRecord),
    /// Submission failed; the batch carried on
    Failed(String),
    /// Nothing was sent, e.g. the balance did not cover the fee
    Skipped(String),
}

/// One entry of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    /// The receiving account for one-to-many transfers, the sending account otherwise
    pub account: Address,
    pub outcome: TxOutcome,
}

/// Per-account outcomes of a batch of sequential transactions.
///
/// The anchor is the last successfully submitted transaction. Its confirmation gates the next
/// step of a run. A batch where nothing was submitted has no anchor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub entries: Vec<BatchEntry>,
}

impl BatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, account: Address, outcome: TxOutcome) {
        self.entries.push(BatchEntry { account, outcome });
    }

    /// Transactions that reached the network, in submission order
    pub fn submitted(&self) -> impl Iterator<Item = &TransactionRecord> {
        self.entries.iter().filter_map(|entry| match &entry.outcome {
            TxOutcome::Submitted(record) => Some(record),
            _ => None,
        })
    }

    /// The transaction whose confirmation gates continuation
    pub fn anchor(&self) -> Option<&TxHash> {
        self.submitted().last().map(|record| &record.hash)
    }

    pub fn hashes(&self) -> Vec<TxHash> {
        self.submitted().map(|record| record.hash).collect()
    }

    pub fn submitted_count(&self) -> usize {
        self.submitted().count()
    }

    pub fn failed_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.outcome, TxOutcome::Failed(_)))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.outcome, TxOutcome::Skipped(_)))
            .count()
    }
}
