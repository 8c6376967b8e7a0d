use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Bytes;
use std::time::Duration;
use thiserror::Error;
use crate::types::{Address, BatchResult, Receipt, TransactionDraft, TxHash};

pub mod abi;
pub mod mock;
pub mod rpc;

pub use abi::CallArg;
pub use mock::MockChain;
pub use rpc::RpcChainClient;

#[cfg(test)]
mod tests;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    /// The node could not be reached or answered garbage
    #[error("Chain unavailable: {0}")]
    Unavailable(String),
    /// A simulated or read-only call reverted
    #[error("Execution reverted: {0}")]
    Reverted(String),
    /// A transaction was refused at submission
    #[error("Transaction rejected: {0}")]
    Rejected(String),
    #[error("Timed out after {1:?} waiting for receipt of {0:?}")]
    Timeout(TxHash, Duration),
}

/// The narrow view of a chain node the minter works through.
///
/// Every call is awaited before the next one is issued; implementations never see concurrent
/// submissions from the minter.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Chain ID transactions are signed for
    fn chain_id(&self) -> u64;

    /// Balance of an address in wei
    async fn get_balance(&self, address: &Address) -> Result<u128, ChainError>;

    /// Number of transactions sent from an address (its next nonce)
    async fn get_transaction_count(&self, address: &Address) -> Result<u64, ChainError>;

    /// Current gas price in wei
    async fn get_gas_price(&self) -> Result<u128, ChainError>;

    /// Simulate a transaction and return the gas it would use
    async fn estimate_gas(&self, draft: &TransactionDraft) -> Result<u64, ChainError>;

    /// Read-only contract call with ABI encoded call data
    async fn call(&self, contract: &Address, data: &[u8]) -> Result<Vec<u8>, ChainError>;

    /// Sign a draft with the sender's wallet and submit it
    async fn build_and_send(&self, draft: &TransactionDraft, wallet: &LocalWallet) -> Result<TxHash, ChainError>;

    /// Wait until the transaction is mined, or fail with `ChainError::Timeout`
    async fn wait_for_receipt(&self, hash: &TxHash, timeout: Duration) -> Result<Receipt, ChainError>;
}

/// Sign a draft as a legacy EIP-155 transaction.
/// Returns the raw transaction for `eth_sendRawTransaction` and its hash.
pub fn sign_draft(draft: &TransactionDraft, wallet: &LocalWallet) -> Result<(Bytes, TxHash), ChainError> {
    if wallet.address() != draft.from {
        return Err(ChainError::Rejected("signer does not match sender".to_string()));
    }
    if draft.nonce.is_none() {
        return Err(ChainError::Rejected("transaction has no nonce".to_string()));
    }
    let tx = draft.to_typed();
    let signature = wallet
        .sign_transaction_sync(&tx)
        .map_err(|e| ChainError::Rejected(e.to_string()))?;
    Ok((tx.rlp_signed(&signature), tx.hash(&signature)))
}

/// Wait for the anchor of a batch with a bounded timeout.
///
/// Returns `None` without touching the network when nothing in the batch was submitted.
pub async fn confirm_batch<C: ChainClient + ?Sized>(
    chain: &C,
    batch: &BatchResult,
    timeout: Duration,
) -> Result<Option<Receipt>, ChainError> {
    let Some(anchor) = batch.anchor() else {
        tracing::warn!("Nothing to confirm: no transaction of the batch was submitted");
        return Ok(None);
    };
    let receipt = chain.wait_for_receipt(anchor, timeout).await?;
    if receipt.success {
        tracing::info!("Confirmed {:?} in block {}", anchor, receipt.block_number);
    } else {
        tracing::warn!("Transaction {:?} was mined in block {} but reverted", anchor, receipt.block_number);
    }
    Ok(Some(receipt))
}
