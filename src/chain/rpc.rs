use std::time::Duration;
use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider, ProviderError, RpcError};
use ethers::signers::LocalWallet;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{BlockNumber, TransactionRequest, U256};
use crate::types::{Address, Receipt, TransactionDraft, TxHash};
use super::{sign_draft, ChainClient, ChainError};

/// Time between two `eth_getTransactionReceipt` polls
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Maps a provider error. JSON-RPC error objects sent by the node become `node_error`,
/// anything else (connection refused, unreadable answer) means the node is unavailable.
fn provider_error(err: ProviderError, node_error: fn(String) -> ChainError) -> ChainError {
    match err.as_error_response() {
        Some(response) => node_error(format!("{} ({})", response.message, response.code)),
        None => ChainError::Unavailable(err.to_string()),
    }
}

fn unavailable(err: ProviderError) -> ChainError {
    provider_error(err, ChainError::Unavailable)
}

fn to_u64(value: U256, what: &str) -> Result<u64, ChainError> {
    u64::try_from(value).map_err(|_| ChainError::Unavailable(format!("{} out of range: {}", what, value)))
}

fn to_u128(value: U256, what: &str) -> Result<u128, ChainError> {
    u128::try_from(value).map_err(|_| ChainError::Unavailable(format!("{} out of range: {}", what, value)))
}

/// A `ChainClient` talking JSON-RPC over HTTP to an Ethereum compatible node
pub struct RpcChainClient {
    provider: Provider<Http>,
    chain_id: u64,
}

impl RpcChainClient {
    pub fn new(url: impl AsRef<str>, chain_id: u64) -> Result<Self, ChainError> {
        let provider = Provider::<Http>::try_from(url.as_ref())
            .map_err(|e| ChainError::Unavailable(format!("invalid provider url {}: {}", url.as_ref(), e)))?;
        Ok(Self { provider, chain_id })
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn get_balance(&self, address: &Address) -> Result<u128, ChainError> {
        let balance = self
            .provider
            .get_balance(*address, Some(BlockNumber::Latest.into()))
            .await
            .map_err(unavailable)?;
        to_u128(balance, "balance")
    }

    async fn get_transaction_count(&self, address: &Address) -> Result<u64, ChainError> {
        let count = self
            .provider
            .get_transaction_count(*address, Some(BlockNumber::Pending.into()))
            .await
            .map_err(unavailable)?;
        to_u64(count, "nonce")
    }

    async fn get_gas_price(&self) -> Result<u128, ChainError> {
        let gas_price = self.provider.get_gas_price().await.map_err(unavailable)?;
        to_u128(gas_price, "gas price")
    }

    async fn estimate_gas(&self, draft: &TransactionDraft) -> Result<u64, ChainError> {
        let gas = self
            .provider
            .estimate_gas(&draft.to_typed(), None)
            .await
            .map_err(|e| provider_error(e, ChainError::Reverted))?;
        to_u64(gas, "gas")
    }

    async fn call(&self, contract: &Address, data: &[u8]) -> Result<Vec<u8>, ChainError> {
        let tx: TypedTransaction = TransactionRequest::new().to(*contract).data(data.to_vec()).into();
        let result = self
            .provider
            .call(&tx, Some(BlockNumber::Latest.into()))
            .await
            .map_err(|e| provider_error(e, ChainError::Reverted))?;
        Ok(result.to_vec())
    }

    async fn build_and_send(&self, draft: &TransactionDraft, wallet: &LocalWallet) -> Result<TxHash, ChainError> {
        let (raw, _) = sign_draft(draft, wallet)?;
        let pending = self
            .provider
            .send_raw_transaction(raw)
            .await
            .map_err(|e| provider_error(e, ChainError::Rejected))?;
        Ok(pending.tx_hash())
    }

    async fn wait_for_receipt(&self, hash: &TxHash, timeout: Duration) -> Result<Receipt, ChainError> {
        let poll = async {
            loop {
                let receipt = self.provider.get_transaction_receipt(*hash).await.map_err(unavailable)?;
                if let Some(receipt) = receipt {
                    if let Some(block_number) = receipt.block_number {
                        return Ok::<Receipt, ChainError>(Receipt {
                            hash: receipt.transaction_hash,
                            block_number: block_number.as_u64(),
                            gas_used: receipt.gas_used.map(|gas| gas.low_u64()).unwrap_or_default(),
                            success: receipt.status.map(|status| status.as_u64()) != Some(0),
                        });
                    }
                }
                tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
            }
        };
        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| ChainError::Timeout(*hash, timeout))?
    }
}
