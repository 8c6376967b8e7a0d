//! Contract calls: single writes, batches from one sender, one call from each of many senders,
//! and read-only calls.

use crate::chain::{abi, confirm_batch, CallArg, ChainClient};
use crate::config::{Config, NoncePolicy};
use crate::error::MinterError;
use crate::types::{format_ether, Account, BatchResult, TransactionDraft, TransactionRecord, TxHash, TxOutcome};

#[cfg(test)]
mod tests;

pub struct ContractInvoker<'a, C: ChainClient + ?Sized> {
    chain: &'a C,
    config: &'a Config,
}

impl<'a, C: ChainClient + ?Sized> ContractInvoker<'a, C> {
    pub fn new(chain: &'a C, config: &'a Config) -> Self {
        Self { chain, config }
    }

    /// Read-only call of `function(args...)` on the configured contract.
    /// Returns the raw ABI encoded result.
    pub async fn contract_read(&self, function: &str, args: &[CallArg]) -> Result<Vec<u8>, MinterError> {
        let data = abi::encode_call(function, args);
        let response = self.chain.call(&self.config.contract_address(), &data).await?;
        tracing::info!(
            "Reading contract \"{}\". Value: 0x{}",
            abi::function_signature(function, args),
            hex::encode(&response)
        );
        Ok(response)
    }

    /// Call `function(args...)` once from `sender`, paying `amount`.
    /// The nonce is read from the network when not given.
    pub async fn contract_write(
        &self,
        sender: &Account,
        function: &str,
        args: &[CallArg],
        amount: u128,
        gas: u64,
        nonce: Option<u64>,
    ) -> Result<TxHash, MinterError> {
        let nonce = match nonce {
            Some(nonce) => nonce,
            None => sender.nonce(self.chain).await?,
        };
        let gas_price = self.chain.get_gas_price().await?;
        let record = self.submit(sender, function, args, amount, gas, gas_price, nonce).await?;
        Ok(record.hash)
    }

    /// `count` calls from `sender`. The nonce is read once and counted locally, the gas price is
    /// read once for the batch. Failed calls are logged and recorded; the anchor is waited for.
    pub async fn contract_write_from_one(
        &self,
        sender: &Account,
        function: &str,
        args: &[CallArg],
        count: usize,
        amount: u128,
        gas: u64,
    ) -> Result<BatchResult, MinterError> {
        let gas_price = self.chain.get_gas_price().await?;
        let mut nonce = sender.nonce(self.chain).await?;

        let mut batch = BatchResult::new();
        for _ in 0..count {
            match self.submit(sender, function, args, amount, gas, gas_price, nonce).await {
                Ok(record) => {
                    batch.push(sender.address, TxOutcome::Submitted(record));
                    nonce += 1;
                }
                Err(e) => {
                    tracing::warn!("Call from {} with nonce {} failed: {}", sender.label(), nonce, e);
                    batch.push(sender.address, TxOutcome::Failed(e.to_string()));
                    nonce = match self.config.nonce_policy() {
                        NoncePolicy::AcceptGap => nonce + 1,
                        NoncePolicy::Refetch => sender.nonce(self.chain).await?,
                    };
                }
            }
        }

        confirm_batch(self.chain, &batch, self.config.receipt_timeout()).await?;
        Ok(batch)
    }

    /// One call from each account, each with its own nonce. Only the anchor is waited for.
    /// A failed submission is recorded and the batch goes on; a failed read aborts it.
    pub async fn mint_from_each(
        &self,
        accounts: &[Account],
        function: &str,
        args: &[CallArg],
        amount: u128,
        gas: u64,
    ) -> Result<BatchResult, MinterError> {
        let gas_price = self.chain.get_gas_price().await?;

        let mut batch = BatchResult::new();
        for account in accounts {
            let nonce = account.nonce(self.chain).await?;
            match self.submit(account, function, args, amount, gas, gas_price, nonce).await {
                Ok(record) => batch.push(account.address, TxOutcome::Submitted(record)),
                Err(e) => {
                    tracing::warn!("Call from {} failed: {}", account.label(), e);
                    batch.push(account.address, TxOutcome::Failed(e.to_string()));
                }
            }
        }

        confirm_batch(self.chain, &batch, self.config.receipt_timeout()).await?;
        Ok(batch)
    }

    #[allow(clippy::too_many_arguments)]
    async fn submit(
        &self,
        sender: &Account,
        function: &str,
        args: &[CallArg],
        amount: u128,
        gas: u64,
        gas_price: u128,
        nonce: u64,
    ) -> Result<TransactionRecord, MinterError> {
        let draft = TransactionDraft {
            from: sender.address,
            to: self.config.contract_address(),
            value: amount,
            gas,
            gas_price,
            nonce: Some(nonce),
            data: abi::encode_call(function, args),
            chain_id: self.chain.chain_id(),
        };
        let hash = self.chain.build_and_send(&draft, &sender.wallet).await?;
        tracing::info!(
            "Calling contract function \"{}\" with {} ETH from address {} in tx {:?}",
            abi::function_signature(function, args),
            format_ether(amount),
            sender.label(),
            hash
        );
        Ok(TransactionRecord {
            sender: sender.address,
            receiver: draft.to,
            value: amount,
            gas,
            gas_price,
            nonce,
            hash,
        })
    }
}
