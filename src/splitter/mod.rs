//! Moving value between account sets: one to many, many to many and many to one.
//!
//! All transfers are sequential. Per-transfer failures are logged and recorded in the returned
//! `BatchResult`; only the batch anchor is waited for, and a timeout there is fatal.

use crate::chain::{confirm_batch, ChainClient};
use crate::config::{Config, NoncePolicy};
use crate::error::MinterError;
use crate::types::{format_ether, Account, Address, BatchResult, TransactionDraft, TransactionRecord, TxOutcome};

#[cfg(test)]
mod tests;

pub struct Splitter<'a, C: ChainClient + ?Sized> {
    chain: &'a C,
    config: &'a Config,
}

impl<'a, C: ChainClient + ?Sized> Splitter<'a, C> {
    pub fn new(chain: &'a C, config: &'a Config) -> Self {
        Self { chain, config }
    }

    /// Fee reserved for one plain transfer at `gas_price`
    pub fn transfer_fee(&self, gas_price: u128) -> u128 {
        (self.config.default_gas() as u128).saturating_mul(gas_price)
    }

    /// Send `amount` from `sender` to `receiver`.
    /// Gas price and nonce are read from the network when not given.
    pub async fn send_tx(
        &self,
        sender: &Account,
        receiver: &Address,
        amount: u128,
        gas_price: Option<u128>,
        nonce: Option<u64>,
    ) -> Result<TransactionRecord, MinterError> {
        let nonce = match nonce {
            Some(nonce) => nonce,
            None => sender.nonce(self.chain).await?,
        };
        let gas_price = match gas_price {
            Some(gas_price) => gas_price,
            None => self.chain.get_gas_price().await?,
        };
        let draft = TransactionDraft {
            from: sender.address,
            to: *receiver,
            value: amount,
            gas: self.config.default_gas(),
            gas_price,
            nonce: Some(nonce),
            data: Vec::new(),
            chain_id: self.chain.chain_id(),
        };
        let hash = self.chain.build_and_send(&draft, &sender.wallet).await?;
        Ok(TransactionRecord {
            sender: sender.address,
            receiver: *receiver,
            value: amount,
            gas: draft.gas,
            gas_price,
            nonce,
            hash,
        })
    }

    /// Send `amount_each` from `source` to every target.
    ///
    /// Fails with `InsufficientFunds`, before submitting anything, unless the source covers
    /// every transfer and its fee. Nonces start at the source's current nonce and are counted
    /// locally; what a failed transfer does to the counter is set by the nonce policy.
    pub async fn send_one_to_many(
        &self,
        source: &Account,
        targets: &[Account],
        amount_each: u128,
    ) -> Result<BatchResult, MinterError> {
        let gas_price = self.chain.get_gas_price().await?;
        let balance = source.balance(self.chain).await?;
        let required = (targets.len() as u128)
            .checked_mul(self.transfer_fee(gas_price).saturating_add(amount_each))
            .unwrap_or(u128::MAX);
        if balance < required {
            tracing::error!(
                "Insufficient funds on {}: {} ETH, required {} ETH",
                source.label(),
                format_ether(balance),
                format_ether(required)
            );
            return Err(MinterError::InsufficientFunds { available: balance, required });
        }

        let mut batch = BatchResult::new();
        let mut nonce = source.nonce(self.chain).await?;
        for target in targets {
            match self.send_tx(source, &target.address, amount_each, Some(gas_price), Some(nonce)).await {
                Ok(record) => {
                    tracing::info!(
                        "Sending {} from {} to {} in {:?}",
                        format_ether(amount_each),
                        source.label(),
                        target.label(),
                        record.hash
                    );
                    batch.push(target.address, TxOutcome::Submitted(record));
                    nonce += 1;
                }
                Err(e) => {
                    tracing::warn!("Transfer from {} to {} with nonce {} failed: {}", source.label(), target.label(), nonce, e);
                    batch.push(target.address, TxOutcome::Failed(e.to_string()));
                    nonce = match self.config.nonce_policy() {
                        NoncePolicy::AcceptGap => nonce + 1,
                        NoncePolicy::Refetch => source.nonce(self.chain).await?,
                    };
                }
            }
        }

        confirm_batch(self.chain, &batch, self.config.receipt_timeout()).await?;
        Ok(batch)
    }

    /// Sweep every source's balance, minus the transfer fee, to `target`
    pub async fn send_many_to_one(&self, sources: &[Account], target: &Account) -> Result<BatchResult, MinterError> {
        let pairs: Vec<(&Account, &Account)> = sources.iter().map(|source| (source, target)).collect();
        self.forward_balances(&pairs).await
    }

    /// Forward each source's balance, minus the transfer fee, to the target at the same position
    pub async fn send_many_to_many(&self, sources: &[Account], targets: &[Account]) -> Result<BatchResult, MinterError> {
        if sources.len() != targets.len() {
            return Err(MinterError::LengthMismatch {
                sources: sources.len(),
                targets: targets.len(),
            });
        }
        let pairs: Vec<(&Account, &Account)> = sources.iter().zip(targets.iter()).collect();
        self.forward_balances(&pairs).await
    }

    /// Each source is an independent signer: it reads its own balance and nonce right before
    /// sending, since an earlier step of the run may just have funded it.
    async fn forward_balances(&self, pairs: &[(&Account, &Account)]) -> Result<BatchResult, MinterError> {
        let gas_price = self.chain.get_gas_price().await?;
        let fee = self.transfer_fee(gas_price);

        let mut batch = BatchResult::new();
        for (source, target) in pairs {
            let balance = source.balance(self.chain).await?;
            if balance <= fee {
                tracing::warn!(
                    "Skipping {}: balance {} ETH does not cover the transfer fee",
                    source.label(),
                    format_ether(balance)
                );
                batch.push(source.address, TxOutcome::Skipped(format!("balance {} does not cover fee {}", balance, fee)));
                continue;
            }
            let available = balance - fee;
            let nonce = source.nonce(self.chain).await?;
            match self.send_tx(source, &target.address, available, Some(gas_price), Some(nonce)).await {
                Ok(record) => {
                    tracing::info!(
                        "Sending {} from {} to {} in {:?}",
                        format_ether(available),
                        source.label(),
                        target.label(),
                        record.hash
                    );
                    batch.push(source.address, TxOutcome::Submitted(record));
                }
                Err(e) => {
                    tracing::warn!("Transfer from {} to {} failed: {}", source.label(), target.label(), e);
                    batch.push(source.address, TxOutcome::Failed(e.to_string()));
                }
            }
        }

        confirm_batch(self.chain, &batch, self.config.receipt_timeout()).await?;
        Ok(batch)
    }
}
