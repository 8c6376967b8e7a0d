use crate::chain::{abi, ChainClient};
use crate::config::Config;
use crate::error::{amount_overflow, MinterError};
use crate::types::constants::simulation_sender;
use crate::types::{Address, TransactionDraft};

/// Projects the cost of minting before any funds move.
/// Every estimate reads the current gas price; failures propagate so a run aborts pre-flight.
pub struct FeeEstimator<'a, C: ChainClient + ?Sized> {
    chain: &'a C,
    config: &'a Config,
}

impl<'a, C: ChainClient + ?Sized> FeeEstimator<'a, C> {
    pub fn new(chain: &'a C, config: &'a Config) -> Self {
        Self { chain, config }
    }

    /// A mint call from `from`, paying the mint price
    pub fn mint_draft(&self, from: Address, gas_price: u128) -> TransactionDraft {
        TransactionDraft {
            from,
            to: self.config.contract_address(),
            value: self.config.mint_price,
            gas: self.config.contract_function_gas(),
            gas_price,
            nonce: None,
            data: abi::encode_call(self.config.mint_function(), &[]),
            chain_id: self.chain.chain_id(),
        }
    }

    /// Cost of one mint call in wei: gas price times simulated gas
    pub async fn estimate_single_mint_fee(&self) -> Result<u128, MinterError> {
        let gas_price = self.chain.get_gas_price().await?;
        let draft = self.mint_draft(simulation_sender(), gas_price);
        let gas = self.chain.estimate_gas(&draft).await?;
        tracing::debug!("Simulated {}(): {} gas at {} wei", self.config.mint_function(), gas, gas_price);
        (gas as u128).checked_mul(gas_price).ok_or_else(|| amount_overflow("mint fee"))
    }

    /// Fees of a whole multi mode run: one transfer per derived account plus every mint call
    pub async fn estimate_multi_mint_fees(&self) -> Result<u128, MinterError> {
        let single_mint_fee = self.estimate_single_mint_fee().await?;
        self.estimate_multi_mint_fees_with(single_mint_fee).await
    }

    /// Same as `estimate_multi_mint_fees` with an already known single mint fee
    pub async fn estimate_multi_mint_fees_with(&self, single_mint_fee: u128) -> Result<u128, MinterError> {
        let gas_price = self.chain.get_gas_price().await?;
        let transfer_fee = (self.config.default_gas() as u128)
            .checked_mul(gas_price)
            .ok_or_else(|| amount_overflow("transfer fee"))?;
        let transfer_count = self.config.total_accounts() as u128;
        let mint_count = self.config.number_of_mints() as u128;
        transfer_fee
            .checked_mul(transfer_count)
            .zip(single_mint_fee.checked_mul(mint_count))
            .and_then(|(transfers, mints)| transfers.checked_add(mints))
            .ok_or_else(|| amount_overflow("multi mode fees"))
    }
}

/// Scale fees by a safety factor, rounding up to the next wei
pub fn apply_fees_multiplier(fees: u128, factor: f64) -> u128 {
    let parts_per_million = (factor * 1_000_000.0).round() as u128;
    fees.saturating_mul(parts_per_million).div_ceil(1_000_000)
}
