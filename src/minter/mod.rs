//! Run orchestration: single mode, multi mode and account generation.
//!
//! Every funded run goes through the same steps: estimate fees, check the master balance, ask the
//! operator, then submit batch after batch, each one gated by the confirmation of its anchor.

use std::fmt;
use crate::accounts::{derive, display_accounts, generate_master, partition_layers};
use crate::chain::ChainClient;
use crate::config::Config;
use crate::error::{amount_overflow, MinterError};
use crate::fees::{apply_fees_multiplier, FeeEstimator};
use crate::invoker::ContractInvoker;
use crate::splitter::Splitter;
use crate::types::{format_ether, Account, Address, BatchResult, TransactionRecord};

#[cfg(test)]
mod tests;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Mint every token from the master account
    Single,
    /// Mint from derived accounts funded through the mixing layers
    Multi,
    /// Create a new master account and stop
    Generate,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Single => write!(f, "Single mode"),
            Mode::Multi => write!(f, "Multi mode"),
            Mode::Generate => write!(f, "New account mode"),
        }
    }
}

/// Everything known about a run before the operator is asked
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub mode: Mode,
    pub master: Address,
    pub master_balance: u128,
    /// Estimated transaction fees, not including mint prices
    pub total_fees: u128,
    pub required_balance: u128,
    /// What each first layer account receives (multi mode only)
    pub amount_each: Option<u128>,
}

impl RunPlan {
    pub fn is_affordable(&self) -> bool {
        self.master_balance >= self.required_balance
    }

    /// Settings and estimates, one line each, as shown to the operator
    pub fn summary(&self, config: &Config) -> Vec<String> {
        let settings = &config.settings;
        let mut lines = vec![
            format!("[{}]", self.mode),
            "Settings:".to_string(),
            format!("- CHAIN_NAME: {}", settings.chain_name),
            format!("- CONTRACT_ADDRESS: {:?}", settings.contract_address),
            format!("- MINT_FUNCTION_NAME: {}", settings.mint_function_name),
            format!("- MINT_PRICE: {}", format_ether(config.mint_price)),
            format!("- NUMBER_OF_MINTS: {}", settings.number_of_mints),
        ];
        if self.mode == Mode::Multi {
            lines.push(format!("- EXTRA_MIXING_LAYERS: {}", settings.extra_mixing_layers));
            lines.push(format!("- SEND_BACK: {}", settings.send_back));
        }
        lines.push(format!("- LOGGING: {}", settings.logging));
        lines.push(format!(
            "Using master account {} | balance: {}",
            self.master,
            format_ether(self.master_balance)
        ));
        lines.push(format!("Estimated required balance: {}", format_ether(self.required_balance)));
        lines.push(format!(
            "Estimated total transaction fees, not including mint prices: {}",
            format_ether(self.total_fees)
        ));
        lines
    }
}

/// Operator approval, asked once per run after the balance check passed
pub trait Confirm {
    fn confirm(&mut self, plan: &RunPlan) -> bool;
}

impl<F: FnMut(&RunPlan) -> bool> Confirm for F {
    fn confirm(&mut self, plan: &RunPlan) -> bool {
        self(plan)
    }
}

/// Approves every run
pub struct AutoConfirm;

impl Confirm for AutoConfirm {
    fn confirm(&mut self, _plan: &RunPlan) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// The operator said no; nothing was sent
    Declined,
}

/// What a run did, for display
#[derive(Debug, Clone)]
pub struct RunReport {
    pub mode: Mode,
    pub outcome: RunOutcome,
    pub master: Account,
    /// Derived accounts in derivation order
    pub accounts: Vec<Address>,
    /// Every batch of the run, labelled with its step
    pub batches: Vec<(String, BatchResult)>,
}

impl RunReport {
    fn new(mode: Mode, outcome: RunOutcome, master: Account) -> Self {
        Self {
            mode,
            outcome,
            master,
            accounts: Vec::new(),
            batches: Vec::new(),
        }
    }

    /// Submitted transactions of the whole run, in order
    pub fn transactions(&self) -> Vec<&TransactionRecord> {
        self.batches.iter().flat_map(|(_, batch)| batch.submitted()).collect()
    }
}

/// Create a fresh master account and surface its key
pub fn generate_account() -> Result<RunReport, MinterError> {
    let master = generate_master();
    tracing::warn!("Generated new account {:?}", master.address);
    tracing::warn!("PRIVATE KEY: {}", master.secret_hex());
    Ok(RunReport::new(Mode::Generate, RunOutcome::Completed, master))
}

pub struct Minter<'a, C: ChainClient + ?Sized> {
    chain: &'a C,
    config: &'a Config,
}

impl<'a, C: ChainClient + ?Sized> Minter<'a, C> {
    pub fn new(chain: &'a C, config: &'a Config) -> Self {
        Self { chain, config }
    }

    /// Estimates for minting everything from `master`
    pub async fn plan_single(&self, master: &Account) -> Result<RunPlan, MinterError> {
        let mints = self.config.number_of_mints() as u128;
        let single_mint_fee = FeeEstimator::new(self.chain, self.config).estimate_single_mint_fee().await?;
        let total_fees = single_mint_fee
            .checked_mul(mints)
            .ok_or_else(|| amount_overflow("mint fee x NUMBER_OF_MINTS"))?;
        let required_balance = self
            .config
            .mint_price
            .checked_mul(mints)
            .and_then(|prices| prices.checked_add(total_fees))
            .ok_or_else(|| amount_overflow("MINT_PRICE x NUMBER_OF_MINTS + fees"))?;
        Ok(RunPlan {
            mode: Mode::Single,
            master: master.address,
            master_balance: master.balance(self.chain).await?,
            total_fees,
            required_balance,
            amount_each: None,
        })
    }

    /// Estimates for minting through derived accounts.
    ///
    /// Each first layer account gets the mint price plus the whole fee budget. The required
    /// balance covers both the estimate and what the first split will check for.
    pub async fn plan_multi(&self, master: &Account) -> Result<RunPlan, MinterError> {
        let mints = self.config.number_of_mints() as u128;
        let estimator = FeeEstimator::new(self.chain, self.config);
        let multi_mint_fees = estimator.estimate_multi_mint_fees().await?;
        let total_fees = apply_fees_multiplier(multi_mint_fees, self.config.settings.fees_mult_factor);
        let amount_each = self
            .config
            .mint_price
            .checked_add(total_fees)
            .ok_or_else(|| amount_overflow("MINT_PRICE + fees"))?;

        let gas_price = self.chain.get_gas_price().await?;
        let transfer_fee = (self.config.default_gas() as u128)
            .checked_mul(gas_price)
            .ok_or_else(|| amount_overflow("transfer fee"))?;
        let estimated = self
            .config
            .mint_price
            .checked_mul(mints)
            .and_then(|prices| prices.checked_add(total_fees))
            .ok_or_else(|| amount_overflow("MINT_PRICE x NUMBER_OF_MINTS + fees"))?;
        let first_split = transfer_fee
            .checked_add(amount_each)
            .and_then(|each| each.checked_mul(mints))
            .ok_or_else(|| amount_overflow("first split"))?;
        Ok(RunPlan {
            mode: Mode::Multi,
            master: master.address,
            master_balance: master.balance(self.chain).await?,
            total_fees,
            required_balance: estimated.max(first_split),
            amount_each: Some(amount_each),
        })
    }

    pub async fn run_single(&self, master: &Account, confirm: &mut impl Confirm) -> Result<RunReport, MinterError> {
        let plan = self.plan_single(master).await?;
        if !self.approve(&plan, confirm)? {
            return Ok(RunReport::new(Mode::Single, RunOutcome::Declined, master.clone()));
        }

        let invoker = ContractInvoker::new(self.chain, self.config);
        let batch = invoker
            .contract_write_from_one(
                master,
                self.config.mint_function(),
                &[],
                self.config.number_of_mints(),
                self.config.mint_price,
                self.config.contract_function_gas(),
            )
            .await?;
        require_anchor("mint", &batch)?;
        display_accounts(self.chain, std::slice::from_ref(master), true, false).await?;

        let mut report = RunReport::new(Mode::Single, RunOutcome::Completed, master.clone());
        report.batches.push(("mint".to_string(), batch));
        Ok(report)
    }

    pub async fn run_multi(&self, master: &Account, confirm: &mut impl Confirm) -> Result<RunReport, MinterError> {
        let plan = self.plan_multi(master).await?;
        if !self.approve(&plan, confirm)? {
            return Ok(RunReport::new(Mode::Multi, RunOutcome::Declined, master.clone()));
        }
        let amount_each = plan.amount_each.unwrap_or(self.config.mint_price);

        let mints = self.config.number_of_mints();
        let accounts = derive(master, self.config.total_accounts());
        let layers = partition_layers(&accounts, mints);
        let mut report = RunReport::new(Mode::Multi, RunOutcome::Completed, master.clone());
        report.accounts = accounts.iter().map(|account| account.address).collect();
        display_accounts(self.chain, &with_master(master, &accounts), true, true).await?;

        let splitter = Splitter::new(self.chain, self.config);
        let batch = splitter.send_one_to_many(master, &layers[0], amount_each).await?;
        require_anchor("split", &batch)?;
        report.batches.push(("split".to_string(), batch));
        display_accounts(self.chain, &with_master(master, &layers[0]), true, false).await?;

        for (i, pair) in layers.windows(2).enumerate() {
            let step = format!("mix {}", i + 1);
            let batch = splitter.send_many_to_many(&pair[0], &pair[1]).await?;
            require_anchor(&step, &batch)?;
            report.batches.push((step, batch));
            let shown: Vec<Account> = pair.concat();
            display_accounts(self.chain, &shown, true, false).await?;
        }

        let minting = &layers[layers.len() - 1];
        let invoker = ContractInvoker::new(self.chain, self.config);
        let batch = invoker
            .mint_from_each(
                minting,
                self.config.mint_function(),
                &[],
                self.config.mint_price,
                self.config.contract_function_gas(),
            )
            .await?;
        require_anchor("mint", &batch)?;
        report.batches.push(("mint".to_string(), batch));
        display_accounts(self.chain, &with_master(master, minting), true, false).await?;

        if self.config.settings.send_back {
            let batch = splitter.send_many_to_one(minting, master).await?;
            report.batches.push(("send back".to_string(), batch));
            display_accounts(self.chain, &with_master(master, minting), true, false).await?;
        }

        tracing::info!("Done: {} transactions submitted", report.transactions().len());
        Ok(report)
    }

    /// Balance check, then the operator
    fn approve(&self, plan: &RunPlan, confirm: &mut impl Confirm) -> Result<bool, MinterError> {
        if !plan.is_affordable() {
            tracing::error!(
                "Too low balance on master account. Balance: {} ETH, estimated required balance: {} ETH",
                format_ether(plan.master_balance),
                format_ether(plan.required_balance)
            );
            return Err(MinterError::InsufficientFunds {
                available: plan.master_balance,
                required: plan.required_balance,
            });
        }
        if !confirm.confirm(plan) {
            tracing::info!("Not executed");
            return Ok(false);
        }
        for line in plan.summary(self.config) {
            tracing::info!("{}", line);
        }
        tracing::info!("Running...");
        Ok(true)
    }
}

fn with_master(master: &Account, accounts: &[Account]) -> Vec<Account> {
    std::iter::once(master.clone()).chain(accounts.iter().cloned()).collect()
}

/// A step whose batch submitted nothing leaves the next step without funds
fn require_anchor(step: &str, batch: &BatchResult) -> Result<(), MinterError> {
    if batch.anchor().is_none() {
        tracing::error!("Step {} submitted no transaction, aborting", step);
        return Err(MinterError::NothingSubmitted(step.to_string()));
    }
    Ok(())
}
