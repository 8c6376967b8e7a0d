use std::time::Duration;
use thiserror::Error;
use crate::chain::ChainError;
use crate::config::ConfigError;
use crate::types::{format_ether, TxHash};

#[derive(Debug, Error)]
pub enum MinterError {
    #[error("Invalid private key: {0}")]
    InvalidKey(String),
    #[error("Insufficient funds: available {} ETH, required {} ETH", ether(.available), ether(.required))]
    InsufficientFunds { available: u128, required: u128 },
    #[error("Number of senders ({sources}) must be equal to number of receivers ({targets})")]
    LengthMismatch { sources: usize, targets: usize },
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),
    #[error("Simulation reverted: {0}")]
    SimulationReverted(String),
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
    #[error("Transaction {hash:?} was not confirmed within {timeout:?}")]
    ConfirmationTimeout { hash: TxHash, timeout: Duration },
    #[error("No transaction of the batch was submitted: {0}")]
    NothingSubmitted(String),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<ChainError> for MinterError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::Unavailable(msg) => MinterError::NetworkUnavailable(msg),
            ChainError::Reverted(msg) => MinterError::SimulationReverted(msg),
            ChainError::Rejected(msg) => MinterError::TransactionFailed(msg),
            ChainError::Timeout(hash, timeout) => MinterError::ConfirmationTimeout { hash, timeout },
        }
    }
}

/// A wei amount derived from the settings does not fit in 128 bits
pub(crate) fn amount_overflow(what: &str) -> MinterError {
    MinterError::Config(ConfigError::ValidationError(format!("{} overflows", what)))
}

fn ether(wei: &u128) -> String {
    format_ether(*wei)
}
