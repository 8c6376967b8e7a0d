use ethers::types::U256;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnitsError {
    #[error("Invalid ether amount: {0}")]
    InvalidAmount(String),
    #[error("Amount overflows: {0}")]
    Overflow(String),
}

/// Parse a decimal ether amount such as "0.05" into wei
pub fn parse_ether(amount: &str) -> Result<u128, UnitsError> {
    let amount = amount.trim();
    if amount.is_empty() || amount.starts_with('-') {
        return Err(UnitsError::InvalidAmount(amount.to_string()));
    }
    let wei = ethers::utils::parse_ether(amount)
        .map_err(|e| UnitsError::InvalidAmount(format!("{}: {}", amount, e)))?;
    u128::try_from(wei).map_err(|_| UnitsError::Overflow(amount.to_string()))
}

/// Format wei as a decimal ether amount with trailing zeros trimmed
pub fn format_ether(wei: u128) -> String {
    let formatted = ethers::utils::format_ether(U256::from(wei));
    match formatted.split_once('.') {
        Some((whole, fraction)) if fraction.trim_end_matches('0').is_empty() => whole.to_string(),
        Some((whole, fraction)) => format!("{}.{}", whole, fraction.trim_end_matches('0')),
        None => formatted,
    }
}
