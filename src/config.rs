//! Settings and secrets loading and validation.
//! Settings come from a TOML file, secrets from a JSON file. Both are read once at startup and the
//! resulting `Config` is passed by reference to everything that needs it.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use crate::types::constants::{self, CONTRACT_FUNCTION_GAS, DEFAULT_GAS, FEES_MULT_FACTOR, RECEIPT_TIMEOUT_SECONDS};
use crate::types::{parse_ether, Address};

lazy_static! {
    /// A Solidity function identifier
    pub static ref FUNCTION_NAME_PATTERN: Regex = Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap();
}

// ------------------------------------------------------------------------------------------------
// Settings
// ------------------------------------------------------------------------------------------------

/// What happens to a sender's nonce counter when one submission of a batch fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoncePolicy {
    /// The failed submission still consumes its nonce slot; the counter keeps advancing.
    /// If the network never saw the failed transaction, later ones wait behind the gap.
    #[default]
    AcceptGap,
    /// The nonce is re-read from the network before the next submission.
    Refetch,
}

/// User settings, as written in the settings file
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Settings {
    /// Name of the chain, one of `constants::CHAINS`
    pub chain_name: String,
    /// Address of the contract to mint from
    pub contract_address: Address,
    /// Name of the payable mint function (called without arguments)
    pub mint_function_name: String,
    /// Price of one mint in ether, e.g. "0.05"
    #[serde(deserialize_with = "ether_amount")]
    pub mint_price: String,
    /// Number of mints (and, in multi mode, of accounts per layer)
    pub number_of_mints: usize,
    /// Layers of accounts between master and the minting accounts (multi mode only)
    #[serde(default)]
    pub extra_mixing_layers: usize,
    /// Sweep leftovers back to master after minting (multi mode only)
    #[serde(default)]
    pub send_back: bool,
    /// Also write logs to a timestamped file in `logs/`
    #[serde(default)]
    pub logging: bool,
    /// Safety margin applied to estimated multi mode fees
    #[serde(default = "default_fees_mult_factor")]
    pub fees_mult_factor: f64,
    #[serde(default)]
    pub advanced: AdvancedSettings,
}

/// Settings most users never touch
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct AdvancedSettings {
    /// Gas of a plain transfer
    pub default_gas: u64,
    /// Gas limit of a contract call. Unused gas is refunded, so a generous value is safe
    pub contract_function_gas: u64,
    /// Bound on waiting for the anchor transaction of a batch
    pub receipt_timeout_secs: u64,
    pub nonce_policy: NoncePolicy,
}

impl Default for AdvancedSettings {
    fn default() -> Self {
        Self {
            default_gas: DEFAULT_GAS,
            contract_function_gas: CONTRACT_FUNCTION_GAS,
            receipt_timeout_secs: RECEIPT_TIMEOUT_SECONDS,
            nonce_policy: NoncePolicy::default(),
        }
    }
}

fn default_fees_mult_factor() -> f64 {
    FEES_MULT_FACTOR
}

/// Accept the mint price both as a TOML string and as a TOML number
fn ether_amount<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Text(String),
        Integer(u64),
        Float(f64),
    }
    Ok(match Amount::deserialize(deserializer)? {
        Amount::Text(text) => text,
        Amount::Integer(value) => value.to_string(),
        Amount::Float(value) => value.to_string(),
    })
}

// ------------------------------------------------------------------------------------------------
// Secrets
// ------------------------------------------------------------------------------------------------

/// Contents of the secrets file
#[derive(Deserialize, Clone)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Secrets {
    /// Hex encoded private key of the master account
    pub private_key: String,
    /// JSON-RPC endpoint
    pub provider: String,
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("private_key", &"<redacted>")
            .field("provider", &self.provider)
            .finish()
    }
}

impl Secrets {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let secrets_str = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&secrets_str)?)
    }
}

// ------------------------------------------------------------------------------------------------
// Error Types and Validation
// ------------------------------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileReadError(#[from] std::io::Error),
    #[error("Failed to parse settings: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to parse secrets: {0}")]
    SecretsParseError(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Validated settings plus the values derived from them
#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
    /// EIP-155 chain ID of `settings.chain_name`
    pub chain_id: u64,
    /// `settings.mint_price` in wei
    pub mint_price: u128,
}

impl Config {
    /// Load and validate settings from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config_str = fs::read_to_string(path)?;
        Self::from_toml_str(&config_str)
    }

    pub fn from_toml_str(config_str: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(config_str)?;
        Self::from_settings(settings)
    }

    pub fn from_settings(settings: Settings) -> Result<Self, ConfigError> {
        let chain_id = constants::chain_id(&settings.chain_name).ok_or_else(|| {
            let known: Vec<&str> = constants::CHAINS.iter().map(|(name, _)| *name).collect();
            ConfigError::ValidationError(format!(
                "Unknown chain {}, expected one of {}",
                settings.chain_name,
                known.join(", ")
            ))
        })?;
        let mint_price = parse_ether(&settings.mint_price)
            .map_err(|e| ConfigError::ValidationError(format!("MINT_PRICE: {}", e)))?;
        let config = Config { settings, chain_id, mint_price };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let settings = &self.settings;
        if !FUNCTION_NAME_PATTERN.is_match(&settings.mint_function_name) {
            return Err(ConfigError::ValidationError(format!(
                "MINT_FUNCTION_NAME {:?} is not a valid function name",
                settings.mint_function_name
            )));
        }
        if settings.number_of_mints == 0 {
            return Err(ConfigError::ValidationError("NUMBER_OF_MINTS must be positive".into()));
        }
        if self.mint_price.checked_mul(settings.number_of_mints as u128).is_none() {
            return Err(ConfigError::ValidationError("MINT_PRICE x NUMBER_OF_MINTS overflows".into()));
        }
        if !(settings.fees_mult_factor >= 1.0) || !settings.fees_mult_factor.is_finite() {
            return Err(ConfigError::ValidationError("FEES_MULT_FACTOR must be a number >= 1".into()));
        }
        if settings.advanced.default_gas == 0 || settings.advanced.contract_function_gas == 0 {
            return Err(ConfigError::ValidationError("Gas limits must be positive".into()));
        }
        if settings.advanced.receipt_timeout_secs == 0 {
            return Err(ConfigError::ValidationError("RECEIPT_TIMEOUT_SECS must be positive".into()));
        }
        Ok(())
    }

    pub fn number_of_mints(&self) -> usize {
        self.settings.number_of_mints
    }

    pub fn extra_mixing_layers(&self) -> usize {
        self.settings.extra_mixing_layers
    }

    /// Accounts derived in multi mode: one layer of `NUMBER_OF_MINTS` accounts per mixing layer,
    /// plus the minting layer
    pub fn total_accounts(&self) -> usize {
        self.number_of_mints() * (1 + self.extra_mixing_layers())
    }

    pub fn contract_address(&self) -> Address {
        self.settings.contract_address
    }

    pub fn mint_function(&self) -> &str {
        &self.settings.mint_function_name
    }

    pub fn default_gas(&self) -> u64 {
        self.settings.advanced.default_gas
    }

    pub fn contract_function_gas(&self) -> u64 {
        self.settings.advanced.contract_function_gas
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.advanced.receipt_timeout_secs)
    }

    pub fn nonce_policy(&self) -> NoncePolicy {
        self.settings.advanced.nonce_policy
    }
}
