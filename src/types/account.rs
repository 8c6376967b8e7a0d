use std::fmt;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use crate::chain::{ChainClient, ChainError};
use crate::error::MinterError;

/// An account the minter can sign for.
///
/// Balance and nonce are never stored here: they are queried from the chain on every access
/// because earlier steps of the same run keep changing them.
#[derive(Debug, Clone)]
pub struct Account {
    /// Display identifier. 0 for the master account, N for the Nth derived account
    pub id: u64,
    /// Signing key. Its `Debug` output shows the address only
    pub wallet: LocalWallet,
    /// Address derived from the key
    pub address: Address,
}

impl Account {
    pub fn new(id: u64, wallet: LocalWallet) -> Self {
        let address = wallet.address();
        Self { id, wallet, address }
    }

    /// Parse a hex encoded secret key, with or without the 0x prefix
    pub fn from_hex(id: u64, secret: &str) -> Result<Self, MinterError> {
        let secret = secret.trim();
        let digits = secret.strip_prefix("0x").unwrap_or(secret);
        let bytes = hex::decode(digits).map_err(|e| MinterError::InvalidKey(format!("not hex: {}", e)))?;
        Self::from_bytes(id, &bytes)
    }

    /// Build an account from a raw 32 byte secret key
    pub fn from_bytes(id: u64, secret: &[u8]) -> Result<Self, MinterError> {
        if secret.len() != 32 {
            return Err(MinterError::InvalidKey(format!("expected 32 bytes, got {}", secret.len())));
        }
        let wallet = LocalWallet::from_bytes(secret).map_err(|e| MinterError::InvalidKey(e.to_string()))?;
        Ok(Self::new(id, wallet))
    }

    /// A fresh key from the thread RNG
    pub fn random(id: u64) -> Self {
        Self::new(id, LocalWallet::new(&mut rand::thread_rng()))
    }

    pub fn secret_bytes(&self) -> Vec<u8> {
        self.wallet.signer().to_bytes().to_vec()
    }

    /// 0x prefixed lowercase hex of the secret key
    pub fn secret_hex(&self) -> String {
        format!("0x{}", hex::encode(self.secret_bytes()))
    }

    /// Current balance in wei
    pub async fn balance<C: ChainClient + ?Sized>(&self, chain: &C) -> Result<u128, ChainError> {
        chain.get_balance(&self.address).await
    }

    /// Current transaction count as known to the network
    pub async fn nonce<C: ChainClient + ?Sized>(&self, chain: &C) -> Result<u64, ChainError> {
        chain.get_transaction_count(&self.address).await
    }

    /// "(id) 0x1234…abcd" used in log lines
    pub fn label(&self) -> String {
        format!("({}) {}", self.id, self.address)
    }
}

impl PartialEq for Account {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.address == other.address
    }
}

impl Eq for Account {}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) {:?}", self.id, self.address)
    }
}
