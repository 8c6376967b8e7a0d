//! Master account handling and the deterministic chain of derived accounts.

use sha2::{Digest, Sha256};
use crate::chain::{ChainClient, ChainError};
use crate::error::MinterError;
use crate::types::{format_ether, Account};

/// An endless, restartable sequence of accounts derived from a master key.
///
/// The chain keeps a rolling secret string, starting with the master key as 0x-prefixed hex.
/// Each step replaces it with the hex of its SHA-256 digest; the digest is the next signing key.
/// The same master key always yields the same accounts in the same order.
#[derive(Debug, Clone)]
pub struct AccountChain {
    rolling: String,
    next_id: u64,
}

impl AccountChain {
    pub fn new(master: &Account) -> Self {
        Self {
            rolling: master.secret_hex(),
            next_id: master.id + 1,
        }
    }
}

impl Iterator for AccountChain {
    type Item = Account;

    fn next(&mut self) -> Option<Account> {
        loop {
            let digest = Sha256::digest(self.rolling.as_bytes());
            self.rolling = hex::encode(&digest);
            // a digest outside the curve order is skipped; the sequence stays deterministic
            if let Ok(account) = Account::from_bytes(self.next_id, &digest) {
                self.next_id += 1;
                return Some(account);
            }
        }
    }
}

/// The first `n` accounts derived from `master`
pub fn derive(master: &Account, n: usize) -> Vec<Account> {
    AccountChain::new(master).take(n).collect()
}

/// Master account from a hex encoded secret
pub fn load_master(private_key: &str) -> Result<Account, MinterError> {
    Account::from_hex(0, private_key)
}

/// A fresh master account from the thread RNG
pub fn generate_master() -> Account {
    Account::random(0)
}

/// Split accounts into consecutive layers of `layer_size`
pub fn partition_layers(accounts: &[Account], layer_size: usize) -> Vec<Vec<Account>> {
    if layer_size == 0 {
        return Vec::new();
    }
    accounts.chunks(layer_size).map(<[Account]>::to_vec).collect()
}

/// Log one line per account, optionally with balance and private key.
/// Returns the lines for the caller to show or keep.
pub async fn display_accounts<C: ChainClient + ?Sized>(
    chain: &C,
    accounts: &[Account],
    balances: bool,
    secrets: bool,
) -> Result<Vec<String>, ChainError> {
    let mut lines = Vec::with_capacity(accounts.len());
    for account in accounts {
        let balance = if balances {
            format_ether(account.balance(chain).await?)
        } else {
            "?".to_string()
        };
        let line = format!("Address ({}): {:?}  |  Balance: {}", account.id, account.address, balance);
        tracing::info!("{}", line);
        lines.push(line);
        if secrets {
            let line = format!("PRIVATE KEY ({}): {}", account.id, account.secret_hex());
            tracing::info!("{}", line);
            lines.push(line);
        }
    }
    Ok(lines)
}
