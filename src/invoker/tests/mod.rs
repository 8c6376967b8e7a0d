use crate::accounts::{derive, load_master};
use crate::chain::MockChain;
use crate::config::Config;
use crate::types::Account;


const MASTER_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

/// 0.01 ether
const MINT_PRICE: u128 = 10_000_000_000_000_000;

/// 10 ether
const FUNDS: u128 = 10_000_000_000_000_000_000;

fn test_config(nonce_policy: &str) -> Config {
    Config::from_toml_str(&format!(
        r#"
        CHAIN_NAME = "Sepolia"
        CONTRACT_ADDRESS = "0x2222222222222222222222222222222222222222"
        MINT_FUNCTION_NAME = "mint"
        MINT_PRICE = "0.01"
        NUMBER_OF_MINTS = 4

        [ADVANCED]
        NONCE_POLICY = "{}"
        "#,
        nonce_policy
    ))
    .expect("Failed to parse test settings")
}

fn setup(nonce_policy: &str) -> (Config, MockChain, Account) {
    let config = test_config(nonce_policy);
    let chain = MockChain::new(config.chain_id, config.contract_address());
    let master = load_master(MASTER_KEY).expect("Failed to load master key");
    chain.set_balance(master.address, FUNDS);
    (config, chain, master)
}

/// `n` derived accounts, each holding `balance`
fn funded_accounts(chain: &MockChain, master: &Account, n: usize, balance: u128) -> Vec<Account> {
    let accounts = derive(master, n);
    for account in &accounts {
        chain.set_balance(account.address, balance);
    }
    accounts
}
