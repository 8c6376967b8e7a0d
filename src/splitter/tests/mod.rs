use crate::accounts::{derive, load_master};
use crate::chain::MockChain;
use crate::config::Config;
use crate::types::Account;


const MASTER_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

/// 0.1 ether
const AMOUNT: u128 = 100_000_000_000_000_000;

/// 10 ether
const FUNDS: u128 = 10_000_000_000_000_000_000;

fn test_config(nonce_policy: &str) -> Config {
    Config::from_toml_str(&format!(
        r#"
        CHAIN_NAME = "Ethereum"
        CONTRACT_ADDRESS = "0x2222222222222222222222222222222222222222"
        MINT_FUNCTION_NAME = "mint"
        MINT_PRICE = "0.01"
        NUMBER_OF_MINTS = 3

        [ADVANCED]
        NONCE_POLICY = "{}"
        "#,
        nonce_policy
    ))
    .expect("Failed to parse test settings")
}

/// A funded master account, three derived accounts and an empty mock chain
fn setup(nonce_policy: &str) -> (Config, MockChain, Account, Vec<Account>) {
    let config = test_config(nonce_policy);
    let chain = MockChain::new(config.chain_id, config.contract_address());
    let master = load_master(MASTER_KEY).expect("Failed to load master key");
    chain.set_balance(master.address, FUNDS);
    let accounts = derive(&master, 3);
    (config, chain, master, accounts)
}
