use crate::accounts::load_master;
use crate::chain::MockChain;
use crate::config::Config;
use crate::types::Account;


const MASTER_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

/// 10 ether
const FUNDS: u128 = 10_000_000_000_000_000_000;

fn test_config(mints: usize, layers: usize, send_back: bool) -> Config {
    Config::from_toml_str(&format!(
        r#"
        CHAIN_NAME = "Rinkeby"
        CONTRACT_ADDRESS = "0x2222222222222222222222222222222222222222"
        MINT_FUNCTION_NAME = "mint"
        MINT_PRICE = "0.01"
        NUMBER_OF_MINTS = {}
        EXTRA_MIXING_LAYERS = {}
        SEND_BACK = {}
        "#,
        mints, layers, send_back
    ))
    .expect("Failed to parse test settings")
}

fn setup(mints: usize, layers: usize, send_back: bool) -> (Config, MockChain, Account) {
    let config = test_config(mints, layers, send_back);
    let chain = MockChain::new(config.chain_id, config.contract_address());
    let master = load_master(MASTER_KEY).expect("Failed to load master key");
    chain.set_balance(master.address, FUNDS);
    (config, chain, master)
}
