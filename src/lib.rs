pub mod types;
pub mod config;
pub mod error;
pub mod chain;
pub mod accounts;
pub mod fees;
pub mod splitter;
pub mod invoker;
pub mod minter;
pub mod utils;

pub use chain::{ChainClient, MockChain, RpcChainClient};
pub use config::Config;
pub use error::MinterError;
pub use minter::{generate_account, Minter, RunReport};
