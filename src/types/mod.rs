pub mod account;
pub mod constants;
pub mod transaction;
pub mod units;

pub use ethers::types::{Address, TxHash};

pub use account::Account;
pub use transaction::{BatchEntry, BatchResult, Receipt, TransactionDraft, TransactionRecord, TxOutcome};
pub use units::{format_ether, parse_ether, UnitsError};
