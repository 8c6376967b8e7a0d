use ethers::types::Address;

/// Gas consumed by a plain value transfer
pub const DEFAULT_GAS: u64 = 21_000;

/// Gas limit attached to every contract call unless the settings override it
pub const CONTRACT_FUNCTION_GAS: u64 = 500_000;

/// How long the anchor transaction of a batch may take to confirm
pub const RECEIPT_TIMEOUT_SECONDS: u64 = 10;

/// Multiplier applied to estimated multi mode fees
pub const FEES_MULT_FACTOR: f64 = 1.001;

/// Wei per ether
pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// Sender used when simulating a mint call for fee estimation
pub fn simulation_sender() -> Address {
    Address::from_low_u64_be(0xdead)
}

/// Supported chains, by settings name and chain ID
pub const CHAINS: &[(&str, u64)] = &[
    ("Ethereum", 1),
    ("Ropsten", 3),
    ("Rinkeby", 4),
    ("Kovan", 42),
    ("Polygon", 137),
    ("Mumbai", 80001),
    ("Sepolia", 11155111),
];

/// Chain ID for a settings chain name
pub fn chain_id(name: &str) -> Option<u64> {
    CHAINS
        .iter()
        .find(|(chain, _)| *chain == name)
        .map(|(_, id)| *id)
}
