//! Call data for contract functions taking static arguments.

use ethers::abi::{self, ParamType, Token};
use ethers::types::{Address, U256};

/// A static ABI argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallArg {
    Uint(u128),
    Address(Address),
    Bool(bool),
}

impl CallArg {
    pub fn param_type(&self) -> ParamType {
        match self {
            CallArg::Uint(_) => ParamType::Uint(256),
            CallArg::Address(_) => ParamType::Address,
            CallArg::Bool(_) => ParamType::Bool,
        }
    }

    pub fn token(&self) -> Token {
        match self {
            CallArg::Uint(value) => Token::Uint(U256::from(*value)),
            CallArg::Address(address) => Token::Address(*address),
            CallArg::Bool(value) => Token::Bool(*value),
        }
    }
}

/// e.g. `mint(uint256,address)`
pub fn function_signature(name: &str, args: &[CallArg]) -> String {
    let types: Vec<String> = args.iter().map(|arg| arg.param_type().to_string()).collect();
    format!("{}({})", name, types.join(","))
}

/// First four bytes of keccak256 of `name(types...)`
pub fn selector(name: &str, args: &[CallArg]) -> [u8; 4] {
    let params: Vec<ParamType> = args.iter().map(CallArg::param_type).collect();
    abi::short_signature(name, &params)
}

/// Call data for `name(args...)`
pub fn encode_call(name: &str, args: &[CallArg]) -> Vec<u8> {
    let tokens: Vec<Token> = args.iter().map(CallArg::token).collect();
    let mut data = selector(name, args).to_vec();
    data.extend(abi::encode(&tokens));
    data
}

/// Decode the first return word as an unsigned integer.
/// None if the data is not a uint256 or the value does not fit in 128 bits.
pub fn decode_uint(data: &[u8]) -> Option<u128> {
    let value = abi::decode(&[ParamType::Uint(256)], data)
        .ok()?
        .into_iter()
        .next()?
        .into_uint()?;
    u128::try_from(value).ok()
}
