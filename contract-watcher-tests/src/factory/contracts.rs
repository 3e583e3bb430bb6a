use contract_watcher::ContractConfig;
use ethers::types::Address;

use super::TOKEN_ABI;

pub const TOKEN_CONTRACT_NAME: &str = "TrueUSD";

/// A fresh lower-cased address, so tests never share contract schemas.
pub fn random_address() -> String {
    let bytes: [u8; 20] = rand::random();

    format!("{:?}", Address::from(bytes))
}

pub fn token_contract(address: &str, starting_block: i64) -> ContractConfig {
    ContractConfig::new(TOKEN_CONTRACT_NAME)
        .add_address(address, starting_block)
        .with_abi(address, TOKEN_ABI)
        .with_events(address, &["Transfer"])
}

pub fn token_contract_with_balances(address: &str, starting_block: i64) -> ContractConfig {
    token_contract(address, starting_block).with_methods(address, &["balanceOf"])
}
