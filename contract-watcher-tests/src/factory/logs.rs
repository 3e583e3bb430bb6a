use std::str::FromStr;

use contract_watcher::Header;
use ethers::abi::{encode, Token};
use ethers::types::{Address, Bytes, Log, H256, U256, U64};

use super::TRANSFER_TOPIC;

pub fn transfer_log(
    contract_address: &str,
    header: &Header,
    from: Address,
    to: Address,
    log_index: u64,
) -> Log {
    Log {
        address: Address::from_str(contract_address).unwrap(),
        topics: vec![h256(TRANSFER_TOPIC), H256::from(from), H256::from(to)],
        data: Bytes::from(encode(&[Token::Uint(U256::from(1663_u64))])),
        block_hash: Some(h256(&header.hash)),
        block_number: Some(U64::from(header.block_number as u64)),
        transaction_hash: Some(H256::from_low_u64_be(header.block_number as u64 + log_index)),
        transaction_index: Some(U64::from(89)),
        log_index: Some(U256::from(log_index)),
        transaction_log_index: None,
        log_type: None,
        removed: Some(false),
    }
}

fn h256(str: &str) -> H256 {
    H256::from_str(str).unwrap()
}
