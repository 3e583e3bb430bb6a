use ethers::abi::Token;
use ethers::types::{Address, H256, I256};
use ethers::utils::{hex, to_checksum};

/// A decoded ABI value in one of the shapes the watcher knows how to store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedValue {
    /// Decimal representation of an `intN`/`uintN`.
    BigInt(String),
    Address(Address),
    /// A 32-byte fixed array.
    Hash(H256),
    Bool(bool),
    Text(String),
    Bytes(Vec<u8>),
}

impl DecodedValue {
    /// Returns `None` for tokens the watcher refuses to stringify (arrays, tuples).
    pub fn from_token(token: Token) -> Option<Self> {
        match token {
            Token::Uint(value) => Some(Self::BigInt(value.to_string())),
            Token::Int(value) => Some(Self::BigInt(I256::from_raw(value).to_string())),
            Token::Address(address) => Some(Self::Address(address)),
            Token::FixedBytes(bytes) if bytes.len() == 32 => {
                Some(Self::Hash(H256::from_slice(&bytes)))
            }
            Token::FixedBytes(bytes) | Token::Bytes(bytes) => Some(Self::Bytes(bytes)),
            Token::Bool(value) => Some(Self::Bool(value)),
            Token::String(value) => Some(Self::Text(value)),
            Token::Array(_) | Token::FixedArray(_) | Token::Tuple(_) => None,
        }
    }

    /// Address harvested for method polling, if any.
    pub fn harvested_address(&self) -> Option<Address> {
        match self {
            Self::Address(address) => Some(*address),
            _ => None,
        }
    }

    /// Hash harvested for method polling, if any.
    ///
    /// Plain `bytes` of exactly 32 bytes count too: plenty of ABIs declare `bytes32`
    /// values as `bytes`.
    pub fn harvested_hash(&self) -> Option<H256> {
        match self {
            Self::Hash(hash) => Some(*hash),
            Self::Bytes(bytes) if bytes.len() == 32 => Some(H256::from_slice(bytes)),
            _ => None,
        }
    }
}

impl std::fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BigInt(value) | Self::Text(value) => f.write_str(value),
            Self::Address(address) => f.write_str(&to_checksum(address, None)),
            Self::Hash(hash) => write!(f, "0x{}", hex::encode(hash.as_bytes())),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Bytes(bytes) => write!(f, "0x{}", hex::encode(bytes)),
        }
    }
}

/// Canonical form used to compare values against configured argument filters.
pub fn canonicalize(value: &str) -> String {
    if value.starts_with("0x") || value.starts_with("0X") {
        value.to_lowercase()
    } else {
        value.to_string()
    }
}
