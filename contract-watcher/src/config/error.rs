use derive_more::Display;

#[derive(Debug, Display, PartialEq)]
pub enum ConfigError {
    #[display("at least one contract address is required")]
    NoContract,
    #[display("no filters created")]
    NoFiltersCreated,
    #[display("contract address cannot be empty")]
    EmptyContractAddress,
    #[display("invalid contract address {_0}")]
    InvalidAddress(String),
}

impl std::error::Error for ConfigError {}
