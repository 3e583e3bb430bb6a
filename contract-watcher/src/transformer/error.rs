use derive_more::Display;

use crate::abis::AbiError;
use crate::config::ConfigError;
use crate::contract_tables::ContractTableError;
use crate::converter::ConversionError;
use crate::poller::PollerError;
use crate::provider::FetchError;
use crate::RepoError;

#[derive(Debug, Display)]
pub enum TransformerError {
    #[display("no initialized contracts")]
    NoInitializedContracts,
    #[display("config error: {_0}")]
    Config(ConfigError),
    #[display("repo error: {_0}")]
    Repo(RepoError),
    #[display("error parsing abi of {address}: {error}")]
    Abi { address: String, error: AbiError },
    #[display("error fetching logs at block {block}: {error}")]
    Fetch { block: i64, error: FetchError },
    #[display("error converting logs of {address} at block {block}: {error}")]
    Conversion {
        address: String,
        block: i64,
        error: ConversionError,
    },
    #[display("error persisting {event} logs of {address} at block {block}: {error}")]
    Persist {
        address: String,
        event: String,
        block: i64,
        error: ContractTableError,
    },
    #[display("error polling {address} at block {block}: {error}")]
    Poll {
        address: String,
        block: i64,
        error: PollerError,
    },
}

impl std::error::Error for TransformerError {}

impl From<ConfigError> for TransformerError {
    fn from(error: ConfigError) -> Self {
        TransformerError::Config(error)
    }
}

impl From<RepoError> for TransformerError {
    fn from(error: RepoError) -> Self {
        TransformerError::Repo(error)
    }
}
