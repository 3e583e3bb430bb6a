pub mod abis;
pub mod checked_headers;
mod config;
pub mod contract_tables;
pub mod contracts;
pub mod converter;
mod diesel;
pub mod headers;
mod lru;
pub mod poller;
pub mod provider;
mod repos;
pub mod transformer;
pub mod values;

use std::time::Duration;

use tokio::time;

pub use abis::{AbiError, AbiParser, AbiRegistry, EtherscanRegistry, ParsedAbi};
pub use checked_headers::HeaderLedger;
pub use config::{Config, ConfigError, ContractConfig};
pub use contract_tables::{
    ContractTableError, EventRepository, MethodRepository, PollResult, SyncMode,
};
pub use contracts::{ArgFilter, Contract};
pub use converter::{convert, convert_batch, ConversionError, DecodedLog};
pub use headers::{continuous_headers, Header, UnsavedHeader};
pub use poller::{Poller, PollerError};
pub use provider::{FetchError, Provider, ProviderError};
pub use repos::*;
pub use transformer::{Transformer, TransformerError};
pub use values::DecodedValue;

#[cfg(feature = "postgres")]
pub type WatcherRepo = PostgresRepo;

#[cfg(feature = "postgres")]
pub type WatcherRepoPool = PostgresRepoPool;

#[cfg(feature = "postgres")]
pub type WatcherRepoConn<'a> = PostgresRepoConn<'a>;

#[cfg(feature = "postgres")]
pub type WatcherRepoClient = PostgresRepoRawQueryClient;

#[cfg(feature = "postgres")]
pub type WatcherRepoTxnClient<'a> = PostgresRepoRawQueryTxnClient<'a>;

/// Creates `headers` and `checked_headers` when they do not exist yet.
pub async fn run_internal_migrations(client: &WatcherRepoClient) -> Result<(), RepoError> {
    WatcherRepo::migrate(client, WatcherRepo::get_internal_migrations()).await
}

/// Initializes `transformer`, then executes it every `execution_interval_ms`.
///
/// A failed run is logged and retried on the next tick, resuming from the header
/// it stopped at. Only initialization errors are returned.
pub async fn watch<P: Provider>(mut transformer: Transformer<P>) -> Result<(), TransformerError> {
    transformer.init().await?;

    let mut interval =
        time::interval(Duration::from_millis(transformer.config().execution_interval_ms));

    loop {
        interval.tick().await;

        if let Err(error) = transformer.execute().await {
            tracing::error!("error executing transformer: {}", error);
        }
    }
}
