use derive_more::Display;
use std::fmt::Debug;

use serde::de::DeserializeOwned;
use tokio_postgres::types::ToSql;

use crate::headers::{Header, UnsavedHeader};

#[derive(Debug, Display)]
pub enum RepoError {
    NotConnected,
    Unknown(String),
}

impl std::error::Error for RepoError {}

pub type RawQueryParam<'a> = &'a (dyn ToSql + Sync);

/// Schema, table and column names derived from ABIs end up inside SQL text,
/// so only plain lower-case identifiers are let through.
pub fn sql_identifier(name: &str) -> Result<&str, RepoError> {
    let mut chars = name.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

    if valid {
        Ok(name)
    } else {
        Err(RepoError::Unknown(format!("invalid sql identifier: {name:?}")))
    }
}

#[async_trait::async_trait]
pub trait Repo:
    Sync + Send + Migratable + ExecutesWithRawQuery + LoadsDataWithRawQuery + Clone + Debug
{
    type Pool;
    type Conn<'a>;

    async fn get_pool(&self, max_size: u32) -> Result<Self::Pool, RepoError>;
    async fn get_conn<'a>(pool: &'a Self::Pool) -> Result<Self::Conn<'a>, RepoError>;

    async fn create_headers<'a>(
        conn: &mut Self::Conn<'a>,
        headers: &[UnsavedHeader],
    ) -> Result<Vec<Header>, RepoError>;
    async fn get_first_block_number<'a>(
        conn: &mut Self::Conn<'a>,
        eth_node_fingerprint: &str,
    ) -> Result<Option<i64>, RepoError>;
}

#[async_trait::async_trait]
pub trait HasRawQueryClient {
    type RawQueryClient: Send + Sync;
    type RawQueryTxnClient<'a>: Send + Sync;

    async fn get_raw_query_client(&self) -> Result<Self::RawQueryClient, RepoError>;
    async fn get_raw_query_txn_client<'a>(
        client: &'a mut Self::RawQueryClient,
    ) -> Result<Self::RawQueryTxnClient<'a>, RepoError>;
}

#[async_trait::async_trait]
pub trait ExecutesWithRawQuery: HasRawQueryClient {
    async fn execute_raw_query(client: &Self::RawQueryClient, query: &str)
        -> Result<u64, RepoError>;
    async fn execute_raw_query_with_params(
        client: &Self::RawQueryClient,
        query: &str,
        params: &[RawQueryParam<'_>],
    ) -> Result<u64, RepoError>;
    async fn execute_raw_query_in_txn<'a>(
        client: &Self::RawQueryTxnClient<'a>,
        query: &str,
        params: &[RawQueryParam<'_>],
    ) -> Result<u64, RepoError>;
    async fn commit_raw_query_txns<'a>(client: Self::RawQueryTxnClient<'a>)
        -> Result<(), RepoError>;
}

#[async_trait::async_trait]
pub trait LoadsDataWithRawQuery: HasRawQueryClient {
    async fn load_data_from_raw_query<Data: Send + DeserializeOwned>(
        client: &Self::RawQueryClient,
        query: &str,
        params: &[RawQueryParam<'_>],
    ) -> Result<Option<Data>, RepoError>;
    async fn load_data_list_from_raw_query<Data: Send + DeserializeOwned>(
        client: &Self::RawQueryClient,
        query: &str,
        params: &[RawQueryParam<'_>],
    ) -> Result<Vec<Data>, RepoError>;

    /// Runs an `EXISTS (...)` style query returning a single boolean.
    async fn load_exists_from_raw_query(
        client: &Self::RawQueryClient,
        query: &str,
        params: &[RawQueryParam<'_>],
    ) -> Result<bool, RepoError>;
}

pub trait RepoMigrations: Migratable {
    fn create_headers_migration() -> &'static [&'static str];
    fn create_checked_headers_migration() -> &'static [&'static str];

    fn get_internal_migrations() -> Vec<&'static str> {
        [
            Self::create_headers_migration(),
            Self::create_checked_headers_migration(),
        ]
        .concat()
    }
}

#[async_trait::async_trait]
pub trait Migratable: ExecutesWithRawQuery + Sync + Send {
    async fn migrate(
        client: &Self::RawQueryClient,
        migrations: Vec<impl AsRef<str> + Send + Sync>,
    ) -> Result<(), RepoError>
    where
        Self: Sized,
    {
        for migration in migrations {
            Self::execute_raw_query(client, migration.as_ref()).await?;
        }

        Ok(())
    }
}

pub struct SQLikeMigrations;

impl SQLikeMigrations {
    /// Headers are written by the upstream header sync; the table is created here
    /// so the watcher can run against a fresh database.
    pub fn create_headers() -> &'static [&'static str] {
        &[
            "CREATE TABLE IF NOT EXISTS headers (
                id BIGSERIAL PRIMARY KEY,
                block_number BIGINT NOT NULL,
                hash VARCHAR(66) NOT NULL,
                raw JSONB,
                block_timestamp BIGINT NOT NULL,
                eth_node_fingerprint VARCHAR(128) NOT NULL,
                UNIQUE (block_number, eth_node_fingerprint)
            )",
            "CREATE INDEX IF NOT EXISTS headers_block_number_index
            ON headers(block_number)",
        ]
    }

    pub fn create_checked_headers() -> &'static [&'static str] {
        &["CREATE TABLE IF NOT EXISTS checked_headers (
                id BIGSERIAL PRIMARY KEY,
                header_id BIGINT UNIQUE NOT NULL REFERENCES headers (id) ON DELETE CASCADE
            )"]
    }
}
