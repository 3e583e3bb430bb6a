mod events;
mod methods;

use std::sync::Arc;

use derive_more::Display;
use tokio::sync::Mutex;

use crate::lru::{bounded, LruCache};
use crate::repos::sql_identifier;
use crate::{ExecutesWithRawQuery, LoadsDataWithRawQuery, RepoError, WatcherRepo, WatcherRepoClient};

pub use events::EventRepository;
pub use methods::{MethodRepository, PollResult};

const SCHEMA_CACHE_SIZE: usize = 100;
const TABLE_CACHE_SIZE: usize = 1000;

#[derive(Debug, Display)]
pub enum ContractTableError {
    #[display("cannot persist an empty batch of logs")]
    EmptyLogs,
    #[display("no contract address specified")]
    NoContractAddress,
    #[display("{method} takes {expected} arguments, got {got}")]
    ArgumentCountMismatch {
        method: String,
        expected: usize,
        got: usize,
    },
    #[display("no decoded value for field {_0}")]
    MissingValue(String),
    #[display("repo error: {_0}")]
    Repo(RepoError),
}

impl std::error::Error for ContractTableError {}

impl From<RepoError> for ContractTableError {
    fn from(error: RepoError) -> Self {
        ContractTableError::Repo(error)
    }
}

/// Which header source a watcher runs against. Decides the contract schema
/// prefix and the shape of event tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncMode {
    /// Logs reference `headers(id)`.
    #[default]
    Header,
    /// Logs reference a raw log id and carry their own block and tx hash.
    Full,
}

impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::Header => "header",
            SyncMode::Full => "full",
        }
    }

    pub fn schema_name(&self, contract_address: &str) -> String {
        format!("{}_{}", self.as_str(), contract_address.to_lowercase())
    }
}

/// Creates per-contract schemas and tables on demand, remembering (within
/// bounds) which ones are known to exist.
pub(crate) struct ContractSchemas {
    client: Arc<Mutex<WatcherRepoClient>>,
    mode: SyncMode,
    schemas: LruCache<String>,
    tables: LruCache<String>,
}

impl ContractSchemas {
    pub fn new(client: Arc<Mutex<WatcherRepoClient>>, mode: SyncMode) -> Self {
        Self {
            client,
            mode,
            schemas: bounded(SCHEMA_CACHE_SIZE),
            tables: bounded(TABLE_CACHE_SIZE),
        }
    }

    pub fn client(&self) -> &Arc<Mutex<WatcherRepoClient>> {
        &self.client
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    pub fn schema_name(&self, contract_address: &str) -> Result<String, ContractTableError> {
        if contract_address.is_empty() {
            return Err(ContractTableError::NoContractAddress);
        }

        let schema = self.mode.schema_name(contract_address);
        sql_identifier(&schema)?;

        Ok(schema)
    }

    /// `Ok(true)` only when this call created the schema.
    pub async fn create_contract_schema(
        &mut self,
        contract_address: &str,
    ) -> Result<bool, ContractTableError> {
        let schema = self.schema_name(contract_address)?;

        if self.schemas.contains(&schema) {
            return Ok(false);
        }

        let client = self.client.lock().await;
        let exists = WatcherRepo::load_exists_from_raw_query(
            &client,
            "SELECT EXISTS (SELECT 1 FROM information_schema.schemata WHERE schema_name = $1)",
            &[&schema],
        )
        .await?;

        if !exists {
            let query = format!("CREATE SCHEMA IF NOT EXISTS {schema}");
            WatcherRepo::execute_raw_query(&client, &query).await?;
        }

        self.schemas.insert(schema);

        Ok(!exists)
    }

    /// `Ok(true)` only when this call created the table. `create_table` receives
    /// the schema-qualified table name.
    pub async fn create_table(
        &mut self,
        contract_address: &str,
        table: &str,
        create_table: impl FnOnce(&str) -> String,
    ) -> Result<bool, ContractTableError> {
        let schema = self.schema_name(contract_address)?;
        let table_id = format!("{schema}.{}", sql_identifier(table)?);

        if self.tables.contains(&table_id) {
            return Ok(false);
        }

        let client = self.client.lock().await;
        let exists = WatcherRepo::load_exists_from_raw_query(
            &client,
            "SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = $1 AND table_name = $2
            )",
            &[&schema, &table],
        )
        .await?;

        if !exists {
            WatcherRepo::execute_raw_query(&client, &create_table(&table_id)).await?;
        }

        self.tables.insert(table_id);

        Ok(!exists)
    }

    pub fn check_schema_cache(&self, schema: &str) -> bool {
        self.schemas.contains(schema)
    }

    pub fn check_table_cache(&self, table_id: &str) -> bool {
        self.tables.contains(table_id)
    }
}

/// `CAST($n::TEXT AS <type>)`: every decoded value travels as its canonical string.
fn text_param(position: usize, storage_type: &str) -> String {
    format!("CAST(${position}::TEXT AS {storage_type})")
}
