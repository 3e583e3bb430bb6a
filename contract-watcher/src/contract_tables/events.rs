use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::abis::EventDescriptor;
use crate::checked_headers::HeaderLedger;
use crate::contracts::check_column_id;
use crate::converter::DecodedLog;
use crate::repos::{sql_identifier, RawQueryParam};
use crate::{ExecutesWithRawQuery, HasRawQueryClient, WatcherRepo, WatcherRepoClient};

use super::{text_param, ContractSchemas, ContractTableError, SyncMode};

/// Stores decoded logs in `<mode>_<address>.<event>_event` tables.
pub struct EventRepository {
    schemas: ContractSchemas,
}

impl EventRepository {
    pub fn new(client: Arc<Mutex<WatcherRepoClient>>, mode: SyncMode) -> Self {
        Self {
            schemas: ContractSchemas::new(client, mode),
        }
    }

    pub fn mode(&self) -> SyncMode {
        self.schemas.mode()
    }

    pub async fn create_contract_schema(
        &mut self,
        contract_address: &str,
    ) -> Result<bool, ContractTableError> {
        self.schemas.create_contract_schema(contract_address).await
    }

    pub async fn create_event_table(
        &mut self,
        contract_address: &str,
        event: &EventDescriptor,
    ) -> Result<bool, ContractTableError> {
        let columns = field_columns(event)?;
        let mode = self.mode();

        self.schemas
            .create_table(contract_address, &event.table_name(), |table_id| {
                create_event_table_query(mode, table_id, &columns)
            })
            .await
    }

    /// Writes `logs` in one transaction, ignoring rows that already exist.
    ///
    /// In header mode the transaction also marks each log's header as checked for
    /// this event, so stored rows and ledger marks never disagree.
    pub async fn persist_logs(
        &mut self,
        logs: &[DecodedLog],
        event: &EventDescriptor,
        contract_address: &str,
        contract_name: &str,
    ) -> Result<(), ContractTableError> {
        if logs.is_empty() {
            return Err(ContractTableError::EmptyLogs);
        }

        self.create_contract_schema(contract_address).await?;
        self.create_event_table(contract_address, event).await?;

        let mode = self.mode();
        let table_id = format!(
            "{}.{}",
            self.schemas.schema_name(contract_address)?,
            event.table_name()
        );
        let columns = field_columns(event)?;
        let query = insert_event_query(mode, &table_id, &columns);

        let mut client = self.schemas.client().lock().await;
        let txn_client = WatcherRepo::get_raw_query_txn_client(&mut client).await?;

        for log in logs {
            let values = event
                .fields
                .iter()
                .map(|field| {
                    log.values
                        .get(&field.name)
                        .ok_or_else(|| ContractTableError::MissingValue(field.name.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?;

            let mut params: Vec<RawQueryParam> = match mode {
                SyncMode::Header => vec![
                    &log.id as RawQueryParam,
                    &contract_name as RawQueryParam,
                    &log.raw as RawQueryParam,
                    &log.log_index as RawQueryParam,
                    &log.tx_index as RawQueryParam,
                ],
                SyncMode::Full => vec![
                    &log.id as RawQueryParam,
                    &contract_name as RawQueryParam,
                    &log.block_number as RawQueryParam,
                    &log.tx_hash as RawQueryParam,
                ],
            };
            params.extend(values.into_iter().map(|value| value as RawQueryParam));

            WatcherRepo::execute_raw_query_in_txn(&txn_client, &query, &params).await?;
        }

        if mode == SyncMode::Header {
            let check_column = check_column_id(&event.name, contract_address);
            let header_ids: BTreeSet<i64> = logs.iter().map(|log| log.id).collect();

            for header_id in header_ids {
                HeaderLedger::mark_header_checked_in_txn(&txn_client, header_id, &check_column)
                    .await?;
            }
        }

        WatcherRepo::commit_raw_query_txns(txn_client).await?;

        Ok(())
    }

    pub fn check_schema_cache(&self, schema: &str) -> bool {
        self.schemas.check_schema_cache(schema)
    }

    pub fn check_table_cache(&self, table_id: &str) -> bool {
        self.schemas.check_table_cache(table_id)
    }
}

/// `(column name, storage type)` per event field, in ABI order.
fn field_columns(
    event: &EventDescriptor,
) -> Result<Vec<(String, &'static str)>, ContractTableError> {
    event
        .fields
        .iter()
        .map(|field| {
            let column = field.column_name();
            sql_identifier(&column)?;

            Ok((column, field.storage_type))
        })
        .collect()
}

fn create_event_table_query(mode: SyncMode, table_id: &str, columns: &[(String, &str)]) -> String {
    let field_columns: String = columns
        .iter()
        .map(|(column, storage_type)| format!(", {column} {storage_type} NOT NULL"))
        .collect();

    match mode {
        SyncMode::Header => format!(
            "CREATE TABLE IF NOT EXISTS {table_id} (
                id BIGSERIAL PRIMARY KEY,
                header_id BIGINT NOT NULL REFERENCES headers (id) ON DELETE CASCADE,
                token_name TEXT NOT NULL,
                raw_log JSONB,
                log_idx BIGINT NOT NULL,
                tx_idx BIGINT NOT NULL{field_columns},
                UNIQUE (header_id, tx_idx, log_idx)
            )"
        ),
        SyncMode::Full => format!(
            "CREATE TABLE IF NOT EXISTS {table_id} (
                id BIGSERIAL PRIMARY KEY,
                log_id BIGINT NOT NULL UNIQUE,
                token_name TEXT NOT NULL,
                block BIGINT NOT NULL,
                tx VARCHAR(66) NOT NULL{field_columns}
            )"
        ),
    }
}

fn insert_event_query(mode: SyncMode, table_id: &str, columns: &[(String, &str)]) -> String {
    let (fixed_columns, fixed_params, conflict_target) = match mode {
        SyncMode::Header => (
            "header_id, token_name, raw_log, log_idx, tx_idx",
            "$1, $2, $3, $4, $5",
            "",
        ),
        SyncMode::Full => ("log_id, token_name, block, tx", "$1, $2, $3, $4", " (log_id)"),
    };
    let fixed_count = fixed_params.split(", ").count();

    let field_columns: String = columns.iter().map(|(column, _)| format!(", {column}")).collect();
    let field_params: String = columns
        .iter()
        .enumerate()
        .map(|(index, (_, storage_type))| {
            format!(", {}", text_param(fixed_count + index + 1, storage_type))
        })
        .collect();

    format!(
        "INSERT INTO {table_id} ({fixed_columns}{field_columns})
        VALUES ({fixed_params}{field_params})
        ON CONFLICT{conflict_target} DO NOTHING"
    )
}
