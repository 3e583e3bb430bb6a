use std::sync::Arc;

use tokio::sync::Mutex;

use crate::abis::{Field, MethodDescriptor};
use crate::repos::{sql_identifier, RawQueryParam};
use crate::{ExecutesWithRawQuery, WatcherRepo, WatcherRepoClient};

use super::{text_param, ContractSchemas, ContractTableError, SyncMode};

/// One historical call: the inputs it was made with and what it returned at `block`.
#[derive(Debug, Clone, PartialEq)]
pub struct PollResult {
    pub method: String,
    pub block: i64,
    pub inputs: Vec<String>,
    pub output: String,
}

/// Stores poll results in `<mode>_<address>.<method>_method` tables.
pub struct MethodRepository {
    schemas: ContractSchemas,
}

impl MethodRepository {
    pub fn new(client: Arc<Mutex<WatcherRepoClient>>, mode: SyncMode) -> Self {
        Self {
            schemas: ContractSchemas::new(client, mode),
        }
    }

    pub async fn create_contract_schema(
        &mut self,
        contract_address: &str,
    ) -> Result<bool, ContractTableError> {
        self.schemas.create_contract_schema(contract_address).await
    }

    pub async fn create_method_table(
        &mut self,
        contract_address: &str,
        method: &MethodDescriptor,
    ) -> Result<bool, ContractTableError> {
        let columns = input_columns(method)?;

        self.schemas
            .create_table(contract_address, &method.table_name(), |table_id| {
                create_method_table_query(table_id, &columns, &method.output)
            })
            .await
    }

    pub async fn persist_result(
        &mut self,
        result: &PollResult,
        method: &MethodDescriptor,
        contract_address: &str,
        contract_name: &str,
    ) -> Result<(), ContractTableError> {
        if result.inputs.len() != method.inputs.len() {
            return Err(ContractTableError::ArgumentCountMismatch {
                method: method.name.clone(),
                expected: method.inputs.len(),
                got: result.inputs.len(),
            });
        }

        self.create_contract_schema(contract_address).await?;
        self.create_method_table(contract_address, method).await?;

        let table_id = format!(
            "{}.{}",
            self.schemas.schema_name(contract_address)?,
            method.table_name()
        );
        let query = insert_result_query(&table_id, &input_columns(method)?, &method.output);

        let mut params: Vec<RawQueryParam> =
            vec![&contract_name as RawQueryParam, &result.block as RawQueryParam];
        params.extend(result.inputs.iter().map(|input| input as RawQueryParam));
        params.push(&result.output);

        let client = self.schemas.client().lock().await;
        WatcherRepo::execute_raw_query_with_params(&client, &query, &params).await?;

        Ok(())
    }

    pub fn check_schema_cache(&self, schema: &str) -> bool {
        self.schemas.check_schema_cache(schema)
    }

    pub fn check_table_cache(&self, table_id: &str) -> bool {
        self.schemas.check_table_cache(table_id)
    }
}

fn input_columns(
    method: &MethodDescriptor,
) -> Result<Vec<(String, &'static str)>, ContractTableError> {
    method
        .inputs
        .iter()
        .map(|input| {
            let column = input.column_name();
            sql_identifier(&column)?;

            Ok((column, input.storage_type))
        })
        .collect()
}

fn create_method_table_query(table_id: &str, columns: &[(String, &str)], output: &Field) -> String {
    let input_columns: String = columns
        .iter()
        .map(|(column, storage_type)| format!(", {column} {storage_type} NOT NULL"))
        .collect();

    format!(
        "CREATE TABLE IF NOT EXISTS {table_id} (
            id BIGSERIAL PRIMARY KEY,
            token_name TEXT NOT NULL,
            block BIGINT NOT NULL{input_columns},
            returned {} NOT NULL
        )",
        output.storage_type
    )
}

fn insert_result_query(table_id: &str, columns: &[(String, &str)], output: &Field) -> String {
    let input_columns: String = columns.iter().map(|(column, _)| format!(", {column}")).collect();
    let input_params: String = columns
        .iter()
        .enumerate()
        .map(|(index, (_, storage_type))| format!(", {}", text_param(index + 3, storage_type)))
        .collect();

    format!(
        "INSERT INTO {table_id} (token_name, block{input_columns}, returned)
        VALUES ($1, $2{input_params}, {})",
        text_param(columns.len() + 3, output.storage_type)
    )
}
