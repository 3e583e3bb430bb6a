use tokio_postgres::{Client, NoTls, Transaction};

use crate::repos::repo::RawQueryParam;
use crate::{
    ExecutesWithRawQuery, HasRawQueryClient, LoadsDataWithRawQuery, PostgresRepo, RepoError,
};
use serde::de::DeserializeOwned;

pub type PostgresRepoRawQueryClient = Client;
pub type PostgresRepoRawQueryTxnClient<'a> = Transaction<'a>;

#[async_trait::async_trait]
impl HasRawQueryClient for PostgresRepo {
    type RawQueryClient = Client;
    type RawQueryTxnClient<'a> = Transaction<'a>;

    async fn get_raw_query_client(&self) -> Result<Self::RawQueryClient, RepoError> {
        let (client, conn) = tokio_postgres::connect(&self.url, NoTls).await?;

        tokio::spawn(async move {
            if let Err(error) = conn.await {
                tracing::error!("postgres connection error: {}", error);
            }
        });

        Ok(client)
    }

    async fn get_raw_query_txn_client<'a>(
        client: &'a mut Self::RawQueryClient,
    ) -> Result<Self::RawQueryTxnClient<'a>, RepoError> {
        Ok(client.transaction().await?)
    }
}

#[async_trait::async_trait]
impl ExecutesWithRawQuery for PostgresRepo {
    async fn execute_raw_query(
        client: &Self::RawQueryClient,
        query: &str,
    ) -> Result<u64, RepoError> {
        Ok(client.execute(query, &[]).await?)
    }

    async fn execute_raw_query_with_params(
        client: &Self::RawQueryClient,
        query: &str,
        params: &[RawQueryParam<'_>],
    ) -> Result<u64, RepoError> {
        Ok(client.execute(query, params).await?)
    }

    async fn execute_raw_query_in_txn<'a>(
        txn_client: &Self::RawQueryTxnClient<'a>,
        query: &str,
        params: &[RawQueryParam<'_>],
    ) -> Result<u64, RepoError> {
        Ok(txn_client.execute(query, params).await?)
    }

    async fn commit_raw_query_txns<'a>(
        client: Self::RawQueryTxnClient<'a>,
    ) -> Result<(), RepoError> {
        Ok(client.commit().await?)
    }
}

#[async_trait::async_trait]
impl LoadsDataWithRawQuery for PostgresRepo {
    async fn load_data_from_raw_query<Data: Send + DeserializeOwned>(
        client: &Self::RawQueryClient,
        query: &str,
        params: &[RawQueryParam<'_>],
    ) -> Result<Option<Data>, RepoError> {
        let mut data_list: Vec<Data> =
            Self::load_data_list_from_raw_query(client, query, params).await?;

        if data_list.len() > 1 {
            return Err(RepoError::Unknown(format!(
                "expected at most one row, got {}",
                data_list.len()
            )));
        }

        Ok(data_list.pop())
    }

    async fn load_data_list_from_raw_query<Data: Send + DeserializeOwned>(
        client: &Self::RawQueryClient,
        query: &str,
        params: &[RawQueryParam<'_>],
    ) -> Result<Vec<Data>, RepoError> {
        let rows = client.query(json_aggregate_query(query).as_str(), params).await?;

        from_json_aggregate(rows.first().map(|row| row.try_get(0)).transpose()?)
    }

    async fn load_exists_from_raw_query(
        client: &Self::RawQueryClient,
        query: &str,
        params: &[RawQueryParam<'_>],
    ) -> Result<bool, RepoError> {
        let row = client.query_one(query, params).await?;

        Ok(row.try_get(0)?)
    }
}

fn from_json_aggregate<Data: DeserializeOwned>(
    json_aggregate: Option<serde_json::Value>,
) -> Result<Vec<Data>, RepoError> {
    match json_aggregate {
        Some(json_aggregate) if json_aggregate.is_object() || json_aggregate.is_array() => {
            Ok(serde_json::from_value(json_aggregate)?)
        }
        _ => Ok(vec![]),
    }
}

fn json_aggregate_query(query: &str) -> String {
    format!("WITH result AS ({query}) SELECT COALESCE(json_agg(result), '[]'::json) FROM result",)
}
