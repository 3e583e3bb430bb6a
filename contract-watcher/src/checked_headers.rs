use std::sync::Arc;

use tokio::sync::Mutex;

use crate::headers::{continuous_headers, Header};
use crate::lru::{bounded, LruCache};
use crate::repos::{sql_identifier, RawQueryParam};
use crate::{
    ExecutesWithRawQuery, HasRawQueryClient, LoadsDataWithRawQuery, RepoError, WatcherRepo,
    WatcherRepoClient, WatcherRepoTxnClient,
};

const COLUMN_CACHE_SIZE: usize = 1000;

/// The `checked_headers` ledger: one counter column per watched event or method,
/// one row per header that has been evaluated for at least one of them.
///
/// A zero (or a missing row) means "not processed yet". Every mark increments the
/// counter, so a header is never reported missing again once marked.
pub struct HeaderLedger {
    client: Arc<Mutex<WatcherRepoClient>>,
    eth_node_fingerprint: String,
    columns: LruCache<String>,
}

impl HeaderLedger {
    pub fn new(client: Arc<Mutex<WatcherRepoClient>>, eth_node_fingerprint: &str) -> Self {
        Self {
            client,
            eth_node_fingerprint: eth_node_fingerprint.to_string(),
            columns: bounded(COLUMN_CACHE_SIZE),
        }
    }

    pub async fn add_check_column(&mut self, id: &str) -> Result<(), RepoError> {
        if self.columns.contains(id) {
            return Ok(());
        }

        let query = format!(
            "ALTER TABLE public.checked_headers {}",
            add_column_clause(sql_identifier(id)?)
        );
        let client = self.client.lock().await;
        WatcherRepo::execute_raw_query(&client, &query).await?;

        self.columns.insert(id.to_string());

        Ok(())
    }

    /// Adds every uncached column in one statement; the cache only learns about
    /// them once the whole statement succeeded.
    pub async fn add_check_columns(&mut self, ids: &[String]) -> Result<(), RepoError> {
        let missing_ids: Vec<&String> =
            ids.iter().filter(|id| !self.columns.contains(id.as_str())).collect();

        if missing_ids.is_empty() {
            return Ok(());
        }

        let clauses = missing_ids
            .iter()
            .map(|id| sql_identifier(id).map(add_column_clause))
            .collect::<Result<Vec<_>, _>>()?;
        let query = format!("ALTER TABLE public.checked_headers {}", clauses.join(", "));

        let client = self.client.lock().await;
        WatcherRepo::execute_raw_query(&client, &query).await?;

        let missing_ids: Vec<String> = missing_ids.into_iter().cloned().collect();
        self.columns.extend(missing_ids);

        Ok(())
    }

    pub async fn mark_header_checked(&self, header_id: i64, id: &str) -> Result<(), RepoError> {
        self.mark_header_checked_for_all(header_id, &[id.to_string()]).await
    }

    pub async fn mark_header_checked_for_all(
        &self,
        header_id: i64,
        ids: &[String],
    ) -> Result<(), RepoError> {
        if ids.is_empty() {
            return Ok(());
        }

        let query = mark_checked_query(ids)?;
        let client = self.client.lock().await;
        WatcherRepo::execute_raw_query_with_params(&client, &query, &[&header_id]).await?;

        Ok(())
    }

    /// Marks inside a caller-owned transaction, so the mark commits or rolls back
    /// together with whatever else the transaction writes.
    pub async fn mark_header_checked_in_txn<'a>(
        txn_client: &WatcherRepoTxnClient<'a>,
        header_id: i64,
        id: &str,
    ) -> Result<(), RepoError> {
        let query = mark_checked_query(&[id.to_string()])?;
        WatcherRepo::execute_raw_query_in_txn(txn_client, &query, &[&header_id]).await?;

        Ok(())
    }

    /// All or nothing: any failure rolls back the marks of every header.
    pub async fn mark_headers_checked_for_all(
        &self,
        headers: &[Header],
        ids: &[String],
    ) -> Result<(), RepoError> {
        if ids.is_empty() || headers.is_empty() {
            return Ok(());
        }

        let query = mark_checked_query(ids)?;
        let mut client = self.client.lock().await;
        let txn_client = WatcherRepo::get_raw_query_txn_client(&mut client).await?;

        for header in headers {
            WatcherRepo::execute_raw_query_in_txn(&txn_client, &query, &[&header.id]).await?;
        }

        WatcherRepo::commit_raw_query_txns(txn_client).await
    }

    /// Headers in `[from, to]` (`to == -1` leaves the range open) not yet checked for
    /// `id`, cut at the first gap in block numbers.
    pub async fn missing_headers(
        &self,
        from: i64,
        to: i64,
        id: &str,
    ) -> Result<Vec<Header>, RepoError> {
        self.missing_headers_for_all(from, to, &[id.to_string()]).await
    }

    /// Like [`HeaderLedger::missing_headers`], for headers unchecked for any of `ids`.
    pub async fn missing_headers_for_all(
        &self,
        from: i64,
        to: i64,
        ids: &[String],
    ) -> Result<Vec<Header>, RepoError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let unchecked = ids
            .iter()
            .map(|id| sql_identifier(id).map(|id| format!("checked_headers.{id} = 0")))
            .collect::<Result<Vec<_>, _>>()?;
        let condition = format!(
            "(checked_headers.header_id IS NULL OR {})",
            unchecked.join(" OR ")
        );

        self.load_continuous_headers(&condition, from, to).await
    }

    /// Headers already checked for every one of `event_ids` but for none of
    /// `method_ids`: the ones whose methods can be polled now.
    pub async fn missing_methods_checked_events_intersection(
        &self,
        from: i64,
        to: i64,
        method_ids: &[String],
        event_ids: &[String],
    ) -> Result<Vec<Header>, RepoError> {
        if method_ids.is_empty() {
            return Ok(vec![]);
        }

        let checked_events = event_ids
            .iter()
            .map(|id| sql_identifier(id).map(|id| format!(" AND checked_headers.{id} != 0")))
            .collect::<Result<String, _>>()?;
        let unchecked_methods = method_ids
            .iter()
            .map(|id| sql_identifier(id).map(|id| format!("checked_headers.{id} = 0")))
            .collect::<Result<Vec<_>, _>>()?;
        let condition = format!(
            "(checked_headers.header_id IS NOT NULL{checked_events}) AND ({})",
            unchecked_methods.join(" AND ")
        );

        self.load_continuous_headers(&condition, from, to).await
    }

    /// `Some(true)` once `id` is known to exist as a column, `None` otherwise.
    pub fn check_cache(&self, id: &str) -> Option<bool> {
        self.columns.contains(id).then_some(true)
    }

    async fn load_continuous_headers(
        &self,
        condition: &str,
        from: i64,
        to: i64,
    ) -> Result<Vec<Header>, RepoError> {
        let base_query = format!(
            "SELECT headers.* FROM headers
            LEFT JOIN checked_headers ON headers.id = checked_headers.header_id
            WHERE {condition}
            AND headers.eth_node_fingerprint = $1
            AND headers.block_number >= $2"
        );

        let client = self.client.lock().await;
        let headers: Vec<Header> = if to == -1 {
            let query = format!("{base_query} ORDER BY headers.block_number");
            let params: [RawQueryParam; 2] = [&self.eth_node_fingerprint, &from];

            WatcherRepo::load_data_list_from_raw_query(&client, &query, &params).await?
        } else {
            let query = format!(
                "{base_query} AND headers.block_number <= $3 ORDER BY headers.block_number"
            );
            let params: [RawQueryParam; 3] = [&self.eth_node_fingerprint, &from, &to];

            WatcherRepo::load_data_list_from_raw_query(&client, &query, &params).await?
        };

        Ok(continuous_headers(headers))
    }
}

fn add_column_clause(id: &str) -> String {
    format!("ADD COLUMN IF NOT EXISTS {id} INTEGER NOT NULL DEFAULT 0")
}

fn mark_checked_query(ids: &[String]) -> Result<String, RepoError> {
    let ids = ids.iter().map(|id| sql_identifier(id)).collect::<Result<Vec<_>, _>>()?;

    let ones = vec!["1"; ids.len()].join(", ");
    let increments = ids
        .iter()
        .map(|id| format!("{id} = checked_headers.{id} + 1"))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!(
        "INSERT INTO public.checked_headers (header_id, {}) VALUES ($1, {ones})
        ON CONFLICT (header_id) DO UPDATE SET {increments}",
        ids.join(", ")
    ))
}
