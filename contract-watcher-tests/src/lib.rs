pub mod db;
pub mod factory;
pub mod test_runner;
pub mod tests;

use std::sync::Arc;

use contract_watcher::{LoadsDataWithRawQuery, WatcherRepo, WatcherRepoClient};
use serde::Deserialize;
use tokio::sync::Mutex;

#[derive(Deserialize)]
struct Count {
    count: i64,
}

pub async fn count_rows(repo_client: &Arc<Mutex<WatcherRepoClient>>, table_id: &str) -> i64 {
    let query = format!("SELECT COUNT(*) AS count FROM {table_id}");
    let repo_client = repo_client.lock().await;

    let count: Option<Count> =
        WatcherRepo::load_data_from_raw_query(&repo_client, &query, &[]).await.unwrap();

    count.map(|count| count.count).unwrap_or_default()
}

/// How many times `header_id` was marked for `check_column`; 0 when never marked.
pub async fn checked_count(
    repo_client: &Arc<Mutex<WatcherRepoClient>>,
    header_id: i64,
    check_column: &str,
) -> i64 {
    let query =
        format!("SELECT {check_column} AS count FROM checked_headers WHERE header_id = $1");
    let repo_client = repo_client.lock().await;

    let count: Option<Count> =
        WatcherRepo::load_data_from_raw_query(&repo_client, &query, &[&header_id])
            .await
            .unwrap();

    count.map(|count| count.count).unwrap_or_default()
}
