use std::future::Future;
use std::sync::{Arc, Once};

use contract_watcher::{HasRawQueryClient, WatcherRepo, WatcherRepoClient};
use tokio::sync::{Mutex, OnceCell};

use crate::db;

static DB_SETUP: Once = Once::new();
static MIGRATED: OnceCell<()> = OnceCell::const_new();

/// Runs `test_fn` against a migrated test database. Panics when
/// `TEST_DATABASE_URL` is not set.
///
/// Tests share one database, so each one works on its own fingerprint and
/// contract addresses.
pub async fn run_test<TestFn, Fut>(test_fn: TestFn)
where
    TestFn: FnOnce(WatcherRepo, Arc<Mutex<WatcherRepoClient>>) -> Fut,
    Fut: Future<Output = ()>,
{
    let db_url = db::database_url();

    DB_SETUP.call_once(|| db::setup(&db_url));

    let repo = WatcherRepo::new(&db_url);
    let client = repo.get_raw_query_client().await.unwrap();

    MIGRATED
        .get_or_init(|| async {
            contract_watcher::run_internal_migrations(&client).await.unwrap();
        })
        .await;

    test_fn(repo, Arc::new(Mutex::new(client))).await;
}
