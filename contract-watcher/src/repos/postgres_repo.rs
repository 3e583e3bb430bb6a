mod migrations;
mod raw_queries;

use diesel::{ExpressionMethods, QueryDsl};
use diesel_async::{pooled_connection::AsyncDieselConnectionManager, AsyncPgConnection};
use diesel_async::RunQueryDsl;

use crate::headers::{Header, UnsavedHeader};

use super::repo::{Repo, RepoError};

pub use raw_queries::{PostgresRepoRawQueryClient, PostgresRepoRawQueryTxnClient};

pub type Conn<'a> = bb8::PooledConnection<'a, AsyncDieselConnectionManager<AsyncPgConnection>>;
pub type Pool = bb8::Pool<AsyncDieselConnectionManager<AsyncPgConnection>>;

#[derive(Clone, Debug)]
pub struct PostgresRepo {
    url: String,
}

impl PostgresRepo {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
        }
    }
}

impl From<diesel::result::Error> for RepoError {
    fn from(error: diesel::result::Error) -> Self {
        RepoError::Unknown(error.to_string())
    }
}

impl From<tokio_postgres::Error> for RepoError {
    fn from(error: tokio_postgres::Error) -> Self {
        if error.is_closed() {
            RepoError::NotConnected
        } else {
            RepoError::Unknown(error.to_string())
        }
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(error: serde_json::Error) -> Self {
        RepoError::Unknown(error.to_string())
    }
}

#[async_trait::async_trait]
impl Repo for PostgresRepo {
    type Pool = Pool;
    type Conn<'a> = Conn<'a>;

    async fn get_pool(&self, max_size: u32) -> Result<Pool, RepoError> {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&self.url);

        bb8::Pool::builder()
            .max_size(max_size)
            .build(manager)
            .await
            .map_err(|_| RepoError::NotConnected)
    }

    async fn get_conn<'a>(pool: &'a Pool) -> Result<Conn<'a>, RepoError> {
        pool.get().await.map_err(|_| RepoError::NotConnected)
    }

    async fn create_headers<'a>(
        conn: &mut Conn<'a>,
        unsaved_headers: &[UnsavedHeader],
    ) -> Result<Vec<Header>, RepoError> {
        use crate::diesel::schema::headers::dsl::headers;

        let created_headers = diesel::insert_into(headers)
            .values(unsaved_headers)
            .get_results(conn)
            .await?;

        Ok(created_headers)
    }

    async fn get_first_block_number<'a>(
        conn: &mut Conn<'a>,
        fingerprint: &str,
    ) -> Result<Option<i64>, RepoError> {
        use crate::diesel::schema::headers::dsl::{block_number, eth_node_fingerprint, headers};

        let first_block_number = headers
            .filter(eth_node_fingerprint.eq(fingerprint))
            .select(diesel::dsl::min(block_number))
            .get_result::<Option<i64>>(conn)
            .await?;

        Ok(first_block_number)
    }
}
