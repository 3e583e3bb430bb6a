mod postgres_repo;
mod repo;

pub use postgres_repo::{
    Conn as PostgresRepoConn, Pool as PostgresRepoPool, PostgresRepo, PostgresRepoRawQueryClient,
    PostgresRepoRawQueryTxnClient,
};
pub use repo::{
    ExecutesWithRawQuery, HasRawQueryClient, LoadsDataWithRawQuery, Migratable, RawQueryParam,
    Repo, RepoError, RepoMigrations, SQLikeMigrations, sql_identifier,
};
