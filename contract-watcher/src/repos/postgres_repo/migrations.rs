use crate::{Migratable, PostgresRepo, RepoMigrations, SQLikeMigrations};

impl RepoMigrations for PostgresRepo {
    fn create_headers_migration() -> &'static [&'static str] {
        SQLikeMigrations::create_headers()
    }

    fn create_checked_headers_migration() -> &'static [&'static str] {
        SQLikeMigrations::create_checked_headers()
    }
}

impl Migratable for PostgresRepo {}
