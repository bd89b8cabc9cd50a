#![allow(dead_code)]

use chopin_accounts::prelude::*;
use chopin_accounts::db;
use std::path::PathBuf;

/// SQLite file that is removed when dropped.
pub struct TempDb {
    path: PathBuf,
}

impl Drop for TempDb {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
        let _ = std::fs::remove_file(self.path.with_extension("db-wal"));
        let _ = std::fs::remove_file(self.path.with_extension("db-shm"));
    }
}

pub fn test_config(database_url: String) -> AccountsConfig {
    AccountsConfig {
        database_url,
        environment: "test".to_string(),
        ..AccountsConfig::default()
    }
}

/// A migrated SQLite backend with the given thresholds.
pub async fn sqlite_backend(
    activation_ttl: chrono::Duration,
    reset_ttl: chrono::Duration,
) -> (SeaOrmUserBackend, TempDb) {
    chopin_accounts::logging::try_init_test_logging();

    let path = std::env::temp_dir().join(format!("accounts_test_{}.db", uuid::Uuid::new_v4()));
    let config = test_config(format!("sqlite://{}?mode=rwc", path.display()));
    let conn = db::connect_and_migrate(&config)
        .await
        .expect("Failed to connect and migrate test database");

    (
        SeaOrmUserBackend::with_ttls(conn, activation_ttl, reset_ttl),
        TempDb { path },
    )
}

pub async fn sqlite_service() -> (UserService, TempDb) {
    let (backend, guard) = sqlite_backend(chrono::Duration::hours(24), chrono::Duration::hours(1)).await;
    (UserService::with_backend(backend), guard)
}

pub fn memory_service() -> UserService {
    chopin_accounts::logging::try_init_test_logging();
    UserService::with_backend(InMemoryUserBackend::new())
}

pub fn alice() -> Account {
    Account::userpass("alice", "alice@example.com", "argon2-alice")
}

pub fn bob() -> Account {
    Account::userpass("bob", "bob@example.com", "argon2-bob")
}
