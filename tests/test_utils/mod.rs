//! Shared helpers for integration tests.
#![allow(dead_code)]

use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

/// Connects to a fresh in-memory SQLite database with migrations applied.
pub async fn setup_test_db() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).sqlx_logging(false);
    let db = Database::connect(opt)
        .await
        .expect("connect in-memory sqlite");
    Migrator::up(&db, None).await.expect("apply migrations");
    db
}

/// Connects to a tempfile-backed SQLite database with migrations applied.
/// The returned file handle must outlive the connection.
pub async fn setup_file_db() -> (DatabaseConnection, tempfile::NamedTempFile) {
    let file = tempfile::Builder::new()
        .prefix("larder-test-")
        .suffix(".sqlite")
        .tempfile()
        .expect("create temp db file");
    let url = format!("sqlite://{}?mode=rwc", file.path().display());
    let mut opt = ConnectOptions::new(url);
    opt.max_connections(8).sqlx_logging(false);
    let db = Database::connect(opt).await.expect("connect sqlite file");
    Migrator::up(&db, None).await.expect("apply migrations");
    (db, file)
}
