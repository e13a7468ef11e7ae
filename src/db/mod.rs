//! Database module for the wine document store.
//!
//! Each wine is kept as one JSON document in SQLite. The slug and creation time are
//! projected into indexed columns for lookup and ordering; the document is the
//! source of truth.

mod connection;
mod repository;

pub use connection::*;
pub use repository::*;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::errors::AppError;

/// Opens a pooled SQLite connection and brings the schema up to date.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    pub max_connections: u32,
}

#[async_trait]
impl Connector for SqliteConnector {
    type Connection = SqlitePool;

    async fn connect(&self, uri: &str) -> Result<SqlitePool, AppError> {
        init_database(uri, self.max_connections)
            .await
            .map_err(AppError::from)
    }
}

/// Initialize the database connection pool and run migrations.
pub async fn init_database(url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    // Ensure the parent directory exists
    if let Some(parent) = options.get_filename().parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS wines (
            id TEXT PRIMARY KEY,
            slug TEXT NOT NULL,
            document TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_wines_slug ON wines(slug);
        CREATE INDEX IF NOT EXISTS idx_wines_created_at ON wines(created_at);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
