//! Relational storage for user accounts
//!
//! A thin layer over a sqlx SQLite pool. The schema is created on startup;
//! there is no separate migration tool.

pub mod users;

pub use users::{UserRecord, UserStore};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

/// Database errors
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Invalid database url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Query failed: {0}")]
    Query(#[from] sqlx::Error),
}

const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    hashed_password TEXT NOT NULL,
    created_at TEXT NOT NULL
)
"#;

/// Open a pool for `url`, creating the database file if needed
pub async fn connect(url: &str, max_connections: u32) -> Result<SqlitePool, DbError> {
    let options = SqliteConnectOptions::from_str(url)
        .map_err(|e| DbError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    migrate(&pool).await?;
    info!(url = %url, max_connections, "Database ready");
    Ok(pool)
}

/// Private in-memory database; a single connection keeps every query on the same database
pub async fn connect_in_memory() -> Result<SqlitePool, DbError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    migrate(&pool).await?;
    Ok(pool)
}

/// Create tables that do not exist yet
pub async fn migrate(pool: &SqlitePool) -> Result<(), DbError> {
    sqlx::query(CREATE_USERS_TABLE).execute(pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let pool = connect_in_memory().await.unwrap();
        migrate(&pool).await.unwrap();
        migrate(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("missing/users.db").display());
        assert!(connect(&url, 1).await.is_err());
    }

    #[tokio::test]
    async fn test_connect_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.db");
        let url = format!("sqlite://{}", path.display());

        let pool = connect(&url, 2).await.unwrap();
        pool.close().await;
        assert!(path.exists());
    }
}
