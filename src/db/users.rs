use crate::db::DbError;
use chrono::Utc;
use serde::Serialize;
use sqlx::sqlite::SqlitePool;
use tracing::debug;

/// One row of the `users` table
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub created_at: String,
}

/// Queries against the `users` table
#[derive(Debug, Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, DbError> {
        let user = sqlx::query_as::<_, UserRecord>(
            "SELECT id, email, hashed_password, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Insert a new account. A unique-constraint violation maps to
    /// [`DbError::DuplicateEmail`].
    pub async fn insert(&self, email: &str, hashed_password: &str) -> Result<UserRecord, DbError> {
        let created_at = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO users (email, hashed_password, created_at) VALUES (?, ?, ?)",
        )
        .bind(email)
        .bind(hashed_password)
        .bind(&created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => {
                debug!(email = %email, "User inserted");
                Ok(UserRecord {
                    id: done.last_insert_rowid(),
                    email: email.to_string(),
                    hashed_password: hashed_password.to_string(),
                    created_at,
                })
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(DbError::DuplicateEmail)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// All accounts in insertion order
    pub async fn list(&self) -> Result<Vec<UserRecord>, DbError> {
        let users = sqlx::query_as::<_, UserRecord>(
            "SELECT id, email, hashed_password, created_at FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    /// Cheap round trip used by readiness checks
    pub async fn ping(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
