//! Ignore-relation repository.
//!
//! Stores ignored names rather than account ids so a relation survives the
//! target account being deleted and recreated.

use super::DbError;
use sqlx::{Row, SqlitePool};

/// Repository for persistent ignore relations.
pub struct IgnoreRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> IgnoreRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Names ignored by an account.
    pub async fn list(&self, account_id: i64) -> Result<Vec<String>, DbError> {
        let rows = sqlx::query(
            "SELECT ignored_name FROM ignores WHERE account_id = ? ORDER BY ignored_name",
        )
        .bind(account_id)
        .fetch_all(self.pool)
        .await?;
        rows.iter()
            .map(|row| row.try_get("ignored_name").map_err(Into::into))
            .collect()
    }

    /// Add an ignore relation. Returns false if it already existed.
    pub async fn add(&self, account_id: i64, name: &str) -> Result<bool, DbError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO ignores (account_id, ignored_name) VALUES (?, ?)",
        )
        .bind(account_id)
        .bind(name)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove an ignore relation. Returns whether it existed.
    pub async fn remove(&self, account_id: i64, name: &str) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM ignores WHERE account_id = ? AND ignored_name = ?")
            .bind(account_id)
            .bind(name)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
