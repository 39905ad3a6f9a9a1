//! Database module for persistent storage.
//!
//! Provides async SQLite access using SQLx for:
//! - Player accounts (argon2 password hashes, language, saved room defaults)
//! - Named decks per account (JSON card-code content)
//! - Persistent ignore relations
//!
//! Find-style lookups return `Ok(None)` for ordinary absence; errors are
//! reserved for infrastructure failures and constraint conflicts.

mod accounts;
mod decks;
mod ignores;

pub use accounts::{Account, AccountRepository, hash_password, verify_password};
pub use decks::{Deck, DeckRepository};
pub use ignores::IgnoreRepository;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

static MEMDB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("password hash error: {0}")]
    PasswordHash(String),
    #[error("deck already exists: {0}")]
    DeckExists(String),
}

/// Database handle with connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connection acquire timeout - prevents connection storms from blocking indefinitely.
    const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Open a database, creating the schema if needed.
    pub async fn new(path: &str) -> Result<Self, DbError> {
        let options = if path == ":memory:" {
            // Use a uniquely named shared-cache memory database per call.
            // `file::memory:` is global-ish and will collide across parallel tests.
            let id = MEMDB_COUNTER.fetch_add(1, Ordering::Relaxed);
            let uri = format!("file:duelhall-memdb-{}?mode=memory&cache=shared", id);
            SqliteConnectOptions::from_str(&uri)?
        } else {
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Self::ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.init_schema().await?;
        info!(path = %path, "Database ready");
        Ok(db)
    }

    async fn init_schema(&self) -> Result<(), DbError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password_hash TEXT NOT NULL,
                language TEXT NOT NULL DEFAULT 'en',
                banlist TEXT NOT NULL DEFAULT 'tcg',
                duel_rules INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS decks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                content TEXT NOT NULL DEFAULT '{"cards":[]}',
                UNIQUE(account_id, name)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ignores (
                account_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                ignored_name TEXT NOT NULL COLLATE NOCASE,
                UNIQUE(account_id, ignored_name)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Account repository.
    pub fn accounts(&self) -> AccountRepository<'_> {
        AccountRepository::new(&self.pool)
    }

    /// Deck repository.
    pub fn decks(&self) -> DeckRepository<'_> {
        DeckRepository::new(&self.pool)
    }

    /// Ignore-relation repository.
    pub fn ignores(&self) -> IgnoreRepository<'_> {
        IgnoreRepository::new(&self.pool)
    }
}
