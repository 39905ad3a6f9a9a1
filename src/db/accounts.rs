//! Account repository: registration, authentication, preferences.

use super::DbError;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

/// A registered account.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub password_hash: String,
    pub language: String,
    pub banlist: String,
    pub duel_rules: i64,
    pub created_at: i64,
}

fn account_from_row(row: &SqliteRow) -> Result<Account, sqlx::Error> {
    Ok(Account {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        password_hash: row.try_get("password_hash")?,
        language: row.try_get("language")?,
        banlist: row.try_get("banlist")?,
        duel_rules: row.try_get("duel_rules")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Hash a password using default Argon2 settings.
pub fn hash_password(password: &str) -> Result<String, DbError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DbError::PasswordHash(e.to_string()))
}

/// Verify a password against a stored Argon2 hash.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(hash) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &hash)
        .is_ok()
}

/// Repository for account operations.
pub struct AccountRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AccountRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Look up an account by name (case-insensitive).
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Account>, DbError> {
        let row = sqlx::query("SELECT * FROM accounts WHERE name = ?")
            .bind(name)
            .fetch_optional(self.pool)
            .await?;
        row.as_ref().map(account_from_row).transpose().map_err(Into::into)
    }

    /// Create a new account with a freshly hashed password.
    pub async fn create(&self, name: &str, password: &str) -> Result<Account, DbError> {
        let password_hash = hash_password(password)?;
        let now = chrono::Utc::now().timestamp();

        let row = sqlx::query(
            r#"
            INSERT INTO accounts (name, password_hash, created_at)
            VALUES (?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(&password_hash)
        .bind(now)
        .fetch_one(self.pool)
        .await?;

        account_from_row(&row).map_err(Into::into)
    }

    /// Replace an account's password.
    pub async fn set_password(&self, id: i64, password: &str) -> Result<(), DbError> {
        let password_hash = hash_password(password)?;
        sqlx::query("UPDATE accounts SET password_hash = ? WHERE id = ?")
            .bind(&password_hash)
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Persist the account's language preference.
    pub async fn set_language(&self, id: i64, language: &str) -> Result<(), DbError> {
        sqlx::query("UPDATE accounts SET language = ? WHERE id = ?")
            .bind(language)
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Persist room defaults (banlist and rules variant) for future rooms.
    pub async fn set_room_defaults(
        &self,
        id: i64,
        banlist: &str,
        duel_rules: i64,
    ) -> Result<(), DbError> {
        sqlx::query("UPDATE accounts SET banlist = ?, duel_rules = ? WHERE id = ?")
            .bind(banlist)
            .bind(duel_rules)
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[tokio::test]
    async fn test_create_and_authenticate() {
        let db = Database::new(":memory:").await.expect("open db");
        let account = db
            .accounts()
            .create("Alice", "hunter22")
            .await
            .expect("create account");
        assert_eq!(account.name, "Alice");

        let found = db
            .accounts()
            .find_by_name("alice")
            .await
            .expect("query")
            .expect("case-insensitive lookup");
        assert_eq!(found.id, account.id);
        assert!(verify_password("hunter22", &found.password_hash));
        assert!(!verify_password("wrong", &found.password_hash));
    }

    #[tokio::test]
    async fn test_find_missing_is_none() {
        let db = Database::new(":memory:").await.expect("open db");
        let found = db.accounts().find_by_name("Nobody").await.expect("query");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_set_password_replaces_hash() {
        let db = Database::new(":memory:").await.expect("open db");
        let account = db.accounts().create("Bob", "first-pw").await.expect("create");
        db.accounts()
            .set_password(account.id, "second-pw")
            .await
            .expect("update");
        let found = db
            .accounts()
            .find_by_name("Bob")
            .await
            .expect("query")
            .expect("exists");
        assert!(!verify_password("first-pw", &found.password_hash));
        assert!(verify_password("second-pw", &found.password_hash));
    }

    #[tokio::test]
    async fn test_room_defaults_round_trip() {
        let db = Database::new(":memory:").await.expect("open db");
        let account = db.accounts().create("Cara", "password").await.expect("create");
        assert_eq!(account.banlist, "tcg");
        db.accounts()
            .set_room_defaults(account.id, "none", 1)
            .await
            .expect("update");
        let found = db
            .accounts()
            .find_by_name("Cara")
            .await
            .expect("query")
            .expect("exists");
        assert_eq!(found.banlist, "none");
        assert_eq!(found.duel_rules, 1);
    }
}
