//! Deck repository: named per-account card lists stored as JSON blobs.

use super::DbError;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

/// A stored deck.
#[derive(Debug, Clone)]
pub struct Deck {
    pub id: i64,
    pub account_id: i64,
    pub name: String,
    pub content: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DeckContent {
    #[serde(default)]
    cards: Vec<u32>,
}

impl Deck {
    /// Card codes in this deck. A malformed blob reads as empty.
    pub fn cards(&self) -> Vec<u32> {
        serde_json::from_str::<DeckContent>(&self.content)
            .map(|c| c.cards)
            .unwrap_or_default()
    }

    /// Serialize a card list into the stored blob format.
    pub fn encode_cards(cards: &[u32]) -> String {
        serde_json::to_string(&DeckContent {
            cards: cards.to_vec(),
        })
        .unwrap_or_else(|_| r#"{"cards":[]}"#.to_string())
    }
}

fn deck_from_row(row: &SqliteRow) -> Result<Deck, sqlx::Error> {
    Ok(Deck {
        id: row.try_get("id")?,
        account_id: row.try_get("account_id")?,
        name: row.try_get("name")?,
        content: row.try_get("content")?,
    })
}

/// Repository for deck operations.
pub struct DeckRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> DeckRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Look up a deck by owner and name.
    pub async fn find(&self, account_id: i64, name: &str) -> Result<Option<Deck>, DbError> {
        let row = sqlx::query("SELECT * FROM decks WHERE account_id = ? AND name = ?")
            .bind(account_id)
            .bind(name)
            .fetch_optional(self.pool)
            .await?;
        row.as_ref().map(deck_from_row).transpose().map_err(Into::into)
    }

    /// All deck names owned by an account.
    pub async fn list_names(&self, account_id: i64) -> Result<Vec<String>, DbError> {
        let rows = sqlx::query("SELECT name FROM decks WHERE account_id = ? ORDER BY name")
            .bind(account_id)
            .fetch_all(self.pool)
            .await?;
        rows.iter()
            .map(|row| row.try_get("name").map_err(Into::into))
            .collect()
    }

    /// Create an empty deck. Fails if the name is taken.
    pub async fn create(&self, account_id: i64, name: &str) -> Result<Deck, DbError> {
        if self.find(account_id, name).await?.is_some() {
            return Err(DbError::DeckExists(name.to_string()));
        }
        let row = sqlx::query(
            "INSERT INTO decks (account_id, name) VALUES (?, ?) RETURNING *",
        )
        .bind(account_id)
        .bind(name)
        .fetch_one(self.pool)
        .await?;
        deck_from_row(&row).map_err(Into::into)
    }

    /// Delete a deck. Returns whether it existed.
    pub async fn delete(&self, account_id: i64, name: &str) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM decks WHERE account_id = ? AND name = ?")
            .bind(account_id)
            .bind(name)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Rename a deck. Returns whether the source existed; fails if the
    /// destination name is taken.
    pub async fn rename(&self, account_id: i64, from: &str, to: &str) -> Result<bool, DbError> {
        if self.find(account_id, to).await?.is_some() {
            return Err(DbError::DeckExists(to.to_string()));
        }
        let result = sqlx::query("UPDATE decks SET name = ? WHERE account_id = ? AND name = ?")
            .bind(to)
            .bind(account_id)
            .bind(from)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Write a deck's card list, creating the deck if needed.
    pub async fn save_cards(
        &self,
        account_id: i64,
        name: &str,
        cards: &[u32],
    ) -> Result<(), DbError> {
        let content = Deck::encode_cards(cards);
        sqlx::query(
            r#"
            INSERT INTO decks (account_id, name, content) VALUES (?, ?, ?)
            ON CONFLICT(account_id, name) DO UPDATE SET content = excluded.content
            "#,
        )
        .bind(account_id)
        .bind(name)
        .bind(&content)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn db_with_account() -> (Database, i64) {
        let db = Database::new(":memory:").await.expect("open db");
        let account = db.accounts().create("Dana", "password").await.expect("create");
        (db, account.id)
    }

    #[tokio::test]
    async fn test_create_find_delete() {
        let (db, owner) = db_with_account().await;
        db.decks().create(owner, "aggro").await.expect("create deck");
        let deck = db
            .decks()
            .find(owner, "aggro")
            .await
            .expect("query")
            .expect("deck exists");
        assert!(deck.cards().is_empty());

        assert!(db.decks().delete(owner, "aggro").await.expect("delete"));
        assert!(!db.decks().delete(owner, "aggro").await.expect("delete again"));
    }

    #[tokio::test]
    async fn test_duplicate_create_rejected() {
        let (db, owner) = db_with_account().await;
        db.decks().create(owner, "aggro").await.expect("create deck");
        let err = db.decks().create(owner, "aggro").await.unwrap_err();
        assert!(matches!(err, DbError::DeckExists(_)));
    }

    #[tokio::test]
    async fn test_save_and_rename_round_trip() {
        let (db, owner) = db_with_account().await;
        db.decks()
            .save_cards(owner, "combo", &[1, 2, 2, 3])
            .await
            .expect("save");
        assert!(db.decks().rename(owner, "combo", "combo-v2").await.expect("rename"));
        let deck = db
            .decks()
            .find(owner, "combo-v2")
            .await
            .expect("query")
            .expect("renamed deck exists");
        assert_eq!(deck.cards(), vec![1, 2, 2, 3]);
        assert!(db.decks().find(owner, "combo").await.expect("query").is_none());
    }

    #[tokio::test]
    async fn test_list_names_sorted() {
        let (db, owner) = db_with_account().await;
        db.decks().create(owner, "zoo").await.expect("create");
        db.decks().create(owner, "aggro").await.expect("create");
        let names = db.decks().list_names(owner).await.expect("list");
        assert_eq!(names, vec!["aggro".to_string(), "zoo".to_string()]);
    }
}
