//! Scenario test infrastructure.
//!
//! Drives the dispatch core directly: no sockets, an in-memory database,
//! a scripted engine stub. Each simulated client is a named outbound
//! queue plus its session id.

// Not every test binary uses every helper.
#![allow(dead_code)]

use duelhall::cards::CardStore;
use duelhall::config::Config;
use duelhall::db::Database;
use duelhall::engine::{DuelEngine, DuelSetup, EngineSession, EngineStatus};
use duelhall::handlers::build_modes;
use duelhall::state::{Hall, PlayerId};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Engine stub that counts starts and ends.
#[derive(Default)]
pub struct ScriptedEngine {
    pub started: Arc<AtomicUsize>,
    pub ended: Arc<AtomicUsize>,
}

struct ScriptedSession {
    ended: Arc<AtomicUsize>,
}

impl EngineSession for ScriptedSession {
    fn feed_response_int(&mut self, _value: i64) {}

    fn feed_response_bytes(&mut self, _value: &[u8]) {}

    fn process(&mut self) -> EngineStatus {
        EngineStatus::Idle
    }

    fn end(&mut self) {
        self.ended.fetch_add(1, Ordering::SeqCst);
    }
}

impl DuelEngine for ScriptedEngine {
    fn start(&self, _setup: DuelSetup) -> Box<dyn EngineSession> {
        self.started.fetch_add(1, Ordering::SeqCst);
        Box::new(ScriptedSession {
            ended: self.ended.clone(),
        })
    }
}

/// Fifty plain cards plus one extra-deck card; the "tcg" banlist limits
/// card 1 to a single copy.
fn test_cards_json() -> String {
    let mut cards: Vec<serde_json::Value> = (1..=50u32)
        .map(|code| {
            serde_json::json!({
                "code": code,
                "name": format!("Test Card {code}"),
                "text": "",
                "card_type": 1,
            })
        })
        .collect();
    cards.push(serde_json::json!({
        "code": 900,
        "name": "Test Fusion",
        "text": "",
        "card_type": 0x41,
    }));
    serde_json::json!({
        "cards": cards,
        "banlists": { "tcg": { "1": 1 } },
    })
    .to_string()
}

const TEST_CONFIG: &str = r#"
[server]
name = "test.hall"
admins = ["Admin"]

[listen]
addr = "127.0.0.1:0"

[history]
capacity = 50
replay = 30
"#;

pub struct TestHall {
    pub hall: Hall,
    pub engine_started: Arc<AtomicUsize>,
    pub engine_ended: Arc<AtomicUsize>,
    outputs: HashMap<String, mpsc::Receiver<String>>,
    ids: HashMap<String, PlayerId>,
}

impl TestHall {
    pub async fn new() -> Self {
        let config: Config = toml::from_str(TEST_CONFIG).expect("test config parses");
        let db = Database::new(":memory:").await.expect("open test db");
        let cards = CardStore::from_json(&test_cards_json()).expect("test cards parse");
        let engine = ScriptedEngine::default();
        let engine_started = engine.started.clone();
        let engine_ended = engine.ended.clone();
        let hall = Hall::new(
            Arc::new(config),
            db,
            Arc::new(cards),
            Arc::new(engine),
            build_modes(),
        );
        Self {
            hall,
            engine_started,
            engine_ended,
            outputs: HashMap::new(),
            ids: HashMap::new(),
        }
    }

    /// Connect and log a client in, creating the account on first use.
    pub async fn login(&mut self, nick: &str, password: &str) -> PlayerId {
        let (tx, rx) = mpsc::channel(512);
        let id = self.hall.connect(Uuid::new_v4(), tx);
        self.ids.insert(nick.to_string(), id);
        self.outputs.insert(nick.to_string(), rx);

        self.hall.handle_line(id, nick).await;
        self.hall.handle_line(id, password).await;
        // A fresh account asks for confirmation as one more chained prompt.
        if self.hall.player(id).is_some_and(|p| p.prompt.is_some()) {
            self.hall.handle_line(id, password).await;
        }
        assert!(
            self.hall.player(id).is_some_and(|p| p.prompt.is_none()),
            "login for {nick} left a pending prompt"
        );
        self.drain(nick);
        id
    }

    pub fn id(&self, nick: &str) -> PlayerId {
        self.ids[nick]
    }

    /// Feed one input line and return everything it produced for that
    /// client.
    pub async fn line(&mut self, nick: &str, text: &str) -> Vec<String> {
        let id = self.id(nick);
        self.hall.handle_line(id, text).await;
        self.drain(nick)
    }

    /// Drain a client's pending output.
    pub fn drain(&mut self, nick: &str) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(rx) = self.outputs.get_mut(nick) {
            while let Ok(line) = rx.try_recv() {
                lines.push(line);
            }
        }
        lines
    }

    /// Store a 40-card legal deck under the player's account.
    pub async fn give_deck(&mut self, nick: &str, deck_name: &str) {
        let account_id = self
            .hall
            .player(self.id(nick))
            .and_then(|p| p.account_id)
            .expect("logged-in player has an account");
        let cards: Vec<u32> = (2..=41).collect();
        self.hall
            .db
            .decks()
            .save_cards(account_id, deck_name, &cards)
            .await
            .expect("save test deck");
    }
}

/// Assert that some line contains the needle.
pub fn assert_any_contains(lines: &[String], needle: &str) {
    assert!(
        lines.iter().any(|l| l.contains(needle)),
        "expected a line containing {needle:?}, got {lines:?}"
    );
}

/// Assert that no line contains the needle.
pub fn assert_none_contains(lines: &[String], needle: &str) {
    assert!(
        !lines.iter().any(|l| l.contains(needle)),
        "expected no line containing {needle:?}, got {lines:?}"
    );
}
