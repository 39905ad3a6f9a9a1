//! Per-connection session state.

use super::{ChannelId, DuelId, PlayerId, RoomId};
use crate::handlers::core::{Mode, Prompt};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Display language preference, persisted on the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lang {
    #[default]
    En,
    De,
    Ja,
    Es,
}

impl Lang {
    pub fn code(self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::De => "de",
            Lang::Ja => "ja",
            Lang::Es => "es",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "en" => Some(Lang::En),
            "de" => Some(Lang::De),
            "ja" => Some(Lang::Ja),
            "es" => Some(Lang::Es),
            _ => None,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "english" => Some(Lang::En),
            "german" => Some(Lang::De),
            "japanese" => Some(Lang::Ja),
            "spanish" => Some(Lang::Es),
            _ => None,
        }
    }
}

/// A connected session.
///
/// Owns exactly one current mode reference (shared, not owned) and at
/// most one pending prompt (owned). Destroyed on disconnect; a pending
/// prompt is simply discarded with it.
pub struct Player {
    pub id: PlayerId,
    pub conn: Uuid,
    pub nick: String,
    /// Set once login completes.
    pub account_id: Option<i64>,
    pub lang: Lang,
    pub is_admin: bool,
    /// Outbound line queue; delivery never blocks dispatch.
    pub outbound: mpsc::Sender<String>,
    pub mode: Arc<Mode>,
    pub prompt: Option<Prompt>,

    // Notification toggles, mirrored into channel enablement.
    pub afk: bool,
    pub chat_on: bool,
    pub say_on: bool,
    pub watch_on: bool,
    pub challenge_on: bool,

    /// Lowercased nicknames this player ignores.
    pub ignores: HashSet<String>,
    /// Whoever told this player something last.
    pub reply_to: String,

    /// Currently loaded deck (card codes).
    pub deck: Vec<u32>,
    /// Room defaults carried from the account record.
    pub saved_banlist: String,
    pub saved_rules: super::DuelRules,
    /// This player's private tell channel.
    pub tell: ChannelId,

    pub room: Option<RoomId>,
    pub duel: Option<DuelId>,
    /// Team index inside the duel (watchers view from team 0's side).
    pub duel_team: usize,
    pub watching: bool,
}

impl Player {
    pub fn new(
        id: PlayerId,
        conn: Uuid,
        nick: String,
        outbound: mpsc::Sender<String>,
        mode: Arc<Mode>,
        tell: ChannelId,
    ) -> Self {
        Self {
            id,
            conn,
            nick,
            account_id: None,
            lang: Lang::default(),
            is_admin: false,
            outbound,
            mode,
            prompt: None,
            afk: false,
            chat_on: true,
            say_on: true,
            watch_on: true,
            challenge_on: true,
            ignores: HashSet::new(),
            reply_to: String::new(),
            deck: Vec::new(),
            saved_banlist: String::new(),
            saved_rules: super::DuelRules::default(),
            tell,
            room: None,
            duel: None,
            duel_team: 0,
            watching: false,
        }
    }

    /// Whether this player ignores the named one.
    pub fn ignoring(&self, nick: &str) -> bool {
        self.ignores.contains(&nick.to_lowercase())
    }

    /// Neither in a room nor a duel.
    pub fn idle(&self) -> bool {
        self.room.is_none() && self.duel.is_none()
    }
}
