//! Duel mode: the commands the lobby answers while the rules core runs
//! the match. Everything else in this mode is borrowed from the lobby
//! table at construction time.

use super::core::{Call, Command, CommandHandler, CommandTable};
use crate::error::HandlerResult;
use crate::state::{Hall, PlayerId};
use async_trait::async_trait;

pub(super) fn table() -> CommandTable {
    let mut t = CommandTable::new();
    t.register(Command::new("watchers", Watchers));
    t.register(Command::new("giveup", Giveup).guard(duelist));
    t.register(
        Command::new("tag", Tag)
            .args(r"(.*)")
            .guard(tag_duelist),
    );
    t.register(
        Command::new("taghistory", TagHistory)
            .args(r"(\d*)")
            .guard(tag_duelist),
    );
    t
}

// ----------------------------------------------------------------------
// Guards
// ----------------------------------------------------------------------

fn duelist(hall: &Hall, id: PlayerId) -> bool {
    hall.player(id)
        .is_some_and(|p| p.duel.is_some() && !p.watching)
}

fn tag_duelist(hall: &Hall, id: PlayerId) -> bool {
    duelist(hall, id)
        && hall
            .duel_of(id)
            .and_then(|d| hall.duel(d))
            .is_some_and(|d| d.tag)
}

// ----------------------------------------------------------------------
// Handlers
// ----------------------------------------------------------------------

struct Watchers;

#[async_trait]
impl CommandHandler for Watchers {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let id = call.player;
        let Some(duel) = hall.duel_of(id).and_then(|d| hall.duel(d)) else {
            return Ok(());
        };
        let mut nicks: Vec<String> = duel
            .watchers
            .iter()
            .filter(|&&w| hall.player(w).is_some_and(|p| p.watching))
            .map(|&w| hall.nick_of(w))
            .collect();
        nicks.sort_by_key(|n| n.to_lowercase());
        if nicks.is_empty() {
            hall.notify(id, "No one is watching this duel.");
        } else {
            hall.notify(id, "People watching this duel:");
            for nick in nicks {
                hall.notify(id, nick);
            }
        }
        Ok(())
    }
}

struct Giveup;

#[async_trait]
impl CommandHandler for Giveup {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        if let Some(duel_id) = hall.duel_of(call.player) {
            hall.end_duel_announced(duel_id, call.player);
        }
        Ok(())
    }
}

struct Tag;

#[async_trait]
impl CommandHandler for Tag {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let id = call.player;
        let text = call.args.get(0).unwrap_or("").to_string();
        if text.is_empty() {
            hall.notify(id, "You need to send some text to this channel.");
            return Ok(());
        }
        let chan = hall
            .duel_of(id)
            .and_then(|d| hall.duel(d))
            .and_then(|duel| {
                let side = hall.player(id).map(|p| p.duel_team)?;
                Some(duel.tags[side])
            });
        let Some(chan) = chan else {
            return Ok(());
        };
        let nick = hall.nick_of(id);
        hall.channel_send(
            chan,
            Some(id),
            "{player}: {message}",
            &[("player", nick), ("message", text)],
        );
        Ok(())
    }
}

struct TagHistory;

#[async_trait]
impl CommandHandler for TagHistory {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let id = call.player;
        let count = call
            .args
            .get(0)
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| hall.default_replay());
        let chan = hall
            .duel_of(id)
            .and_then(|d| hall.duel(d))
            .and_then(|duel| {
                let side = hall.player(id).map(|p| p.duel_team)?;
                Some(duel.tags[side])
            });
        if let Some(chan) = chan {
            hall.channel_replay(chan, id, count);
        }
        Ok(())
    }
}
