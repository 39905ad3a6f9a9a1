//! Lobby commands: presence, messaging, rooms, account upkeep.

use super::core::{Call, Command, CommandHandler, CommandTable, Prompt, PromptHandler};
use super::{deck, room};
use crate::db::verify_password;
use crate::error::HandlerResult;
use crate::state::{Hall, Lang, Player, PlayerId};
use async_trait::async_trait;
use zeroize::Zeroizing;

pub(super) fn table() -> CommandTable {
    let mut t = CommandTable::new();
    t.register(Command::new("afk", Afk));
    t.register(Command::new("chat", Chat).args(r"(.*)"));
    t.register(Command::new("say", Say).args(r"(.*)").guard(in_room_or_duel));
    t.register(Command::new("who", Who).args(r"(.*)"));
    t.register(
        Command::new("tell", Tell)
            .aliases(&["t"])
            .args(r"(.*)")
            .usage("Usage: tell <player> <message>"),
    );
    t.register(Command::new("reply", Reply).aliases(&["r"]).args(r"(.*)"));
    t.register(Command::new("ignore", Ignore).args(r"(.*)"));
    t.register(Command::new("challenge", Challenge));
    t.register(Command::new("watch", Watch).args(r"(.*)").guard(not_in_room));
    t.register(Command::new("create", CreateRoom).guard(idle));
    t.register(
        Command::new("join", Join)
            .args(r"([A-Za-z][A-Za-z0-9]*)?")
            .guard(idle),
    );
    t.register(Command::new("passwd", Passwd).guard(idle));
    t.register(Command::new("language", Language).args(r"(.*)"));
    t.register(Command::new("help", Help).args(r"(.*)"));
    t.register(Command::new("uptime", Uptime));
    t.register(Command::new("echo", Echo).args(r"(.*)"));
    t.register(Command::new("lookup", Lookup).args(r"(.*)"));
    t.register(Command::new("announce", Announce).args(r"(.*)").guard(admin));
    t.register(Command::new("reloadcards", ReloadCards).guard(admin));
    t.register(Command::new("quit", Quit).guard(idle));
    t.register(Command::new("chathistory", ChatHistory).args(r"(\d*)"));
    t.register(
        Command::new("sayhistory", SayHistory)
            .args(r"(\d*)")
            .guard(in_room_or_duel),
    );
    t.register(Command::new("challengehistory", ChallengeHistory).args(r"(\d*)"));
    t.register(Command::new("tellhistory", TellHistory).args(r"(\d*)"));
    deck::register(&mut t);
    t
}

// ----------------------------------------------------------------------
// Guards
// ----------------------------------------------------------------------

pub(super) fn idle(hall: &Hall, id: PlayerId) -> bool {
    hall.player(id).is_some_and(Player::idle)
}

fn in_room_or_duel(hall: &Hall, id: PlayerId) -> bool {
    hall.player(id)
        .is_some_and(|p| p.room.is_some() || p.duel.is_some())
}

fn not_in_room(hall: &Hall, id: PlayerId) -> bool {
    hall.player(id).is_some_and(|p| p.room.is_none())
}

fn admin(hall: &Hall, id: PlayerId) -> bool {
    hall.player(id).is_some_and(|p| p.is_admin)
}

// ----------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------

fn parse_count(arg: Option<&str>, default: usize) -> usize {
    arg.filter(|s| !s.is_empty())
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// The say channel of the player's current room or duel.
fn say_channel(hall: &Hall, id: PlayerId) -> Option<crate::state::ChannelId> {
    let player = hall.player(id)?;
    if let Some(room_id) = player.room {
        return hall.room(room_id).map(|r| r.say);
    }
    if let Some(duel_id) = player.duel {
        return hall.duel(duel_id).map(|d| d.say);
    }
    None
}

fn multiple_matches(hall: &Hall, matches: &[PlayerId]) -> String {
    let nicks: Vec<String> = matches.iter().map(|&p| hall.nick_of(p)).collect();
    format!("Multiple players match this name: {}", nicks.join(", "))
}

/// Deliver a tell, echo it to the sender's own tell channel and set the
/// implicit reply target. Ignoring in either direction refuses delivery
/// up front so nothing is buffered.
fn send_tell(hall: &mut Hall, id: PlayerId, target: PlayerId, message: &str) {
    let me = hall.nick_of(id);
    let target_nick = hall.nick_of(target);
    if hall.player(id).is_some_and(|p| p.ignoring(&target_nick)) {
        hall.notify(id, format!("You are ignoring {target_nick}."));
        return;
    }
    if hall.player(target).is_some_and(|p| p.ignoring(&me)) {
        hall.notify(id, format!("{target_nick} is ignoring you."));
        return;
    }
    if hall.player(target).is_some_and(|p| p.afk) {
        hall.notify(
            id,
            format!("{target_nick} is AFK and may not be paying attention."),
        );
    }
    let Some(target_tell) = hall.player(target).map(|p| p.tell) else {
        return;
    };
    let delivered = hall.channel_send(
        target_tell,
        Some(id),
        "{player} tells you: {message}",
        &[("player", me.clone()), ("message", message.to_string())],
    );
    if delivered == 1 {
        let my_tell = hall.player(id).map(|p| p.tell);
        if let Some(my_tell) = my_tell {
            hall.channel_send(
                my_tell,
                None,
                "You tell {receiving_player}: {message}",
                &[
                    ("receiving_player", target_nick),
                    ("message", message.to_string()),
                ],
            );
        }
        if let Some(player) = hall.player_mut(target) {
            player.reply_to = me;
        }
    }
}

// ----------------------------------------------------------------------
// Handlers
// ----------------------------------------------------------------------

struct Afk;

#[async_trait]
impl CommandHandler for Afk {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let Some(player) = hall.player_mut(call.player) else {
            return Ok(());
        };
        player.afk = !player.afk;
        let message = if player.afk {
            "You are now AFK."
        } else {
            "You are no longer AFK."
        };
        hall.notify(call.player, message);
        Ok(())
    }
}

struct Chat;

#[async_trait]
impl CommandHandler for Chat {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let id = call.player;
        let text = call.args.get(0).unwrap_or("").to_string();
        let chat = hall.chat();
        if text.is_empty() {
            let Some(player) = hall.player_mut(id) else {
                return Ok(());
            };
            player.chat_on = !player.chat_on;
            let enabled = player.chat_on;
            hall.set_channel_enabled(chat, id, enabled);
            hall.notify(id, if enabled { "Chat on." } else { "Chat off." });
            return Ok(());
        }
        if !hall.player(id).is_some_and(|p| p.chat_on) {
            if let Some(player) = hall.player_mut(id) {
                player.chat_on = true;
            }
            hall.set_channel_enabled(chat, id, true);
            hall.notify(id, "Chat on.");
        }
        let nick = hall.nick_of(id);
        hall.channel_send(
            chat,
            Some(id),
            "{player} chats: {message}",
            &[("player", nick), ("message", text)],
        );
        Ok(())
    }
}

struct Say;

#[async_trait]
impl CommandHandler for Say {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let id = call.player;
        let text = call.args.get(0).unwrap_or("").to_string();
        let Some(chan) = say_channel(hall, id) else {
            return Ok(());
        };
        if text.is_empty() {
            let Some(player) = hall.player_mut(id) else {
                return Ok(());
            };
            player.say_on = !player.say_on;
            let enabled = player.say_on;
            hall.set_channel_enabled(chan, id, enabled);
            hall.notify(id, if enabled { "Say on." } else { "Say off." });
            return Ok(());
        }
        if !hall.player(id).is_some_and(|p| p.say_on) {
            if let Some(player) = hall.player_mut(id) {
                player.say_on = true;
            }
            hall.set_channel_enabled(chan, id, true);
            hall.notify(id, "Say on.");
        }
        let nick = hall.nick_of(id);
        hall.channel_send(
            chan,
            Some(id),
            "{player} says: {message}",
            &[("player", nick), ("message", text)],
        );
        Ok(())
    }
}

struct Who;

#[async_trait]
impl CommandHandler for Who {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let id = call.player;
        const FILTERS: [&str; 4] = ["duel", "watch", "idle", "prepare"];
        let text = call.args.get(0).unwrap_or("").trim().to_string();
        let showing: Vec<&str> = if text.is_empty() {
            FILTERS.to_vec()
        } else {
            let mut selected = Vec::new();
            for word in text.split_whitespace() {
                match FILTERS.iter().find(|f| **f == word) {
                    Some(&filter) => selected.push(filter),
                    None => {
                        hall.notify(id, format!("Invalid filter: {word}"));
                        return Ok(());
                    }
                }
            }
            selected
        };

        hall.notify(id, "Online players:");
        let mut entries: Vec<(String, String)> = Vec::new();
        for pl in hall.players() {
            let mut tag = pl.nick.clone();
            if pl.afk {
                tag.push_str(" [AFK]");
            }
            let line = if pl.watching {
                if !showing.contains(&"watch") {
                    continue;
                }
                let Some(duel) = pl.duel.and_then(|d| hall.duel(d)) else {
                    continue;
                };
                let side0 = duel.side_label(0, |p| hall.nick_of(p));
                let side1 = duel.side_label(1, |p| hall.nick_of(p));
                format!("{tag} (Watching duel with {side0} and {side1})")
            } else if let Some(duel_id) = pl.duel {
                if !showing.contains(&"duel") {
                    continue;
                }
                let Some(duel) = hall.duel(duel_id) else {
                    continue;
                };
                let other = duel.side_label(1 - pl.duel_team, |p| hall.nick_of(p));
                if duel.tag {
                    let partner = duel.teams[pl.duel_team]
                        .iter()
                        .find(|&&p| p != pl.id)
                        .map(|&p| hall.nick_of(p))
                        .unwrap_or_default();
                    if duel.private {
                        format!("{tag} (privately dueling {other} together with {partner})")
                    } else {
                        format!("{tag} (dueling {other} together with {partner})")
                    }
                } else if duel.private {
                    format!("{tag} (privately dueling {other})")
                } else {
                    format!("{tag} (dueling {other})")
                }
            } else if let Some(room_id) = pl.room {
                if !showing.contains(&"prepare") {
                    continue;
                }
                match hall.room(room_id) {
                    Some(room) if room.is_open() && !room.private => {
                        format!("{tag} (preparing to duel)")
                    }
                    _ => continue,
                }
            } else {
                if !showing.contains(&"idle") {
                    continue;
                }
                tag
            };
            entries.push((pl.nick.to_lowercase(), line));
        }
        entries.sort();
        for (_, line) in entries {
            hall.notify(id, line);
        }
        Ok(())
    }
}

struct Tell;

#[async_trait]
impl CommandHandler for Tell {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let id = call.player;
        let raw = call.args.get(0).unwrap_or("");
        let mut parts = raw.splitn(2, char::is_whitespace);
        let target = parts.next().unwrap_or("").trim().to_string();
        let message = parts.next().unwrap_or("").trim().to_string();
        if target.is_empty() || message.is_empty() {
            hall.notify(id, "Usage: tell <player> <message>");
            return Ok(());
        }
        let me = hall.nick_of(id);
        let matches = hall.guess_players(&target, &me);
        match matches.as_slice() {
            [] => hall.notify(id, "That player is not online."),
            [target] => send_tell(hall, id, *target, &message),
            _ => {
                let text = multiple_matches(hall, &matches);
                hall.notify(id, text);
            }
        }
        Ok(())
    }
}

struct Reply;

#[async_trait]
impl CommandHandler for Reply {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let id = call.player;
        let message = call.args.get(0).unwrap_or("").trim().to_string();
        if message.is_empty() {
            hall.notify(id, "Usage: reply <message>");
            return Ok(());
        }
        let reply_to = hall
            .player(id)
            .map(|p| p.reply_to.clone())
            .unwrap_or_default();
        if reply_to.is_empty() {
            hall.notify(id, "No one to reply to.");
            return Ok(());
        }
        match hall.by_nick(&reply_to) {
            Some(target) => send_tell(hall, id, target, &message),
            None => hall.notify(id, "That player is not online."),
        }
        Ok(())
    }
}

struct Ignore;

#[async_trait]
impl CommandHandler for Ignore {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let id = call.player;
        let name = call.args.get(0).unwrap_or("").trim().to_string();
        let Some(account_id) = hall.player(id).and_then(|p| p.account_id) else {
            return Ok(());
        };
        if name.is_empty() {
            hall.notify(id, "Ignored accounts:");
            for ignored in hall.db.ignores().list(account_id).await? {
                hall.notify(id, ignored);
            }
            return Ok(());
        }
        let me = hall.nick_of(id);
        if name.eq_ignore_ascii_case(&me) {
            hall.notify(id, "You cannot ignore yourself.");
            return Ok(());
        }
        let Some(account) = hall.db.accounts().find_by_name(&name).await? else {
            hall.notify(
                id,
                "That account doesn't exist. Make sure you enter the full name (no auto-completion for security reasons).",
            );
            return Ok(());
        };
        let display = account.name;
        if hall.db.ignores().add(account_id, &display).await? {
            hall.notify(id, format!("Ignoring {display}."));
            if let Some(player) = hall.player_mut(id) {
                player.ignores.insert(display.to_lowercase());
            }
        } else {
            hall.db.ignores().remove(account_id, &display).await?;
            hall.notify(id, format!("Stopped ignoring {display}."));
            if let Some(player) = hall.player_mut(id) {
                player.ignores.remove(&display.to_lowercase());
            }
        }
        Ok(())
    }
}

struct Challenge;

#[async_trait]
impl CommandHandler for Challenge {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let id = call.player;
        let announce = hall.announce();
        let Some(player) = hall.player_mut(id) else {
            return Ok(());
        };
        player.challenge_on = !player.challenge_on;
        let enabled = player.challenge_on;
        hall.set_channel_enabled(announce, id, enabled);
        hall.notify(id, if enabled { "Challenge on." } else { "Challenge off." });
        Ok(())
    }
}

struct Watch;

#[async_trait]
impl CommandHandler for Watch {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let id = call.player;
        let arg = call.args.get(0).unwrap_or("").trim().to_string();
        if arg.is_empty() {
            let Some(player) = hall.player_mut(id) else {
                return Ok(());
            };
            player.watch_on = !player.watch_on;
            let enabled = player.watch_on;
            let watch_chan = hall
                .player(id)
                .and_then(|p| p.duel)
                .and_then(|d| hall.duel(d))
                .map(|d| d.watch);
            if let Some(chan) = watch_chan {
                hall.set_channel_enabled(chan, id, enabled);
            }
            hall.notify(
                id,
                if enabled {
                    "Watch notification enabled."
                } else {
                    "Watch notification disabled."
                },
            );
            return Ok(());
        }
        if arg == "stop" {
            let watching = hall.player(id).is_some_and(|p| p.watching);
            if !watching {
                hall.notify(id, "You aren't watching a duel.");
                return Ok(());
            }
            if let Some(duel_id) = hall.duel_of(id) {
                hall.detach_watcher(duel_id, id);
            }
            return Ok(());
        }
        if hall.player(id).is_some_and(|p| p.duel.is_some()) {
            hall.notify(id, "You are already in a duel.");
            return Ok(());
        }
        let me = hall.nick_of(id);
        let matches = hall.guess_players(&arg, &me);
        let target = match matches.as_slice() {
            [] => {
                hall.notify(id, "That player is not online.");
                return Ok(());
            }
            [target] => *target,
            _ => {
                let text = multiple_matches(hall, &matches);
                hall.notify(id, text);
                return Ok(());
            }
        };
        let Some(duel_id) = hall.duel_of(target) else {
            hall.notify(id, "That player is not in a duel.");
            return Ok(());
        };
        if hall.duel(duel_id).is_some_and(|d| d.private) {
            hall.notify(id, "That duel is private.");
            return Ok(());
        }
        hall.attach_watcher(duel_id, id);
        Ok(())
    }
}

struct CreateRoom;

#[async_trait]
impl CommandHandler for CreateRoom {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let id = call.player;
        let lifepoints = hall.config.game.default_lifepoints;
        let (banlist, rules) = hall
            .player(id)
            .map(|p| (p.saved_banlist.clone(), p.saved_rules))
            .unwrap_or_default();
        let banlist = if banlist.is_empty() {
            hall.config.game.default_banlist.clone()
        } else {
            banlist
        };
        let room_id = hall.create_room(id, lifepoints, banlist);
        if let Some(room) = hall.room_mut(room_id) {
            room.rules = rules;
        }
        room::reprompt(hall, id);
        Ok(())
    }
}

struct Join;

#[async_trait]
impl CommandHandler for Join {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let id = call.player;
        let Some(name) = call.args.get(0).map(str::to_string) else {
            hall.notify(id, "Usage: join <player>");
            return Ok(());
        };
        let me = hall.nick_of(id);
        let matches = hall.guess_players(&name, &me);
        let target = match matches.as_slice() {
            [] => {
                hall.notify(id, "This player isn't online.");
                return Ok(());
            }
            [target] => *target,
            _ => {
                let text = multiple_matches(hall, &matches);
                hall.notify(id, text);
                return Ok(());
            }
        };
        let target_nick = hall.nick_of(target);
        if hall.player(id).is_some_and(|p| p.ignoring(&target_nick)) {
            hall.notify(id, "You're ignoring this player.");
            return Ok(());
        }
        if hall.player(target).is_some_and(|p| p.ignoring(&me)) {
            hall.notify(id, "This player ignores you.");
            return Ok(());
        }
        if hall.player(target).is_some_and(|p| p.duel.is_some()) {
            hall.notify(id, "This player is currently in a duel.");
            return Ok(());
        }
        let room_id = hall.player(target).and_then(|p| p.room);
        let enterable = room_id.and_then(|r| hall.room(r)).is_some_and(|room| {
            room.is_open() && (!room.private || room.is_invited(&me))
        });
        let Some(room_id) = room_id.filter(|_| enterable) else {
            hall.notify(
                id,
                "This player currently doesn't prepare to duel or you may not enter the room.",
            );
            return Ok(());
        };
        let creator = hall.room(room_id).map(|r| r.creator);
        if let Some(creator) = creator {
            let creator_nick = hall.nick_of(creator);
            if hall.player(id).is_some_and(|p| p.ignoring(&creator_nick)) {
                hall.notify(
                    id,
                    format!(
                        "You're currently ignoring {creator_nick}, who is the owner of this room."
                    ),
                );
                return Ok(());
            }
            if hall.player(creator).is_some_and(|p| p.ignoring(&me)) {
                hall.notify(
                    id,
                    format!("{creator_nick}, who is the owner of this room, is ignoring you."),
                );
                return Ok(());
            }
        }
        hall.join_room(room_id, id);
        room::reprompt(hall, id);
        Ok(())
    }
}

struct Passwd;

#[async_trait]
impl CommandHandler for Passwd {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let id = call.player;
        let me = hall.nick_of(id);
        let Some(account) = hall.db.accounts().find_by_name(&me).await? else {
            return Ok(());
        };
        let restore = hall
            .player(id)
            .map(|p| p.mode.clone())
            .unwrap_or_else(|| hall.modes.lobby.clone());
        hall.push_prompt(
            id,
            Prompt::new(
                "Current password:",
                "Password change aborted.",
                restore.clone(),
                CurrentPasswordStep {
                    account_id: account.id,
                    hash: account.password_hash,
                    restore,
                },
            ),
        );
        Ok(())
    }
}

struct CurrentPasswordStep {
    account_id: i64,
    hash: String,
    restore: std::sync::Arc<super::core::Mode>,
}

#[async_trait]
impl PromptHandler for CurrentPasswordStep {
    async fn feed(self: Box<Self>, hall: &mut Hall, id: PlayerId, line: &str) -> HandlerResult {
        if line.is_empty() {
            return Err(crate::error::HandlerError::PromptAbort);
        }
        if !verify_password(line, &self.hash) {
            hall.notify(id, "Incorrect password.");
            return Ok(());
        }
        prompt_new_password(hall, id, self.account_id, self.restore);
        Ok(())
    }
}

fn prompt_new_password(
    hall: &mut Hall,
    id: PlayerId,
    account_id: i64,
    restore: std::sync::Arc<super::core::Mode>,
) {
    hall.push_prompt(
        id,
        Prompt::new(
            "New password:",
            "Password change aborted.",
            restore.clone(),
            NewPasswordStep {
                account_id,
                restore,
            },
        ),
    );
}

struct NewPasswordStep {
    account_id: i64,
    restore: std::sync::Arc<super::core::Mode>,
}

#[async_trait]
impl PromptHandler for NewPasswordStep {
    async fn feed(self: Box<Self>, hall: &mut Hall, id: PlayerId, line: &str) -> HandlerResult {
        if line.is_empty() {
            return Err(crate::error::HandlerError::PromptAbort);
        }
        if line.len() < 6 {
            hall.notify(id, "Passwords must be at least 6 characters.");
            prompt_new_password(hall, id, self.account_id, self.restore);
            return Ok(());
        }
        hall.push_prompt(
            id,
            Prompt::new(
                "Confirm password:",
                "Password change aborted.",
                self.restore.clone(),
                ConfirmPasswordStep {
                    account_id: self.account_id,
                    new_password: Zeroizing::new(line.to_string()),
                    restore: self.restore,
                },
            ),
        );
        Ok(())
    }
}

struct ConfirmPasswordStep {
    account_id: i64,
    new_password: Zeroizing<String>,
    restore: std::sync::Arc<super::core::Mode>,
}

#[async_trait]
impl PromptHandler for ConfirmPasswordStep {
    async fn feed(self: Box<Self>, hall: &mut Hall, id: PlayerId, line: &str) -> HandlerResult {
        if line != self.new_password.as_str() {
            // The already-verified current password stays verified; only
            // the new-password step restarts.
            hall.notify(id, "Passwords don't match.");
            prompt_new_password(hall, id, self.account_id, self.restore);
            return Ok(());
        }
        hall.db
            .accounts()
            .set_password(self.account_id, &self.new_password)
            .await?;
        hall.notify(id, "Password changed.");
        Ok(())
    }
}

struct Language;

#[async_trait]
impl CommandHandler for Language {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let id = call.player;
        let name = call.args.get(0).unwrap_or("").trim().to_lowercase();
        let Some(lang) = Lang::from_name(&name) else {
            hall.notify(id, "Usage: language <english/german/japanese/spanish>");
            return Ok(());
        };
        let account_id = hall.player(id).and_then(|p| p.account_id);
        if let Some(player) = hall.player_mut(id) {
            player.lang = lang;
        }
        if let Some(account_id) = account_id {
            hall.db.accounts().set_language(account_id, lang.code()).await?;
        }
        hall.notify(id, "Language set.");
        Ok(())
    }
}

struct Help;

#[async_trait]
impl CommandHandler for Help {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let id = call.player;
        let topic = call.args.get(0).unwrap_or("").trim();
        let topic = if topic.is_empty() { "start" } else { topic };
        let topic: String = topic
            .replace('/', "_")
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
            .collect();
        let path = std::path::Path::new(&hall.config.game.help_dir).join(topic);
        match std::fs::read_to_string(path) {
            Ok(content) => hall.notify(id, content.trim_end_matches('\n')),
            Err(_) => hall.notify(id, "No help topic."),
        }
        Ok(())
    }
}

struct Uptime;

#[async_trait]
impl CommandHandler for Uptime {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let text = format!(
            "This server has been running for {}.",
            format_duration(hall.uptime())
        );
        hall.notify(call.player, text);
        Ok(())
    }
}

fn format_duration(duration: chrono::Duration) -> String {
    let secs = duration.num_seconds().max(0);
    let (days, rest) = (secs / 86_400, secs % 86_400);
    let (hours, rest) = (rest / 3_600, rest % 3_600);
    let (minutes, seconds) = (rest / 60, rest % 60);
    if days > 0 {
        format!("{days}d {hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}

struct Echo;

#[async_trait]
impl CommandHandler for Echo {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let text = call.args.get(0).unwrap_or("").to_string();
        hall.notify(call.player, text);
        Ok(())
    }
}

struct Lookup;

#[async_trait]
impl CommandHandler for Lookup {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let id = call.player;
        let name = call.args.get(0).unwrap_or("").trim();
        let card = if name.is_empty() {
            None
        } else {
            hall.cards.find_by_name(name)
        };
        match card {
            Some(card) => {
                let info = if card.text.is_empty() {
                    card.name
                } else {
                    format!("{}\n{}", card.name, card.text)
                };
                hall.notify(id, info);
            }
            None => hall.notify(id, "No results found."),
        }
        Ok(())
    }
}

struct Announce;

#[async_trait]
impl CommandHandler for Announce {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let id = call.player;
        let text = call.args.get(0).unwrap_or("").trim().to_string();
        if text.is_empty() {
            hall.notify(id, "Announce what?");
            return Ok(());
        }
        let targets: Vec<PlayerId> = hall.players().map(|p| p.id).collect();
        for target in targets {
            hall.notify(target, format!("Announcement: {text}"));
        }
        Ok(())
    }
}

struct ReloadCards;

#[async_trait]
impl CommandHandler for ReloadCards {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let id = call.player;
        // Runs on the dispatch path, so no handler ever observes a
        // half-swapped store.
        let path = hall.config.game.cards_path.clone();
        match hall.cards.reload(&path) {
            Ok(()) => {
                let count = hall.cards.len();
                hall.notify(id, format!("Card store reloaded ({count} cards)."));
            }
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "card store reload failed");
                hall.notify(id, "Reload failed.");
            }
        }
        Ok(())
    }
}

struct Quit;

#[async_trait]
impl CommandHandler for Quit {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        hall.notify(call.player, "Goodbye.");
        hall.close_player(call.player);
        Ok(())
    }
}

struct ChatHistory;

#[async_trait]
impl CommandHandler for ChatHistory {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let count = parse_count(call.args.get(0), hall.default_replay());
        hall.channel_replay(hall.chat(), call.player, count);
        Ok(())
    }
}

struct SayHistory;

#[async_trait]
impl CommandHandler for SayHistory {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let count = parse_count(call.args.get(0), hall.default_replay());
        if let Some(chan) = say_channel(hall, call.player) {
            hall.channel_replay(chan, call.player, count);
        }
        Ok(())
    }
}

struct ChallengeHistory;

#[async_trait]
impl CommandHandler for ChallengeHistory {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let count = parse_count(call.args.get(0), hall.default_replay());
        hall.channel_replay(hall.announce(), call.player, count);
        Ok(())
    }
}

struct TellHistory;

#[async_trait]
impl CommandHandler for TellHistory {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult {
        let count = parse_count(call.args.get(0), hall.default_replay());
        if let Some(tell) = hall.player(call.player).map(|p| p.tell) {
            hall.channel_replay(tell, call.player, count);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count(None, 30), 30);
        assert_eq!(parse_count(Some(""), 30), 30);
        assert_eq!(parse_count(Some("12"), 30), 12);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(chrono::Duration::seconds(59)), "00:00:59");
        assert_eq!(
            format_duration(chrono::Duration::seconds(86_400 + 3_661)),
            "1d 01:01:01"
        );
    }
}
