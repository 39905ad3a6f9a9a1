//! The hall: central lobby state and the single dispatch loop.
//!
//! All mutable lobby state is owned by one task. Connection tasks only
//! forward decoded lines in through an event channel and drain rendered
//! lines out through per-connection queues, so every session processes one
//! line fully before the next is considered and handlers never need a
//! concurrent-modification protocol.

use super::channel::{Channel, render, render_entry};
use super::{ChannelId, Duel, DuelId, Player, PlayerId, Room, RoomId};
use crate::cards::CardStore;
use crate::config::Config;
use crate::db::Database;
use crate::engine::DuelEngine;
use crate::handlers::{self, Modes};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

/// What the transport layer feeds into the dispatch loop.
pub enum Event {
    Connected {
        conn: Uuid,
        outbound: mpsc::Sender<String>,
    },
    Line {
        conn: Uuid,
        line: String,
    },
    Disconnected {
        conn: Uuid,
    },
}

/// Central lobby state.
pub struct Hall {
    pub config: Arc<Config>,
    pub db: Database,
    pub cards: Arc<CardStore>,
    pub engine: Arc<dyn DuelEngine>,
    pub modes: Arc<Modes>,
    pub started: DateTime<Utc>,

    players: HashMap<PlayerId, Player>,
    conns: HashMap<Uuid, PlayerId>,
    /// Lowercased nickname -> session, for logged-in players only.
    nicks: HashMap<String, PlayerId>,
    channels: HashMap<ChannelId, Channel>,
    rooms: HashMap<RoomId, Room>,
    duels: HashMap<DuelId, Duel>,

    chat: ChannelId,
    announce: ChannelId,
    next_id: u64,
}

impl Hall {
    pub fn new(
        config: Arc<Config>,
        db: Database,
        cards: Arc<CardStore>,
        engine: Arc<dyn DuelEngine>,
        modes: Arc<Modes>,
    ) -> Self {
        let mut hall = Self {
            config,
            db,
            cards,
            engine,
            modes,
            started: Utc::now(),
            players: HashMap::new(),
            conns: HashMap::new(),
            nicks: HashMap::new(),
            channels: HashMap::new(),
            rooms: HashMap::new(),
            duels: HashMap::new(),
            chat: ChannelId(0),
            announce: ChannelId(0),
            next_id: 1,
        };
        hall.chat = hall.create_channel("chat", false);
        hall.announce = hall.create_channel("announce", false);
        hall
    }

    fn next(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// The global chat channel.
    pub fn chat(&self) -> ChannelId {
        self.chat
    }

    /// The global announcement channel.
    pub fn announce(&self) -> ChannelId {
        self.announce
    }

    /// Default count for history replay commands.
    pub fn default_replay(&self) -> usize {
        self.config.history.replay
    }

    pub fn uptime(&self) -> chrono::Duration {
        Utc::now() - self.started
    }

    // ------------------------------------------------------------------
    // Event loop
    // ------------------------------------------------------------------

    /// Run the dispatch loop until the transport side goes away.
    pub async fn run(mut self, mut events: mpsc::Receiver<Event>) {
        info!("Dispatch loop started");
        while let Some(event) = events.recv().await {
            match event {
                Event::Connected { conn, outbound } => {
                    self.connect(conn, outbound);
                }
                Event::Line { conn, line } => {
                    if let Some(&id) = self.conns.get(&conn) {
                        self.handle_line(id, &line).await;
                    }
                }
                Event::Disconnected { conn } => {
                    if let Some(&id) = self.conns.get(&conn) {
                        info!(player = id.0, "Client disconnected");
                        self.close_player(id);
                    }
                }
            }
        }
        info!("Dispatch loop stopped");
    }

    /// Register a fresh connection and start its login flow.
    pub fn connect(&mut self, conn: Uuid, outbound: mpsc::Sender<String>) -> PlayerId {
        let id = PlayerId(self.next());
        let tell = self.create_channel(format!("tell:{}", id.0), false);
        if let Some(channel) = self.channels.get_mut(&tell) {
            channel.subscribe(id);
        }
        let nick = format!("guest{}", id.0);
        let player = Player::new(id, conn, nick, outbound, self.modes.login.clone(), tell);
        self.players.insert(id, player);
        self.conns.insert(conn, id);
        info!(player = id.0, "Client connected");
        handlers::begin_login(self, id);
        id
    }

    /// Process one decoded input line for a session: a pending prompt
    /// consumes it verbatim, otherwise the current mode dispatches it.
    pub async fn handle_line(&mut self, id: PlayerId, line: &str) {
        let Some(player) = self.players.get_mut(&id) else {
            return;
        };
        if let Some(prompt) = player.prompt.take() {
            let abort_message = prompt.abort_message;
            player.mode = prompt.restore_mode;
            let outcome = prompt.handler.feed(self, id, line).await;
            match outcome {
                Ok(()) => {}
                Err(crate::error::HandlerError::PromptAbort) => {
                    self.notify(id, abort_message);
                }
                Err(e) => {
                    tracing::warn!(code = e.error_code(), error = %e, "prompt handler failed");
                    self.notify(id, "Something went wrong.");
                }
            }
            return;
        }
        let mode = player.mode.clone();
        mode.dispatch(self, id, line).await;
    }

    /// Tear down a session: rooms, duels, channels, registry entries.
    pub fn close_player(&mut self, id: PlayerId) {
        if !self.players.contains_key(&id) {
            return;
        }
        self.leave_room(id);
        if let Some(duel_id) = self.players.get(&id).and_then(|p| p.duel) {
            let watching = self.players.get(&id).is_some_and(|p| p.watching);
            if watching {
                self.detach_watcher(duel_id, id);
            } else {
                self.end_duel_announced(duel_id, id);
            }
        }
        if let Some(player) = self.players.remove(&id) {
            self.conns.remove(&player.conn);
            self.nicks.remove(&player.nick.to_lowercase());
            self.channels.remove(&player.tell);
            if let Some(chat) = self.channels.get_mut(&self.chat) {
                chat.unsubscribe(id);
            }
            if let Some(announce) = self.channels.get_mut(&self.announce) {
                announce.unsubscribe(id);
            }
            debug!(player = id.0, nick = %player.nick, "Session closed");
        }
    }

    // ------------------------------------------------------------------
    // Players
    // ------------------------------------------------------------------

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    /// Resolve a nickname (case-insensitive) to a logged-in session.
    pub fn by_nick(&self, nick: &str) -> Option<PlayerId> {
        self.nicks.get(&nick.to_lowercase()).copied()
    }

    /// All logged-in players.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.nicks.values().filter_map(|id| self.players.get(id))
    }

    pub fn online_count(&self) -> usize {
        self.nicks.len()
    }

    /// Bind a session to its post-login nickname.
    pub fn bind_nick(&mut self, id: PlayerId, nick: &str) {
        if let Some(player) = self.players.get_mut(&id) {
            player.nick = nick.to_string();
            self.nicks.insert(nick.to_lowercase(), id);
        }
    }

    pub fn nick_of(&self, id: PlayerId) -> String {
        self.players
            .get(&id)
            .map(|p| p.nick.clone())
            .unwrap_or_default()
    }

    /// Match players by name: an exact match wins, otherwise all players
    /// whose nickname starts with the text, excluding the asker.
    pub fn guess_players(&self, text: &str, asker: &str) -> Vec<PlayerId> {
        let needle = text.to_lowercase();
        if let Some(&id) = self.nicks.get(&needle) {
            return vec![id];
        }
        let asker = asker.to_lowercase();
        let mut matches: Vec<(String, PlayerId)> = self
            .nicks
            .iter()
            .filter(|(nick, _)| nick.starts_with(&needle) && **nick != asker)
            .map(|(nick, &id)| (nick.clone(), id))
            .collect();
        matches.sort();
        matches.into_iter().map(|(_, id)| id).collect()
    }

    /// Queue one line (or several, newline-split) to a session. Never
    /// blocks: a session that fell too far behind loses lines instead of
    /// stalling everyone else's dispatch.
    pub fn notify(&self, id: PlayerId, text: impl AsRef<str>) {
        let Some(player) = self.players.get(&id) else {
            return;
        };
        for line in text.as_ref().split('\n') {
            if player.outbound.try_send(line.to_string()).is_err() {
                debug!(player = id.0, "outbound queue full or closed, dropping line");
                return;
            }
        }
    }

    /// Install a one-shot prompt, showing its text immediately.
    pub fn push_prompt(&mut self, id: PlayerId, prompt: crate::handlers::core::Prompt) {
        self.notify(id, &prompt.text);
        if let Some(player) = self.players.get_mut(&id) {
            debug_assert!(player.prompt.is_none(), "a session holds at most one prompt");
            player.prompt = Some(prompt);
        }
    }

    // ------------------------------------------------------------------
    // Channels
    // ------------------------------------------------------------------

    pub fn create_channel(&mut self, name: impl Into<String>, exclude_sender: bool) -> ChannelId {
        let id = ChannelId(self.next());
        let capacity = self.config.history.capacity;
        let channel = if exclude_sender {
            Channel::new(name, capacity).excluding_sender()
        } else {
            Channel::new(name, capacity)
        };
        self.channels.insert(id, channel);
        id
    }

    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.get(&id)
    }

    pub fn channel_mut(&mut self, id: ChannelId) -> Option<&mut Channel> {
        self.channels.get_mut(&id)
    }

    pub fn set_channel_enabled(&mut self, chan: ChannelId, id: PlayerId, enabled: bool) {
        if let Some(channel) = self.channels.get_mut(&chan) {
            channel.set_enabled(id, enabled);
        }
    }

    /// Archive a message and deliver a per-recipient rendering to every
    /// enabled, non-suppressed subscriber. Returns how many recipients a
    /// rendering was delivered to; zero is not an error, the message is
    /// archived regardless.
    pub fn channel_send(
        &mut self,
        chan: ChannelId,
        sender: Option<PlayerId>,
        template: &str,
        params: &[(&str, String)],
    ) -> usize {
        let sender_nick = sender.and_then(|s| self.players.get(&s)).map(|p| p.nick.clone());
        let (excludes_sender, targets) = {
            let Some(channel) = self.channels.get_mut(&chan) else {
                return 0;
            };
            channel.record(sender_nick.clone(), template, params);
            let targets: Vec<PlayerId> = channel
                .subscribers()
                .filter(|s| s.enabled)
                .map(|s| s.player)
                .collect();
            (channel.excludes_sender(), targets)
        };

        let owned: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        let mut delivered = 0;
        for target in targets {
            if excludes_sender && Some(target) == sender {
                continue;
            }
            let Some(recipient) = self.players.get(&target) else {
                continue;
            };
            if self.suppressed(sender, sender_nick.as_deref(), recipient) {
                continue;
            }
            // Rendered per recipient: the template/param seam is where
            // per-recipient locale substitution plugs in.
            let text = render(template, &owned);
            self.notify(target, text);
            delivered += 1;
        }
        delivered
    }

    /// Replay the most recent `count` entries to one recipient, oldest
    /// first, applying the same suppression rules as live delivery.
    pub fn channel_replay(&self, chan: ChannelId, recipient: PlayerId, count: usize) {
        let Some(channel) = self.channels.get(&chan) else {
            return;
        };
        let Some(player) = self.players.get(&recipient) else {
            return;
        };
        for entry in channel.recent(count) {
            if channel.excludes_sender() && entry.sender.as_deref() == Some(player.nick.as_str()) {
                continue;
            }
            let sender_id = entry.sender.as_deref().and_then(|nick| self.by_nick(nick));
            if self.suppressed(sender_id, entry.sender.as_deref(), player) {
                continue;
            }
            self.notify(recipient, render_entry(entry));
        }
    }

    /// Mutual ignore: delivery is blocked when either side ignores the
    /// other. Server-originated sends (no sender) are never suppressed.
    fn suppressed(
        &self,
        sender: Option<PlayerId>,
        sender_nick: Option<&str>,
        recipient: &Player,
    ) -> bool {
        let Some(nick) = sender_nick else {
            return false;
        };
        if recipient.ignoring(nick) {
            return true;
        }
        sender
            .and_then(|s| self.players.get(&s))
            .is_some_and(|s| s.ignoring(&recipient.nick))
    }

    // ------------------------------------------------------------------
    // Rooms
    // ------------------------------------------------------------------

    /// Create a staging room with its private say channel and put the
    /// creator in it.
    pub fn create_room(&mut self, creator: PlayerId, lifepoints: u32, banlist: String) -> RoomId {
        let id = RoomId(self.next());
        let say = self.create_channel(format!("room:{}", id.0), false);
        let mut room = Room::new(id, creator, say, lifepoints, banlist);
        room.join(creator);
        let say_on = self.players.get(&creator).is_some_and(|p| p.say_on);
        if let Some(channel) = self.channels.get_mut(&say) {
            channel.subscribe_with(creator, say_on);
        }
        if let Some(player) = self.players.get_mut(&creator) {
            player.room = Some(id);
            player.mode = self.modes.room.clone();
        }
        self.rooms.insert(id, room);
        info!(room = id.0, creator = creator.0, "Room created");
        id
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(&id)
    }

    pub fn room_mut(&mut self, id: RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(&id)
    }

    /// The room a player is in.
    pub fn room_of(&self, id: PlayerId) -> Option<RoomId> {
        self.players.get(&id).and_then(|p| p.room)
    }

    /// Add a player to an open room's pool and announce them.
    pub fn join_room(&mut self, room_id: RoomId, id: PlayerId) {
        let nick = self.nick_of(id);
        let Some(room) = self.rooms.get_mut(&room_id) else {
            return;
        };
        room.join(id);
        let say = room.say;
        let members = room.members();
        let say_on = self.players.get(&id).is_some_and(|p| p.say_on);
        if let Some(channel) = self.channels.get_mut(&say) {
            channel.subscribe_with(id, say_on);
        }
        if let Some(player) = self.players.get_mut(&id) {
            player.room = Some(room_id);
            player.mode = self.modes.room.clone();
        }
        for member in members {
            if member != id {
                self.notify(member, format!("{nick} joined the room."));
            }
        }
    }

    /// Remove a player from their room. A leaving creator tears the whole
    /// room down, releasing every member.
    pub fn leave_room(&mut self, id: PlayerId) {
        let Some(room_id) = self.room_of(id) else {
            return;
        };
        let is_creator = self.rooms.get(&room_id).is_some_and(|r| r.is_creator(id));
        if is_creator {
            self.teardown_room(room_id);
            return;
        }
        let nick = self.nick_of(id);
        let Some(room) = self.rooms.get_mut(&room_id) else {
            return;
        };
        room.remove(id);
        let say = room.say;
        let members = room.members();
        if let Some(channel) = self.channels.get_mut(&say) {
            channel.unsubscribe(id);
        }
        if let Some(player) = self.players.get_mut(&id) {
            player.room = None;
            player.mode = self.modes.lobby.clone();
        }
        self.notify(id, "You left the room.");
        for member in members {
            self.notify(member, format!("{nick} left the room."));
        }
    }

    /// Destroy a room, releasing every member back to the lobby.
    pub fn teardown_room(&mut self, room_id: RoomId) {
        let Some(room) = self.rooms.remove(&room_id) else {
            return;
        };
        self.channels.remove(&room.say);
        for member in room.members() {
            if let Some(player) = self.players.get_mut(&member) {
                player.room = None;
                player.mode = self.modes.lobby.clone();
            }
            if member == room.creator {
                self.notify(member, "You closed the room.");
            } else {
                self.notify(member, "The room was closed.");
            }
        }
        info!(room = room_id.0, "Room closed");
    }

    /// Detach a room from the map without releasing members; hand-off
    /// has already rebound them to the duel.
    pub fn remove_room_for_handoff(&mut self, room_id: RoomId) -> Option<Room> {
        let room = self.rooms.remove(&room_id)?;
        self.channels.remove(&room.say);
        Some(room)
    }

    // ------------------------------------------------------------------
    // Duels
    // ------------------------------------------------------------------

    pub fn insert_duel(&mut self, build: impl FnOnce(&mut Self, DuelId) -> Duel) -> DuelId {
        let id = DuelId(self.next());
        let duel = build(self, id);
        self.duels.insert(id, duel);
        id
    }

    pub fn duel(&self, id: DuelId) -> Option<&Duel> {
        self.duels.get(&id)
    }

    pub fn duel_mut(&mut self, id: DuelId) -> Option<&mut Duel> {
        self.duels.get_mut(&id)
    }

    pub fn duel_of(&self, id: PlayerId) -> Option<DuelId> {
        self.players.get(&id).and_then(|p| p.duel)
    }

    /// Attach a watcher: channel subscriptions, session flags, an arrival
    /// notice to everyone else watching or playing.
    pub fn attach_watcher(&mut self, duel_id: DuelId, id: PlayerId) {
        let nick = self.nick_of(id);
        let Some(duel) = self.duels.get_mut(&duel_id) else {
            return;
        };
        duel.add_watcher(id);
        let (say, watch) = (duel.say, duel.watch);
        let (say_on, watch_on) = self
            .players
            .get(&id)
            .map(|p| (p.say_on, p.watch_on))
            .unwrap_or((true, true));
        if let Some(channel) = self.channels.get_mut(&say) {
            channel.subscribe_with(id, say_on);
        }
        if let Some(channel) = self.channels.get_mut(&watch) {
            channel.subscribe_with(id, watch_on);
        }
        if let Some(player) = self.players.get_mut(&id) {
            player.duel = Some(duel_id);
            player.watching = true;
            player.duel_team = 0;
            player.mode = self.modes.duel.clone();
        }
        self.channel_send(
            watch,
            Some(id),
            "{player} is now watching this duel.",
            &[("player", nick)],
        );
        self.notify(id, "You are now watching this duel.");
    }

    /// Detach a watcher and announce their departure.
    pub fn detach_watcher(&mut self, duel_id: DuelId, id: PlayerId) {
        let nick = self.nick_of(id);
        let Some(duel) = self.duels.get_mut(&duel_id) else {
            return;
        };
        duel.remove_watcher(id);
        let (say, watch) = (duel.say, duel.watch);
        self.channel_send(
            watch,
            Some(id),
            "{player} stopped watching this duel.",
            &[("player", nick)],
        );
        if let Some(channel) = self.channels.get_mut(&say) {
            channel.unsubscribe(id);
        }
        if let Some(channel) = self.channels.get_mut(&watch) {
            channel.unsubscribe(id);
        }
        if let Some(player) = self.players.get_mut(&id) {
            player.duel = None;
            player.watching = false;
            player.mode = self.modes.lobby.clone();
        }
        self.notify(id, "You are no longer watching this duel.");
    }

    /// End a duel on behalf of `ender`: tell everyone, post the public
    /// announcement when the duel was public, then tear the stub down.
    pub fn end_duel_announced(&mut self, duel_id: DuelId, ender: PlayerId) {
        let Some(duel) = self.duels.get(&duel_id) else {
            return;
        };
        let ender_nick = self.nick_of(ender);
        let everyone = duel.everyone();
        for member in &everyone {
            self.notify(*member, format!("{ender_nick} has ended the duel."));
        }
        let Some(duel) = self.duels.get(&duel_id) else {
            return;
        };
        if !duel.private {
            let loser_side = duel.team_of(ender).unwrap_or(0);
            let winner = duel.side_label(1 - loser_side, |p| self.nick_of(p));
            self.channel_send(
                self.announce,
                None,
                "{player1} has cowardly submitted to {player2}.",
                &[("player1", ender_nick), ("player2", winner)],
            );
        }
        self.end_duel(duel_id);
    }

    /// Tear down a duel stub: engine session, side channels, session
    /// attachments.
    pub fn end_duel(&mut self, duel_id: DuelId) {
        let Some(mut duel) = self.duels.remove(&duel_id) else {
            return;
        };
        duel.session.end();
        self.channels.remove(&duel.say);
        self.channels.remove(&duel.watch);
        for tag in duel.tags {
            self.channels.remove(&tag);
        }
        for member in duel.everyone() {
            if let Some(player) = self.players.get_mut(&member) {
                player.duel = None;
                player.watching = false;
                player.duel_team = 0;
                player.mode = self.modes.lobby.clone();
            }
        }
        info!(duel = duel_id.0, "Duel ended");
    }
}
