//! Lobby state: sessions, channels, rooms, duel stubs and the central
//! dispatch owner.

mod channel;
mod duel;
mod hall;
mod player;
mod room;

pub use channel::{Channel, HistoryEntry, Subscriber, render, render_entry};
pub use duel::Duel;
pub use hall::{Event, Hall};
pub use player::{Lang, Player};
pub use room::{DuelRules, Room, RoomState};

/// Session identity, unique for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u64);

/// Broadcast channel identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(pub u64);

/// Room identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoomId(pub u64);

/// Duel stub identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DuelId(pub u64);
