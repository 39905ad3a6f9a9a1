//! Session and messaging core of a text-protocol card duel lobby.
//!
//! A connected client's input is interpreted by its current mode (lobby,
//! room, duel) or captured by a one-shot prompt; commands fan
//! notifications out through broadcast channels with per-recipient
//! filtering and bounded replay history; rooms stage teams and hand off
//! into externally adjudicated duels.

pub mod cards;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod network;
pub mod state;
