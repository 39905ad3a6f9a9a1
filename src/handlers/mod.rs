//! Command handlers and mode construction.

pub mod core;
mod deck;
mod duel;
mod lobby;
mod login;
mod room;

pub use login::begin_login;

use self::core::{CommandTable, Mode};
use std::sync::Arc;

/// The process-wide mode set, built once at startup and shared by every
/// session. Modes are never mutated afterwards.
pub struct Modes {
    /// Pre-login limbo; the login prompt chain intercepts all input.
    pub login: Arc<Mode>,
    pub lobby: Arc<Mode>,
    pub room: Arc<Mode>,
    pub duel: Arc<Mode>,
}

/// Build every mode. Specialized modes borrow the lobby's commands by
/// table composition here, specialized entries taking precedence, so
/// resolution stays a single deterministic lookup.
pub fn build_modes() -> Arc<Modes> {
    let lobby_table = lobby::table();

    let mut room_table = room::table();
    room_table.merge_missing(&lobby_table);

    let mut duel_table = duel::table();
    duel_table.merge_missing(&lobby_table);

    Arc::new(Modes {
        login: Arc::new(Mode::new(
            "login",
            CommandTable::new(),
            "Please finish logging in first.",
        )),
        lobby: Arc::new(Mode::new("lobby", lobby_table, "Huh?")),
        room: Arc::new(
            Mode::new("room", room_table, "This command isn't available right now.")
                .with_post_dispatch(room::reprompt),
        ),
        duel: Arc::new(Mode::new("duel", duel_table, "Huh?")),
    })
}
