//! Input modes: a command table plus mode-specific fallback behavior.
//!
//! Exactly one mode is current for a session at any time. Modes are
//! stateless and shared; per-session state lives on the session itself.

use super::args::Args;
use super::table::{Call, CommandTable};
use crate::error::HandlerError;
use crate::state::{Hall, PlayerId};
use std::sync::Arc;
use tracing::warn;

/// Hook run after each successfully dispatched line, as long as the
/// session is still in this mode with no prompt pending.
pub type PostDispatch = fn(&mut Hall, PlayerId);

/// An interpretation context for session input.
pub struct Mode {
    name: &'static str,
    table: CommandTable,
    unknown: &'static str,
    post_dispatch: Option<PostDispatch>,
}

impl Mode {
    pub fn new(name: &'static str, table: CommandTable, unknown: &'static str) -> Self {
        Self {
            name,
            table,
            unknown,
            post_dispatch: None,
        }
    }

    pub fn with_post_dispatch(mut self, hook: PostDispatch) -> Self {
        self.post_dispatch = Some(hook);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn table(&self) -> &CommandTable {
        &self.table
    }

    /// Route one input line: resolve the command through the alias table,
    /// check authorization, bind arguments, invoke the handler.
    ///
    /// An unauthorized command and a nonexistent one produce the same
    /// response on purpose, so guarded commands don't leak their
    /// existence.
    pub async fn dispatch(self: Arc<Self>, hall: &mut Hall, player: PlayerId, line: &str) {
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            return;
        }

        let (candidate, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim_start()),
            None => (trimmed, ""),
        };
        let candidate = candidate.to_ascii_lowercase();

        let Some(command) = self.table.resolve(&candidate) else {
            hall.notify(player, self.unknown);
            return;
        };

        if let Some(guard) = command.guard_fn() {
            if !guard(hall, player) {
                hall.notify(player, self.unknown);
                return;
            }
        }

        let args = match command.pattern() {
            Some(pattern) => match pattern.bind(rest) {
                Some(args) => args,
                None => {
                    match command.usage_message() {
                        Some(usage) => hall.notify(player, usage),
                        None => hall.notify(player, self.unknown),
                    }
                    return;
                }
            },
            None => Args::empty(),
        };

        let call = Call {
            player,
            raw: line.to_string(),
            args,
        };
        let outcome = command.handler().handle(hall, call).await;
        match outcome {
            Ok(()) => {}
            Err(HandlerError::UnknownCommand) => {
                hall.notify(player, self.unknown);
                return;
            }
            Err(e) => {
                warn!(
                    command = command.name(),
                    code = e.error_code(),
                    error = %e,
                    "command failed"
                );
                hall.notify(player, "Something went wrong.");
                return;
            }
        }

        if let Some(hook) = self.post_dispatch {
            let still_here = hall
                .player(player)
                .is_some_and(|p| p.prompt.is_none() && Arc::ptr_eq(&p.mode, &self));
            if still_here {
                hook(hall, player);
            }
        }
    }
}
