//! Unified error handling for duelhall.
//!
//! Command rejection paths are local and non-fatal: no handler error ever
//! terminates a session, only an explicit disconnect does.

use crate::db::DbError;
use thiserror::Error;

/// Errors that can occur during command handling.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Route to the current mode's unknown-command response. Authorization
    /// failures take this same path so that guarded commands are observably
    /// identical to nonexistent ones.
    #[error("unknown command")]
    UnknownCommand,

    /// The pending prompt rejected its input line; the session engine emits
    /// the prompt's configured abort message.
    #[error("prompt aborted")]
    PromptAbort,

    #[error("database error: {0}")]
    Db(#[from] DbError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownCommand => "unknown_command",
            Self::PromptAbort => "prompt_abort",
            Self::Db(_) => "database_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

/// Result type for command and prompt handlers.
pub type HandlerResult = Result<(), HandlerError>;

/// Why a room refused to hand off into a duel.
///
/// A rejected start leaves the room fully open with no partial hand-off;
/// validation runs before any mutation begins.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartRejection {
    #[error("Both teams must have the same amount of players.")]
    UnevenTeams,

    #[error("Both teams may only have one or two players.")]
    BadTeamSize,

    #[error("{0} doesn't have a deck loaded yet.")]
    MissingDeck(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_error_codes() {
        assert_eq!(HandlerError::UnknownCommand.error_code(), "unknown_command");
        assert_eq!(HandlerError::PromptAbort.error_code(), "prompt_abort");
        assert_eq!(
            HandlerError::Internal("oops".into()).error_code(),
            "internal_error"
        );
    }

    #[test]
    fn test_start_rejection_messages() {
        assert_eq!(
            StartRejection::MissingDeck("Alice".into()).to_string(),
            "Alice doesn't have a deck loaded yet."
        );
    }
}
