//! The gameplay error taxonomy.
//!
//! Every variant is recoverable: it travels back to the originating
//! connection as a `{success: false, message}` ack and never takes a room
//! down. The `Display` strings are user-facing — the extension shows them
//! verbatim — so several match the messages players have seen for years.

use std::fmt;

use wikirace_protocol::{RoomId, Username};

/// Which end of the round an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundSlot {
    Start,
    Target,
}

impl fmt::Display for RoundSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "Start"),
            Self::Target => write!(f, "Target"),
        }
    }
}

/// Errors produced by room operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// A non-host attempted a host-only operation. Carries the operation
    /// name for the message.
    #[error("You must be a host to perform {0}")]
    NotHost(&'static str),

    /// A lobby-only operation arrived while the round was running.
    #[error("Cannot update a round that has started")]
    RoundStarted,

    /// A gameplay move arrived while no round was running.
    #[error("Round is not running!")]
    RoundNotStarted,

    /// The player already reached the target this round.
    #[error("You already finished this round!")]
    AlreadyFinished,

    /// The username is taken by an active connection in this room.
    #[error("Duplicated username {0} found, pick another one!")]
    DuplicateUsername(Username),

    /// A second player tried to enter a single-player room.
    #[error("This room is single-player only!")]
    SingleModeViolation,

    /// Host transfer target is not a connected player.
    #[error("Can only transfer host to online players")]
    HostNotOnline,

    /// The clicked title did not resolve to any article.
    #[error("Article not found")]
    ArticleNotFound,

    /// The clicked article is on the banned list.
    #[error("{0} is banned! You can't go there!")]
    ArticleBanned(String),

    /// Disambiguation pages are disallowed by the room rules.
    #[error("{0} is a disambiguation page! You can't go there!")]
    ArticleDisambiguationDisallowed(String),

    /// The page is outside the playable namespaces.
    #[error("{0} is not a playable article! You can't go there!")]
    ArticleNamespaceDisallowed(String),

    /// The requested wiki language is not in the supported table.
    #[error("Unsupported language: {0}")]
    InvalidLanguage(String),

    /// Start was pressed with a missing article.
    #[error("{0} article must not be empty!")]
    EmptyStartOrTarget(RoundSlot),

    /// Start was pressed with a banned start/target article.
    #[error("{0} article must not be banned!")]
    RoundArticleBanned(RoundSlot),

    /// The host picked a disambiguation page as start/target.
    #[error("{0} article cannot be a disambiguation page")]
    RoundArticleDisambiguation(RoundSlot),

    /// The host picked a non-main-namespace page as start/target.
    #[error("{0} article must be a regular article")]
    RoundArticleNamespace(RoundSlot),

    /// A navigate request that is neither an anchor no-op nor a legal
    /// one-step back-move.
    #[error("You can't navigate there!")]
    InvalidNavigation,

    /// The room's time limit must be positive.
    #[error("Time limit must be at least 1 second!")]
    InvalidTimeLimit,

    /// The room actor is gone (shut down or crashed); the caller should
    /// treat the room as destroyed.
    #[error("Room {0} is unavailable")]
    RoomClosed(RoomId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_match_the_client_contract() {
        assert_eq!(
            GameError::NotHost("update").to_string(),
            "You must be a host to perform update"
        );
        assert_eq!(
            GameError::RoundArticleBanned(RoundSlot::Target).to_string(),
            "Target article must not be banned!"
        );
        assert_eq!(
            GameError::EmptyStartOrTarget(RoundSlot::Start).to_string(),
            "Start article must not be empty!"
        );
        assert_eq!(
            GameError::ArticleBanned("Dog".into()).to_string(),
            "Dog is banned! You can't go there!"
        );
        assert_eq!(
            GameError::DuplicateUsername(Username::from("az")).to_string(),
            "Duplicated username az found, pick another one!"
        );
    }
}
