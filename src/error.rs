//! Error type shared by every core operation.

use thiserror::Error;

use crate::types::{CourtId, PlayerId, Points};

/// Typed failure of a [`crate::core::manager::QueueManager`] operation.
///
/// A failed operation never leaves partial changes behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Initialization was given fewer teams than the courts need.
    #[error("need at least {required} teams for the courts, got {provided}")]
    InsufficientTeams {
        /// Minimum number of teams.
        required: usize,
        /// Number of teams supplied.
        provided: usize,
    },

    /// The court does not exist or has no active match.
    #[error("court {0} does not exist or has no active match")]
    InvalidCourt(CourtId),

    /// Both teams were given the same score.
    #[error("scores cannot be equal ({0}-{0})")]
    TiedScore(Points),

    /// A player is already part of a live team.
    #[error("player {0} is already on a court or in the queue")]
    DuplicatePlayer(PlayerId),

    /// Reordering was attempted while the queue is locked.
    #[error("queue is locked")]
    QueueLocked,

    /// An index fell outside a list.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfBounds {
        /// Offending index.
        index: usize,
        /// Length of the list.
        len: usize,
    },

    /// Submitted scores do not name the two teams of the match.
    #[error("scores do not match the teams of the match")]
    TeamNotInMatch,

    /// A team was built from the same player twice.
    #[error("a player cannot be in a team with themselves (player {0})")]
    InvalidTeam(PlayerId),

    /// A serialized state blob failed to decode or validate.
    #[error("corrupt state: {0}")]
    CorruptState(String),

    /// No further match numbers can be issued.
    #[error("match numbers exhausted")]
    MatchNumbersExhausted,

    /// State could not be encoded.
    #[error("failed to encode state: {0}")]
    Encode(String),
}

/// Result alias for core operations.
pub type QueueResult<T> = Result<T, QueueError>;
