//! Runtime event stream payloads.

use crate::{
    persist::Revision,
    types::{CourtId, MatchNumber, Points, TeamSlot},
};

/// Events emitted from the single-writer session loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Courts were filled from a fresh team list.
    Initialized {
        /// Number of courts in play.
        courts: usize,
    },
    /// A result was recorded and the court rotated.
    ResultRecorded {
        /// Court the match was played on.
        court_id: CourtId,
        /// Match that finished.
        finished: MatchNumber,
        /// Match that replaced it, if an opponent was waiting.
        started: Option<MatchNumber>,
    },
    /// A live score changed.
    ScoreUpdated {
        /// Court of the match.
        court_id: CourtId,
        /// Side whose score changed.
        slot: TeamSlot,
        /// New score.
        score: Points,
    },
    /// Teams were added to or moved within the queue.
    QueueChanged {
        /// Teams now waiting.
        queued: usize,
    },
    /// The reorder lock flipped.
    QueueLockToggled {
        /// New lock value.
        locked: bool,
    },
    /// A historical result was corrected.
    HistoryEdited {
        /// Index of the corrected result.
        match_index: usize,
    },
    /// One undo step was applied.
    UndoApplied,
    /// One redo step was applied.
    RedoApplied,
    /// The session was committed to storage.
    Saved {
        /// Revision just written.
        revision: Revision,
    },
    /// A commit failed and the session was put back as it was.
    RolledBack {
        /// Why the commit failed.
        reason: String,
    },
    /// The session was finalized; further changes are refused.
    Completed,
    /// Stored state was discarded and a blank session started.
    Reset,
}
