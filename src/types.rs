//! Shared primitive IDs and small enums.

use serde::{Deserialize, Serialize};

/// Session-local player identifier.
pub type PlayerId = u32;
/// Court identifier, `1..=N` for a manager with `N` courts.
pub type CourtId = u32;
/// Monotonic match number.
pub type MatchNumber = u64;
/// Points scored by one team in one match.
pub type Points = u32;

/// Which side of a [`crate::court::Match`] a live score belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamSlot {
    /// `team1` of the match.
    One,
    /// `team2` of the match.
    Two,
}

impl TeamSlot {
    /// Maps the 1-based index used by scoreboards to a slot.
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            1 => Some(Self::One),
            2 => Some(Self::Two),
            _ => None,
        }
    }
}
