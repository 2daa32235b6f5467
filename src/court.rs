//! Live matches and the courts that host them.

use serde::{Deserialize, Serialize};

use crate::{
    team::Team,
    types::{CourtId, MatchNumber, Points, TeamSlot},
};

/// Running score of a live match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LiveScores {
    /// Points of `team1`.
    pub team1: Points,
    /// Points of `team2`.
    pub team2: Points,
}

impl LiveScores {
    /// Current points for `slot`.
    pub fn get(&self, slot: TeamSlot) -> Points {
        match slot {
            TeamSlot::One => self.team1,
            TeamSlot::Two => self.team2,
        }
    }

    /// Adds `delta` to `slot`, saturating at zero and at `Points::MAX`.
    pub fn adjust(&mut self, slot: TeamSlot, delta: i32) -> Points {
        let field = match slot {
            TeamSlot::One => &mut self.team1,
            TeamSlot::Two => &mut self.team2,
        };
        let next = (i64::from(*field) + i64::from(delta)).clamp(0, i64::from(Points::MAX));
        *field = next as Points;
        *field
    }
}

/// A pairing of two teams on a court.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Match {
    /// Globally unique, monotonically assigned number.
    pub match_number: MatchNumber,
    /// First team.
    pub team1: Team,
    /// Second team.
    pub team2: Team,
    /// Running score.
    pub current_scores: LiveScores,
}

impl Match {
    /// Starts a match at 0-0.
    pub fn new(match_number: MatchNumber, team1: Team, team2: Team) -> Self {
        Self {
            match_number,
            team1,
            team2,
            current_scores: LiveScores::default(),
        }
    }

    /// Team in `slot`.
    pub fn team(&self, slot: TeamSlot) -> &Team {
        match slot {
            TeamSlot::One => &self.team1,
            TeamSlot::Two => &self.team2,
        }
    }

    /// Slot occupied by `team`, if it plays in this match.
    pub fn slot_of(&self, team: &Team) -> Option<TeamSlot> {
        if &self.team1 == team {
            Some(TeamSlot::One)
        } else if &self.team2 == team {
            Some(TeamSlot::Two)
        } else {
            None
        }
    }

    /// Both teams in slot order.
    pub fn teams(&self) -> [&Team; 2] {
        [&self.team1, &self.team2]
    }
}

/// One playing surface.
///
/// A court with no match is idle. An idle court may still hold the winner of
/// its last match while that team waits for an opponent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Court {
    /// Court number, `1..=N`.
    pub id: CourtId,
    /// Match in progress. Must be present in encoded state, even when null.
    #[serde(deserialize_with = "Option::deserialize")]
    pub current_match: Option<Match>,
    /// Winner held on an idle court until an opponent is available.
    #[serde(default)]
    pub pending_winner: Option<Team>,
}

impl Court {
    /// Creates an empty court.
    pub fn new(id: CourtId) -> Self {
        Self {
            id,
            current_match: None,
            pending_winner: None,
        }
    }

    /// True when no match is in progress.
    pub fn is_idle(&self) -> bool {
        self.current_match.is_none()
    }

    /// Teams occupying this court, playing or waiting.
    pub fn live_teams(&self) -> Vec<&Team> {
        match (&self.current_match, &self.pending_winner) {
            (Some(m), _) => m.teams().to_vec(),
            (None, Some(team)) => vec![team],
            (None, None) => Vec::new(),
        }
    }
}
