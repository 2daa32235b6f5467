//! Player, team, and score value types.

use std::{
    fmt,
    hash::{Hash, Hasher},
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{QueueError, QueueResult},
    types::{PlayerId, Points},
};

/// One person on a team. Identity is the id alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Player {
    /// Session-local id.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
}

impl Player {
    /// Creates a player.
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl PartialEq for Player {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Player {}

impl Hash for Player {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Two distinct players that play and rotate as a unit.
///
/// Equality and hashing ignore player order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Team {
    player1: Player,
    player2: Player,
}

impl Team {
    /// Builds a team, rejecting a player paired with themselves.
    pub fn new(player1: Player, player2: Player) -> QueueResult<Self> {
        if player1.id == player2.id {
            return Err(QueueError::InvalidTeam(player1.id));
        }
        Ok(Self { player1, player2 })
    }

    /// First listed player.
    pub fn player1(&self) -> &Player {
        &self.player1
    }

    /// Second listed player.
    pub fn player2(&self) -> &Player {
        &self.player2
    }

    /// Both player ids in listed order.
    pub fn player_ids(&self) -> [PlayerId; 2] {
        [self.player1.id, self.player2.id]
    }

    /// True when `id` plays on this team.
    pub fn has_player(&self, id: PlayerId) -> bool {
        self.player1.id == id || self.player2.id == id
    }

    /// True when the two teams have a player in common.
    pub fn shares_player_with(&self, other: &Team) -> bool {
        other.player_ids().iter().any(|id| self.has_player(*id))
    }

    /// False for teams decoded from data that pair a player with themselves.
    pub(crate) fn is_well_formed(&self) -> bool {
        self.player1.id != self.player2.id
    }

    fn sorted_ids(&self) -> (PlayerId, PlayerId) {
        let [a, b] = self.player_ids();
        (a.min(b), a.max(b))
    }
}

impl PartialEq for Team {
    fn eq(&self, other: &Self) -> bool {
        self.sorted_ids() == other.sorted_ids()
    }
}

impl Eq for Team {}

impl Hash for Team {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sorted_ids().hash(state);
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} & {}", self.player1, self.player2)
    }
}

/// Points attributed to a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Score {
    /// Team the points belong to.
    pub team: Team,
    /// Points scored.
    pub score: Points,
}

impl Score {
    /// Creates a score entry.
    pub fn new(team: Team, score: Points) -> Self {
        Self { team, score }
    }
}

