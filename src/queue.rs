//! Ordered waiting line of teams.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::{
    error::{QueueError, QueueResult},
    team::Team,
    types::PlayerId,
};

/// Teams waiting for a court. The front plays next.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamQueue {
    teams: VecDeque<Team>,
}

impl TeamQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends at the back.
    pub fn push_back(&mut self, team: Team) {
        self.teams.push_back(team);
    }

    /// Takes the front team.
    pub fn pop_front(&mut self) -> Option<Team> {
        self.teams.pop_front()
    }

    /// Front team without removing it.
    pub fn front(&self) -> Option<&Team> {
        self.teams.front()
    }

    /// Moves the entry at `from` to `to`, shifting the entries in between.
    pub fn move_entry(&mut self, from: usize, to: usize) -> QueueResult<()> {
        let len = self.teams.len();
        for index in [from, to] {
            if index >= len {
                return Err(QueueError::IndexOutOfBounds { index, len });
            }
        }
        if let Some(team) = self.teams.remove(from) {
            self.teams.insert(to, team);
        }
        Ok(())
    }

    /// True when any queued team includes `id`.
    pub fn contains_player(&self, id: PlayerId) -> bool {
        self.teams.iter().any(|t| t.has_player(id))
    }

    /// Teams front to back.
    pub fn iter(&self) -> impl Iterator<Item = &Team> {
        self.teams.iter()
    }

    /// Team at `index` from the front.
    pub fn get(&self, index: usize) -> Option<&Team> {
        self.teams.get(index)
    }

    /// Number of waiting teams.
    pub fn len(&self) -> usize {
        self.teams.len()
    }

    /// True when nobody is waiting.
    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    /// Clones the queue into a vector, front first.
    pub fn to_vec(&self) -> Vec<Team> {
        self.teams.iter().cloned().collect()
    }
}

impl FromIterator<Team> for TeamQueue {
    fn from_iter<I: IntoIterator<Item = Team>>(iter: I) -> Self {
        Self {
            teams: iter.into_iter().collect(),
        }
    }
}
