use std::fmt::Write as _;

use chrono::Utc;
use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    codec,
    court::{Court, Match},
    error::{QueueError, QueueResult},
    history::{MatchHistory, MatchResult, TeamStats, rank_scores},
    queue::TeamQueue,
    team::{Score, Team},
    types::{CourtId, MatchNumber, PlayerId, Points, TeamSlot},
};

/// Everything the manager needs to be rebuilt exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManagerState {
    /// Courts ordered by id.
    pub courts: Vec<Court>,
    /// Waiting teams, front first.
    pub queue: TeamQueue,
    /// Finished matches in play order.
    pub match_history: MatchHistory,
    /// Number the next match will receive.
    pub next_match_number: MatchNumber,
    /// Blocks manual reordering when set.
    pub queue_locked: bool,
}

impl ManagerState {
    fn empty(court_count: usize) -> Self {
        Self {
            courts: (1..=court_count as CourtId).map(Court::new).collect(),
            queue: TeamQueue::new(),
            match_history: MatchHistory::new(),
            next_match_number: 1,
            queue_locked: false,
        }
    }

    /// Every player on a court, waiting on an idle court, or queued.
    pub fn live_player_ids(&self) -> HashSet<PlayerId> {
        self.courts
            .iter()
            .flat_map(|c| c.live_teams())
            .chain(self.queue.iter())
            .flat_map(|t| t.player_ids())
            .collect()
    }
}

/// What happened on a court after a result was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rotation {
    /// Number of the match that just finished.
    pub finished: MatchNumber,
    /// Number of the match that replaced it, `None` when the court went idle.
    pub started: Option<MatchNumber>,
}

/// Court scheduler with winner-stays rotation and snapshot undo/redo.
#[derive(Debug, Clone)]
pub struct QueueManager {
    state: ManagerState,
    undo: Vec<ManagerState>,
    redo: Vec<ManagerState>,
    // Highest `next_match_number` ever reached; restores never go below it.
    high_water: MatchNumber,
}

impl QueueManager {
    pub fn new(court_count: usize) -> Self {
        let state = ManagerState::empty(court_count.max(1));
        Self {
            high_water: state.next_match_number,
            state,
            undo: Vec::new(),
            redo: Vec::new(),
        }
    }

    /// Rebuilds a manager from a [`QueueManager::save_state`] blob.
    ///
    /// The court count comes from the blob.
    pub fn from_saved(blob: &str) -> QueueResult<Self> {
        let mut manager = Self::new(1);
        manager.load_state(blob)?;
        Ok(manager)
    }

    /// Starts a fresh session: one match per court from the front of `teams`,
    /// the rest queued in order.
    pub fn initialize(&mut self, teams: Vec<Team>) -> QueueResult<()> {
        let court_count = self.state.courts.len();
        let required = court_count * 2;
        if teams.len() < required {
            return Err(QueueError::InsufficientTeams {
                required,
                provided: teams.len(),
            });
        }
        ensure_unique_players(&teams, &HashSet::new())?;

        let mut state = ManagerState::empty(court_count);
        let mut teams = teams.into_iter();
        for court in &mut state.courts {
            let (Some(team1), Some(team2)) = (teams.next(), teams.next()) else {
                break;
            };
            court.current_match = Some(Match::new(state.next_match_number, team1, team2));
            state.next_match_number += 1;
        }
        state.queue = teams.collect();

        info!(
            courts = court_count,
            queued = state.queue.len(),
            "queue manager initialized"
        );
        self.high_water = state.next_match_number;
        self.state = state;
        self.undo.clear();
        self.redo.clear();
        Ok(())
    }

    /// Records a finished match on `court_id`.
    ///
    /// The winner keeps the court and meets the team at the front of the
    /// queue; the loser goes to the back. When nobody else is waiting the
    /// court goes idle and holds the winner.
    pub fn record_result(&mut self, court_id: CourtId, scores: [Score; 2]) -> QueueResult<Rotation> {
        let idx = self.active_court_index(court_id)?;
        let played = self.state.courts[idx]
            .current_match
            .clone()
            .ok_or(QueueError::InvalidCourt(court_id))?;
        let finished = played.match_number;
        let result = MatchResult::new(played, scores, court_id, Utc::now())?;
        self.ensure_match_numbers()?;

        self.checkpoint();
        let winner = result.winner.clone();
        let loser = result.loser.clone();
        self.state.match_history.push(result);

        let opponent = self.state.queue.pop_front();
        self.state.queue.push_back(loser);

        let started = match opponent {
            Some(opponent) => {
                let number = self.take_match_number()?;
                let court = &mut self.state.courts[idx];
                court.current_match = Some(Match::new(number, winner, opponent));
                court.pending_winner = None;
                Some(number)
            }
            None => {
                let court = &mut self.state.courts[idx];
                court.current_match = None;
                court.pending_winner = Some(winner);
                None
            }
        };
        debug!(court_id, finished, ?started, "result recorded");

        self.fill_idle_courts(Some(court_id))?;
        Ok(Rotation { finished, started })
    }

    /// Adjusts a live score by `delta`, never going below zero.
    pub fn update_score(&mut self, court_id: CourtId, slot: TeamSlot, delta: i32) -> QueueResult<Points> {
        let idx = self.active_court_index(court_id)?;
        self.checkpoint();
        let scores = self.state.courts[idx]
            .current_match
            .as_mut()
            .map(|m| &mut m.current_scores)
            .ok_or(QueueError::InvalidCourt(court_id))?;
        let score = scores.adjust(slot, delta);
        debug!(court_id, ?slot, delta, score, "score updated");
        Ok(score)
    }

    /// Appends teams to the back of the queue. Ignores the queue lock.
    pub fn add_teams_to_queue(&mut self, teams: Vec<Team>) -> QueueResult<()> {
        ensure_unique_players(&teams, &self.state.live_player_ids())?;
        if teams.is_empty() {
            return Ok(());
        }
        self.ensure_match_numbers()?;

        self.checkpoint();
        let added = teams.len();
        for team in teams {
            self.state.queue.push_back(team);
        }
        debug!(added, queued = self.state.queue.len(), "teams queued");
        self.fill_idle_courts(None)?;
        Ok(())
    }

    /// Moves the queued team at `from` to `to`.
    pub fn reorder_queue(&mut self, from: usize, to: usize) -> QueueResult<()> {
        if self.state.queue_locked {
            return Err(QueueError::QueueLocked);
        }
        let len = self.state.queue.len();
        if let Some(index) = [from, to].into_iter().find(|i| *i >= len) {
            return Err(QueueError::IndexOutOfBounds { index, len });
        }

        self.checkpoint();
        self.state.queue.move_entry(from, to)?;
        debug!(from, to, "queue reordered");
        Ok(())
    }

    /// Flips the reorder lock and returns the new value. Not undoable.
    pub fn toggle_queue_lock(&mut self) -> bool {
        self.state.queue_locked = !self.state.queue_locked;
        debug!(locked = self.state.queue_locked, "queue lock toggled");
        self.state.queue_locked
    }

    /// Corrects the scores of an earlier result. Courts and queue are left
    /// exactly as the original result arranged them.
    pub fn edit_match_result(&mut self, match_index: usize, scores: [Score; 2]) -> QueueResult<()> {
        let len = self.state.match_history.len();
        let entry = self
            .state
            .match_history
            .get(match_index)
            .ok_or(QueueError::IndexOutOfBounds {
                index: match_index,
                len,
            })?;
        rank_scores(&entry.played, scores.clone())?;

        self.checkpoint();
        self.state.match_history.correct(match_index, scores)?;
        debug!(match_index, "match result edited");
        Ok(())
    }

    /// Restores the state before the last mutation. Returns false when there
    /// is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(prev) = self.undo.pop() else {
            return false;
        };
        let current = self.restore(prev);
        self.redo.push(current);
        debug!(undo = self.undo.len(), redo = self.redo.len(), "undo applied");
        true
    }

    /// Re-applies the last undone mutation. Returns false when there is
    /// nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.redo.pop() else {
            return false;
        };
        let current = self.restore(next);
        self.undo.push(current);
        debug!(undo = self.undo.len(), redo = self.redo.len(), "redo applied");
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn courts(&self) -> &[Court] {
        &self.state.courts
    }

    pub fn court(&self, court_id: CourtId) -> Option<&Court> {
        self.state.courts.iter().find(|c| c.id == court_id)
    }

    pub fn queue(&self) -> &TeamQueue {
        &self.state.queue
    }

    pub fn match_history(&self) -> &MatchHistory {
        &self.state.match_history
    }

    pub fn next_match_number(&self) -> MatchNumber {
        self.state.next_match_number
    }

    pub fn is_queue_locked(&self) -> bool {
        self.state.queue_locked
    }

    /// Current state, as [`QueueManager::save_state`] would encode it.
    pub fn state(&self) -> &ManagerState {
        &self.state
    }

    pub fn live_player_ids(&self) -> HashSet<PlayerId> {
        self.state.live_player_ids()
    }

    /// Standings derived from the match history.
    pub fn team_statistics(&self) -> Vec<TeamStats> {
        self.state.match_history.statistics()
    }

    /// Human-readable court assignments followed by the queue.
    pub fn beautify_queue(&self) -> String {
        let mut out = String::new();
        for court in &self.state.courts {
            let _ = match (&court.current_match, &court.pending_winner) {
                (Some(m), _) => writeln!(
                    out,
                    "Court {}: {} vs {} (match #{}, {}-{})",
                    court.id,
                    m.team1,
                    m.team2,
                    m.match_number,
                    m.current_scores.team1,
                    m.current_scores.team2
                ),
                (None, Some(winner)) => {
                    writeln!(out, "Court {}: {winner} waiting for an opponent", court.id)
                }
                (None, None) => writeln!(out, "Court {}: open", court.id),
            };
        }

        if self.state.queue.is_empty() {
            out.push_str("Queue: empty\n");
        } else {
            out.push_str("Queue:\n");
            for (i, team) in self.state.queue.iter().enumerate() {
                let _ = writeln!(out, "  {}. {team}", i + 1);
            }
        }
        out
    }

    /// Encodes the current state. Undo/redo history is not included.
    pub fn save_state(&self) -> QueueResult<String> {
        codec::encode_state(&self.state)
    }

    /// Replaces all state with a decoded blob and clears undo/redo.
    ///
    /// On any decode or validation error the manager is left untouched.
    pub fn load_state(&mut self, blob: &str) -> QueueResult<()> {
        let state = codec::decode_state(blob)?;
        info!(
            courts = state.courts.len(),
            queued = state.queue.len(),
            results = state.match_history.len(),
            "queue state loaded"
        );
        self.high_water = state.next_match_number;
        self.state = state;
        self.undo.clear();
        self.redo.clear();
        Ok(())
    }

    fn active_court_index(&self, court_id: CourtId) -> QueueResult<usize> {
        self.state
            .courts
            .iter()
            .position(|c| c.id == court_id && c.current_match.is_some())
            .ok_or(QueueError::InvalidCourt(court_id))
    }

    fn checkpoint(&mut self) {
        self.undo.push(self.state.clone());
        self.redo.clear();
    }

    // Swaps in `target`, keeping the current lock flag and never lowering the
    // match counter. Returns the replaced state.
    fn restore(&mut self, mut target: ManagerState) -> ManagerState {
        target.queue_locked = self.state.queue_locked;
        target.next_match_number = target.next_match_number.max(self.high_water);
        std::mem::replace(&mut self.state, target)
    }

    // One rotation starts at most one match per court.
    fn ensure_match_numbers(&self) -> QueueResult<()> {
        let needed = self.state.courts.len() as MatchNumber;
        self.state
            .next_match_number
            .checked_add(needed)
            .map(|_| ())
            .ok_or(QueueError::MatchNumbersExhausted)
    }

    fn take_match_number(&mut self) -> QueueResult<MatchNumber> {
        let number = self.state.next_match_number;
        self.state.next_match_number = number
            .checked_add(1)
            .ok_or(QueueError::MatchNumbersExhausted)?;
        self.high_water = self.high_water.max(self.state.next_match_number);
        Ok(number)
    }

    fn fill_idle_courts(&mut self, skip: Option<CourtId>) -> QueueResult<()> {
        for idx in 0..self.state.courts.len() {
            let court = &self.state.courts[idx];
            if !court.is_idle() || Some(court.id) == skip {
                continue;
            }
            let needed = if court.pending_winner.is_some() { 1 } else { 2 };
            if self.state.queue.len() < needed {
                continue;
            }

            let number = self.take_match_number()?;
            let state = &mut self.state;
            let court = &mut state.courts[idx];
            let first = match court.pending_winner.take() {
                Some(winner) => Some(winner),
                None => state.queue.pop_front(),
            };
            let (Some(team1), Some(team2)) = (first, state.queue.pop_front()) else {
                continue;
            };
            debug!(court_id = court.id, match_number = number, "idle court filled");
            court.current_match = Some(Match::new(number, team1, team2));
        }
        Ok(())
    }
}

fn ensure_unique_players(teams: &[Team], live: &HashSet<PlayerId>) -> QueueResult<()> {
    let mut seen = live.clone();
    for team in teams {
        if !team.is_well_formed() {
            return Err(QueueError::InvalidTeam(team.player1().id));
        }
        for id in team.player_ids() {
            if !seen.insert(id) {
                return Err(QueueError::DuplicatePlayer(id));
            }
        }
    }
    Ok(())
}
