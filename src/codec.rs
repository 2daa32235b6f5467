//! Versioned text encoding of [`ManagerState`] with strict decoding.

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::{
    core::manager::ManagerState,
    error::{QueueError, QueueResult},
    history::rank_scores,
    team::Team,
    types::{CourtId, MatchNumber, PlayerId},
};

/// Version number for serialized [`StateEnvelope`] payloads.
pub const STATE_FORMAT_VERSION: u16 = 1;

/// Versioned wrapper around a manager state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateEnvelope {
    /// Payload format version.
    pub format_version: u16,
    /// Wrapped state.
    pub state: ManagerState,
}

impl StateEnvelope {
    /// Constructs an envelope using [`STATE_FORMAT_VERSION`].
    pub fn new(state: ManagerState) -> Self {
        Self {
            format_version: STATE_FORMAT_VERSION,
            state,
        }
    }
}

#[derive(Deserialize)]
struct VersionProbe {
    format_version: u16,
}

/// Encodes `state` as a JSON envelope.
pub fn encode_state(state: &ManagerState) -> QueueResult<String> {
    serde_json::to_string(&StateEnvelope::new(state.clone()))
        .map_err(|e| QueueError::Encode(e.to_string()))
}

/// Decodes and validates a blob produced by [`encode_state`].
pub fn decode_state(blob: &str) -> QueueResult<ManagerState> {
    let probe: VersionProbe = serde_json::from_str(blob)
        .map_err(|e| QueueError::CorruptState(format!("unreadable envelope: {e}")))?;
    if probe.format_version != STATE_FORMAT_VERSION {
        return Err(QueueError::CorruptState(format!(
            "unsupported state format version: {}",
            probe.format_version
        )));
    }

    let envelope: StateEnvelope = serde_json::from_str(blob)
        .map_err(|e| QueueError::CorruptState(format!("state decode failed: {e}")))?;
    validate(&envelope.state).map_err(QueueError::CorruptState)?;
    Ok(envelope.state)
}

fn validate(state: &ManagerState) -> Result<(), String> {
    if state.courts.is_empty() {
        return Err("state has no courts".to_string());
    }
    if state.next_match_number == 0 || state.next_match_number == MatchNumber::MAX {
        return Err(format!(
            "next match number {} is out of range",
            state.next_match_number
        ));
    }

    let mut numbers: HashSet<MatchNumber> = HashSet::new();
    let mut issue = |number: MatchNumber, place: &str| -> Result<(), String> {
        if number >= state.next_match_number {
            return Err(format!(
                "{place} match #{number} is not below next match number {}",
                state.next_match_number
            ));
        }
        if !numbers.insert(number) {
            return Err(format!("{place} reuses match #{number}"));
        }
        Ok(())
    };

    let mut live: HashSet<PlayerId> = HashSet::new();
    let mut claim = |team: &Team, place: &str| -> Result<(), String> {
        check_team(team, place)?;
        for id in team.player_ids() {
            if !live.insert(id) {
                return Err(format!("player {id} is live in more than one place ({place})"));
            }
        }
        Ok(())
    };

    for (pos, court) in state.courts.iter().enumerate() {
        let expected = pos as CourtId + 1;
        if court.id != expected {
            return Err(format!("court at position {pos} has id {}, expected {expected}", court.id));
        }
        let place = format!("court {}", court.id);
        match (&court.current_match, &court.pending_winner) {
            (Some(_), Some(_)) => {
                return Err(format!("{place} has both a match and a waiting winner"));
            }
            (Some(m), None) => {
                issue(m.match_number, &place)?;
                claim(&m.team1, &place)?;
                claim(&m.team2, &place)?;
            }
            (None, Some(winner)) => claim(winner, &place)?,
            (None, None) => {}
        }
    }

    for (pos, team) in state.queue.iter().enumerate() {
        claim(team, &format!("queue position {pos}"))?;
    }

    for (pos, result) in state.match_history.iter().enumerate() {
        let place = format!("history entry {pos}");
        let played = &result.played;
        check_team(&played.team1, &place)?;
        check_team(&played.team2, &place)?;
        if played.team1.shares_player_with(&played.team2) {
            return Err(format!("{place} pairs teams that share a player"));
        }
        issue(played.match_number, &place)?;
        if played.slot_of(&result.winner).is_none()
            || played.slot_of(&result.loser).is_none()
            || result.winner == result.loser
        {
            return Err(format!("{place} winner and loser must be the two teams of the match"));
        }
        if let Some(scores) = &result.scores {
            let (winner, _, _) =
                rank_scores(played, scores.clone()).map_err(|e| format!("{place}: {e}"))?;
            if winner != result.winner {
                return Err(format!("{place} scores disagree with the recorded winner"));
            }
        }
        if result.court_id == 0 || result.court_id as usize > state.courts.len() {
            return Err(format!("{place} names unknown court {}", result.court_id));
        }
    }

    Ok(())
}

fn check_team(team: &Team, place: &str) -> Result<(), String> {
    if team.is_well_formed() {
        Ok(())
    } else {
        Err(format!("{place} has a team pairing player {} with themselves", team.player1().id))
    }
}
