//! Completed-match ledger and the standings derived from it.

use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::{
    court::Match,
    error::{QueueError, QueueResult},
    team::{Score, Team},
    types::{CourtId, Points},
};

/// Outcome of one finished match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchResult {
    /// Match as it stood when the result was recorded.
    #[serde(rename = "match")]
    pub played: Match,
    /// Team with the higher score.
    pub winner: Team,
    /// Team with the lower score.
    pub loser: Team,
    /// Final scores, winner first. `None` for results carried without scores.
    #[serde(deserialize_with = "Option::deserialize")]
    pub scores: Option<[Score; 2]>,
    /// When the result was recorded.
    pub timestamp: DateTime<Utc>,
    /// Court the match was played on.
    pub court_id: CourtId,
}

impl MatchResult {
    /// Builds a result for `played`, deciding winner and loser from `scores`.
    pub fn new(
        played: Match,
        scores: [Score; 2],
        court_id: CourtId,
        timestamp: DateTime<Utc>,
    ) -> QueueResult<Self> {
        let (winner, loser, scores) = rank_scores(&played, scores)?;
        Ok(Self {
            played,
            winner,
            loser,
            scores: Some(scores),
            timestamp,
            court_id,
        })
    }

    /// Points recorded for `team`, zero when no scores were kept.
    pub fn points_for(&self, team: &Team) -> Points {
        self.scores
            .as_ref()
            .and_then(|scores| scores.iter().find(|s| &s.team == team))
            .map(|s| s.score)
            .unwrap_or(0)
    }

    fn correct(&mut self, scores: [Score; 2]) -> QueueResult<()> {
        let (winner, loser, scores) = rank_scores(&self.played, scores)?;
        self.winner = winner;
        self.loser = loser;
        self.scores = Some(scores);
        Ok(())
    }
}

/// Orders `scores` winner first after checking they name both teams of `played`.
pub(crate) fn rank_scores(played: &Match, scores: [Score; 2]) -> QueueResult<(Team, Team, [Score; 2])> {
    let [a, b] = scores;
    if a.score == b.score {
        return Err(QueueError::TiedScore(a.score));
    }
    let (Some(slot_a), Some(slot_b)) = (played.slot_of(&a.team), played.slot_of(&b.team)) else {
        return Err(QueueError::TeamNotInMatch);
    };
    if slot_a == slot_b {
        return Err(QueueError::TeamNotInMatch);
    }

    let (win, lose) = if a.score > b.score { (a, b) } else { (b, a) };
    Ok((win.team.clone(), lose.team.clone(), [win, lose]))
}

/// Aggregate record of one team across the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamStats {
    /// Team the line belongs to.
    pub team: Team,
    /// Matches won.
    pub wins: u32,
    /// Matches lost.
    pub losses: u32,
    /// Sum of the team's own points.
    pub total_points: u64,
}

/// Append-only list of results in play order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchHistory {
    results: Vec<MatchResult>,
}

impl MatchHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a result.
    pub fn push(&mut self, result: MatchResult) {
        self.results.push(result);
    }

    /// Rewrites the scores of the result at `index`, recomputing winner and loser.
    ///
    /// Position, match, court, and timestamp are kept.
    pub fn correct(&mut self, index: usize, scores: [Score; 2]) -> QueueResult<()> {
        let len = self.results.len();
        let result = self
            .results
            .get_mut(index)
            .ok_or(QueueError::IndexOutOfBounds { index, len })?;
        result.correct(scores)
    }

    /// Result at `index` in play order.
    pub fn get(&self, index: usize) -> Option<&MatchResult> {
        self.results.get(index)
    }

    /// All results in play order.
    pub fn as_slice(&self) -> &[MatchResult] {
        &self.results
    }

    /// Iterates in play order.
    pub fn iter(&self) -> impl Iterator<Item = &MatchResult> {
        self.results.iter()
    }

    /// Number of results.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// True when nothing has been played.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Standings for every team that appears in the history.
    ///
    /// Sorted by wins, then total points, both descending; remaining ties keep
    /// first-appearance order.
    pub fn statistics(&self) -> Vec<TeamStats> {
        let mut stats: Vec<TeamStats> = Vec::new();
        let mut index: HashMap<Team, usize> = HashMap::new();

        for result in &self.results {
            for (team, won) in [(&result.winner, true), (&result.loser, false)] {
                let pos = *index.entry(team.clone()).or_insert_with(|| {
                    stats.push(TeamStats {
                        team: team.clone(),
                        wins: 0,
                        losses: 0,
                        total_points: 0,
                    });
                    stats.len() - 1
                });
                let line = &mut stats[pos];
                if won {
                    line.wins += 1;
                } else {
                    line.losses += 1;
                }
                line.total_points += u64::from(result.points_for(team));
            }
        }

        stats.sort_by(|a, b| {
            b.wins
                .cmp(&a.wins)
                .then_with(|| b.total_points.cmp(&a.total_points))
        });
        stats
    }
}
