use chrono::{TimeZone, Utc};

use courtqueue::{
    court::{LiveScores, Match},
    error::QueueError,
    history::MatchResult,
    queue::TeamQueue,
    roster::PlayerRegistry,
    team::{Player, Score, Team},
    types::TeamSlot,
};

fn team(a: u32, b: u32) -> Team {
    Team::new(Player::new(a, format!("P{a}")), Player::new(b, format!("P{b}"))).expect("team")
}

#[test]
fn team_identity_ignores_player_order_and_names() {
    let forward = team(1, 2);
    let reversed = Team::new(Player::new(2, "Renamed"), Player::new(1, "Other")).expect("team");
    assert_eq!(forward, reversed);
    assert_ne!(forward, team(1, 3));
    assert!(forward.shares_player_with(&team(2, 9)));
    assert!(!forward.shares_player_with(&team(3, 4)));
    assert_eq!(forward.to_string(), "P1 & P2");
}

#[test]
fn team_rejects_same_player_twice() {
    let err = Team::new(Player::new(5, "Ann"), Player::new(5, "Ann again")).unwrap_err();
    assert_eq!(err, QueueError::InvalidTeam(5));
}

#[test]
fn live_scores_clamp_at_both_ends() {
    let mut scores = LiveScores::default();
    assert_eq!(scores.adjust(TeamSlot::One, -4), 0);
    assert_eq!(scores.adjust(TeamSlot::Two, 7), 7);
    assert_eq!(scores.adjust(TeamSlot::Two, -3), 4);
    scores.team1 = u32::MAX - 1;
    assert_eq!(scores.adjust(TeamSlot::One, 10), u32::MAX);
    assert_eq!(scores.get(TeamSlot::Two), 4);
    assert_eq!(TeamSlot::from_index(2), Some(TeamSlot::Two));
    assert_eq!(TeamSlot::from_index(3), None);
}

#[test]
fn result_orders_scores_winner_first() {
    let played = Match::new(7, team(1, 2), team(3, 4));
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 18, 30, 0).unwrap();

    let result = MatchResult::new(
        played,
        [Score::new(team(1, 2), 15), Score::new(team(4, 3), 21)],
        2,
        at,
    )
    .expect("result");
    assert_eq!(result.winner, team(3, 4));
    assert_eq!(result.loser, team(1, 2));
    assert_eq!(result.points_for(&team(3, 4)), 21);
    assert_eq!(result.points_for(&team(1, 2)), 15);
    assert_eq!(result.points_for(&team(5, 6)), 0);
    assert_eq!(result.timestamp, at);
}

#[test]
fn queue_moves_entries_within_bounds() {
    let mut queue: TeamQueue = [team(1, 2), team(3, 4), team(5, 6)].into_iter().collect();
    queue.move_entry(0, 2).expect("move");
    assert_eq!(queue.to_vec(), vec![team(3, 4), team(5, 6), team(1, 2)]);
    assert!(queue.contains_player(2));
    assert_eq!(
        queue.move_entry(3, 0).unwrap_err(),
        QueueError::IndexOutOfBounds { index: 3, len: 3 }
    );
}

#[test]
fn roster_ids_are_stable_and_survive_serde() {
    let mut roster = PlayerRegistry::new();
    assert_eq!(roster.next_id(), 1);
    let ann = roster.ensure("auth|ann");
    let bob = roster.ensure("auth|bob");
    assert_eq!((ann, bob), (1, 2));
    assert_eq!(roster.ensure("auth|ann"), 1);
    assert_eq!(roster.player("auth|bob", "Bobby"), Player::new(2, "Bobby"));

    let json = serde_json::to_string(&roster).expect("encode");
    assert_eq!(json, r#"{"auth|ann":1,"auth|bob":2}"#);

    let mut decoded: PlayerRegistry = serde_json::from_str(&json).expect("decode");
    assert_eq!(decoded, roster);
    assert_eq!(decoded.external_id(2), Some("auth|bob"));
    assert_eq!(decoded.ensure("auth|cy"), 3);
    assert_eq!(decoded.len(), 3);
}
