use serde_json::{Value, json};

use courtqueue::{
    codec::STATE_FORMAT_VERSION,
    core::manager::QueueManager,
    error::QueueError,
    team::{Player, Score, Team},
    types::TeamSlot,
};

fn team(n: u32) -> Team {
    Team::new(
        Player::new(n * 2 - 1, format!("A{n}")),
        Player::new(n * 2, format!("B{n}")),
    )
    .expect("team")
}

fn played_manager() -> QueueManager {
    let mut manager = QueueManager::new(2);
    manager
        .initialize((1..=5).map(team).collect())
        .expect("initialize");
    manager
        .record_result(1, [Score::new(team(1), 21), Score::new(team(2), 18)])
        .expect("record");
    manager
        .edit_match_result(0, [Score::new(team(1), 21), Score::new(team(2), 23)])
        .expect("edit");
    manager.update_score(2, TeamSlot::One, 7).expect("score");
    manager.toggle_queue_lock();
    manager
}

fn corrupt_with(edit: impl FnOnce(&mut Value)) -> String {
    let blob = played_manager().save_state().expect("save");
    let mut value: Value = serde_json::from_str(&blob).expect("json");
    edit(&mut value);
    value.to_string()
}

fn assert_rejected(blob: &str) -> String {
    let mut manager = QueueManager::new(3);
    manager
        .initialize((1..=6).map(team).collect())
        .expect("initialize");
    let before = manager.state().clone();

    let err = manager.load_state(blob).unwrap_err();
    assert_eq!(manager.state(), &before, "failed load must not touch state");
    match err {
        QueueError::CorruptState(reason) => reason,
        other => panic!("expected corrupt state, got {other:?}"),
    }
}

#[test]
fn save_then_load_reproduces_state() {
    let manager = played_manager();
    let blob = manager.save_state().expect("save");

    let restored = QueueManager::from_saved(&blob).expect("load");
    assert_eq!(restored.state(), manager.state());
    assert!(restored.is_queue_locked());
    assert_eq!(restored.beautify_queue(), manager.beautify_queue());
    assert_eq!(restored.team_statistics(), manager.team_statistics());
}

#[test]
fn blob_is_versioned() {
    let blob = played_manager().save_state().expect("save");
    let value: Value = serde_json::from_str(&blob).expect("json");
    assert_eq!(value["format_version"], json!(STATE_FORMAT_VERSION));
    assert_eq!(value["state"]["courts"].as_array().map(Vec::len), Some(2));
    assert_eq!(value["state"]["queue_locked"], json!(true));
}

#[test]
fn waiting_winner_survives_round_trip() {
    let mut manager = QueueManager::new(1);
    manager
        .initialize(vec![team(1), team(2)])
        .expect("initialize");
    manager
        .record_result(1, [Score::new(team(2), 21), Score::new(team(1), 9)])
        .expect("record");

    let restored = QueueManager::from_saved(&manager.save_state().expect("save")).expect("load");
    assert_eq!(restored.court(1).and_then(|c| c.pending_winner.clone()), Some(team(2)));
    assert_eq!(restored.state(), manager.state());
}

#[test]
fn load_adopts_court_count_and_clears_undo() {
    let blob = played_manager().save_state().expect("save");

    let mut manager = QueueManager::new(4);
    manager
        .initialize((1..=8).map(team).collect())
        .expect("initialize");
    manager.update_score(1, TeamSlot::One, 1).expect("score");
    assert!(manager.can_undo());

    manager.load_state(&blob).expect("load");
    assert_eq!(manager.courts().len(), 2);
    assert!(!manager.can_undo());
    assert!(!manager.can_redo());
    assert_eq!(manager.next_match_number(), 4);
}

#[test]
fn garbage_is_rejected() {
    let reason = assert_rejected("not json at all");
    assert!(reason.contains("unreadable"), "{reason}");
}

#[test]
fn unknown_version_is_rejected() {
    let blob = corrupt_with(|v| v["format_version"] = json!(99));
    let reason = assert_rejected(&blob);
    assert!(reason.contains("version"), "{reason}");
}

#[test]
fn missing_and_unknown_fields_are_rejected() {
    let missing = corrupt_with(|v| {
        v["state"]
            .as_object_mut()
            .expect("state")
            .remove("next_match_number");
    });
    assert_rejected(&missing);

    let extra = corrupt_with(|v| v["state"]["surprise"] = json!(1));
    assert_rejected(&extra);

    let wrong_type = corrupt_with(|v| v["state"]["queue_locked"] = json!("yes"));
    assert_rejected(&wrong_type);

    let no_live_match = corrupt_with(|v| {
        v["state"]["courts"][1]
            .as_object_mut()
            .expect("court")
            .remove("current_match");
    });
    let reason = assert_rejected(&no_live_match);
    assert!(reason.contains("current_match"), "{reason}");

    let no_scores = corrupt_with(|v| {
        v["state"]["match_history"][0]
            .as_object_mut()
            .expect("result")
            .remove("scores");
    });
    let reason = assert_rejected(&no_scores);
    assert!(reason.contains("scores"), "{reason}");
}

#[test]
fn explicit_nulls_still_load() {
    let mut manager = QueueManager::new(2);
    manager
        .initialize((1..=4).map(team).collect())
        .expect("initialize");
    manager
        .record_result(1, [Score::new(team(1), 21), Score::new(team(2), 4)])
        .expect("record");

    let blob = manager.save_state().expect("save");
    let value: Value = serde_json::from_str(&blob).expect("json");
    assert_eq!(value["state"]["courts"][0]["current_match"], Value::Null);

    let restored = QueueManager::from_saved(&blob).expect("load");
    assert_eq!(restored.state(), manager.state());
}

#[test]
fn team_with_one_player_twice_is_rejected() {
    let blob = corrupt_with(|v| {
        let first = v["state"]["queue"][0]["player1"]["id"].clone();
        v["state"]["queue"][0]["player2"]["id"] = first;
    });
    let reason = assert_rejected(&blob);
    assert!(reason.contains("with themselves"), "{reason}");
}

#[test]
fn player_live_twice_is_rejected() {
    let blob = corrupt_with(|v| {
        let on_court = v["state"]["courts"][0]["current_match"]["team1"].clone();
        v["state"]["queue"][0] = on_court;
    });
    let reason = assert_rejected(&blob);
    assert!(reason.contains("more than one place"), "{reason}");
}

#[test]
fn inconsistent_court_ids_and_match_numbers_are_rejected() {
    let ids = corrupt_with(|v| v["state"]["courts"][1]["id"] = json!(5));
    assert_rejected(&ids);

    let numbers = corrupt_with(|v| v["state"]["next_match_number"] = json!(2));
    assert_rejected(&numbers);

    let no_courts = corrupt_with(|v| v["state"]["courts"] = json!([]));
    assert_rejected(&no_courts);

    let far_court = corrupt_with(|v| v["state"]["match_history"][0]["court_id"] = json!(3));
    let reason = assert_rejected(&far_court);
    assert!(reason.contains("unknown court 3"), "{reason}");
}

#[test]
fn reused_match_numbers_are_rejected() {
    let live_twice = corrupt_with(|v| {
        let number = v["state"]["courts"][0]["current_match"]["match_number"].clone();
        v["state"]["courts"][1]["current_match"]["match_number"] = number;
    });
    let reason = assert_rejected(&live_twice);
    assert!(reason.contains("reuses match #3"), "{reason}");

    let live_and_played = corrupt_with(|v| {
        let number = v["state"]["match_history"][0]["match"]["match_number"].clone();
        v["state"]["courts"][1]["current_match"]["match_number"] = number;
    });
    let reason = assert_rejected(&live_and_played);
    assert!(reason.contains("reuses match #1"), "{reason}");
}

#[test]
fn exhausted_match_counter_is_rejected_or_reported() {
    let at_max = corrupt_with(|v| v["state"]["next_match_number"] = json!(u64::MAX));
    let reason = assert_rejected(&at_max);
    assert!(reason.contains("out of range"), "{reason}");

    let near_max = corrupt_with(|v| v["state"]["next_match_number"] = json!(u64::MAX - 1));
    let mut manager = QueueManager::from_saved(&near_max).expect("load");
    let before = manager.state().clone();

    let err = manager
        .record_result(1, [Score::new(team(1), 21), Score::new(team(5), 3)])
        .unwrap_err();
    assert_eq!(err, QueueError::MatchNumbersExhausted);
    assert_eq!(manager.state(), &before);
    assert!(!manager.can_undo());
}

#[test]
fn history_winner_must_agree_with_scores() {
    let blob = corrupt_with(|v| {
        let winner = v["state"]["match_history"][0]["winner"].clone();
        let loser = v["state"]["match_history"][0]["loser"].clone();
        v["state"]["match_history"][0]["winner"] = loser;
        v["state"]["match_history"][0]["loser"] = winner;
    });
    let reason = assert_rejected(&blob);
    assert!(reason.contains("disagree"), "{reason}");
}
