use tempfile::TempDir;

use courtqueue::{
    core::manager::QueueManager,
    persist::{RECORD_FORMAT_VERSION, SessionRecord, SessionSink, sqlite::SqliteSessionSink},
    roster::PlayerRegistry,
    team::{Score, Team},
};

fn record_for(manager: &QueueManager, roster: &PlayerRegistry, completed: bool) -> SessionRecord {
    SessionRecord::new(roster.clone(), manager.save_state().expect("save"), completed)
}

fn roster_and_teams(count: usize) -> (PlayerRegistry, Vec<Team>) {
    let mut roster = PlayerRegistry::new();
    let teams = (0..count)
        .map(|i| {
            let a = roster.player(&format!("ext-{i}-a"), format!("A{i}"));
            let b = roster.player(&format!("ext-{i}-b"), format!("B{i}"));
            Team::new(a, b).expect("team")
        })
        .collect();
    (roster, teams)
}

#[test]
fn latest_record_survives_reopen() {
    let tmp = TempDir::new().expect("tmp");
    let db_path = tmp.path().join("sessions.db");

    let (roster, teams) = roster_and_teams(4);
    let mut manager = QueueManager::new(1);
    manager.initialize(teams.clone()).expect("initialize");

    let mut sink = SqliteSessionSink::open(&db_path).expect("open sqlite");
    sink.save("evt", 1, &record_for(&manager, &roster, false))
        .expect("save 1");
    manager
        .record_result(1, [Score::new(teams[1].clone(), 21), Score::new(teams[0].clone(), 17)])
        .expect("record");
    sink.save("evt", 2, &record_for(&manager, &roster, true))
        .expect("save 2");
    drop(sink);

    let reopened = SqliteSessionSink::open(&db_path).expect("reopen");
    let (revision, record) = reopened.load("evt").expect("load").expect("stored");
    assert_eq!(revision, 2);
    assert_eq!(record.format_version, RECORD_FORMAT_VERSION);
    assert!(record.completed);
    assert_eq!(record.player_map, roster);

    let restored = QueueManager::from_saved(&record.queue_state).expect("decode");
    assert_eq!(restored.state(), manager.state());
    assert!(reopened.load("missing").expect("load").is_none());
}

#[test]
fn revisions_are_logged_and_individually_loadable() {
    let (roster, teams) = roster_and_teams(3);
    let mut manager = QueueManager::new(1);
    manager.initialize(teams).expect("initialize");

    let mut sink = SqliteSessionSink::open_in_memory().expect("open sqlite");
    for revision in 1..=4u64 {
        manager.toggle_queue_lock();
        sink.save("evt", revision, &record_for(&manager, &roster, false))
            .expect("save");
    }
    sink.save("other", 1, &record_for(&manager, &roster, false))
        .expect("save other");

    assert_eq!(sink.revisions("evt").expect("revisions"), vec![1, 2, 3, 4]);
    assert_eq!(sink.revisions("other").expect("revisions"), vec![1]);

    let third = sink.load_revision("evt", 3).expect("load").expect("stored");
    let decoded = QueueManager::from_saved(&third.queue_state).expect("decode");
    assert!(decoded.is_queue_locked());
    let second = sink.load_revision("evt", 2).expect("load").expect("stored");
    assert!(!QueueManager::from_saved(&second.queue_state).expect("decode").is_queue_locked());
    assert!(sink.load_revision("evt", 9).expect("load").is_none());
}

#[test]
fn compact_keeps_newest_revisions_only() {
    let (roster, teams) = roster_and_teams(2);
    let mut manager = QueueManager::new(1);
    manager.initialize(teams).expect("initialize");
    let record = record_for(&manager, &roster, false);

    let mut sink = SqliteSessionSink::open_in_memory().expect("open sqlite");
    for revision in 1..=5u64 {
        sink.save("evt", revision, &record).expect("save");
    }
    sink.save("other", 1, &record).expect("save other");

    let removed = SessionSink::compact(&mut sink, "evt", 2).expect("compact");
    assert_eq!(removed, 3);
    assert_eq!(sink.revisions("evt").expect("revisions"), vec![4, 5]);
    assert_eq!(sink.revisions("other").expect("revisions"), vec![1]);
    assert_eq!(sink.load("evt").expect("load").map(|(rev, _)| rev), Some(5));
}

#[test]
fn clear_drops_one_session() {
    let (roster, teams) = roster_and_teams(2);
    let mut manager = QueueManager::new(1);
    manager.initialize(teams).expect("initialize");
    let record = record_for(&manager, &roster, false);

    let mut sink = SqliteSessionSink::open_in_memory().expect("open sqlite");
    sink.save("evt", 1, &record).expect("save");
    sink.save("other", 1, &record).expect("save");

    sink.clear("evt").expect("clear");
    assert!(sink.load("evt").expect("load").is_none());
    assert!(sink.revisions("evt").expect("revisions").is_empty());
    assert!(sink.load("other").expect("load").is_some());
}

#[test]
fn record_with_unknown_version_is_refused() {
    let (roster, teams) = roster_and_teams(2);
    let mut manager = QueueManager::new(1);
    manager.initialize(teams).expect("initialize");

    let mut record = record_for(&manager, &roster, false);
    record.format_version = RECORD_FORMAT_VERSION + 1;
    let payload = record.encode().expect("encode");
    assert!(SessionRecord::decode(&payload).is_err());

    record.format_version = RECORD_FORMAT_VERSION;
    let payload = record.encode().expect("encode");
    assert_eq!(SessionRecord::decode(&payload).expect("decode"), record);
}
