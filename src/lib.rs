//! Court rotation scheduling for doubles play: a fixed set of courts fed from
//! a queue of teams, with live scores, match history, standings, undo/redo and
//! a versioned state blob for external storage.
//!
//! # Examples
//!
//! In-memory usage with [`core::manager::QueueManager`]:
//! ```
//! use courtqueue::{
//!     core::manager::QueueManager,
//!     team::{Player, Score, Team},
//! };
//!
//! let team = |a: u32, b: u32| {
//!     Team::new(Player::new(a, format!("P{a}")), Player::new(b, format!("P{b}"))).expect("team")
//! };
//! let teams: Vec<Team> = (0..3).map(|i| team(i * 2 + 1, i * 2 + 2)).collect();
//!
//! let mut manager = QueueManager::new(1);
//! manager.initialize(teams.clone()).expect("initialize");
//! let rotation = manager
//!     .record_result(1, [Score::new(teams[0].clone(), 21), Score::new(teams[1].clone(), 15)])
//!     .expect("record");
//! assert_eq!(rotation.started, Some(2));
//!
//! let blob = manager.save_state().expect("save");
//! let restored = QueueManager::from_saved(&blob).expect("load");
//! assert_eq!(restored.state(), manager.state());
//! ```
//!
//! Session usage with the SQLite sink:
//! ```no_run
//! use courtqueue::{
//!     persist::sqlite::SqliteSessionSink,
//!     runtime::handle::{spawn_session, Session, SessionConfig},
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let sink = SqliteSessionSink::open("sessions.db").expect("open sqlite");
//! let session = Session::resume(&sink, "event-42")
//!     .expect("resume")
//!     .unwrap_or_else(|| Session::new(2));
//! let handle = spawn_session("event-42", session, Some(Box::new(sink)), SessionConfig::default());
//! println!("{}", handle.board().await.expect("board"));
//! handle.shutdown().await.expect("shutdown");
//! # }
//! ```

/// Versioned state encoding and strict decoding.
pub mod codec;
/// Queue manager and its snapshot undo/redo.
pub mod core;
/// Courts and live matches.
pub mod court;
/// Error type shared by core operations.
pub mod error;
/// Match history and standings.
pub mod history;
/// Session persistence abstraction and SQLite implementation.
pub mod persist;
/// Waiting line of teams.
pub mod queue;
/// External identity to player id mapping.
pub mod roster;
/// Single-writer session runtime and events.
pub mod runtime;
/// Player, team, and score value types.
pub mod team;
/// Shared primitive types and enums.
pub mod types;
