use std::sync::Arc;

use thiserror::Error;
use tokio::{
    sync::{Mutex, broadcast, mpsc, oneshot},
    time::Duration,
};
use tracing::{debug, info, warn};

use crate::{
    core::manager::{QueueManager, Rotation},
    error::QueueError,
    history::TeamStats,
    persist::{PersistError, Revision, SessionRecord, SessionSink},
    roster::PlayerRegistry,
    team::{Player, Score, Team},
    types::{CourtId, Points, TeamSlot},
};

use super::events::SessionEvent;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("persistence failed: {0}")]
    Persist(#[from] PersistError),

    #[error("session is completed")]
    SessionCompleted,

    #[error("session loop is gone")]
    ChannelClosed,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub save_attempts: u32,
    pub retry_backoff_ms: u64,
    pub command_capacity: usize,
    pub event_capacity: usize,
    /// Logged revisions kept per session after each save; 0 keeps all.
    pub keep_revisions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            save_attempts: 3,
            retry_backoff_ms: 50,
            command_capacity: 256,
            event_capacity: 1024,
            keep_revisions: 0,
        }
    }
}

/// Everything one scheduling session persists.
#[derive(Debug, Clone)]
pub struct Session {
    pub manager: QueueManager,
    pub roster: PlayerRegistry,
    pub completed: bool,
    /// Last revision committed to storage.
    pub revision: Revision,
}

impl Session {
    pub fn new(court_count: usize) -> Self {
        Self {
            manager: QueueManager::new(court_count),
            roster: PlayerRegistry::new(),
            completed: false,
            revision: 0,
        }
    }

    pub fn from_record(revision: Revision, record: SessionRecord) -> Result<Self, RuntimeError> {
        Ok(Self {
            manager: QueueManager::from_saved(&record.queue_state)?,
            roster: record.player_map,
            completed: record.completed,
            revision,
        })
    }

    /// Rebuilds the stored session `session_id`, if there is one.
    pub fn resume(sink: &dyn SessionSink, session_id: &str) -> Result<Option<Self>, RuntimeError> {
        sink.load(session_id)?
            .map(|(revision, record)| Self::from_record(revision, record))
            .transpose()
    }

    pub fn to_record(&self) -> Result<SessionRecord, RuntimeError> {
        Ok(SessionRecord::new(
            self.roster.clone(),
            self.manager.save_state()?,
            self.completed,
        ))
    }
}

pub struct SessionHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<SessionEvent>,
}

impl Clone for SessionHandle {
    fn clone(&self) -> Self {
        Self {
            cmd_tx: self.cmd_tx.clone(),
            events_tx: self.events_tx.clone(),
        }
    }
}

type Reply<T> = oneshot::Sender<Result<T, RuntimeError>>;

enum Command {
    Setup {
        court_count: usize,
        teams: Vec<Team>,
        resp: Reply<()>,
    },
    MapPlayers {
        profiles: Vec<(String, String)>,
        resp: Reply<Vec<Player>>,
    },
    RecordResult {
        court_id: CourtId,
        scores: [Score; 2],
        resp: Reply<Rotation>,
    },
    UpdateScore {
        court_id: CourtId,
        slot: TeamSlot,
        delta: i32,
        resp: Reply<Points>,
    },
    AddTeams {
        teams: Vec<Team>,
        resp: Reply<()>,
    },
    ReorderQueue {
        from: usize,
        to: usize,
        resp: Reply<()>,
    },
    ToggleLock {
        resp: Reply<bool>,
    },
    EditResult {
        match_index: usize,
        scores: [Score; 2],
        resp: Reply<()>,
    },
    Undo {
        resp: Reply<bool>,
    },
    Redo {
        resp: Reply<bool>,
    },
    Snapshot {
        resp: Reply<Session>,
    },
    Standings {
        resp: Reply<Vec<TeamStats>>,
    },
    Board {
        resp: Reply<String>,
    },
    Complete {
        resp: Reply<()>,
    },
    Reset {
        resp: Reply<()>,
    },
    Shutdown {
        resp: Reply<()>,
    },
}

/// Spawns the single-writer loop that owns `session`.
///
/// Every successful mutation is committed to `sink` before it is
/// acknowledged; a commit that keeps failing puts the session back to its
/// state before the command.
pub fn spawn_session(
    session_id: impl Into<String>,
    session: Session,
    sink: Option<Box<dyn SessionSink>>,
    config: SessionConfig,
) -> SessionHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(config.command_capacity.max(1));
    let (events_tx, _) = broadcast::channel::<SessionEvent>(config.event_capacity.max(1));

    let mut actor = Actor {
        session_id: session_id.into(),
        session,
        sink: sink.map(|s| Arc::new(Mutex::new(s))),
        events_tx: events_tx.clone(),
        config,
    };

    tokio::spawn(async move {
        info!(session_id = %actor.session_id, revision = actor.session.revision, "session started");
        while let Some(cmd) = cmd_rx.recv().await {
            if actor.handle(cmd).await {
                break;
            }
        }
        info!(session_id = %actor.session_id, "session stopped");
    });

    SessionHandle { cmd_tx, events_tx }
}

impl SessionHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events_tx.subscribe()
    }

    /// Replaces the manager with a fresh one of `court_count` courts and
    /// fills it from `teams`.
    pub async fn setup(&self, court_count: usize, teams: Vec<Team>) -> Result<(), RuntimeError> {
        self.call(|resp| Command::Setup {
            court_count,
            teams,
            resp,
        })
        .await
    }

    /// Maps `(external id, name)` pairs to players, assigning ids as needed.
    pub async fn map_players(&self, profiles: Vec<(String, String)>) -> Result<Vec<Player>, RuntimeError> {
        self.call(|resp| Command::MapPlayers { profiles, resp }).await
    }

    pub async fn record_result(&self, court_id: CourtId, scores: [Score; 2]) -> Result<Rotation, RuntimeError> {
        self.call(|resp| Command::RecordResult {
            court_id,
            scores,
            resp,
        })
        .await
    }

    pub async fn update_score(&self, court_id: CourtId, slot: TeamSlot, delta: i32) -> Result<Points, RuntimeError> {
        self.call(|resp| Command::UpdateScore {
            court_id,
            slot,
            delta,
            resp,
        })
        .await
    }

    pub async fn add_teams(&self, teams: Vec<Team>) -> Result<(), RuntimeError> {
        self.call(|resp| Command::AddTeams { teams, resp }).await
    }

    pub async fn reorder_queue(&self, from: usize, to: usize) -> Result<(), RuntimeError> {
        self.call(|resp| Command::ReorderQueue { from, to, resp }).await
    }

    pub async fn toggle_queue_lock(&self) -> Result<bool, RuntimeError> {
        self.call(|resp| Command::ToggleLock { resp }).await
    }

    pub async fn edit_result(&self, match_index: usize, scores: [Score; 2]) -> Result<(), RuntimeError> {
        self.call(|resp| Command::EditResult {
            match_index,
            scores,
            resp,
        })
        .await
    }

    pub async fn undo(&self) -> Result<bool, RuntimeError> {
        self.call(|resp| Command::Undo { resp }).await
    }

    pub async fn redo(&self) -> Result<bool, RuntimeError> {
        self.call(|resp| Command::Redo { resp }).await
    }

    /// Clone of the whole session as the loop currently sees it.
    pub async fn snapshot(&self) -> Result<Session, RuntimeError> {
        self.call(|resp| Command::Snapshot { resp }).await
    }

    pub async fn standings(&self) -> Result<Vec<TeamStats>, RuntimeError> {
        self.call(|resp| Command::Standings { resp }).await
    }

    /// Text rendering of courts and queue.
    pub async fn board(&self) -> Result<String, RuntimeError> {
        self.call(|resp| Command::Board { resp }).await
    }

    pub async fn complete(&self) -> Result<(), RuntimeError> {
        self.call(|resp| Command::Complete { resp }).await
    }

    /// Drops the stored session and starts over with one empty court.
    pub async fn reset(&self) -> Result<(), RuntimeError> {
        self.call(|resp| Command::Reset { resp }).await
    }

    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.call(|resp| Command::Shutdown { resp }).await
    }

    async fn call<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(tx))
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }
}

struct Actor {
    session_id: String,
    session: Session,
    sink: Option<Arc<Mutex<Box<dyn SessionSink>>>>,
    events_tx: broadcast::Sender<SessionEvent>,
    config: SessionConfig,
}

impl Actor {
    async fn handle(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Setup {
                court_count,
                teams,
                resp,
            } => {
                let res = self
                    .mutate(|s| {
                        let mut manager = QueueManager::new(court_count);
                        manager.initialize(teams)?;
                        s.manager = manager;
                        Ok(())
                    })
                    .await;
                if res.is_ok() {
                    self.emit(SessionEvent::Initialized {
                        courts: self.session.manager.courts().len(),
                    });
                }
                let _ = resp.send(res);
            }
            Command::MapPlayers { profiles, resp } => {
                let res = self
                    .mutate(|s| {
                        Ok(profiles
                            .into_iter()
                            .map(|(external, name)| s.roster.player(&external, name))
                            .collect())
                    })
                    .await;
                let _ = resp.send(res);
            }
            Command::RecordResult {
                court_id,
                scores,
                resp,
            } => {
                let res = self
                    .mutate(|s| Ok(s.manager.record_result(court_id, scores)?))
                    .await;
                if let Ok(rotation) = &res {
                    self.emit(SessionEvent::ResultRecorded {
                        court_id,
                        finished: rotation.finished,
                        started: rotation.started,
                    });
                }
                let _ = resp.send(res);
            }
            Command::UpdateScore {
                court_id,
                slot,
                delta,
                resp,
            } => {
                let res = self
                    .mutate(|s| Ok(s.manager.update_score(court_id, slot, delta)?))
                    .await;
                if let Ok(score) = &res {
                    self.emit(SessionEvent::ScoreUpdated {
                        court_id,
                        slot,
                        score: *score,
                    });
                }
                let _ = resp.send(res);
            }
            Command::AddTeams { teams, resp } => {
                let res = self
                    .mutate(|s| Ok(s.manager.add_teams_to_queue(teams)?))
                    .await;
                if res.is_ok() {
                    self.emit_queue_changed();
                }
                let _ = resp.send(res);
            }
            Command::ReorderQueue { from, to, resp } => {
                let res = self
                    .mutate(|s| Ok(s.manager.reorder_queue(from, to)?))
                    .await;
                if res.is_ok() {
                    self.emit_queue_changed();
                }
                let _ = resp.send(res);
            }
            Command::ToggleLock { resp } => {
                let res = self.mutate(|s| Ok(s.manager.toggle_queue_lock())).await;
                if let Ok(locked) = &res {
                    self.emit(SessionEvent::QueueLockToggled { locked: *locked });
                }
                let _ = resp.send(res);
            }
            Command::EditResult {
                match_index,
                scores,
                resp,
            } => {
                let res = self
                    .mutate(|s| Ok(s.manager.edit_match_result(match_index, scores)?))
                    .await;
                if res.is_ok() {
                    self.emit(SessionEvent::HistoryEdited { match_index });
                }
                let _ = resp.send(res);
            }
            Command::Undo { resp } => {
                let res = if self.session.manager.can_undo() {
                    self.mutate(|s| Ok(s.manager.undo())).await
                } else {
                    Ok(false)
                };
                if matches!(res, Ok(true)) {
                    self.emit(SessionEvent::UndoApplied);
                }
                let _ = resp.send(res);
            }
            Command::Redo { resp } => {
                let res = if self.session.manager.can_redo() {
                    self.mutate(|s| Ok(s.manager.redo())).await
                } else {
                    Ok(false)
                };
                if matches!(res, Ok(true)) {
                    self.emit(SessionEvent::RedoApplied);
                }
                let _ = resp.send(res);
            }
            Command::Snapshot { resp } => {
                let _ = resp.send(Ok(self.session.clone()));
            }
            Command::Standings { resp } => {
                let _ = resp.send(Ok(self.session.manager.team_statistics()));
            }
            Command::Board { resp } => {
                let _ = resp.send(Ok(self.session.manager.beautify_queue()));
            }
            Command::Complete { resp } => {
                let res = self
                    .mutate(|s| {
                        s.completed = true;
                        Ok(())
                    })
                    .await;
                if res.is_ok() {
                    self.emit(SessionEvent::Completed);
                }
                let _ = resp.send(res);
            }
            Command::Reset { resp } => {
                let res = self.reset().await;
                if res.is_ok() {
                    self.emit(SessionEvent::Reset);
                }
                let _ = resp.send(res);
            }
            Command::Shutdown { resp } => {
                let _ = resp.send(Ok(()));
                return true;
            }
        }
        false
    }

    /// Applies `op`, then commits. Nothing is kept unless both succeed.
    async fn mutate<T>(
        &mut self,
        op: impl FnOnce(&mut Session) -> Result<T, RuntimeError>,
    ) -> Result<T, RuntimeError> {
        if self.session.completed {
            return Err(RuntimeError::SessionCompleted);
        }

        let before = self.session.clone();
        let out = op(&mut self.session)?;

        if let Err(err) = self.commit().await {
            warn!(session_id = %self.session_id, error = %err, "commit failed, rolling back");
            self.session = before;
            self.emit(SessionEvent::RolledBack {
                reason: err.to_string(),
            });
            return Err(err);
        }
        Ok(out)
    }

    async fn commit(&mut self) -> Result<(), RuntimeError> {
        let revision = self.session.revision + 1;
        let Some(sink) = &self.sink else {
            self.session.revision = revision;
            self.emit(SessionEvent::Saved { revision });
            return Ok(());
        };

        let record = self.session.to_record()?;
        let attempts = self.config.save_attempts.max(1);
        let mut last_err = PersistError::Message("no save attempted".to_string());

        for attempt in 1..=attempts {
            let sink_ref = Arc::clone(sink);
            let session_id = self.session_id.clone();
            let record = record.clone();

            let result = tokio::task::spawn_blocking(move || {
                sink_ref.blocking_lock().save(&session_id, revision, &record)
            })
            .await
            .map_err(|e| PersistError::Message(format!("join error: {e}")))
            .and_then(|inner| inner);

            match result {
                Ok(()) => {
                    self.session.revision = revision;
                    debug!(session_id = %self.session_id, revision, attempt, "session saved");
                    self.compact(sink).await;
                    self.emit(SessionEvent::Saved { revision });
                    return Ok(());
                }
                Err(err) => {
                    warn!(session_id = %self.session_id, revision, attempt, error = %err, "save failed");
                    last_err = err;
                    if attempt < attempts {
                        let backoff = self.config.retry_backoff_ms * u64::from(attempt);
                        tokio::time::sleep(Duration::from_millis(backoff)).await;
                    }
                }
            }
        }

        Err(RuntimeError::Persist(last_err))
    }

    // Trimming the revision log never fails a commit that already landed.
    async fn compact(&self, sink: &Arc<Mutex<Box<dyn SessionSink>>>) {
        let keep = self.config.keep_revisions;
        if keep == 0 {
            return;
        }
        let sink_ref = Arc::clone(sink);
        let session_id = self.session_id.clone();
        let result = tokio::task::spawn_blocking(move || sink_ref.blocking_lock().compact(&session_id, keep))
            .await
            .map_err(|e| PersistError::Message(format!("join error: {e}")))
            .and_then(|inner| inner);

        match result {
            Ok(removed) => debug!(session_id = %self.session_id, removed, "revision log compacted"),
            Err(err) => warn!(session_id = %self.session_id, error = %err, "compaction failed"),
        }
    }

    async fn reset(&mut self) -> Result<(), RuntimeError> {
        if self.session.completed {
            return Err(RuntimeError::SessionCompleted);
        }
        if let Some(sink) = &self.sink {
            let sink_ref = Arc::clone(sink);
            let session_id = self.session_id.clone();
            tokio::task::spawn_blocking(move || sink_ref.blocking_lock().clear(&session_id))
                .await
                .map_err(|e| PersistError::Message(format!("join error: {e}")))??;
        }
        info!(session_id = %self.session_id, "session reset");
        self.session = Session::new(1);
        Ok(())
    }

    fn emit_queue_changed(&self) {
        self.emit(SessionEvent::QueueChanged {
            queued: self.session.manager.queue().len(),
        });
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events_tx.send(event);
    }
}
