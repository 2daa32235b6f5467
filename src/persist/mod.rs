pub mod sqlite;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::roster::PlayerRegistry;

/// Version number for serialized [`SessionRecord`] payloads.
pub const RECORD_FORMAT_VERSION: u16 = 1;

/// Monotonic per-session save counter.
pub type Revision = u64;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("{0}")]
    Message(String),
}

pub type PersistResult<T> = Result<T, PersistError>;

/// What a host stores for one scheduling session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Payload format version.
    pub format_version: u16,
    /// External identity to player id mapping.
    pub player_map: PlayerRegistry,
    /// Output of [`crate::core::manager::QueueManager::save_state`].
    pub queue_state: String,
    /// Set once the session is finalized.
    #[serde(default)]
    pub completed: bool,
}

impl SessionRecord {
    /// Constructs a record using [`RECORD_FORMAT_VERSION`].
    pub fn new(player_map: PlayerRegistry, queue_state: String, completed: bool) -> Self {
        Self {
            format_version: RECORD_FORMAT_VERSION,
            player_map,
            queue_state,
            completed,
        }
    }

    pub fn encode(&self) -> PersistResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(payload: &[u8]) -> PersistResult<Self> {
        let record: Self = serde_json::from_slice(payload)?;
        if record.format_version != RECORD_FORMAT_VERSION {
            return Err(PersistError::Message(format!(
                "unsupported session record version: {}",
                record.format_version
            )));
        }
        Ok(record)
    }
}

/// Durable storage for session records.
pub trait SessionSink: Send {
    fn save(&mut self, session_id: &str, revision: Revision, record: &SessionRecord) -> PersistResult<()>;
    fn load(&self, session_id: &str) -> PersistResult<Option<(Revision, SessionRecord)>>;
    fn clear(&mut self, session_id: &str) -> PersistResult<()>;
    fn compact(&mut self, _session_id: &str, _keep: usize) -> PersistResult<usize> {
        Ok(0)
    }
}
