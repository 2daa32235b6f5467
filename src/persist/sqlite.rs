//! SQLite-backed session store with an append-only revision log.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OptionalExtension, params};

use super::{PersistResult, Revision, SessionRecord, SessionSink};

/// SQLite implementation of [`crate::persist::SessionSink`].
pub struct SqliteSessionSink {
    conn: Connection,
}

impl SqliteSessionSink {
    /// Opens or creates a SQLite-backed sink at `path`.
    ///
    /// Enables WAL mode and sets `synchronous=NORMAL`.
    pub fn open(path: impl AsRef<Path>) -> PersistResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_connection(conn)
    }

    /// Opens an in-memory SQLite sink.
    pub fn open_in_memory() -> PersistResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(conn)
    }

    fn init_connection(conn: Connection) -> PersistResult<Self> {
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(Self { conn })
    }

    /// Stores `record` as the latest state and appends it to the revision log.
    pub fn save(&mut self, session_id: &str, revision: Revision, record: &SessionRecord) -> PersistResult<()> {
        let payload = record.encode()?;
        let ts_ms = now_ms() as i64;

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO sessions(session_id, revision, ts_ms, payload) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(session_id) DO UPDATE SET
                revision = excluded.revision,
                ts_ms = excluded.ts_ms,
                payload = excluded.payload",
            params![session_id, revision as i64, ts_ms, payload],
        )?;
        tx.execute(
            "INSERT INTO revisions(session_id, revision, ts_ms, payload) VALUES (?1, ?2, ?3, ?4)",
            params![session_id, revision as i64, ts_ms, payload],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Loads the latest record for `session_id`.
    pub fn load(&self, session_id: &str) -> PersistResult<Option<(Revision, SessionRecord)>> {
        let row: Option<(i64, Vec<u8>)> = self
            .conn
            .query_row(
                "SELECT revision, payload FROM sessions WHERE session_id = ?1",
                params![session_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((revision, payload)) = row else {
            return Ok(None);
        };
        Ok(Some((revision as Revision, SessionRecord::decode(&payload)?)))
    }

    /// Loads a specific logged revision, if it has not been compacted away.
    pub fn load_revision(&self, session_id: &str, revision: Revision) -> PersistResult<Option<SessionRecord>> {
        let payload: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT payload FROM revisions WHERE session_id = ?1 AND revision = ?2
                 ORDER BY id DESC LIMIT 1",
                params![session_id, revision as i64],
                |row| row.get(0),
            )
            .optional()?;

        payload.map(|p| SessionRecord::decode(&p)).transpose()
    }

    /// Logged revisions for `session_id`, oldest first.
    pub fn revisions(&self, session_id: &str) -> PersistResult<Vec<Revision>> {
        let mut stmt = self
            .conn
            .prepare("SELECT revision FROM revisions WHERE session_id = ?1 ORDER BY id ASC")?;
        let rows = stmt.query_map(params![session_id], |row| row.get::<_, i64>(0))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row? as Revision);
        }
        Ok(out)
    }

    /// Removes the stored state and every logged revision of `session_id`.
    pub fn clear(&mut self, session_id: &str) -> PersistResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM sessions WHERE session_id = ?1", params![session_id])?;
        tx.execute("DELETE FROM revisions WHERE session_id = ?1", params![session_id])?;
        tx.commit()?;
        Ok(())
    }

    /// Deletes all but the newest `keep` logged revisions of `session_id`.
    pub fn compact(&mut self, session_id: &str, keep: usize) -> PersistResult<usize> {
        let count = self.conn.execute(
            "DELETE FROM revisions WHERE session_id = ?1 AND id NOT IN (
                SELECT id FROM revisions WHERE session_id = ?1 ORDER BY id DESC LIMIT ?2
             )",
            params![session_id, keep as i64],
        )?;
        Ok(count)
    }
}

impl SessionSink for SqliteSessionSink {
    fn save(&mut self, session_id: &str, revision: Revision, record: &SessionRecord) -> PersistResult<()> {
        SqliteSessionSink::save(self, session_id, revision, record)
    }

    fn load(&self, session_id: &str) -> PersistResult<Option<(Revision, SessionRecord)>> {
        SqliteSessionSink::load(self, session_id)
    }

    fn clear(&mut self, session_id: &str) -> PersistResult<()> {
        SqliteSessionSink::clear(self, session_id)
    }

    fn compact(&mut self, session_id: &str, keep: usize) -> PersistResult<usize> {
        SqliteSessionSink::compact(self, session_id, keep)
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
