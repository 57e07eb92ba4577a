use anyhow::{anyhow, Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, warn};

use super::{HistoryQuery, HistoryStore};
use crate::call::{CallRecord, StoredCallRecord};
use crate::db;

/// Process-local history, handy for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    records: Mutex<Vec<CallRecord>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryHistory {
    fn append(&self, record: &CallRecord) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| anyhow!("history lock poisoned"))?;
        records.insert(0, record.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<CallRecord>> {
        let records = self
            .records
            .lock()
            .map_err(|_| anyhow!("history lock poisoned"))?;
        Ok(records.clone())
    }
}

/// History persisted in the SQLite `calls` table.
pub struct SqliteHistory {
    conn: Mutex<Connection>,
    max_entries: i64,
}

impl SqliteHistory {
    /// Open the database in the data directory.
    pub fn open_default(max_entries: i64) -> Result<Self> {
        Ok(Self::from_connection(db::init_db()?, max_entries))
    }

    pub fn open(path: &Path, max_entries: i64) -> Result<Self> {
        Ok(Self::from_connection(db::init_db_at(path)?, max_entries))
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        db::migrate(&conn)?;
        Ok(Self::from_connection(conn, 0))
    }

    fn from_connection(conn: Connection, max_entries: i64) -> Self {
        Self {
            conn: Mutex::new(conn),
            max_entries,
        }
    }

    pub fn search(&self, query: &HistoryQuery) -> Result<Vec<CallRecord>> {
        let rows = self.with_conn(|conn| {
            db::search_calls(
                conn,
                query.number.as_deref(),
                query.direction,
                Some(query.limit),
            )
        })?;
        decode_all(rows)
    }

    pub fn get(&self, id: i64) -> Result<Option<CallRecord>> {
        self.with_conn(|conn| db::get_call(conn, id))?
            .map(decode)
            .transpose()
    }

    pub fn count(&self) -> Result<i64> {
        self.with_conn(db::count_calls)
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow!("history database lock poisoned"))?;
        f(&conn)
    }
}

impl HistoryStore for SqliteHistory {
    fn append(&self, record: &CallRecord) -> Result<()> {
        let stored = StoredCallRecord::from(record);
        let max_entries = self.max_entries;

        self.with_conn(|conn| {
            db::insert_call(conn, &stored)?;
            if max_entries > 0 {
                let pruned = db::prune_old_calls(conn, max_entries)?;
                if pruned > 0 {
                    info!("Pruned {} old call(s) from history", pruned);
                }
            }
            Ok(())
        })?;

        debug!("Saved call {} ({})", record.id, record.direction.as_str());
        Ok(())
    }

    fn list(&self) -> Result<Vec<CallRecord>> {
        let rows = self.with_conn(|conn| db::get_recent_calls(conn, None))?;
        decode_all(rows)
    }

    fn recent(&self, limit: usize) -> Result<Vec<CallRecord>> {
        let rows = self.with_conn(|conn| db::get_recent_calls(conn, Some(limit)))?;
        decode_all(rows)
    }

    fn last_id(&self) -> Result<Option<i64>> {
        self.with_conn(db::last_call_id)
    }
}

fn decode(stored: StoredCallRecord) -> Result<CallRecord> {
    let id = stored.id;
    CallRecord::try_from(stored).with_context(|| format!("Call {} has corrupt audio data", id))
}

/// Rows that fail to decode are skipped so the rest of the history stays readable.
fn decode_all(rows: Vec<StoredCallRecord>) -> Result<Vec<CallRecord>> {
    Ok(rows
        .into_iter()
        .filter_map(|row| match decode(row) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping unreadable call: {:#}", e);
                None
            }
        })
        .collect())
}
