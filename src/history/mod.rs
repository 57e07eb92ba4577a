//! Call history: the store the session controller appends to, plus the
//! query, export and playback helpers the CLI and dialer read it through.

pub mod export;
pub mod store;

pub use export::{audio_file_name, export_audio, export_json, play_record};
pub use store::{MemoryHistory, SqliteHistory};

use crate::call::{CallDirection, CallRecord};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Ordered log of finished calls, most recent first.
pub trait HistoryStore: Send + Sync {
    fn append(&self, record: &CallRecord) -> Result<()>;

    fn list(&self) -> Result<Vec<CallRecord>>;

    /// The `limit` most recent records.
    fn recent(&self, limit: usize) -> Result<Vec<CallRecord>> {
        Ok(self.list()?.into_iter().take(limit).collect())
    }

    /// Highest record id stored, used to keep new ids increasing across runs.
    fn last_id(&self) -> Result<Option<i64>> {
        Ok(self.list()?.iter().map(|record| record.id).max())
    }
}

/// Parameters for searching call history.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct HistoryQuery {
    /// Substring of the peer number
    pub number: Option<String>,
    pub direction: Option<CallDirection>,
    /// Maximum number of results
    pub limit: usize,
}

impl HistoryQuery {
    pub fn new() -> Self {
        Self {
            limit: 20,
            ..Default::default()
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.number = Some(number.into());
        self
    }

    pub fn with_direction(mut self, direction: CallDirection) -> Self {
        self.direction = Some(direction);
        self
    }

    /// Returns true if no filters are specified (only limit)
    pub fn has_filters(&self) -> bool {
        self.number.is_some() || self.direction.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_query_has_filters() {
        let query = HistoryQuery::new();
        assert!(!query.has_filters());
        assert_eq!(query.limit, 20);

        let query = HistoryQuery::new().with_number("9876");
        assert!(query.has_filters());

        let query = HistoryQuery::new().with_direction(CallDirection::Missed);
        assert!(query.has_filters());
    }

    #[test]
    fn test_history_query_builder() {
        let query = HistoryQuery::new()
            .with_limit(50)
            .with_number("+91")
            .with_direction(CallDirection::Outgoing);

        assert_eq!(query.limit, 50);
        assert_eq!(query.number, Some("+91".to_string()));
        assert_eq!(query.direction, Some(CallDirection::Outgoing));
    }
}
