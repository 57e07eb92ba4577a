//! Finalized call log entries and the flat form they are persisted in.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};

use super::status::CallDirection;

/// Recorded audio attached to a call: raw bytes plus the MIME type they are in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPayload {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl AudioPayload {
    pub fn new(bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            bytes,
            mime: mime.into(),
        }
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub fn from_base64(
        encoded: &str,
        mime: impl Into<String>,
    ) -> Result<Self, base64::DecodeError> {
        Ok(Self {
            bytes: STANDARD.decode(encoded)?,
            mime: mime.into(),
        })
    }
}

/// One completed or missed call attempt. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    pub id: i64,
    pub number: String,
    pub direction: CallDirection,
    /// Unix epoch milliseconds.
    pub start: i64,
    pub end: i64,
    pub duration_ms: i64,
    pub audio: Option<AudioPayload>,
}

impl CallRecord {
    /// A declined incoming call. Never carries audio.
    pub fn missed(id: i64, number: impl Into<String>, at: i64) -> Self {
        Self {
            id,
            number: number.into(),
            direction: CallDirection::Missed,
            start: at,
            end: at,
            duration_ms: 0,
            audio: None,
        }
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    pub fn duration_seconds(&self) -> i64 {
        (self.duration_ms as f64 / 1000.0).round() as i64
    }
}

/// Flat persisted shape: `id, number, direction, start, end, durationMs, audioBase64, mime`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCallRecord {
    pub id: i64,
    pub number: String,
    pub direction: CallDirection,
    pub start: i64,
    pub end: i64,
    pub duration_ms: i64,
    pub audio_base64: Option<String>,
    #[serde(default)]
    pub mime: Option<String>,
}

impl From<&CallRecord> for StoredCallRecord {
    fn from(record: &CallRecord) -> Self {
        Self {
            id: record.id,
            number: record.number.clone(),
            direction: record.direction,
            start: record.start,
            end: record.end,
            duration_ms: record.duration_ms,
            audio_base64: record.audio.as_ref().map(AudioPayload::to_base64),
            mime: record.audio.as_ref().map(|audio| audio.mime.clone()),
        }
    }
}

impl TryFrom<StoredCallRecord> for CallRecord {
    type Error = base64::DecodeError;

    fn try_from(stored: StoredCallRecord) -> Result<Self, Self::Error> {
        let audio = match (stored.direction, stored.audio_base64) {
            (CallDirection::Missed, _) | (_, None) => None,
            (_, Some(encoded)) => {
                let mime = stored.mime.unwrap_or_else(|| DEFAULT_MIME.to_string());
                Some(AudioPayload::from_base64(&encoded, mime)?)
            }
        };

        Ok(Self {
            id: stored.id,
            number: stored.number,
            direction: stored.direction,
            start: stored.start,
            end: stored.end,
            duration_ms: stored.duration_ms,
            audio,
        })
    }
}

/// MIME assumed for stored audio that lost its type.
pub const DEFAULT_MIME: &str = "audio/webm";

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Hands out timestamp-derived record ids that never repeat within a process.
#[derive(Debug, Default)]
pub struct RecordIdGenerator {
    last: AtomicI64,
}

impl RecordIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue after ids already present in a store.
    pub fn starting_after(last: i64) -> Self {
        Self {
            last: AtomicI64::new(last),
        }
    }

    pub fn next_at(&self, now_ms: i64) -> i64 {
        let mut current = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now_ms.max(current + 1);
            match self.last.compare_exchange_weak(
                current,
                candidate,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(actual) => current = actual,
            }
        }
    }

    pub fn next(&self) -> i64 {
        self.next_at(now_millis())
    }
}
