//! Call status types and the events the session controller broadcasts.

use serde::{Deserialize, Serialize};

use super::record::CallRecord;

/// Phase of the single call session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallStatus {
    Idle,
    Calling,
    Incoming,
    InCall,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Calling => "calling",
            Self::Incoming => "incoming",
            Self::InCall => "in-call",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallDirection {
    Outgoing,
    Incoming,
    Missed,
}

impl CallDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Outgoing => "outgoing",
            Self::Incoming => "incoming",
            Self::Missed => "missed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "outgoing" => Some(Self::Outgoing),
            "incoming" => Some(Self::Incoming),
            "missed" => Some(Self::Missed),
            _ => None,
        }
    }
}

/// The call currently being set up or talked on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSession {
    pub peer_number: String,
    pub direction: CallDirection,
    /// Set when audio can flow: on dial for outgoing, on answer for incoming.
    pub started_at: Option<i64>,
    pub status: CallStatus,
}

/// Call metadata handed to the recorder when a recording is finalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallMeta {
    pub number: String,
    pub direction: CallDirection,
    pub start: i64,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    StatusChanged(CallStatus),
    RecordingStarted { mime: String },
    RecordingUnavailable(String),
    RecordSaved(CallRecord),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_status_as_str() {
        assert_eq!(CallStatus::Idle.as_str(), "idle");
        assert_eq!(CallStatus::Calling.as_str(), "calling");
        assert_eq!(CallStatus::Incoming.as_str(), "incoming");
        assert_eq!(CallStatus::InCall.as_str(), "in-call");
    }

    #[test]
    fn test_call_status_serialization() {
        let json = serde_json::to_string(&CallStatus::InCall).unwrap();
        assert_eq!(json, "\"in-call\"");

        let parsed: CallStatus = serde_json::from_str("\"incoming\"").unwrap();
        assert_eq!(parsed, CallStatus::Incoming);
    }

    #[test]
    fn test_direction_parse_matches_as_str() {
        for direction in [
            CallDirection::Outgoing,
            CallDirection::Incoming,
            CallDirection::Missed,
        ] {
            assert_eq!(CallDirection::parse(direction.as_str()), Some(direction));
        }
        assert_eq!(CallDirection::parse("voicemail"), None);
    }
}
