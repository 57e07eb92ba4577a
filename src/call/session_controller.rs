use anyhow::Result;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::error::DialerError;
use super::number::NumberValidator;
use super::record::{now_millis, CallRecord, RecordIdGenerator};
use super::status::{CallDirection, CallMeta, CallSession, CallStatus, SessionEvent};
use crate::audio::{RecordingError, RecordingHandle, RecordingManager};
use crate::config::Config;
use crate::history::HistoryStore;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub incoming_demo_number: String,
    pub recording_enabled: bool,
}

impl ControllerOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            incoming_demo_number: config.dialer.incoming_demo_number.clone(),
            recording_enabled: config.recording.enabled,
        }
    }
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Drives one call at a time and records the in-call window.
///
/// Operations that do not apply to the current status are ignored and return
/// the unchanged status; only malformed numbers and history writes fail.
pub struct SessionController {
    recorder: RecordingManager,
    history: Arc<dyn HistoryStore>,
    validator: NumberValidator,
    ids: RecordIdGenerator,
    options: ControllerOptions,
    session: Option<CallSession>,
    recording: Option<RecordingHandle>,
    abort: CancellationToken,
    events: broadcast::Sender<SessionEvent>,
}

enum RecordingOutcome {
    Started,
    Unavailable,
    Aborted,
}

impl SessionController {
    pub fn new(
        recorder: RecordingManager,
        history: Arc<dyn HistoryStore>,
        options: ControllerOptions,
    ) -> Result<Self> {
        let ids = match history.last_id()? {
            Some(last) => RecordIdGenerator::starting_after(last),
            None => RecordIdGenerator::new(),
        };
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            recorder,
            history,
            validator: NumberValidator::new()?,
            ids,
            options,
            session: None,
            recording: None,
            abort: CancellationToken::new(),
            events,
        })
    }

    /// Use `abort` as the root signal for device waits. Cancelling it aborts
    /// any in-flight recording start or stop.
    pub fn with_abort(mut self, abort: CancellationToken) -> Self {
        self.abort = abort;
        self
    }

    pub fn abort_signal(&self) -> CancellationToken {
        self.abort.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn status(&self) -> CallStatus {
        self.session
            .as_ref()
            .map(|session| session.status)
            .unwrap_or(CallStatus::Idle)
    }

    pub fn session(&self) -> Option<&CallSession> {
        self.session.as_ref()
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    /// idle → calling → in-call. Recording starts between the two steps;
    /// if the device is refused the call still connects, unrecorded.
    pub async fn place_call(&mut self, number: &str) -> Result<CallStatus, DialerError> {
        if let Some(current) = self.ignore_unless(CallStatus::Idle, "place_call") {
            return Ok(current);
        }

        if !self.validator.is_valid(number) {
            debug!("Rejected number {:?}", number);
            return Err(DialerError::InvalidNumber(number.to_string()));
        }

        info!("Placing call to {}", number);
        self.session = Some(CallSession {
            peer_number: number.to_string(),
            direction: CallDirection::Outgoing,
            started_at: Some(now_millis()),
            status: CallStatus::Calling,
        });
        self.emit(SessionEvent::StatusChanged(CallStatus::Calling));

        match self.begin_recording().await {
            RecordingOutcome::Aborted => {
                self.reset();
                Ok(CallStatus::Idle)
            }
            RecordingOutcome::Started | RecordingOutcome::Unavailable => {
                self.set_status(CallStatus::InCall);
                Ok(CallStatus::InCall)
            }
        }
    }

    /// idle → incoming, from the configured demo number.
    pub fn simulate_incoming(&mut self) -> CallStatus {
        if let Some(current) = self.ignore_unless(CallStatus::Idle, "simulate_incoming") {
            return current;
        }

        info!("Incoming call from {}", self.options.incoming_demo_number);
        self.session = Some(CallSession {
            peer_number: self.options.incoming_demo_number.clone(),
            direction: CallDirection::Incoming,
            started_at: None,
            status: CallStatus::Incoming,
        });
        self.emit(SessionEvent::StatusChanged(CallStatus::Incoming));
        CallStatus::Incoming
    }

    /// incoming → in-call. The call's start time is the moment it is answered.
    pub async fn receive_call(&mut self) -> Result<CallStatus, DialerError> {
        if let Some(current) = self.ignore_unless(CallStatus::Incoming, "receive_call") {
            return Ok(current);
        }

        if let Some(session) = self.session.as_mut() {
            session.started_at = Some(now_millis());
            info!("Answered call from {}", session.peer_number);
        }

        match self.begin_recording().await {
            RecordingOutcome::Aborted => {
                self.reset();
                Ok(CallStatus::Idle)
            }
            RecordingOutcome::Started | RecordingOutcome::Unavailable => {
                self.set_status(CallStatus::InCall);
                Ok(CallStatus::InCall)
            }
        }
    }

    /// incoming → idle, logging a missed call with no audio.
    pub fn decline_call(&mut self) -> Result<Option<CallRecord>, DialerError> {
        if self.ignore_unless(CallStatus::Incoming, "decline_call").is_some() {
            return Ok(None);
        }

        let number = self
            .session
            .as_ref()
            .map(|session| session.peer_number.clone())
            .unwrap_or_default();
        self.reset();

        let now = now_millis();
        let record = CallRecord::missed(self.ids.next_at(now), number, now);
        info!("Declined call from {}", record.number);

        self.persist(&record)?;
        Ok(Some(record))
    }

    /// in-call → idle. An active recording is finalized and saved first.
    pub async fn hangup(&mut self) -> Result<Option<CallRecord>, DialerError> {
        if self.ignore_unless(CallStatus::InCall, "hangup").is_some() {
            return Ok(None);
        }

        let meta = match self.session.as_ref() {
            Some(session) => CallMeta {
                number: session.peer_number.clone(),
                direction: session.direction,
                start: session.started_at.unwrap_or_else(now_millis),
            },
            None => {
                self.reset();
                return Ok(None);
            }
        };

        info!("Hanging up call with {}", meta.number);
        let token = self.abort.child_token();
        let finalized = self
            .recorder
            .stop_and_finalize(self.recording.take(), &meta, &self.ids, &token)
            .await;

        let record = match finalized {
            Ok(record) => record,
            Err(e) => {
                warn!("Recording for {} could not be finalized: {}", meta.number, e);
                None
            }
        };

        let saved = match &record {
            Some(record) => self.persist(record),
            None => Ok(()),
        };

        self.reset();
        saved.map(|_| record)
    }

    async fn begin_recording(&mut self) -> RecordingOutcome {
        if !self.options.recording_enabled {
            debug!("Recording disabled, call proceeds unrecorded");
            return RecordingOutcome::Unavailable;
        }

        let token = self.abort.child_token();
        match self.recorder.start(&token).await {
            Ok(handle) => {
                self.emit(SessionEvent::RecordingStarted {
                    mime: handle.mime().to_string(),
                });
                self.recording = Some(handle);
                RecordingOutcome::Started
            }
            Err(RecordingError::Cancelled) => {
                info!("Call setup aborted while waiting for the audio device");
                RecordingOutcome::Aborted
            }
            Err(e) => {
                warn!("Call continues without recording: {}", e);
                self.emit(SessionEvent::RecordingUnavailable(e.to_string()));
                RecordingOutcome::Unavailable
            }
        }
    }

    fn persist(&self, record: &CallRecord) -> Result<(), DialerError> {
        match self.history.append(record) {
            Ok(()) => {
                self.emit(SessionEvent::RecordSaved(record.clone()));
                Ok(())
            }
            Err(e) => {
                error!("Failed to save call record {}: {:#}", record.id, e);
                Err(DialerError::History(e))
            }
        }
    }

    /// Returns the current status when it differs from `expected`.
    fn ignore_unless(&self, expected: CallStatus, operation: &str) -> Option<CallStatus> {
        let current = self.status();
        if current == expected {
            None
        } else {
            warn!(
                "SessionController: {} ignored while {}",
                operation,
                current.as_str()
            );
            Some(current)
        }
    }

    fn set_status(&mut self, status: CallStatus) {
        if let Some(session) = self.session.as_mut() {
            session.status = status;
        }
        self.emit(SessionEvent::StatusChanged(status));
    }

    fn reset(&mut self) {
        // Dropping a leftover handle releases the device.
        self.recording = None;
        if self.session.take().is_some() {
            self.emit(SessionEvent::StatusChanged(CallStatus::Idle));
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
