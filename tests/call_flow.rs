//! End-to-end call flows through the session controller, the recorder and
//! the SQLite history.

use async_trait::async_trait;
use softdial::audio::{AudioInput, CaptureStream, RecordingError, RecordingManager, ToneInput};
use softdial::call::{
    CallDirection, CallStatus, ControllerOptions, DialerError, SessionController, SessionEvent,
};
use softdial::history::{HistoryStore, MemoryHistory, SqliteHistory};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Sends a scripted sequence of chunks, the last one only after stop.
struct ScriptedInput {
    before_stop: Vec<Vec<u8>>,
    after_stop: Vec<u8>,
}

#[async_trait]
impl AudioInput for ScriptedInput {
    async fn open(&self) -> Result<CaptureStream, RecordingError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        for chunk in &self.before_stop {
            tx.send(chunk.clone()).unwrap();
        }
        let tail = self.after_stop.clone();
        tokio::spawn(async move {
            let _ = stop_rx.await;
            tokio::time::sleep(Duration::from_millis(20)).await;
            let _ = tx.send(tail);
        });
        Ok(CaptureStream::new("audio/webm", rx, stop_tx))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn scripted() -> Arc<dyn AudioInput> {
    Arc::new(ScriptedInput {
        before_stop: vec![b"first-".to_vec(), b"second-".to_vec()],
        after_stop: b"final".to_vec(),
    })
}

fn statuses(events: &mut tokio::sync::broadcast::Receiver<SessionEvent>) -> Vec<CallStatus> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::StatusChanged(status) = event {
            seen.push(status);
        }
    }
    seen
}

#[tokio::test]
async fn test_outgoing_call_is_recorded_and_saved() {
    let history = Arc::new(MemoryHistory::new());
    let mut controller = SessionController::new(
        RecordingManager::new(scripted()),
        history.clone(),
        ControllerOptions::default(),
    )
    .unwrap();
    let mut events = controller.subscribe();

    let status = controller.place_call("+919876543210").await.unwrap();
    assert_eq!(status, CallStatus::InCall);
    assert!(controller.is_recording());

    let record = controller.hangup().await.unwrap().unwrap();
    assert_eq!(controller.status(), CallStatus::Idle);
    assert_eq!(
        statuses(&mut events),
        vec![CallStatus::Calling, CallStatus::InCall, CallStatus::Idle]
    );

    assert_eq!(record.number, "+919876543210");
    assert_eq!(record.direction, CallDirection::Outgoing);
    assert!(record.start <= record.end);
    let audio = record.audio.as_ref().unwrap();
    assert_eq!(audio.bytes, b"first-second-final".to_vec());
    assert_eq!(audio.mime, "audio/webm");

    let stored = history.list().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0], record);
}

#[tokio::test]
async fn test_declined_call_is_missed_without_audio() {
    let history = Arc::new(MemoryHistory::new());
    let mut controller = SessionController::new(
        RecordingManager::new(scripted()),
        history.clone(),
        ControllerOptions::default(),
    )
    .unwrap();

    assert_eq!(controller.simulate_incoming(), CallStatus::Incoming);
    let record = controller.decline_call().unwrap().unwrap();

    assert_eq!(controller.status(), CallStatus::Idle);
    assert_eq!(record.number, "+911234567890");
    assert_eq!(record.direction, CallDirection::Missed);
    assert_eq!(record.duration_ms, 0);
    assert_eq!(record.start, record.end);
    assert!(record.audio.is_none());
    assert_eq!(history.list().unwrap(), vec![record]);
}

#[tokio::test]
async fn test_invalid_number_leaves_dialer_idle() {
    let history = Arc::new(MemoryHistory::new());
    let mut controller = SessionController::new(
        RecordingManager::new(scripted()),
        history.clone(),
        ControllerOptions::default(),
    )
    .unwrap();

    let err = controller.place_call("12345").await.unwrap_err();
    assert!(matches!(err, DialerError::InvalidNumber(_)));
    assert_eq!(controller.status(), CallStatus::Idle);
    assert!(history.list().unwrap().is_empty());
}

#[tokio::test]
async fn test_sqlite_history_keeps_calls_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("softdial.db");

    let first_id = {
        let history: Arc<dyn HistoryStore> = Arc::new(SqliteHistory::open(&path, 0).unwrap());
        let mut controller = SessionController::new(
            RecordingManager::new(Arc::new(ToneInput::new(8000, 440.0))),
            history,
            ControllerOptions::default(),
        )
        .unwrap();

        controller.place_call("+14155550123").await.unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        let record = controller.hangup().await.unwrap().unwrap();

        let audio = record.audio.as_ref().unwrap();
        assert!(!audio.bytes.is_empty());
        assert_eq!(audio.mime, "audio/L16;rate=8000;channels=1");
        record.id
    };

    let history: Arc<dyn HistoryStore> = Arc::new(SqliteHistory::open(&path, 0).unwrap());
    let stored = history.list().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, first_id);
    assert_eq!(stored[0].number, "+14155550123");
    assert!(stored[0].has_audio());

    // Ids keep increasing after a restart.
    let mut controller = SessionController::new(
        RecordingManager::new(scripted()),
        history.clone(),
        ControllerOptions::default(),
    )
    .unwrap();
    controller.simulate_incoming();
    let missed = controller.decline_call().unwrap().unwrap();
    assert!(missed.id > first_id);

    let stored = history.list().unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].id, missed.id);
}
