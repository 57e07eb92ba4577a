//! Capture capability the recorder depends on.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("audio input unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("recording aborted")]
    Cancelled,
    #[error("capture failed: {0}")]
    CaptureFailed(String),
}

/// A live capture: chunks arrive on `chunks` in capture order until the device
/// has stopped, at which point the channel closes.
pub struct CaptureStream {
    pub mime: String,
    pub chunks: mpsc::UnboundedReceiver<Vec<u8>>,
    stop: oneshot::Sender<()>,
}

impl CaptureStream {
    pub fn new(
        mime: impl Into<String>,
        chunks: mpsc::UnboundedReceiver<Vec<u8>>,
        stop: oneshot::Sender<()>,
    ) -> Self {
        Self {
            mime: mime.into(),
            chunks,
            stop,
        }
    }

    /// Split into the chunk receiver and the stop signal.
    pub fn into_parts(self) -> (String, mpsc::UnboundedReceiver<Vec<u8>>, oneshot::Sender<()>) {
        (self.mime, self.chunks, self.stop)
    }
}

/// Something that can hand out exclusive audio capture.
///
/// Implementations must close the chunk channel only after capture has fully
/// stopped and the device is released, so nothing is produced after that point.
#[async_trait]
pub trait AudioInput: Send + Sync {
    /// Acquire the device and begin capturing.
    async fn open(&self) -> Result<CaptureStream, RecordingError>;

    /// Short human name for logs.
    fn name(&self) -> &str;
}
