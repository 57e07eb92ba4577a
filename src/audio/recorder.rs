//! Recording lifecycle: acquire the input, buffer chunks in arrival order,
//! and turn them into a finished `CallRecord` once the device confirms stop.

use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::audio_source::{AudioInput, RecordingError};
use crate::call::{now_millis, AudioPayload, CallMeta, CallRecord, RecordIdGenerator};

pub struct RecordingManager {
    input: Arc<dyn AudioInput>,
}

/// The one live capture. Dropping it stops the device.
pub struct RecordingHandle {
    mime: String,
    stop: Option<oneshot::Sender<()>>,
    collector: JoinHandle<Vec<Vec<u8>>>,
}

impl RecordingManager {
    pub fn new(input: Arc<dyn AudioInput>) -> Self {
        Self { input }
    }

    pub fn input_name(&self) -> &str {
        self.input.name()
    }

    /// Acquire the input and start buffering. Nothing stays open on failure.
    pub async fn start(
        &self,
        abort: &CancellationToken,
    ) -> Result<RecordingHandle, RecordingError> {
        let stream = tokio::select! {
            biased;
            _ = abort.cancelled() => {
                debug!("Recording start aborted before {} opened", self.input.name());
                return Err(RecordingError::Cancelled);
            }
            opened = self.input.open() => opened?,
        };

        let (mime, mut chunks, stop) = stream.into_parts();
        let collector = tokio::spawn(async move {
            let mut buffered = Vec::new();
            while let Some(chunk) = chunks.recv().await {
                if !chunk.is_empty() {
                    buffered.push(chunk);
                }
            }
            buffered
        });

        info!("Recording started on {} ({})", self.input.name(), mime);
        Ok(RecordingHandle {
            mime,
            stop: Some(stop),
            collector,
        })
    }

    /// Stop `active` and build its record. `None` means there is nothing to
    /// finalize, e.g. the device was refused, and yields `Ok(None)`.
    pub async fn stop_and_finalize(
        &self,
        active: Option<RecordingHandle>,
        meta: &CallMeta,
        ids: &RecordIdGenerator,
        abort: &CancellationToken,
    ) -> Result<Option<CallRecord>, RecordingError> {
        match active {
            Some(handle) => handle.finish(meta, ids, abort).await.map(Some),
            None => {
                debug!("No active recording to finalize for {}", meta.number);
                Ok(None)
            }
        }
    }
}

impl RecordingHandle {
    pub fn mime(&self) -> &str {
        &self.mime
    }

    async fn finish(
        mut self,
        meta: &CallMeta,
        ids: &RecordIdGenerator,
        abort: &CancellationToken,
    ) -> Result<CallRecord, RecordingError> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }

        // The collector only returns once the device has closed its channel.
        let chunks = tokio::select! {
            biased;
            _ = abort.cancelled() => {
                self.collector.abort();
                return Err(RecordingError::Cancelled);
            }
            joined = &mut self.collector => {
                joined.map_err(|e| RecordingError::CaptureFailed(e.to_string()))?
            }
        };

        let chunk_count = chunks.len();
        let bytes = chunks.concat();
        if bytes.is_empty() {
            warn!("Recording for {} captured no audio", meta.number);
        }

        let end = now_millis().max(meta.start);
        let record = CallRecord {
            id: ids.next(),
            number: meta.number.clone(),
            direction: meta.direction,
            start: meta.start,
            end,
            duration_ms: end - meta.start,
            audio: Some(AudioPayload::new(bytes, self.mime.clone())),
        };

        info!(
            "Recording finalized for {}: {} chunks, {} ms",
            record.number, chunk_count, record.duration_ms
        );
        Ok(record)
    }
}

impl Drop for RecordingHandle {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            debug!("Dropping active recording, releasing device");
            let _ = stop.send(());
        }
    }
}
