//! Microphone capture via cpal.
//!
//! `cpal::Stream` is not `Send`, so each capture owns a dedicated thread that
//! builds the stream, reports readiness, and parks until asked to stop.
//! Dropping the stream drops the data callback and with it the last chunk
//! sender, which is how the recorder learns capture has ended.

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use super::audio_source::{AudioInput, CaptureStream, RecordingError};
use super::pcm::{f32_to_l16_bytes, l16_mime};

type ChunkSender = mpsc::UnboundedSender<Vec<u8>>;

#[derive(Debug, Default)]
pub struct MicInput;

impl MicInput {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AudioInput for MicInput {
    async fn open(&self) -> Result<CaptureStream, RecordingError> {
        let (chunk_tx, chunk_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel();
        let (ready_tx, ready_rx) = oneshot::channel();

        std::thread::Builder::new()
            .name("softdial-mic".to_string())
            .spawn(move || run_capture(chunk_tx, stop_rx, ready_tx))
            .map_err(|e| RecordingError::DeviceUnavailable(e.to_string()))?;

        match ready_rx.await {
            Ok(Ok(sample_rate)) => Ok(CaptureStream::new(
                l16_mime(sample_rate),
                chunk_rx,
                stop_tx,
            )),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(RecordingError::DeviceUnavailable(
                "capture thread exited before the device opened".to_string(),
            )),
        }
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

fn run_capture(
    chunk_tx: ChunkSender,
    stop_rx: oneshot::Receiver<()>,
    ready_tx: oneshot::Sender<Result<u32, RecordingError>>,
) {
    let (stream, sample_rate) = match open_stream(chunk_tx) {
        Ok(opened) => opened,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if ready_tx.send(Ok(sample_rate)).is_err() {
        debug!("Nobody waiting for the mic any more, releasing it");
        return;
    }

    // Returns on an explicit stop or when the handle is dropped.
    let _ = stop_rx.blocking_recv();

    debug!("Stopping mic stream");
    drop(stream);
    info!("Mic capture stopped, device released");
}

fn open_stream(chunk_tx: ChunkSender) -> Result<(cpal::Stream, u32), RecordingError> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or_else(|| {
        RecordingError::DeviceUnavailable("no input device available".to_string())
    })?;

    let supported = device
        .default_input_config()
        .map_err(|e| RecordingError::DeviceUnavailable(e.to_string()))?;

    info!(
        "Call recording using device: {} ({} Hz, {} ch, {:?})",
        device.name().unwrap_or_else(|_| "unknown".to_string()),
        supported.sample_rate().0,
        supported.channels(),
        supported.sample_format()
    );

    let sample_rate = supported.sample_rate().0;
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();

    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, chunk_tx),
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, chunk_tx),
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, chunk_tx),
        other => {
            return Err(RecordingError::DeviceUnavailable(format!(
                "unsupported sample format {other:?}"
            )))
        }
    }?;

    stream
        .play()
        .map_err(|e| RecordingError::DeviceUnavailable(e.to_string()))?;

    Ok((stream, sample_rate))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    chunk_tx: ChunkSender,
) -> Result<cpal::Stream, RecordingError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = usize::from(config.channels.max(1));
    let err_fn = |err| error!("Mic stream error: {}", err);

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let mono: Vec<f32> = data
                    .chunks(channels)
                    .map(|frame| {
                        let sum: f32 = frame.iter().map(|s| s.to_sample::<f32>()).sum();
                        sum / frame.len() as f32
                    })
                    .collect();
                if !mono.is_empty() {
                    let _ = chunk_tx.send(f32_to_l16_bytes(&mono));
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| RecordingError::DeviceUnavailable(e.to_string()))
}
