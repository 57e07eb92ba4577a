//! Synthetic sine-wave input for machines without a usable microphone.

use async_trait::async_trait;
use std::f32::consts::TAU;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::audio_source::{AudioInput, CaptureStream, RecordingError};
use super::pcm::{f32_to_l16_bytes, l16_mime};

const CHUNK_INTERVAL: Duration = Duration::from_millis(100);
const AMPLITUDE: f32 = 0.25;

#[derive(Debug, Clone)]
pub struct ToneInput {
    sample_rate: u32,
    frequency_hz: f32,
}

impl ToneInput {
    pub fn new(sample_rate: u32, frequency_hz: f32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            frequency_hz,
        }
    }

    fn samples_per_chunk(&self) -> usize {
        (self.sample_rate as u64 * CHUNK_INTERVAL.as_millis() as u64 / 1000).max(1) as usize
    }
}

#[async_trait]
impl AudioInput for ToneInput {
    async fn open(&self) -> Result<CaptureStream, RecordingError> {
        let (chunk_tx, chunk_rx) = mpsc::unbounded_channel();
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let step = TAU * self.frequency_hz / self.sample_rate as f32;
        let per_chunk = self.samples_per_chunk();

        tokio::spawn(async move {
            let mut phase = 0.0f32;
            let mut ticker = tokio::time::interval(CHUNK_INTERVAL);
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        let samples: Vec<f32> = (0..per_chunk)
                            .map(|_| {
                                let sample = phase.sin() * AMPLITUDE;
                                phase = (phase + step) % TAU;
                                sample
                            })
                            .collect();
                        if chunk_tx.send(f32_to_l16_bytes(&samples)).is_err() {
                            break;
                        }
                    }
                }
            }
            debug!("Tone input stopped");
        });

        Ok(CaptureStream::new(l16_mime(self.sample_rate), chunk_rx, stop_tx))
    }

    fn name(&self) -> &str {
        "tone"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tone_emits_chunks_until_stopped() {
        let input = ToneInput::new(8000, 440.0);
        let (mime, mut chunks, stop) = input.open().await.unwrap().into_parts();
        assert_eq!(mime, "audio/L16;rate=8000;channels=1");

        let first = chunks.recv().await.unwrap();
        assert_eq!(first.len(), 800 * 2);

        stop.send(()).unwrap();
        while chunks.recv().await.is_some() {}
    }
}
