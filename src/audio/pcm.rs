//! Raw 16-bit PCM helpers shared by the capture sources and the WAV exporter.

use anyhow::{Context, Result};
use hound::{WavSpec, WavWriter};
use std::path::Path;
use tracing::info;

const L16_PREFIX: &str = "audio/L16";

/// MIME type for mono little-endian 16-bit PCM at `sample_rate`.
pub fn l16_mime(sample_rate: u32) -> String {
    format!("{L16_PREFIX};rate={sample_rate};channels=1")
}

/// Returns `(sample_rate, channels)` when `mime` describes raw L16 audio.
pub fn parse_l16_mime(mime: &str) -> Option<(u32, u16)> {
    let mut parts = mime.split(';').map(str::trim);
    if !parts.next()?.eq_ignore_ascii_case(L16_PREFIX) {
        return None;
    }

    let mut rate = None;
    let mut channels = 1;
    for param in parts {
        match param.split_once('=') {
            Some(("rate", value)) => rate = value.trim().parse().ok(),
            Some(("channels", value)) => channels = value.trim().parse().ok()?,
            _ => {}
        }
    }

    Some((rate?, channels))
}

pub fn f32_to_l16_bytes(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let scaled = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        bytes.extend_from_slice(&scaled.to_le_bytes());
    }
    bytes
}

/// Wrap raw L16 bytes in a WAV container. A trailing odd byte is dropped.
pub fn write_wav(path: &Path, bytes: &[u8], sample_rate: u32, channels: u16) -> Result<()> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file {:?}", path))?;
    for pair in bytes.chunks_exact(2) {
        writer.write_sample(i16::from_le_bytes([pair[0], pair[1]]))?;
    }
    writer.finalize().context("Failed to finalize WAV file")?;

    info!("Call audio saved: {:?} ({} bytes PCM)", path, bytes.len());
    Ok(())
}
