//! Turning stored calls into files a user can play, keep, or move elsewhere.

use anyhow::{anyhow, bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};
use which::which;

use crate::audio::pcm::{parse_l16_mime, write_wav};
use crate::call::{CallRecord, StoredCallRecord};

const PLAYERS: &[&str] = &["pw-play", "paplay", "aplay", "ffplay"];

fn extension_for(mime: &str) -> &'static str {
    if parse_l16_mime(mime).is_some() {
        return "wav";
    }
    let base = mime.split(';').next().unwrap_or_default().trim();
    match base.to_ascii_lowercase().as_str() {
        "audio/webm" => "webm",
        "audio/ogg" => "ogg",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/mpeg" => "mp3",
        "audio/mp4" => "m4a",
        _ => "bin",
    }
}

/// `call-<number>-<id>.<ext>`, with anything but digits and `+` dropped from the number.
pub fn audio_file_name(record: &CallRecord) -> Option<String> {
    let audio = record.audio.as_ref()?;
    let number: String = record
        .number
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();
    Some(format!(
        "call-{}-{}.{}",
        number,
        record.id,
        extension_for(&audio.mime)
    ))
}

/// Write the call's audio into `dir` in a playable form and return its path.
/// Raw L16 captures are wrapped in WAV; anything else is written as stored.
pub fn export_audio(record: &CallRecord, dir: &Path) -> Result<PathBuf> {
    let (audio, file_name) = match (record.audio.as_ref(), audio_file_name(record)) {
        (Some(audio), Some(name)) => (audio, name),
        _ => bail!("No recording available for call {}", record.id),
    };

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory {:?}", dir))?;
    let path = dir.join(file_name);

    match parse_l16_mime(&audio.mime) {
        Some((sample_rate, channels)) => write_wav(&path, &audio.bytes, sample_rate, channels)?,
        None => std::fs::write(&path, &audio.bytes)
            .with_context(|| format!("Failed to write {:?}", path))?,
    }

    info!("Exported call {} to {:?}", record.id, path);
    Ok(path)
}

/// Dump records in their flat persisted form.
pub fn export_json(records: &[CallRecord], path: &Path) -> Result<()> {
    let stored: Vec<StoredCallRecord> = records.iter().map(StoredCallRecord::from).collect();
    let json = serde_json::to_string_pretty(&stored).context("Failed to serialize history")?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).context("Failed to create export directory")?;
    }
    std::fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;

    info!("Exported {} call(s) to {:?}", records.len(), path);
    Ok(())
}

fn find_player(preferred: Option<&str>) -> Result<String> {
    if let Some(command) = preferred {
        return Ok(command.to_string());
    }

    PLAYERS
        .iter()
        .find(|player| which(player).is_ok())
        .map(|player| player.to_string())
        .ok_or_else(|| {
            anyhow!(
                "No audio player found (tried {}). Set history.player_command in the config",
                PLAYERS.join(", ")
            )
        })
}

/// Export to a scratch directory and play it with the first available player.
pub fn play_record(record: &CallRecord, player: Option<&str>) -> Result<()> {
    let player = find_player(player)?;
    let scratch = tempfile::tempdir().context("Failed to create temp directory")?;
    let path = export_audio(record, scratch.path())?;

    debug!("Playing {:?} with {}", path, player);
    let status = Command::new(&player)
        .arg(&path)
        .status()
        .with_context(|| format!("Failed to launch {}", player))?;

    if !status.success() {
        bail!("{} exited with {}", player, status);
    }
    Ok(())
}
