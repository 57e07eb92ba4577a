use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dialer: DialerConfig,
    pub login: LoginConfig,
    pub recording: RecordingConfig,
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DialerConfig {
    /// Peer number shown when an incoming call is simulated.
    pub incoming_demo_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginConfig {
    /// The OTP every login attempt is checked against.
    pub demo_otp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Mic,
    Tone,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    pub enabled: bool,
    pub input: InputKind,
    pub sample_rate: u32,
    pub tone_frequency_hz: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Oldest calls beyond this count are pruned after each append. 0 keeps everything.
    pub max_entries: i64,
    /// Player invoked with the exported file path as its only argument.
    pub player_command: Option<String>,
}

impl Default for DialerConfig {
    fn default() -> Self {
        Self {
            incoming_demo_number: "+911234567890".to_string(),
        }
    }
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            demo_otp: "1234".to_string(),
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            input: InputKind::Mic,
            sample_rate: 16000,
            tone_frequency_hz: 440.0,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: 500,
            player_command: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_demo_values() {
        let config = Config::default();
        assert_eq!(config.dialer.incoming_demo_number, "+911234567890");
        assert_eq!(config.login.demo_otp, "1234");
        assert!(config.recording.enabled);
        assert_eq!(config.recording.input, InputKind::Mic);
        assert_eq!(config.recording.sample_rate, 16000);
        assert_eq!(config.history.max_entries, 500);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.login.demo_otp, "1234");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[recording]\ninput = \"tone\"\nsample_rate = 8000\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.recording.input, InputKind::Tone);
        assert_eq!(config.recording.sample_rate, 8000);
        assert!(config.recording.enabled);
        assert_eq!(config.dialer.incoming_demo_number, "+911234567890");
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.history.player_command = Some("mpv".to_string());
        config.login.demo_otp = "9876".to_string();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.history.player_command.as_deref(), Some("mpv"));
        assert_eq!(loaded.login.demo_otp, "9876");
    }
}
