//! Simulated phone + OTP login. Nothing is sent anywhere: every challenge is
//! answered by the configured demo code.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::call::NumberValidator;
use crate::global;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoginError {
    #[error("enter a valid phone number with country code (e.g. +919876543210)")]
    InvalidPhone,
    #[error("invalid OTP (demo OTP is {0})")]
    InvalidOtp(String),
}

/// Issued once a phone number passes validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpChallenge {
    pub phone: String,
}

pub struct LoginGate {
    validator: NumberValidator,
    demo_otp: String,
}

impl LoginGate {
    pub fn new(demo_otp: impl Into<String>) -> Result<Self> {
        Ok(Self {
            validator: NumberValidator::new()?,
            demo_otp: demo_otp.into(),
        })
    }

    pub fn demo_otp(&self) -> &str {
        &self.demo_otp
    }

    /// "Send" an OTP. Only validates the number.
    pub fn request_otp(&self, phone: &str) -> Result<OtpChallenge, LoginError> {
        let phone = phone.trim();
        if !self.validator.is_valid(phone) {
            return Err(LoginError::InvalidPhone);
        }
        info!("OTP sent to {} (demo code is {})", phone, self.demo_otp);
        Ok(OtpChallenge {
            phone: phone.to_string(),
        })
    }

    /// Returns the logged-in phone on a match.
    pub fn verify(&self, challenge: &OtpChallenge, otp: &str) -> Result<String, LoginError> {
        if otp.trim() == self.demo_otp {
            Ok(challenge.phone.clone())
        } else {
            Err(LoginError::InvalidOtp(self.demo_otp.clone()))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    pub phone: String,
    /// RFC 3339 login time
    pub logged_in_at: String,
}

/// The remembered login, kept as a small JSON file.
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn default_location() -> Result<Self> {
        Ok(Self::at(global::session_file()?))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<UserSession>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content =
            std::fs::read_to_string(&self.path).context("Failed to read session file")?;
        let session = serde_json::from_str(&content).context("Failed to parse session file")?;
        Ok(Some(session))
    }

    pub fn save(&self, phone: &str) -> Result<UserSession> {
        let session = UserSession {
            phone: phone.to_string(),
            logged_in_at: chrono::Local::now().to_rfc3339(),
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create session directory")?;
        }
        let content = serde_json::to_string_pretty(&session)?;
        std::fs::write(&self.path, content).context("Failed to write session file")?;

        info!("Logged in as {}", phone);
        Ok(session)
    }

    /// Returns whether a session existed.
    pub fn clear(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&self.path).context("Failed to remove session file")?;
        info!("Logged out");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_with_demo_otp() {
        let gate = LoginGate::new("1234").unwrap();
        let challenge = gate.request_otp("+919876543210").unwrap();
        assert_eq!(gate.verify(&challenge, "1234").unwrap(), "+919876543210");
    }

    #[test]
    fn test_wrong_otp_is_rejected() {
        let gate = LoginGate::new("1234").unwrap();
        let challenge = gate.request_otp("+919876543210").unwrap();
        assert_eq!(
            gate.verify(&challenge, "4321"),
            Err(LoginError::InvalidOtp("1234".to_string()))
        );
        assert!(gate.verify(&challenge, "").is_err());
    }

    #[test]
    fn test_bad_phone_gets_no_challenge() {
        let gate = LoginGate::new("1234").unwrap();
        assert_eq!(gate.request_otp("12"), Err(LoginError::InvalidPhone));
        assert_eq!(gate.request_otp("+91-98765"), Err(LoginError::InvalidPhone));
    }

    #[test]
    fn test_session_file_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let file = SessionFile::at(dir.path().join("session.json"));

        assert!(file.load().unwrap().is_none());
        assert!(!file.clear().unwrap());

        file.save("+919876543210").unwrap();
        assert_eq!(file.load().unwrap().unwrap().phone, "+919876543210");

        assert!(file.clear().unwrap());
        assert!(file.load().unwrap().is_none());
    }
}
