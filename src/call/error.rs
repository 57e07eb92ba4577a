use thiserror::Error;

#[derive(Debug, Error)]
pub enum DialerError {
    #[error("invalid number {0:?}: enter a number with country code (e.g. +919876543210)")]
    InvalidNumber(String),
    #[error("failed to save call history: {0:#}")]
    History(anyhow::Error),
}
