//! Copy and paste of the dialed number.
//!
//! Uses the native clipboard when it can be opened and falls back to the
//! usual command line tools otherwise.

use arboard::Clipboard;
use std::io::Write;
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::{debug, info, warn};
use which::which;

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard not available: {0}")]
    Unavailable(String),
}

pub struct NumberClipboard {
    native: Option<Clipboard>,
}

impl NumberClipboard {
    pub fn new() -> Self {
        let native = match Clipboard::new() {
            Ok(cb) => Some(cb),
            Err(err) => {
                warn!(
                    "System clipboard backend unavailable ({}); falling back to CLI tools",
                    err
                );
                None
            }
        };
        Self { native }
    }

    pub fn copy(&mut self, text: &str) -> Result<(), ClipboardError> {
        info!("Copying {} chars to clipboard", text.len());

        if let Some(clipboard) = self.native.as_mut() {
            match clipboard.set_text(text) {
                Ok(_) => return Ok(()),
                Err(err) => {
                    warn!(
                        "Primary clipboard backend failed ({}), disabling until restart",
                        err
                    );
                    self.native = None;
                }
            }
        }

        copy_with_system_backends(text)
    }

    /// Clipboard text with surrounding whitespace removed.
    pub fn paste(&mut self) -> Result<String, ClipboardError> {
        if let Some(clipboard) = self.native.as_mut() {
            match clipboard.get_text() {
                Ok(text) => return Ok(text.trim().to_string()),
                Err(err) => {
                    warn!("Primary clipboard read failed ({}), trying CLI tools", err);
                }
            }
        }

        paste_with_system_backends().map(|text| text.trim().to_string())
    }
}

impl Default for NumberClipboard {
    fn default() -> Self {
        Self::new()
    }
}

fn copy_with_system_backends(text: &str) -> Result<(), ClipboardError> {
    for backend in CLIPBOARD_BACKENDS {
        if which(backend.copy_cmd).is_err() {
            continue;
        }

        let mut cmd = Command::new(backend.copy_cmd);
        cmd.args(backend.copy_args).stdin(Stdio::piped());

        if let Ok(mut child) = cmd.spawn() {
            if let Some(stdin) = child.stdin.as_mut() {
                if stdin.write_all(text.as_bytes()).is_err() {
                    continue;
                }
            }
            // Close stdin so the tool sees EOF.
            drop(child.stdin.take());

            if let Ok(status) = child.wait() {
                if status.success() {
                    debug!("Text copied to clipboard with {}", backend.name);
                    return Ok(());
                }
            }
        }
    }

    Err(ClipboardError::Unavailable(
        "no clipboard tool (wl-copy/xclip/xsel) available".to_string(),
    ))
}

fn paste_with_system_backends() -> Result<String, ClipboardError> {
    for backend in CLIPBOARD_BACKENDS {
        if which(backend.paste_cmd).is_err() {
            continue;
        }

        if let Ok(output) = Command::new(backend.paste_cmd)
            .args(backend.paste_args)
            .output()
        {
            if output.status.success() {
                debug!("Text pasted from clipboard with {}", backend.name);
                return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
            }
        }
    }

    Err(ClipboardError::Unavailable(
        "no clipboard tool (wl-paste/xclip/xsel) available".to_string(),
    ))
}

struct ClipboardBackend {
    name: &'static str,
    copy_cmd: &'static str,
    copy_args: &'static [&'static str],
    paste_cmd: &'static str,
    paste_args: &'static [&'static str],
}

const CLIPBOARD_BACKENDS: &[ClipboardBackend] = &[
    ClipboardBackend {
        name: "wl-clipboard",
        copy_cmd: "wl-copy",
        copy_args: &[],
        paste_cmd: "wl-paste",
        paste_args: &["--no-newline"],
    },
    ClipboardBackend {
        name: "xclip",
        copy_cmd: "xclip",
        copy_args: &["-selection", "clipboard"],
        paste_cmd: "xclip",
        paste_args: &["-selection", "clipboard", "-o"],
    },
    ClipboardBackend {
        name: "xsel",
        copy_cmd: "xsel",
        copy_args: &["--clipboard", "--input"],
        paste_cmd: "xsel",
        paste_args: &["--clipboard", "--output"],
    },
];
