pub mod audio_source;
pub mod mic_source;
pub mod pcm;
pub mod recorder;
pub mod tone_source;

pub use audio_source::{AudioInput, CaptureStream, RecordingError};
pub use mic_source::MicInput;
pub use recorder::{RecordingHandle, RecordingManager};
pub use tone_source::ToneInput;

use crate::config::{InputKind, RecordingConfig};
use std::sync::Arc;

/// Build the configured capture input.
pub fn input_from_config(config: &RecordingConfig) -> Arc<dyn AudioInput> {
    match config.input {
        InputKind::Mic => Arc::new(MicInput::new()),
        InputKind::Tone => Arc::new(ToneInput::new(
            config.sample_rate,
            config.tone_frequency_hz,
        )),
    }
}
