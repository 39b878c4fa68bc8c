//! Extraction of frames and audio from a source animation.
//!
//! The decompiler does the heavy lifting; [`DecompilerSupervisor`] launches it
//! with a size-derived deadline and classifies what it prints. Because the
//! decompiler's audio export is unreliable, [`AudioFallbackExtractor`] always
//! follows it and copies the source's audio stream with the encoder.

mod audio;
mod classify;
mod decompiler;
mod timeout;
mod types;

pub use audio::AudioFallbackExtractor;
pub use classify::{parse_progress, LineClass, LineClassifier};
pub use decompiler::DecompilerSupervisor;
pub use timeout::{
    compute_timeout_minutes, TimeoutPolicy, BASE_TIMEOUT_MINUTES, MAX_TIMEOUT_MINUTES,
};
pub use types::{DecompilerReport, DecompilerStatus, ExtractionRequest, FallbackAudio};
