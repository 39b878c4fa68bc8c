//! Request, outcome and state types for the pipeline.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::DEFAULT_FRAME_RATE;
use crate::extract::{DecompilerReport, FallbackAudio};

/// Step a request is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    RateDetecting,
    Extracting,
    AudioFallback,
    Reconciling,
    Assembling,
    CleaningUp,
    Done,
    Errored,
}

impl PipelineState {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Errored)
    }

    /// Whether a request may move from `self` to `next`.
    ///
    /// Any non-terminal state may fail into `Errored`, and any working state
    /// may drop into `CleaningUp` when a failure needs its work directory
    /// removed.
    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        use PipelineState::*;

        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (_, Errored) => true,
            (RateDetecting, Extracting) => true,
            (Extracting, AudioFallback) => true,
            (AudioFallback, Reconciling) => true,
            (Reconciling, Assembling) => true,
            // Extraction-only requests stop after reconciling.
            (Reconciling, Done) => true,
            // Retained work directories skip cleanup.
            (Assembling, Done) => true,
            (CleaningUp, Done) => true,
            (CleaningUp, _) => false,
            (_, CleaningUp) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RateDetecting => "rate_detecting",
            Self::Extracting => "extracting",
            Self::AudioFallback => "audio_fallback",
            Self::Reconciling => "reconciling",
            Self::Assembling => "assembling",
            Self::CleaningUp => "cleaning_up",
            Self::Done => "done",
            Self::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// Non-fatal problems reported alongside a result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineWarning {
    /// The decompiler did not finish cleanly but left frames behind.
    PartialExtraction { frames: usize, reason: String },
    /// Passthrough audio extraction failed for a reason other than a
    /// missing audio stream.
    FallbackAudioFailure { reason: String },
    /// Passthrough audio extraction could not run because the encoder is
    /// unavailable.
    AudioFallbackSkipped { reason: String },
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PartialExtraction { frames, reason } => {
                write!(f, "partial extraction ({} frames): {}", frames, reason)
            }
            Self::FallbackAudioFailure { reason } => {
                write!(f, "fallback audio extraction failed: {}", reason)
            }
            Self::AudioFallbackSkipped { reason } => {
                write!(f, "fallback audio extraction skipped: {}", reason)
            }
        }
    }
}

/// Result of an extraction request that produced content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionOutcome {
    /// Whether the decompiler finished cleanly.
    pub decompiler_succeeded: bool,
    /// Frame files in sequence order.
    pub frames: Vec<PathBuf>,
    /// Audio files found after reconciliation.
    pub audio: Vec<PathBuf>,
    pub decompiler: DecompilerReport,
    /// `None` when the fallback could not run.
    pub fallback_audio: Option<FallbackAudio>,
    pub warnings: Vec<PipelineWarning>,
}

impl ExtractionOutcome {
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn has_audio(&self) -> bool {
        !self.audio.is_empty()
    }
}

/// Input to a full conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionRequest {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Requested frame rate. The default triggers detection.
    pub frame_rate: u32,
    /// Keep the work directory after the request ends.
    pub keep_intermediate: bool,
}

impl ConversionRequest {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            frame_rate: DEFAULT_FRAME_RATE,
            keep_intermediate: false,
        }
    }

    pub fn with_frame_rate(mut self, fps: u32) -> Self {
        self.frame_rate = fps;
        self
    }

    pub fn keep_intermediate(mut self, keep: bool) -> Self {
        self.keep_intermediate = keep;
        self
    }

    /// Source base name without extension.
    pub fn stem(&self) -> String {
        self.source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "source".to_string())
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

/// Result of a successful conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionOutcome {
    pub output_path: PathBuf,
    pub output_size_bytes: u64,
    pub frame_rate: u32,
    /// Whether `frame_rate` came from the source's own diagnostics.
    pub frame_rate_detected: bool,
    pub frame_count: usize,
    /// Whether an audio track was muxed in.
    pub has_audio: bool,
    pub duration_secs: f64,
    pub decompiler_succeeded: bool,
    pub warnings: Vec<PipelineWarning>,
    /// Set when the work directory was retained.
    pub work_dir: Option<PathBuf>,
    pub elapsed_ms: u64,
}
