//! Types for the extract module.

use serde::Serialize;
use std::path::{Path, PathBuf};

use super::timeout::TimeoutPolicy;
use crate::engine::TerminationStage;
use crate::manifest::{FRAMES_DIR, SOUNDS_DIR};

/// Input to one extraction run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionRequest {
    /// Source animation file.
    pub source: PathBuf,
    /// Directory the decompiler exports into.
    pub output_dir: PathBuf,
    /// Export only frames `1..=cap`.
    pub frame_cap: Option<u32>,
}

impl ExtractionRequest {
    pub fn new(source: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output_dir: output_dir.into(),
            frame_cap: None,
        }
    }

    pub fn with_frame_cap(mut self, cap: Option<u32>) -> Self {
        self.frame_cap = cap;
        self
    }

    pub fn frames_dir(&self) -> PathBuf {
        self.output_dir.join(FRAMES_DIR)
    }

    pub fn sounds_dir(&self) -> PathBuf {
        self.output_dir.join(SOUNDS_DIR)
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

/// How the decompiler run ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DecompilerStatus {
    /// Exit status zero and no fatal stderr. Routine warnings may exist.
    Clean,
    /// Stderr matched a fatal pattern.
    Fatal { lines: Vec<String> },
    /// Non-zero exit without a recognized fatal message.
    Failed { exit_code: Option<i32> },
    /// The deadline fired and the process was terminated.
    TimedOut {
        #[serde(skip)]
        termination: TerminationStage,
        minutes: f64,
    },
}

impl DecompilerStatus {
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Clean)
    }

    /// One-line reason for logs and errors.
    pub fn describe(&self) -> String {
        match self {
            Self::Clean => "decompiler finished cleanly".to_string(),
            Self::Fatal { lines } => format!(
                "decompiler reported: {}",
                lines.first().map(String::as_str).unwrap_or("fatal error")
            ),
            Self::Failed { exit_code } => {
                format!("decompiler exited with code: {:?}", exit_code)
            }
            Self::TimedOut { minutes, .. } => {
                format!("decompiler timed out after {:.1} minutes", minutes)
            }
        }
    }
}

/// Result of a decompiler run that launched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecompilerReport {
    pub status: DecompilerStatus,
    /// Non-fatal stderr lines.
    pub notices: Vec<String>,
    /// Number of stdout progress lines.
    pub progress_lines: usize,
    pub timeout: TimeoutPolicy,
}

/// Result of the passthrough audio extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum FallbackAudio {
    /// Audio copied to `path`.
    Extracted { path: PathBuf, bytes: u64 },
    /// The source has no audio stream. Not an error.
    NoAudioStream,
    /// The encoder failed for another reason. Not fatal to the pipeline.
    Failed {
        reason: String,
        stderr: Option<String>,
    },
}

impl FallbackAudio {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}
