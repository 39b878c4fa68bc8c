//! Error types for the pipeline module.

use std::path::PathBuf;
use thiserror::Error;

use crate::engine::EngineError;

/// Failures that halt a request.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required external engine is missing.
    #[error("{tool} is unavailable: {reason}")]
    ToolUnavailable { tool: String, reason: String },

    /// Source file does not exist.
    #[error("Source file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// The decompiler failed and left no frames behind.
    #[error("Extraction failed: {reason}")]
    FatalExtraction {
        reason: String,
        stderr: Option<String>,
    },

    /// The decompiler exceeded its deadline and left no frames behind.
    #[error("Decompiler timed out after {minutes:.1} minutes with no frames extracted")]
    Timeout { minutes: f64 },

    /// The encoder could not assemble the video.
    #[error("Assembly failed: {reason}")]
    AssemblyFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// The destination directory rejected a probe write.
    #[error("Destination is not writable: {path}: {reason}")]
    DestinationNotWritable { path: PathBuf, reason: String },

    /// A directory at the work directory path was not created by a pipeline run.
    #[error("Work directory already exists and was not created by framereel: {path}")]
    WorkDirInUse { path: PathBuf },

    /// Engine supervision error.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Creates a tool unavailable error.
    pub fn tool_unavailable(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ToolUnavailable {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// Creates a fatal extraction error.
    pub fn fatal_extraction(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::FatalExtraction {
            reason: reason.into(),
            stderr,
        }
    }

    /// Creates an assembly failed error with stderr output.
    pub fn assembly_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::AssemblyFailed {
            reason: reason.into(),
            stderr,
        }
    }

    /// Whether the user must install or configure a tool.
    pub fn is_tool_unavailable(&self) -> bool {
        matches!(self, Self::ToolUnavailable { .. })
    }

    /// Captured engine output attached to the error, if any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::FatalExtraction { stderr, .. } | Self::AssemblyFailed { stderr, .. } => {
                stderr.as_deref()
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = PipelineError::Timeout { minutes: 1.0 };
        assert_eq!(
            err.to_string(),
            "Decompiler timed out after 1.0 minutes with no frames extracted"
        );

        let err = PipelineError::tool_unavailable("ffmpeg", "not found on PATH");
        assert!(err.is_tool_unavailable());
        assert_eq!(err.to_string(), "ffmpeg is unavailable: not found on PATH");
    }

    #[test]
    fn test_stderr_accessor() {
        let err = PipelineError::assembly_failed("exit 1", Some("Unknown encoder".into()));
        assert_eq!(err.stderr(), Some("Unknown encoder"));
        assert_eq!(PipelineError::Timeout { minutes: 2.0 }.stderr(), None);
    }
}
