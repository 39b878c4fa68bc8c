//! Error types for the engine module.

use thiserror::Error;

/// Errors raised while launching or supervising an engine process.
///
/// A process that starts and then fails is not an error at this level; it is
/// reported through [`super::RunOutcome`] so callers can apply their own policy.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The program (or its runtime) could not be found.
    #[error("{engine} executable not found: {program}")]
    NotFound { engine: String, program: String },

    /// The program exists but could not be started.
    #[error("Failed to start {engine}: {source}")]
    Spawn {
        engine: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O error while supervising a running process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Maps a spawn error, distinguishing a missing executable.
    pub fn from_spawn(engine: &str, program: &str, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound {
                engine: engine.to_string(),
                program: program.to_string(),
            }
        } else {
            Self::Spawn {
                engine: engine.to_string(),
                source: err,
            }
        }
    }

    /// Whether the failure means the engine is not installed.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
