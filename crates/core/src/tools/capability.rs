//! Capability values for optional external tools.

use std::path::{Path, PathBuf};

/// Result of looking up one executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolStatus {
    Available(PathBuf),
    Unavailable { tool: String, reason: String },
}

impl ToolStatus {
    pub fn unavailable(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Available(path) => Some(path),
            Self::Unavailable { .. } => None,
        }
    }
}

/// A collaborator the pipeline may or may not be able to use.
#[derive(Debug, Clone)]
pub enum Capability<T> {
    Available(T),
    Unavailable { tool: String, reason: String },
}

impl<T> Capability<T> {
    pub fn unavailable(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// Builds a capability from a lookup result.
    pub fn from_status(status: ToolStatus, build: impl FnOnce(PathBuf) -> T) -> Self {
        match status {
            ToolStatus::Available(path) => Self::Available(build(path)),
            ToolStatus::Unavailable { tool, reason } => Self::Unavailable { tool, reason },
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    /// Transforms the collaborator, keeping an unavailable reason as is.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Capability<U> {
        match self {
            Self::Available(inner) => Capability::Available(f(inner)),
            Self::Unavailable { tool, reason } => Capability::Unavailable { tool, reason },
        }
    }

    pub fn available(&self) -> Option<&T> {
        match self {
            Self::Available(inner) => Some(inner),
            Self::Unavailable { .. } => None,
        }
    }

    /// Returns the collaborator, or `(tool, reason)` when it is missing.
    pub fn require(&self) -> Result<&T, (&str, &str)> {
        match self {
            Self::Available(inner) => Ok(inner),
            Self::Unavailable { tool, reason } => Err((tool, reason)),
        }
    }
}
