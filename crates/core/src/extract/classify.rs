//! Classification of decompiler output.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::engine::{OutputLine, OutputStream};

static PROGRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*/\s*(\d+)").expect("valid progress regex"));

/// What a decompiler line means for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    /// Stdout: export progress.
    Progress,
    /// Stderr the decompiler prints routinely.
    Info,
    /// Stderr matching a known fatal pattern.
    Fatal,
}

/// Splits decompiler output into progress, routine warnings and fatal errors.
#[derive(Debug, Clone)]
pub struct LineClassifier {
    fatal_patterns: Vec<String>,
}

impl LineClassifier {
    /// Patterns are matched case-insensitively as substrings.
    pub fn new(fatal_patterns: &[String]) -> Self {
        Self {
            fatal_patterns: fatal_patterns.iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    pub fn classify(&self, line: &OutputLine) -> LineClass {
        match line.stream {
            OutputStream::Stdout => LineClass::Progress,
            OutputStream::Stderr if self.is_fatal(&line.text) => LineClass::Fatal,
            OutputStream::Stderr => LineClass::Info,
        }
    }

    pub fn is_fatal(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.fatal_patterns.iter().any(|p| lower.contains(p.as_str()))
    }
}

/// Extracts a `current/total` counter from a progress line.
pub fn parse_progress(text: &str) -> Option<(u64, u64)> {
    let caps = PROGRESS_RE.captures(text)?;
    let current = caps.get(1)?.as_str().parse().ok()?;
    let total = caps.get(2)?.as_str().parse().ok()?;
    Some((current, total))
}
