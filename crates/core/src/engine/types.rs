//! Types exchanged with engine implementations.

use std::time::Duration;

use super::termination::TerminationStage;

/// Default window between the graceful signal and the forced kill.
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(5);

/// One call into an engine: arguments plus supervision limits.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// Arguments appended after the engine's fixed leading arguments.
    pub args: Vec<String>,
    /// Deadline for the whole run. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Time allowed between the graceful signal and the forced kill.
    pub kill_grace: Duration,
}

impl Invocation {
    /// Creates an invocation with no deadline.
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            timeout: None,
            kill_grace: DEFAULT_KILL_GRACE,
        }
    }

    /// Sets the deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the grace window used after the deadline fires.
    pub fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }
}

/// Which pipe a line was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// A single line of process output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub text: String,
}

impl OutputLine {
    pub fn stdout(text: impl Into<String>) -> Self {
        Self {
            stream: OutputStream::Stdout,
            text: text.into(),
        }
    }

    pub fn stderr(text: impl Into<String>) -> Self {
        Self {
            stream: OutputStream::Stderr,
            text: text.into(),
        }
    }
}

/// How a supervised run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The process exited on its own. `exit_code` is `None` when it was
    /// terminated by a signal not sent by the supervisor.
    Completed { exit_code: Option<i32> },
    /// The deadline fired. `termination` records how far the escalation went.
    TimedOut { termination: TerminationStage },
}

/// Everything captured from a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOutput {
    pub outcome: RunOutcome,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl EngineOutput {
    /// Whether the process exited with status zero.
    pub fn success(&self) -> bool {
        matches!(self.outcome, RunOutcome::Completed { exit_code: Some(0) })
    }

    /// Whether the deadline fired.
    pub fn timed_out(&self) -> bool {
        matches!(self.outcome, RunOutcome::TimedOut { .. })
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self.outcome {
            RunOutcome::Completed { exit_code } => exit_code,
            RunOutcome::TimedOut { .. } => None,
        }
    }

    /// Stderr joined into one block, or `None` if nothing was written.
    pub fn stderr_text(&self) -> Option<String> {
        if self.stderr.is_empty() {
            None
        } else {
            Some(self.stderr.join("\n"))
        }
    }
}
