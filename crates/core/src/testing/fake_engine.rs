//! Scripted engine for tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};

use crate::engine::{
    Engine, EngineError, EngineOutput, Invocation, OutputLine, RunOutcome, TerminationStage,
};

type Effect = Arc<dyn Fn(&Invocation) -> std::io::Result<()> + Send + Sync>;

/// One scripted run of a [`FakeEngine`].
#[derive(Clone)]
pub struct FakeRun {
    exit_code: Option<i32>,
    stdout: Vec<String>,
    stderr: Vec<String>,
    /// How long the run pretends to take. Compared against the deadline,
    /// never slept.
    duration: Duration,
    ignores_terminate: bool,
    not_found: bool,
    effect: Option<Effect>,
}

impl std::fmt::Debug for FakeRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeRun")
            .field("exit_code", &self.exit_code)
            .field("stdout", &self.stdout)
            .field("stderr", &self.stderr)
            .field("duration", &self.duration)
            .field("not_found", &self.not_found)
            .finish()
    }
}

impl FakeRun {
    /// A run that exits with `code`.
    pub fn exit(code: i32) -> Self {
        Self {
            exit_code: Some(code),
            stdout: Vec::new(),
            stderr: Vec::new(),
            duration: Duration::ZERO,
            ignores_terminate: false,
            not_found: false,
            effect: None,
        }
    }

    /// A run whose executable cannot be found.
    pub fn not_found() -> Self {
        Self {
            not_found: true,
            ..Self::exit(127)
        }
    }

    pub fn with_stdout<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stdout = lines.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_stderr<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stderr = lines.into_iter().map(Into::into).collect();
        self
    }

    /// Pretends the run takes `duration`. Longer than the invocation's
    /// deadline means the run times out.
    pub fn taking(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// A timed-out run survives the graceful signal and gets killed.
    pub fn ignoring_terminate(mut self) -> Self {
        self.ignores_terminate = true;
        self
    }

    /// Side effect performed before the run ends, e.g. writing output files.
    ///
    /// Runs even when the run times out, which models partial output.
    pub fn with_effect<F>(mut self, effect: F) -> Self
    where
        F: Fn(&Invocation) -> std::io::Result<()> + Send + Sync + 'static,
    {
        self.effect = Some(Arc::new(effect));
        self
    }
}

/// Engine that replays [`FakeRun`]s in order and records invocations.
///
/// Clones share state, so a test can keep a handle after giving one away.
/// With an empty script every run exits with status zero.
#[derive(Debug, Clone)]
pub struct FakeEngine {
    name: String,
    script: Arc<RwLock<VecDeque<FakeRun>>>,
    invocations: Arc<RwLock<Vec<Invocation>>>,
    terminated: Arc<RwLock<usize>>,
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::named("fake")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Arc::new(RwLock::new(VecDeque::new())),
            invocations: Arc::new(RwLock::new(Vec::new())),
            terminated: Arc::new(RwLock::new(0)),
        }
    }

    /// Queues the next run.
    pub async fn push(&self, run: FakeRun) {
        self.script.write().await.push_back(run);
    }

    /// Invocations received so far, in order.
    pub async fn invocations(&self) -> Vec<Invocation> {
        self.invocations.read().await.clone()
    }

    /// Number of runs ended by the deadline.
    pub async fn terminated_runs(&self) -> usize {
        *self.terminated.read().await
    }

    /// Scripted runs not yet consumed.
    pub async fn pending_runs(&self) -> usize {
        self.script.read().await.len()
    }
}

#[async_trait]
impl Engine for FakeEngine {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(
        &self,
        invocation: Invocation,
        lines: Option<mpsc::Sender<OutputLine>>,
    ) -> Result<EngineOutput, EngineError> {
        self.invocations.write().await.push(invocation.clone());
        let run = self
            .script
            .write()
            .await
            .pop_front()
            .unwrap_or_else(|| FakeRun::exit(0));

        if run.not_found {
            return Err(EngineError::NotFound {
                engine: self.name.clone(),
                program: self.name.clone(),
            });
        }

        if let Some(ref tx) = lines {
            for line in &run.stdout {
                let _ = tx.try_send(OutputLine::stdout(line.clone()));
            }
            for line in &run.stderr {
                let _ = tx.try_send(OutputLine::stderr(line.clone()));
            }
        }
        drop(lines);

        if let Some(ref effect) = run.effect {
            effect(&invocation)?;
        }

        let timed_out = invocation
            .timeout
            .map(|limit| run.duration > limit)
            .unwrap_or(false);

        let outcome = if timed_out {
            *self.terminated.write().await += 1;
            let termination = if run.ignores_terminate {
                TerminationStage::Killed
            } else {
                TerminationStage::SignaledTerm
            };
            RunOutcome::TimedOut { termination }
        } else {
            RunOutcome::Completed {
                exit_code: run.exit_code,
            }
        };

        Ok(EngineOutput {
            outcome,
            stdout: run.stdout,
            stderr: run.stderr,
        })
    }
}
