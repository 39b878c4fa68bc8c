//! Engine implementation backed by a child process.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, timeout, Duration, Instant};
use tracing::{debug, warn};

use super::error::EngineError;
use super::termination::{SupervisorAction, SupervisorEvent, TerminationStage};
use super::traits::Engine;
use super::types::{EngineOutput, Invocation, OutputLine, OutputStream, RunOutcome};

/// How long to keep draining pipes after the process has exited.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

type LineBuffer = Arc<Mutex<Vec<String>>>;

/// Runs a fixed program with fixed leading arguments.
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    name: String,
    program: PathBuf,
    leading_args: Vec<String>,
}

impl ProcessEngine {
    /// Creates an engine that runs `program` directly.
    pub fn new(name: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    /// Creates an engine that runs a Java archive: `<runtime> -jar <archive> ...`.
    pub fn java_archive(name: impl Into<String>, runtime: impl Into<PathBuf>, archive: &Path) -> Self {
        Self::new(name, runtime).with_leading_args([
            "-jar".to_string(),
            archive.to_string_lossy().to_string(),
        ])
    }

    /// Sets arguments placed before every invocation's own arguments.
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Path of the program this engine launches.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments placed before every invocation's own arguments.
    pub fn leading_args(&self) -> &[String] {
        &self.leading_args
    }

    /// Waits for the child, escalating termination once the deadline fires.
    async fn supervise(
        &self,
        child: &mut Child,
        invocation: &Invocation,
    ) -> Result<(TerminationStage, ExitStatus), EngineError> {
        let deadline = invocation
            .timeout
            .and_then(|t| Instant::now().checked_add(t));
        let mut grace_deadline: Option<Instant> = None;
        let mut stage = TerminationStage::Running;

        loop {
            let event = tokio::select! {
                status = child.wait() => {
                    let status = status?;
                    let (stage, _) = stage.advance(SupervisorEvent::ProcessExited);
                    return Ok((stage, status));
                }
                _ = wait_until(deadline), if stage == TerminationStage::Running => {
                    SupervisorEvent::DeadlineReached
                }
                _ = wait_until(grace_deadline), if stage.awaiting_grace() => {
                    SupervisorEvent::GraceExpired
                }
            };

            let (next, action) = stage.advance(event);
            stage = next;

            match action {
                SupervisorAction::SendTerminate => {
                    warn!(
                        engine = %self.name,
                        timeout_secs = invocation.timeout.map(|t| t.as_secs_f64()),
                        "Deadline reached, sending termination signal"
                    );
                    if let Err(e) = send_terminate(child) {
                        debug!(engine = %self.name, error = %e, "Termination signal failed");
                    }
                    grace_deadline = Instant::now().checked_add(invocation.kill_grace);
                }
                SupervisorAction::ForceKill => {
                    warn!(engine = %self.name, "Process ignored termination signal, killing");
                    if let Err(e) = child.start_kill() {
                        debug!(engine = %self.name, error = %e, "Kill failed");
                    }
                }
                SupervisorAction::None => {}
            }
        }
    }
}

#[async_trait]
impl Engine for ProcessEngine {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(
        &self,
        invocation: Invocation,
        lines: Option<mpsc::Sender<OutputLine>>,
    ) -> Result<EngineOutput, EngineError> {
        let program = self.program.to_string_lossy().to_string();
        debug!(engine = %self.name, program = %program, args = ?invocation.args, "Launching engine");

        let mut child = Command::new(&self.program)
            .args(&self.leading_args)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::from_spawn(&self.name, &program, e))?;

        let stdout_buf = LineBuffer::default();
        let stderr_buf = LineBuffer::default();

        let stdout_task = child.stdout.take().map(|out| {
            tokio::spawn(read_lines(
                out,
                OutputStream::Stdout,
                Arc::clone(&stdout_buf),
                lines.clone(),
            ))
        });
        let stderr_task = child.stderr.take().map(|err| {
            tokio::spawn(read_lines(
                err,
                OutputStream::Stderr,
                Arc::clone(&stderr_buf),
                lines.clone(),
            ))
        });
        drop(lines);

        let (stage, status) = self.supervise(&mut child, &invocation).await?;

        drain(stdout_task).await;
        drain(stderr_task).await;

        let outcome = if stage.is_escalated() {
            RunOutcome::TimedOut { termination: stage }
        } else {
            RunOutcome::Completed {
                exit_code: status.code(),
            }
        };

        debug!(engine = %self.name, ?outcome, "Engine finished");

        Ok(EngineOutput {
            outcome,
            stdout: take_lines(&stdout_buf),
            stderr: take_lines(&stderr_buf),
        })
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(unix)]
fn send_terminate(child: &mut Child) -> std::io::Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    match child.id() {
        Some(pid) => kill(Pid::from_raw(pid as i32), Signal::SIGTERM).map_err(std::io::Error::from),
        // Already reaped.
        None => Ok(()),
    }
}

#[cfg(not(unix))]
fn send_terminate(child: &mut Child) -> std::io::Result<()> {
    child.start_kill()
}

/// Reads newline-terminated output, tolerating invalid UTF-8.
async fn read_lines<R>(
    reader: R,
    stream: OutputStream,
    buffer: LineBuffer,
    tx: Option<mpsc::Sender<OutputLine>>,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut raw = Vec::new();

    loop {
        raw.clear();
        match reader.read_until(b'\n', &mut raw).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&raw)
                    .trim_end_matches(['\r', '\n'])
                    .to_string();
                if let Some(ref tx) = tx {
                    // Non-blocking send
                    let _ = tx.try_send(OutputLine {
                        stream,
                        text: text.clone(),
                    });
                }
                if let Ok(mut lines) = buffer.lock() {
                    lines.push(text);
                }
            }
            Err(e) => {
                debug!(?stream, error = %e, "Stopped reading engine output");
                break;
            }
        }
    }
}

/// Waits briefly for a reader to hit EOF; a grandchild may hold the pipe open.
async fn drain(task: Option<JoinHandle<()>>) {
    if let Some(mut task) = task {
        if timeout(DRAIN_TIMEOUT, &mut task).await.is_err() {
            debug!("Output pipe still open after exit, abandoning reader");
            task.abort();
        }
    }
}

fn take_lines(buffer: &LineBuffer) -> Vec<String> {
    buffer
        .lock()
        .map(|mut lines| std::mem::take(&mut *lines))
        .unwrap_or_default()
}
