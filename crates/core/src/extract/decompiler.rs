//! Supervision of the decompiler process.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::classify::{parse_progress, LineClass, LineClassifier};
use super::timeout::TimeoutPolicy;
use super::types::{DecompilerReport, DecompilerStatus, ExtractionRequest};
use crate::config::DecompilerConfig;
use crate::engine::{Engine, EngineError, Invocation, OutputLine, RunOutcome};
use crate::pipeline::{EventSink, PipelineEvent};

/// Capacity of the live output channel.
const LINE_BUFFER: usize = 256;

/// Launches the decompiler and turns its output into a [`DecompilerReport`].
pub struct DecompilerSupervisor<D: Engine> {
    engine: Arc<D>,
    config: DecompilerConfig,
    classifier: LineClassifier,
}

impl<D: Engine> DecompilerSupervisor<D> {
    pub fn new(engine: Arc<D>, config: DecompilerConfig) -> Self {
        let classifier = LineClassifier::new(&config.fatal_patterns);
        Self {
            engine,
            config,
            classifier,
        }
    }

    /// Builds the decompiler arguments. The order is positional and fixed:
    /// selection range, export directive, output directory, source.
    pub fn build_args(request: &ExtractionRequest) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(cap) = request.frame_cap {
            args.extend(["-select".to_string(), format!("1-{}", cap)]);
        }

        args.extend([
            "-export".to_string(),
            "frame,sound".to_string(),
            request.output_dir.to_string_lossy().to_string(),
            request.source.to_string_lossy().to_string(),
        ]);

        args
    }

    /// Creates the output tree the decompiler expects to exist.
    ///
    /// The decompiler may write into numbered subdirectories of `frames/`
    /// without creating them, so a bounded number are created up front.
    pub async fn prepare_output(&self, request: &ExtractionRequest) -> std::io::Result<()> {
        let frames_dir = request.frames_dir();
        tokio::fs::create_dir_all(&frames_dir).await?;
        tokio::fs::create_dir_all(request.sounds_dir()).await?;

        let count = match request.frame_cap {
            Some(cap) => cap.min(self.config.prealloc_frame_dirs),
            None => self.config.prealloc_frame_dirs,
        };
        for n in 1..=count {
            tokio::fs::create_dir_all(frames_dir.join(n.to_string())).await?;
        }

        Ok(())
    }

    /// Runs the decompiler under `timeout`.
    ///
    /// Returns `Err` only when the process could not be started; every way a
    /// started process can end is described by the report's status.
    pub async fn run(
        &self,
        request: &ExtractionRequest,
        timeout: TimeoutPolicy,
        events: &EventSink,
    ) -> Result<DecompilerReport, EngineError> {
        self.prepare_output(request).await?;

        let invocation = Invocation::new(Self::build_args(request))
            .with_timeout(timeout.duration())
            .with_kill_grace(self.config.kill_grace());

        info!(
            source = %request.source.display(),
            output = %request.output_dir.display(),
            timeout_minutes = timeout.minutes,
            overridden = timeout.overridden,
            "Starting decompiler"
        );

        let (tx, mut rx) = mpsc::channel::<OutputLine>(LINE_BUFFER);
        let forward = async {
            while let Some(line) = rx.recv().await {
                match self.classifier.classify(&line) {
                    LineClass::Progress => {
                        let (current, total) = match parse_progress(&line.text) {
                            Some((c, t)) => (Some(c), Some(t)),
                            None => (None, None),
                        };
                        events
                            .emit(PipelineEvent::DecompilerProgress {
                                current,
                                total,
                                line: line.text,
                            })
                            .await;
                    }
                    LineClass::Info => debug!(line = %line.text, "Decompiler notice"),
                    LineClass::Fatal => warn!(line = %line.text, "Decompiler fatal error"),
                }
            }
        };

        let (result, ()) = tokio::join!(self.engine.run(invocation, Some(tx)), forward);
        let output = result?;

        let (fatal, notices): (Vec<String>, Vec<String>) = output
            .stderr
            .iter()
            .cloned()
            .partition(|line| self.classifier.is_fatal(line));

        let status = match output.outcome {
            RunOutcome::TimedOut { termination } => DecompilerStatus::TimedOut {
                termination,
                minutes: timeout.minutes,
            },
            _ if !fatal.is_empty() => DecompilerStatus::Fatal { lines: fatal },
            RunOutcome::Completed { exit_code: Some(0) } => DecompilerStatus::Clean,
            RunOutcome::Completed { exit_code } => DecompilerStatus::Failed { exit_code },
        };

        if status.is_clean() {
            info!(notices = notices.len(), "Decompiler finished");
        } else {
            warn!(reason = %status.describe(), "Decompiler did not finish cleanly");
        }

        Ok(DecompilerReport {
            status,
            notices,
            progress_lines: output.stdout.len(),
            timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TerminationStage;
    use crate::testing::{FakeEngine, FakeRun};
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;

    fn supervisor(engine: FakeEngine) -> DecompilerSupervisor<FakeEngine> {
        DecompilerSupervisor::new(Arc::new(engine), DecompilerConfig::default())
    }

    #[test]
    fn test_build_args_order() {
        let req = ExtractionRequest::new("/in/a.swf", "/out/a");
        assert_eq!(
            DecompilerSupervisor::<FakeEngine>::build_args(&req),
            vec!["-export", "frame,sound", "/out/a", "/in/a.swf"]
        );

        let req = req.with_frame_cap(Some(25));
        assert_eq!(
            DecompilerSupervisor::<FakeEngine>::build_args(&req),
            vec!["-select", "1-25", "-export", "frame,sound", "/out/a", "/in/a.swf"]
        );
    }

    #[tokio::test]
    async fn test_prepare_output_creates_tree() {
        let dir = TempDir::new().unwrap();
        let req = ExtractionRequest::new("/in/a.swf", dir.path().join("out")).with_frame_cap(Some(3));
        supervisor(FakeEngine::new()).prepare_output(&req).await.unwrap();

        assert!(req.sounds_dir().is_dir());
        for n in 1..=3 {
            assert!(req.frames_dir().join(n.to_string()).is_dir());
        }
        assert!(!req.frames_dir().join("4").exists());
    }

    #[tokio::test]
    async fn test_warnings_still_clean() {
        let dir = TempDir::new().unwrap();
        let engine = FakeEngine::new();
        engine
            .push(
                FakeRun::exit(0)
                    .with_stdout(["Exporting frame 1/2", "Exporting frame 2/2"])
                    .with_stderr(["WARNING: unknown tag"]),
            )
            .await;

        let (tx, mut rx) = mpsc::channel(16);
        let report = supervisor(engine)
            .run(
                &ExtractionRequest::new("/in/a.swf", dir.path()),
                TimeoutPolicy::for_source(0, None),
                &EventSink::new(tx),
            )
            .await
            .unwrap();

        assert_eq!(report.status, DecompilerStatus::Clean);
        assert_eq!(report.notices, vec!["WARNING: unknown tag".to_string()]);
        assert_eq!(report.progress_lines, 2);

        let mut progress = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let PipelineEvent::DecompilerProgress { current, total, .. } = event {
                progress.push((current, total));
            }
        }
        assert_eq!(progress, vec![(Some(1), Some(2)), (Some(2), Some(2))]);
    }

    #[tokio::test]
    async fn test_fatal_pattern() {
        let dir = TempDir::new().unwrap();
        let engine = FakeEngine::new();
        engine
            .push(FakeRun::exit(0).with_stderr(["Bad command-line arguments"]))
            .await;

        let report = supervisor(engine)
            .run(
                &ExtractionRequest::new("/in/a.swf", dir.path()),
                TimeoutPolicy::for_source(0, None),
                &EventSink::none(),
            )
            .await
            .unwrap();

        assert!(matches!(report.status, DecompilerStatus::Fatal { ref lines } if lines.len() == 1));
    }

    #[tokio::test]
    async fn test_nonzero_exit_without_pattern() {
        let dir = TempDir::new().unwrap();
        let engine = FakeEngine::new();
        engine.push(FakeRun::exit(1)).await;

        let report = supervisor(engine)
            .run(
                &ExtractionRequest::new("/in/a.swf", dir.path()),
                TimeoutPolicy::for_source(0, None),
                &EventSink::none(),
            )
            .await
            .unwrap();

        assert_eq!(report.status, DecompilerStatus::Failed { exit_code: Some(1) });
    }

    #[tokio::test]
    async fn test_timeout_uses_policy() {
        let dir = TempDir::new().unwrap();
        let engine = FakeEngine::new();
        engine
            .push(FakeRun::exit(0).taking(Duration::from_secs(3 * 60)))
            .await;
        let engine = Arc::new(engine);
        let supervisor = DecompilerSupervisor::new(Arc::clone(&engine), DecompilerConfig::default());

        let report = supervisor
            .run(
                &ExtractionRequest::new("/in/a.swf", dir.path()),
                TimeoutPolicy::for_source(0, Some(1.0)),
                &EventSink::none(),
            )
            .await
            .unwrap();

        assert!(matches!(
            report.status,
            DecompilerStatus::TimedOut { termination: TerminationStage::SignaledTerm, .. }
        ));
        let recorded = engine.invocations().await;
        assert_eq!(recorded[0].timeout, Some(Duration::from_secs(60)));
        assert_eq!(engine.terminated_runs().await, 1);
    }

    #[tokio::test]
    async fn test_spawn_failure_is_error() {
        let dir = TempDir::new().unwrap();
        let engine = FakeEngine::new();
        engine.push(FakeRun::not_found()).await;

        let err = supervisor(engine)
            .run(
                &ExtractionRequest::new(PathBuf::from("/in/a.swf"), dir.path()),
                TimeoutPolicy::for_source(0, None),
                &EventSink::none(),
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
