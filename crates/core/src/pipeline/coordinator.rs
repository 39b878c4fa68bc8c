//! Drives extraction and conversion requests through their states.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::encode::{AssemblyDriver, FrameRateDetection, FrameRateDetector};
use crate::engine::{Engine, EngineError};
use crate::extract::{
    AudioFallbackExtractor, DecompilerStatus, DecompilerSupervisor, ExtractionRequest,
    FallbackAudio, TimeoutPolicy,
};
use crate::manifest::{reconcile, ContentManifest};
use crate::tools::Capability;

use super::cleanup::remove_tree_async;
use super::error::PipelineError;
use super::events::{EventSink, PipelineEvent};
use super::types::{
    ConversionOutcome, ConversionRequest, ExtractionOutcome, PipelineState, PipelineWarning,
};

/// Suffix of the per-source work directory.
const WORK_DIR_SUFFIX: &str = "_frames";

/// File marking a work directory as created by the pipeline.
pub const WORK_DIR_MARKER: &str = ".framereel-work";

/// Tracks the current state and reports each transition.
struct StateTracker<'a> {
    current: Option<PipelineState>,
    events: &'a EventSink,
}

impl<'a> StateTracker<'a> {
    fn new(events: &'a EventSink) -> Self {
        Self {
            current: None,
            events,
        }
    }

    async fn enter(&mut self, next: PipelineState) {
        if let Some(current) = self.current {
            debug_assert!(
                current.can_transition_to(next),
                "invalid transition {} -> {}",
                current,
                next
            );
        }
        debug!(state = %next, "Pipeline state");
        self.current = Some(next);
        self.events.emit(PipelineEvent::StateChanged { state: next }).await;
    }

    async fn warn(&self, warnings: &mut Vec<PipelineWarning>, warning: PipelineWarning) {
        warn!(warning = %warning, "Pipeline warning");
        self.events
            .emit(PipelineEvent::Warning {
                warning: warning.clone(),
            })
            .await;
        warnings.push(warning);
    }
}

/// Orchestrates the decompiler and encoder for one request at a time.
///
/// Requests are independent; a caller may run several concurrently as long
/// as their work directories differ.
pub struct Pipeline<D: Engine, E: Engine> {
    config: Config,
    decompiler: Capability<Arc<D>>,
    encoder: Capability<Arc<E>>,
}

impl<D: Engine, E: Engine> Pipeline<D, E> {
    /// Creates a pipeline from the detected engine capabilities.
    pub fn new(config: Config, decompiler: Capability<D>, encoder: Capability<E>) -> Self {
        Self {
            config,
            decompiler: decompiler.map(Arc::new),
            encoder: encoder.map(Arc::new),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Work directory for a conversion: `<stem>_frames` beside the
    /// destination, or under the configured work root.
    pub fn work_dir_for(&self, request: &ConversionRequest) -> PathBuf {
        let parent = match &self.config.pipeline.work_dir {
            Some(root) => root.clone(),
            None => match request.destination.parent() {
                Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => PathBuf::from("."),
            },
        };
        parent.join(format!("{}{}", request.stem(), WORK_DIR_SUFFIX))
    }

    fn require_decompiler(&self) -> Result<&Arc<D>, PipelineError> {
        self.decompiler
            .require()
            .map_err(|(tool, reason)| PipelineError::tool_unavailable(tool, reason))
    }

    fn require_encoder(&self) -> Result<&Arc<E>, PipelineError> {
        self.encoder
            .require()
            .map_err(|(tool, reason)| PipelineError::tool_unavailable(tool, reason))
    }

    async fn source_size(source: &Path) -> Result<u64, PipelineError> {
        match tokio::fs::metadata(source).await {
            Ok(meta) if meta.is_file() => Ok(meta.len()),
            Ok(_) => Err(PipelineError::InputNotFound {
                path: source.to_path_buf(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(PipelineError::InputNotFound {
                    path: source.to_path_buf(),
                })
            }
            Err(e) => Err(PipelineError::Io(e)),
        }
    }

    /// Extracts frames and audio without assembling a video.
    ///
    /// Fails only when the decompiler did not finish cleanly and left no
    /// frames. Anything less is reported through the outcome's warnings.
    pub async fn extract(
        &self,
        request: &ExtractionRequest,
        events: Option<mpsc::Sender<PipelineEvent>>,
    ) -> Result<ExtractionOutcome, PipelineError> {
        let sink = EventSink::from(events);
        let mut tracker = StateTracker::new(&sink);

        let result = self.run_extraction(request, &mut tracker).await;
        match result {
            Ok((outcome, _)) => {
                tracker.enter(PipelineState::Done).await;
                Ok(outcome)
            }
            Err(e) => {
                tracker.enter(PipelineState::Errored).await;
                Err(e)
            }
        }
    }

    async fn run_extraction(
        &self,
        request: &ExtractionRequest,
        tracker: &mut StateTracker<'_>,
    ) -> Result<(ExtractionOutcome, ContentManifest), PipelineError> {
        let decompiler = self.require_decompiler()?;
        let size = Self::source_size(&request.source).await?;
        let policy = TimeoutPolicy::for_source(size, self.config.pipeline.timeout_override_minutes);

        tracker.enter(PipelineState::Extracting).await;
        let supervisor = DecompilerSupervisor::new(Arc::clone(decompiler), self.config.decompiler.clone());
        let report = supervisor
            .run(request, policy, tracker.events)
            .await
            .map_err(|e| match e {
                EngineError::NotFound { .. } => {
                    PipelineError::tool_unavailable(decompiler.name(), e.to_string())
                }
                other => PipelineError::Engine(other),
            })?;

        let mut warnings = Vec::new();

        tracker.enter(PipelineState::AudioFallback).await;
        let fallback_audio = match self.encoder.available() {
            Some(encoder) => {
                let extractor = AudioFallbackExtractor::new(
                    Arc::clone(encoder),
                    self.config.encoder.log_level.clone(),
                );
                let audio = extractor.extract(request, policy.duration()).await;
                if let FallbackAudio::Failed { ref reason, .. } = audio {
                    tracker
                        .warn(
                            &mut warnings,
                            PipelineWarning::FallbackAudioFailure {
                                reason: reason.clone(),
                            },
                        )
                        .await;
                }
                Some(audio)
            }
            None => {
                let reason = match self.encoder.require() {
                    Err((tool, reason)) => format!("{} unavailable: {}", tool, reason),
                    Ok(_) => String::new(),
                };
                tracker
                    .warn(&mut warnings, PipelineWarning::AudioFallbackSkipped { reason })
                    .await;
                None
            }
        };

        tracker.enter(PipelineState::Reconciling).await;
        let manifest = reconcile(&request.output_dir)?;
        info!(
            frames = manifest.frame_count,
            audio = manifest.audio.len(),
            layout = ?manifest.layout,
            "Reconciled extraction output"
        );

        if !report.status.is_clean() {
            if manifest.is_empty() {
                return Err(match &report.status {
                    DecompilerStatus::TimedOut { minutes, .. } => {
                        PipelineError::Timeout { minutes: *minutes }
                    }
                    DecompilerStatus::Fatal { lines } => PipelineError::fatal_extraction(
                        report.status.describe(),
                        Some(lines.join("\n")),
                    ),
                    status => PipelineError::fatal_extraction(
                        status.describe(),
                        (!report.notices.is_empty()).then(|| report.notices.join("\n")),
                    ),
                });
            }
            tracker
                .warn(
                    &mut warnings,
                    PipelineWarning::PartialExtraction {
                        frames: manifest.frame_count,
                        reason: report.status.describe(),
                    },
                )
                .await;
        }

        let outcome = ExtractionOutcome {
            decompiler_succeeded: report.status.is_clean(),
            frames: manifest.frames.clone(),
            audio: manifest.audio.clone(),
            decompiler: report,
            fallback_audio,
            warnings,
        };
        Ok((outcome, manifest))
    }

    /// Converts a source animation into a video at the request's destination.
    ///
    /// Both engines must be available before any work starts. The work
    /// directory is removed afterwards, on success and on failure, unless
    /// the request or the configuration keeps it.
    pub async fn convert(
        &self,
        request: &ConversionRequest,
        events: Option<mpsc::Sender<PipelineEvent>>,
    ) -> Result<ConversionOutcome, PipelineError> {
        let sink = EventSink::from(events);
        let mut tracker = StateTracker::new(&sink);
        let start = Instant::now();

        let result = self.run_conversion(request, &mut tracker, start).await;
        if result.is_err() {
            tracker.enter(PipelineState::Errored).await;
        }
        result
    }

    async fn run_conversion(
        &self,
        request: &ConversionRequest,
        tracker: &mut StateTracker<'_>,
        start: Instant,
    ) -> Result<ConversionOutcome, PipelineError> {
        self.require_decompiler()?;
        let encoder = self.require_encoder()?;
        Self::source_size(&request.source).await?;

        let keep = request.keep_intermediate || self.config.pipeline.keep_intermediate;
        let work_dir = self.work_dir_for(request);
        claim_work_dir(&work_dir).await?;

        info!(
            source = %request.source.display(),
            destination = %request.destination.display(),
            work_dir = %work_dir.display(),
            "Starting conversion"
        );

        tracker.enter(PipelineState::RateDetecting).await;
        let rate = self.resolve_frame_rate(encoder, request).await;
        tracker
            .events
            .emit(PipelineEvent::FrameRateResolved {
                fps: rate.fps,
                detected: rate.detected,
            })
            .await;

        let extraction_request = ExtractionRequest::new(&request.source, &work_dir)
            .with_frame_cap(self.config.pipeline.test_frame_cap);

        let result = match self.run_extraction(&extraction_request, tracker).await {
            Ok((extraction, manifest)) => {
                tracker.enter(PipelineState::Assembling).await;
                let driver = AssemblyDriver::new(Arc::clone(encoder), self.config.encoder.clone());
                driver
                    .assemble(&manifest, rate.fps, &request.destination, tracker.events)
                    .await
                    .map(|assembly| (extraction, assembly))
            }
            Err(e) => Err(e),
        };

        if keep {
            info!(work_dir = %work_dir.display(), "Keeping intermediate files");
        } else {
            tracker.enter(PipelineState::CleaningUp).await;
            if let Err(e) = remove_tree_async(&work_dir).await {
                warn!(work_dir = %work_dir.display(), error = %e, "Failed to remove work directory");
            }
        }

        let (extraction, assembly) = result?;
        tracker.enter(PipelineState::Done).await;

        info!(
            output = %assembly.output_path.display(),
            frames = assembly.frame_count,
            fps = assembly.frame_rate,
            bytes = assembly.output_size_bytes,
            "Conversion complete"
        );

        Ok(ConversionOutcome {
            output_path: assembly.output_path,
            output_size_bytes: assembly.output_size_bytes,
            frame_rate: assembly.frame_rate,
            frame_rate_detected: rate.detected,
            frame_count: assembly.frame_count,
            has_audio: assembly.audio_track.is_some(),
            duration_secs: assembly.duration_secs,
            decompiler_succeeded: extraction.decompiler_succeeded,
            warnings: extraction.warnings,
            work_dir: keep.then_some(work_dir),
            elapsed_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// A non-default requested rate is used as is; the default asks the
    /// encoder to read the source's own rate.
    async fn resolve_frame_rate(
        &self,
        encoder: &Arc<E>,
        request: &ConversionRequest,
    ) -> FrameRateDetection {
        let default_fps = self.config.pipeline.default_frame_rate;
        if request.frame_rate != default_fps {
            debug!(fps = request.frame_rate, "Using requested frame rate");
            return FrameRateDetection {
                fps: request.frame_rate,
                detected: false,
            };
        }

        FrameRateDetector::new(
            Arc::clone(encoder),
            self.config.encoder.probe_timeout(),
            default_fps,
        )
        .detect(&request.source)
        .await
    }
}

/// Creates the work directory and marks it as ours.
///
/// A leftover directory is cleared only when it carries the marker; any
/// other existing directory is refused.
async fn claim_work_dir(work_dir: &Path) -> Result<(), PipelineError> {
    if tokio::fs::try_exists(work_dir).await? {
        if !tokio::fs::try_exists(work_dir.join(WORK_DIR_MARKER)).await? {
            return Err(PipelineError::WorkDirInUse {
                path: work_dir.to_path_buf(),
            });
        }
        debug!(work_dir = %work_dir.display(), "Clearing stale work directory");
        remove_tree_async(work_dir).await?;
    }

    tokio::fs::create_dir_all(work_dir).await?;
    tokio::fs::write(work_dir.join(WORK_DIR_MARKER), b"").await?;
    Ok(())
}
