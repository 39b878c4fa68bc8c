//! Passthrough audio extraction with the encoder.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::types::{ExtractionRequest, FallbackAudio};
use crate::engine::{Engine, Invocation};
use crate::manifest::FALLBACK_AUDIO_FILE;

/// Encoder messages meaning the source simply has no audio.
const NO_STREAM_MARKERS: &[&str] = &[
    "does not contain any stream",
    "matches no streams",
    "output file is empty",
];

/// Copies the source's audio stream into `sounds/0.mp3` without re-encoding.
pub struct AudioFallbackExtractor<E: Engine> {
    engine: Arc<E>,
    log_level: String,
}

impl<E: Engine> AudioFallbackExtractor<E> {
    pub fn new(engine: Arc<E>, log_level: impl Into<String>) -> Self {
        Self {
            engine,
            log_level: log_level.into(),
        }
    }

    /// Where the fallback audio is written for a request.
    pub fn target_path(request: &ExtractionRequest) -> PathBuf {
        request.sounds_dir().join(FALLBACK_AUDIO_FILE)
    }

    /// Builds encoder arguments: video disabled, audio codec copied.
    pub fn build_args(&self, source: &Path, target: &Path) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            self.log_level.clone(),
            "-i".to_string(),
            source.to_string_lossy().to_string(),
            "-vn".to_string(),
            "-acodec".to_string(),
            "copy".to_string(),
            target.to_string_lossy().to_string(),
        ]
    }

    /// Extracts audio. Never fails the caller: every outcome is a value.
    pub async fn extract(&self, request: &ExtractionRequest, timeout: Duration) -> FallbackAudio {
        let target = Self::target_path(request);

        if let Err(e) = tokio::fs::create_dir_all(request.sounds_dir()).await {
            return FallbackAudio::Failed {
                reason: format!("Failed to create sounds directory: {}", e),
                stderr: None,
            };
        }

        // Audio left by an earlier run is only replaced, never deleted.
        let existed_before = tokio::fs::try_exists(&target).await.unwrap_or(false);

        let invocation = Invocation::new(self.build_args(&request.source, &target))
            .with_timeout(timeout);

        let output = match self.engine.run(invocation, None).await {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "Fallback audio extraction could not start");
                return FallbackAudio::Failed {
                    reason: e.to_string(),
                    stderr: None,
                };
            }
        };

        let no_stream = output.stderr.iter().any(|line| {
            let lower = line.to_lowercase();
            NO_STREAM_MARKERS.iter().any(|m| lower.contains(m))
        });

        let written = match tokio::fs::metadata(&target).await {
            Ok(meta) => meta.len(),
            Err(_) => 0,
        };

        if output.success() && written > 0 {
            info!(path = %target.display(), bytes = written, "Extracted fallback audio");
            return FallbackAudio::Extracted {
                path: target,
                bytes: written,
            };
        }

        // Drop an empty or truncated file this run wrote so it is not picked up as audio.
        if target.exists() && (!existed_before || written == 0) {
            if let Err(e) = tokio::fs::remove_file(&target).await {
                debug!(path = %target.display(), error = %e, "Failed to remove empty audio file");
            }
        }

        if output.success() || no_stream {
            info!(source = %request.source.display(), "Source has no audio stream");
            return FallbackAudio::NoAudioStream;
        }

        let reason = if output.timed_out() {
            "Fallback audio extraction timed out".to_string()
        } else {
            format!("Encoder exited with code: {:?}", output.exit_code())
        };
        warn!(reason = %reason, "Fallback audio extraction failed");

        FallbackAudio::Failed {
            reason,
            stderr: output.stderr_text(),
        }
    }
}
