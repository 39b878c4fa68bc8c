//! Best-effort frame-rate detection from encoder diagnostics.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::engine::{Engine, Invocation};

/// Largest frame rate accepted from diagnostics.
pub const MAX_FRAME_RATE: f64 = 120.0;

/// Grace before the analysis run is killed after its deadline.
const PROBE_KILL_GRACE: Duration = Duration::from_secs(1);

static FPS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*fps").expect("valid fps regex"));
static TBR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*tbr").expect("valid tbr regex"));

/// Searches diagnostics for an `fps` marker, then a `tbr` marker.
///
/// The first value in `(0, 120]` wins, rounded to the nearest integer.
pub fn parse_frame_rate(text: &str) -> Option<u32> {
    [&*FPS_RE, &*TBR_RE].into_iter().find_map(|re| {
        re.captures_iter(text).find_map(|caps| {
            let value: f64 = caps.get(1)?.as_str().parse().ok()?;
            if value > 0.0 && value <= MAX_FRAME_RATE {
                let rounded = value.round() as u32;
                (rounded > 0).then_some(rounded)
            } else {
                None
            }
        })
    })
}

/// Frame rate to assemble at, and whether it came from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameRateDetection {
    pub fps: u32,
    pub detected: bool,
}

/// Runs the encoder in analysis mode against a source.
pub struct FrameRateDetector<E: Engine> {
    engine: Arc<E>,
    timeout: Duration,
    default_fps: u32,
}

impl<E: Engine> FrameRateDetector<E> {
    pub fn new(engine: Arc<E>, timeout: Duration, default_fps: u32) -> Self {
        Self {
            engine,
            timeout,
            default_fps,
        }
    }

    /// Analysis only: an input and no output target.
    pub fn build_args(source: &Path) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-i".to_string(),
            source.to_string_lossy().to_string(),
        ]
    }

    /// Detects the rate, falling back to the default on any failure.
    pub async fn detect(&self, source: &Path) -> FrameRateDetection {
        let fallback = FrameRateDetection {
            fps: self.default_fps,
            detected: false,
        };

        let invocation = Invocation::new(Self::build_args(source))
            .with_timeout(self.timeout)
            .with_kill_grace(PROBE_KILL_GRACE);

        let output = match self.engine.run(invocation, None).await {
            Ok(output) => output,
            Err(e) => {
                debug!(error = %e, "Frame rate analysis could not start");
                return fallback;
            }
        };

        if output.timed_out() {
            debug!(timeout_secs = self.timeout.as_secs(), "Frame rate analysis timed out");
            return fallback;
        }

        // The encoder exits non-zero without an output; diagnostics are still valid.
        let text = output.stderr.join("\n");
        match parse_frame_rate(&text) {
            Some(fps) => {
                info!(fps, source = %source.display(), "Detected source frame rate");
                FrameRateDetection {
                    fps,
                    detected: true,
                }
            }
            None => {
                debug!(default = self.default_fps, "No frame rate in diagnostics");
                fallback
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeEngine, FakeRun};

    const SWF_DIAG: &str = "Input #0, swf, from 'a.swf':\n  Duration: N/A, bitrate: N/A\n    Stream #0:0: Video: flv1, yuv420p, 550x400, 24 fps, 24 tbr, 24 tbn\nAt least one output file must be specified";

    #[test]
    fn test_parse_fps_marker() {
        assert_eq!(parse_frame_rate(SWF_DIAG), Some(24));
        assert_eq!(parse_frame_rate("Video: h264, 29.97 fps, 29.97 tbr"), Some(30));
    }

    #[test]
    fn test_parse_falls_back_to_tbr() {
        assert_eq!(parse_frame_rate("Video: flv1, 550x400, 12 tbr, 1k tbn"), Some(12));
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        assert_eq!(parse_frame_rate("Video: 1000 fps, 0 tbr"), None);
        assert_eq!(parse_frame_rate("Video: 1000 fps, 15 tbr"), Some(15));
        assert_eq!(parse_frame_rate("Video: 0.2 fps"), None);
        assert_eq!(parse_frame_rate("nothing here"), None);
        assert_eq!(parse_frame_rate("120 fps"), Some(120));
    }

    fn detector(engine: FakeEngine) -> FrameRateDetector<FakeEngine> {
        FrameRateDetector::new(Arc::new(engine), Duration::from_secs(30), 30)
    }

    #[tokio::test]
    async fn test_detect_from_stderr_despite_exit_code() {
        let engine = FakeEngine::new();
        engine
            .push(FakeRun::exit(1).with_stderr(SWF_DIAG.lines()))
            .await;

        let result = detector(engine).detect(Path::new("a.swf")).await;
        assert_eq!(result, FrameRateDetection { fps: 24, detected: true });
    }

    #[tokio::test]
    async fn test_detect_defaults_on_timeout() {
        let engine = FakeEngine::new();
        engine
            .push(
                FakeRun::exit(0)
                    .with_stderr(SWF_DIAG.lines())
                    .taking(Duration::from_secs(31)),
            )
            .await;

        let result = detector(engine).detect(Path::new("a.swf")).await;
        assert_eq!(result, FrameRateDetection { fps: 30, detected: false });
    }

    #[tokio::test]
    async fn test_detect_defaults_on_spawn_failure() {
        let engine = FakeEngine::new();
        engine.push(FakeRun::not_found()).await;

        let result = detector(engine).detect(Path::new("a.swf")).await;
        assert!(!result.detected);
        assert_eq!(result.fps, 30);
    }
}
