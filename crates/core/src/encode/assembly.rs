//! Final video assembly from the canonical frame sequence.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::EncoderConfig;
use crate::engine::{Engine, Invocation, OutputLine};
use crate::manifest::{frame_index, ContentManifest};
use crate::pipeline::{EventSink, PipelineError, PipelineEvent};

/// Capacity of the live output channel.
const LINE_BUFFER: usize = 256;

/// Pads both dimensions up to the next even value, as yuv420p requires.
const EVEN_PAD_FILTER: &str = "pad=ceil(iw/2)*2:ceil(ih/2)*2";

/// Frame number from an encoder `-progress` line (`frame=123`).
pub fn parse_progress_frame(line: &str) -> Option<u64> {
    line.trim().strip_prefix("frame=")?.trim().parse().ok()
}

/// `-progress` emits `key=value` lines; everything else is diagnostics.
fn is_progress_key(line: &str) -> bool {
    match line.split_once('=') {
        Some((key, _)) => !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'),
        None => false,
    }
}

/// Result of a successful assembly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssemblyResult {
    pub output_path: PathBuf,
    pub output_size_bytes: u64,
    pub frame_count: usize,
    pub frame_rate: u32,
    /// Audio file muxed in, if any.
    pub audio_track: Option<PathBuf>,
    /// Length of the frame sequence at `frame_rate`.
    pub duration_secs: f64,
    pub elapsed_ms: u64,
}

/// Stitches a frame sequence and optional audio into a video.
pub struct AssemblyDriver<E: Engine> {
    engine: Arc<E>,
    config: EncoderConfig,
}

impl<E: Engine> AssemblyDriver<E> {
    pub fn new(engine: Arc<E>, config: EncoderConfig) -> Self {
        Self { engine, config }
    }

    /// Input pattern and start number for the frame sequence.
    ///
    /// Always a plain `%d.<ext>` pattern in the frames directory; prefixed
    /// numbering schemes are not reproduced.
    pub fn sequence_pattern(manifest: &ContentManifest) -> Option<(PathBuf, u64)> {
        let first = manifest.first_frame()?;
        let ext = manifest.frame_extension()?;
        let start = first
            .file_name()
            .and_then(|n| frame_index(&n.to_string_lossy()))
            .unwrap_or(0);
        Some((manifest.frames_dir.join(format!("%d.{}", ext)), start))
    }

    /// Builds encoder arguments for assembly.
    pub fn build_args(
        &self,
        pattern: &Path,
        start_number: u64,
        frame_rate: u32,
        audio: Option<&Path>,
        output_path: &Path,
    ) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            self.config.log_level.clone(),
            "-framerate".to_string(),
            frame_rate.to_string(),
            "-start_number".to_string(),
            start_number.to_string(),
            "-i".to_string(),
            pattern.to_string_lossy().to_string(),
        ];

        if let Some(audio) = audio {
            args.extend(["-i".to_string(), audio.to_string_lossy().to_string()]);
        }

        args.extend(["-map".to_string(), "0:v:0".to_string()]);
        if audio.is_some() {
            args.extend(["-map".to_string(), "1:a:0".to_string()]);
        }

        args.extend([
            "-vf".to_string(),
            EVEN_PAD_FILTER.to_string(),
            "-c:v".to_string(),
            self.config.video_codec.clone(),
            "-crf".to_string(),
            self.config.crf.to_string(),
            "-pix_fmt".to_string(),
            self.config.pixel_format.clone(),
        ]);

        // No -shortest: the output runs as long as the longer stream.
        if audio.is_some() {
            args.extend([
                "-c:a".to_string(),
                self.config.audio_codec.clone(),
                "-b:a".to_string(),
                format!("{}k", self.config.audio_bitrate_kbps),
            ]);
        }

        args.extend([
            "-progress".to_string(),
            "pipe:2".to_string(),
            "-nostats".to_string(),
            output_path.to_string_lossy().to_string(),
        ]);

        args
    }

    /// Creates and deletes a probe file to prove the destination is writable.
    pub async fn check_writable(dir: &Path) -> Result<(), PipelineError> {
        let not_writable = |e: std::io::Error| PipelineError::DestinationNotWritable {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        };

        tokio::fs::create_dir_all(dir).await.map_err(not_writable)?;
        let probe = dir.join(format!(".framereel-probe-{}", uuid::Uuid::new_v4()));
        tokio::fs::write(&probe, b"").await.map_err(not_writable)?;
        tokio::fs::remove_file(&probe).await.map_err(not_writable)?;
        Ok(())
    }

    /// Encodes the manifest's frames at `frame_rate` into `output_path`.
    ///
    /// Partial output is left in place on failure.
    pub async fn assemble(
        &self,
        manifest: &ContentManifest,
        frame_rate: u32,
        output_path: &Path,
        events: &EventSink,
    ) -> Result<AssemblyResult, PipelineError> {
        let start = Instant::now();

        let (pattern, start_number) = Self::sequence_pattern(manifest)
            .ok_or_else(|| PipelineError::assembly_failed("No frames to assemble", None))?;

        let dest_dir = match output_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self::check_writable(&dest_dir).await?;

        let audio = manifest.first_audio();
        let args = self.build_args(&pattern, start_number, frame_rate, audio, output_path);

        info!(
            frames = manifest.frame_count,
            fps = frame_rate,
            audio = ?audio,
            output = %output_path.display(),
            "Assembling video"
        );

        let total = manifest.frame_count as f64;
        let (tx, mut rx) = mpsc::channel::<OutputLine>(LINE_BUFFER);
        let forward = async {
            let mut last_percent = -1.0_f32;
            while let Some(line) = rx.recv().await {
                let percent = if line.text.trim() == "progress=end" {
                    Some(100.0)
                } else {
                    parse_progress_frame(&line.text)
                        .map(|frame| ((frame as f64 / total) * 100.0).min(100.0) as f32)
                };
                if let Some(percent) = percent {
                    if percent > last_percent {
                        last_percent = percent;
                        events.emit(PipelineEvent::AssemblyProgress { percent }).await;
                    }
                }
            }
        };

        let (result, ()) = tokio::join!(
            self.engine.run(Invocation::new(args), Some(tx)),
            forward
        );
        let output = result.map_err(|e| {
            if e.is_not_found() {
                PipelineError::tool_unavailable(self.engine.name(), e.to_string())
            } else {
                PipelineError::Engine(e)
            }
        })?;

        if !output.success() {
            let diagnostics: Vec<&str> = output
                .stderr
                .iter()
                .map(String::as_str)
                .filter(|l| !is_progress_key(l))
                .collect();
            return Err(PipelineError::assembly_failed(
                format!("Encoder exited with code: {:?}", output.exit_code()),
                (!diagnostics.is_empty()).then(|| diagnostics.join("\n")),
            ));
        }

        let output_size_bytes = match tokio::fs::metadata(output_path).await {
            Ok(meta) if meta.len() > 0 => meta.len(),
            _ => {
                return Err(PipelineError::assembly_failed(
                    "Output file not created",
                    output.stderr_text(),
                ))
            }
        };

        debug!(bytes = output_size_bytes, "Assembly finished");

        Ok(AssemblyResult {
            output_path: output_path.to_path_buf(),
            output_size_bytes,
            frame_count: manifest.frame_count,
            frame_rate,
            audio_track: audio.map(Path::to_path_buf),
            duration_secs: manifest.frame_count as f64 / frame_rate.max(1) as f64,
            elapsed_ms: start.elapsed().as_millis() as u64,
        })
    }
}
