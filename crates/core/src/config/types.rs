use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Frame rate used when neither the caller nor detection supplies one.
pub const DEFAULT_FRAME_RATE: u32 = 30;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub decompiler: DecompilerConfig,
    #[serde(default)]
    pub encoder: EncoderConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Decompiler engine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DecompilerConfig {
    /// Java runtime used to launch the archive.
    #[serde(default = "default_runtime_path")]
    pub runtime_path: PathBuf,
    /// Decompiler archive passed to `-jar`.
    #[serde(default = "default_archive_path")]
    pub archive_path: PathBuf,
    /// Stderr fragments (case-insensitive) that mark a fatal error.
    #[serde(default = "default_fatal_patterns")]
    pub fatal_patterns: Vec<String>,
    /// Seconds between the termination signal and the forced kill.
    #[serde(default = "default_kill_grace")]
    pub kill_grace_secs: u64,
    /// Numbered frame subdirectories created before launch.
    #[serde(default = "default_prealloc_frame_dirs")]
    pub prealloc_frame_dirs: u32,
}

impl Default for DecompilerConfig {
    fn default() -> Self {
        Self {
            runtime_path: default_runtime_path(),
            archive_path: default_archive_path(),
            fatal_patterns: default_fatal_patterns(),
            kill_grace_secs: default_kill_grace(),
            prealloc_frame_dirs: default_prealloc_frame_dirs(),
        }
    }
}

impl DecompilerConfig {
    pub fn kill_grace(&self) -> Duration {
        Duration::from_secs(self.kill_grace_secs)
    }
}

fn default_runtime_path() -> PathBuf {
    PathBuf::from("java")
}

fn default_archive_path() -> PathBuf {
    PathBuf::from("ffdec.jar")
}

fn default_fatal_patterns() -> Vec<String> {
    vec![
        "input file does not exist".to_string(),
        "bad command-line arguments".to_string(),
        "bad commandline arguments".to_string(),
    ]
}

fn default_kill_grace() -> u64 {
    5
}

fn default_prealloc_frame_dirs() -> u32 {
    10
}

/// Encoder engine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EncoderConfig {
    /// Encoder executable or a directory holding it. Searched on PATH when unset.
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,
    #[serde(default = "default_video_codec")]
    pub video_codec: String,
    /// Constant rate factor for the video codec.
    #[serde(default = "default_crf")]
    pub crf: u8,
    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate_kbps: u32,
    /// Encoder log level (quiet, panic, fatal, error, warning, info, verbose, debug).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Bound on the frame-rate analysis run.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            video_codec: default_video_codec(),
            crf: default_crf(),
            pixel_format: default_pixel_format(),
            audio_codec: default_audio_codec(),
            audio_bitrate_kbps: default_audio_bitrate(),
            log_level: default_log_level(),
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}

impl EncoderConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

fn default_video_codec() -> String {
    "libx264".to_string()
}

fn default_crf() -> u8 {
    23
}

fn default_pixel_format() -> String {
    "yuv420p".to_string()
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

fn default_audio_bitrate() -> u32 {
    192
}

fn default_log_level() -> String {
    "warning".to_string()
}

fn default_probe_timeout() -> u64 {
    30
}

/// Pipeline behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Frame rate treated as "no explicit preference".
    #[serde(default = "default_frame_rate")]
    pub default_frame_rate: u32,
    /// Keep the working directory after conversion.
    #[serde(default)]
    pub keep_intermediate: bool,
    /// Replaces the size-derived decompiler timeout.
    #[serde(default)]
    pub timeout_override_minutes: Option<f64>,
    /// Parent of per-source working directories. Defaults to the destination's directory.
    #[serde(default)]
    pub work_dir: Option<PathBuf>,
    /// Exports only the first N frames.
    #[serde(default)]
    pub test_frame_cap: Option<u32>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_frame_rate: default_frame_rate(),
            keep_intermediate: false,
            timeout_override_minutes: None,
            work_dir: None,
            test_frame_cap: None,
        }
    }
}

fn default_frame_rate() -> u32 {
    DEFAULT_FRAME_RATE
}
