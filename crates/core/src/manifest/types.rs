//! Types for the content manifest.

use serde::Serialize;
use std::path::{Path, PathBuf};

/// Subdirectory the decompiler exports frames into.
pub const FRAMES_DIR: &str = "frames";

/// Subdirectory holding audio assets.
pub const SOUNDS_DIR: &str = "sounds";

/// Name of the passthrough audio file inside [`SOUNDS_DIR`].
pub const FALLBACK_AUDIO_FILE: &str = "0.mp3";

/// Extensions recognized as frame images (lowercase).
pub const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Extensions recognized as audio assets (lowercase).
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flv"];

/// Which candidate layout the frames were taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameLayout {
    /// `<out>/frames/*.png`
    Subdirectory,
    /// `<out>/*.png`
    Root,
}

/// Reconciled frames and audio for one output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentManifest {
    /// Directory the frames were read from.
    pub frames_dir: PathBuf,
    pub layout: FrameLayout,
    /// Frame files in numeric order.
    pub frames: Vec<PathBuf>,
    /// Audio files in numeric order.
    pub audio: Vec<PathBuf>,
    pub frame_count: usize,
}

impl ContentManifest {
    pub fn is_empty(&self) -> bool {
        self.frame_count == 0
    }

    pub fn first_frame(&self) -> Option<&Path> {
        self.frames.first().map(PathBuf::as_path)
    }

    pub fn first_audio(&self) -> Option<&Path> {
        self.audio.first().map(PathBuf::as_path)
    }

    /// Lowercased extension of the first frame.
    pub fn frame_extension(&self) -> Option<String> {
        self.first_frame()
            .and_then(Path::extension)
            .map(|e| e.to_string_lossy().to_lowercase())
    }
}
