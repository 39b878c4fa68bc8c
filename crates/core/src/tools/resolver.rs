//! Platform-aware lookup of the encoder and decompiler executables.

use std::path::{Path, PathBuf};
use tracing::debug;

use super::capability::ToolStatus;

/// Base name of the encoder executable.
pub const ENCODER_TOOL: &str = "ffmpeg";

/// Base name of the sibling analysis tool.
pub const ANALYZER_TOOL: &str = "ffprobe";

/// Lookup results for the encoder and its analysis sibling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderBinaries {
    pub ffmpeg: ToolStatus,
    pub ffprobe: ToolStatus,
}

/// Adds the platform executable suffix (`.exe` on Windows).
pub fn executable_name(base: &str) -> String {
    format!("{}{}", base, std::env::consts::EXE_SUFFIX)
}

/// Looks for a tool at a configured location.
///
/// The location may name the executable (with or without the platform
/// suffix) or a directory holding it directly or under `bin/`.
fn find_configured(configured: &Path, base: &str) -> Option<PathBuf> {
    let exe = executable_name(base);

    let candidates = if configured.is_dir() {
        vec![configured.join(&exe), configured.join("bin").join(&exe)]
    } else {
        let mut candidates = vec![configured.to_path_buf()];
        let suffix = std::env::consts::EXE_SUFFIX;
        if !suffix.is_empty() && !configured.to_string_lossy().ends_with(suffix) {
            let mut with_suffix = configured.as_os_str().to_owned();
            with_suffix.push(suffix);
            candidates.push(PathBuf::from(with_suffix));
        }
        candidates
    };

    candidates.into_iter().find(|p| p.is_file())
}

fn find_on_path(base: &str) -> Result<PathBuf, String> {
    which::which(base).map_err(|e| format!("{} not found on PATH: {}", base, e))
}

/// Resolves the encoder and the analysis tool next to it.
pub fn resolve_encoder(configured: Option<&Path>) -> EncoderBinaries {
    let ffmpeg = match configured.and_then(|c| find_configured(c, ENCODER_TOOL)) {
        Some(path) => ToolStatus::Available(path),
        None => {
            if let Some(c) = configured {
                debug!(path = %c.display(), "Configured encoder path not usable, searching PATH");
            }
            match find_on_path(ENCODER_TOOL) {
                Ok(path) => ToolStatus::Available(path),
                Err(reason) => ToolStatus::unavailable(ENCODER_TOOL, reason),
            }
        }
    };

    let sibling = ffmpeg
        .path()
        .and_then(Path::parent)
        .map(|dir| dir.join(executable_name(ANALYZER_TOOL)))
        .filter(|p| p.is_file());

    let ffprobe = match sibling {
        Some(path) => ToolStatus::Available(path),
        None => match find_on_path(ANALYZER_TOOL) {
            Ok(path) => ToolStatus::Available(path),
            Err(reason) => ToolStatus::unavailable(ANALYZER_TOOL, reason),
        },
    };

    EncoderBinaries { ffmpeg, ffprobe }
}

/// Resolves the decompiler runtime and checks its archive is present.
pub fn resolve_decompiler(runtime: &Path, archive: &Path) -> ToolStatus {
    let runtime_name = runtime.to_string_lossy().to_string();

    if !archive.is_file() {
        return ToolStatus::unavailable(
            "decompiler",
            format!("decompiler archive not found: {}", archive.display()),
        );
    }

    let has_dir = runtime.components().count() > 1;
    let resolved = if has_dir {
        let base = runtime
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        find_configured(runtime, &base)
            .ok_or_else(|| format!("runtime not found: {}", runtime.display()))
    } else {
        find_on_path(&runtime_name)
    };

    match resolved {
        Ok(path) => ToolStatus::Available(path),
        Err(reason) => ToolStatus::unavailable(runtime_name, reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_find_configured_file() {
        let dir = TempDir::new().unwrap();
        let exe = dir.path().join(executable_name("ffmpeg"));
        touch(&exe);

        assert_eq!(find_configured(&exe, ENCODER_TOOL), Some(exe));
    }

    #[test]
    fn test_find_configured_directory_with_bin() {
        let dir = TempDir::new().unwrap();
        let exe = dir.path().join("bin").join(executable_name("ffmpeg"));
        touch(&exe);

        assert_eq!(find_configured(dir.path(), ENCODER_TOOL), Some(exe));
    }

    #[test]
    fn test_find_configured_missing() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            find_configured(&dir.path().join("nope"), ENCODER_TOOL),
            None
        );
    }

    #[test]
    fn test_resolve_encoder_prefers_sibling_analyzer() {
        let dir = TempDir::new().unwrap();
        let ffmpeg = dir.path().join(executable_name("ffmpeg"));
        let ffprobe = dir.path().join(executable_name("ffprobe"));
        touch(&ffmpeg);
        touch(&ffprobe);

        let bins = resolve_encoder(Some(dir.path()));
        assert_eq!(bins.ffmpeg, ToolStatus::Available(ffmpeg));
        assert_eq!(bins.ffprobe, ToolStatus::Available(ffprobe));
    }

    #[test]
    fn test_resolve_decompiler_missing_archive() {
        let dir = TempDir::new().unwrap();
        let status = resolve_decompiler(Path::new("java"), &dir.path().join("ffdec.jar"));
        match status {
            ToolStatus::Unavailable { tool, reason } => {
                assert_eq!(tool, "decompiler");
                assert!(reason.contains("ffdec.jar"));
            }
            other => panic!("expected unavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_decompiler_explicit_runtime() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("ffdec.jar");
        let runtime = dir.path().join("jre").join("java");
        touch(&archive);
        touch(&runtime);

        assert_eq!(
            resolve_decompiler(&runtime, &archive),
            ToolStatus::Available(runtime)
        );
    }
}
