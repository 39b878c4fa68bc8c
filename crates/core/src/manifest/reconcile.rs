//! Layout selection and ordering.

use std::cmp::Ordering;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::types::{
    ContentManifest, FrameLayout, AUDIO_EXTENSIONS, FRAMES_DIR, FRAME_EXTENSIONS, SOUNDS_DIR,
};

/// Builds the canonical manifest for an output directory.
///
/// Reads only; calling it repeatedly on an unchanged tree yields identical
/// manifests. The root layout wins when both candidates hold the same number
/// of frames, including when both are empty. Missing directories count as
/// empty.
pub fn reconcile(output_dir: &Path) -> io::Result<ContentManifest> {
    let sub_dir = output_dir.join(FRAMES_DIR);
    let sub_frames = list_files(&sub_dir, FRAME_EXTENSIONS)?;
    let root_frames = list_files(output_dir, FRAME_EXTENSIONS)?;

    let (frames_dir, layout, mut frames) = if sub_frames.len() > root_frames.len() {
        (sub_dir, FrameLayout::Subdirectory, sub_frames)
    } else {
        (output_dir.to_path_buf(), FrameLayout::Root, root_frames)
    };
    sort_by_frame_index(&mut frames);

    let mut audio = list_files(&output_dir.join(SOUNDS_DIR), AUDIO_EXTENSIONS)?;
    sort_by_frame_index(&mut audio);

    debug!(
        dir = %output_dir.display(),
        ?layout,
        frames = frames.len(),
        audio = audio.len(),
        "Reconciled extracted content"
    );

    Ok(ContentManifest {
        frames_dir,
        layout,
        frame_count: frames.len(),
        frames,
        audio,
    })
}

/// Regular files in `dir` whose extension is in `extensions` (case-insensitive).
fn list_files(dir: &Path, extensions: &[&str]) -> io::Result<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        let recognized = path
            .extension()
            .map(|ext| {
                let ext = ext.to_string_lossy().to_lowercase();
                extensions.contains(&ext.as_str())
            })
            .unwrap_or(false);
        if recognized {
            files.push(path);
        }
    }
    Ok(files)
}

fn sort_by_frame_index(paths: &mut [PathBuf]) {
    paths.sort_by(|a, b| compare_frame_names(&file_name(a), &file_name(b)));
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// First run of ASCII digits in a name, with leading zeros stripped.
fn digit_run(name: &str) -> Option<&str> {
    let start = name.find(|c: char| c.is_ascii_digit())?;
    let rest = &name[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = rest[..end].trim_start_matches('0');
    Some(if digits.is_empty() { "0" } else { digits })
}

/// Numeric value of the first digit run, if it fits in a `u64`.
pub fn frame_index(name: &str) -> Option<u64> {
    digit_run(name).and_then(|d| d.parse().ok())
}

/// Orders names by their first digit run, numerically.
///
/// Names with digits come before names without; ties and digit-free names
/// fall back to plain string order. Runs are compared by length then text,
/// so arbitrarily long numbers never overflow.
pub fn compare_frame_names(a: &str, b: &str) -> Ordering {
    match (digit_run(a), digit_run(b)) {
        (Some(x), Some(y)) => x
            .len()
            .cmp(&y.len())
            .then_with(|| x.cmp(y))
            .then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, b"x").unwrap();
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths.iter().map(|p| file_name(p)).collect()
    }

    #[test]
    fn test_numeric_ordering() {
        let dir = TempDir::new().unwrap();
        for i in [10, 2, 1, 33, 3, 20] {
            touch(&dir.path().join(FRAMES_DIR).join(format!("{}.png", i)));
        }

        let manifest = reconcile(dir.path()).unwrap();
        assert_eq!(manifest.layout, FrameLayout::Subdirectory);
        assert_eq!(
            names(&manifest.frames),
            vec!["1.png", "2.png", "3.png", "10.png", "20.png", "33.png"]
        );
        assert_eq!(manifest.frame_count, 6);
        assert_eq!(manifest.frames_dir, dir.path().join(FRAMES_DIR));
    }

    #[test]
    fn test_larger_layout_wins() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join(FRAMES_DIR).join("1.png"));
        for i in 1..=3 {
            touch(&dir.path().join(format!("{}.png", i)));
        }

        let manifest = reconcile(dir.path()).unwrap();
        assert_eq!(manifest.layout, FrameLayout::Root);
        assert_eq!(manifest.frame_count, 3);
    }

    #[test]
    fn test_tie_favors_root() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join(FRAMES_DIR).join("1.png"));
        touch(&dir.path().join(FRAMES_DIR).join("2.png"));
        touch(&dir.path().join("1.png"));
        touch(&dir.path().join("2.png"));

        let manifest = reconcile(dir.path()).unwrap();
        assert_eq!(manifest.layout, FrameLayout::Root);
        assert_eq!(manifest.frames_dir, dir.path());
    }

    #[test]
    fn test_empty_and_missing_directories() {
        let dir = TempDir::new().unwrap();
        let manifest = reconcile(&dir.path().join("never-created")).unwrap();
        assert!(manifest.is_empty());
        assert_eq!(manifest.layout, FrameLayout::Root);
        assert!(manifest.audio.is_empty());
    }

    #[test]
    fn test_ignores_directories_and_unknown_extensions() {
        let dir = TempDir::new().unwrap();
        let frames = dir.path().join(FRAMES_DIR);
        std::fs::create_dir_all(frames.join("1")).unwrap();
        std::fs::create_dir_all(frames.join("2.png")).unwrap();
        touch(&frames.join("1.PNG"));
        touch(&frames.join("notes.txt"));
        touch(&frames.join("2.svg"));

        let manifest = reconcile(dir.path()).unwrap();
        assert_eq!(names(&manifest.frames), vec!["1.PNG"]);
    }

    #[test]
    fn test_collects_audio() {
        let dir = TempDir::new().unwrap();
        let sounds = dir.path().join(SOUNDS_DIR);
        touch(&sounds.join("12_music.mp3"));
        touch(&sounds.join("0.mp3"));
        touch(&sounds.join("3_click.wav"));
        touch(&sounds.join("stream.flv"));
        touch(&sounds.join("cover.jpg"));

        let manifest = reconcile(dir.path()).unwrap();
        assert_eq!(
            names(&manifest.audio),
            vec!["0.mp3", "3_click.wav", "12_music.mp3", "stream.flv"]
        );
    }

    #[test]
    fn test_idempotent() {
        let dir = TempDir::new().unwrap();
        for i in (1..=25).rev() {
            touch(&dir.path().join(FRAMES_DIR).join(format!("{}.png", i)));
        }
        touch(&dir.path().join(SOUNDS_DIR).join("0.mp3"));

        let first = reconcile(dir.path()).unwrap();
        let second = reconcile(dir.path()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_compare_frame_names() {
        assert_eq!(compare_frame_names("frame2.png", "frame10.png"), Ordering::Less);
        assert_eq!(compare_frame_names("007.png", "7.png"), Ordering::Less);
        assert_eq!(compare_frame_names("9.png", "cover.png"), Ordering::Less);
        assert_eq!(compare_frame_names("b.png", "a.png"), Ordering::Greater);
        assert_eq!(
            compare_frame_names("123456789012345678901234567890.png", "99.png"),
            Ordering::Greater
        );
    }

    #[test]
    fn test_frame_index() {
        assert_eq!(frame_index("1.png"), Some(1));
        assert_eq!(frame_index("frame_0042.png"), Some(42));
        assert_eq!(frame_index("000.png"), Some(0));
        assert_eq!(frame_index("cover.png"), None);
    }
}
