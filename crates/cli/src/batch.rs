//! Input discovery and output naming for batch conversions.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extension of convertible sources.
pub const SOURCE_EXTENSION: &str = "swf";

/// Extension of produced videos.
pub const OUTPUT_EXTENSION: &str = "mp4";

fn is_source(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case(SOURCE_EXTENSION))
        .unwrap_or(false)
}

/// Expands inputs into source files.
///
/// Files are taken as given. Directories contribute their `.swf` files,
/// and those of subdirectories when `recursive` is set. Order is stable:
/// inputs in the order given, directory contents sorted by path.
pub fn collect_inputs(inputs: &[PathBuf], recursive: bool) -> Vec<PathBuf> {
    let mut sources = Vec::new();

    for input in inputs {
        if !input.is_dir() {
            sources.push(input.clone());
            continue;
        }

        let max_depth = if recursive { usize::MAX } else { 1 };
        let mut found: Vec<PathBuf> = WalkDir::new(input)
            .max_depth(max_depth)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_source(e.path()))
            .map(|e| e.into_path())
            .collect();
        found.sort();
        sources.extend(found);
    }

    sources
}

/// Destination video for a source: `<stem>.mp4` in `output_dir`, or beside
/// the source.
pub fn destination_for(source: &Path, output_dir: Option<&Path>) -> PathBuf {
    let dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => source
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    let name = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    dir.join(format!("{}.{}", name, OUTPUT_EXTENSION))
}

/// Tally of a batch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn record(&mut self, ok: bool) {
        if ok {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}
