//! Testing utilities and fake engines.
//!
//! [`FakeEngine`] stands in for the decompiler and the encoder so the whole
//! pipeline can be exercised without either being installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use framereel_core::testing::{FakeEngine, FakeRun};
//!
//! let decompiler = FakeEngine::named("decompiler");
//! decompiler
//!     .push(FakeRun::exit(0).with_stdout(["Exporting frame 1/1"]))
//!     .await;
//!
//! // Hand a clone to the pipeline, keep this one for assertions.
//! let recorded = decompiler.invocations().await;
//! ```

mod fake_engine;

pub use fake_engine::{FakeEngine, FakeRun};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::{Path, PathBuf};

    use crate::manifest::{FRAMES_DIR, SOUNDS_DIR};

    /// Writes a source file of `bytes` length.
    pub fn source_file(dir: &Path, name: &str, bytes: usize) -> std::io::Result<PathBuf> {
        let path = dir.join(name);
        std::fs::write(&path, vec![0u8; bytes])?;
        Ok(path)
    }

    /// Writes `count` numbered frames into `<output_dir>/frames`.
    pub fn write_frames(output_dir: &Path, count: usize) -> std::io::Result<()> {
        let frames = output_dir.join(FRAMES_DIR);
        std::fs::create_dir_all(&frames)?;
        for i in 1..=count {
            std::fs::write(frames.join(format!("{}.png", i)), b"png")?;
        }
        Ok(())
    }

    /// Writes one audio file into `<output_dir>/sounds`.
    pub fn write_sound(output_dir: &Path, name: &str) -> std::io::Result<()> {
        let sounds = output_dir.join(SOUNDS_DIR);
        std::fs::create_dir_all(&sounds)?;
        std::fs::write(sounds.join(name), b"audio")
    }

    /// Output directory of a decompiler invocation (`... <out> <source>`).
    pub fn decompiler_output_dir(args: &[String]) -> PathBuf {
        PathBuf::from(&args[args.len() - 2])
    }
}
