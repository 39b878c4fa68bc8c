//! Process-boundary abstraction over the external engines.
//!
//! Both the decompiler and the encoder are driven through the [`Engine`]
//! trait. The real implementation, [`ProcessEngine`], spawns a child process,
//! streams its output line by line and enforces an optional deadline with an
//! escalating termination sequence (graceful signal, then forced kill).
//!
//! # Example
//!
//! ```ignore
//! use framereel_core::engine::{Engine, Invocation, ProcessEngine};
//!
//! let ffmpeg = ProcessEngine::new("ffmpeg", "/usr/bin/ffmpeg");
//! let output = ffmpeg
//!     .run(Invocation::new(["-hide_banner", "-i", "movie.swf"]), None)
//!     .await?;
//! println!("stderr lines: {}", output.stderr.len());
//! ```

mod error;
mod process;
mod termination;
mod traits;
mod types;

pub use error::EngineError;
pub use process::ProcessEngine;
pub use termination::{SupervisorAction, SupervisorEvent, TerminationStage};
pub use traits::Engine;
pub use types::{EngineOutput, Invocation, OutputLine, OutputStream, RunOutcome};
