//! Pipeline coordinator for extraction and conversion requests.
//!
//! A conversion walks the states
//! `RateDetecting -> Extracting -> AudioFallback -> Reconciling -> Assembling -> CleaningUp -> Done`,
//! with `Errored` reachable from every step. Audio fallback failures never
//! lead to `Errored`; they are reported as warnings.
//!
//! # Example
//!
//! ```ignore
//! use framereel_core::pipeline::{ConversionRequest, Pipeline};
//!
//! let pipeline = Pipeline::new(config, decompiler, encoder);
//! let (tx, mut rx) = tokio::sync::mpsc::channel(100);
//! tokio::spawn(async move {
//!     while let Some(event) = rx.recv().await {
//!         println!("{:?}", event);
//!     }
//! });
//!
//! let outcome = pipeline
//!     .convert(&ConversionRequest::new("intro.swf", "intro.mp4"), Some(tx))
//!     .await?;
//! println!("{} frames at {} fps", outcome.frame_count, outcome.frame_rate);
//! ```

mod cleanup;
mod coordinator;
mod error;
mod events;
mod types;

pub use cleanup::remove_tree;
pub use coordinator::{Pipeline, WORK_DIR_MARKER};
pub use error::PipelineError;
pub use events::{EventSink, PipelineEvent};
pub use types::{
    ConversionOutcome, ConversionRequest, ExtractionOutcome, PipelineState, PipelineWarning,
};
