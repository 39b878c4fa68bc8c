//! Encoder-driven steps: frame-rate analysis and final video assembly.
//!
//! # Example
//!
//! ```ignore
//! use framereel_core::encode::{AssemblyDriver, FrameRateDetector};
//!
//! let detector = FrameRateDetector::new(Arc::clone(&ffmpeg), Duration::from_secs(30), 30);
//! let rate = detector.detect(Path::new("movie.swf")).await;
//!
//! let driver = AssemblyDriver::new(ffmpeg, EncoderConfig::default());
//! let result = driver
//!     .assemble(&manifest, rate.fps, Path::new("movie.mp4"), &EventSink::none())
//!     .await?;
//! println!("{} frames, {:.2}s", result.frame_count, result.duration_secs);
//! ```

mod assembly;
mod frame_rate;

pub use assembly::{parse_progress_frame, AssemblyDriver, AssemblyResult};
pub use frame_rate::{parse_frame_rate, FrameRateDetection, FrameRateDetector, MAX_FRAME_RATE};
