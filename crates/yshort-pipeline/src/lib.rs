//! Clip conversion pipeline.
//!
//! This crate provides:
//! - Media acquisition with client-profile fallback or from storage
//! - Transcoding through the media crate's [`yshort_media::Transcoder`]
//! - Publishing with signed download URLs
//! - Monotonic progress reporting and per-run scratch cleanup

pub mod acquirer;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod progress;
pub mod publisher;
pub mod scratch;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use acquirer::{Acquired, Acquirer};
pub use config::PipelineConfig;
pub use error::{PipelineError, StageResult};
pub use logging::RunLogger;
pub use pipeline::{ClipPipeline, PipelineStage};
pub use progress::ProgressReporter;
pub use publisher::Publisher;
pub use scratch::ScratchSpace;
