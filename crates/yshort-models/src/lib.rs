//! Shared data models for the YShort clip service.
//!
//! This crate provides Serde-serializable types for:
//! - Video references and clip windows
//! - Conversion requests and their validation
//! - Pipeline progress events and terminal results
//! - Source client profiles and quality tiers

pub mod event;
pub mod profile;
pub mod reference;
pub mod request;
pub mod utils;

// Re-export common types
pub use event::{PipelineEvent, PipelineResult, ProgressEvent};
pub use profile::{ClientProfile, DeviceCategory, Quality, PROFILE_ROTATION};
pub use reference::{ClipWindow, VideoReference};
pub use request::{ClipJob, ConvertRequest};
pub use utils::{extract_video_id, sanitize_title, truncate_title, DEFAULT_TITLE};
