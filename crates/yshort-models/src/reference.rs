//! Video references and clip windows.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::utils::extract_video_id;

/// Where the source media for a request comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VideoReference {
    /// A video on the remote source, addressed by URL (or bare identifier).
    Remote { url: String },
    /// An object previously placed in storage (e.g. `gs://bucket/input/x.mp4`).
    Stored { handle: String },
}

impl VideoReference {
    pub fn remote(url: impl Into<String>) -> Self {
        Self::Remote { url: url.into() }
    }

    pub fn stored(handle: impl Into<String>) -> Self {
        Self::Stored { handle: handle.into() }
    }

    pub fn is_stored(&self) -> bool {
        matches!(self, VideoReference::Stored { .. })
    }

    /// Source video identifier, only meaningful for remote references.
    pub fn video_id(&self) -> Option<String> {
        match self {
            VideoReference::Remote { url } => Some(extract_video_id(url)),
            VideoReference::Stored { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            VideoReference::Remote { .. } => "remote",
            VideoReference::Stored { .. } => "stored",
        }
    }
}

/// Sub-range of the source media kept in the output clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClipWindow {
    /// Offset into the source, in seconds
    pub start_seconds: f64,
    /// Length of the clip, in seconds
    pub duration_seconds: f64,
}

impl Default for ClipWindow {
    fn default() -> Self {
        Self {
            start_seconds: 0.0,
            duration_seconds: 60.0,
        }
    }
}

impl ClipWindow {
    /// Build a window, rejecting negative starts and non-positive durations.
    pub fn new(start_seconds: f64, duration_seconds: f64) -> Result<Self, String> {
        if !start_seconds.is_finite() || start_seconds < 0.0 {
            return Err("start must be a non-negative number".to_string());
        }
        if !duration_seconds.is_finite() || duration_seconds <= 0.0 {
            return Err("duration must be a positive number".to_string());
        }
        Ok(Self {
            start_seconds,
            duration_seconds,
        })
    }
}
