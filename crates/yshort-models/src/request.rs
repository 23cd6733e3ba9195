//! Inbound conversion requests.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::reference::{ClipWindow, VideoReference};

fn default_duration() -> f64 {
    60.0
}

/// Body of a conversion request.
///
/// Exactly one of `url` / `gcs_input_path` must be present.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConvertRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub gcs_input_path: Option<String>,
    #[serde(default)]
    pub start: f64,
    #[serde(default = "default_duration")]
    pub duration: f64,
    #[serde(default)]
    pub stream: bool,
}

/// A validated conversion job, ready for the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipJob {
    pub reference: VideoReference,
    pub window: ClipWindow,
    /// Whether the caller wants a live progress stream
    pub stream: bool,
}

impl ConvertRequest {
    /// Validate the request and turn it into a job.
    pub fn into_job(self) -> Result<ClipJob, String> {
        let url = non_blank(self.url);
        let handle = non_blank(self.gcs_input_path);

        let reference = match (url, handle) {
            (Some(url), None) => VideoReference::remote(url),
            (None, Some(handle)) => VideoReference::stored(handle),
            (None, None) => return Err("Missing url or gcsInputPath parameter".to_string()),
            (Some(_), Some(_)) => {
                return Err("Provide either url or gcsInputPath, not both".to_string())
            }
        };

        let window = ClipWindow::new(self.start, self.duration)?;

        Ok(ClipJob {
            reference,
            window,
            stream: self.stream,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
