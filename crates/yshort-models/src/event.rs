//! Pipeline progress events and terminal results.
//!
//! These are the exact JSON shapes written to callers, both as the single
//! response body and as NDJSON stream records.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Incremental progress update (0-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProgressEvent {
    pub progress: u8,
}

/// Terminal outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PipelineResult {
    pub fn success(download_url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            success: true,
            download_url: Some(download_url.into()),
            title: Some(title.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            download_url: None,
            title: None,
            error: Some(error.into()),
        }
    }
}

/// One record on the progress stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum PipelineEvent {
    Progress(ProgressEvent),
    Finished(PipelineResult),
}

impl PipelineEvent {
    pub fn progress(value: u8) -> Self {
        PipelineEvent::Progress(ProgressEvent { progress: value })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineEvent::Finished(_))
    }

    /// Serialize as a single NDJSON line (trailing newline included).
    pub fn to_ndjson_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}
