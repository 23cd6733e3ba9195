//! Error types for media operations.

use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during acquisition and transcoding.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("yt-dlp not found in PATH")]
    YtDlpNotFound,

    #[error("FFmpeg exited {}: {stderr_tail}", describe_exit(.exit_code))]
    FfmpegFailed {
        exit_code: Option<i32>,
        stderr_tail: String,
    },

    #[error("Download failed: {message}")]
    DownloadFailed { message: String },

    #[error("Metadata unavailable: {0}")]
    MetadataUnavailable(String),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "by signal".to_string(),
    }
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(exit_code: Option<i32>, stderr_tail: impl Into<String>) -> Self {
        Self::FfmpegFailed {
            exit_code,
            stderr_tail: stderr_tail.into(),
        }
    }

    /// Create a download failure error.
    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
        }
    }

    /// Create a metadata failure error.
    pub fn metadata_unavailable(message: impl Into<String>) -> Self {
        Self::MetadataUnavailable(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
