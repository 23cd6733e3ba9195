//! Pipeline error types.

use thiserror::Error;
use yshort_media::MediaError;
use yshort_storage::StorageError;

pub type StageResult<T> = Result<T, PipelineError>;

/// Failure of one pipeline stage.
///
/// Media and storage errors are transparent so callers see the
/// underlying message unchanged.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Scratch space error: {0}")]
    Scratch(#[from] std::io::Error),

    #[error("No source profile could serve the video")]
    NoProfiles,
}

impl PipelineError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Media(_) => "media",
            PipelineError::Storage(_) => "storage",
            PipelineError::Scratch(_) => "scratch",
            PipelineError::NoProfiles => "no_profiles",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_transparent() {
        let err: PipelineError = MediaError::download_failed("blocked").into();
        assert_eq!(err.to_string(), "Download failed: blocked");
        assert_eq!(err.kind(), "media");

        let err: PipelineError = StorageError::upload_failed("denied").into();
        assert_eq!(err.to_string(), "Upload failed: denied");
    }
}
