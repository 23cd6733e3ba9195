//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory for per-run scratch files
    pub scratch_dir: PathBuf,
    /// Lifetime of a cached source client
    pub client_max_age: Duration,
    /// Validity of signed download URLs
    pub signed_url_ttl: Duration,
    /// Optional hard limit on a single transcode
    pub transcode_timeout_secs: Option<u64>,
    /// Key prefix for published clips
    pub output_prefix: String,
    /// Key prefix for staged inputs
    pub input_prefix: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scratch_dir: std::env::temp_dir().join("yshort"),
            client_max_age: Duration::from_secs(300), // 5 minutes
            signed_url_ttl: Duration::from_secs(24 * 60 * 60),
            transcode_timeout_secs: None,
            output_prefix: "shorts".to_string(),
            input_prefix: "input".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            scratch_dir: std::env::var("SCRATCH_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.scratch_dir),
            client_max_age: Duration::from_secs(
                std::env::var("CLIENT_MAX_AGE_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            signed_url_ttl: Duration::from_secs(
                std::env::var("SIGNED_URL_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(86400),
            ),
            transcode_timeout_secs: std::env::var("TRANSCODE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|secs: &u64| *secs > 0),
            output_prefix: std::env::var("OUTPUT_PREFIX").unwrap_or(defaults.output_prefix),
            input_prefix: std::env::var("INPUT_PREFIX").unwrap_or(defaults.input_prefix),
        }
    }
}
