//! Application state.

use std::sync::Arc;

use yshort_media::{FfmpegTranscoder, SourceClientPool, YtDlpConfig, YtDlpFactory};
use yshort_pipeline::{ClipPipeline, PipelineConfig};
use yshort_storage::ObjectStore;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Arc<ClipPipeline>,
}

impl AppState {
    /// Create new application state from the environment.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let store = yshort_storage::connect_from_env().await?;
        let pipeline_config = PipelineConfig::from_env();

        let factory = YtDlpFactory::new(YtDlpConfig::from_env());
        let pool = SourceClientPool::with_max_age(Arc::new(factory), pipeline_config.client_max_age);
        let transcoder =
            FfmpegTranscoder::new().with_timeout(pipeline_config.transcode_timeout_secs);

        let pipeline = ClipPipeline::new(pipeline_config, Arc::new(pool), store, Arc::new(transcoder));
        Ok(Self::with_pipeline(config, Arc::new(pipeline)))
    }

    /// State around an already-built pipeline.
    pub fn with_pipeline(config: ApiConfig, pipeline: Arc<ClipPipeline>) -> Self {
        Self { config, pipeline }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        self.pipeline.store()
    }
}
