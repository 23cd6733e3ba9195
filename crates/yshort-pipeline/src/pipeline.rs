//! The acquire → transcode → publish orchestrator.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::Instrument;

use yshort_media::{SourceClientPool, SourceStream, Transcoder, VideoInfo};
use yshort_models::{ClipJob, PipelineResult, Quality, VideoReference};
use yshort_storage::ObjectStore;

use crate::acquirer::Acquirer;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, StageResult};
use crate::logging::RunLogger;
use crate::metrics;
use crate::progress::ProgressReporter;
use crate::publisher::Publisher;
use crate::scratch::ScratchSpace;

/// Progress right before the clip is uploaded.
pub const UPLOAD_STARTED: u8 = 90;
/// Progress once the run has succeeded.
pub const COMPLETE: u8 = 100;

/// Lifecycle of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    Acquiring,
    Transcoding,
    Uploading,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Acquiring => "acquiring",
            PipelineStage::Transcoding => "transcoding",
            PipelineStage::Uploading => "uploading",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Published {
    download_url: String,
    title: String,
}

/// Shared, per-process pipeline. Each call to [`ClipPipeline::run`] is an
/// independent run with its own scratch files.
pub struct ClipPipeline {
    acquirer: Acquirer,
    transcoder: Arc<dyn Transcoder>,
    publisher: Publisher,
    store: Arc<dyn ObjectStore>,
    config: PipelineConfig,
}

impl ClipPipeline {
    pub fn new(
        config: PipelineConfig,
        pool: Arc<SourceClientPool>,
        store: Arc<dyn ObjectStore>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        Self {
            acquirer: Acquirer::new(pool, Arc::clone(&store), config.input_prefix.clone()),
            transcoder,
            publisher: Publisher::new(
                Arc::clone(&store),
                config.output_prefix.clone(),
                config.signed_url_ttl,
            ),
            store,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Run one conversion. Never fails: stage errors become a failure result.
    ///
    /// Progress goes to `progress`; the terminal result is returned and is
    /// not sent, so the caller decides how to deliver it.
    pub async fn run(&self, job: &ClipJob, progress: &ProgressReporter) -> PipelineResult {
        let logger = RunLogger::new("convert");
        let span = logger.create_span();
        self.run_logged(job, progress, &logger).instrument(span).await
    }

    /// Same as [`ClipPipeline::run`], logged under a caller-supplied run id
    /// such as the HTTP request id.
    pub async fn run_with_id(
        &self,
        run_id: &str,
        job: &ClipJob,
        progress: &ProgressReporter,
    ) -> PipelineResult {
        let logger = RunLogger::with_run_id(run_id, "convert");
        let span = logger.create_span();
        self.run_logged(job, progress, &logger).instrument(span).await
    }

    async fn run_logged(
        &self,
        job: &ClipJob,
        progress: &ProgressReporter,
        logger: &RunLogger,
    ) -> PipelineResult {
        let reference_kind = job.reference.kind();
        logger.log_start(&format!(
            "{} reference, start {}s, duration {}s",
            reference_kind, job.window.start_seconds, job.window.duration_seconds
        ));
        metrics::record_run_started(reference_kind);

        let mut scratch = ScratchSpace::new(&self.config.scratch_dir);
        let mut stage = PipelineStage::Idle;
        let outcome = self
            .execute(job, progress, &mut scratch, &mut stage, logger)
            .await;
        scratch.cleanup().await;

        match outcome {
            Ok(published) => {
                progress.report(COMPLETE);
                metrics::record_run_succeeded(reference_kind);
                logger.log_completion(&published.title);
                PipelineResult::success(published.download_url, published.title)
            }
            Err(e) => {
                metrics::record_run_failed(stage.as_str(), e.kind());
                logger.log_error(stage.as_str(), &e.to_string());
                PipelineResult::failure(e.to_string())
            }
        }
    }

    async fn execute(
        &self,
        job: &ClipJob,
        progress: &ProgressReporter,
        scratch: &mut ScratchSpace,
        stage: &mut PipelineStage,
        logger: &RunLogger,
    ) -> StageResult<Published> {
        *stage = PipelineStage::Acquiring;
        logger.log_stage(stage.as_str(), "fetching source media");
        let started = Instant::now();
        scratch.prepare().await?;
        let input = scratch.allocate("input", "mp4");
        let acquired = self.acquirer.acquire(&job.reference, &input, progress).await?;
        metrics::record_stage_duration(stage.as_str(), started.elapsed().as_secs_f64());

        *stage = PipelineStage::Transcoding;
        logger.log_stage(stage.as_str(), "rendering vertical clip");
        let started = Instant::now();
        let output = scratch.allocate("short", "mp4");
        self.transcoder
            .transcode(&acquired.path, &output, job.window, progress.callback())
            .await?;
        metrics::record_stage_duration(stage.as_str(), started.elapsed().as_secs_f64());

        *stage = PipelineStage::Uploading;
        logger.log_stage(stage.as_str(), "publishing clip");
        progress.report(UPLOAD_STARTED);
        let started = Instant::now();
        let download_url = self.publisher.publish(&output, &acquired.title).await?;
        metrics::record_stage_duration(stage.as_str(), started.elapsed().as_secs_f64());

        if let VideoReference::Stored { handle } = &job.reference {
            self.publisher.purge_stored_input(handle).await;
        }

        *stage = PipelineStage::Done;
        Ok(Published {
            download_url,
            title: acquired.title,
        })
    }

    /// Fetch a remote video into storage for a later stored-reference run.
    pub async fn stage_input(&self, url: &str) -> StageResult<String> {
        let logger = RunLogger::new("stage_input");
        let mut scratch = ScratchSpace::new(&self.config.scratch_dir);

        let result = async {
            scratch.prepare().await?;
            let dest = scratch.allocate("staged", "mp4");
            self.acquirer.stage_input(url, &dest).await
        }
        .instrument(logger.create_span())
        .await;
        scratch.cleanup().await;

        match &result {
            Ok(handle) => logger.log_completion(handle),
            Err(e) => logger.log_error(PipelineStage::Acquiring.as_str(), &e.to_string()),
        }
        result
    }

    /// Open the source stream for direct download.
    pub async fn open_download(
        &self,
        url: &str,
        quality: Quality,
    ) -> StageResult<(VideoInfo, SourceStream)> {
        self.acquirer
            .open_remote_stream(url, quality)
            .await
            .map_err(|e: PipelineError| {
                RunLogger::new("download").log_warning(&e.to_string());
                e
            })
    }

    /// Open the source's audio track, re-encoded to MP3 as it streams.
    pub async fn open_audio_download(&self, url: &str) -> StageResult<(VideoInfo, SourceStream)> {
        let (info, stream) = self.open_download(url, Quality::Efficient).await?;
        let audio = self.transcoder.encode_mp3(stream).map_err(|e| {
            RunLogger::new("download").log_warning(&e.to_string());
            PipelineError::from(e)
        })?;
        Ok((info, audio))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fake_pipeline, FakeSourceFactory, FakeTranscoder, SourceBehavior};
    use tempfile::TempDir;
    use tokio::sync::mpsc::UnboundedReceiver;
    use yshort_models::{ClientProfile, ClipWindow, PipelineEvent};
    use yshort_storage::MemoryStore;

    fn remote_job(url: &str) -> ClipJob {
        ClipJob {
            reference: VideoReference::remote(url),
            window: ClipWindow::new(10.0, 30.0).unwrap(),
            stream: false,
        }
    }

    fn stored_job(handle: &str) -> ClipJob {
        ClipJob {
            reference: VideoReference::stored(handle),
            window: ClipWindow::default(),
            stream: true,
        }
    }

    fn progress_values(rx: &mut UnboundedReceiver<PipelineEvent>) -> Vec<u8> {
        let mut values = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let PipelineEvent::Progress(p) = event {
                values.push(p.progress);
            }
        }
        values
    }

    fn scratch_is_empty(dir: &TempDir) -> bool {
        match std::fs::read_dir(dir.path()) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => true,
        }
    }

    #[test]
    fn test_stage_labels() {
        assert_eq!(PipelineStage::Transcoding.to_string(), "transcoding");
        assert_eq!(PipelineStage::Failed.as_str(), "failed");
    }

    #[tokio::test]
    async fn test_remote_run_falls_back_to_last_profile() {
        let scratch = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new("bucket"));
        let factory = Arc::new(
            FakeSourceFactory::new()
                .with(ClientProfile::Android, SourceBehavior::FailMetadata("android blocked".into()))
                .with(ClientProfile::Ios, SourceBehavior::FailMetadata("ios blocked".into()))
                .with(
                    ClientProfile::Web,
                    SourceBehavior::Serve {
                        title: Some("My:Clip/2024?".into()),
                        bytes: b"source".to_vec(),
                    },
                ),
        );
        let pipeline = fake_pipeline(
            scratch.path(),
            factory.clone(),
            store.clone(),
            FakeTranscoder::succeeding(),
        );

        let (reporter, mut rx) = ProgressReporter::channel();
        let result = pipeline
            .run(&remote_job("https://youtu.be/abc123"), &reporter)
            .await;

        assert!(result.success, "unexpected failure: {:?}", result.error);
        assert_eq!(result.title.as_deref(), Some("MyClip2024"));
        assert_eq!(
            factory.created(),
            vec![ClientProfile::Android, ClientProfile::Ios, ClientProfile::Web]
        );

        let keys = store.keys();
        assert_eq!(keys.len(), 1);
        assert!(keys[0].starts_with("shorts/") && keys[0].ends_with("-MyClip2024.mp4"));
        assert_eq!(store.get(&keys[0]).unwrap(), b"source");
        assert!(result.download_url.unwrap().contains(&keys[0]));
        assert!(scratch_is_empty(&scratch));

        let values = progress_values(&mut rx);
        assert!(values.windows(2).all(|w| w[0] < w[1]), "{:?}", values);
        assert_eq!(values.first(), Some(&5));
        assert_eq!(values.last(), Some(&100));
        assert_eq!(values.iter().filter(|v| **v == 100).count(), 1);
        assert!(values.contains(&30) && values.contains(&90));
    }

    #[tokio::test]
    async fn test_all_profiles_failing_surfaces_last_error() {
        let scratch = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new("bucket"));
        let factory = Arc::new(
            FakeSourceFactory::new()
                .with(ClientProfile::Android, SourceBehavior::FailMetadata("android blocked".into()))
                .with(ClientProfile::Ios, SourceBehavior::FailMidStream("ios reset".into()))
                .with(ClientProfile::Web, SourceBehavior::FailMetadata("web blocked".into())),
        );
        let pipeline =
            fake_pipeline(scratch.path(), factory, store.clone(), FakeTranscoder::succeeding());

        let result = pipeline
            .run(&remote_job("https://www.youtube.com/watch?v=abc"), &ProgressReporter::silent())
            .await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Download failed: web blocked"));
        assert!(store.keys().is_empty());
        assert!(scratch_is_empty(&scratch));
    }

    #[tokio::test]
    async fn test_stored_input_is_purged_after_publish() {
        let scratch = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new("bucket"));
        store.insert("input/x.mp4", b"stored".to_vec());
        let factory = Arc::new(FakeSourceFactory::new());
        let pipeline = fake_pipeline(
            scratch.path(),
            factory.clone(),
            store.clone(),
            FakeTranscoder::succeeding(),
        );

        let (reporter, mut rx) = ProgressReporter::channel();
        let result = pipeline
            .run(&stored_job("gs://bucket/input/x.mp4"), &reporter)
            .await;

        assert!(result.success, "unexpected failure: {:?}", result.error);
        assert_eq!(result.title.as_deref(), Some("x"));
        assert!(factory.created().is_empty());
        assert_eq!(store.deleted_keys(), vec!["input/x.mp4".to_string()]);
        assert!(!store.contains("input/x.mp4"));
        assert_eq!(progress_values(&mut rx).last(), Some(&100));
        assert!(scratch_is_empty(&scratch));
    }

    #[tokio::test]
    async fn test_transcode_failure_publishes_nothing() {
        let scratch = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new("bucket"));
        let pipeline = fake_pipeline(
            scratch.path(),
            Arc::new(FakeSourceFactory::serving_all("Title", b"source")),
            store.clone(),
            FakeTranscoder::failing(1),
        );

        let (reporter, mut rx) = ProgressReporter::channel();
        let result = pipeline.run(&remote_job("abc123"), &reporter).await;

        assert!(!result.success);
        let error = result.error.unwrap();
        assert!(error.contains("exited 1"), "{}", error);
        assert!(store.keys().is_empty());
        assert!(!progress_values(&mut rx).contains(&100));
        assert!(scratch_is_empty(&scratch));
    }

    #[tokio::test]
    async fn test_stage_failures_leave_no_scratch_files() {
        // Acquisition: every profile fails after writing part of the file
        let scratch = TempDir::new().unwrap();
        let factory = FakeSourceFactory::new()
            .with(ClientProfile::Android, SourceBehavior::FailMidStream("reset".into()))
            .with(ClientProfile::Ios, SourceBehavior::FailMidStream("reset".into()))
            .with(ClientProfile::Web, SourceBehavior::FailMidStream("reset".into()));
        let pipeline = fake_pipeline(
            scratch.path(),
            Arc::new(factory),
            Arc::new(MemoryStore::new("bucket")),
            FakeTranscoder::succeeding(),
        );
        let result = pipeline.run(&remote_job("abc"), &ProgressReporter::silent()).await;
        assert!(!result.success);
        assert!(scratch_is_empty(&scratch));

        // Upload
        let scratch = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new("bucket"));
        store.fail_uploads(true);
        let pipeline = fake_pipeline(
            scratch.path(),
            Arc::new(FakeSourceFactory::serving_all("Title", b"source")),
            store,
            FakeTranscoder::succeeding(),
        );
        let result = pipeline.run(&remote_job("abc"), &ProgressReporter::silent()).await;
        assert_eq!(result.error.as_deref(), Some("Upload failed: injected upload failure"));
        assert!(scratch_is_empty(&scratch));

        // Stored input missing
        let scratch = TempDir::new().unwrap();
        let pipeline = fake_pipeline(
            scratch.path(),
            Arc::new(FakeSourceFactory::new()),
            Arc::new(MemoryStore::new("bucket")),
            FakeTranscoder::succeeding(),
        );
        let result = pipeline
            .run(&stored_job("gs://bucket/input/missing.mp4"), &ProgressReporter::silent())
            .await;
        assert_eq!(result.error.as_deref(), Some("Object not found: input/missing.mp4"));
        assert!(scratch_is_empty(&scratch));
    }

    #[tokio::test]
    async fn test_stage_input_uploads_under_input_prefix() {
        let scratch = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new("bucket"));
        let pipeline = fake_pipeline(
            scratch.path(),
            Arc::new(FakeSourceFactory::serving_all("Title", b"source")),
            store.clone(),
            FakeTranscoder::succeeding(),
        );

        let handle = pipeline
            .stage_input("https://www.youtube.com/watch?v=abc123")
            .await
            .unwrap();

        assert!(handle.starts_with("gs://bucket/input/abc123-"), "{}", handle);
        assert!(handle.ends_with(".mp4"));
        let key = handle.trim_start_matches("gs://bucket/");
        assert_eq!(store.get(key).unwrap(), b"source");
        assert!(scratch_is_empty(&scratch));
    }

    #[tokio::test]
    async fn test_run_with_id_reports_result() {
        let scratch = TempDir::new().unwrap();
        let pipeline = fake_pipeline(
            scratch.path(),
            Arc::new(FakeSourceFactory::serving_all("Title", b"source")),
            Arc::new(MemoryStore::new("bucket")),
            FakeTranscoder::succeeding(),
        );

        let result = pipeline
            .run_with_id("req-123", &remote_job("abc"), &ProgressReporter::silent())
            .await;
        assert!(result.success, "unexpected failure: {:?}", result.error);
        assert_eq!(result.title.as_deref(), Some("Title"));
    }

    #[tokio::test]
    async fn test_audio_download_goes_through_encoder() {
        use tokio::io::AsyncReadExt;

        let scratch = TempDir::new().unwrap();
        let pipeline = fake_pipeline(
            scratch.path(),
            Arc::new(FakeSourceFactory::serving_all("Song", b"source")),
            Arc::new(MemoryStore::new("bucket")),
            FakeTranscoder::succeeding(),
        );

        let (info, mut stream) = pipeline
            .open_audio_download("https://youtu.be/abc123")
            .await
            .unwrap();
        let mut bytes = Vec::new();
        stream.read_to_end(&mut bytes).await.unwrap();

        assert_eq!(info.title.as_deref(), Some("Song"));
        assert_eq!(bytes, b"source");
    }
}
