//! Fakes for the source and transcoder seams.
//!
//! Available in unit tests and, with the `testing` feature, to other crates.

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use async_trait::async_trait;
use tokio::io::{AsyncRead, ReadBuf};

use yshort_media::{
    MediaError, MediaResult, ProgressCallback, SourceClient, SourceClientFactory,
    SourceClientPool, SourceStream, Transcoder, VideoInfo,
};
use yshort_models::{ClientProfile, ClipWindow, Quality};
use yshort_storage::ObjectStore;

use crate::config::PipelineConfig;
use crate::pipeline::ClipPipeline;

/// How a fake client for one profile behaves.
#[derive(Debug, Clone)]
pub enum SourceBehavior {
    /// Serve `bytes` with the given title
    Serve { title: Option<String>, bytes: Vec<u8> },
    /// Fail the metadata lookup with `message`
    FailMetadata(String),
    /// Write some bytes then fail the stream with `message`
    FailMidStream(String),
}

/// Factory producing fake clients; profiles without a behavior fail metadata.
#[derive(Debug, Default)]
pub struct FakeSourceFactory {
    behaviors: HashMap<ClientProfile, SourceBehavior>,
    created: Mutex<Vec<ClientProfile>>,
}

impl FakeSourceFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, profile: ClientProfile, behavior: SourceBehavior) -> Self {
        self.behaviors.insert(profile, behavior);
        self
    }

    /// Every profile serves `bytes` titled `title`.
    pub fn serving_all(title: &str, bytes: &[u8]) -> Self {
        yshort_models::PROFILE_ROTATION
            .iter()
            .fold(Self::new(), |factory, profile| {
                factory.with(
                    *profile,
                    SourceBehavior::Serve {
                        title: Some(title.to_string()),
                        bytes: bytes.to_vec(),
                    },
                )
            })
    }

    /// Profiles clients were built for, in order.
    pub fn created(&self) -> Vec<ClientProfile> {
        self.created.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl SourceClientFactory for FakeSourceFactory {
    async fn create(&self, profile: ClientProfile) -> MediaResult<Arc<dyn SourceClient>> {
        self.created
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(profile);
        let behavior = self
            .behaviors
            .get(&profile)
            .cloned()
            .unwrap_or_else(|| SourceBehavior::FailMetadata(format!("{} unavailable", profile)));
        Ok(Arc::new(FakeSourceClient { profile, behavior }))
    }
}

struct FakeSourceClient {
    profile: ClientProfile,
    behavior: SourceBehavior,
}

#[async_trait]
impl SourceClient for FakeSourceClient {
    fn profile(&self) -> ClientProfile {
        self.profile
    }

    async fn basic_info(&self, video_id: &str) -> MediaResult<VideoInfo> {
        match &self.behavior {
            SourceBehavior::Serve { title, .. } => Ok(VideoInfo {
                id: video_id.to_string(),
                title: title.clone(),
            }),
            SourceBehavior::FailMetadata(message) => Err(MediaError::download_failed(message)),
            SourceBehavior::FailMidStream(_) => Ok(VideoInfo::new(video_id)),
        }
    }

    async fn open_stream(&self, _info: &VideoInfo, _quality: Quality) -> MediaResult<SourceStream> {
        match &self.behavior {
            SourceBehavior::Serve { bytes, .. } => Ok(Box::pin(io::Cursor::new(bytes.clone()))),
            SourceBehavior::FailMetadata(message) => Err(MediaError::download_failed(message)),
            SourceBehavior::FailMidStream(message) => Ok(Box::pin(FailingStream {
                sent: false,
                message: message.clone(),
            })),
        }
    }
}

/// Yields one chunk, then an error.
struct FailingStream {
    sent: bool,
    message: String,
}

impl AsyncRead for FailingStream {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.sent {
            return Poll::Ready(Err(io::Error::other(this.message.clone())));
        }
        this.sent = true;
        buf.put_slice(b"partial");
        Poll::Ready(Ok(()))
    }
}

/// Transcoder that copies input to output, optionally failing afterwards.
#[derive(Debug, Clone, Default)]
pub struct FakeTranscoder {
    /// Progress values reported before finishing
    pub progress: Vec<u8>,
    /// Exit code to fail with after writing partial output
    pub fail_with_exit: Option<i32>,
    /// Panic instead of transcoding
    pub panics: bool,
}

impl FakeTranscoder {
    pub fn succeeding() -> Self {
        Self {
            progress: vec![40, 60, 85],
            ..Self::default()
        }
    }

    pub fn failing(exit_code: i32) -> Self {
        Self {
            progress: vec![40],
            fail_with_exit: Some(exit_code),
            ..Self::default()
        }
    }

    pub fn panicking() -> Self {
        Self {
            panics: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        _window: ClipWindow,
        on_progress: ProgressCallback,
    ) -> MediaResult<()> {
        if self.panics {
            panic!("transcoder crashed");
        }
        let data = tokio::fs::read(input).await?;
        tokio::fs::write(output, &data).await?;
        for value in &self.progress {
            on_progress(*value);
        }
        match self.fail_with_exit {
            Some(code) => Err(MediaError::ffmpeg_failed(
                Some(code),
                "Invalid data found when processing input",
            )),
            None => Ok(()),
        }
    }

    /// Passes the source through unchanged.
    fn encode_mp3(&self, source: SourceStream) -> MediaResult<SourceStream> {
        Ok(source)
    }
}

/// Pipeline wired to the given fakes, with scratch files under `scratch_dir`.
pub fn fake_pipeline(
    scratch_dir: &Path,
    factory: Arc<FakeSourceFactory>,
    store: Arc<dyn ObjectStore>,
    transcoder: FakeTranscoder,
) -> ClipPipeline {
    let config = PipelineConfig {
        scratch_dir: scratch_dir.to_path_buf(),
        ..PipelineConfig::default()
    };
    let pool = Arc::new(SourceClientPool::new(factory));
    ClipPipeline::new(config, pool, store, Arc::new(transcoder))
}
