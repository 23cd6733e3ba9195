//! Media acquisition.
//!
//! Remote references are fetched through the source client pool, trying
//! each profile of [`PROFILE_ROTATION`] in order. Stored references are
//! copied out of object storage.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use yshort_media::{
    first_success, MediaError, SourceClient, SourceClientPool, SourceStream, VideoInfo,
};
use yshort_models::{
    extract_video_id, sanitize_title, ClientProfile, Quality, VideoReference, DEFAULT_TITLE,
    PROFILE_ROTATION,
};
use yshort_storage::{ObjectHandle, ObjectStore};

use crate::error::{PipelineError, StageResult};
use crate::metrics;
use crate::progress::ProgressReporter;

/// Progress when acquisition starts.
pub const ACQUIRE_STARTED: u8 = 5;
/// Progress once source metadata is known.
pub const METADATA_FETCHED: u8 = 10;
/// Progress once the source media is on local disk.
pub const ACQUIRE_FINISHED: u8 = 30;

/// Source media on local disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Acquired {
    pub path: PathBuf,
    pub title: String,
}

pub struct Acquirer {
    pool: Arc<SourceClientPool>,
    store: Arc<dyn ObjectStore>,
    input_prefix: String,
}

impl Acquirer {
    pub fn new(
        pool: Arc<SourceClientPool>,
        store: Arc<dyn ObjectStore>,
        input_prefix: impl Into<String>,
    ) -> Self {
        Self {
            pool,
            store,
            input_prefix: input_prefix.into(),
        }
    }

    /// Fetch `reference` into `dest`.
    pub async fn acquire(
        &self,
        reference: &VideoReference,
        dest: &Path,
        progress: &ProgressReporter,
    ) -> StageResult<Acquired> {
        progress.report(ACQUIRE_STARTED);

        let title = match reference {
            VideoReference::Stored { handle } => self.fetch_stored(handle, dest).await?,
            VideoReference::Remote { url } => self.fetch_remote(url, dest, progress).await?,
        };

        progress.report(ACQUIRE_FINISHED);
        Ok(Acquired {
            path: dest.to_path_buf(),
            title,
        })
    }

    async fn fetch_stored(&self, handle: &str, dest: &Path) -> StageResult<String> {
        let key = self.store.resolve_key(handle)?;
        debug!("Fetching stored input {}", key);
        self.store.get_to_file(&key, dest).await?;

        let title = ObjectHandle::parse(handle)?
            .file_stem()
            .map(|stem| sanitize_title(&stem))
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());
        Ok(title)
    }

    async fn fetch_remote(
        &self,
        url: &str,
        dest: &Path,
        progress: &ProgressReporter,
    ) -> StageResult<String> {
        let video_id = extract_video_id(url);

        let (profile, info) = self
            .with_profile_rotation(|client| {
                let video_id = video_id.clone();
                async move {
                    let info = client.basic_info(&video_id).await?;
                    progress.report(METADATA_FETCHED);

                    let mut stream = client.open_stream(&info, Quality::Efficient).await?;
                    let mut file = tokio::fs::File::create(dest).await?;
                    let bytes = tokio::io::copy(&mut stream, &mut file)
                        .await
                        .map_err(|e| MediaError::download_failed(e.to_string()))?;
                    debug!(video_id = %info.id, bytes, "Source stream written");
                    Ok::<_, MediaError>(info)
                }
            })
            .await?;

        info!(profile = %profile, video_id = %info.id, "Acquired remote video");
        Ok(display_title(&info))
    }

    /// Open a stream for `url` at `quality` without touching disk.
    pub async fn open_remote_stream(
        &self,
        url: &str,
        quality: Quality,
    ) -> StageResult<(VideoInfo, SourceStream)> {
        let video_id = extract_video_id(url);

        let (_, opened) = self
            .with_profile_rotation(|client| {
                let video_id = video_id.clone();
                async move {
                    let info = client.basic_info(&video_id).await?;
                    let stream = client.open_stream(&info, quality).await?;
                    Ok::<_, MediaError>((info, stream))
                }
            })
            .await?;

        Ok(opened)
    }

    /// Fetch a remote video and place it in storage as a reusable input.
    ///
    /// Returns the `gs://bucket/key` handle of the stored object.
    pub async fn stage_input(&self, url: &str, dest: &Path) -> StageResult<String> {
        let acquired = self
            .acquire(&VideoReference::remote(url), dest, &ProgressReporter::silent())
            .await?;
        let key = format!(
            "{}/{}-{}.mp4",
            self.input_prefix,
            key_safe(&extract_video_id(url)),
            chrono::Utc::now().timestamp_millis()
        );

        self.store.put_file(&acquired.path, &key, "video/mp4").await?;
        info!("Staged input {} as {}", url, key);
        Ok(self.store.handle_for(&key))
    }

    /// Run `attempt` with a client for each profile until one succeeds.
    ///
    /// A profile whose attempt fails has its cached client invalidated.
    /// When every profile fails the error of the last one is returned.
    async fn with_profile_rotation<T, F, Fut>(&self, attempt: F) -> StageResult<(ClientProfile, T)>
    where
        F: Fn(Arc<dyn SourceClient>) -> Fut,
        Fut: Future<Output = Result<T, MediaError>>,
    {
        let attempt = &attempt;
        let result = first_success(PROFILE_ROTATION, move |profile| async move {
            let outcome = match self.pool.acquire(profile).await {
                Ok(client) => attempt(client).await,
                Err(e) => Err(e),
            };
            if outcome.is_err() {
                metrics::record_profile_failure(profile.as_str());
                self.pool.invalidate(profile).await;
            }
            outcome
        })
        .await;

        match result {
            Ok(success) => Ok(success),
            Err(exhausted) => Err(exhausted
                .into_last_error()
                .map(PipelineError::from)
                .unwrap_or(PipelineError::NoProfiles)),
        }
    }
}

/// Sanitized title; the placeholder only stands in for a missing or empty one.
///
/// A title made only of unsafe characters sanitizes to an empty string.
fn display_title(info: &VideoInfo) -> String {
    info.title
        .as_deref()
        .filter(|t| !t.is_empty())
        .map(sanitize_title)
        .unwrap_or_else(|| DEFAULT_TITLE.to_string())
}

/// Restrict an identifier to characters safe in object keys.
fn key_safe(id: &str) -> String {
    let safe: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if safe.is_empty() {
        "video".to_string()
    } else {
        safe
    }
}
