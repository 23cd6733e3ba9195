//! Video sources.
//!
//! A [`SourceClient`] is bound to one [`ClientProfile`] and knows how to
//! fetch metadata and open a byte stream for a video identifier. Clients are
//! produced by a [`SourceClientFactory`] and cached by [`pool::SourceClientPool`].

pub mod fallback;
pub mod pool;
pub mod ytdlp;

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

use yshort_models::{ClientProfile, Quality};

use crate::error::MediaResult;

/// Byte stream of the selected video format.
pub type SourceStream = Pin<Box<dyn AsyncRead + Send>>;

/// Basic metadata for a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Platform identifier
    pub id: String,
    /// Human-readable title, when the platform reports one
    pub title: Option<String>,
}

impl VideoInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// A client that talks to the video platform as one client profile.
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Profile this client impersonates.
    fn profile(&self) -> ClientProfile;

    /// Fetch metadata for `video_id`.
    async fn basic_info(&self, video_id: &str) -> MediaResult<VideoInfo>;

    /// Open a combined audio+video stream for the given video.
    async fn open_stream(&self, info: &VideoInfo, quality: Quality) -> MediaResult<SourceStream>;
}

/// Creates clients for a profile.
#[async_trait]
pub trait SourceClientFactory: Send + Sync {
    async fn create(&self, profile: ClientProfile) -> MediaResult<Arc<dyn SourceClient>>;
}
