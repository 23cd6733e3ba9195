//! Direct download passthrough.

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tracing::info;

use yshort_media::{SourceStream, VideoInfo};
use yshort_models::{sanitize_title, Quality};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Query for the download routes. Both lower-case and capitalised names are accepted.
#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    #[serde(alias = "URL")]
    pub url: Option<String>,
    /// `high` for the best tier, anything else for the efficient one
    #[serde(alias = "Quality")]
    pub quality: Option<String>,
}

impl DownloadQuery {
    fn source_url(&self) -> ApiResult<&str> {
        self.url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| ApiError::bad_request("Missing URL parameter"))
    }
}

/// Container served by a download route.
#[derive(Debug, Clone, Copy)]
enum Format {
    Mp4,
    Mp3,
}

impl Format {
    fn content_type(self) -> &'static str {
        match self {
            Format::Mp4 => "video/mp4",
            Format::Mp3 => "audio/mpeg",
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Format::Mp4 => "mp4",
            Format::Mp3 => "mp3",
        }
    }

    fn fallback_title(self) -> &'static str {
        match self {
            Format::Mp4 => "video",
            Format::Mp3 => "audio",
        }
    }
}

/// `GET /download` and `GET /downloadmp4`, `?url=...&quality=high`
pub async fn download(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> ApiResult<Response> {
    let url = query.source_url()?;
    let quality = Quality::from_hint(query.quality.as_deref());

    let (info, stream) = state.pipeline.open_download(url, quality).await?;
    info!(video_id = %info.id, ?quality, "Streaming video download");
    Ok(attachment(Format::Mp4, &info, stream))
}

/// `GET /downloadmp3?url=...`, audio only, re-encoded to MP3
pub async fn download_audio(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> ApiResult<Response> {
    let url = query.source_url()?;

    let (info, stream) = state.pipeline.open_audio_download(url).await?;
    info!(video_id = %info.id, "Streaming audio download");
    Ok(attachment(Format::Mp3, &info, stream))
}

fn attachment(format: Format, info: &VideoInfo, stream: SourceStream) -> Response {
    let title = info
        .title
        .as_deref()
        .filter(|t| !t.is_empty())
        .map(sanitize_title)
        .unwrap_or_else(|| format.fallback_title().to_string());

    let mut response = (StatusCode::OK, Body::from_stream(ReaderStream::new(stream))).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(format.content_type()));
    headers.insert(header::CONTENT_DISPOSITION, content_disposition(&title, format));
    response
}

/// `attachment; filename="<title>.<ext>"`; titles that cannot be a header use the fallback name.
fn content_disposition(title: &str, format: Format) -> HeaderValue {
    let value = |name: &str| format!("attachment; filename=\"{}.{}\"", name, format.extension());
    HeaderValue::from_str(&value(title))
        .or_else(|_| HeaderValue::from_str(&value(format.fallback_title())))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            content_disposition("My Clip", Format::Mp4),
            "attachment; filename=\"My Clip.mp4\""
        );
        assert_eq!(
            content_disposition("bad\nline", Format::Mp4),
            "attachment; filename=\"video.mp4\""
        );
        assert_eq!(
            content_disposition("Song", Format::Mp3),
            "attachment; filename=\"Song.mp3\""
        );
    }
}
