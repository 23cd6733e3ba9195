//! yt-dlp backed source clients.
//!
//! Each client pins yt-dlp to one player client (`android`, `ios`, `web`)
//! and sends a user-agent matching that profile's device category.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info, warn};

use yshort_models::{ClientProfile, DeviceCategory, Quality};

use super::{SourceClient, SourceClientFactory, SourceStream, VideoInfo};
use crate::error::{MediaError, MediaResult};
use crate::process::{tail_chars, ProcessStream, STDERR_TAIL_CHARS};

const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";
const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Minimum size for a valid cookies file (bytes).
const MIN_COOKIES_FILE_SIZE: u64 = 50;

/// yt-dlp settings.
#[derive(Debug, Clone)]
pub struct YtDlpConfig {
    /// Binary name or path
    pub binary: String,
    /// Optional Netscape cookies file for authenticated requests
    pub cookies_path: Option<PathBuf>,
}

impl Default for YtDlpConfig {
    fn default() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
            cookies_path: None,
        }
    }
}

impl YtDlpConfig {
    /// Load from `YTDLP_BIN` and `YTDLP_COOKIES_PATH`.
    pub fn from_env() -> Self {
        Self {
            binary: std::env::var("YTDLP_BIN").unwrap_or_else(|_| "yt-dlp".to_string()),
            cookies_path: std::env::var("YTDLP_COOKIES_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
        }
    }
}

/// Builds [`YtDlpClient`]s.
#[derive(Debug, Clone, Default)]
pub struct YtDlpFactory {
    config: YtDlpConfig,
}

impl YtDlpFactory {
    pub fn new(config: YtDlpConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SourceClientFactory for YtDlpFactory {
    async fn create(&self, profile: ClientProfile) -> MediaResult<Arc<dyn SourceClient>> {
        let binary = which::which(&self.config.binary).map_err(|_| MediaError::YtDlpNotFound)?;

        let cookies = match &self.config.cookies_path {
            Some(source) => writable_cookies_copy(source, profile).await,
            None => None,
        };

        Ok(Arc::new(YtDlpClient {
            binary,
            profile,
            cookies,
        }))
    }
}

/// Source client driving the yt-dlp binary as one profile.
#[derive(Debug, Clone)]
pub struct YtDlpClient {
    binary: PathBuf,
    profile: ClientProfile,
    cookies: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    id: String,
    title: Option<String>,
}

impl YtDlpClient {
    fn user_agent(&self) -> &'static str {
        match self.profile.device_category() {
            DeviceCategory::Mobile => MOBILE_USER_AGENT,
            DeviceCategory::Desktop => DESKTOP_USER_AGENT,
        }
    }

    /// Arguments shared by every invocation for this profile.
    fn base_args(&self) -> Vec<String> {
        let mut args = vec![
            "--no-warnings".to_string(),
            "--no-playlist".to_string(),
            "--extractor-args".to_string(),
            format!("youtube:player_client={}", self.profile.as_str()),
            "--user-agent".to_string(),
            self.user_agent().to_string(),
        ];
        if let Some(cookies) = &self.cookies {
            args.push("--cookies".to_string());
            args.push(cookies.to_string_lossy().to_string());
        }
        args
    }
}

#[async_trait]
impl SourceClient for YtDlpClient {
    fn profile(&self) -> ClientProfile {
        self.profile
    }

    async fn basic_info(&self, video_id: &str) -> MediaResult<VideoInfo> {
        let mut args = self.base_args();
        args.extend([
            "--dump-single-json".to_string(),
            "--skip-download".to_string(),
            watch_url(video_id),
        ]);

        debug!(profile = %self.profile, video_id, "Fetching video metadata");
        let output = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MediaError::metadata_unavailable(tail_chars(
                stderr.trim(),
                STDERR_TAIL_CHARS,
            )));
        }

        let info: YtDlpInfo = serde_json::from_slice(&output.stdout)?;
        Ok(VideoInfo {
            id: info.id,
            title: info.title.filter(|t| !t.is_empty()),
        })
    }

    async fn open_stream(&self, info: &VideoInfo, quality: Quality) -> MediaResult<SourceStream> {
        let mut args = self.base_args();
        args.extend([
            "-f".to_string(),
            format_selector(quality).to_string(),
            "-o".to_string(),
            "-".to_string(),
            watch_url(&info.id),
        ]);

        info!(profile = %self.profile, video_id = %info.id, ?quality, "Opening source stream");
        let child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        Ok(Box::pin(ProcessStream::spawn(child, "yt-dlp", None)?))
    }
}

/// yt-dlp format selector for a quality tier. Both tracks are always required.
fn format_selector(quality: Quality) -> &'static str {
    match quality {
        Quality::Efficient => {
            "best[height<=720][vcodec!=none][acodec!=none]/best[vcodec!=none][acodec!=none]/best"
        }
        Quality::Best => "best[vcodec!=none][acodec!=none]/best",
    }
}

/// Watch URL for an identifier; full URLs pass through unchanged.
fn watch_url(video_id: &str) -> String {
    if video_id.contains("://") {
        video_id.to_string()
    } else {
        format!("https://www.youtube.com/watch?v={}", video_id)
    }
}

/// Validate that a cookies file appears to be in Netscape format.
fn is_netscape_cookies(content: &str) -> bool {
    if content.starts_with("# Netscape HTTP Cookie File") || content.starts_with("# HTTP Cookie File")
    {
        return true;
    }

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .any(|line| line.split('\t').count() >= 6)
}

/// Copy the cookies file to a per-profile writable location.
///
/// yt-dlp writes cookies back after use, so each profile gets its own copy.
/// Returns `None` when the source is missing, too small or malformed.
async fn writable_cookies_copy(source: &Path, profile: ClientProfile) -> Option<PathBuf> {
    let metadata = match tokio::fs::metadata(source).await {
        Ok(m) => m,
        Err(e) => {
            debug!("Cookies file {} unavailable: {}", source.display(), e);
            return None;
        }
    };
    if metadata.len() < MIN_COOKIES_FILE_SIZE {
        debug!(
            "Cookies file {} is too small ({} bytes), skipping",
            source.display(),
            metadata.len()
        );
        return None;
    }

    match tokio::fs::read_to_string(source).await {
        Ok(content) if is_netscape_cookies(&content) => {}
        Ok(_) => {
            warn!("Cookies file {} is not in Netscape format, skipping", source.display());
            return None;
        }
        Err(e) => {
            warn!("Failed to read cookies file: {}", e);
            return None;
        }
    }

    let target = std::env::temp_dir().join(format!("yshort-cookies-{}.txt", profile.as_str()));
    match tokio::fs::copy(source, &target).await {
        Ok(_) => Some(target),
        Err(e) => {
            warn!("Failed to copy cookies file: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(profile: ClientProfile) -> YtDlpClient {
        YtDlpClient {
            binary: PathBuf::from("yt-dlp"),
            profile,
            cookies: None,
        }
    }

    #[test]
    fn test_user_agent_follows_device_category() {
        assert_eq!(client(ClientProfile::Android).user_agent(), MOBILE_USER_AGENT);
        assert_eq!(client(ClientProfile::Ios).user_agent(), MOBILE_USER_AGENT);
        assert_eq!(client(ClientProfile::Web).user_agent(), DESKTOP_USER_AGENT);
    }

    #[test]
    fn test_base_args_pin_player_client() {
        let args = client(ClientProfile::Ios).base_args();
        assert!(args.contains(&"youtube:player_client=ios".to_string()));
        assert!(!args.contains(&"--cookies".to_string()));
    }

    #[test]
    fn test_format_selector_requires_both_tracks() {
        for quality in [Quality::Efficient, Quality::Best] {
            let selector = format_selector(quality);
            assert!(selector.starts_with("best["));
            assert!(selector.contains("[vcodec!=none][acodec!=none]"));
        }
        assert!(format_selector(Quality::Efficient).contains("height<=720"));
    }

    #[test]
    fn test_watch_url() {
        assert_eq!(watch_url("abc"), "https://www.youtube.com/watch?v=abc");
        assert_eq!(watch_url("https://vimeo.com/1"), "https://vimeo.com/1");
    }

    #[test]
    fn test_netscape_detection() {
        assert!(is_netscape_cookies("# Netscape HTTP Cookie File\n"));
        assert!(is_netscape_cookies(
            ".youtube.com\tTRUE\t/\tTRUE\t0\tSID\tvalue"
        ));
        assert!(!is_netscape_cookies("{\"cookies\": []}"));
    }

    #[tokio::test]
    async fn test_cookies_copy_rejects_small_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cookies.txt");
        tokio::fs::write(&path, "# HTTP Cookie File").await.unwrap();

        assert!(writable_cookies_copy(&path, ClientProfile::Web).await.is_none());
    }

    #[cfg(unix)]
    mod with_fake_binary {
        use tokio::io::AsyncReadExt;

        use super::*;
        use crate::process::fake_binary;

        fn scripted(dir: &Path, body: &str) -> YtDlpClient {
            YtDlpClient {
                binary: fake_binary(dir, "yt-dlp", body),
                profile: ClientProfile::Android,
                cookies: None,
            }
        }

        #[tokio::test]
        async fn test_stream_yields_stdout() {
            let dir = tempfile::TempDir::new().unwrap();
            let client = scripted(dir.path(), "printf 'video-bytes'");

            let mut stream = client
                .open_stream(&VideoInfo::new("abc"), Quality::Best)
                .await
                .unwrap();
            let mut bytes = Vec::new();
            stream.read_to_end(&mut bytes).await.unwrap();

            assert_eq!(bytes, b"video-bytes");
        }

        #[tokio::test]
        async fn test_failed_exit_surfaces_as_read_error() {
            let dir = tempfile::TempDir::new().unwrap();
            let client = scripted(
                dir.path(),
                "printf 'partial'\necho 'ERROR: HTTP Error 403: Forbidden' >&2\nexit 1",
            );

            let mut stream = client
                .open_stream(&VideoInfo::new("abc"), Quality::Efficient)
                .await
                .unwrap();
            let mut bytes = Vec::new();
            let err = stream.read_to_end(&mut bytes).await.unwrap_err();

            let message = err.to_string();
            assert!(message.starts_with("yt-dlp exited 1:"), "{message}");
            assert!(message.contains("HTTP Error 403"), "{message}");
        }

        #[tokio::test]
        async fn test_basic_info_parses_json() {
            let dir = tempfile::TempDir::new().unwrap();
            let client = scripted(dir.path(), r#"echo '{"id": "abc", "title": ""}'"#);

            let info = client.basic_info("abc").await.unwrap();
            assert_eq!(info, VideoInfo::new("abc"));
        }

        #[tokio::test]
        async fn test_basic_info_failure_keeps_stderr() {
            let dir = tempfile::TempDir::new().unwrap();
            let client = scripted(dir.path(), "echo 'Video unavailable' >&2\nexit 1");

            let err = client.basic_info("abc").await.unwrap_err();
            assert!(err.to_string().contains("Video unavailable"));
        }
    }

    #[tokio::test]
    async fn test_missing_binary_is_reported() {
        let factory = YtDlpFactory::new(YtDlpConfig {
            binary: "definitely-not-yt-dlp-xyz".to_string(),
            cookies_path: None,
        });

        let result = factory.create(ClientProfile::Android).await;
        assert!(matches!(result, Err(MediaError::YtDlpNotFound)));
    }
}
