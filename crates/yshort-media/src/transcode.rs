//! Clip transcoding.
//!
//! [`Transcoder`] is the seam the pipeline depends on; [`FfmpegTranscoder`]
//! runs the external `ffmpeg` binary with the vertical-short argument set.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use yshort_models::ClipWindow;

use crate::command::FfmpegCommand;
use crate::error::{MediaError, MediaResult};
use crate::process::{tail_chars, DiagnosticLog, ProcessStream, STDERR_TAIL_CHARS};
use crate::progress::{TranscodeProgress, TRANSCODE_PROGRESS_END};
use crate::source::SourceStream;

/// Callback receiving overall progress values (0-100).
pub type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync + 'static>;

/// Turns a local source file into a vertical short-form clip.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        window: ClipWindow,
        on_progress: ProgressCallback,
    ) -> MediaResult<()>;

    /// Re-encode the audio track of `source` to MP3 while it streams.
    fn encode_mp3(&self, source: SourceStream) -> MediaResult<SourceStream>;
}

/// FFmpeg-backed transcoder.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    /// Binary name or path
    binary: String,
    /// Optional hard limit on process runtime
    timeout_secs: Option<u64>,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegTranscoder {
    pub fn new() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
            timeout_secs: None,
        }
    }

    /// Use a specific ffmpeg binary.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Kill the process if it runs longer than `secs`. Unset by default.
    pub fn with_timeout(mut self, secs: Option<u64>) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Wait for the child, honouring the optional timeout.
    async fn wait_for_completion(&self, child: &mut Child) -> MediaResult<ExitStatus> {
        match self.timeout_secs {
            Some(secs) => {
                match tokio::time::timeout(Duration::from_secs(secs), child.wait()).await {
                    Ok(status) => Ok(status?),
                    Err(_) => {
                        warn!("FFmpeg timed out after {} seconds, killing process", secs);
                        let _ = child.kill().await;
                        Err(MediaError::Timeout(secs))
                    }
                }
            }
            None => Ok(child.wait().await?),
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        window: ClipWindow,
        on_progress: ProgressCallback,
    ) -> MediaResult<()> {
        which::which(&self.binary).map_err(|_| MediaError::FfmpegNotFound)?;

        let args = FfmpegCommand::vertical_short(input, output, &window).build_args();
        debug!("Running FFmpeg: {} {}", self.binary, args.join(" "));

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stderr not captured"))?;

        // FFmpeg separates status updates with '\r', so records end at either terminator.
        let reporter = Arc::clone(&on_progress);
        let duration = window.duration_seconds;
        let diagnostics_handle = tokio::spawn(async move {
            let mut tracker = TranscodeProgress::new(duration);
            let mut log = DiagnosticLog::default();
            let mut buf = [0u8; 4096];

            loop {
                let (records, done) = match stderr.read(&mut buf).await {
                    Ok(0) => (log.finish(), true),
                    Ok(n) => (log.push(&buf[..n]), false),
                    Err(e) => {
                        debug!("Stopped reading FFmpeg stderr: {}", e);
                        (log.finish(), true)
                    }
                };
                for record in &records {
                    if let Some(percent) = tracker.observe(record) {
                        reporter(percent);
                    }
                }
                if done {
                    break;
                }
            }

            log.into_text()
        });

        let status = self.wait_for_completion(&mut child).await;
        let diagnostics = diagnostics_handle.await.unwrap_or_default();
        let status = status?;

        if status.success() {
            info!(output = %output.display(), "FFmpeg finished");
            on_progress(TRANSCODE_PROGRESS_END);
            Ok(())
        } else {
            Err(MediaError::ffmpeg_failed(
                status.code(),
                tail_chars(&diagnostics, STDERR_TAIL_CHARS),
            ))
        }
    }

    fn encode_mp3(&self, mut source: SourceStream) -> MediaResult<SourceStream> {
        which::which(&self.binary).map_err(|_| MediaError::FfmpegNotFound)?;

        let args = FfmpegCommand::mp3_audio().build_args();
        debug!("Running FFmpeg: {} {}", self.binary, args.join(" "));

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stdin not captured"))?;
        let feeder = tokio::spawn(async move {
            let copied = tokio::io::copy(&mut source, &mut stdin).await;
            drop(stdin);
            copied
        });

        Ok(Box::pin(ProcessStream::spawn(child, "FFmpeg", Some(feeder))?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_fails_fast() {
        let transcoder = FfmpegTranscoder::new().with_binary("definitely-not-ffmpeg-xyz");
        let dir = tempfile::TempDir::new().unwrap();
        let result = transcoder
            .transcode(
                &dir.path().join("in.mp4"),
                &dir.path().join("out.mp4"),
                ClipWindow::default(),
                Arc::new(|_| {}),
            )
            .await;

        assert!(matches!(result, Err(MediaError::FfmpegNotFound)));
    }

    #[cfg(unix)]
    mod with_fake_binary {
        use std::sync::Mutex;

        use tokio::io::AsyncReadExt;

        use super::*;
        use crate::process::fake_binary;

        /// 700 bytes of noise followed by two status updates for a 60s window.
        fn status_script(exit_code: i32) -> String {
            format!(
                "printf '%s' '{}' >&2\nprintf 'time=00:00:15.00\\r' >&2\nprintf 'time=00:00:30.00\\r' >&2\nexit {}",
                "x".repeat(700),
                exit_code
            )
        }

        async fn run(transcoder: &FfmpegTranscoder, dir: &Path) -> (MediaResult<()>, Vec<u8>) {
            let seen = Arc::new(Mutex::new(Vec::<u8>::new()));
            let sink = Arc::clone(&seen);
            let result = transcoder
                .transcode(
                    &dir.join("in.mp4"),
                    &dir.join("out.mp4"),
                    ClipWindow::default(),
                    Arc::new(move |p: u8| sink.lock().unwrap().push(p)),
                )
                .await;
            let seen = seen.lock().unwrap().clone();
            (result, seen)
        }

        #[tokio::test]
        async fn test_failed_exit_reports_tail_and_progress() {
            let dir = tempfile::TempDir::new().unwrap();
            let binary = fake_binary(dir.path(), "ffmpeg", &status_script(1));
            let transcoder = FfmpegTranscoder::new().with_binary(binary.to_string_lossy());

            let (result, seen) = run(&transcoder, dir.path()).await;

            let message = result.unwrap_err().to_string();
            assert!(message.starts_with("FFmpeg exited 1: "), "{message}");
            assert_eq!(message.chars().count(), "FFmpeg exited 1: ".len() + STDERR_TAIL_CHARS);
            assert!(message.ends_with("time=00:00:30.00\r"));
            assert_eq!(seen, vec![44, 58]);
        }

        #[tokio::test]
        async fn test_clean_exit_finishes_at_85() {
            let dir = tempfile::TempDir::new().unwrap();
            let binary = fake_binary(dir.path(), "ffmpeg", &status_script(0));
            let transcoder = FfmpegTranscoder::new().with_binary(binary.to_string_lossy());

            let (result, seen) = run(&transcoder, dir.path()).await;

            assert!(result.is_ok());
            assert_eq!(seen, vec![44, 58, TRANSCODE_PROGRESS_END]);
        }

        #[tokio::test]
        async fn test_status_split_across_writes_is_parsed() {
            let dir = tempfile::TempDir::new().unwrap();
            let binary = fake_binary(
                dir.path(),
                "ffmpeg",
                "printf 'frame=1 ti' >&2\nsleep 0.2\nprintf 'me=00:00:30.00\\r' >&2",
            );
            let transcoder = FfmpegTranscoder::new().with_binary(binary.to_string_lossy());

            let (result, seen) = run(&transcoder, dir.path()).await;

            assert!(result.is_ok());
            assert_eq!(seen, vec![58, TRANSCODE_PROGRESS_END]);
        }

        #[tokio::test]
        async fn test_timeout_kills_process() {
            let dir = tempfile::TempDir::new().unwrap();
            let binary = fake_binary(dir.path(), "ffmpeg", "exec sleep 5");
            let transcoder = FfmpegTranscoder::new()
                .with_binary(binary.to_string_lossy())
                .with_timeout(Some(1));

            let (result, _) = run(&transcoder, dir.path()).await;
            assert!(matches!(result, Err(MediaError::Timeout(1))));
        }

        #[tokio::test]
        async fn test_encode_mp3_streams_stdout() {
            let dir = tempfile::TempDir::new().unwrap();
            let binary = fake_binary(dir.path(), "ffmpeg", "cat");
            let transcoder = FfmpegTranscoder::new().with_binary(binary.to_string_lossy());

            let source: SourceStream = Box::pin(&b"audio-frames"[..]);
            let mut stream = transcoder.encode_mp3(source).unwrap();
            let mut bytes = Vec::new();
            stream.read_to_end(&mut bytes).await.unwrap();

            assert_eq!(bytes, b"audio-frames");
        }

        #[tokio::test]
        async fn test_encode_mp3_failure_surfaces_at_end_of_stream() {
            let dir = tempfile::TempDir::new().unwrap();
            let binary = fake_binary(
                dir.path(),
                "ffmpeg",
                "cat >/dev/null\necho 'Unknown encoder libmp3lame' >&2\nexit 3",
            );
            let transcoder = FfmpegTranscoder::new().with_binary(binary.to_string_lossy());

            let source: SourceStream = Box::pin(&b"audio-frames"[..]);
            let mut stream = transcoder.encode_mp3(source).unwrap();
            let err = stream.read_to_end(&mut Vec::new()).await.unwrap_err();

            let message = err.to_string();
            assert!(message.starts_with("FFmpeg exited 3:"), "{message}");
            assert!(message.contains("Unknown encoder"));
        }
    }
}
