#![deny(unreachable_patterns)]
//! FFmpeg and video source wrappers for clip conversion.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building for vertical short-form clips
//! - Progress parsing from FFmpeg's diagnostic output
//! - A transcoder seam with an FFmpeg-backed implementation
//! - Source clients (yt-dlp backed), a per-profile client pool, and
//!   ordered profile fallback

pub mod command;
pub mod error;
mod process;
pub mod progress;
pub mod source;
pub mod transcode;

pub use command::{check_ffmpeg, check_ytdlp, FfmpegCommand};
pub use error::{MediaError, MediaResult};
pub use progress::{parse_elapsed_seconds, TranscodeProgress};
pub use source::fallback::{first_success, FallbackExhausted};
pub use source::pool::{SourceClientPool, DEFAULT_CLIENT_MAX_AGE};
pub use source::ytdlp::{YtDlpClient, YtDlpConfig, YtDlpFactory};
pub use source::{SourceClient, SourceClientFactory, SourceStream, VideoInfo};
pub use transcode::{FfmpegTranscoder, ProgressCallback, Transcoder};
