//! FFmpeg command builder.

use std::path::{Path, PathBuf};

use yshort_models::ClipWindow;

use crate::error::{MediaError, MediaResult};

/// Output width of a short-form clip.
pub const SHORT_WIDTH: u32 = 1080;
/// Output height of a short-form clip.
pub const SHORT_HEIGHT: u32 = 1920;

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Output file path
    output: PathBuf,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            overwrite: true,
        }
    }

    /// Center-crop to 9:16, scale to 1080x1920, H.264/AAC with fast-start.
    ///
    /// The trim is applied after `-i` so seeking is frame-accurate.
    pub fn vertical_short(
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        window: &ClipWindow,
    ) -> Self {
        Self::new(input, output)
            .seek(window.start_seconds)
            .duration(window.duration_seconds)
            .video_filter(format!(
                "crop=ih*9/16:ih,scale={}:{}",
                SHORT_WIDTH, SHORT_HEIGHT
            ))
            .video_codec("libx264")
            .preset("fast")
            .crf(23)
            .audio_codec("aac")
            .audio_bitrate("128k")
            .movflags("+faststart")
    }

    /// Audio-only MP3 from stdin to stdout.
    pub fn mp3_audio() -> Self {
        Self::new("pipe:0", "pipe:1")
            .output_arg("-vn")
            .audio_codec("libmp3lame")
            .audio_bitrate("192k")
            .output_arg("-f")
            .output_arg("mp3")
    }

    /// Add an output argument (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Set seek position.
    pub fn seek(self, seconds: f64) -> Self {
        self.output_arg("-ss").output_arg(format_seconds(seconds))
    }

    /// Set duration.
    pub fn duration(self, seconds: f64) -> Self {
        self.output_arg("-t").output_arg(format_seconds(seconds))
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Set CRF (quality).
    pub fn crf(self, crf: u8) -> Self {
        self.output_arg("-crf").output_arg(crf.to_string())
    }

    /// Set preset.
    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.output_arg("-preset").output_arg(preset)
    }

    /// Set audio bitrate.
    pub fn audio_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:a").output_arg(bitrate)
    }

    /// Set MP4 muxer flags.
    pub fn movflags(self, flags: impl Into<String>) -> Self {
        self.output_arg("-movflags").output_arg(flags)
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());

        args.extend(self.output_args.clone());

        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Render seconds without a trailing `.0` for whole numbers (`10`, `12.5`).
fn format_seconds(seconds: f64) -> String {
    seconds.to_string()
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if yt-dlp is available.
pub fn check_ytdlp() -> MediaResult<PathBuf> {
    which::which("yt-dlp").map_err(|_| MediaError::YtDlpNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertical_short_args() {
        let window = ClipWindow::new(10.0, 30.0).unwrap();
        let args = FfmpegCommand::vertical_short("in.mp4", "out.mp4", &window).build_args();

        let expected: Vec<String> = [
            "-y",
            "-i",
            "in.mp4",
            "-ss",
            "10",
            "-t",
            "30",
            "-vf",
            "crop=ih*9/16:ih,scale=1080:1920",
            "-c:v",
            "libx264",
            "-preset",
            "fast",
            "-crf",
            "23",
            "-c:a",
            "aac",
            "-b:a",
            "128k",
            "-movflags",
            "+faststart",
            "out.mp4",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        assert_eq!(args, expected);
    }

    #[test]
    fn test_fractional_seconds() {
        let window = ClipWindow::new(1.5, 12.25).unwrap();
        let args = FfmpegCommand::vertical_short("a", "b", &window).build_args();
        assert!(args.contains(&"1.5".to_string()));
        assert!(args.contains(&"12.25".to_string()));
    }

    #[test]
    fn test_mp3_audio_args() {
        let args = FfmpegCommand::mp3_audio().build_args();
        assert_eq!(
            args,
            [
                "-y", "-i", "pipe:0", "-vn", "-c:a", "libmp3lame", "-b:a", "192k", "-f", "mp3",
                "pipe:1"
            ]
        );
    }
}
