//! FFmpeg progress parsing.
//!
//! FFmpeg writes periodic status lines such as
//! `frame=  240 fps= 60 q=28.0 size=  1024kB time=00:00:08.00 bitrate=...`
//! to stderr, separated by carriage returns. The transcoder maps the most
//! recent `time=` stamp of each flushed chunk onto the overall pipeline scale.

use std::sync::LazyLock;

use regex::Regex;

/// Overall progress reported when transcoding starts.
pub const TRANSCODE_PROGRESS_START: u8 = 30;
/// Overall progress reported when transcoding finishes.
pub const TRANSCODE_PROGRESS_END: u8 = 85;
/// Minimum gain (exclusive) before a new transcode progress value is reported.
const REPORT_STEP: u8 = 2;

static TIME_STAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"time=(\d{2,}):(\d{2}):(\d{2}(?:\.\d+)?)").expect("valid time regex")
});

/// Extract elapsed output time (seconds) from the last `time=HH:MM:SS` token in a chunk.
pub fn parse_elapsed_seconds(chunk: &str) -> Option<f64> {
    let caps = TIME_STAMP.captures_iter(chunk).last()?;
    let hours: f64 = caps[1].parse().ok()?;
    let minutes: f64 = caps[2].parse().ok()?;
    let seconds: f64 = caps[3].parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Debounced mapping from FFmpeg output time to overall progress.
#[derive(Debug, Clone)]
pub struct TranscodeProgress {
    duration_seconds: f64,
    last_reported: u8,
}

impl TranscodeProgress {
    pub fn new(duration_seconds: f64) -> Self {
        Self {
            duration_seconds,
            last_reported: TRANSCODE_PROGRESS_START,
        }
    }

    /// `30 + 55 * min(1, elapsed / duration)`, rounded.
    pub fn percent_for(&self, elapsed_seconds: f64) -> u8 {
        let ratio = if self.duration_seconds > 0.0 {
            (elapsed_seconds / self.duration_seconds).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let span = f64::from(TRANSCODE_PROGRESS_END - TRANSCODE_PROGRESS_START);
        (f64::from(TRANSCODE_PROGRESS_START) + span * ratio).round() as u8
    }

    /// Feed one diagnostic chunk; returns a value only when it is worth reporting.
    pub fn observe(&mut self, chunk: &str) -> Option<u8> {
        let elapsed = parse_elapsed_seconds(chunk)?;
        let percent = self.percent_for(elapsed);
        if percent > self.last_reported.saturating_add(REPORT_STEP) {
            self.last_reported = percent;
            Some(percent)
        } else {
            None
        }
    }

    pub fn last_reported(&self) -> u8 {
        self.last_reported
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATUS_LINE: &str =
        "frame=  240 fps= 60 q=28.0 size=    1024kB time=00:00:15.00 bitrate= 559.2kbits/s speed=2.01x";

    #[test]
    fn test_parse_elapsed_from_status_line() {
        assert_eq!(parse_elapsed_seconds(STATUS_LINE), Some(15.0));
    }

    #[test]
    fn test_parse_uses_last_stamp_in_chunk() {
        let chunk = "time=00:00:01.00 bitrate=1\rtime=00:01:02.50 bitrate=2\r";
        assert_eq!(parse_elapsed_seconds(chunk), Some(62.5));
    }

    #[test]
    fn test_parse_ignores_input_duration_header() {
        let header = "  Duration: 00:10:00.00, start: 0.000000, bitrate: 1000 kb/s";
        assert_eq!(parse_elapsed_seconds(header), None);
        assert_eq!(parse_elapsed_seconds("time=N/A bitrate=N/A"), None);
    }

    #[test]
    fn test_parse_hours() {
        assert_eq!(parse_elapsed_seconds("time=01:00:00.00"), Some(3600.0));
    }

    #[test]
    fn test_percent_mapping() {
        let progress = TranscodeProgress::new(60.0);
        assert_eq!(progress.percent_for(0.0), 30);
        assert_eq!(progress.percent_for(30.0), 58);
        assert_eq!(progress.percent_for(60.0), 85);
        // Clamped past the end of the window
        assert_eq!(progress.percent_for(600.0), 85);
    }

    #[test]
    fn test_observe_debounces_small_steps() {
        let mut progress = TranscodeProgress::new(100.0);

        // 30 + 55 * 0.02 = 31.1 -> 31, not more than 2 above 30
        assert_eq!(progress.observe("time=00:00:02.00"), None);
        // 30 + 55 * 0.06 = 33.3 -> 33, exactly 3 above 30
        assert_eq!(progress.observe("time=00:00:06.00"), Some(33));
        // 36.6 -> 37, 4 above 33
        assert_eq!(progress.observe("time=00:00:12.00"), Some(37));
        // No timestamp
        assert_eq!(progress.observe("Press [q] to stop"), None);
        assert_eq!(progress.last_reported(), 37);
    }

    #[test]
    fn test_observe_never_goes_backwards() {
        let mut progress = TranscodeProgress::new(10.0);
        assert_eq!(progress.observe("time=00:00:10.00"), Some(85));
        assert_eq!(progress.observe("time=00:00:01.00"), None);
    }
}
