//! Streaming output of an external process.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};
use tokio::process::{Child, ChildStderr, ChildStdout};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Trailing stderr characters kept for error messages.
pub(crate) const STDERR_TAIL_CHARS: usize = 500;

/// Upper bound on retained diagnostic output while a process runs.
pub(crate) const MAX_DIAGNOSTIC_BYTES: usize = 64 * 1024;

/// Child stdout that reports a failed exit as a read error at end of stream.
pub(crate) struct ProcessStream {
    stdout: ChildStdout,
    exit: Option<oneshot::Receiver<Result<(), String>>>,
}

impl ProcessStream {
    /// Take over `child`'s stdout and watch its exit in the background.
    ///
    /// `feeder` is the task writing the child's stdin, if any; its failure
    /// fails the stream even when the child itself exits cleanly.
    pub(crate) fn spawn(
        mut child: Child,
        program: &'static str,
        feeder: Option<JoinHandle<io::Result<u64>>>,
    ) -> MediaResult<Self> {
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::internal(format!("{program} stdout not captured")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal(format!("{program} stderr not captured")))?;

        let (exit_tx, exit_rx) = oneshot::channel();
        tokio::spawn(async move {
            let diagnostics = drain_diagnostics(stderr).await;

            let mut outcome = match child.wait().await {
                Ok(status) if status.success() => Ok(()),
                Ok(status) => Err(format!(
                    "{} exited {}: {}",
                    program,
                    status.code().map_or_else(|| "by signal".to_string(), |c| c.to_string()),
                    tail_chars(diagnostics.trim(), STDERR_TAIL_CHARS)
                )),
                Err(e) => Err(format!("{program} wait failed: {e}")),
            };

            if let Some(feeder) = feeder.filter(|_| outcome.is_ok()) {
                outcome = match feeder.await {
                    Ok(Ok(_)) => Ok(()),
                    Ok(Err(e)) => Err(format!("{program} input failed: {e}")),
                    Err(e) => Err(format!("{program} input task failed: {e}")),
                };
            }
            let _ = exit_tx.send(outcome);
        });

        Ok(Self {
            stdout,
            exit: Some(exit_rx),
        })
    }
}

impl AsyncRead for ProcessStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        let before = buf.filled().len();
        ready!(Pin::new(&mut this.stdout).poll_read(cx, buf))?;
        if buf.filled().len() > before {
            return Poll::Ready(Ok(()));
        }

        if let Some(exit) = this.exit.as_mut() {
            let outcome = ready!(Pin::new(exit).poll(cx));
            this.exit = None;
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(message)) => return Poll::Ready(Err(io::Error::other(message))),
                Err(_) => return Poll::Ready(Err(io::Error::other("process exited without status"))),
            }
        }

        Poll::Ready(Ok(()))
    }
}

/// Read stderr to the end, keeping at most the last [`MAX_DIAGNOSTIC_BYTES`].
async fn drain_diagnostics(mut stderr: ChildStderr) -> String {
    let mut log = DiagnosticLog::default();
    let mut buf = [0u8; 4096];
    loop {
        match stderr.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                log.push(&buf[..n]);
            }
            Err(e) => {
                debug!("Stopped reading stderr: {}", e);
                break;
            }
        }
    }
    log.finish();
    log.into_text()
}

/// Diagnostic output split into `\r`/`\n` terminated records.
///
/// Bytes after the last terminator are held back until more data arrives,
/// so neither records nor multi-byte characters are cut at read boundaries.
/// The decoded text keeps at most [`MAX_DIAGNOSTIC_BYTES`].
#[derive(Debug, Default)]
pub(crate) struct DiagnosticLog {
    pending: Vec<u8>,
    text: String,
}

impl DiagnosticLog {
    /// Append raw bytes; returns the records this chunk completed.
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        match self.pending.iter().rposition(|b| *b == b'\r' || *b == b'\n') {
            Some(end) => {
                let complete: Vec<u8> = self.pending.drain(..=end).collect();
                self.absorb(&complete)
            }
            None if self.pending.len() > MAX_DIAGNOSTIC_BYTES => self.finish(),
            None => Vec::new(),
        }
    }

    /// Flush the unterminated remainder once the stream has ended.
    pub(crate) fn finish(&mut self) -> Vec<String> {
        let rest = std::mem::take(&mut self.pending);
        self.absorb(&rest)
    }

    pub(crate) fn into_text(self) -> String {
        self.text
    }

    fn absorb(&mut self, bytes: &[u8]) -> Vec<String> {
        if bytes.is_empty() {
            return Vec::new();
        }
        let chunk = String::from_utf8_lossy(bytes);
        self.text.push_str(&chunk);
        trim_front(&mut self.text, MAX_DIAGNOSTIC_BYTES);

        chunk
            .split(['\r', '\n'])
            .filter(|record| !record.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Last `max_chars` characters of `text`.
pub(crate) fn tail_chars(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(max_chars)).collect()
}

/// Drop leading bytes so `text` stays under `max_bytes`, respecting char boundaries.
pub(crate) fn trim_front(text: &mut String, max_bytes: usize) {
    if text.len() <= max_bytes {
        return;
    }
    let mut cut = text.len() - max_bytes;
    while !text.is_char_boundary(cut) {
        cut += 1;
    }
    text.drain(..cut);
}

/// Write an executable `/bin/sh` script standing in for an external tool.
#[cfg(all(test, unix))]
pub(crate) fn fake_binary(dir: &std::path::Path, name: &str, body: &str) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_chars() {
        assert_eq!(tail_chars("abcdef", 3), "def");
        assert_eq!(tail_chars("ab", 3), "ab");
        assert_eq!(tail_chars("ééé", 2), "éé");

        let long = "x".repeat(2000);
        assert_eq!(tail_chars(&long, STDERR_TAIL_CHARS).len(), 500);
    }

    #[test]
    fn test_trim_front_keeps_suffix() {
        let mut text = "0123456789".to_string();
        trim_front(&mut text, 4);
        assert_eq!(text, "6789");

        let mut multibyte = "aéb".to_string(); // 4 bytes
        trim_front(&mut multibyte, 2);
        assert_eq!(multibyte, "b");
    }

    #[test]
    fn test_diagnostic_log_joins_records_across_reads() {
        let mut log = DiagnosticLog::default();
        assert!(log.push(b"frame=  1 ti").is_empty());
        assert_eq!(log.push(b"me=00:00:15.00\rframe=  2"), vec!["frame=  1 time=00:00:15.00"]);
        assert_eq!(log.push(b"\n"), vec!["frame=  2"]);
        assert!(log.finish().is_empty());
        assert_eq!(log.into_text(), "frame=  1 time=00:00:15.00\rframe=  2\n");
    }

    #[test]
    fn test_diagnostic_log_keeps_split_characters() {
        let mut log = DiagnosticLog::default();
        log.push(b"caf\xC3");
        log.push(b"\xA9\n");
        assert_eq!(log.finish(), Vec::<String>::new());
        assert_eq!(log.into_text(), "café\n");
    }

    #[test]
    fn test_diagnostic_log_flushes_remainder() {
        let mut log = DiagnosticLog::default();
        log.push(b"Conversion failed!");
        assert_eq!(log.finish(), vec!["Conversion failed!"]);
    }
}
