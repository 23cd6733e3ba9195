//! Progress reporting.
//!
//! A [`ProgressReporter`] is the single sink the pipeline writes progress
//! to. Streaming callers attach a channel; single-response callers use a
//! silent reporter. Values are clamped to 100 and only strictly increasing
//! values are forwarded, so observers never see progress go backwards.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use yshort_media::ProgressCallback;
use yshort_models::{PipelineEvent, PipelineResult};

#[derive(Debug, Clone)]
pub struct ProgressReporter {
    sender: Option<UnboundedSender<PipelineEvent>>,
    last: Arc<AtomicU8>,
}

impl ProgressReporter {
    /// Reporter that forwards events to the returned receiver.
    pub fn channel() -> (Self, UnboundedReceiver<PipelineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                sender: Some(tx),
                last: Arc::new(AtomicU8::new(0)),
            },
            rx,
        )
    }

    /// Reporter that only tracks the latest value.
    pub fn silent() -> Self {
        Self {
            sender: None,
            last: Arc::new(AtomicU8::new(0)),
        }
    }

    /// Report overall progress; ignored unless it exceeds the last value.
    pub fn report(&self, value: u8) {
        let value = value.min(100);
        let previous = self.last.fetch_max(value, Ordering::SeqCst);
        if value <= previous {
            return;
        }
        if let Some(sender) = &self.sender {
            if sender.send(PipelineEvent::progress(value)).is_err() {
                debug!("Progress receiver dropped");
            }
        }
    }

    pub fn last(&self) -> u8 {
        self.last.load(Ordering::SeqCst)
    }

    /// Adapter for media-layer callbacks.
    pub fn callback(&self) -> ProgressCallback {
        let reporter = self.clone();
        Arc::new(move |value| reporter.report(value))
    }

    /// Send the terminal result. Consumes the reporter so it happens once.
    pub fn finish(self, result: PipelineResult) {
        if let Some(sender) = &self.sender {
            if sender.send(PipelineEvent::Finished(result)).is_err() {
                debug!("Progress receiver dropped before terminal result");
            }
        }
    }
}
