//! Structured run logging.
//!
//! Every pipeline invocation gets a [`RunLogger`] so its log lines share a
//! `run_id` and `operation`.

use tracing::{error, info, warn, Span};
use uuid::Uuid;

/// Logger stamping run context on each event.
#[derive(Debug, Clone)]
pub struct RunLogger {
    run_id: String,
    operation: String,
}

impl RunLogger {
    /// Create a logger with a fresh run id.
    pub fn new(operation: &str) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            operation: operation.to_string(),
        }
    }

    /// Create a logger for an existing run id (e.g. the HTTP request id).
    pub fn with_run_id(run_id: &str, operation: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(run_id = %self.run_id, operation = %self.operation, "Run started: {}", message);
    }

    pub fn log_stage(&self, stage: &str, message: &str) {
        info!(
            run_id = %self.run_id,
            operation = %self.operation,
            stage,
            "Stage: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(run_id = %self.run_id, operation = %self.operation, "Run warning: {}", message);
    }

    pub fn log_error(&self, stage: &str, message: &str) {
        error!(
            run_id = %self.run_id,
            operation = %self.operation,
            stage,
            "Run failed: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(run_id = %self.run_id, operation = %self.operation, "Run completed: {}", message);
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span carrying the run context.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("run", run_id = %self.run_id, operation = %self.operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_run_ids_differ() {
        let a = RunLogger::new("convert");
        let b = RunLogger::new("convert");
        assert_ne!(a.run_id(), b.run_id());
        assert_eq!(a.operation(), "convert");
    }

    #[test]
    fn test_with_run_id() {
        let logger = RunLogger::with_run_id("req-123", "stage_input");
        assert_eq!(logger.run_id(), "req-123");
        assert_eq!(logger.operation(), "stage_input");
    }
}
