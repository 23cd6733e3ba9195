//! Pipeline metrics.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const RUNS_STARTED_TOTAL: &str = "yshort_pipeline_runs_started_total";
    pub const RUNS_SUCCEEDED_TOTAL: &str = "yshort_pipeline_runs_succeeded_total";
    pub const RUNS_FAILED_TOTAL: &str = "yshort_pipeline_runs_failed_total";
    pub const STAGE_DURATION_SECONDS: &str = "yshort_pipeline_stage_duration_seconds";
    pub const PROFILE_FAILURES_TOTAL: &str = "yshort_source_profile_failures_total";
}

pub fn record_run_started(reference_kind: &str) {
    let labels = [("reference", reference_kind.to_string())];
    counter!(names::RUNS_STARTED_TOTAL, &labels).increment(1);
}

pub fn record_run_succeeded(reference_kind: &str) {
    let labels = [("reference", reference_kind.to_string())];
    counter!(names::RUNS_SUCCEEDED_TOTAL, &labels).increment(1);
}

pub fn record_run_failed(stage: &str, error_kind: &str) {
    let labels = [
        ("stage", stage.to_string()),
        ("error", error_kind.to_string()),
    ];
    counter!(names::RUNS_FAILED_TOTAL, &labels).increment(1);
}

pub fn record_stage_duration(stage: &str, duration_secs: f64) {
    let labels = [("stage", stage.to_string())];
    histogram!(names::STAGE_DURATION_SECONDS, &labels).record(duration_secs);
}

/// A source profile failed and the next one will be tried.
pub fn record_profile_failure(profile: &str) {
    let labels = [("profile", profile.to_string())];
    counter!(names::PROFILE_FAILURES_TOTAL, &labels).increment(1);
}
