//! Clip conversion.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use tokio::task::JoinError;
use tracing::{error, info};

use yshort_models::{ClipJob, ConvertRequest, PipelineResult};
use yshort_pipeline::{ClipPipeline, ProgressReporter};

use crate::emitter::ndjson_response;
use crate::error::{ApiError, ApiResult};
use crate::middleware::RequestId;
use crate::state::AppState;

/// Error reported when the conversion task dies without a result.
const TASK_FAILED: &str = "Conversion task failed";

/// `POST /convert`
///
/// With `stream: true` the response is an NDJSON progress stream ending in
/// the result; otherwise only the result is returned, with 500 on failure.
pub async fn convert(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let job = request.into_job().map_err(ApiError::bad_request)?;
    let run_id = request_id.map(|Extension(RequestId(id))| id);

    info!(
        reference = job.reference.kind(),
        start = job.window.start_seconds,
        duration = job.window.duration_seconds,
        stream = job.stream,
        "Conversion requested"
    );

    if job.stream {
        let (reporter, events) = ProgressReporter::channel();
        let pipeline = state.pipeline.clone();
        tokio::spawn(async move {
            // The outer task keeps a reporter so a crashed run still gets a terminal record
            let result = spawn_run(pipeline, run_id, job, reporter.clone())
                .await
                .unwrap_or_else(task_failure);
            reporter.finish(result);
        });
        return Ok(ndjson_response(events));
    }

    // Run detached so a dropped connection does not abort the conversion
    let result = spawn_run(state.pipeline.clone(), run_id, job, ProgressReporter::silent())
        .await
        .unwrap_or_else(task_failure);

    let status = if result.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((status, Json(result)).into_response())
}

fn spawn_run(
    pipeline: Arc<ClipPipeline>,
    run_id: Option<String>,
    job: ClipJob,
    progress: ProgressReporter,
) -> tokio::task::JoinHandle<PipelineResult> {
    tokio::spawn(async move {
        match run_id {
            Some(run_id) => pipeline.run_with_id(&run_id, &job, &progress).await,
            None => pipeline.run(&job, &progress).await,
        }
    })
}

fn task_failure(e: JoinError) -> PipelineResult {
    error!("Conversion task failed: {}", e);
    PipelineResult::failure(TASK_FAILED)
}
