//! Input staging.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StageInputRequest {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageInputResponse {
    pub gcs_input_path: String,
}

/// `POST /inputs`: copy a remote video into storage for a later
/// `gcsInputPath` conversion.
pub async fn stage_input(
    State(state): State<AppState>,
    payload: Result<Json<StageInputRequest>, JsonRejection>,
) -> ApiResult<Json<StageInputResponse>> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let url = request
        .url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing url parameter"))?;

    let gcs_input_path = state.pipeline.stage_input(&url).await?;
    Ok(Json(StageInputResponse { gcs_input_path }))
}
