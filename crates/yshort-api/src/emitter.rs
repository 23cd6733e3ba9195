//! NDJSON progress streaming.
//!
//! Each [`PipelineEvent`] becomes one line of JSON. The body ends after the
//! terminal result, or when every reporter has been dropped.

use std::convert::Infallible;

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::stream;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::warn;

use yshort_models::PipelineEvent;

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Encode one event as a line, falling back to a failure record.
pub fn encode_line(event: &PipelineEvent) -> String {
    match event.to_ndjson_line() {
        Ok(line) => line,
        Err(e) => {
            warn!("Failed to encode progress event: {}", e);
            let mut line = serde_json::json!({ "success": false, "error": e.to_string() }).to_string();
            line.push('\n');
            line
        }
    }
}

/// Streaming response carrying every event received on `events`.
pub fn ndjson_response(events: UnboundedReceiver<PipelineEvent>) -> Response {
    let lines = stream::unfold(Some(events), |events| async move {
        let mut events = events?;
        let event = events.recv().await?;
        let next = (!event.is_terminal()).then_some(events);
        Some((Ok::<_, Infallible>(encode_line(&event)), next))
    });

    let mut response = (StatusCode::OK, Body::from_stream(lines)).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(NDJSON_CONTENT_TYPE));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    response
}
