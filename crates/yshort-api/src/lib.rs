//! Axum HTTP API for short clip conversion.
//!
//! This crate provides:
//! - `POST /convert` with single-response and NDJSON progress modes
//! - Input staging and direct download passthrough
//! - Health and readiness checks
//! - Request ids, security headers and Prometheus metrics

pub mod config;
pub mod emitter;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
