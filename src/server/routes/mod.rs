//! REST route modules
//!
//! Thin handlers over the datastore and agents; anything worth telling
//! connected clients about is pushed through the connection registry.

pub mod competitor_routes;
pub mod report_routes;
pub mod trend_routes;

use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

/// Uniform error body for route handlers.
pub fn api_error(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "detail": message.into() })))
}

/// Result alias used by all route handlers.
pub type ApiResult<T> = Result<T, (StatusCode, Json<Value>)>;
