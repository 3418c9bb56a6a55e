use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{ExecutionError, InsightError, ValidationError};

/// Wire form of an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub retryable: bool,
}

impl From<&InsightError> for ApiError {
    fn from(err: &InsightError) -> Self {
        Self {
            code: code_for(err),
            message: err.to_string(),
            field: err.field().map(ToString::to_string),
            retryable: err.is_retryable(),
        }
    }
}

const fn validation_code(err: &ValidationError) -> &'static str {
    match err {
        ValidationError::MissingField { .. } => "missing_parameter",
        ValidationError::OutOfRange { .. } => "out_of_range",
        ValidationError::InvalidValue { .. } => "invalid_parameter",
        ValidationError::UnknownScenario { .. } => "unknown_scenario",
        ValidationError::UnknownQuery { .. } => "unknown_query",
    }
}

const fn code_for(err: &InsightError) -> &'static str {
    match err {
        InsightError::Validation(v) => validation_code(v),
        InsightError::Execution(e) => match e {
            ExecutionError::UpstreamUnavailable { .. } => "upstream_unavailable",
            ExecutionError::Timeout { .. } => "timeout",
            ExecutionError::QueueFull { .. } => "queue_full",
            ExecutionError::Disconnected | ExecutionError::SnapshotMismatch { .. } => "internal",
        },
        InsightError::Config(_) | InsightError::Internal { .. } => "internal",
    }
}

/// HTTP status for an error.
#[must_use]
pub const fn status_for(err: &InsightError) -> StatusCode {
    match err {
        InsightError::Validation(_) => StatusCode::BAD_REQUEST,
        InsightError::Execution(
            ExecutionError::UpstreamUnavailable { .. }
            | ExecutionError::Timeout { .. }
            | ExecutionError::QueueFull { .. },
        ) => StatusCode::SERVICE_UNAVAILABLE,
        InsightError::Execution(_) | InsightError::Config(_) | InsightError::Internal { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Renders an error as `{"error": {...}}`, merging `extra` top-level keys.
pub(crate) fn error_response(err: &InsightError, extra: Option<(&str, Value)>) -> Response {
    let status = status_for(err);
    let mut body = json!({ "error": ApiError::from(err) });
    if let (Some((key, value)), Some(obj)) = (extra, body.as_object_mut()) {
        obj.insert(key.to_string(), value);
    }
    let mut resp = (status, Json(body)).into_response();
    if status == StatusCode::SERVICE_UNAVAILABLE {
        resp.headers_mut()
            .insert("retry-after", HeaderValue::from_static("1"));
    }
    resp
}
