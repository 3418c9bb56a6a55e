use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::warn;

use super::response::error_response;
use super::AppState;
use crate::dashboard::{DashboardKind, DashboardQuery};
use crate::error::{InsightError, InsightResult, ValidationError};
use crate::scenario::ScenarioRequest;

async fn blocking<T, F>(f: F) -> InsightResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> InsightResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| InsightError::internal(format!("worker task failed: {e}")))?
}

fn parse_body(body: &Bytes) -> InsightResult<ScenarioRequest> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ValidationError::invalid("body", format!("malformed JSON: {e}")))?;
    Ok(ScenarioRequest::from_json(&value)?)
}

pub(crate) async fn simulate_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let request = match parse_body(&body) {
        Ok(r) => r,
        Err(err) => return error_response(&err, None),
    };
    let runtime = state.runtime.clone();
    match blocking(move || runtime.simulate(request)).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(err) => {
            if !err.is_validation() {
                warn!(error = %err, "simulation request failed");
            }
            error_response(&err, None)
        }
    }
}

pub(crate) async fn data_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let query = match DashboardQuery::parse(
        params.get("type").map(String::as_str),
        params.get("days").map(String::as_str),
    ) {
        Ok(q) => q,
        Err(err) => {
            let extra = matches!(err, ValidationError::UnknownQuery { .. })
                .then(|| ("available_types", json!(DashboardKind::available())));
            return error_response(&InsightError::from(err), extra);
        }
    };
    let runtime = state.runtime.clone();
    match blocking(move || runtime.dashboard(query)).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => {
            warn!(kind = %query.kind, error = %err, "dashboard request failed");
            error_response(&err, None)
        }
    }
}

pub(crate) async fn healthz_handler(State(state): State<AppState>) -> Response {
    let config = state.runtime.config();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "workers": config.workers,
        "queue_capacity": config.queue_capacity,
        "queue_depth": state.runtime.queue_depth(),
    }))
    .into_response()
}

pub(crate) async fn not_found_handler() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": {
                "code": "not_found",
                "message": "no such route",
                "retryable": false,
            }
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_body_names_body_field() {
        let err = parse_body(&Bytes::from_static(b"{not json")).unwrap_err();
        assert_eq!(err.field(), Some("body"));

        let err = parse_body(&Bytes::from_static(b"[1,2]")).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn body_parses_into_request() {
        let req = parse_body(&Bytes::from_static(
            br#"{"type":"fuel_price","parameters":{"fuel_increase_percent":10}}"#,
        ))
        .unwrap();
        assert_eq!(req.scenario_type.as_deref(), Some("fuel_price"));
    }
}
