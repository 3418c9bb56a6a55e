//! HTTP/JSON surface.
//!
//! Routes:
//! - `POST /simulate` (and `POST /`): run a scenario.
//! - `GET /data?type=&days=` (and `GET /`): dashboard reports.
//! - `GET /healthz`: liveness plus queue depth.
//! - `OPTIONS *`: CORS preflight.
//!
//! Handlers never compute anything on the async executor; they hand work to
//! the `SimulationRuntime` from tokio's blocking pool.

mod handlers;
mod response;

pub use response::{status_for, ApiError};

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::middleware::{from_fn, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tracing::{info, Instrument};

use crate::runtime::SimulationRuntime;

const MAX_REQUEST_ID_LEN: usize = 128;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<SimulationRuntime>,
    pub max_body_bytes: usize,
}

impl AppState {
    #[must_use]
    pub fn new(runtime: Arc<SimulationRuntime>) -> Self {
        Self {
            runtime,
            max_body_bytes: 64 * 1024,
        }
    }

    #[must_use]
    pub const fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

/// Builds the service router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/",
            get(handlers::data_handler).post(handlers::simulate_handler),
        )
        .route("/simulate", post(handlers::simulate_handler))
        .route("/data", get(handlers::data_handler))
        .route("/healthz", get(handlers::healthz_handler))
        .fallback(handlers::not_found_handler)
        .layer(from_fn(request_middleware))
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .with_state(state)
}

/// Accepts a caller-supplied request id if it is short printable ASCII.
fn request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| {
            !v.is_empty()
                && v.len() <= MAX_REQUEST_ID_LEN
                && v.bytes().all(|b| b.is_ascii_graphic())
        })
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), ToString::to_string)
}

fn apply_cors(headers: &mut HeaderMap) {
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET,POST,OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("content-type,authorization,x-api-key,x-request-id"),
    );
}

async fn request_middleware(request: Request<Body>, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let route = request.uri().path().to_string();
    let request_id = request_id(request.headers());

    let span = tracing::info_span!(
        "http.request",
        request_id = %request_id,
        method = %method,
        route = %route,
    );

    let mut response = if method == Method::OPTIONS {
        (StatusCode::OK, Json(json!({}))).into_response()
    } else {
        next.run(request).instrument(span.clone()).await
    };

    span.in_scope(|| {
        info!(
            status = response.status().as_u16(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "request completed"
        );
    });

    apply_cors(response.headers_mut());
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}
