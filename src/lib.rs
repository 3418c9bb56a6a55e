//! # InsightGrid - Scenario Projections for Logistics and Sales Analytics
//!
//! InsightGrid backs an analytics dashboard. It turns slider-driven
//! "what-if" parameters into month-by-month projections over aggregate
//! business numbers, and serves the dashboard's KPI and chart data.
//!
//! ## Core Concepts
//!
//! - **Scenario**: a validated what-if request (fuel price, demand forecast,
//!   warehouse expansion, route optimization)
//! - **AggregateSnapshot**: read-only summary statistics a scenario projects against
//! - **ProjectionResult**: scalar metrics, a monthly series, recommendations
//!   and a calibrated confidence
//! - **AggregateProvider**: the seam behind which aggregates are computed
//!
//! ## Usage
//!
//! ```rust,ignore
//! use insightgrid::{InMemoryProvider, ProjectionEngine, ScenarioRequest};
//! use serde_json::json;
//!
//! let provider = InMemoryProvider::new(dataset);
//! let request = ScenarioRequest::from_json(&json!({
//!     "type": "fuel_price",
//!     "parameters": { "fuel_increase_percent": 10, "time_horizon_months": 6 }
//! }))?;
//!
//! let result = ProjectionEngine::default().run(&request, &provider)?;
//! println!("{}", result.result.confidence);
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod confidence;
pub mod error;
pub mod scenario;
pub mod snapshot;

// Computation
pub mod dashboard;
pub mod projection;
pub mod provider;

// Serving
pub mod config;
pub mod http;
pub mod runtime;

pub use confidence::{CalibrationMode, Confidence, ConfidencePolicy};
pub use config::ServerConfig;
pub use dashboard::{DashboardKind, DashboardQuery, DashboardReport};
pub use error::{
    ConfigError, ExecutionError, InsightError, InsightResult, ValidationError,
};
pub use http::{build_router, AppState};
pub use projection::{
    ProjectionEngine, ProjectionMetrics, ProjectionPolicy, ProjectionResult, Recommendation,
    RecommendationKind, SeriesKeys, SeriesPoint,
};
pub use provider::{AggregateProvider, Dataset, InMemoryProvider, ProviderError};
pub use runtime::{ExecutionHandle, RuntimeConfig, SimulationRuntime};
pub use scenario::{Scenario, ScenarioKind, ScenarioRequest};
pub use snapshot::{AggregateQuery, AggregateSnapshot};
