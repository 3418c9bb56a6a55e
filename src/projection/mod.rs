//! Scenario projection engine.
//!
//! Converts a validated `Scenario` plus its `AggregateSnapshot` into a
//! `ProjectionResult`. Every computation here is a pure function of its
//! inputs and the engine policy: no clocks, no randomness, no shared state.
//! Running the same scenario against the same snapshot twice serializes to
//! the same bytes.

mod demand;
mod fuel;
mod route;
mod warehouse;

pub mod recommend;
pub mod trend;

pub use demand::DemandForecastMetrics;
pub use fuel::FuelPriceMetrics;
pub use recommend::{Recommendation, RecommendationKind};
pub use route::RouteOptimizationMetrics;
pub use trend::{ModelInfo, TrendDirection};
pub use warehouse::{Payback, WarehouseExpansionMetrics};

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::confidence::{Confidence, ConfidencePolicy};
use crate::error::{ExecutionError, InsightError, InsightResult};
use crate::provider::AggregateProvider;
use crate::scenario::{Scenario, ScenarioRequest};
use crate::snapshot::AggregateSnapshot;

/// Heuristics that shape confidence and recommendations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionPolicy {
    pub confidence: ConfidencePolicy,
    /// Fuel impact above this share of revenue raises a margin warning.
    pub revenue_warning_fraction: f64,
    /// Fuel increases above this percentage are "high impact".
    pub high_impact_fuel_percent: f64,
    /// Demand growth above this percentage suggests more warehouse capacity.
    pub expansion_growth_percent: f64,
}

impl Default for ProjectionPolicy {
    fn default() -> Self {
        Self {
            confidence: ConfidencePolicy::default(),
            revenue_warning_fraction: 0.05,
            high_impact_fuel_percent: 15.0,
            expansion_growth_percent: 25.0,
        }
    }
}

/// Wire names of a series' columns. Each scenario labels its monthly
/// value, running total and baseline in its own terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesKeys {
    pub value: &'static str,
    pub cumulative: &'static str,
    pub baseline: &'static str,
}

impl SeriesKeys {
    pub const GENERIC: Self = Self {
        value: "value",
        cumulative: "cumulative",
        baseline: "baseline",
    };
}

/// One period of a projection time series.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    /// 1-based month index.
    pub month: u32,
    pub label: String,
    /// Projected value for the month.
    pub value: f64,
    /// Running total up to and including this month.
    pub cumulative: Option<f64>,
    /// Value without the scenario applied.
    pub baseline: Option<f64>,
    pub optimistic: Option<f64>,
    pub pessimistic: Option<f64>,
    pub keys: SeriesKeys,
}

impl SeriesPoint {
    pub(crate) fn new(month: u32, value: f64) -> Self {
        Self {
            month,
            label: format!("Month {month}"),
            value,
            cumulative: None,
            baseline: None,
            optimistic: None,
            pessimistic: None,
            keys: SeriesKeys::GENERIC,
        }
    }

    pub(crate) const fn named(mut self, keys: SeriesKeys) -> Self {
        self.keys = keys;
        self
    }

    pub(crate) fn cumulative(mut self, total: f64) -> Self {
        self.cumulative = Some(total);
        self
    }

    pub(crate) fn baseline(mut self, baseline: f64) -> Self {
        self.baseline = Some(baseline);
        self
    }

    /// Adds a symmetric band of `fraction` around the value, floored at zero.
    pub(crate) fn band(mut self, fraction: f64) -> Self {
        let spread = self.value.abs() * fraction;
        self.optimistic = Some((self.value - spread).max(0.0));
        self.pessimistic = Some(self.value + spread);
        self
    }
}

impl Serialize for SeriesPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("month", &self.month)?;
        map.serialize_entry("label", &self.label)?;
        map.serialize_entry(self.keys.value, &self.value)?;
        if let Some(total) = self.cumulative {
            map.serialize_entry(self.keys.cumulative, &total)?;
        }
        if let Some(baseline) = self.baseline {
            map.serialize_entry(self.keys.baseline, &baseline)?;
        }
        if let Some(optimistic) = self.optimistic {
            map.serialize_entry("optimistic_scenario", &optimistic)?;
        }
        if let Some(pessimistic) = self.pessimistic {
            map.serialize_entry("pessimistic_scenario", &pessimistic)?;
        }
        map.end()
    }
}

/// Scenario-specific scalar metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProjectionMetrics {
    FuelPrice(FuelPriceMetrics),
    DemandForecast(DemandForecastMetrics),
    WarehouseExpansion(WarehouseExpansionMetrics),
    RouteOptimization(RouteOptimizationMetrics),
}

impl ProjectionMetrics {
    #[must_use]
    pub const fn as_fuel_price(&self) -> Option<&FuelPriceMetrics> {
        match self {
            Self::FuelPrice(m) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_demand_forecast(&self) -> Option<&DemandForecastMetrics> {
        match self {
            Self::DemandForecast(m) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_warehouse_expansion(&self) -> Option<&WarehouseExpansionMetrics> {
        match self {
            Self::WarehouseExpansion(m) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_route_optimization(&self) -> Option<&RouteOptimizationMetrics> {
        match self {
            Self::RouteOptimization(m) => Some(m),
            _ => None,
        }
    }
}

/// Computed body of a projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionBody {
    #[serde(flatten)]
    pub metrics: ProjectionMetrics,
    pub monthly_breakdown: Vec<SeriesPoint>,
    pub recommendations: Vec<Recommendation>,
    pub confidence: Confidence,
    /// Set when the snapshot was too thin to trust the figures.
    pub low_confidence: bool,
    /// BLAKE3 digest of the scenario and snapshot that produced this body.
    pub fingerprint: String,
}

/// Result of one simulation run, in wire shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionResult {
    /// Human-readable scenario label.
    pub scenario: String,
    /// Normalized input parameters.
    pub parameters: Value,
    pub result: ProjectionBody,
}

/// What a scenario module hands back before assembly.
pub(crate) struct Outcome {
    pub metrics: ProjectionMetrics,
    pub series: Vec<SeriesPoint>,
    pub recommendations: Vec<Recommendation>,
    pub confidence: Confidence,
    /// The scenario itself judged its inputs insufficient.
    pub insufficient_data: bool,
}

/// Replaces non-finite provider values with zero.
pub(crate) fn finite(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// Stable digest of the inputs of a projection.
///
/// # Errors
///
/// Returns an internal error if the inputs cannot be serialized.
pub fn fingerprint(scenario: &Scenario, snapshot: &AggregateSnapshot) -> InsightResult<String> {
    let bytes = serde_json::to_vec(&(scenario, snapshot))
        .map_err(|e| InsightError::internal(format!("failed to serialize projection inputs: {e}")))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// Stateless projection engine.
#[derive(Debug, Clone, Default)]
pub struct ProjectionEngine {
    policy: ProjectionPolicy,
}

impl ProjectionEngine {
    #[must_use]
    pub const fn new(policy: ProjectionPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub const fn policy(&self) -> &ProjectionPolicy {
        &self.policy
    }

    /// Projects a scenario against its snapshot.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::SnapshotMismatch` when the snapshot kind does
    /// not fit the scenario.
    pub fn project(
        &self,
        scenario: &Scenario,
        snapshot: &AggregateSnapshot,
    ) -> InsightResult<ProjectionResult> {
        let outcome = match (scenario, snapshot) {
            (Scenario::FuelPrice(p), AggregateSnapshot::Logistics(s)) => {
                fuel::project(p, s, &self.policy)
            }
            (Scenario::DemandForecast(p), AggregateSnapshot::Sales(s)) => {
                demand::project(p, s, &self.policy)
            }
            (Scenario::WarehouseExpansion(p), AggregateSnapshot::Regional(s)) => {
                warehouse::project(p, s, &self.policy)
            }
            (Scenario::RouteOptimization(p), AggregateSnapshot::Logistics(s)) => {
                route::project(p, s, &self.policy)
            }
            _ => {
                return Err(ExecutionError::SnapshotMismatch {
                    scenario: scenario.kind().to_string(),
                    actual: snapshot.kind().to_string(),
                }
                .into())
            }
        };

        let Outcome {
            metrics,
            series,
            mut recommendations,
            confidence,
            insufficient_data,
        } = outcome;

        let low_confidence = insufficient_data || self.policy.confidence.is_low(&confidence);
        if low_confidence {
            recommendations.push(
                Recommendation::info(
                    "Limited Historical Data",
                    format!(
                        "Projection is based on {} records; treat the figures as indicative",
                        snapshot.data_points()
                    ),
                )
                .with_action("Load more history before acting on this scenario"),
            );
        }

        Ok(ProjectionResult {
            scenario: scenario.kind().label().to_string(),
            parameters: scenario.parameters_json(),
            result: ProjectionBody {
                metrics,
                monthly_breakdown: series,
                recommendations,
                confidence,
                low_confidence,
                fingerprint: fingerprint(scenario, snapshot)?,
            },
        })
    }

    /// Validates a request, fetches its snapshot and projects it.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad input, or an execution error if
    /// the provider fails.
    pub fn run(
        &self,
        request: &ScenarioRequest,
        provider: &dyn AggregateProvider,
    ) -> InsightResult<ProjectionResult> {
        let scenario = request.parse()?;
        let snapshot = provider.snapshot(&scenario.aggregate_query())?;
        self.project(&scenario, &snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::FuelPriceParams;
    use crate::snapshot::{LogisticsAggregates, SalesAggregates};

    fn fuel() -> Scenario {
        Scenario::FuelPrice(FuelPriceParams {
            fuel_increase_percent: 10.0,
            time_horizon_months: 3,
            fuel_cost_ratio: 30.0,
            use_ml_predictions: false,
        })
    }

    #[test]
    fn mismatched_snapshot_is_rejected() {
        let engine = ProjectionEngine::default();
        let err = engine
            .project(&fuel(), &AggregateSnapshot::Sales(SalesAggregates::default()))
            .unwrap_err();
        assert!(matches!(
            err,
            InsightError::Execution(ExecutionError::SnapshotMismatch { .. })
        ));
    }

    #[test]
    fn fingerprint_is_stable_and_input_sensitive() {
        let snap = AggregateSnapshot::Logistics(LogisticsAggregates {
            avg_cost: 1000.0,
            shipment_count: 50,
            data_points: 50,
            ..LogisticsAggregates::default()
        });
        let a = fingerprint(&fuel(), &snap).unwrap();
        let b = fingerprint(&fuel(), &snap).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let other = AggregateSnapshot::Logistics(LogisticsAggregates {
            avg_cost: 1001.0,
            shipment_count: 50,
            data_points: 50,
            ..LogisticsAggregates::default()
        });
        assert_ne!(a, fingerprint(&fuel(), &other).unwrap());
    }

    #[test]
    fn empty_snapshot_flags_low_confidence() {
        let engine = ProjectionEngine::default();
        let result = engine
            .project(&fuel(), &AggregateSnapshot::Logistics(LogisticsAggregates::default()))
            .unwrap();
        assert!(result.result.low_confidence);
        assert_eq!(result.result.confidence, Confidence::zero());
        assert!(result
            .result
            .recommendations
            .iter()
            .any(|r| r.title == "Limited Historical Data"));
    }

    #[test]
    fn band_floors_optimistic_at_zero() {
        let p = SeriesPoint::new(1, 100.0).band(0.2);
        assert_eq!(p.optimistic, Some(80.0));
        assert_eq!(p.pessimistic, Some(120.0));
        assert_eq!(p.label, "Month 1");
    }

    #[test]
    fn series_point_serializes_under_its_keys() {
        const KEYS: SeriesKeys = SeriesKeys {
            value: "monthly_cost_increase",
            cumulative: "cumulative_cost_increase",
            baseline: "unused",
        };
        let p = SeriesPoint::new(2, 100.0)
            .named(KEYS)
            .cumulative(200.0)
            .band(0.2);
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["month"], 2);
        assert_eq!(json["label"], "Month 2");
        assert_eq!(json["monthly_cost_increase"], 100.0);
        assert_eq!(json["cumulative_cost_increase"], 200.0);
        assert_eq!(json["optimistic_scenario"], 80.0);
        assert_eq!(json["pessimistic_scenario"], 120.0);
        assert!(json.get("value").is_none());
        assert!(json.get("unused").is_none());

        let plain = serde_json::to_value(SeriesPoint::new(1, 5.0)).unwrap();
        assert_eq!(plain["value"], 5.0);
        assert!(plain.get("cumulative").is_none());
    }
}
