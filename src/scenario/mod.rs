//! Scenario requests and their typed form.
//!
//! A `ScenarioRequest` is what arrives on the wire: a scenario label and a
//! loose parameter map. Parsing turns it into a `Scenario`, a closed sum
//! type whose variants carry validated parameters. Everything downstream
//! works with `Scenario` only.

mod params;

pub use params::{
    DemandForecastParams, FuelPriceParams, OptimizationType, RouteOptimizationParams,
    WarehouseExpansionParams,
};

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::snapshot::AggregateQuery;
use params::ParamReader;

/// The four simulation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    FuelPrice,
    DemandForecast,
    WarehouseExpansion,
    RouteOptimization,
}

impl ScenarioKind {
    /// All scenario kinds, in wire order.
    pub const ALL: [Self; 4] = [
        Self::FuelPrice,
        Self::DemandForecast,
        Self::WarehouseExpansion,
        Self::RouteOptimization,
    ];

    /// Wire identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FuelPrice => "fuel_price",
            Self::DemandForecast => "demand_forecast",
            Self::WarehouseExpansion => "warehouse_expansion",
            Self::RouteOptimization => "route_optimization",
        }
    }

    /// Human-readable label returned to the dashboard.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::FuelPrice => "Fuel Price Increase",
            Self::DemandForecast => "Demand Forecast",
            Self::WarehouseExpansion => "Warehouse Expansion",
            Self::RouteOptimization => "Route Optimization",
        }
    }

    /// Parses a wire identifier.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::UnknownScenario` for unrecognized labels.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| ValidationError::UnknownScenario {
                value: s.to_string(),
            })
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An incoming simulation request, as received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRequest {
    /// Scenario label (`fuel_price`, ...).
    #[serde(rename = "type", default)]
    pub scenario_type: Option<String>,

    /// Scenario-specific inputs.
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl ScenarioRequest {
    /// Creates a request from a label and a parameter map.
    #[must_use]
    pub fn new(scenario_type: impl Into<String>, parameters: Map<String, Value>) -> Self {
        Self {
            scenario_type: Some(scenario_type.into()),
            parameters,
        }
    }

    /// Builds a request from an arbitrary JSON body.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the body is not an object, `type` is
    /// not a string, or `parameters` is not an object.
    pub fn from_json(body: &Value) -> Result<Self, ValidationError> {
        let obj = body
            .as_object()
            .ok_or_else(|| ValidationError::invalid("body", "expected a JSON object"))?;

        let scenario_type = match obj.get("type") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => return Err(ValidationError::invalid("type", "expected a string")),
        };

        let parameters = match obj.get("parameters") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(m)) => m.clone(),
            Some(_) => {
                return Err(ValidationError::invalid("parameters", "expected a JSON object"))
            }
        };

        Ok(Self {
            scenario_type,
            parameters,
        })
    }

    /// Validates the request into a typed scenario.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` naming the offending field.
    pub fn parse(&self) -> Result<Scenario, ValidationError> {
        let label = self
            .scenario_type
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ValidationError::missing("type"))?;
        let kind = ScenarioKind::parse(label)?;
        let reader = ParamReader::new(&self.parameters);

        Ok(match kind {
            ScenarioKind::FuelPrice => Scenario::FuelPrice(FuelPriceParams::read(&reader)?),
            ScenarioKind::DemandForecast => {
                Scenario::DemandForecast(DemandForecastParams::read(&reader)?)
            }
            ScenarioKind::WarehouseExpansion => {
                Scenario::WarehouseExpansion(WarehouseExpansionParams::read(&reader)?)
            }
            ScenarioKind::RouteOptimization => {
                Scenario::RouteOptimization(RouteOptimizationParams::read(&reader)?)
            }
        })
    }
}

/// A validated scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "parameters", rename_all = "snake_case")]
pub enum Scenario {
    FuelPrice(FuelPriceParams),
    DemandForecast(DemandForecastParams),
    WarehouseExpansion(WarehouseExpansionParams),
    RouteOptimization(RouteOptimizationParams),
}

impl Scenario {
    #[must_use]
    pub const fn kind(&self) -> ScenarioKind {
        match self {
            Self::FuelPrice(_) => ScenarioKind::FuelPrice,
            Self::DemandForecast(_) => ScenarioKind::DemandForecast,
            Self::WarehouseExpansion(_) => ScenarioKind::WarehouseExpansion,
            Self::RouteOptimization(_) => ScenarioKind::RouteOptimization,
        }
    }

    /// The aggregate snapshot this scenario needs from the provider.
    #[must_use]
    pub fn aggregate_query(&self) -> AggregateQuery {
        match self {
            Self::FuelPrice(_) | Self::RouteOptimization(_) => AggregateQuery::Logistics,
            Self::DemandForecast(_) => AggregateQuery::Sales,
            Self::WarehouseExpansion(p) => AggregateQuery::Regional {
                location: p.location.clone(),
            },
        }
    }

    /// Normalized parameters (defaults applied) for echoing back.
    #[must_use]
    pub fn parameters_json(&self) -> Value {
        let value = match self {
            Self::FuelPrice(p) => serde_json::to_value(p),
            Self::DemandForecast(p) => serde_json::to_value(p),
            Self::WarehouseExpansion(p) => serde_json::to_value(p),
            Self::RouteOptimization(p) => serde_json::to_value(p),
        };
        // Plain structs of numbers, strings and bools always serialize.
        value.unwrap_or(Value::Null)
    }
}
