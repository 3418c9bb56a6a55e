//! Typed, range-checked parameter sets for each scenario.
//!
//! Wire values are percentages as the dashboard sliders send them. The
//! structs keep the wire units so they can be echoed back verbatim, and
//! expose fraction accessors for the formulas.

use std::ops::RangeInclusive;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

const MAX_LOCATION_LEN: usize = 64;

static LOCATION_RE: OnceLock<regex::Regex> = OnceLock::new();

fn location_re() -> &'static regex::Regex {
    LOCATION_RE.get_or_init(|| {
        regex::Regex::new(r"^[A-Za-z][A-Za-z .'\-]*$").expect("static location pattern")
    })
}

/// Read-only view over the raw `parameters` object of a request.
///
/// Unknown keys are ignored. Numeric fields accept JSON numbers or numeric
/// strings; `null` counts as absent.
pub(crate) struct ParamReader<'a> {
    params: &'a Map<String, Value>,
}

impl<'a> ParamReader<'a> {
    pub(crate) const fn new(params: &'a Map<String, Value>) -> Self {
        Self { params }
    }

    fn raw(&self, key: &str) -> Option<&'a Value> {
        self.params.get(key).filter(|v| !v.is_null())
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.raw(key).is_some()
    }

    fn number(&self, key: &str) -> Result<Option<f64>, ValidationError> {
        let Some(value) = self.raw(key) else {
            return Ok(None);
        };
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match parsed {
            Some(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(ValidationError::invalid(key, "expected a finite number")),
        }
    }

    fn check_range(key: &str, value: f64, range: &RangeInclusive<f64>) -> Result<f64, ValidationError> {
        if range.contains(&value) {
            Ok(value)
        } else {
            Err(ValidationError::OutOfRange {
                field: key.to_string(),
                value,
                min: *range.start(),
                max: *range.end(),
            })
        }
    }

    pub(crate) fn required_number(
        &self,
        key: &str,
        range: &RangeInclusive<f64>,
    ) -> Result<f64, ValidationError> {
        let value = self.number(key)?.ok_or_else(|| ValidationError::missing(key))?;
        Self::check_range(key, value, range)
    }

    pub(crate) fn number_or(
        &self,
        key: &str,
        default: f64,
        range: &RangeInclusive<f64>,
    ) -> Result<f64, ValidationError> {
        let value = self.number(key)?.unwrap_or(default);
        Self::check_range(key, value, range)
    }

    pub(crate) fn months_or(
        &self,
        key: &str,
        default: u32,
        range: RangeInclusive<u32>,
    ) -> Result<u32, ValidationError> {
        let value = self.number(key)?.unwrap_or(f64::from(default));
        if value.fract() != 0.0 {
            return Err(ValidationError::invalid(key, "expected a whole number of months"));
        }
        let bounds = f64::from(*range.start())..=f64::from(*range.end());
        let value = Self::check_range(key, value, &bounds)?;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(value as u32)
    }

    pub(crate) fn flag_or(&self, key: &str, default: bool) -> Result<bool, ValidationError> {
        match self.raw(key) {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" => Ok(false),
                _ => Err(ValidationError::invalid(key, "expected a boolean")),
            },
            Some(Value::Number(n)) => match n.as_u64() {
                Some(0) => Ok(false),
                Some(1) => Ok(true),
                _ => Err(ValidationError::invalid(key, "expected a boolean")),
            },
            Some(_) => Err(ValidationError::invalid(key, "expected a boolean")),
        }
    }

    pub(crate) fn string(&self, key: &str) -> Result<Option<&'a str>, ValidationError> {
        match self.raw(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.trim())),
            Some(_) => Err(ValidationError::invalid(key, "expected a string")),
        }
    }
}

fn percent_to_fraction(pct: f64) -> f64 {
    pct / 100.0
}

/// Parameters for the `fuel_price` scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelPriceParams {
    /// Fuel price increase, percent (0-50).
    pub fuel_increase_percent: f64,
    /// Projection horizon in months (1-24).
    pub time_horizon_months: u32,
    /// Share of logistics cost attributable to fuel, percent (0-100).
    pub fuel_cost_ratio: f64,
    /// Apply the trend model to the shipment cost history.
    pub use_ml_predictions: bool,
}

impl FuelPriceParams {
    pub const INCREASE_RANGE: RangeInclusive<f64> = 0.0..=50.0;
    pub const HORIZON_RANGE: RangeInclusive<u32> = 1..=24;
    pub const RATIO_RANGE: RangeInclusive<f64> = 0.0..=100.0;

    pub(crate) fn read(reader: &ParamReader<'_>) -> Result<Self, ValidationError> {
        Ok(Self {
            fuel_increase_percent: reader
                .required_number("fuel_increase_percent", &Self::INCREASE_RANGE)?,
            time_horizon_months: reader.months_or("time_horizon_months", 12, Self::HORIZON_RANGE)?,
            fuel_cost_ratio: reader.number_or("fuel_cost_ratio", 30.0, &Self::RATIO_RANGE)?,
            use_ml_predictions: reader.flag_or("use_ml_predictions", false)?,
        })
    }

    #[must_use]
    pub fn fuel_increase(&self) -> f64 {
        percent_to_fraction(self.fuel_increase_percent)
    }

    #[must_use]
    pub fn fuel_cost_fraction(&self) -> f64 {
        percent_to_fraction(self.fuel_cost_ratio)
    }
}

/// Parameters for the `demand_forecast` scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandForecastParams {
    /// Demand change, percent (-50 to 100).
    pub demand_increase_percent: f64,
    /// Projection horizon in months (1-24).
    pub time_horizon_months: u32,
    /// Apply the trend model to the revenue history.
    pub use_ml_predictions: bool,
}

impl DemandForecastParams {
    pub const INCREASE_RANGE: RangeInclusive<f64> = -50.0..=100.0;
    pub const HORIZON_RANGE: RangeInclusive<u32> = 1..=24;

    pub(crate) fn read(reader: &ParamReader<'_>) -> Result<Self, ValidationError> {
        Ok(Self {
            demand_increase_percent: reader
                .required_number("demand_increase_percent", &Self::INCREASE_RANGE)?,
            time_horizon_months: reader.months_or("time_horizon_months", 12, Self::HORIZON_RANGE)?,
            use_ml_predictions: reader.flag_or("use_ml_predictions", false)?,
        })
    }

    #[must_use]
    pub fn demand_increase(&self) -> f64 {
        percent_to_fraction(self.demand_increase_percent)
    }
}

/// Parameters for the `warehouse_expansion` scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseExpansionParams {
    /// Target region for the new warehouse.
    pub location: String,
    /// Up-front investment.
    pub investment_cost: f64,
    /// Regional shipping cost reduction, percent (0-100).
    pub warehouse_cost_reduction_percent: f64,
    /// Yearly cost of running the warehouse.
    pub annual_operating_cost: f64,
    /// Floor area in square feet; informational.
    pub warehouse_size: f64,
    /// Length of the net-position series in months (1-120).
    pub time_horizon_months: u32,
}

impl WarehouseExpansionParams {
    pub const INVESTMENT_RANGE: RangeInclusive<f64> = 1.0..=1.0e12;
    pub const REDUCTION_RANGE: RangeInclusive<f64> = 0.0..=100.0;
    pub const OPERATING_RANGE: RangeInclusive<f64> = 0.0..=1.0e12;
    pub const SIZE_RANGE: RangeInclusive<f64> = 1.0..=1.0e9;
    pub const HORIZON_RANGE: RangeInclusive<u32> = 1..=120;

    pub(crate) fn read(reader: &ParamReader<'_>) -> Result<Self, ValidationError> {
        let location = reader
            .string("location")?
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ValidationError::missing("location"))?;
        if location.len() > MAX_LOCATION_LEN {
            return Err(ValidationError::invalid(
                "location",
                format!("exceeds maximum length of {MAX_LOCATION_LEN}"),
            ));
        }
        if !location_re().is_match(location) {
            return Err(ValidationError::invalid(
                "location",
                "only letters, spaces, '.', '\\'' and '-' are allowed",
            ));
        }

        // Older dashboard builds send the reduction without the unit suffix.
        let reduction_key = if !reader.contains("warehouse_cost_reduction_percent")
            && reader.contains("warehouse_cost_reduction")
        {
            "warehouse_cost_reduction"
        } else {
            "warehouse_cost_reduction_percent"
        };

        Ok(Self {
            location: location.to_string(),
            investment_cost: reader.required_number("investment_cost", &Self::INVESTMENT_RANGE)?,
            warehouse_cost_reduction_percent: reader.number_or(
                reduction_key,
                25.0,
                &Self::REDUCTION_RANGE,
            )?,
            annual_operating_cost: reader.number_or(
                "annual_operating_cost",
                150_000.0,
                &Self::OPERATING_RANGE,
            )?,
            warehouse_size: reader.number_or("warehouse_size", 50_000.0, &Self::SIZE_RANGE)?,
            time_horizon_months: reader.months_or("time_horizon_months", 60, Self::HORIZON_RANGE)?,
        })
    }

    #[must_use]
    pub fn cost_reduction(&self) -> f64 {
        percent_to_fraction(self.warehouse_cost_reduction_percent)
    }
}

/// Route optimization strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationType {
    FuelEfficiency,
    TimeEfficiency,
    Balanced,
}

impl OptimizationType {
    /// All strategies, in wire order.
    pub const ALL: [Self; 3] = [Self::FuelEfficiency, Self::TimeEfficiency, Self::Balanced];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FuelEfficiency => "fuel_efficiency",
            Self::TimeEfficiency => "time_efficiency",
            Self::Balanced => "balanced",
        }
    }

    /// Fixed `(cost_savings, time_change)` fractions for the strategy.
    /// A negative time change means faster deliveries.
    #[must_use]
    pub const fn profile(self) -> (f64, f64) {
        match self {
            Self::FuelEfficiency => (0.15, 0.05),
            Self::TimeEfficiency => (0.05, -0.20),
            Self::Balanced => (0.10, -0.10),
        }
    }

    fn parse(field: &str, s: &str) -> Result<Self, ValidationError> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                ValidationError::invalid(
                    field,
                    format!("expected one of fuel_efficiency, time_efficiency, balanced; got '{s}'"),
                )
            })
    }
}

/// Parameters for the `route_optimization` scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteOptimizationParams {
    pub optimization_type: OptimizationType,
    /// Length of the cumulative-savings series in months (1-24).
    pub time_horizon_months: u32,
}

impl RouteOptimizationParams {
    pub const HORIZON_RANGE: RangeInclusive<u32> = 1..=24;

    pub(crate) fn read(reader: &ParamReader<'_>) -> Result<Self, ValidationError> {
        // Older dashboard builds send the strategy as `type`.
        let field = if reader.contains("optimization_type") {
            "optimization_type"
        } else if reader.contains("type") {
            "type"
        } else {
            return Err(ValidationError::missing("optimization_type"));
        };
        let raw = reader
            .string(field)?
            .ok_or_else(|| ValidationError::missing("optimization_type"))?;

        Ok(Self {
            optimization_type: OptimizationType::parse(field, raw)?,
            time_horizon_months: reader.months_or("time_horizon_months", 12, Self::HORIZON_RANGE)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn fuel_defaults_apply() {
        let raw = map(json!({ "fuel_increase_percent": 10 }));
        let p = FuelPriceParams::read(&ParamReader::new(&raw)).unwrap();
        assert_eq!(p.time_horizon_months, 12);
        assert!((p.fuel_cost_fraction() - 0.30).abs() < 1e-12);
        assert!((p.fuel_increase() - 0.10).abs() < 1e-12);
        assert!(!p.use_ml_predictions);
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let raw = map(json!({ "fuel_increase_percent": "12.5", "time_horizon_months": "6" }));
        let p = FuelPriceParams::read(&ParamReader::new(&raw)).unwrap();
        assert!((p.fuel_increase_percent - 12.5).abs() < 1e-12);
        assert_eq!(p.time_horizon_months, 6);
    }

    #[test]
    fn out_of_range_names_field() {
        let raw = map(json!({ "fuel_increase_percent": 80 }));
        let err = FuelPriceParams::read(&ParamReader::new(&raw)).unwrap_err();
        assert_eq!(err.field(), "fuel_increase_percent");
        assert!(matches!(err, ValidationError::OutOfRange { .. }));

        let raw = map(json!({ "fuel_increase_percent": 5, "time_horizon_months": 36 }));
        let err = FuelPriceParams::read(&ParamReader::new(&raw)).unwrap_err();
        assert_eq!(err.field(), "time_horizon_months");
    }

    #[test]
    fn fractional_months_rejected() {
        let raw = map(json!({ "fuel_increase_percent": 5, "time_horizon_months": 2.5 }));
        let err = FuelPriceParams::read(&ParamReader::new(&raw)).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { .. }));
    }

    #[test]
    fn null_counts_as_missing() {
        let raw = map(json!({ "demand_increase_percent": null }));
        let err = DemandForecastParams::read(&ParamReader::new(&raw)).unwrap_err();
        assert_eq!(err, ValidationError::missing("demand_increase_percent"));
    }

    #[test]
    fn warehouse_location_is_validated() {
        let raw = map(json!({ "location": "Toronto'; DROP TABLE sales;--", "investment_cost": 1000 }));
        let err = WarehouseExpansionParams::read(&ParamReader::new(&raw)).unwrap_err();
        assert_eq!(err.field(), "location");

        let raw = map(json!({ "location": "St. John's", "investment_cost": 1000 }));
        let p = WarehouseExpansionParams::read(&ParamReader::new(&raw)).unwrap();
        assert_eq!(p.location, "St. John's");
        assert!((p.cost_reduction() - 0.25).abs() < 1e-12);
        assert!((p.annual_operating_cost - 150_000.0).abs() < 1e-9);
    }

    #[test]
    fn warehouse_requires_investment() {
        let raw = map(json!({ "location": "Toronto" }));
        let err = WarehouseExpansionParams::read(&ParamReader::new(&raw)).unwrap_err();
        assert_eq!(err.field(), "investment_cost");
    }

    #[test]
    fn warehouse_reduction_reads_percent_key_and_legacy_alias() {
        let raw = map(json!({
            "location": "Toronto",
            "investment_cost": 1000,
            "warehouse_cost_reduction_percent": 40
        }));
        let p = WarehouseExpansionParams::read(&ParamReader::new(&raw)).unwrap();
        assert!((p.warehouse_cost_reduction_percent - 40.0).abs() < 1e-12);

        let raw = map(json!({
            "location": "Toronto",
            "investment_cost": 1000,
            "warehouse_cost_reduction": 10
        }));
        let p = WarehouseExpansionParams::read(&ParamReader::new(&raw)).unwrap();
        assert!((p.cost_reduction() - 0.10).abs() < 1e-12);

        let raw = map(json!({
            "location": "Toronto",
            "investment_cost": 1000,
            "warehouse_cost_reduction_percent": 30,
            "warehouse_cost_reduction": 10
        }));
        let p = WarehouseExpansionParams::read(&ParamReader::new(&raw)).unwrap();
        assert!((p.warehouse_cost_reduction_percent - 30.0).abs() < 1e-12);

        let raw = map(json!({
            "location": "Toronto",
            "investment_cost": 1000,
            "warehouse_cost_reduction_percent": 140
        }));
        let err = WarehouseExpansionParams::read(&ParamReader::new(&raw)).unwrap_err();
        assert_eq!(err.field(), "warehouse_cost_reduction_percent");
    }

    #[test]
    fn route_accepts_legacy_type_key() {
        let raw = map(json!({ "type": "balanced" }));
        let p = RouteOptimizationParams::read(&ParamReader::new(&raw)).unwrap();
        assert_eq!(p.optimization_type, OptimizationType::Balanced);

        let raw = map(json!({ "optimization_type": "warp_speed" }));
        let err = RouteOptimizationParams::read(&ParamReader::new(&raw)).unwrap_err();
        assert_eq!(err.field(), "optimization_type");
    }

    #[test]
    fn flags_parse_loosely() {
        let raw = map(json!({ "a": "true", "b": 0, "c": "maybe" }));
        let reader = ParamReader::new(&raw);
        assert!(reader.flag_or("a", false).unwrap());
        assert!(!reader.flag_or("b", true).unwrap());
        assert!(reader.flag_or("c", false).is_err());
        assert!(reader.flag_or("missing", true).unwrap());
    }
}
