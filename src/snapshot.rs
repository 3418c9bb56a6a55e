//! Aggregate snapshots consumed by the projection engine.
//!
//! A snapshot is a read-only bundle of summary statistics fetched for one
//! request. It never outlives that request.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What the engine asks the provider for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregateQuery {
    /// Fleet-wide shipment statistics.
    Logistics,
    /// Order and revenue statistics.
    Sales,
    /// Shipment statistics restricted to one region.
    Regional { location: String },
}

impl fmt::Display for AggregateQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Logistics => write!(f, "logistics"),
            Self::Sales => write!(f, "sales"),
            Self::Regional { location } => write!(f, "regional({location})"),
        }
    }
}

/// Fleet-wide shipment statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogisticsAggregates {
    /// Mean fuel cost per shipment (`fuel_used_l * fuel_price_per_l`).
    pub avg_cost: f64,
    /// Shipments per month.
    pub shipment_count: u64,
    pub avg_fuel_price: f64,
    pub avg_delay_hr: f64,
    /// Sales revenue over the same period, for impact thresholds.
    pub total_revenue: f64,
    /// Records that fed the averages.
    pub data_points: u64,
    /// Per-shipment cost, oldest first.
    #[serde(default)]
    pub cost_history: Vec<f64>,
}

/// Order and revenue statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesAggregates {
    pub avg_revenue: f64,
    pub order_count: u64,
    /// Current monthly revenue (`avg_revenue * order_count`).
    pub total_revenue: f64,
    pub avg_units_sold: f64,
    pub data_points: u64,
    /// Per-order revenue, oldest first.
    #[serde(default)]
    pub revenue_history: Vec<f64>,
}

/// Shipment statistics for a single region.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionalAggregates {
    pub location: String,
    pub avg_cost: f64,
    /// Regional shipments per month.
    pub shipment_count: u64,
    pub data_points: u64,
}

/// Snapshot returned by an `AggregateProvider`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregateSnapshot {
    Logistics(LogisticsAggregates),
    Sales(SalesAggregates),
    Regional(RegionalAggregates),
}

impl AggregateSnapshot {
    /// Short name of the snapshot kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Logistics(_) => "logistics",
            Self::Sales(_) => "sales",
            Self::Regional(_) => "regional",
        }
    }

    /// Number of records behind the snapshot.
    #[must_use]
    pub const fn data_points(&self) -> u64 {
        match self {
            Self::Logistics(a) => a.data_points,
            Self::Sales(a) => a.data_points,
            Self::Regional(a) => a.data_points,
        }
    }

    /// True when no underlying records were found.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.data_points() == 0
    }
}
