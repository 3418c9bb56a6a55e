//! Flat-file dataset backing the in-memory provider.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One logistics shipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentRecord {
    pub date: NaiveDate,
    pub route_id: String,
    pub region: String,
    pub fuel_used_l: f64,
    pub fuel_price_per_l: f64,
    #[serde(default)]
    pub delay_hr: f64,
    #[serde(default)]
    pub shipment_volume_tons: f64,
}

impl ShipmentRecord {
    /// Fuel cost of the shipment.
    #[must_use]
    pub fn cost(&self) -> f64 {
        self.fuel_used_l * self.fuel_price_per_l
    }
}

/// One sales order line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub date: NaiveDate,
    pub order_id: String,
    pub product_id: String,
    pub region: String,
    pub units_sold: u64,
    pub unit_price: f64,
    pub revenue: f64,
}

/// One finance ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinanceRecord {
    pub date: NaiveDate,
    pub amount: f64,
    #[serde(default)]
    pub category: String,
}

/// Shipments, sales and finance entries loaded from JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub shipments: Vec<ShipmentRecord>,
    #[serde(default)]
    pub sales: Vec<SaleRecord>,
    #[serde(default)]
    pub finance: Vec<FinanceRecord>,
}

impl Dataset {
    /// Parses a dataset from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dataset` if the document does not match the
    /// record layout.
    pub fn from_json_str(source: &str, json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Dataset {
            path: source.to_string(),
            reason: e.to_string(),
        })
    }

    /// Reads and parses a dataset file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dataset` if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Dataset {
            path: display.clone(),
            reason: e.to_string(),
        })?;
        Self::from_json_str(&display, &json)
    }

    #[must_use]
    pub fn record_count(&self) -> usize {
        self.shipments.len() + self.sales.len() + self.finance.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }
}
