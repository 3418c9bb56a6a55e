//! In-memory aggregate provider.
//!
//! Reference implementation of `AggregateProvider` over a loaded `Dataset`.
//! Used by the demo server, tests and benches. Aggregates follow the
//! warehouse queries: shipment cost is `fuel_used_l * fuel_price_per_l`,
//! counts are record counts, histories hold the most recent records in
//! date order.

use std::sync::Arc;

use super::{AggregateProvider, Dataset, ProviderError};
use crate::dashboard::{self, DashboardQuery, DashboardReport};
use crate::snapshot::{
    AggregateQuery, AggregateSnapshot, LogisticsAggregates, RegionalAggregates, SalesAggregates,
};

/// Longest history handed to the trend model.
const HISTORY_LIMIT: usize = 1000;

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0u64), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        #[allow(clippy::cast_precision_loss)]
        let n = n as f64;
        sum / n
    }
}

fn count(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

/// Values ordered by date, oldest first, keeping the newest `HISTORY_LIMIT`.
fn history<T>(records: &[T], date: impl Fn(&T) -> chrono::NaiveDate, value: impl Fn(&T) -> f64) -> Vec<f64> {
    let mut dated: Vec<_> = records.iter().map(|r| (date(r), value(r))).collect();
    dated.sort_by_key(|(d, _)| *d);
    let skip = dated.len().saturating_sub(HISTORY_LIMIT);
    dated.into_iter().skip(skip).map(|(_, v)| v).collect()
}

/// Aggregate provider over an in-memory dataset.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    dataset: Arc<Dataset>,
}

impl InMemoryProvider {
    #[must_use]
    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset: Arc::new(dataset),
        }
    }

    #[must_use]
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    fn logistics(&self) -> LogisticsAggregates {
        let ds = &*self.dataset;
        let shipments = &ds.shipments;
        LogisticsAggregates {
            avg_cost: mean(shipments.iter().map(super::ShipmentRecord::cost)),
            shipment_count: count(shipments.len()),
            avg_fuel_price: mean(shipments.iter().map(|s| s.fuel_price_per_l)),
            avg_delay_hr: mean(shipments.iter().map(|s| s.delay_hr)),
            total_revenue: ds.sales.iter().map(|s| s.revenue).sum(),
            data_points: count(shipments.len()),
            cost_history: history(shipments, |s| s.date, super::ShipmentRecord::cost),
        }
    }

    fn sales(&self) -> SalesAggregates {
        let sales = &self.dataset.sales;
        let avg_revenue = mean(sales.iter().map(|s| s.revenue));
        let order_count = count(sales.len());
        #[allow(clippy::cast_precision_loss)]
        let total_revenue = avg_revenue * order_count as f64;
        #[allow(clippy::cast_precision_loss)]
        let avg_units_sold = mean(sales.iter().map(|s| s.units_sold as f64));
        SalesAggregates {
            avg_revenue,
            order_count,
            total_revenue,
            avg_units_sold,
            data_points: order_count,
            revenue_history: history(sales, |s| s.date, |s| s.revenue),
        }
    }

    fn regional(&self, location: &str) -> RegionalAggregates {
        let wanted = location.trim();
        let matching: Vec<_> = self
            .dataset
            .shipments
            .iter()
            .filter(|s| s.region.trim().eq_ignore_ascii_case(wanted))
            .collect();
        RegionalAggregates {
            location: wanted.to_string(),
            avg_cost: mean(matching.iter().map(|s| s.cost())),
            shipment_count: count(matching.len()),
            data_points: count(matching.len()),
        }
    }
}

impl AggregateProvider for InMemoryProvider {
    fn snapshot(&self, query: &AggregateQuery) -> Result<AggregateSnapshot, ProviderError> {
        Ok(match query {
            AggregateQuery::Logistics => AggregateSnapshot::Logistics(self.logistics()),
            AggregateQuery::Sales => AggregateSnapshot::Sales(self.sales()),
            AggregateQuery::Regional { location } => {
                AggregateSnapshot::Regional(self.regional(location))
            }
        })
    }

    fn dashboard(&self, query: &DashboardQuery) -> Result<DashboardReport, ProviderError> {
        Ok(dashboard::build_report(&self.dataset, query))
    }
}
