//! Dashboard report queries.
//!
//! Each report mirrors one chart or KPI strip of the analytics dashboard.
//! `build_report` computes them over a `Dataset`; day windows count distinct
//! record dates, latest first, not calendar days.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::RangeInclusive;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::provider::Dataset;

/// Report families served by the data endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DashboardKind {
    Overview,
    Trends,
    Costs,
    AnalyticsKpis,
    ProductPerformance,
    RegionalPerformance,
}

impl DashboardKind {
    pub const ALL: [Self; 6] = [
        Self::Overview,
        Self::Trends,
        Self::Costs,
        Self::AnalyticsKpis,
        Self::ProductPerformance,
        Self::RegionalPerformance,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::Trends => "trends",
            Self::Costs => "costs",
            Self::AnalyticsKpis => "analytics-kpis",
            Self::ProductPerformance => "product-performance",
            Self::RegionalPerformance => "regional-performance",
        }
    }

    /// Wire names, for error responses.
    #[must_use]
    pub fn available() -> Vec<&'static str> {
        Self::ALL.iter().map(|k| k.as_str()).collect()
    }

    /// Parses a wire name. `cost-analysis` and underscore spellings are
    /// accepted as aliases.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::UnknownQuery` for unrecognized names.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        if normalized == "cost-analysis" {
            return Ok(Self::Costs);
        }
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| ValidationError::UnknownQuery {
                value: s.to_string(),
            })
    }
}

impl fmt::Display for DashboardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated dashboard request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DashboardQuery {
    pub kind: DashboardKind,
    /// Window size in distinct dates (1-365).
    pub days: u32,
}

impl DashboardQuery {
    pub const DEFAULT_DAYS: u32 = 30;
    pub const DAYS_RANGE: RangeInclusive<u32> = 1..=365;

    #[must_use]
    pub const fn new(kind: DashboardKind, days: u32) -> Self {
        Self { kind, days }
    }

    /// Builds a query from raw query-string values; `type` defaults to
    /// `overview` and `days` to 30.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an unknown type or a bad day count.
    pub fn parse(kind: Option<&str>, days: Option<&str>) -> Result<Self, ValidationError> {
        let kind = match kind.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => DashboardKind::parse(s)?,
            None => DashboardKind::Overview,
        };
        let days = match days.map(str::trim).filter(|s| !s.is_empty()) {
            None => Self::DEFAULT_DAYS,
            Some(s) => {
                let n: u32 = s
                    .parse()
                    .map_err(|_| ValidationError::invalid("days", "expected a whole number"))?;
                if !Self::DAYS_RANGE.contains(&n) {
                    return Err(ValidationError::OutOfRange {
                        field: "days".to_string(),
                        value: f64::from(n),
                        min: f64::from(*Self::DAYS_RANGE.start()),
                        max: f64::from(*Self::DAYS_RANGE.end()),
                    });
                }
                n
            }
        };
        Ok(Self { kind, days })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    pub total_revenue: f64,
    pub total_costs: f64,
    pub active_shipments: u64,
    pub total_orders: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub revenue: f64,
    pub costs: f64,
    pub profit: f64,
    pub avg_fuel_price: f64,
    /// Distinct routes active on the date.
    pub shipment_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRow {
    /// `"<region> - <route_id>"`.
    pub route: String,
    pub avg_cost: f64,
    pub avg_delay: f64,
    pub avg_fuel_price: f64,
    pub shipment_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsKpis {
    /// Percent change of the latest window against the one before it.
    pub revenue_growth: f64,
    pub avg_order_value: f64,
    pub order_volume: u64,
    /// Mean shipment delay in hours.
    pub delivery_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRow {
    pub product_id: String,
    pub total_units: u64,
    pub total_revenue: f64,
    pub avg_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRow {
    pub region: String,
    pub order_count: u64,
    pub total_revenue: f64,
}

/// A computed dashboard report, in wire shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DashboardReport {
    Overview(Overview),
    Trends { trends: Vec<TrendPoint> },
    Costs { cost_analysis: Vec<CostRow> },
    AnalyticsKpis(AnalyticsKpis),
    Products { products: Vec<ProductRow> },
    Regions { regions: Vec<RegionRow> },
}

fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        #[allow(clippy::cast_precision_loss)]
        let n = count as f64;
        sum / n
    }
}

fn count(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

fn by_value_desc(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

/// The latest `days` distinct dates among `dates`.
fn latest_dates(dates: impl Iterator<Item = NaiveDate>, days: u32) -> BTreeSet<NaiveDate> {
    let all: BTreeSet<NaiveDate> = dates.collect();
    all.into_iter().rev().take(days as usize).collect()
}

/// Computes a report over `dataset`.
#[must_use]
pub fn build_report(dataset: &Dataset, query: &DashboardQuery) -> DashboardReport {
    match query.kind {
        DashboardKind::Overview => DashboardReport::Overview(overview(dataset)),
        DashboardKind::Trends => DashboardReport::Trends {
            trends: trends(dataset, query.days),
        },
        DashboardKind::Costs => DashboardReport::Costs {
            cost_analysis: cost_analysis(dataset, query.days),
        },
        DashboardKind::AnalyticsKpis => DashboardReport::AnalyticsKpis(analytics_kpis(dataset, query.days)),
        DashboardKind::ProductPerformance => DashboardReport::Products {
            products: product_performance(dataset, query.days),
        },
        DashboardKind::RegionalPerformance => DashboardReport::Regions {
            regions: regional_performance(dataset),
        },
    }
}

fn overview(ds: &Dataset) -> Overview {
    let orders: BTreeSet<&str> = ds.sales.iter().map(|s| s.order_id.as_str()).collect();
    Overview {
        total_revenue: ds.sales.iter().map(|s| s.revenue).sum(),
        total_costs: ds.finance.iter().map(|f| f.amount).sum(),
        active_shipments: count(ds.shipments.len()),
        total_orders: count(orders.len()),
    }
}

fn trends(ds: &Dataset, days: u32) -> Vec<TrendPoint> {
    let mut revenue: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for s in &ds.sales {
        *revenue.entry(s.date).or_default() += s.revenue;
    }
    let mut costs: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for f in &ds.finance {
        *costs.entry(f.date).or_default() += f.amount;
    }
    let mut logistics: BTreeMap<NaiveDate, (f64, usize, BTreeSet<&str>)> = BTreeMap::new();
    for sh in &ds.shipments {
        let entry = logistics.entry(sh.date).or_default();
        entry.0 += sh.fuel_price_per_l;
        entry.1 += 1;
        entry.2.insert(sh.route_id.as_str());
    }

    // Revenue dates drive the series.
    revenue
        .iter()
        .rev()
        .take(days.min(365) as usize)
        .map(|(date, &rev)| {
            let cost = costs.get(date).copied().unwrap_or(0.0);
            let (avg_fuel_price, routes) = logistics
                .get(date)
                .map_or((0.0, 0), |(sum, n, routes)| (mean(*sum, *n), routes.len()));
            TrendPoint {
                date: *date,
                revenue: rev,
                costs: cost,
                profit: rev - cost,
                avg_fuel_price,
                shipment_count: count(routes),
            }
        })
        .collect()
}

fn cost_analysis(ds: &Dataset, days: u32) -> Vec<CostRow> {
    #[derive(Default)]
    struct Acc {
        cost: f64,
        delay: f64,
        fuel_price: f64,
        n: usize,
    }

    let mut groups: BTreeMap<(&str, &str), Acc> = BTreeMap::new();
    for sh in &ds.shipments {
        let acc = groups
            .entry((sh.region.as_str(), sh.route_id.as_str()))
            .or_default();
        acc.cost += sh.cost();
        acc.delay += sh.delay_hr;
        acc.fuel_price += sh.fuel_price_per_l;
        acc.n += 1;
    }

    let mut rows: Vec<CostRow> = groups
        .into_iter()
        .map(|((region, route), acc)| CostRow {
            route: format!("{region} - {route}"),
            avg_cost: mean(acc.cost, acc.n),
            avg_delay: mean(acc.delay, acc.n),
            avg_fuel_price: mean(acc.fuel_price, acc.n),
            shipment_count: count(acc.n),
        })
        .collect();
    rows.sort_by(|a, b| by_value_desc(a.avg_cost, b.avg_cost));
    rows.truncate(days.min(50) as usize);
    rows
}

fn revenue_growth(daily_latest_first: &[f64], days: usize) -> f64 {
    if days == 0 || daily_latest_first.len() < days {
        return 0.0;
    }
    let current: f64 = daily_latest_first[..days].iter().sum();
    if daily_latest_first.len() >= days * 2 {
        let previous: f64 = daily_latest_first[days..days * 2].iter().sum();
        return if previous > 0.0 {
            (current - previous) / previous * 100.0
        } else {
            0.0
        };
    }

    // Only one full window: estimate the previous one from what remains.
    let total: f64 = daily_latest_first.iter().sum();
    if total <= current || current <= 0.0 {
        return 0.0;
    }
    let remaining = (daily_latest_first.len() - days).max(1);
    #[allow(clippy::cast_precision_loss)]
    let estimate = (total - current) / remaining as f64 * days as f64;
    if estimate > 0.0 {
        (current - estimate) / estimate * 100.0
    } else {
        0.0
    }
}

fn analytics_kpis(ds: &Dataset, days: u32) -> AnalyticsKpis {
    let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for s in &ds.sales {
        *daily.entry(s.date).or_default() += s.revenue;
    }
    let daily_latest_first: Vec<f64> = daily.values().rev().copied().collect();

    let sales_window = latest_dates(ds.sales.iter().map(|s| s.date), days);
    let in_window: Vec<_> = ds
        .sales
        .iter()
        .filter(|s| sales_window.contains(&s.date))
        .collect();
    let orders: BTreeSet<&str> = in_window.iter().map(|s| s.order_id.as_str()).collect();

    let ship_window = latest_dates(ds.shipments.iter().map(|s| s.date), days);
    let delays: Vec<f64> = ds
        .shipments
        .iter()
        .filter(|s| ship_window.contains(&s.date))
        .map(|s| s.delay_hr)
        .collect();

    AnalyticsKpis {
        revenue_growth: revenue_growth(&daily_latest_first, days as usize),
        avg_order_value: mean(in_window.iter().map(|s| s.revenue).sum(), in_window.len()),
        order_volume: count(orders.len()),
        delivery_time: mean(delays.iter().sum(), delays.len()),
    }
}

fn product_performance(ds: &Dataset, days: u32) -> Vec<ProductRow> {
    let mut groups: BTreeMap<&str, (u64, f64, f64, usize)> = BTreeMap::new();
    for s in &ds.sales {
        let g = groups.entry(s.product_id.as_str()).or_default();
        g.0 += s.units_sold;
        g.1 += s.revenue;
        g.2 += s.unit_price;
        g.3 += 1;
    }
    let mut rows: Vec<ProductRow> = groups
        .into_iter()
        .map(|(id, (units, revenue, price, n))| ProductRow {
            product_id: id.to_string(),
            total_units: units,
            total_revenue: revenue,
            avg_price: mean(price, n),
        })
        .collect();
    rows.sort_by(|a, b| by_value_desc(a.total_revenue, b.total_revenue));
    rows.truncate((days / 3).min(20) as usize);
    rows
}

fn regional_performance(ds: &Dataset) -> Vec<RegionRow> {
    let mut groups: BTreeMap<&str, (BTreeSet<&str>, f64)> = BTreeMap::new();
    for s in &ds.sales {
        let g = groups.entry(s.region.as_str()).or_default();
        g.0.insert(s.order_id.as_str());
        g.1 += s.revenue;
    }
    let mut rows: Vec<RegionRow> = groups
        .into_iter()
        .map(|(region, (orders, revenue))| RegionRow {
            region: region.to_string(),
            order_count: count(orders.len()),
            total_revenue: revenue,
        })
        .collect();
    rows.sort_by(|a, b| by_value_desc(a.total_revenue, b.total_revenue));
    rows
}
