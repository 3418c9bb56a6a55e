use serde::{Deserialize, Serialize};

use super::recommend::money;
use super::{
    finite, Outcome, ProjectionMetrics, ProjectionPolicy, Recommendation, SeriesKeys, SeriesPoint,
};
use crate::scenario::WarehouseExpansionParams;
use crate::snapshot::RegionalAggregates;

/// Paybacks beyond this many years are reported as a warning.
const PAYBACK_WARNING_YEARS: f64 = 100.0;

const SERIES_KEYS: SeriesKeys = SeriesKeys {
    value: "net_position",
    cumulative: "cumulative_net_position",
    baseline: "initial_position",
};

/// How long the investment takes to pay for itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Payback {
    Recoverable { years: f64 },
    /// Net savings are zero or negative.
    NotRecoverable,
}

impl Payback {
    fn from_savings(investment: f64, net_annual_savings: f64) -> Self {
        if net_annual_savings > 0.0 {
            Self::Recoverable {
                years: investment / net_annual_savings,
            }
        } else {
            Self::NotRecoverable
        }
    }

    #[must_use]
    pub const fn years(&self) -> Option<f64> {
        match self {
            Self::Recoverable { years } => Some(*years),
            Self::NotRecoverable => None,
        }
    }
}

/// Scalar results of a warehouse expansion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseExpansionMetrics {
    pub location: String,
    pub investment_cost: f64,
    pub warehouse_size: f64,
    pub cost_reduction_percent: f64,
    pub regional_shipments: u64,
    pub monthly_regional_cost: f64,
    pub regional_annual_cost: f64,
    pub gross_annual_savings: f64,
    pub net_annual_savings: f64,
    pub monthly_net_savings: f64,
    pub roi_percent: f64,
    #[serde(rename = "payback_period_years")]
    pub payback: Payback,
}

pub(crate) fn project(
    params: &WarehouseExpansionParams,
    snap: &RegionalAggregates,
    policy: &ProjectionPolicy,
) -> Outcome {
    let avg_cost = finite(snap.avg_cost);
    #[allow(clippy::cast_precision_loss)]
    let shipments = snap.shipment_count as f64;

    let monthly_regional_cost = avg_cost * shipments;
    let regional_annual_cost = monthly_regional_cost * 12.0;
    let gross_annual_savings = regional_annual_cost * params.cost_reduction();
    let net_annual_savings = gross_annual_savings - params.annual_operating_cost;
    let monthly_net_savings = net_annual_savings / 12.0;
    let roi_percent = net_annual_savings / params.investment_cost * 100.0;
    let payback = Payback::from_savings(params.investment_cost, net_annual_savings);

    let series = (1..=params.time_horizon_months)
        .map(|m| {
            let position = monthly_net_savings * f64::from(m) - params.investment_cost;
            SeriesPoint::new(m, position)
                .named(SERIES_KEYS)
                .baseline(-params.investment_cost)
        })
        .collect();

    let metrics = WarehouseExpansionMetrics {
        location: params.location.clone(),
        investment_cost: params.investment_cost,
        warehouse_size: params.warehouse_size,
        cost_reduction_percent: params.warehouse_cost_reduction_percent,
        regional_shipments: snap.shipment_count,
        monthly_regional_cost,
        regional_annual_cost,
        gross_annual_savings,
        net_annual_savings,
        monthly_net_savings,
        roi_percent,
        payback,
    };

    Outcome {
        recommendations: recommend(&metrics),
        metrics: ProjectionMetrics::WarehouseExpansion(metrics),
        series,
        confidence: policy.confidence.from_data_points(snap.data_points),
        insufficient_data: false,
    }
}

fn recommend(m: &WarehouseExpansionMetrics) -> Vec<Recommendation> {
    let mut recs = Vec::new();

    if m.roi_percent > 0.0 {
        recs.push(Recommendation::info(
            "Return on Investment",
            format!(
                "ROI of {:.1}% annually with {} net savings per year",
                m.roi_percent,
                money(m.net_annual_savings)
            ),
        ));
    } else {
        recs.push(
            Recommendation::warning(
                "Negative ROI",
                "Annual operating costs exceed the projected savings",
            )
            .with_action("Reconsider the investment or renegotiate operating costs"),
        );
    }

    match m.payback {
        Payback::Recoverable { years } if years < PAYBACK_WARNING_YEARS => {
            recs.push(Recommendation::info(
                "Payback Period",
                format!("Investment is recovered in {years:.1} years"),
            ));
        }
        Payback::Recoverable { .. } => {
            recs.push(Recommendation::warning(
                "Payback Too Long",
                "Payback period exceeds 100 years",
            ));
        }
        Payback::NotRecoverable => {
            recs.push(Recommendation::warning(
                "Investment Not Recoverable",
                "The warehouse never pays back at the current savings rate",
            ));
        }
    }

    recs.push(
        Recommendation::action(
            "Staffing",
            format!("A {:.0} sq ft facility needs a dedicated operations team", m.warehouse_size),
        )
        .with_action("Consider hiring 3-5 additional staff for warehouse operations"),
    );
    recs.push(Recommendation::info(
        "Regional Throughput",
        format!(
            "Projected to handle ~{} shipments per month in the {} region",
            m.regional_shipments, m.location
        ),
    ));
    recs
}
