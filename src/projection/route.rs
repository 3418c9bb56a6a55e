use serde::{Deserialize, Serialize};

use super::recommend::money;
use super::{
    finite, Outcome, ProjectionMetrics, ProjectionPolicy, Recommendation, SeriesKeys, SeriesPoint,
};
use crate::scenario::{OptimizationType, RouteOptimizationParams};
use crate::snapshot::LogisticsAggregates;

const SERIES_KEYS: SeriesKeys = SeriesKeys {
    value: "monthly_savings",
    cumulative: "cumulative_savings",
    baseline: "baseline",
};

/// Scalar results of a route optimization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteOptimizationMetrics {
    pub optimization_type: OptimizationType,
    pub current_avg_cost: f64,
    pub current_avg_delay_hr: f64,
    pub avg_fuel_price: f64,
    pub shipment_count: u64,
    pub cost_reduction_percent: f64,
    /// Signed; negative means faster deliveries.
    pub time_change_percent: f64,
    pub monthly_savings: f64,
    pub projected_avg_delay_hr: f64,
    pub total_savings: f64,
}

pub(crate) fn project(
    params: &RouteOptimizationParams,
    snap: &LogisticsAggregates,
    policy: &ProjectionPolicy,
) -> Outcome {
    let (cost_savings, time_change) = params.optimization_type.profile();
    let avg_cost = finite(snap.avg_cost);
    let avg_delay = finite(snap.avg_delay_hr);
    #[allow(clippy::cast_precision_loss)]
    let shipments = snap.shipment_count as f64;

    let monthly_savings = avg_cost * shipments * cost_savings;
    let series: Vec<SeriesPoint> = (1..=params.time_horizon_months)
        .map(|m| {
            SeriesPoint::new(m, monthly_savings)
                .named(SERIES_KEYS)
                .cumulative(monthly_savings * f64::from(m))
        })
        .collect();
    let total_savings = series.last().and_then(|p| p.cumulative).unwrap_or(0.0);

    let metrics = RouteOptimizationMetrics {
        optimization_type: params.optimization_type,
        current_avg_cost: avg_cost,
        current_avg_delay_hr: avg_delay,
        avg_fuel_price: finite(snap.avg_fuel_price),
        shipment_count: snap.shipment_count,
        cost_reduction_percent: cost_savings * 100.0,
        time_change_percent: time_change * 100.0,
        monthly_savings,
        projected_avg_delay_hr: avg_delay * (1.0 + time_change),
        total_savings,
    };

    Outcome {
        recommendations: recommend(&metrics, params.time_horizon_months),
        metrics: ProjectionMetrics::RouteOptimization(metrics),
        series,
        confidence: policy.confidence.from_data_points(snap.data_points),
        insufficient_data: false,
    }
}

fn recommend(m: &RouteOptimizationMetrics, months: u32) -> Vec<Recommendation> {
    let mut recs = vec![Recommendation::info(
        "Projected Savings",
        format!(
            "{} per month, {} over {months} months with {} routing",
            money(m.monthly_savings),
            money(m.total_savings),
            m.optimization_type.as_str().replace('_', " ")
        ),
    )];

    if m.time_change_percent > 0.0 {
        recs.push(
            Recommendation::warning(
                "Slower Deliveries",
                format!(
                    "Average delay rises {:.0}% to {:.1} hours",
                    m.time_change_percent, m.projected_avg_delay_hr
                ),
            )
            .with_action("Notify customers with time-sensitive orders"),
        );
    } else {
        recs.push(Recommendation::info(
            "Faster Deliveries",
            format!(
                "Average delay falls {:.0}% to {:.1} hours",
                m.time_change_percent.abs(),
                m.projected_avg_delay_hr
            ),
        ));
    }
    recs
}
