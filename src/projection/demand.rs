use serde::{Deserialize, Serialize};

use super::recommend::money;
use super::trend::{self, ModelInfo, TrendFit};
use super::{
    finite, Outcome, ProjectionMetrics, ProjectionPolicy, Recommendation, SeriesKeys, SeriesPoint,
};
use crate::scenario::DemandForecastParams;
use crate::snapshot::SalesAggregates;

const SEASONAL_WEIGHT: f64 = 0.3;

const SERIES_KEYS: SeriesKeys = SeriesKeys {
    value: "projected_revenue",
    cumulative: "cumulative_revenue_increase",
    baseline: "current_revenue",
};

/// Scalar results of a demand forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandForecastMetrics {
    pub demand_increase_percent: f64,
    pub time_horizon_months: u32,
    pub current_monthly_revenue: f64,
    /// Monthly revenue once the growth has fully ramped in.
    pub projected_monthly_revenue: f64,
    /// Monthly uplift at the end of the ramp.
    pub revenue_increase: f64,
    /// Sum of the monthly uplift over the horizon.
    pub total_revenue_increase: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_info: Option<ModelInfo>,
}

pub(crate) fn project(
    params: &DemandForecastParams,
    snap: &SalesAggregates,
    policy: &ProjectionPolicy,
) -> Outcome {
    let base = finite(snap.total_revenue);
    let revenue_increase = base * params.demand_increase();
    let horizon = params.time_horizon_months;
    let ramp = |m: u32| base + revenue_increase * f64::from(m) / f64::from(horizon);

    let fit = params
        .use_ml_predictions
        .then(|| trend::fit_trend(&snap.revenue_history))
        .filter(|fit| fit.samples >= 2);
    let insufficient_data = params.use_ml_predictions && fit.is_none();

    let (series, confidence, model_info): (Vec<SeriesPoint>, _, _) = match fit {
        Some(fit) => {
            let seasonality = trend::detect_seasonality(&snap.revenue_history);
            let trending = fit.r_squared > policy.confidence.min_model_fit;
            let series = (1..=horizon)
                .map(|m| {
                    let mut projected = ramp(m);
                    if trending {
                        projected += fit.slope * f64::from(m);
                    }
                    if seasonality.detected {
                        projected +=
                            projected * seasonality.variation * trend::seasonal_wave(m) * SEASONAL_WEIGHT;
                    }
                    SeriesPoint::new(m, finite(projected))
                        .named(SERIES_KEYS)
                        .baseline(base)
                })
                .collect();
            let info = ModelInfo {
                model_type: "linear_regression+seasonality".to_string(),
                trend_detected: trending,
                seasonality_detected: seasonality.detected,
                trend_direction: trend::direction(
                    &fit,
                    finite(snap.avg_revenue),
                    policy.confidence.min_model_fit,
                ),
                slope: fit.slope,
                r_squared: fit.r_squared,
                seasonal_variation_percent: seasonality.variation * 100.0,
                data_points: snap.data_points,
            };
            let confidence = policy
                .confidence
                .from_model_fit(fit.r_squared, snap.data_points);
            (series, confidence, Some(info))
        }
        None => {
            let series = (1..=horizon)
                .map(|m| SeriesPoint::new(m, ramp(m)).named(SERIES_KEYS).baseline(base))
                .collect();
            (series, policy.confidence.from_data_points(snap.data_points), None)
        }
    };

    let total_revenue_increase = series.iter().map(|p| p.value - base).sum();

    let mut recommendations = recommend(params, policy, revenue_increase);
    if let (Some(fit), Some(info)) = (fit, model_info.as_ref()) {
        recommendations.extend(trend_recommendations(&fit, info));
    }
    if insufficient_data {
        recommendations.push(Recommendation::info(
            "Trend Model Skipped",
            "Not enough order revenue history to fit a trend; linear ramp used",
        ));
    }

    Outcome {
        metrics: ProjectionMetrics::DemandForecast(DemandForecastMetrics {
            demand_increase_percent: params.demand_increase_percent,
            time_horizon_months: horizon,
            current_monthly_revenue: base,
            projected_monthly_revenue: base + revenue_increase,
            revenue_increase,
            total_revenue_increase,
            model_info,
        }),
        series,
        recommendations,
        confidence,
        insufficient_data,
    }
}

fn recommend(
    params: &DemandForecastParams,
    policy: &ProjectionPolicy,
    revenue_increase: f64,
) -> Vec<Recommendation> {
    let pct = params.demand_increase_percent;
    let mut recs = Vec::new();

    if pct > 0.0 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let staff = ((pct / 10.0).floor() as u32).max(1);
        recs.push(
            Recommendation::action(
                "Increase Inventory",
                format!("Demand is projected to grow {pct:.1}% over {} months", params.time_horizon_months),
            )
            .with_action(format!("Increase inventory levels by {pct:.0}%")),
        );
        recs.push(
            Recommendation::action(
                "Staffing Plan",
                format!("Additional monthly revenue of {} needs fulfilment capacity", money(revenue_increase)),
            )
            .with_action(format!("Hire {staff} additional staff for fulfilment")),
        );
        if pct > policy.expansion_growth_percent {
            recs.push(
                Recommendation::info(
                    "Warehouse Capacity",
                    "Growth of this size will strain current warehouse capacity",
                )
                .with_action("Evaluate a warehouse expansion scenario"),
            );
        }
    } else if pct < 0.0 {
        recs.push(
            Recommendation::warning(
                "Demand Decline",
                format!("Monthly revenue falls by {} at the end of the horizon", money(-revenue_increase)),
            )
            .with_action("Reduce inventory orders and review marketing spend"),
        );
    } else {
        recs.push(Recommendation::info(
            "Flat Demand",
            "No change in demand; current capacity is sufficient",
        ));
    }
    recs
}

fn trend_recommendations(fit: &TrendFit, info: &ModelInfo) -> Vec<Recommendation> {
    let mut recs = Vec::new();
    if fit.slope > 0.0 && fit.r_squared > 0.5 {
        recs.push(Recommendation::info(
            "Upward Revenue Trend Detected",
            format!("Order revenue has been rising by ${:.2} per period", fit.slope),
        ));
    } else if fit.slope < 0.0 {
        recs.push(
            Recommendation::warning(
                "Downward Revenue Trend",
                "Order revenue has been declining historically",
            )
            .with_action("Treat the projected growth as an upper bound"),
        );
    }
    if info.seasonality_detected {
        recs.push(
            Recommendation::info(
                "Seasonal Pattern Detected",
                format!("Revenue varies by {:.1}% seasonally", info.seasonal_variation_percent),
            )
            .with_action("Plan inventory around seasonal peaks"),
        );
    }
    recs
}
