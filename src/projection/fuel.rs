use serde::{Deserialize, Serialize};

use super::recommend::money;
use super::trend::{self, ModelInfo, TrendFit};
use super::{
    finite, Outcome, ProjectionMetrics, ProjectionPolicy, Recommendation, SeriesKeys, SeriesPoint,
};
use crate::scenario::FuelPriceParams;
use crate::snapshot::LogisticsAggregates;

/// Spread of the optimistic/pessimistic band on trend-adjusted months.
const BAND_FRACTION: f64 = 0.20;
const SEASONAL_WEIGHT: f64 = 0.5;

const SERIES_KEYS: SeriesKeys = SeriesKeys {
    value: "monthly_cost_increase",
    cumulative: "cumulative_cost_increase",
    baseline: "baseline",
};

/// Scalar results of a fuel price projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelPriceMetrics {
    pub fuel_increase_percent: f64,
    pub time_horizon_months: u32,
    /// Fleet fuel spend per month before the increase.
    pub current_monthly_cost: f64,
    /// Additional spend per month under the closed-form model.
    pub monthly_cost_increase: f64,
    /// Cumulative additional spend at the end of the horizon.
    pub total_cost_impact: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_info: Option<ModelInfo>,
}

pub(crate) fn project(
    params: &FuelPriceParams,
    snap: &LogisticsAggregates,
    policy: &ProjectionPolicy,
) -> Outcome {
    let avg_cost = finite(snap.avg_cost);
    #[allow(clippy::cast_precision_loss)]
    let shipments = snap.shipment_count as f64;
    let ratio = params.fuel_cost_fraction();
    let increase = params.fuel_increase();
    let horizon = params.time_horizon_months;

    let current_monthly_cost = avg_cost * shipments;
    let monthly_cost_increase = avg_cost * shipments * ratio * increase;

    let fit = params
        .use_ml_predictions
        .then(|| trend::fit_trend(&snap.cost_history))
        .filter(|fit| fit.samples >= 2);
    let insufficient_data = params.use_ml_predictions && fit.is_none();

    let (series, confidence, model_info) = match fit {
        Some(fit) => {
            let seasonality = trend::detect_seasonality(&snap.cost_history);
            let mut cumulative = 0.0;
            let series: Vec<SeriesPoint> = (1..=horizon)
                .map(|m| {
                    let mut impact = monthly_cost_increase;
                    if fit.r_squared > policy.confidence.min_model_fit {
                        impact += fit.slope * f64::from(m) * ratio * increase;
                    }
                    if seasonality.detected {
                        impact += impact * seasonality.variation * trend::seasonal_wave(m) * SEASONAL_WEIGHT;
                    }
                    // A falling trend lowers the surcharge but never refunds it.
                    let impact = finite(impact).max(0.0);
                    cumulative += impact;
                    SeriesPoint::new(m, impact)
                        .named(SERIES_KEYS)
                        .cumulative(cumulative)
                        .band(BAND_FRACTION)
                })
                .collect();
            let confidence = policy
                .confidence
                .from_model_fit(fit.r_squared, snap.data_points);
            let info = ModelInfo {
                model_type: "linear_regression+seasonality".to_string(),
                trend_detected: fit.r_squared > policy.confidence.min_model_fit,
                seasonality_detected: seasonality.detected,
                trend_direction: trend::direction(&fit, avg_cost, policy.confidence.min_model_fit),
                slope: fit.slope,
                r_squared: fit.r_squared,
                seasonal_variation_percent: seasonality.variation * 100.0,
                data_points: snap.data_points,
            };
            (series, confidence, Some(info))
        }
        None => {
            let series = (1..=horizon)
                .map(|m| {
                    SeriesPoint::new(m, monthly_cost_increase)
                        .named(SERIES_KEYS)
                        .cumulative(monthly_cost_increase * f64::from(m))
                })
                .collect();
            let confidence = policy.confidence.from_data_points(snap.data_points);
            (series, confidence, None)
        }
    };

    let total_cost_impact = series
        .last()
        .and_then(|p: &SeriesPoint| p.cumulative)
        .unwrap_or(0.0);

    let mut recommendations = recommend(params, snap, policy, total_cost_impact);
    if let (Some(fit), Some(info)) = (fit, model_info.as_ref()) {
        recommendations.extend(trend_recommendations(&fit, info));
    }
    if insufficient_data {
        recommendations.push(Recommendation::info(
            "Trend Model Skipped",
            "Not enough shipment cost history to fit a trend; closed-form projection used",
        ));
    }

    Outcome {
        metrics: ProjectionMetrics::FuelPrice(FuelPriceMetrics {
            fuel_increase_percent: params.fuel_increase_percent,
            time_horizon_months: horizon,
            current_monthly_cost,
            monthly_cost_increase,
            total_cost_impact,
            model_info,
        }),
        series,
        recommendations,
        confidence,
        insufficient_data,
    }
}

fn recommend(
    params: &FuelPriceParams,
    snap: &LogisticsAggregates,
    policy: &ProjectionPolicy,
    total_cost_impact: f64,
) -> Vec<Recommendation> {
    let mut recs = Vec::new();
    let revenue = finite(snap.total_revenue);

    if revenue > 0.0 && total_cost_impact > revenue * policy.revenue_warning_fraction {
        recs.push(
            Recommendation::warning(
                "Margin Pressure",
                format!(
                    "Projected fuel impact of {} is {:.1}% of revenue",
                    money(total_cost_impact),
                    total_cost_impact / revenue * 100.0
                ),
            )
            .with_action("Introduce a fuel surcharge or revisit delivery pricing"),
        );
    }

    if params.fuel_increase_percent > policy.high_impact_fuel_percent {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let rail_share = (params.fuel_increase_percent * 0.5).floor() as u32;
        recs.push(
            Recommendation::warning(
                "High Impact Scenario",
                format!(
                    "{} total impact over {} months",
                    money(total_cost_impact),
                    params.time_horizon_months
                ),
            )
            .with_action(format!(
                "Explore alternative fuel sources or shift {rail_share}% of shipments to rail"
            )),
        );
    } else {
        recs.push(
            Recommendation::action("Moderate Impact", "Impact is manageable with optimization")
                .with_action("Focus on route optimization and fuel efficiency improvements"),
        );
    }

    recs.push(
        Recommendation::action(
            "Negotiate Fuel Contracts",
            "Bulk fuel contracts reduce exposure to price swings",
        )
        .with_action("Negotiate bulk fuel contracts for better rates"),
    );
    recs
}

fn trend_recommendations(fit: &TrendFit, info: &ModelInfo) -> Vec<Recommendation> {
    let mut recs = Vec::new();
    if fit.slope > 0.0 && fit.r_squared > 0.5 {
        recs.push(
            Recommendation::warning(
                "Upward Cost Trend Detected",
                format!(
                    "Historical data shows costs rising by ${:.2} per period",
                    fit.slope.abs()
                ),
            )
            .with_action("Lock in fuel contracts now before prices increase further"),
        );
    } else if fit.slope < 0.0 {
        recs.push(
            Recommendation::info("Favorable Cost Trend", "Costs have been declining historically")
                .with_action("Consider short-term contracts to benefit from further decreases"),
        );
    }
    if info.seasonality_detected {
        recs.push(
            Recommendation::info(
                "Seasonal Pattern Detected",
                format!("Costs vary by {:.1}% seasonally", info.seasonal_variation_percent),
            )
            .with_action("Consider bulk purchasing during low-cost periods"),
        );
    }
    recs
}
