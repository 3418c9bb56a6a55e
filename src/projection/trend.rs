//! Trend and seasonality estimation over a value history.
//!
//! Ordinary least squares against the sample index, plus a coefficient of
//! variation test for seasonality. Non-finite samples are skipped.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Coefficient of variation above which a series is treated as seasonal.
pub const SEASONALITY_THRESHOLD: f64 = 0.15;

/// Fitted line `value = slope * index + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendFit {
    pub slope: f64,
    pub intercept: f64,
    /// Clamped to [0, 1].
    pub r_squared: f64,
    /// Samples that entered the fit.
    pub samples: usize,
}

/// Seasonality estimate for a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Seasonality {
    pub detected: bool,
    /// Coefficient of variation (`std / mean`).
    pub variation: f64,
}

/// Direction of a detected trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Rising,
    Falling,
    Stable,
}

/// Model diagnostics reported with a trend-adjusted projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_type: String,
    pub trend_detected: bool,
    pub seasonality_detected: bool,
    pub trend_direction: TrendDirection,
    pub slope: f64,
    pub r_squared: f64,
    pub seasonal_variation_percent: f64,
    pub data_points: u64,
}

fn finite_samples(series: &[f64]) -> Vec<f64> {
    series.iter().copied().filter(|v| v.is_finite()).collect()
}

fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = data.len() as f64;
    data.iter().sum::<f64>() / n
}

fn sample_std(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let m = mean(data);
    #[allow(clippy::cast_precision_loss)]
    let denom = (data.len() - 1) as f64;
    (data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / denom).sqrt()
}

/// Least-squares fit of the series against its index.
#[must_use]
pub fn fit_trend(series: &[f64]) -> TrendFit {
    let y = finite_samples(series);
    if y.len() < 2 {
        return TrendFit {
            slope: 0.0,
            intercept: y.first().copied().unwrap_or(0.0),
            r_squared: 0.0,
            samples: y.len(),
        };
    }

    #[allow(clippy::cast_precision_loss)]
    let n = y.len() as f64;
    #[allow(clippy::cast_precision_loss)]
    let xs: Vec<f64> = (0..y.len()).map(|i| i as f64).collect();

    let sum_x: f64 = xs.iter().sum();
    let sum_y: f64 = y.iter().sum();
    let sum_xy: f64 = xs.iter().zip(&y).map(|(x, v)| x * v).sum();
    let sum_x2: f64 = xs.iter().map(|x| x * x).sum();

    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator == 0.0 {
        return TrendFit {
            slope: 0.0,
            intercept: mean(&y),
            r_squared: 0.0,
            samples: y.len(),
        };
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;

    let y_mean = mean(&y);
    let ss_total: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
    let ss_res: f64 = xs
        .iter()
        .zip(&y)
        .map(|(x, v)| (v - (slope * x + intercept)).powi(2))
        .sum();
    let r_squared = if ss_total > 0.0 {
        (1.0 - ss_res / ss_total).clamp(0.0, 1.0)
    } else {
        0.0
    };

    TrendFit {
        slope,
        intercept,
        r_squared,
        samples: y.len(),
    }
}

/// Coefficient-of-variation seasonality test. Needs at least three samples
/// and a non-zero mean.
#[must_use]
pub fn detect_seasonality(series: &[f64]) -> Seasonality {
    let data = finite_samples(series);
    let m = mean(&data);
    if data.len() < 3 || m == 0.0 {
        return Seasonality {
            detected: false,
            variation: 0.0,
        };
    }
    let variation = (sample_std(&data) / m).abs();
    Seasonality {
        detected: variation > SEASONALITY_THRESHOLD,
        variation,
    }
}

/// Annual sinusoid evaluated at a projection month.
#[must_use]
pub fn seasonal_wave(month: u32) -> f64 {
    (2.0 * PI * f64::from(month) / 12.0).sin()
}

/// Classifies a fit; slopes within 1% of `reference` per period are stable.
#[must_use]
pub fn direction(fit: &TrendFit, reference: f64, min_fit: f64) -> TrendDirection {
    if fit.r_squared <= min_fit {
        return TrendDirection::Stable;
    }
    let band = reference.abs() * 0.01;
    if fit.slope > band {
        TrendDirection::Rising
    } else if fit.slope < -band {
        TrendDirection::Falling
    } else {
        TrendDirection::Stable
    }
}
