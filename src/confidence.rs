//! Confidence types with calibration semantics.
//!
//! A projection's confidence is a presentation heuristic, but it must still
//! say how it was derived: from the number of data points behind an
//! aggregate, or from the fit of a trend model. A bare number without that
//! context is meaningless to the dashboard.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// How to interpret the confidence value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationMode {
    /// Scales with the number of records behind the aggregate.
    SampleSize,

    /// R-squared of the fitted trend line.
    ModelFit,

    /// No data backed the projection.
    Uncalibrated,
}

impl fmt::Display for CalibrationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SampleSize => write!(f, "sample_size"),
            Self::ModelFit => write!(f, "model_fit"),
            Self::Uncalibrated => write!(f, "uncalibrated"),
        }
    }
}

/// Formalized projection confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Confidence {
    /// The confidence value (0.0 to 1.0, inclusive).
    value: f64,

    /// How to interpret this value.
    pub calibration: CalibrationMode,

    /// Number of underlying records.
    pub data_points: u64,
}

impl Confidence {
    /// Minimum valid confidence value.
    pub const MIN_VALUE: f64 = 0.0;

    /// Maximum valid confidence value.
    pub const MAX_VALUE: f64 = 1.0;

    /// Creates a new confidence with validation.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::OutOfRange` if the value is not in [0.0, 1.0].
    pub fn new(
        value: f64,
        calibration: CalibrationMode,
        data_points: u64,
    ) -> Result<Self, ValidationError> {
        Self::validate_value(value)?;
        Ok(Self {
            value,
            calibration,
            data_points,
        })
    }

    /// Confidence for a projection with no supporting data.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            value: 0.0,
            calibration: CalibrationMode::Uncalibrated,
            data_points: 0,
        }
    }

    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }

    /// Value expressed as a whole percentage, as the dashboard shows it.
    #[must_use]
    pub fn percent(&self) -> u32 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let pct = (self.value * 100.0).round() as u32;
        pct
    }

    fn validate_value(value: f64) -> Result<(), ValidationError> {
        if value.is_nan() || !(Self::MIN_VALUE..=Self::MAX_VALUE).contains(&value) {
            return Err(ValidationError::OutOfRange {
                field: "confidence".to_string(),
                value,
                min: Self::MIN_VALUE,
                max: Self::MAX_VALUE,
            });
        }
        Ok(())
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2} ({}, {} points)",
            self.value, self.calibration, self.data_points
        )
    }
}

/// Tunables for deriving confidence from a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidencePolicy {
    /// Data points at which sample-size confidence reaches `max_confidence`.
    pub saturation_points: u64,
    /// Upper bound on any stated confidence.
    pub max_confidence: f64,
    /// Below this many data points a projection is flagged low-confidence.
    pub min_data_points: u64,
    /// Trend fits with R-squared below this are treated as noise.
    pub min_model_fit: f64,
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self {
            saturation_points: 500,
            max_confidence: 0.95,
            min_data_points: 30,
            min_model_fit: 0.3,
        }
    }
}

impl ConfidencePolicy {
    /// Confidence that grows linearly with the number of data points and
    /// saturates at `max_confidence`.
    #[must_use]
    pub fn from_data_points(&self, data_points: u64) -> Confidence {
        if data_points == 0 {
            return Confidence::zero();
        }
        #[allow(clippy::cast_precision_loss)]
        let ratio = data_points as f64 / self.saturation_points.max(1) as f64;
        Confidence {
            value: ratio.min(self.max_confidence).clamp(0.0, 1.0),
            calibration: CalibrationMode::SampleSize,
            data_points,
        }
    }

    /// Confidence taken from a trend model's R-squared.
    #[must_use]
    pub fn from_model_fit(&self, r_squared: f64, data_points: u64) -> Confidence {
        if data_points == 0 || !r_squared.is_finite() {
            return Confidence::zero();
        }
        Confidence {
            value: r_squared.clamp(0.0, 1.0).min(self.max_confidence),
            calibration: CalibrationMode::ModelFit,
            data_points,
        }
    }

    /// Returns true if a projection with this confidence should be flagged.
    #[must_use]
    pub fn is_low(&self, confidence: &Confidence) -> bool {
        match confidence.calibration {
            CalibrationMode::Uncalibrated => true,
            CalibrationMode::SampleSize => confidence.data_points < self.min_data_points,
            CalibrationMode::ModelFit => {
                confidence.data_points < self.min_data_points
                    || confidence.value < self.min_model_fit
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_rejects_out_of_range() {
        assert!(Confidence::new(1.5, CalibrationMode::SampleSize, 10).is_err());
        assert!(Confidence::new(f64::NAN, CalibrationMode::SampleSize, 10).is_err());
        assert!(Confidence::new(0.5, CalibrationMode::SampleSize, 10).is_ok());
    }

    #[test]
    fn test_zero_points_is_uncalibrated_zero() {
        let policy = ConfidencePolicy::default();
        let conf = policy.from_data_points(0);
        assert_eq!(conf, Confidence::zero());
        assert!(policy.is_low(&conf));
    }

    #[test]
    fn test_more_points_more_confidence_until_cap() {
        let policy = ConfidencePolicy::default();
        let few = policy.from_data_points(10);
        let many = policy.from_data_points(400);
        let huge = policy.from_data_points(1_000_000);
        assert!(few.value() < many.value());
        assert!((huge.value() - policy.max_confidence).abs() < f64::EPSILON);
        assert!(policy.is_low(&few));
        assert!(!policy.is_low(&many));
    }

    #[test]
    fn test_model_fit_is_capped_and_flagged_when_noisy() {
        let policy = ConfidencePolicy::default();
        let perfect = policy.from_model_fit(1.0, 200);
        assert!((perfect.value() - 0.95).abs() < f64::EPSILON);
        assert_eq!(perfect.calibration, CalibrationMode::ModelFit);

        let noisy = policy.from_model_fit(0.1, 200);
        assert!(policy.is_low(&noisy));
    }

    #[test]
    fn test_percent_rounds() {
        let conf = Confidence::new(0.456, CalibrationMode::SampleSize, 5).unwrap();
        assert_eq!(conf.percent(), 46);
        assert!(format!("{conf}").contains("sample_size"));
    }
}
