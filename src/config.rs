//! Server configuration from `INSIGHTGRID_*` environment variables.
//!
//! Unset or blank variables fall back to defaults. Set but unparseable
//! variables are errors.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::projection::ProjectionPolicy;
use crate::runtime::RuntimeConfig;

pub const ENV_BIND: &str = "INSIGHTGRID_BIND";
pub const ENV_DATA: &str = "INSIGHTGRID_DATA";
pub const ENV_WORKERS: &str = "INSIGHTGRID_WORKERS";
pub const ENV_QUEUE_CAPACITY: &str = "INSIGHTGRID_QUEUE_CAPACITY";
pub const ENV_TIMEOUT_MS: &str = "INSIGHTGRID_TIMEOUT_MS";
pub const ENV_LOG_JSON: &str = "INSIGHTGRID_LOG_JSON";
pub const ENV_MAX_BODY_BYTES: &str = "INSIGHTGRID_MAX_BODY_BYTES";
pub const ENV_MIN_DATA_POINTS: &str = "INSIGHTGRID_MIN_DATA_POINTS";
pub const ENV_MAX_CONFIDENCE: &str = "INSIGHTGRID_MAX_CONFIDENCE";
pub const ENV_REVENUE_WARNING_FRACTION: &str = "INSIGHTGRID_REVENUE_WARNING_FRACTION";
pub const ENV_HIGH_IMPACT_FUEL_PERCENT: &str = "INSIGHTGRID_HIGH_IMPACT_FUEL_PERCENT";

const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Everything the server binary needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Dataset for the in-memory provider; `None` serves an empty dataset.
    pub data_path: Option<PathBuf>,
    pub runtime: RuntimeConfig,
    pub policy: ProjectionPolicy,
    pub log_json: bool,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            data_path: None,
            runtime: RuntimeConfig::default(),
            policy: ProjectionPolicy::default(),
            log_json: false,
            max_body_bytes: 64 * 1024,
        }
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        reason: format!("'{raw}': {e}"),
    })
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            reason: format!("'{raw}' is not a boolean"),
        }),
    }
}

fn positive(key: &str, value: usize) -> Result<usize, ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

fn fraction(key: &str, value: f64) -> Result<f64, ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            reason: format!("{value} is outside [0, 1]"),
        });
    }
    Ok(value)
}

fn percent(key: &str, value: f64) -> Result<f64, ConfigError> {
    if !(0.0..=100.0).contains(&value) {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            reason: format!("{value} is outside [0, 100]"),
        });
    }
    Ok(value)
}

impl ServerConfig {
    /// Reads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first bad variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first bad variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut cfg = Self::default();

        cfg.bind = parse_value(ENV_BIND, &get(ENV_BIND).unwrap_or_else(|| DEFAULT_BIND.to_string()))?;
        cfg.data_path = get(ENV_DATA).map(PathBuf::from);

        if let Some(v) = get(ENV_WORKERS) {
            cfg.runtime.workers = positive(ENV_WORKERS, parse_value(ENV_WORKERS, &v)?)?;
        }
        if let Some(v) = get(ENV_QUEUE_CAPACITY) {
            cfg.runtime.queue_capacity =
                positive(ENV_QUEUE_CAPACITY, parse_value(ENV_QUEUE_CAPACITY, &v)?)?;
        }
        if let Some(v) = get(ENV_TIMEOUT_MS) {
            let ms: u64 = parse_value(ENV_TIMEOUT_MS, &v)?;
            if ms == 0 {
                return Err(ConfigError::InvalidValue {
                    key: ENV_TIMEOUT_MS.to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
            cfg.runtime.request_timeout = Duration::from_millis(ms);
        }
        if let Some(v) = get(ENV_LOG_JSON) {
            cfg.log_json = parse_bool(ENV_LOG_JSON, &v)?;
        }
        if let Some(v) = get(ENV_MAX_BODY_BYTES) {
            cfg.max_body_bytes = positive(ENV_MAX_BODY_BYTES, parse_value(ENV_MAX_BODY_BYTES, &v)?)?;
        }

        if let Some(v) = get(ENV_MIN_DATA_POINTS) {
            cfg.policy.confidence.min_data_points = parse_value(ENV_MIN_DATA_POINTS, &v)?;
        }
        if let Some(v) = get(ENV_MAX_CONFIDENCE) {
            cfg.policy.confidence.max_confidence =
                fraction(ENV_MAX_CONFIDENCE, parse_value(ENV_MAX_CONFIDENCE, &v)?)?;
        }
        if let Some(v) = get(ENV_REVENUE_WARNING_FRACTION) {
            cfg.policy.revenue_warning_fraction = fraction(
                ENV_REVENUE_WARNING_FRACTION,
                parse_value(ENV_REVENUE_WARNING_FRACTION, &v)?,
            )?;
        }
        if let Some(v) = get(ENV_HIGH_IMPACT_FUEL_PERCENT) {
            cfg.policy.high_impact_fuel_percent = percent(
                ENV_HIGH_IMPACT_FUEL_PERCENT,
                parse_value(ENV_HIGH_IMPACT_FUEL_PERCENT, &v)?,
            )?;
        }

        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServerConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = from(&[]).unwrap();
        assert_eq!(cfg.bind.to_string(), DEFAULT_BIND);
        assert!(cfg.data_path.is_none());
        assert!(!cfg.log_json);
        assert_eq!(cfg.policy, ProjectionPolicy::default());
    }

    #[test]
    fn values_are_applied() {
        let cfg = from(&[
            (ENV_BIND, "0.0.0.0:9000"),
            (ENV_DATA, "/srv/data.json"),
            (ENV_WORKERS, "3"),
            (ENV_QUEUE_CAPACITY, "16"),
            (ENV_TIMEOUT_MS, "250"),
            (ENV_LOG_JSON, "true"),
            (ENV_MAX_CONFIDENCE, "0.8"),
            (ENV_HIGH_IMPACT_FUEL_PERCENT, "20"),
        ])
        .unwrap();
        assert_eq!(cfg.bind.port(), 9000);
        assert_eq!(cfg.data_path, Some(PathBuf::from("/srv/data.json")));
        assert_eq!(cfg.runtime.workers, 3);
        assert_eq!(cfg.runtime.queue_capacity, 16);
        assert_eq!(cfg.runtime.request_timeout, Duration::from_millis(250));
        assert!(cfg.log_json);
        assert!((cfg.policy.confidence.max_confidence - 0.8).abs() < f64::EPSILON);
        assert!((cfg.policy.high_impact_fuel_percent - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bad_values_name_the_variable() {
        let err = from(&[(ENV_WORKERS, "lots")]).unwrap_err();
        assert!(format!("{err}").contains(ENV_WORKERS));

        let err = from(&[(ENV_QUEUE_CAPACITY, "0")]).unwrap_err();
        assert!(format!("{err}").contains(ENV_QUEUE_CAPACITY));

        let err = from(&[(ENV_MAX_CONFIDENCE, "1.5")]).unwrap_err();
        assert!(format!("{err}").contains(ENV_MAX_CONFIDENCE));

        assert!(from(&[(ENV_LOG_JSON, "sometimes")]).is_err());
        assert!(from(&[(ENV_BIND, "not-an-addr")]).is_err());
    }

    #[test]
    fn high_impact_fuel_percent_must_be_a_percentage() {
        for raw in ["NaN", "-5", "150", "inf"] {
            let err = from(&[(ENV_HIGH_IMPACT_FUEL_PERCENT, raw)]).unwrap_err();
            assert!(
                format!("{err}").contains(ENV_HIGH_IMPACT_FUEL_PERCENT),
                "{raw} was accepted"
            );
        }
        let cfg = from(&[(ENV_HIGH_IMPACT_FUEL_PERCENT, "0")]).unwrap();
        assert!(cfg.policy.high_impact_fuel_percent.abs() < f64::EPSILON);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let cfg = from(&[(ENV_DATA, "  "), (ENV_TIMEOUT_MS, "")]).unwrap();
        assert!(cfg.data_path.is_none());
        assert_eq!(cfg.runtime.request_timeout, RuntimeConfig::default().request_timeout);
    }
}
