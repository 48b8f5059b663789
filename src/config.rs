use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ForecastError;
use crate::persistence::ArtifactPaths;

/// Forecast run settings, loaded once and passed by reference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Rows per model window (hours per forecast day).
    pub sequence_length: usize,
    /// Horizons up to this many days go to the provider's own forecast.
    pub direct_horizon_days: usize,
    /// Predicted schema columns, in model output order.
    pub target_columns: Vec<String>,
    pub artifact_dir: PathBuf,
    /// Fail alignment above this fraction of zero-filled numeric columns.
    pub max_missing_fraction: Option<f64>,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            sequence_length: 24,
            direct_horizon_days: 10,
            target_columns: vec!["temp_c".to_string(), "precip_mm".to_string(), "humidity".to_string()],
            artifact_dir: PathBuf::from("Trained_models/LSTM"),
            max_missing_fraction: None,
        }
    }
}

/// How a requested horizon is served.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForecastPlan {
    /// Short horizon: pass through to the observation provider's forecast.
    Direct { days: usize },
    /// Long horizon: roll the sequence model forward day by day.
    Chunked { days: usize },
}

impl ForecastConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ForecastError> {
        let path = path.as_ref();
        let body = fs::read_to_string(path)
            .map_err(|e| ForecastError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&body)
            .map_err(|e| ForecastError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `FORECAST_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    /// Applies overrides from `lookup`; unparsable values are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(dir) = read("FORECAST_ARTIFACT_DIR") {
            self.artifact_dir = PathBuf::from(dir);
        }
        if let Some(len) = read("FORECAST_SEQUENCE_LENGTH").and_then(|v| v.parse().ok()) {
            self.sequence_length = len;
        }
        if let Some(days) = read("FORECAST_DIRECT_HORIZON_DAYS").and_then(|v| v.parse().ok()) {
            self.direct_horizon_days = days;
        }
        if let Some(targets) = read("FORECAST_TARGETS") {
            self.target_columns = targets
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
        }
        if let Some(fraction) = read("FORECAST_MAX_MISSING_FRACTION").and_then(|v| v.parse().ok()) {
            self.max_missing_fraction = Some(fraction);
        }

        self
    }

    pub fn validate(&self) -> Result<(), ForecastError> {
        if self.sequence_length == 0 {
            return Err(ForecastError::InvalidConfig("sequence_length must be positive".to_string()));
        }
        if self.target_columns.is_empty() {
            return Err(ForecastError::InvalidConfig("target_columns must not be empty".to_string()));
        }
        if let Some(fraction) = self.max_missing_fraction {
            if !(0.0..=1.0).contains(&fraction) {
                return Err(ForecastError::InvalidConfig(format!(
                    "max_missing_fraction {} outside [0, 1]",
                    fraction
                )));
            }
        }
        Ok(())
    }

    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths::in_dir(&self.artifact_dir)
    }

    /// Routes a requested horizon. Zero days is rejected.
    pub fn plan(&self, days: usize) -> Result<ForecastPlan, ForecastError> {
        match days {
            0 => Err(ForecastError::InvalidHorizon(0)),
            d if d <= self.direct_horizon_days => Ok(ForecastPlan::Direct { days: d }),
            d => Ok(ForecastPlan::Chunked { days: d }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_plan_routes_by_threshold() {
        let config = ForecastConfig::default();
        assert_eq!(config.plan(1).unwrap(), ForecastPlan::Direct { days: 1 });
        assert_eq!(config.plan(10).unwrap(), ForecastPlan::Direct { days: 10 });
        assert_eq!(config.plan(11).unwrap(), ForecastPlan::Chunked { days: 11 });
        assert!(matches!(config.plan(0), Err(ForecastError::InvalidHorizon(0))));
    }

    #[test]
    fn test_overrides_apply() {
        let config = ForecastConfig::default().with_overrides(lookup(&[
            ("FORECAST_ARTIFACT_DIR", "/srv/models"),
            ("FORECAST_SEQUENCE_LENGTH", "12"),
            ("FORECAST_TARGETS", "temp_c, humidity"),
            ("FORECAST_MAX_MISSING_FRACTION", "0.25"),
        ]));

        assert_eq!(config.artifact_dir, PathBuf::from("/srv/models"));
        assert_eq!(config.sequence_length, 12);
        assert_eq!(config.target_columns, vec!["temp_c".to_string(), "humidity".to_string()]);
        assert_eq!(config.max_missing_fraction, Some(0.25));
        assert_eq!(config.direct_horizon_days, 10);
    }

    #[test]
    fn test_invalid_overrides_fall_back() {
        let config = ForecastConfig::default().with_overrides(lookup(&[
            ("FORECAST_SEQUENCE_LENGTH", "many"),
            ("FORECAST_ARTIFACT_DIR", "   "),
        ]));
        assert_eq!(config, ForecastConfig::default());
    }

    #[test]
    fn test_validate() {
        assert!(ForecastConfig::default().validate().is_ok());

        let mut config = ForecastConfig::default();
        config.max_missing_fraction = Some(1.5);
        assert!(config.validate().is_err());

        config = ForecastConfig::default();
        config.target_columns.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_file_uses_defaults_for_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forecast.json");
        fs::write(&path, r#"{"direct_horizon_days": 7, "artifact_dir": "models"}"#).unwrap();

        let config = ForecastConfig::from_json_file(&path).unwrap();
        assert_eq!(config.direct_horizon_days, 7);
        assert_eq!(config.sequence_length, 24);
        assert_eq!(config.artifact_paths().scaler, PathBuf::from("models/scaler.json"));
    }
}
