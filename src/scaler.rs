use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::ForecastError;

/// Fitted parameters as stored in a scaler artifact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalerParams {
    /// Maps `[data_min, data_max]` onto `feature_range` per column.
    MinMax {
        data_min: Vec<f64>,
        data_max: Vec<f64>,
        #[serde(default = "default_feature_range")]
        feature_range: (f64, f64),
    },
    /// Zero mean, unit variance per column.
    Standard { mean: Vec<f64>, std: Vec<f64> },
}

fn default_feature_range() -> (f64, f64) {
    (0.0, 1.0)
}

/// Immutable per-column affine transform: `scaled = x * scale + offset`.
///
/// Built once from [`ScalerParams`]; nothing is fitted at inference time.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureScaler {
    params: ScalerParams,
    scale: Array1<f64>,
    offset: Array1<f64>,
}

impl FeatureScaler {
    pub fn from_params(params: ScalerParams) -> Result<Self, ForecastError> {
        let (scale, offset) = match &params {
            ScalerParams::MinMax {
                data_min,
                data_max,
                feature_range: (lo, hi),
            } => {
                if data_min.len() != data_max.len() {
                    return Err(invalid("min-max scaler has mismatched data_min/data_max lengths"));
                }
                if !(lo.is_finite() && hi.is_finite() && hi > lo) {
                    return Err(invalid("min-max scaler feature_range must be finite and increasing"));
                }
                let mut scale = Vec::with_capacity(data_min.len());
                let mut offset = Vec::with_capacity(data_min.len());
                for (&min, &max) in data_min.iter().zip(data_max) {
                    let range = max - min;
                    // constant column: unit range
                    let range = if range == 0.0 { 1.0 } else { range };
                    let s = (hi - lo) / range;
                    scale.push(s);
                    offset.push(lo - min * s);
                }
                (scale, offset)
            }
            ScalerParams::Standard { mean, std } => {
                if mean.len() != std.len() {
                    return Err(invalid("standard scaler has mismatched mean/std lengths"));
                }
                let scale: Vec<f64> = std.iter().map(|&sd| if sd == 0.0 { 1.0 } else { 1.0 / sd }).collect();
                let offset: Vec<f64> = mean.iter().zip(&scale).map(|(&m, &s)| -m * s).collect();
                (scale, offset)
            }
        };

        if scale.is_empty() {
            return Err(invalid("scaler has no columns"));
        }
        if scale.iter().chain(offset.iter()).any(|v: &f64| !v.is_finite()) {
            return Err(invalid("scaler parameters must be finite"));
        }

        Ok(Self {
            params,
            scale: Array1::from(scale),
            offset: Array1::from(offset),
        })
    }

    pub fn params(&self) -> &ScalerParams {
        &self.params
    }

    pub fn n_features(&self) -> usize {
        self.scale.len()
    }

    /// Physical units → model space. `data` is (rows, n_features).
    pub fn scale(&self, data: &Array2<f64>) -> Result<Array2<f64>, ForecastError> {
        self.check_width("scale", data)?;
        Ok(data * &self.scale + &self.offset)
    }

    /// Model space → physical units. Exact inverse of [`FeatureScaler::scale`].
    pub fn unscale(&self, data: &Array2<f64>) -> Result<Array2<f64>, ForecastError> {
        self.check_width("unscale", data)?;
        Ok((data - &self.offset) / &self.scale)
    }

    fn check_width(&self, context: &'static str, data: &Array2<f64>) -> Result<(), ForecastError> {
        if data.ncols() != self.n_features() {
            return Err(ForecastError::ShapeMismatch {
                context,
                expected: self.n_features(),
                actual: data.ncols(),
            });
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> ForecastError {
    ForecastError::InvalidConfig(msg.to_string())
}
