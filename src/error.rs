use thiserror::Error;

use crate::persistence::ArtifactError;

/// Errors that stop a forecast run before (or instead of) producing results.
///
/// Numerical instability inside the day loop is deliberately absent: it is
/// reported through [`crate::predictor::StepOutcome`] and
/// [`crate::forecaster::DayStatus`] and never aborts a run.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("no live column matches the trained schema ({live_columns} live columns, {schema_columns} schema columns)")]
    SchemaMismatch {
        live_columns: usize,
        schema_columns: usize,
    },
    #[error("{missing} of {numeric_total} numeric schema columns were zero-filled (limit {limit:.2})")]
    ExcessiveZeroFill {
        missing: usize,
        numeric_total: usize,
        limit: f64,
    },
    #[error("insufficient history: need {required} observations, got {available}")]
    InsufficientHistory { required: usize, available: usize },
    #[error("artifact error: {0}")]
    Artifact(#[from] ArtifactError),
    #[error("observation source error: {0}")]
    ExternalSource(String),
    #[error("invalid forecast horizon: {0} days")]
    InvalidHorizon(usize),
    #[error("model returned a {rows}x{cols} prediction, expected 1x{targets} or {window_len}x{targets}")]
    ModelShape {
        rows: usize,
        cols: usize,
        window_len: usize,
        targets: usize,
    },
    #[error("{context}: expected {expected} columns, got {actual}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
