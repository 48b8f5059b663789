use ndarray::{Array2, ArrayView2};
use tracing::{debug, warn};

use crate::error::ForecastError;
use crate::schema::TargetIndexSet;
use crate::utils::count_non_finite;
use crate::window::SequenceWindow;

/// A trained sequence model, treated as an opaque synchronous function.
///
/// `infer` receives a (timesteps, input_size) window in scaled feature space
/// and returns scaled target values: one row for a single representative
/// prediction, or one row per timestep.
pub trait SequenceModel {
    fn input_size(&self) -> usize;
    fn output_size(&self) -> usize;
    fn infer(&self, window: ArrayView2<f64>) -> Array2<f64>;
}

/// Result of one model invocation.
#[derive(Clone, Debug, PartialEq)]
pub enum StepOutcome {
    Predicted(Array2<f64>),
    /// The model produced NaN/Inf; `fallback` holds the window's own target
    /// columns so the run can freeze forward.
    InstabilityDetected { fallback: Array2<f64>, non_finite: usize },
}

impl StepOutcome {
    /// Scaled target values to inject into the next window.
    pub fn values(&self) -> &Array2<f64> {
        match self {
            StepOutcome::Predicted(values) => values,
            StepOutcome::InstabilityDetected { fallback, .. } => fallback,
        }
    }
}

/// Runs the model on one window and guards against unstable output.
pub struct StepPredictor<'a, M: SequenceModel> {
    model: &'a M,
    targets: &'a TargetIndexSet,
}

impl<'a, M: SequenceModel> StepPredictor<'a, M> {
    pub fn new(model: &'a M, targets: &'a TargetIndexSet) -> Self {
        Self { model, targets }
    }

    pub fn predict(&self, window: &SequenceWindow) -> Result<StepOutcome, ForecastError> {
        let raw = self.model.infer(window.view());
        let (rows, cols) = raw.dim();
        if cols != self.targets.len() || (rows != 1 && rows != window.len()) {
            return Err(ForecastError::ModelShape {
                rows,
                cols,
                window_len: window.len(),
                targets: self.targets.len(),
            });
        }

        let non_finite = count_non_finite(raw.iter());
        if non_finite > 0 {
            warn!(
                component = "predictor",
                event = "predictor.instability",
                non_finite,
                "model output contained NaN/Inf, freezing targets forward"
            );
            return Ok(StepOutcome::InstabilityDetected {
                fallback: window.target_values(self.targets),
                non_finite,
            });
        }

        debug!(component = "predictor", event = "predictor.step", rows, cols);
        Ok(StepOutcome::Predicted(raw))
    }
}
