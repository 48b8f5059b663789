//! Day-by-day rollout of a short-horizon sequence model.
//!
//! Each day the model sees the current window, its target prediction is
//! written into a copy of the window's last row repeated for a full window,
//! and that synthesized window becomes the next day's input. Non-target
//! features (location, categorical encodings, ...) therefore persist for the
//! whole horizon.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use ndarray::Array2;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::ForecastError;
use crate::predictor::{SequenceModel, StepOutcome, StepPredictor};
use crate::scaler::FeatureScaler;
use crate::schema::{FeatureSchema, TargetIndexSet};
use crate::window::SequenceWindow;

/// Lifecycle of a forecast session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ForecastState {
    Seeded,
    Running,
    Completed,
    Failed,
}

/// Whether a day came from the model or from the freeze-forward fallback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DayStatus {
    Predicted,
    FrozenForward,
}

/// One hour of forecast output in physical units.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HourlyForecast {
    pub timestamp: DateTime<Utc>,
    /// One value per target, in target order.
    pub values: Vec<f64>,
}

/// All hours of one forecast day.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DailyForecastResult {
    /// 1-based day index.
    pub day: usize,
    pub date: NaiveDate,
    pub status: DayStatus,
    pub hours: Vec<HourlyForecast>,
}

impl DailyForecastResult {
    /// Mean of one target over the day's hours; `None` for an unknown
    /// target or a day without hours.
    pub fn mean(&self, target: usize) -> Option<f64> {
        if self.hours.is_empty() {
            return None;
        }
        let mut sum = 0.0;
        for hour in &self.hours {
            sum += *hour.values.get(target)?;
        }
        Some(sum / self.hours.len() as f64)
    }
}

/// A finished forecast.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ForecastRun {
    pub target_names: Vec<String>,
    pub days: Vec<DailyForecastResult>,
    pub state: ForecastState,
}

impl ForecastRun {
    /// Every hourly entry, in chronological order.
    pub fn hourly(&self) -> impl Iterator<Item = &HourlyForecast> {
        self.days.iter().flat_map(|d| d.hours.iter())
    }

    pub fn hour_count(&self) -> usize {
        self.days.iter().map(|d| d.hours.len()).sum()
    }

    pub fn fallback_days(&self) -> usize {
        self.days.iter().filter(|d| d.status == DayStatus::FrozenForward).count()
    }

    pub fn target_index(&self, name: &str) -> Option<usize> {
        self.target_names.iter().position(|n| n == name)
    }
}

/// Rolls a trained sequence model forward one window-sized chunk per day.
///
/// Artifacts are borrowed read-only; all mutable state lives in the
/// [`ForecastSession`] created by [`ChunkForecaster::start`].
pub struct ChunkForecaster<'a, M: SequenceModel> {
    model: &'a M,
    scaler: &'a FeatureScaler,
    schema: &'a FeatureSchema,
    targets: &'a TargetIndexSet,
    sequence_length: usize,
}

impl<'a, M: SequenceModel> ChunkForecaster<'a, M> {
    /// Checks that the artifacts agree with each other before any run.
    pub fn new(
        model: &'a M,
        scaler: &'a FeatureScaler,
        schema: &'a FeatureSchema,
        targets: &'a TargetIndexSet,
        sequence_length: usize,
    ) -> Result<Self, ForecastError> {
        if sequence_length == 0 {
            return Err(ForecastError::InvalidConfig("sequence_length must be positive".to_string()));
        }
        if scaler.n_features() != schema.len() {
            return Err(ForecastError::ShapeMismatch {
                context: "scaler",
                expected: schema.len(),
                actual: scaler.n_features(),
            });
        }
        if model.input_size() != schema.len() {
            return Err(ForecastError::ShapeMismatch {
                context: "model input",
                expected: schema.len(),
                actual: model.input_size(),
            });
        }
        if model.output_size() != targets.len() {
            return Err(ForecastError::ShapeMismatch {
                context: "model output",
                expected: targets.len(),
                actual: model.output_size(),
            });
        }
        if let Some(&bad) = targets.positions().iter().find(|&&p| p >= schema.len()) {
            return Err(ForecastError::InvalidConfig(format!("target position {} outside schema", bad)));
        }

        Ok(Self {
            model,
            scaler,
            schema,
            targets,
            sequence_length,
        })
    }

    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.schema
    }

    pub fn scaler(&self) -> &FeatureScaler {
        self.scaler
    }

    pub fn targets(&self) -> &TargetIndexSet {
        self.targets
    }

    /// Seeds a session from scaled history, (rows, schema columns). Only the
    /// most recent `sequence_length` rows are used.
    pub fn start(&self, scaled_history: &Array2<f64>, origin: DateTime<Utc>) -> Result<ForecastSession<'_, 'a, M>, ForecastError> {
        if scaled_history.ncols() != self.schema.len() {
            return Err(ForecastError::ShapeMismatch {
                context: "history",
                expected: self.schema.len(),
                actual: scaled_history.ncols(),
            });
        }

        let window = SequenceWindow::seed(scaled_history, self.sequence_length)?;
        debug!(
            component = "forecaster",
            event = "forecast.seeded",
            history_rows = scaled_history.nrows(),
            window = self.sequence_length
        );

        Ok(ForecastSession {
            forecaster: self,
            window,
            origin,
            days_done: 0,
            state: ForecastState::Seeded,
        })
    }

    /// Runs `days` days to completion.
    pub fn run(&self, scaled_history: &Array2<f64>, days: usize, origin: DateTime<Utc>) -> Result<ForecastRun, ForecastError> {
        if days == 0 {
            return Err(ForecastError::InvalidHorizon(days));
        }

        let mut session = self.start(scaled_history, origin)?;
        info!(
            component = "forecaster",
            event = "forecast.start",
            days,
            window = self.sequence_length,
            targets = ?self.targets.names()
        );

        let mut results = Vec::with_capacity(days);
        for _ in 0..days {
            results.push(session.step()?);
        }
        session.complete();

        let run = ForecastRun {
            target_names: self.targets.names().to_vec(),
            days: results,
            state: session.state(),
        };
        info!(
            component = "forecaster",
            event = "forecast.completed",
            days,
            hours = run.hour_count(),
            fallback_days = run.fallback_days()
        );
        Ok(run)
    }
}

/// Mutable state of one forecast run: the current window and day counter.
///
/// Callers may drive it day by day with [`ForecastSession::step`] and simply
/// drop it to abort between days.
pub struct ForecastSession<'f, 'a, M: SequenceModel> {
    forecaster: &'f ChunkForecaster<'a, M>,
    window: SequenceWindow,
    origin: DateTime<Utc>,
    days_done: usize,
    state: ForecastState,
}

impl<'f, 'a, M: SequenceModel> ForecastSession<'f, 'a, M> {
    pub fn state(&self) -> ForecastState {
        self.state
    }

    pub fn window(&self) -> &SequenceWindow {
        &self.window
    }

    pub fn days_done(&self) -> usize {
        self.days_done
    }

    /// Marks the session finished; further steps are rejected.
    pub fn complete(&mut self) {
        if self.state != ForecastState::Failed {
            self.state = ForecastState::Completed;
        }
    }

    /// Forecasts the next day and advances the window.
    pub fn step(&mut self) -> Result<DailyForecastResult, ForecastError> {
        if matches!(self.state, ForecastState::Completed | ForecastState::Failed) {
            return Err(ForecastError::InvalidConfig(format!(
                "forecast session is {:?}",
                self.state
            )));
        }
        self.state = ForecastState::Running;

        match self.advance() {
            Ok(result) => Ok(result),
            Err(e) => {
                self.state = ForecastState::Failed;
                Err(e)
            }
        }
    }

    fn advance(&mut self) -> Result<DailyForecastResult, ForecastError> {
        let f = self.forecaster;
        let day = self.days_done + 1;

        let outcome = StepPredictor::new(f.model, f.targets).predict(&self.window)?;
        let status = match outcome {
            StepOutcome::Predicted(_) => DayStatus::Predicted,
            StepOutcome::InstabilityDetected { non_finite, .. } => {
                debug!(
                    component = "forecaster",
                    event = "forecast.fallback",
                    day,
                    non_finite
                );
                DayStatus::FrozenForward
            }
        };

        let next = self.window.synthesize_next(outcome.values(), f.targets)?;
        let physical = f.scaler.unscale(next.rows())?;

        let day_start = self.origin + Duration::days(self.days_done as i64);
        let hours = physical
            .rows()
            .into_iter()
            .enumerate()
            .map(|(hour, row)| HourlyForecast {
                timestamp: day_start + Duration::hours(hour as i64),
                values: f.targets.positions().iter().map(|&p| row[p]).collect(),
            })
            .collect();

        self.window = next;
        self.days_done = day;
        debug!(component = "forecaster", event = "forecast.day", day, status = ?status);

        Ok(DailyForecastResult {
            day,
            date: day_start.date_naive(),
            status,
            hours,
        })
    }
}
