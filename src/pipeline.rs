use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::{ForecastConfig, ForecastPlan};
use crate::error::ForecastError;
use crate::features::{AlignmentReport, FeatureAligner};
use crate::models::regressor::LstmRegressor;
use crate::persistence::ForecastArtifacts;
use crate::forecaster::{ChunkForecaster, ForecastRun};
use crate::observation::ObservationSource;
use crate::predictor::SequenceModel;
use crate::scaler::FeatureScaler;
use crate::schema::{FeatureSchema, TargetIndexSet};

/// What a caller gets back for a horizon request.
#[derive(Debug)]
pub enum ForecastOutcome {
    /// Horizon is short enough for the provider's native forecast; nothing
    /// was computed here.
    Direct { days: usize },
    Chunked {
        run: ForecastRun,
        alignment: AlignmentReport,
    },
}

/// Observations → aligned features → scaled history → chunk forecast.
pub struct ForecastPipeline<'a, M: SequenceModel> {
    config: &'a ForecastConfig,
    aligner: FeatureAligner,
    forecaster: ChunkForecaster<'a, M>,
}

impl<'a, M: SequenceModel> ForecastPipeline<'a, M> {
    pub fn new(
        config: &'a ForecastConfig,
        model: &'a M,
        scaler: &'a FeatureScaler,
        schema: &'a FeatureSchema,
        targets: &'a TargetIndexSet,
    ) -> Result<Self, ForecastError> {
        config.validate()?;
        let forecaster = ChunkForecaster::new(model, scaler, schema, targets, config.sequence_length)?;
        let aligner = FeatureAligner::default().with_max_missing_fraction(config.max_missing_fraction);

        Ok(Self {
            config,
            aligner,
            forecaster,
        })
    }

    pub fn with_aligner(mut self, aligner: FeatureAligner) -> Self {
        self.aligner = aligner.with_max_missing_fraction(self.config.max_missing_fraction);
        self
    }

    pub fn forecaster(&self) -> &ChunkForecaster<'a, M> {
        &self.forecaster
    }

    /// Plans the horizon and, for long horizons, fetches history for
    /// `location` once and runs the chunk forecaster from `origin`.
    pub fn forecast<S: ObservationSource + ?Sized>(
        &self,
        source: &S,
        location: &str,
        days: usize,
        origin: DateTime<Utc>,
    ) -> Result<ForecastOutcome, ForecastError> {
        let days = match self.config.plan(days)? {
            ForecastPlan::Direct { days } => {
                info!(component = "pipeline", event = "pipeline.direct", location, days);
                return Ok(ForecastOutcome::Direct { days });
            }
            ForecastPlan::Chunked { days } => days,
        };

        let records = source.recent_observations(location)?;
        if records.len() < self.config.sequence_length {
            return Err(ForecastError::InsufficientHistory {
                required: self.config.sequence_length,
                available: records.len(),
            });
        }

        let aligned = self.aligner.align(&records, self.forecaster.schema())?;
        let scaled = self.forecaster.scaler().scale(&aligned.matrix)?;
        let run = self.forecaster.run(&scaled, days, origin)?;

        Ok(ForecastOutcome::Chunked {
            run,
            alignment: aligned.report,
        })
    }
}

impl<'a> ForecastPipeline<'a, LstmRegressor> {
    /// Builds a pipeline over loaded artifacts after checking them against
    /// `config`.
    pub fn from_artifacts(
        config: &'a ForecastConfig,
        artifacts: &'a ForecastArtifacts,
        targets: &'a TargetIndexSet,
    ) -> Result<Self, ForecastError> {
        artifacts.check_config(config)?;
        Self::new(config, &artifacts.model, &artifacts.scaler, &artifacts.schema, targets)
    }
}
