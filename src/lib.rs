//! # LSTM Chunk Forecaster
//!
//! Multi-day weather forecasting on top of a sequence model trained to look
//! only one window (24 hourly rows) ahead. The model is rolled forward one
//! day at a time: its prediction for the target variables is written into a
//! synthesized next window that carries every other feature forward.
//!
//! ## Core Components
//!
//! - **FeatureAligner**: raw observation records → fixed-width feature rows in trained schema order
//! - **FeatureScaler**: pre-fitted min-max / standard scaling and its exact inverse
//! - **SequenceWindow**: the current window of scaled rows and next-window synthesis
//! - **StepPredictor**: one model call with NaN/Inf detection and freeze-forward fallback
//! - **ChunkForecaster**: the sequential day loop producing hourly physical-unit forecasts
//! - **LstmRegressor**: a stacked LSTM with a dense head, loadable from JSON or bincode
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::Utc;
//! use ndarray::Array2;
//! use lstm_forecast::{ChunkForecaster, FeatureScaler, FeatureSchema, LstmRegressor, ScalerParams};
//!
//! let schema = FeatureSchema::new(vec!["temp_c".into(), "precip_mm".into(), "humidity".into()]).unwrap();
//! let targets = schema.targets(&["temp_c", "precip_mm", "humidity"]).unwrap();
//! let scaler = FeatureScaler::from_params(ScalerParams::MinMax {
//!     data_min: vec![-20.0, 0.0, 0.0],
//!     data_max: vec![45.0, 50.0, 100.0],
//!     feature_range: (0.0, 1.0),
//! }).unwrap();
//! let model = LstmRegressor::new(3, 16, 2, 3);
//!
//! let forecaster = ChunkForecaster::new(&model, &scaler, &schema, &targets, 24).unwrap();
//! let history = Array2::from_elem((24, 3), 0.5);
//! let run = forecaster.run(&history, 14, Utc::now()).unwrap();
//! assert_eq!(run.hour_count(), 14 * 24);
//! ```

pub mod config;
pub mod error;
pub mod features;
pub mod forecaster;
pub mod layers;
pub mod models;
pub mod observability;
pub mod observation;
pub mod persistence;
pub mod pipeline;
pub mod predictor;
pub mod report;
pub mod scaler;
pub mod schema;
pub mod utils;
pub mod window;

// Re-export commonly used items
pub use config::{ForecastConfig, ForecastPlan};
pub use error::ForecastError;
pub use features::{AlignedFeatures, AlignmentReport, CategoricalField, FeatureAligner};
pub use forecaster::{ChunkForecaster, DailyForecastResult, DayStatus, ForecastRun, ForecastSession, ForecastState, HourlyForecast};
pub use models::lstm_network::LSTMNetwork;
pub use models::regressor::LstmRegressor;
pub use observation::{HistoryFileSource, InMemorySource, ObservationRecord, ObservationSource};
pub use persistence::{ArtifactError, ArtifactPaths, ForecastArtifacts, ModelMetadata, ModelPersistence, SavedModel};
pub use pipeline::{ForecastOutcome, ForecastPipeline};
pub use predictor::{SequenceModel, StepOutcome, StepPredictor};
pub use report::{Reporter, TargetLabel};
pub use scaler::{FeatureScaler, ScalerParams};
pub use schema::{FeatureSchema, TargetIndexSet};
pub use window::SequenceWindow;
