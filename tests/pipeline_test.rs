use chrono::{TimeZone, Utc};
use ndarray::{arr2, Array2, ArrayView2};
use serde_json::json;
use lstm_forecast::{
    observation::parse_history_payload, ArtifactPaths, DayStatus, FeatureScaler, FeatureSchema, ForecastArtifacts,
    ForecastConfig, ForecastError, ForecastOutcome, ForecastPipeline, HistoryFileSource, InMemorySource, LstmRegressor,
    ObservationRecord, Reporter, SavedModel, ScalerParams, SequenceModel,
};

struct Fixed;

impl SequenceModel for Fixed {
    fn input_size(&self) -> usize {
        7
    }

    fn output_size(&self) -> usize {
        3
    }

    fn infer(&self, _window: ArrayView2<f64>) -> Array2<f64> {
        arr2(&[[0.5, 0.0, 0.55]])
    }
}

fn schema() -> FeatureSchema {
    FeatureSchema::new(
        [
            "latitude",
            "longitude",
            "temp_c",
            "precip_mm",
            "humidity",
            "wind_dir_N",
            "condition_text_Clear",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
    )
    .unwrap()
}

fn scaler() -> FeatureScaler {
    FeatureScaler::from_params(ScalerParams::MinMax {
        data_min: vec![-90.0, -180.0, -20.0, 0.0, 0.0, 0.0, 0.0],
        data_max: vec![90.0, 180.0, 20.0, 10.0, 100.0, 1.0, 1.0],
        feature_range: (0.0, 1.0),
    })
    .unwrap()
}

fn hour(i: usize) -> serde_json::Value {
    json!({
        "time_epoch": 1792281600 + 3600 * i as i64,
        "time": format!("2026-10-18 {:02}:00", i % 24),
        "temp_c": 15.0 + i as f64 * 0.1,
        "precip_mm": 0.0,
        "humidity": 60,
        "wind_dir": if i % 2 == 0 { "N" } else { "WSW" },
        "condition": {"text": "Clear", "code": 1000}
    })
}

fn records(count: usize) -> Vec<ObservationRecord> {
    let payload = json!({
        "location": {"name": "Pune", "lat": 18.53, "lon": 73.85},
        "forecast": {"forecastday": [{"hour": (0..count).map(hour).collect::<Vec<_>>()}]}
    });
    parse_history_payload(&payload.to_string()).unwrap()
}

#[test]
fn test_short_horizon_is_direct_passthrough() {
    let config = ForecastConfig::default();
    let (schema, scaler) = (schema(), scaler());
    let targets = schema.targets(&config.target_columns).unwrap();
    let pipeline = ForecastPipeline::new(&config, &Fixed, &scaler, &schema, &targets).unwrap();

    let outcome = pipeline
        .forecast(&InMemorySource::new(), "Pune", 10, Utc::now())
        .unwrap();

    assert!(matches!(outcome, ForecastOutcome::Direct { days: 10 }));
}

#[test]
fn test_long_horizon_runs_chunk_forecast() {
    let config = ForecastConfig::default();
    let (schema, scaler) = (schema(), scaler());
    let targets = schema.targets(&config.target_columns).unwrap();
    let pipeline = ForecastPipeline::new(&config, &Fixed, &scaler, &schema, &targets).unwrap();
    let source = InMemorySource::new().with_location("Pune", records(24));
    let origin = Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap();

    let outcome = pipeline.forecast(&source, "Pune", 12, origin).unwrap();

    let (run, alignment) = match outcome {
        ForecastOutcome::Chunked { run, alignment } => (run, alignment),
        other => panic!("expected chunked forecast, got {:?}", other),
    };
    assert_eq!(run.hour_count(), 12 * 24);
    assert!(run.days.iter().all(|d| d.status == DayStatus::Predicted));
    assert!(alignment.missing_numeric.is_empty());
    assert_eq!(alignment.dropped_live, vec!["time_epoch".to_string(), "wind_dir_WSW".to_string()]);

    let temp = run.target_index("temp_c").unwrap();
    let humidity = run.target_index("humidity").unwrap();
    let first = &run.days[0].hours[0];
    assert!((first.values[temp] - 0.0).abs() < 1e-9);
    assert!((first.values[humidity] - 55.0).abs() < 1e-9);

    let report = Reporter::default().render(&run);
    assert_eq!(report.lines().count(), 12);
    assert!(report.starts_with("Day 1 (2026-10-19): Temp: 0.0°C, Precipitation: 0.00mm, Humidity: 55%"));
}

#[test]
fn test_history_shortfall_is_fatal() {
    let config = ForecastConfig::default();
    let (schema, scaler) = (schema(), scaler());
    let targets = schema.targets(&config.target_columns).unwrap();
    let pipeline = ForecastPipeline::new(&config, &Fixed, &scaler, &schema, &targets).unwrap();
    let source = InMemorySource::new().with_location("Pune", records(23));

    let err = pipeline.forecast(&source, "Pune", 15, Utc::now()).unwrap_err();
    assert!(matches!(err, ForecastError::InsufficientHistory { required: 24, available: 23 }));
}

#[test]
fn test_unknown_location_is_external_error() {
    let config = ForecastConfig::default();
    let (schema, scaler) = (schema(), scaler());
    let targets = schema.targets(&config.target_columns).unwrap();
    let pipeline = ForecastPipeline::new(&config, &Fixed, &scaler, &schema, &targets).unwrap();

    let err = pipeline.forecast(&InMemorySource::new(), "Atlantis", 20, Utc::now()).unwrap_err();
    assert!(matches!(err, ForecastError::ExternalSource(_)));
}

#[test]
fn test_foreign_records_are_schema_mismatch() {
    let config = ForecastConfig::default();
    let (schema, scaler) = (schema(), scaler());
    let targets = schema.targets(&config.target_columns).unwrap();
    let pipeline = ForecastPipeline::new(&config, &Fixed, &scaler, &schema, &targets).unwrap();
    let foreign = (0..24)
        .map(|i| ObservationRecord::new().with("pressure_mb", 1010.0 + i as f64))
        .collect();
    let source = InMemorySource::new().with_location("Pune", foreign);

    let err = pipeline.forecast(&source, "Pune", 20, Utc::now()).unwrap_err();
    assert!(matches!(err, ForecastError::SchemaMismatch { .. }));
}

#[test]
fn test_zero_fill_threshold_from_config() {
    let mut config = ForecastConfig::default();
    config.max_missing_fraction = Some(0.2);
    let (schema, scaler) = (schema(), scaler());
    let targets = schema.targets(&config.target_columns).unwrap();
    let pipeline = ForecastPipeline::new(&config, &Fixed, &scaler, &schema, &targets).unwrap();
    let sparse = (0..24)
        .map(|i| ObservationRecord::new().with("temp_c", 10.0 + i as f64))
        .collect();
    let source = InMemorySource::new().with_location("Pune", sparse);

    let err = pipeline.forecast(&source, "Pune", 20, Utc::now()).unwrap_err();
    assert!(matches!(err, ForecastError::ExcessiveZeroFill { .. }));
}

#[test]
fn test_file_source_feeds_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let source = HistoryFileSource::new(dir.path());
    let payload = json!({
        "location": {"lat": 18.53, "lon": 73.85},
        "forecast": {"forecastday": [
            {"hour": (0..24).map(hour).collect::<Vec<_>>()},
            {"hour": (24..30).map(hour).collect::<Vec<_>>()}
        ]}
    });
    std::fs::write(source.path_for("Pune"), payload.to_string()).unwrap();

    let config = ForecastConfig::default();
    let (schema, scaler) = (schema(), scaler());
    let targets = schema.targets(&config.target_columns).unwrap();
    let pipeline = ForecastPipeline::new(&config, &Fixed, &scaler, &schema, &targets).unwrap();

    match pipeline.forecast(&source, "Pune", 11, Utc::now()).unwrap() {
        ForecastOutcome::Chunked { run, .. } => assert_eq!(run.hour_count(), 11 * 24),
        other => panic!("expected chunked forecast, got {:?}", other),
    }
}

fn saved_artifacts(dir: &std::path::Path, trained_window: usize) -> ForecastArtifacts {
    let model = LstmRegressor::new(7, 4, 1, 3);
    let paths = ArtifactPaths::in_dir(dir);
    ForecastArtifacts {
        metadata: SavedModel::new(&model, "weather".to_string(), trained_window, None).metadata,
        model,
        schema: schema(),
        scaler: scaler(),
    }
    .save(&paths)
    .unwrap();
    ForecastArtifacts::load(&paths).unwrap()
}

#[test]
fn test_configured_window_must_match_trained_window() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = saved_artifacts(dir.path(), 24);
    let mut config = ForecastConfig::default();
    let targets = artifacts.schema.targets(&config.target_columns).unwrap();

    assert!(ForecastPipeline::from_artifacts(&config, &artifacts, &targets).is_ok());

    config.sequence_length = 48;
    let err = ForecastPipeline::from_artifacts(&config, &artifacts, &targets).err().unwrap();
    assert!(matches!(err, ForecastError::InvalidConfig(_)));
}

#[test]
fn test_loaded_artifacts_forecast_with_distinct_hours() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = saved_artifacts(dir.path(), 24);
    let config = ForecastConfig::default();
    let targets = artifacts.schema.targets(&config.target_columns).unwrap();
    let pipeline = ForecastPipeline::from_artifacts(&config, &artifacts, &targets).unwrap();
    let source = InMemorySource::new().with_location("Pune", records(24));
    let origin = Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap();

    let run = match pipeline.forecast(&source, "Pune", 11, origin).unwrap() {
        ForecastOutcome::Chunked { run, .. } => run,
        other => panic!("expected chunked forecast, got {:?}", other),
    };

    let stamps: Vec<_> = run.hourly().map(|h| h.timestamp).collect();
    assert_eq!(stamps.len(), 11 * 24);
    assert!(stamps.windows(2).all(|pair| pair[1] - pair[0] == chrono::Duration::hours(1)));
}
