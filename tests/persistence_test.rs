use ndarray::Array2;
use lstm_forecast::{
    persistence::{ArtifactError, ArtifactPaths, ForecastArtifacts, ModelMetadata, ModelPersistence, SavedModel},
    FeatureScaler, FeatureSchema, ForecastConfig, ForecastError, LstmRegressor, ScalerParams, SequenceModel,
};
use tempfile::tempdir;

fn schema() -> FeatureSchema {
    FeatureSchema::new(
        ["temp_c", "precip_mm", "humidity", "latitude", "wind_dir_N"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    )
    .unwrap()
}

fn scaler() -> FeatureScaler {
    FeatureScaler::from_params(ScalerParams::MinMax {
        data_min: vec![-20.0, 0.0, 0.0, -90.0, 0.0],
        data_max: vec![45.0, 80.0, 100.0, 90.0, 1.0],
        feature_range: (0.0, 1.0),
    })
    .unwrap()
}

fn max_abs_diff(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    (a - b).mapv(|x| x.abs()).fold(0.0, |acc, &x| f64::max(acc, x))
}

#[test]
fn test_model_metadata_creation() {
    let model = LstmRegressor::new(5, 10, 3, 3);
    let saved = SavedModel::new(&model, "weather_lstm".to_string(), 24, Some("hourly chunks".to_string()));

    let metadata: &ModelMetadata = &saved.metadata;
    assert_eq!(metadata.model_name, "weather_lstm");
    assert_eq!(metadata.input_size, 5);
    assert_eq!(metadata.hidden_size, 10);
    assert_eq!(metadata.num_layers, 3);
    assert_eq!(metadata.output_size, 3);
    assert_eq!(metadata.sequence_length, 24);
    assert_eq!(metadata.version, env!("CARGO_PKG_VERSION"));
}

#[test]
fn test_model_save_load_json() {
    let dir = tempdir().unwrap();
    let file_path = dir.path().join("model.json");

    let model = LstmRegressor::new(5, 4, 2, 3);
    let window = Array2::from_shape_fn((24, 5), |(r, c)| ((r + c) % 7) as f64 / 7.0);
    let output_before = model.infer(window.view());

    ModelPersistence::save(&SavedModel::new(&model, "json_model".to_string(), 24, None), &file_path).unwrap();
    assert!(file_path.exists());

    let (loaded, metadata) = ModelPersistence::load(&file_path).unwrap().into_model().unwrap();
    assert_eq!(metadata.model_name, "json_model");

    let output_after = loaded.infer(window.view());
    assert_eq!(output_before.shape(), output_after.shape());
    assert!(max_abs_diff(&output_before, &output_after) < 1e-10);
}

#[test]
fn test_model_save_load_binary() {
    let dir = tempdir().unwrap();
    let file_path = dir.path().join("model.bin");

    let model = LstmRegressor::new(5, 6, 1, 3);
    let window = Array2::from_elem((24, 5), 0.4);

    ModelPersistence::save(&SavedModel::new(&model, "bin_model".to_string(), 24, None), &file_path).unwrap();
    let (loaded, _) = ModelPersistence::load_from_binary(&file_path).unwrap().into_model().unwrap();

    assert_eq!(model.infer(window.view()), loaded.infer(window.view()));
}

#[test]
fn test_artifacts_round_trip_through_directory() {
    let dir = tempdir().unwrap();
    let paths = ArtifactPaths::in_dir(dir.path());

    let model = LstmRegressor::new(5, 8, 2, 3);
    let artifacts = ForecastArtifacts {
        metadata: SavedModel::new(&model, "weather".to_string(), 24, None).metadata,
        model,
        schema: schema(),
        scaler: scaler(),
    };
    artifacts.save(&paths).unwrap();

    let loaded = ForecastArtifacts::load(&paths).unwrap();
    assert_eq!(loaded.schema, artifacts.schema);
    assert_eq!(loaded.scaler.params(), artifacts.scaler.params());
    assert_eq!(loaded.metadata.sequence_length, 24);

    let window = Array2::from_elem((24, 5), 0.1);
    assert_eq!(artifacts.model.infer(window.view()), loaded.model.infer(window.view()));
}

#[test]
fn test_schema_scaler_width_mismatch_is_fatal() {
    let dir = tempdir().unwrap();
    let paths = ArtifactPaths::in_dir(dir.path());

    let model = LstmRegressor::new(5, 4, 1, 3);
    let artifacts = ForecastArtifacts {
        metadata: SavedModel::new(&model, "weather".to_string(), 24, None).metadata,
        model,
        schema: schema(),
        scaler: scaler(),
    };
    artifacts.save(&paths).unwrap();
    std::fs::write(&paths.features, r#"["temp_c", "precip_mm", "humidity"]"#).unwrap();

    let err = ForecastArtifacts::load(&paths).unwrap_err();
    assert!(matches!(err, ArtifactError::Invalid(_)));
}

#[test]
fn test_missing_artifacts_fail_to_load() {
    let dir = tempdir().unwrap();
    let err = ForecastArtifacts::load(&ArtifactPaths::in_dir(dir.path())).unwrap_err();
    assert!(matches!(err, ArtifactError::Io { .. }));
}

#[test]
fn test_corrupt_model_file() {
    let dir = tempdir().unwrap();
    let file_path = dir.path().join("model.json");
    std::fs::write(&file_path, "{ not json").unwrap();

    let err = ModelPersistence::load(&file_path).err().unwrap();
    assert!(matches!(err, ArtifactError::Serialization(_)));
}

#[test]
fn test_check_config_against_training_metadata() {
    let model = LstmRegressor::new(5, 4, 1, 3);
    let artifacts = ForecastArtifacts {
        metadata: SavedModel::new(&model, "weather".to_string(), 24, None).metadata,
        model,
        schema: schema(),
        scaler: scaler(),
    };

    let mut config = ForecastConfig::default();
    assert!(artifacts.check_config(&config).is_ok());

    config.sequence_length = 48;
    assert!(matches!(artifacts.check_config(&config), Err(ForecastError::InvalidConfig(_))));

    config.sequence_length = 24;
    config.target_columns = vec!["temp_c".to_string()];
    assert!(matches!(artifacts.check_config(&config), Err(ForecastError::InvalidConfig(_))));
}
