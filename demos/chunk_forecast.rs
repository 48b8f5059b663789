use chrono::{Duration, Utc};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde_json::json;

use lstm_forecast::observability::{init_logging, log_run_config, logging_config_from_env};
use lstm_forecast::{
    ArtifactPaths, FeatureAligner, FeatureScaler, FeatureSchema, ForecastArtifacts, ForecastConfig, ForecastOutcome,
    ForecastPipeline, InMemorySource, LstmRegressor, ObservationRecord, Reporter, SavedModel, ScalerParams,
};

const WIND_DIRS: [&str; 4] = ["N", "E", "S", "W"];
const CONDITIONS: [&str; 3] = ["Sunny", "Partly cloudy", "Light rain"];

/// Two days of synthetic hourly readings shaped like a provider history response
fn generate_history(hours: usize) -> Vec<ObservationRecord> {
    let mut rng = rand::thread_rng();
    let noise = Normal::new(0.0, 0.8).unwrap();
    let start = Utc::now() - Duration::hours(hours as i64);

    (0..hours)
        .map(|h| {
            let daily = (2.0 * std::f64::consts::PI * (h % 24) as f64 / 24.0).sin();
            let temp = 24.0 + 6.0 * daily + noise.sample(&mut rng);
            let humidity = (65.0 - 15.0 * daily + noise.sample(&mut rng) * 5.0).clamp(20.0, 100.0);
            let precip = if rng.gen_bool(0.15) { rng.gen_range(0.0..4.0) } else { 0.0 };

            ObservationRecord::new()
                .with("time_epoch", (start + Duration::hours(h as i64)).timestamp())
                .with("lat", 18.53)
                .with("lon", 73.85)
                .with("temp_c", temp)
                .with("humidity", humidity)
                .with("precip_mm", precip)
                .with("wind_kph", rng.gen_range(2.0..25.0))
                .with("wind_dir", WIND_DIRS[rng.gen_range(0..WIND_DIRS.len())])
                .with("condition", json!({"text": CONDITIONS[rng.gen_range(0..CONDITIONS.len())]}))
        })
        .collect()
}

fn build_schema() -> FeatureSchema {
    let mut columns: Vec<String> = ["latitude", "longitude", "temp_c", "humidity", "precip_mm", "wind_kph"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    columns.extend(WIND_DIRS.iter().map(|d| format!("wind_dir_{}", d)));
    columns.extend(CONDITIONS.iter().map(|c| format!("condition_text_{}", c)));
    FeatureSchema::new(columns).expect("demo schema is valid")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logging = logging_config_from_env();
    init_logging(&logging)?;

    let mut config = ForecastConfig::from_env();
    config.artifact_dir = std::env::temp_dir().join("lstm-forecast-demo");
    std::fs::create_dir_all(&config.artifact_dir)?;
    log_run_config(&logging, &config);

    println!("🌤️ Chunk-based LSTM weather forecast");
    println!("====================================\n");

    // Stand-in for the training side: fit a min-max scaler on the history and
    // save an untrained model so the load path is exercised.
    let history = generate_history(48);
    let schema = build_schema();
    let aligned = FeatureAligner::default().align(&history, &schema)?;
    let column_min: Vec<f64> = aligned.matrix.columns().into_iter().map(|c| c.fold(f64::INFINITY, |a, &b| a.min(b))).collect();
    let column_max: Vec<f64> = aligned.matrix.columns().into_iter().map(|c| c.fold(f64::NEG_INFINITY, |a, &b| a.max(b))).collect();
    let scaler = FeatureScaler::from_params(ScalerParams::MinMax {
        data_min: column_min,
        data_max: column_max,
        feature_range: (0.0, 1.0),
    })?;

    let model = LstmRegressor::new(schema.len(), 32, 2, config.target_columns.len());
    let paths = ArtifactPaths::in_dir(&config.artifact_dir);
    ForecastArtifacts {
        metadata: SavedModel::new(&model, "demo_weather_lstm".to_string(), config.sequence_length, None).metadata,
        model,
        schema,
        scaler,
    }
    .save(&paths)?;
    println!("💾 Artifacts written to {}", config.artifact_dir.display());

    let artifacts = ForecastArtifacts::load(&paths)?;
    let targets = artifacts.schema.targets(&config.target_columns)?;
    let pipeline = ForecastPipeline::from_artifacts(&config, &artifacts, &targets)?;
    let source = InMemorySource::new().with_location("Pune", history);

    for days in [5usize, 14] {
        println!("\n🔮 {}-day request for Pune", days);
        match pipeline.forecast(&source, "Pune", days, Utc::now())? {
            ForecastOutcome::Direct { days } => {
                println!("Horizon of {} days is served by the provider's own forecast.", days);
            }
            ForecastOutcome::Chunked { run, alignment } => {
                println!(
                    "Aligned with {} zero-filled columns, {} live columns dropped",
                    alignment.zero_filled(),
                    alignment.dropped_live.len()
                );
                print!("{}", Reporter::default().render(&run));
            }
        }
    }

    Ok(())
}
