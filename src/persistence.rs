use std::convert::TryFrom;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use ndarray::{Array2, Dimension};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::ForecastConfig;
use crate::error::ForecastError;
use crate::layers::linear::LinearLayer;
use crate::layers::lstm_cell::LSTMCell;
use crate::models::lstm_network::LSTMNetwork;
use crate::models::regressor::LstmRegressor;
use crate::scaler::{FeatureScaler, ScalerParams};
use crate::schema::FeatureSchema;

/// Errors that can occur while reading or writing forecasting artifacts
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("invalid artifact: {0}")]
    Invalid(String),
}

impl From<serde_json::Error> for ArtifactError {
    fn from(error: serde_json::Error) -> Self {
        ArtifactError::Serialization(error.to_string())
    }
}

impl From<bincode::Error> for ArtifactError {
    fn from(error: bincode::Error) -> Self {
        ArtifactError::Serialization(error.to_string())
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ArtifactError + '_ {
    move |source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Serializable version of Array2<f64> for persistence
#[derive(Serialize, Deserialize)]
pub struct SerializableArray2 {
    data: Vec<f64>,
    shape: (usize, usize),
}

impl From<&Array2<f64>> for SerializableArray2 {
    fn from(array: &Array2<f64>) -> Self {
        Self {
            data: array.iter().cloned().collect(),
            shape: array.raw_dim().into_pattern(),
        }
    }
}

impl TryFrom<SerializableArray2> for Array2<f64> {
    type Error = ArtifactError;

    fn try_from(value: SerializableArray2) -> Result<Self, Self::Error> {
        Array2::from_shape_vec(value.shape, value.data)
            .map_err(|e| ArtifactError::Invalid(format!("array shape: {}", e)))
    }
}

/// Serializable LSTM cell parameters
#[derive(Serialize, Deserialize)]
pub struct SerializableLSTMCell {
    w_ih: SerializableArray2,
    w_hh: SerializableArray2,
    b_ih: SerializableArray2,
    b_hh: SerializableArray2,
    hidden_size: usize,
}

impl From<&LSTMCell> for SerializableLSTMCell {
    fn from(cell: &LSTMCell) -> Self {
        Self {
            w_ih: (&cell.w_ih).into(),
            w_hh: (&cell.w_hh).into(),
            b_ih: (&cell.b_ih).into(),
            b_hh: (&cell.b_hh).into(),
            hidden_size: cell.hidden_size,
        }
    }
}

impl TryFrom<SerializableLSTMCell> for LSTMCell {
    type Error = ArtifactError;

    fn try_from(value: SerializableLSTMCell) -> Result<Self, Self::Error> {
        Ok(LSTMCell {
            w_ih: value.w_ih.try_into()?,
            w_hh: value.w_hh.try_into()?,
            b_ih: value.b_ih.try_into()?,
            b_hh: value.b_hh.try_into()?,
            hidden_size: value.hidden_size,
        })
    }
}

/// Serializable LSTM network
#[derive(Serialize, Deserialize)]
pub struct SerializableLSTMNetwork {
    cells: Vec<SerializableLSTMCell>,
    input_size: usize,
    hidden_size: usize,
    num_layers: usize,
}

impl From<&LSTMNetwork> for SerializableLSTMNetwork {
    fn from(network: &LSTMNetwork) -> Self {
        Self {
            cells: network.get_cells().iter().map(|cell| cell.into()).collect(),
            input_size: network.input_size,
            hidden_size: network.hidden_size,
            num_layers: network.num_layers,
        }
    }
}

impl TryFrom<SerializableLSTMNetwork> for LSTMNetwork {
    type Error = ArtifactError;

    fn try_from(value: SerializableLSTMNetwork) -> Result<Self, Self::Error> {
        let cells = value
            .cells
            .into_iter()
            .map(LSTMCell::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(LSTMNetwork::from_cells(cells, value.input_size, value.hidden_size, value.num_layers))
    }
}

/// Serializable dense head
#[derive(Serialize, Deserialize)]
pub struct SerializableLinear {
    weight: SerializableArray2,
    bias: SerializableArray2,
}

/// Model metadata for tracking where a forecasting model came from
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ModelMetadata {
    pub model_name: String,
    pub version: String,
    pub created_at: String,
    pub input_size: usize,
    pub hidden_size: usize,
    pub num_layers: usize,
    pub output_size: usize,
    pub sequence_length: usize,
    pub description: Option<String>,
}

/// Complete saved model including network, head and metadata
#[derive(Serialize, Deserialize)]
pub struct SavedModel {
    pub network: SerializableLSTMNetwork,
    pub head: SerializableLinear,
    pub metadata: ModelMetadata,
}

impl SavedModel {
    /// Packs a regressor with freshly stamped metadata.
    pub fn new(model: &LstmRegressor, model_name: String, sequence_length: usize, description: Option<String>) -> Self {
        let network = model.network();
        let head = model.head();
        let metadata = ModelMetadata {
            model_name,
            version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            input_size: network.input_size,
            hidden_size: network.hidden_size,
            num_layers: network.num_layers,
            output_size: head.output_size,
            sequence_length,
            description,
        };

        SavedModel {
            network: network.into(),
            head: SerializableLinear {
                weight: (&head.weight).into(),
                bias: (&head.bias).into(),
            },
            metadata,
        }
    }

    /// Rebuilds the regressor, validating every shape.
    pub fn into_model(self) -> Result<(LstmRegressor, ModelMetadata), ArtifactError> {
        let network = LSTMNetwork::try_from(self.network)?;
        let head = LinearLayer::from_weights(self.head.weight.try_into()?, self.head.bias.try_into()?)
            .ok_or_else(|| ArtifactError::Invalid("head bias must be (output_size, 1)".to_string()))?;
        let model = LstmRegressor::from_parts(network, head)
            .ok_or_else(|| ArtifactError::Invalid("network and head shapes disagree".to_string()))?;

        if self.metadata.output_size != model.head().output_size
            || self.metadata.input_size != model.network().input_size
        {
            return Err(ArtifactError::Invalid("metadata does not match stored weights".to_string()));
        }

        Ok((model, self.metadata))
    }
}

/// Model persistence operations
pub struct ModelPersistence;

impl ModelPersistence {
    /// Save model to JSON format (human-readable)
    pub fn save_to_json<P: AsRef<Path>>(model: &SavedModel, path: P) -> Result<(), ArtifactError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(model)?;
        let mut file = File::create(path).map_err(io_error(path))?;
        file.write_all(json.as_bytes()).map_err(io_error(path))?;
        Ok(())
    }

    /// Load model from JSON format
    pub fn load_from_json<P: AsRef<Path>>(path: P) -> Result<SavedModel, ArtifactError> {
        let contents = read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Save model to binary format (compact and fast)
    pub fn save_to_binary<P: AsRef<Path>>(model: &SavedModel, path: P) -> Result<(), ArtifactError> {
        let path = path.as_ref();
        let encoded = bincode::serialize(model)?;
        let mut file = File::create(path).map_err(io_error(path))?;
        file.write_all(&encoded).map_err(io_error(path))?;
        Ok(())
    }

    /// Load model from binary format
    pub fn load_from_binary<P: AsRef<Path>>(path: P) -> Result<SavedModel, ArtifactError> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(io_error(path))?;
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).map_err(io_error(path))?;
        Ok(bincode::deserialize(&contents)?)
    }

    /// Save by extension: `.json` is JSON, anything else binary
    pub fn save<P: AsRef<Path>>(model: &SavedModel, path: P) -> Result<(), ArtifactError> {
        match path.as_ref().extension().and_then(|s| s.to_str()) {
            Some("json") => Self::save_to_json(model, path),
            _ => Self::save_to_binary(model, path),
        }
    }

    /// Load by extension: `.json` is JSON, anything else binary
    pub fn load<P: AsRef<Path>>(path: P) -> Result<SavedModel, ArtifactError> {
        match path.as_ref().extension().and_then(|s| s.to_str()) {
            Some("json") => Self::load_from_json(path),
            _ => Self::load_from_binary(path),
        }
    }
}

fn read_to_string(path: &Path) -> Result<String, ArtifactError> {
    let mut file = File::open(path).map_err(io_error(path))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents).map_err(io_error(path))?;
    Ok(contents)
}

/// Locations of the three artifacts a forecast needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub scaler: PathBuf,
    pub features: PathBuf,
}

impl ArtifactPaths {
    /// `model.bin`, `scaler.json` and `features.json` inside `dir`.
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            model: dir.join("model.bin"),
            scaler: dir.join("scaler.json"),
            features: dir.join("features.json"),
        }
    }
}

/// Loaded, immutable forecasting artifacts.
#[derive(Clone, Debug)]
pub struct ForecastArtifacts {
    pub model: LstmRegressor,
    pub metadata: ModelMetadata,
    pub schema: FeatureSchema,
    pub scaler: FeatureScaler,
}

impl ForecastArtifacts {
    /// Loads and cross-checks model, scaler and schema. Any failure is fatal.
    pub fn load(paths: &ArtifactPaths) -> Result<Self, ArtifactError> {
        let (model, metadata) = ModelPersistence::load(&paths.model)?.into_model()?;

        let schema: FeatureSchema = serde_json::from_str(&read_to_string(&paths.features)?)?;
        let params: ScalerParams = serde_json::from_str(&read_to_string(&paths.scaler)?)?;
        let scaler = FeatureScaler::from_params(params).map_err(|e| ArtifactError::Invalid(e.to_string()))?;

        if scaler.n_features() != schema.len() || metadata.input_size != schema.len() {
            return Err(ArtifactError::Invalid(format!(
                "schema has {} columns, scaler {}, model input {}",
                schema.len(),
                scaler.n_features(),
                metadata.input_size
            )));
        }

        info!(
            component = "persistence",
            event = "artifacts.loaded",
            model = %metadata.model_name,
            features = schema.len(),
            outputs = metadata.output_size
        );

        Ok(Self {
            model,
            metadata,
            schema,
            scaler,
        })
    }

    /// Rejects a config whose window length or target count differs from
    /// what the model was trained with.
    pub fn check_config(&self, config: &ForecastConfig) -> Result<(), ForecastError> {
        if self.metadata.sequence_length != config.sequence_length {
            return Err(ForecastError::InvalidConfig(format!(
                "model '{}' was trained on {}-row windows, config asks for {}",
                self.metadata.model_name, self.metadata.sequence_length, config.sequence_length
            )));
        }
        if self.metadata.output_size != config.target_columns.len() {
            return Err(ForecastError::InvalidConfig(format!(
                "model '{}' predicts {} targets, config names {}",
                self.metadata.model_name,
                self.metadata.output_size,
                config.target_columns.len()
            )));
        }
        Ok(())
    }

    /// Writes all three artifacts.
    pub fn save(&self, paths: &ArtifactPaths) -> Result<(), ArtifactError> {
        let saved = SavedModel::new(
            &self.model,
            self.metadata.model_name.clone(),
            self.metadata.sequence_length,
            self.metadata.description.clone(),
        );
        ModelPersistence::save(&saved, &paths.model)?;
        write_json(&paths.scaler, self.scaler.params())?;
        write_json(&paths.features, &self.schema)?;
        Ok(())
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ArtifactError> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).map_err(io_error(path))
}
