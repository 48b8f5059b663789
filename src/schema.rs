use std::collections::HashMap;
use std::convert::TryFrom;

use serde::{Deserialize, Serialize};

use crate::error::ForecastError;

/// Ordered column vocabulary the model was trained on.
///
/// The model only sees positions, so every vector handed to it must follow
/// this exact order. Serialized as a plain JSON array of names, which is the
/// shape of a `features.json` artifact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureSchema {
    columns: Vec<String>,
    #[serde(skip)]
    positions: HashMap<String, usize>,
}

impl FeatureSchema {
    /// Builds a schema, rejecting empty or duplicated column lists.
    pub fn new(columns: Vec<String>) -> Result<Self, ForecastError> {
        if columns.is_empty() {
            return Err(ForecastError::InvalidConfig("feature schema has no columns".to_string()));
        }

        let mut positions = HashMap::with_capacity(columns.len());
        for (idx, name) in columns.iter().enumerate() {
            if positions.insert(name.clone(), idx).is_some() {
                return Err(ForecastError::InvalidConfig(format!(
                    "feature schema lists column '{}' twice",
                    name
                )));
            }
        }

        Ok(Self { columns, positions })
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Resolves target column names to their schema positions.
    pub fn targets<S: AsRef<str>>(&self, names: &[S]) -> Result<TargetIndexSet, ForecastError> {
        if names.is_empty() {
            return Err(ForecastError::InvalidConfig("no target columns configured".to_string()));
        }

        let mut resolved = Vec::with_capacity(names.len());
        let mut positions = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let idx = self.position(name).ok_or_else(|| {
                ForecastError::InvalidConfig(format!("target column '{}' is not in the feature schema", name))
            })?;
            if positions.contains(&idx) {
                return Err(ForecastError::InvalidConfig(format!("target column '{}' listed twice", name)));
            }
            resolved.push(name.to_string());
            positions.push(idx);
        }

        Ok(TargetIndexSet {
            names: resolved,
            positions,
        })
    }
}

impl TryFrom<Vec<String>> for FeatureSchema {
    type Error = ForecastError;

    fn try_from(columns: Vec<String>) -> Result<Self, Self::Error> {
        FeatureSchema::new(columns)
    }
}

impl From<FeatureSchema> for Vec<String> {
    fn from(schema: FeatureSchema) -> Self {
        schema.columns
    }
}

/// Schema positions of the columns the model predicts, in model output order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetIndexSet {
    names: Vec<String>,
    positions: Vec<usize>,
}

impl TargetIndexSet {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> FeatureSchema {
        FeatureSchema::new(
            ["temp_c", "humidity", "precip_mm", "wind_dir_N"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_positions_follow_declared_order() {
        let schema = schema();
        assert_eq!(schema.len(), 4);
        assert_eq!(schema.position("precip_mm"), Some(2));
        assert_eq!(schema.position("missing"), None);
    }

    #[test]
    fn test_targets_keep_requested_order() {
        let targets = schema().targets(&["temp_c", "precip_mm", "humidity"]).unwrap();
        assert_eq!(targets.positions(), &[0, 2, 1]);
        assert_eq!(targets.names()[1], "precip_mm");
    }

    #[test]
    fn test_unknown_or_duplicate_target_rejected() {
        assert!(matches!(
            schema().targets(&["pressure_mb"]),
            Err(ForecastError::InvalidConfig(_))
        ));
        assert!(schema().targets(&["temp_c", "temp_c"]).is_err());
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let result = FeatureSchema::new(vec!["a".into(), "b".into(), "a".into()]);
        assert!(matches!(result, Err(ForecastError::InvalidConfig(_))));
    }

    #[test]
    fn test_json_array_round_trip() {
        let parsed: FeatureSchema = serde_json::from_str(r#"["temp_c","humidity"]"#).unwrap();
        assert_eq!(parsed.position("humidity"), Some(1));
        assert_eq!(serde_json::to_string(&parsed).unwrap(), r#"["temp_c","humidity"]"#);
        assert!(serde_json::from_str::<FeatureSchema>("[]").is_err());
    }
}
