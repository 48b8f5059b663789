//! Alignment of raw observation records onto the trained feature schema.

use std::collections::{BTreeMap, BTreeSet};

use ndarray::Array2;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::ForecastError;
use crate::observation::ObservationRecord;
use crate::schema::FeatureSchema;

/// A categorical source field that is one-hot encoded as `<column>_<level>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoricalField {
    /// Field name in the record (after renaming).
    pub source: String,
    /// Key inside a nested object value, e.g. `text` for `condition`.
    pub nested_key: Option<String>,
    /// Prefix of the one-hot columns in the schema.
    pub column: String,
}

impl CategoricalField {
    pub fn flat(name: &str) -> Self {
        Self {
            source: name.to_string(),
            nested_key: None,
            column: name.to_string(),
        }
    }

    pub fn nested(source: &str, key: &str, column: &str) -> Self {
        Self {
            source: source.to_string(),
            nested_key: Some(key.to_string()),
            column: column.to_string(),
        }
    }

    fn level<'a>(&self, value: &'a Value) -> Option<&'a str> {
        match (&self.nested_key, value) {
            (Some(key), Value::Object(map)) => map.get(key).and_then(Value::as_str),
            (None, Value::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    fn owns_column(&self, column: &str) -> bool {
        column.len() > self.column.len() + 1
            && column.starts_with(self.column.as_str())
            && column.as_bytes()[self.column.len()] == b'_'
    }
}

/// Data-quality diagnostics from one alignment pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AlignmentReport {
    /// Numeric schema columns never present in the live records (zero-filled).
    pub missing_numeric: Vec<String>,
    /// Number of numeric (non one-hot) schema columns.
    pub numeric_total: usize,
    /// One-hot schema levels not observed in this batch.
    pub unobserved_levels: usize,
    /// Live columns with no schema counterpart, e.g. unseen categories.
    pub dropped_live: Vec<String>,
    /// Live columns that matched a schema column.
    pub matched: usize,
}

impl AlignmentReport {
    pub fn zero_filled(&self) -> usize {
        self.missing_numeric.len() + self.unobserved_levels
    }

    pub fn missing_fraction(&self) -> f64 {
        if self.numeric_total == 0 {
            0.0
        } else {
            self.missing_numeric.len() as f64 / self.numeric_total as f64
        }
    }
}

/// Aligned, still unscaled, feature rows plus diagnostics.
#[derive(Clone, Debug)]
pub struct AlignedFeatures {
    /// (records, schema columns), schema order.
    pub matrix: Array2<f64>,
    pub report: AlignmentReport,
}

/// Maps observation records onto a fixed feature schema.
///
/// Renames provider fields to the schema vocabulary, one-hot encodes the
/// declared categorical fields with the training-time levels only, and fills
/// every schema column that the live data lacks with zero.
#[derive(Clone, Debug)]
pub struct FeatureAligner {
    renames: Vec<(String, String)>,
    categorical: Vec<CategoricalField>,
    max_missing_fraction: Option<f64>,
}

impl Default for FeatureAligner {
    /// WeatherAPI vocabulary: `lat`/`lon` renamed, `wind_dir` and
    /// `condition.text` one-hot encoded.
    fn default() -> Self {
        Self {
            renames: vec![
                ("lat".to_string(), "latitude".to_string()),
                ("lon".to_string(), "longitude".to_string()),
            ],
            categorical: vec![
                CategoricalField::flat("wind_dir"),
                CategoricalField::nested("condition", "text", "condition_text"),
            ],
            max_missing_fraction: None,
        }
    }
}

impl FeatureAligner {
    pub fn new(renames: Vec<(String, String)>, categorical: Vec<CategoricalField>) -> Self {
        Self {
            renames,
            categorical,
            max_missing_fraction: None,
        }
    }

    /// Fail alignment when more than `fraction` of the numeric schema columns
    /// had to be zero-filled.
    pub fn with_max_missing_fraction(mut self, fraction: Option<f64>) -> Self {
        self.max_missing_fraction = fraction;
        self
    }

    fn canonical_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.renames
            .iter()
            .find(|(from, _)| from == name)
            .map(|(_, to)| to.as_str())
            .unwrap_or(name)
    }

    fn is_level_column(&self, column: &str) -> bool {
        self.categorical.iter().any(|c| c.owns_column(column))
    }

    /// Encodes one record as column name → value, before schema alignment.
    fn encode(&self, record: &ObservationRecord) -> BTreeMap<String, f64> {
        let mut encoded = BTreeMap::new();

        for (name, value) in record.fields() {
            let name = self.canonical_name(name);

            if let Some(field) = self.categorical.iter().find(|c| c.source == name) {
                if let Some(level) = field.level(value) {
                    encoded.insert(format!("{}_{}", field.column, level), 1.0);
                }
                continue;
            }

            match value {
                Value::Number(n) => {
                    if let Some(v) = n.as_f64() {
                        encoded.insert(name.to_string(), v);
                    }
                }
                Value::Bool(b) => {
                    encoded.insert(name.to_string(), if *b { 1.0 } else { 0.0 });
                }
                _ => {}
            }
        }

        encoded
    }

    /// Aligns `records` to `schema`, one output row per record.
    pub fn align(&self, records: &[ObservationRecord], schema: &FeatureSchema) -> Result<AlignedFeatures, ForecastError> {
        let encoded: Vec<BTreeMap<String, f64>> = records.iter().map(|r| self.encode(r)).collect();
        let live_columns: BTreeSet<&str> = encoded.iter().flat_map(|row| row.keys().map(String::as_str)).collect();

        let mut matrix = Array2::zeros((records.len(), schema.len()));
        for (row_idx, row) in encoded.iter().enumerate() {
            for (col_idx, column) in schema.columns().iter().enumerate() {
                if let Some(&value) = row.get(column) {
                    matrix[[row_idx, col_idx]] = value;
                }
            }
        }

        let mut report = AlignmentReport::default();
        for column in schema.columns() {
            let present = live_columns.contains(column.as_str());
            if present {
                report.matched += 1;
            }
            if self.is_level_column(column) {
                if !present {
                    report.unobserved_levels += 1;
                }
            } else {
                report.numeric_total += 1;
                if !present {
                    report.missing_numeric.push(column.clone());
                }
            }
        }
        report.dropped_live = live_columns
            .iter()
            .filter(|c| schema.position(c).is_none())
            .map(|c| c.to_string())
            .collect();

        if report.matched == 0 {
            return Err(ForecastError::SchemaMismatch {
                live_columns: live_columns.len(),
                schema_columns: schema.len(),
            });
        }

        if !report.missing_numeric.is_empty() {
            warn!(
                component = "features",
                event = "features.zero_fill",
                missing = report.missing_numeric.len(),
                numeric_total = report.numeric_total,
                columns = ?report.missing_numeric
            );
        }

        if let Some(limit) = self.max_missing_fraction {
            if report.missing_fraction() > limit {
                return Err(ForecastError::ExcessiveZeroFill {
                    missing: report.missing_numeric.len(),
                    numeric_total: report.numeric_total,
                    limit,
                });
            }
        }

        info!(
            component = "features",
            event = "features.aligned",
            rows = records.len(),
            columns = schema.len(),
            matched = report.matched,
            zero_filled = report.zero_filled(),
            dropped_live = report.dropped_live.len()
        );

        Ok(AlignedFeatures { matrix, report })
    }
}
