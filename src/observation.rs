//! Raw observation records and the sources that supply them.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::ForecastError;

/// One hourly reading as delivered by the weather provider.
///
/// Kept as an untyped field map: numeric, string and nested values all pass
/// through untouched until [`crate::features::FeatureAligner`] encodes them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObservationRecord {
    fields: Map<String, Value>,
}

impl ObservationRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<Value>) {
        self.fields.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Observation time from the provider's `time_epoch` field, if present.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let epoch = self.fields.get("time_epoch")?.as_i64()?;
        Utc.timestamp_opt(epoch, 0).single()
    }
}

impl From<Map<String, Value>> for ObservationRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

/// Supplies the most recent hourly observations for a location key
/// (a city name or "lat,lon" pair).
///
/// Implementations do not retry; a failure is fatal for the forecast run.
pub trait ObservationSource {
    fn recent_observations(&self, location: &str) -> Result<Vec<ObservationRecord>, ForecastError>;
}

#[derive(Deserialize)]
struct HistoryPayload {
    #[serde(default)]
    location: Option<PayloadLocation>,
    forecast: PayloadForecast,
}

#[derive(Deserialize)]
struct PayloadLocation {
    lat: Option<f64>,
    lon: Option<f64>,
}

#[derive(Deserialize)]
struct PayloadForecast {
    forecastday: Vec<PayloadDay>,
}

#[derive(Deserialize)]
struct PayloadDay {
    hour: Vec<ObservationRecord>,
}

/// Parses a WeatherAPI-style history response into hourly records.
///
/// Hours from every `forecastday` entry are concatenated in payload order and
/// the location's `lat`/`lon` are copied onto each hour as `latitude` and
/// `longitude`.
pub fn parse_history_payload(body: &str) -> Result<Vec<ObservationRecord>, ForecastError> {
    let payload: HistoryPayload = serde_json::from_str(body)
        .map_err(|e| ForecastError::ExternalSource(format!("malformed history payload: {}", e)))?;

    let (lat, lon) = payload
        .location
        .map(|loc| (loc.lat, loc.lon))
        .unwrap_or((None, None));

    let mut records = Vec::new();
    for day in payload.forecast.forecastday {
        for mut hour in day.hour {
            if let Some(lat) = lat {
                hour.insert("latitude", lat);
            }
            if let Some(lon) = lon {
                hour.insert("longitude", lon);
            }
            records.push(hour);
        }
    }

    Ok(records)
}

/// Reads cached history payloads from `<root>/<location-slug>.json`.
#[derive(Clone, Debug)]
pub struct HistoryFileSource {
    root: PathBuf,
}

impl HistoryFileSource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, location: &str) -> PathBuf {
        self.root.join(format!("{}.json", location_slug(location)))
    }
}

impl ObservationSource for HistoryFileSource {
    fn recent_observations(&self, location: &str) -> Result<Vec<ObservationRecord>, ForecastError> {
        let path = self.path_for(location);
        debug!(component = "observation", event = "history.read", path = %path.display());

        let body = fs::read_to_string(&path)
            .map_err(|e| ForecastError::ExternalSource(format!("{}: {}", path.display(), e)))?;
        let records = parse_history_payload(&body)?;

        info!(
            component = "observation",
            event = "history.loaded",
            location,
            records = records.len()
        );
        Ok(records)
    }
}

/// Fixed per-location records, keyed by slug.
#[derive(Clone, Debug, Default)]
pub struct InMemorySource {
    records: HashMap<String, Vec<ObservationRecord>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_location(mut self, location: &str, records: Vec<ObservationRecord>) -> Self {
        self.records.insert(location_slug(location), records);
        self
    }
}

impl ObservationSource for InMemorySource {
    fn recent_observations(&self, location: &str) -> Result<Vec<ObservationRecord>, ForecastError> {
        self.records
            .get(&location_slug(location))
            .cloned()
            .ok_or_else(|| ForecastError::ExternalSource(format!("no observations for location '{}'", location)))
    }
}

/// Normalises a location key: lowercase ASCII alphanumerics, everything else
/// collapsed to single underscores.
pub fn location_slug(location: &str) -> String {
    let mut slug = String::with_capacity(location.len());
    for ch in location.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('_') && !slug.is_empty() {
            slug.push('_');
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    slug
}
