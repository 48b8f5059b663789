use std::fmt::Write;

use crate::forecaster::{DayStatus, ForecastRun};

/// How one target column is printed.
#[derive(Clone, Debug, PartialEq)]
pub struct TargetLabel {
    pub column: String,
    pub label: String,
    pub unit: String,
    pub precision: usize,
}

impl TargetLabel {
    pub fn new(column: &str, label: &str, unit: &str, precision: usize) -> Self {
        Self {
            column: column.to_string(),
            label: label.to_string(),
            unit: unit.to_string(),
            precision,
        }
    }
}

/// Formats per-day summaries of a forecast run.
#[derive(Clone, Debug)]
pub struct Reporter {
    labels: Vec<TargetLabel>,
}

impl Default for Reporter {
    fn default() -> Self {
        Self {
            labels: vec![
                TargetLabel::new("temp_c", "Temp", "°C", 1),
                TargetLabel::new("precip_mm", "Precipitation", "mm", 2),
                TargetLabel::new("humidity", "Humidity", "%", 0),
            ],
        }
    }
}

impl Reporter {
    pub fn new(labels: Vec<TargetLabel>) -> Self {
        Self { labels }
    }

    /// One line per day, e.g.
    /// `Day 1 (2026-10-19): Temp: 21.0°C, Precipitation: 0.00mm, Humidity: 55%`.
    ///
    /// Values are daily means; targets without a label fall back to their
    /// column name and two decimals.
    pub fn render(&self, run: &ForecastRun) -> String {
        let mut out = String::new();

        for day in &run.days {
            let parts: Vec<String> = run
                .target_names
                .iter()
                .enumerate()
                .map(|(idx, name)| {
                    let value = day.mean(idx).unwrap_or(f64::NAN);
                    match self.labels.iter().find(|l| &l.column == name) {
                        Some(label) => format!("{}: {}", label.label, format_value(value, label.precision, &label.unit)),
                        None => format!("{}: {}", name, format_value(value, 2, "")),
                    }
                })
                .collect();

            let _ = write!(out, "Day {} ({}): {}", day.day, day.date.format("%Y-%m-%d"), parts.join(", "));
            if day.status == DayStatus::FrozenForward {
                out.push_str(" [fallback]");
            }
            out.push('\n');
        }

        out
    }
}

fn format_value(value: f64, precision: usize, unit: &str) -> String {
    if value.is_finite() {
        format!("{:.*}{}", precision, value, unit)
    } else {
        "N/A".to_string()
    }
}
