//! Feature Extractor - batch of readings → FeatureVector
//!
//! Validation happens before any feature is computed, so a rejected batch
//! never yields a partial vector.

use parking_lot::Mutex;
use rustfft::FftPlanner;
use serde_json::{Map, Value};
use thiserror::Error;

use super::spectrum::{Band, Spectrum};
use super::statistical::AxisStats;
use super::vector::{FeatureVector, DURATION, SAMPLE_COUNT, TIMESTAMP_END, TIMESTAMP_START};
use crate::constants::{DEFAULT_FREQUENCY_BANDS, DEFAULT_MIN_SAMPLES};
use crate::logic::sampling::Reading;

/// Loosely-typed record as handed over by drivers or parsed log rows
pub type RawRecord = Map<String, Value>;

/// Columns a batch must provide
pub const REQUIRED_COLUMNS: [&str; 4] = ["timestamp", "x", "y", "z"];

/// Driver-style axis names accepted as aliases
const COLUMN_ALIASES: [(&str, &str); 3] = [("x_axis", "x"), ("y_axis", "y"), ("z_axis", "z")];

const AXES: [&str; 3] = ["X", "Y", "Z"];

#[derive(Debug, Error, PartialEq)]
pub enum ExtractError {
    #[error("insufficient data: {actual} readings, at least {required} required")]
    InsufficientData { required: usize, actual: usize },

    #[error("missing columns: {missing:?}")]
    Schema { missing: Vec<String> },
}

pub struct FeatureExtractor {
    min_samples: usize,
    bands: Vec<Band>,
    planner: Mutex<FftPlanner<f64>>,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        let bands = DEFAULT_FREQUENCY_BANDS
            .iter()
            .map(|(low, high)| Band::new(*low, *high))
            .collect();
        Self::new(DEFAULT_MIN_SAMPLES, bands)
    }
}

impl FeatureExtractor {
    pub fn new(min_samples: usize, bands: Vec<Band>) -> Self {
        Self {
            min_samples,
            bands,
            planner: Mutex::new(FftPlanner::new()),
        }
    }

    pub fn min_samples(&self) -> usize {
        self.min_samples
    }

    /// Extract statistical + spectrum features from an ordered batch
    pub fn extract(&self, readings: &[Reading], sampling_rate_hz: f64) -> Result<FeatureVector, ExtractError> {
        if readings.len() < self.min_samples {
            return Err(ExtractError::InsufficientData {
                required: self.min_samples,
                actual: readings.len(),
            });
        }

        let columns = [
            readings.iter().map(|r| coerce(r.x)).collect::<Vec<_>>(),
            readings.iter().map(|r| coerce(r.y)).collect::<Vec<_>>(),
            readings.iter().map(|r| coerce(r.z)).collect::<Vec<_>>(),
        ];

        let mut vector = FeatureVector::new();
        for (axis, values) in AXES.iter().zip(&columns) {
            if let Some(stats) = AxisStats::compute(values) {
                stats.write_to(axis, &mut vector);
            }
        }
        vector.insert(SAMPLE_COUNT, readings.len() as f64);

        {
            let mut planner = self.planner.lock();
            for (axis, values) in AXES.iter().zip(&columns) {
                if let Some(spectrum) = Spectrum::compute(&mut planner, values, sampling_rate_hz) {
                    spectrum.write_to(axis, &self.bands, &mut vector);
                }
            }
        }

        let (start, end) = time_bounds(readings.iter().map(|r| r.timestamp));
        vector.insert(TIMESTAMP_START, start);
        vector.insert(TIMESTAMP_END, end);
        vector.insert(DURATION, end - start);

        Ok(vector)
    }

    /// Extract from loosely-typed records.
    ///
    /// A column counts as present when any record carries it (or its alias).
    /// Axis values that are missing or non-numeric are coerced to zero.
    /// Missing timestamps are left out of the time bounds.
    pub fn extract_records(&self, records: &[RawRecord], sampling_rate_hz: f64) -> Result<FeatureVector, ExtractError> {
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|col| !records.iter().any(|r| lookup(r, col).is_some()))
            .map(|col| col.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ExtractError::Schema { missing });
        }

        let readings: Vec<Reading> = records
            .iter()
            .map(|r| Reading {
                timestamp: lookup(r, "timestamp").and_then(numeric).unwrap_or(f64::NAN),
                x: lookup(r, "x").and_then(numeric).unwrap_or(0.0),
                y: lookup(r, "y").and_then(numeric).unwrap_or(0.0),
                z: lookup(r, "z").and_then(numeric).unwrap_or(0.0),
            })
            .collect();

        self.extract(&readings, sampling_rate_hz)
    }
}

/// Lenient coercion: anything that is not a finite number counts as zero
fn coerce(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn lookup<'a>(record: &'a RawRecord, column: &str) -> Option<&'a Value> {
    record.get(column).or_else(|| {
        COLUMN_ALIASES
            .iter()
            .find(|(_, canonical)| *canonical == column)
            .and_then(|(alias, _)| record.get(*alias))
    })
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Min/max over finite timestamps; (NaN, NaN) when there are none
fn time_bounds(timestamps: impl Iterator<Item = f64>) -> (f64, f64) {
    timestamps
        .filter(|t| t.is_finite())
        .fold((f64::NAN, f64::NAN), |(lo, hi), t| (lo.min(t), hi.max(t)))
}
