//! Feature Vector - named features of one batch
//!
//! Keys are kept sorted (BTreeMap), which fixes the column order of both the
//! processed log and the wire payload.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Keys every vector carries regardless of enabled feature groups
pub const SAMPLE_COUNT: &str = "sample_count";
pub const TIMESTAMP_START: &str = "timestamp_start";
pub const TIMESTAMP_END: &str = "timestamp_end";
pub const DURATION: &str = "duration";

#[derive(Debug, Error, PartialEq)]
pub enum WireFormatError {
    #[error("payload must have exactly a header line and a data line")]
    LineCount,

    #[error("header has {header} columns but row has {row}")]
    ColumnMismatch { header: usize, row: usize },

    #[error("invalid value {value:?} for feature {name}")]
    InvalidValue { name: String, value: String },

    #[error("duplicate feature name {0}")]
    DuplicateName(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector {
    values: BTreeMap<String, f64>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    /// Get feature by name
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Feature names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Comma-joined sorted feature names
    pub fn csv_header(&self) -> String {
        self.names().collect::<Vec<_>>().join(",")
    }

    /// Comma-joined values in header order.
    ///
    /// `{}` on f64 is the shortest representation that parses back to the same
    /// value, so the wire format loses nothing.
    pub fn csv_row(&self) -> String {
        self.values
            .values()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Two-line CSV payload: header then a single data row
    pub fn to_wire(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        format!("{}\n{}", self.csv_header(), self.csv_row())
    }

    /// Parse a payload produced by `to_wire`
    pub fn from_wire(payload: &str) -> Result<Self, WireFormatError> {
        let mut lines = payload.lines();
        let (header, row) = match (lines.next(), lines.next(), lines.next()) {
            (Some(header), Some(row), None) => (header, row),
            _ => return Err(WireFormatError::LineCount),
        };

        let names: Vec<&str> = header.split(',').collect();
        let values: Vec<&str> = row.split(',').collect();
        if names.len() != values.len() {
            return Err(WireFormatError::ColumnMismatch {
                header: names.len(),
                row: values.len(),
            });
        }

        let mut vector = Self::new();
        for (name, raw) in names.into_iter().zip(values) {
            let value: f64 = raw.trim().parse().map_err(|_| WireFormatError::InvalidValue {
                name: name.to_string(),
                value: raw.to_string(),
            })?;
            if vector.contains(name) {
                return Err(WireFormatError::DuplicateName(name.to_string()));
            }
            vector.insert(name, value);
        }
        Ok(vector)
    }
}
