//! Data Logs - raw readings and processed feature vectors as CSV
//!
//! - Raw log: `adxl345_log_<YYYYmmdd-HHMMSS>.csv`, header `timestamp,x,y,z`
//! - Processed log: `processed_features_<YYYYmmdd-HHMMSS>.csv`, header is the
//!   sorted feature names

pub mod writer;

use std::io;
use std::path::Path;

use crate::logic::features::FeatureVector;
use crate::logic::sampling::Reading;
pub use writer::CsvLog;

pub const RAW_LOG_PREFIX: &str = "adxl345_log";
pub const PROCESSED_LOG_PREFIX: &str = "processed_features";
pub const RAW_HEADER: &str = "timestamp,x,y,z";

pub struct RawLog {
    csv: CsvLog,
}

impl RawLog {
    pub fn create(dir: &Path) -> io::Result<Self> {
        let csv = CsvLog::create(dir, RAW_LOG_PREFIX)?;
        log::info!("Raw log: {}", csv.path().display());
        Ok(Self { csv })
    }

    pub fn append(&self, readings: &[Reading]) -> io::Result<()> {
        if readings.is_empty() {
            return Ok(());
        }
        self.csv.append(RAW_HEADER, readings.iter().map(Reading::to_csv_row))
    }

    pub fn path(&self) -> &Path {
        self.csv.path()
    }
}

pub struct ProcessedLog {
    csv: CsvLog,
}

impl ProcessedLog {
    pub fn create(dir: &Path) -> io::Result<Self> {
        let csv = CsvLog::create(dir, PROCESSED_LOG_PREFIX)?;
        log::info!("Processed log: {}", csv.path().display());
        Ok(Self { csv })
    }

    pub fn append(&self, features: &FeatureVector) -> io::Result<()> {
        self.csv.append(&features.csv_header(), std::iter::once(features.csv_row()))
    }

    pub fn path(&self) -> &Path {
        self.csv.path()
    }
}
