//! Reading - one timestamped 3-axis acceleration sample

use serde::{Deserialize, Serialize};

/// One accelerometer sample (axes in g, timestamp in seconds since epoch)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Reading {
    pub fn new(timestamp: f64, x: f64, y: f64, z: f64) -> Self {
        Self { timestamp, x, y, z }
    }

    /// Stamp an acceleration with the current wall-clock time
    pub fn now(accel: Acceleration) -> Self {
        Self::new(now_seconds(), accel.x, accel.y, accel.z)
    }

    /// CSV row in raw-log column order (`timestamp,x,y,z`)
    pub fn to_csv_row(&self) -> String {
        format!("{},{},{},{}", self.timestamp, self.x, self.y, self.z)
    }
}

/// Acceleration as returned by a sensor source, before timestamping
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Acceleration {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Current UNIX time in fractional seconds
pub fn now_seconds() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
