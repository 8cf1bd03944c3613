//! Sample Buffer - bounded ring buffer of readings
//!
//! The producer pushes, consumers take non-destructive snapshots of the most
//! recent readings. On overflow the oldest reading is evicted.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use thiserror::Error;

use super::Reading;

// ============================================================================
// ERRORS
// ============================================================================

/// Fixed-capacity containers can only fail at construction time
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BufferError {
    #[error("{name} capacity must be at least 1")]
    ZeroCapacity { name: &'static str },

    #[error("failed to allocate {name} with capacity {capacity}")]
    Allocation { name: &'static str, capacity: usize },
}

/// Allocate a deque up front so the container never grows after startup
pub(crate) fn allocate<T>(name: &'static str, capacity: usize) -> Result<VecDeque<T>, BufferError> {
    if capacity == 0 {
        return Err(BufferError::ZeroCapacity { name });
    }
    let mut items = VecDeque::new();
    items
        .try_reserve_exact(capacity)
        .map_err(|_| BufferError::Allocation { name, capacity })?;
    Ok(items)
}

// ============================================================================
// SAMPLE BUFFER
// ============================================================================

#[derive(Debug)]
pub struct SampleBuffer {
    readings: Mutex<VecDeque<Reading>>,
    capacity: usize,
}

/// Buffer status information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BufferStatus {
    pub len: usize,
    pub capacity: usize,
    pub is_full: bool,
}

impl SampleBuffer {
    pub fn new(capacity: usize) -> Result<Self, BufferError> {
        Ok(Self {
            readings: Mutex::new(allocate("sample buffer", capacity)?),
            capacity,
        })
    }

    /// Insert a reading, evicting the oldest one when full. Never blocks on I/O.
    pub fn push(&self, reading: Reading) {
        let mut readings = self.readings.lock();
        if readings.len() == self.capacity {
            readings.pop_front();
        }
        readings.push_back(reading);
    }

    /// Up to `count` most recent readings, oldest first
    pub fn snapshot(&self, count: usize) -> Vec<Reading> {
        let readings = self.readings.lock();
        let skip = readings.len().saturating_sub(count);
        readings.iter().skip(skip).copied().collect()
    }

    pub fn status(&self) -> BufferStatus {
        let len = self.readings.lock().len();
        BufferStatus {
            len,
            capacity: self.capacity,
            is_full: len == self.capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
