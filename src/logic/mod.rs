//! Logic Module - Telemetry Pipeline
//!
//! ## Layout
//! - `sampling/` - Readings, sample ring buffer, sensor-polling producer
//! - `features/` - Feature extraction (statistical + spectrum)
//! - `handshake/` - Modem liveness probe before each transmission
//! - `publisher/` - Offline queue, connection state, drain loop, MQTT transport
//! - `logs/` - Append-only CSV logs (raw + processed)
//! - `pipeline` - Main batch loop
//! - `health` - Periodic status reporter

pub mod config;
pub mod shutdown;

pub mod sampling;
pub mod features;
pub mod handshake;
pub mod publisher;

pub mod logs;
pub mod pipeline;
pub mod health;
