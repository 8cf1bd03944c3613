//! Sampling Module - Sensor data collection
//!
//! - `reading.rs` - Reading value type
//! - `buffer.rs` - Bounded drop-oldest sample buffer
//! - `sensor.rs` - Sensor source trait + simulated sensor
//! - `sampler.rs` - Producer thread with explicit shutdown handle

pub mod reading;
pub mod buffer;
pub mod sensor;
pub mod sampler;

pub use reading::{Acceleration, Reading};
pub use buffer::{BufferError, BufferStatus, SampleBuffer};
pub use sensor::{SensorError, SensorSource, SimulatedSensor};
pub use sampler::{Sampler, SamplerHandle, SamplerStatus};
