//! Sensor sources
//!
//! Register-level drivers live outside this crate; they plug in through
//! `SensorSource`. `SimulatedSensor` stands in when no hardware is attached.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use thiserror::Error;

use super::reading::Acceleration;

/// Transient read failure; the sample is skipped and the producer continues
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("sensor read failed: {0}")]
    Read(String),

    #[error("sensor I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Anything that can produce an acceleration sample on demand
pub trait SensorSource: Send + 'static {
    fn read_acceleration(&mut self) -> Result<Acceleration, SensorError>;
}

impl<F> SensorSource for F
where
    F: FnMut() -> Result<Acceleration, SensorError> + Send + 'static,
{
    fn read_acceleration(&mut self) -> Result<Acceleration, SensorError> {
        self()
    }
}

// ============================================================================
// SIMULATED SENSOR
// ============================================================================

/// Track vibration: gravity on Z, a rail resonance tone on X/Y, plus noise
pub struct SimulatedSensor {
    rng: StdRng,
    sampling_rate_hz: f64,
    tick: u64,
    resonance_hz: f64,
    amplitude_g: f64,
    noise_g: f64,
}

impl SimulatedSensor {
    pub fn new(sampling_rate_hz: f64) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            sampling_rate_hz,
            tick: 0,
            resonance_hz: 3.0,
            amplitude_g: 0.05,
            noise_g: 0.01,
        }
    }

    /// Deterministic noise for reproducible runs
    pub fn with_seed(sampling_rate_hz: f64, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            ..Self::new(sampling_rate_hz)
        }
    }
}

impl SensorSource for SimulatedSensor {
    fn read_acceleration(&mut self) -> Result<Acceleration, SensorError> {
        let t = self.tick as f64 / self.sampling_rate_hz;
        self.tick += 1;

        let phase = 2.0 * PI * self.resonance_hz * t;
        let n = self.noise_g;
        let (nx, ny, nz) = (
            self.rng.gen_range(-n..=n),
            self.rng.gen_range(-n..=n),
            self.rng.gen_range(-n..=n),
        );

        Ok(Acceleration {
            x: self.amplitude_g * phase.sin() + nx,
            y: 0.5 * self.amplitude_g * phase.cos() + ny,
            z: 1.0 + nz,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_sensor_stays_near_gravity() {
        let mut sensor = SimulatedSensor::with_seed(20.0, 7);
        for _ in 0..100 {
            let accel = sensor.read_acceleration().unwrap();
            assert!((accel.z - 1.0).abs() <= 0.011);
            assert!(accel.x.abs() <= 0.061);
        }
    }

    #[test]
    fn test_closure_is_a_sensor_source() {
        let mut calls = 0;
        let mut source = move || {
            calls += 1;
            if calls % 2 == 0 {
                Err(SensorError::Read("bus busy".into()))
            } else {
                Ok(Acceleration { x: 1.0, y: 0.0, z: 0.0 })
            }
        };

        assert!(source.read_acceleration().is_ok());
        assert!(source.read_acceleration().is_err());
    }
}
