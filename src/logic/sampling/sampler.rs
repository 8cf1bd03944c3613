//! Sampler - sensor-polling producer thread
//!
//! Polls a `SensorSource` at a fixed nominal rate and pushes timestamped
//! readings into the shared `SampleBuffer`. Read failures are logged and the
//! sample is skipped; the producer never waits on consumers.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::sensor::SensorSource;
use super::{Reading, SampleBuffer};
use crate::logic::shutdown::StopSignal;

// ============================================================================
// STATE
// ============================================================================

#[derive(Debug, Default)]
struct SamplerStats {
    running: AtomicBool,
    total_samples: AtomicU64,
    total_errors: AtomicU64,
    consecutive_errors: AtomicU32,
}

/// Sampler status information
#[derive(Debug, Clone, Serialize)]
pub struct SamplerStatus {
    pub running: bool,
    pub sampling_rate_hz: f64,
    pub total_samples: u64,
    pub total_errors: u64,
    pub consecutive_errors: u32,
    pub has_error: bool,
}

/// Handle to a running sampler. Dropping it shuts the thread down.
pub struct SamplerHandle {
    stop: Arc<StopSignal>,
    stats: Arc<SamplerStats>,
    thread: Option<JoinHandle<()>>,
    sampling_rate_hz: f64,
    max_consecutive_errors: u32,
}

pub struct Sampler;

impl Sampler {
    /// Spawn the producer thread
    pub fn start<S: SensorSource>(
        mut source: S,
        buffer: Arc<SampleBuffer>,
        sampling_rate_hz: f64,
        max_consecutive_errors: u32,
    ) -> std::io::Result<SamplerHandle> {
        // Rates so small that the period overflows a Duration are refused too
        let interval = if sampling_rate_hz.is_finite() && sampling_rate_hz > 0.0 {
            Duration::try_from_secs_f64(1.0 / sampling_rate_hz).ok()
        } else {
            None
        };
        let Some(interval) = interval else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid sampling rate: {} Hz", sampling_rate_hz),
            ));
        };

        let stop = StopSignal::new();
        let stats = Arc::new(SamplerStats::default());

        let thread = {
            let stop = Arc::clone(&stop);
            let stats = Arc::clone(&stats);
            thread::Builder::new()
                .name("sampler".into())
                .spawn(move || {
                    stats.running.store(true, Ordering::SeqCst);
                    log::info!("Sampler started at {} Hz", sampling_rate_hz);

                    loop {
                        match source.read_acceleration() {
                            Ok(accel) => {
                                buffer.push(Reading::now(accel));
                                stats.total_samples.fetch_add(1, Ordering::Relaxed);
                                stats.consecutive_errors.store(0, Ordering::Relaxed);
                            }
                            Err(e) => {
                                stats.total_errors.fetch_add(1, Ordering::Relaxed);
                                let streak = stats.consecutive_errors.fetch_add(1, Ordering::Relaxed) + 1;
                                if streak == max_consecutive_errors {
                                    log::error!("Sensor failing: {} consecutive read errors (last: {})", streak, e);
                                } else {
                                    log::warn!("Sensor read error: {}", e);
                                }
                            }
                        }

                        if stop.wait_timeout(interval) {
                            break;
                        }
                    }

                    stats.running.store(false, Ordering::SeqCst);
                    log::info!("Sampler stopped");
                })?
        };

        Ok(SamplerHandle {
            stop,
            stats,
            thread: Some(thread),
            sampling_rate_hz,
            max_consecutive_errors,
        })
    }
}

impl SamplerHandle {
    pub fn status(&self) -> SamplerStatus {
        let consecutive_errors = self.stats.consecutive_errors.load(Ordering::Relaxed);
        SamplerStatus {
            running: self.stats.running.load(Ordering::SeqCst),
            sampling_rate_hz: self.sampling_rate_hz,
            total_samples: self.stats.total_samples.load(Ordering::Relaxed),
            total_errors: self.stats.total_errors.load(Ordering::Relaxed),
            consecutive_errors,
            has_error: consecutive_errors >= self.max_consecutive_errors,
        }
    }

    /// Stop the producer and join its thread
    pub fn shutdown(&mut self) {
        self.stop.trigger();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Sampler thread panicked");
            }
        }
    }
}

impl Drop for SamplerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::sampling::sensor::SensorError;
    use crate::logic::sampling::Acceleration;
    use std::time::Instant;

    fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    #[test]
    fn test_sampler_fills_buffer() {
        let buffer = Arc::new(SampleBuffer::new(8).unwrap());
        let source = || -> Result<Acceleration, SensorError> { Ok(Acceleration { x: 0.1, y: 0.2, z: 1.0 }) };

        let mut handle = Sampler::start(source, Arc::clone(&buffer), 500.0, 5).unwrap();
        assert!(wait_until(Duration::from_secs(2), || buffer.status().is_full));
        handle.shutdown();

        let status = handle.status();
        assert!(!status.running);
        assert!(status.total_samples >= 8);
        assert_eq!(status.total_errors, 0);

        let snap = buffer.snapshot(8);
        assert!(snap.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_sensor_errors_skip_samples_and_flag_health() {
        let buffer = Arc::new(SampleBuffer::new(8).unwrap());
        let source = || -> Result<Acceleration, SensorError> { Err(SensorError::Read("nack".into())) };

        let mut handle = Sampler::start(source, Arc::clone(&buffer), 500.0, 3).unwrap();
        assert!(wait_until(Duration::from_secs(2), || handle.status().has_error));
        handle.shutdown();

        assert_eq!(buffer.status().len, 0);
        assert!(handle.status().total_errors >= 3);
    }

    #[test]
    fn test_shutdown_interrupts_long_interval() {
        let buffer = Arc::new(SampleBuffer::new(4).unwrap());
        let source = || -> Result<Acceleration, SensorError> { Ok(Acceleration::default()) };

        // One sample every 60 s: shutdown must not wait that long
        let mut handle = Sampler::start(source, buffer, 1.0 / 60.0, 5).unwrap();
        let start = Instant::now();
        handle.shutdown();
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_rejects_unusable_rates() {
        for rate in [0.0, -20.0, f64::NAN, 1e-300] {
            let buffer = Arc::new(SampleBuffer::new(4).unwrap());
            let source = || -> Result<Acceleration, SensorError> { Ok(Acceleration::default()) };

            let err = Sampler::start(source, buffer, rate, 5).err().unwrap();
            assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
        }
    }
}
