//! Health Reporter
//!
//! Periodically logs a status snapshot of the running system: once as a
//! human-readable summary and once as a JSON line for log scrapers.

use serde::Serialize;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::logic::publisher::PublisherStatus;
use crate::logic::sampling::{BufferStatus, SamplerStatus};
use crate::logic::shutdown::StopSignal;

#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub timestamp: String,
    pub uptime_secs: u64,
    pub sampler: SamplerStatus,
    pub buffer: BufferStatus,
    pub publisher: PublisherStatus,
}

impl HealthSnapshot {
    pub fn new(uptime: Duration, sampler: SamplerStatus, buffer: BufferStatus, publisher: PublisherStatus) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime_secs: uptime.as_secs(),
            sampler,
            buffer,
            publisher,
        }
    }

    /// One-line operator summary
    pub fn summary(&self) -> String {
        format!(
            "sensor {} ({} samples, {} errors) | buffer {}/{} | link {} to {} | queue {}/{} | sent {}",
            if self.sampler.has_error {
                "FAILING"
            } else if self.sampler.running {
                "ok"
            } else {
                "stopped"
            },
            self.sampler.total_samples,
            self.sampler.total_errors,
            self.buffer.len,
            self.buffer.capacity,
            self.publisher.state,
            self.publisher.destination,
            self.publisher.queue_size,
            self.publisher.queue_capacity,
            self.publisher.sent,
        )
    }
}

pub struct HealthReporter {
    stop: Arc<StopSignal>,
    thread: Option<JoinHandle<()>>,
}

impl HealthReporter {
    /// Spawn the reporter; `snapshot` is called once per `interval`
    pub fn start<F>(interval: Duration, snapshot: F) -> std::io::Result<Self>
    where
        F: Fn(Duration) -> HealthSnapshot + Send + 'static,
    {
        let stop = StopSignal::new();
        let started = Instant::now();

        let thread = {
            let stop = Arc::clone(&stop);
            thread::Builder::new().name("health".into()).spawn(move || {
                log::info!("Health reporter started (every {:?})", interval);
                while !stop.wait_timeout(interval) {
                    report(&snapshot(started.elapsed()));
                }
            })?
        };

        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }

    pub fn stop(&mut self) {
        self.stop.trigger();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Health reporter thread panicked");
            }
        }
    }
}

impl Drop for HealthReporter {
    fn drop(&mut self) {
        self.stop();
    }
}

fn report(snapshot: &HealthSnapshot) {
    if snapshot.sampler.has_error {
        log::warn!("Health: {}", snapshot.summary());
    } else {
        log::info!("Health: {}", snapshot.summary());
    }

    match serde_json::to_string(snapshot) {
        Ok(json) => log::info!("health_json {}", json),
        Err(e) => log::warn!("Failed to serialize health snapshot: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::publisher::ConnectionState;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn snapshot(uptime: Duration) -> HealthSnapshot {
        HealthSnapshot::new(
            uptime,
            SamplerStatus {
                running: true,
                sampling_rate_hz: 20.0,
                total_samples: 400,
                total_errors: 1,
                consecutive_errors: 0,
                has_error: false,
            },
            BufferStatus {
                len: 400,
                capacity: 1000,
                is_full: false,
            },
            PublisherStatus {
                connected: false,
                state: ConnectionState::Connecting,
                destination: "broker.emqx.io:8883".into(),
                topic: "rail/vibration/data".into(),
                queue_size: 3,
                queue_capacity: 1000,
                sent: 17,
                buffered: 3,
                evicted: 0,
                dropped: 0,
            },
        )
    }

    #[test]
    fn test_snapshot_serializes() {
        let json = serde_json::to_value(snapshot(Duration::from_secs(90))).unwrap();

        assert_eq!(json["uptime_secs"], 90);
        assert_eq!(json["sampler"]["total_samples"], 400);
        assert_eq!(json["buffer"]["capacity"], 1000);
        assert_eq!(json["publisher"]["state"], "Connecting");
        assert_eq!(json["publisher"]["queue_size"], 3);
    }

    #[test]
    fn test_summary_mentions_link_and_queue() {
        let summary = snapshot(Duration::ZERO).summary();
        assert!(summary.contains("link connecting to broker.emqx.io:8883"));
        assert!(summary.contains("queue 3/1000"));
        assert!(summary.starts_with("sensor ok"));
    }

    #[test]
    fn test_reporter_ticks_and_stops() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let mut reporter = HealthReporter::start(Duration::from_millis(10), move |uptime| {
            counter.fetch_add(1, Ordering::SeqCst);
            snapshot(uptime)
        })
        .unwrap();

        thread::sleep(Duration::from_millis(80));
        reporter.stop();
        let after_stop = calls.load(Ordering::SeqCst);
        assert!(after_stop >= 1);

        thread::sleep(Duration::from_millis(30));
        assert_eq!(calls.load(Ordering::SeqCst), after_stop);
    }
}
