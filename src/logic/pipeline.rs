//! Telemetry Pipeline - the main batch loop
//!
//! Each cycle: snapshot the sample buffer, log new raw readings, extract
//! features, log them, probe the modem, then publish the wire payload.
//! A failed step ends the cycle with an outcome; nothing partial is emitted.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::logic::features::{ExtractError, FeatureExtractor};
use crate::logic::handshake::{HandshakeGate, ProbeChannel};
use crate::logic::logs::{ProcessedLog, RawLog};
use crate::logic::publisher::{PublishTransport, ResilientPublisher};
use crate::logic::sampling::{Reading, SampleBuffer};
use crate::logic::shutdown::StopSignal;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Readings per extraction batch
    pub batch_size: usize,
    pub sampling_rate_hz: f64,
    pub send_interval: Duration,
}

/// Result of one cycle
#[derive(Debug, PartialEq)]
pub enum CycleOutcome {
    /// Fewer than `batch_size` readings available
    Waiting { available: usize },
    /// Feature extraction refused the batch
    Rejected(ExtractError),
    /// The modem did not answer; nothing was published
    HandshakeFailed,
    Published,
    /// Queued offline for the drain loop
    Buffered,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PipelineStats {
    pub cycles: u64,
    pub published: u64,
    pub buffered: u64,
    pub rejected: u64,
    pub handshake_failures: u64,
}

pub struct Pipeline<C: ProbeChannel, T: PublishTransport> {
    buffer: Arc<SampleBuffer>,
    extractor: FeatureExtractor,
    gate: HandshakeGate<C>,
    publisher: Arc<ResilientPublisher<T>>,
    raw_log: Option<RawLog>,
    processed_log: Option<ProcessedLog>,
    settings: PipelineSettings,
    /// Newest timestamp already in the raw log
    last_logged: Option<f64>,
    stats: PipelineStats,
}

impl<C: ProbeChannel, T: PublishTransport> Pipeline<C, T> {
    pub fn new(
        buffer: Arc<SampleBuffer>,
        extractor: FeatureExtractor,
        gate: HandshakeGate<C>,
        publisher: Arc<ResilientPublisher<T>>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            buffer,
            extractor,
            gate,
            publisher,
            raw_log: None,
            processed_log: None,
            settings,
            last_logged: None,
            stats: PipelineStats::default(),
        }
    }

    pub fn with_logs(mut self, raw: RawLog, processed: ProcessedLog) -> Self {
        self.raw_log = Some(raw);
        self.processed_log = Some(processed);
        self
    }

    pub fn run_cycle(&mut self) -> CycleOutcome {
        self.stats.cycles += 1;

        let batch = self.buffer.snapshot(self.settings.batch_size);
        self.log_raw(&batch);

        if batch.len() < self.settings.batch_size {
            log::debug!("Waiting for samples ({}/{})", batch.len(), self.settings.batch_size);
            return CycleOutcome::Waiting { available: batch.len() };
        }

        let features = match self.extractor.extract(&batch, self.settings.sampling_rate_hz) {
            Ok(features) => features,
            Err(e) => {
                self.stats.rejected += 1;
                log::warn!("Feature extraction failed: {}", e);
                return CycleOutcome::Rejected(e);
            }
        };

        if let Some(processed) = &self.processed_log {
            if let Err(e) = processed.append(&features) {
                log::warn!("Failed to write processed log: {}", e);
            }
        }
        let payload = features.to_wire();

        if !self.gate.probe() {
            self.stats.handshake_failures += 1;
            return CycleOutcome::HandshakeFailed;
        }

        if self.publisher.publish(&payload) {
            self.stats.published += 1;
            log::debug!("Published {} features", features.len());
            CycleOutcome::Published
        } else {
            self.stats.buffered += 1;
            log::debug!("Payload buffered offline");
            CycleOutcome::Buffered
        }
    }

    /// Run cycles every `send_interval` until `stop` is triggered
    pub fn run(&mut self, stop: &StopSignal) {
        log::info!(
            "Pipeline started (batch {} every {:?})",
            self.settings.batch_size,
            self.settings.send_interval
        );

        while !stop.is_triggered() {
            self.run_cycle();
            if stop.wait_timeout(self.settings.send_interval) {
                break;
            }
        }

        log::info!(
            "Pipeline stopped after {} cycles ({} published, {} buffered)",
            self.stats.cycles,
            self.stats.published,
            self.stats.buffered
        );
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn gate(&self) -> &HandshakeGate<C> {
        &self.gate
    }

    /// Append only readings newer than the last logged one
    fn log_raw(&mut self, batch: &[Reading]) {
        let Some(raw) = &self.raw_log else {
            return;
        };

        let fresh: Vec<Reading> = match self.last_logged {
            Some(last) => batch.iter().filter(|r| r.timestamp > last).copied().collect(),
            None => batch.to_vec(),
        };
        let Some(newest) = fresh.iter().map(|r| r.timestamp).reduce(f64::max) else {
            return;
        };

        match raw.append(&fresh) {
            Ok(()) => self.last_logged = Some(newest),
            Err(e) => log::warn!("Failed to write raw log: {}", e),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::handshake::{HandshakeError, HandshakeSettings, ProbeSession};
    use crate::logic::publisher::{
        ConnectionMonitor, DrainFailurePolicy, PublisherSettings, TransportError,
    };
    use parking_lot::Mutex;
    use std::fs;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Modem that answers `OK` while `online`
    #[derive(Clone)]
    struct FakeModem {
        online: Arc<AtomicBool>,
    }

    struct FakeSession;

    impl ProbeChannel for FakeModem {
        type Session = FakeSession;

        fn open(&mut self, _timeout: Duration) -> Result<FakeSession, HandshakeError> {
            if self.online.load(Ordering::SeqCst) {
                Ok(FakeSession)
            } else {
                Err(HandshakeError::Timeout)
            }
        }
    }

    impl ProbeSession for FakeSession {
        fn clear_input(&mut self) -> Result<(), HandshakeError> {
            Ok(())
        }

        fn send(&mut self, _message: &[u8]) -> Result<(), HandshakeError> {
            Ok(())
        }

        fn receive(&mut self, _max_len: usize) -> Result<Vec<u8>, HandshakeError> {
            Ok(b"OK\r\n".to_vec())
        }
    }

    /// Transport that is connected from the first `connect`
    #[derive(Default)]
    struct LoopbackTransport {
        sent: Mutex<Vec<String>>,
    }

    impl PublishTransport for LoopbackTransport {
        fn connect(&self, monitor: ConnectionMonitor) -> Result<(), TransportError> {
            monitor.notify_connected();
            Ok(())
        }

        fn send(&self, _topic: &str, payload: &str) -> Result<(), TransportError> {
            self.sent.lock().push(payload.to_string());
            Ok(())
        }

        fn disconnect(&self) {}

        fn destination(&self) -> String {
            "loopback".into()
        }
    }

    struct Harness {
        buffer: Arc<SampleBuffer>,
        modem_online: Arc<AtomicBool>,
        publisher: Arc<ResilientPublisher<LoopbackTransport>>,
        pipeline: Pipeline<FakeModem, LoopbackTransport>,
    }

    fn harness(batch_size: usize, start_publisher: bool) -> Harness {
        let buffer = Arc::new(SampleBuffer::new(100).unwrap());
        let modem_online = Arc::new(AtomicBool::new(true));
        let settings = HandshakeSettings {
            attempts: 2,
            retry_delay: Duration::from_millis(1),
            ..HandshakeSettings::default()
        };
        let gate = HandshakeGate::new(
            FakeModem {
                online: Arc::clone(&modem_online),
            },
            settings,
        );
        let publisher = Arc::new(
            ResilientPublisher::new(
                LoopbackTransport::default(),
                PublisherSettings {
                    topic: "rail/vibration/data".into(),
                    queue_capacity: 10,
                    retry_interval: Duration::from_secs(30),
                    drain_failure_policy: DrainFailurePolicy::Requeue,
                },
            )
            .unwrap(),
        );
        if start_publisher {
            publisher.start().unwrap();
        }

        let pipeline = Pipeline::new(
            Arc::clone(&buffer),
            FeatureExtractor::default(),
            gate,
            Arc::clone(&publisher),
            PipelineSettings {
                batch_size,
                sampling_rate_hz: 20.0,
                send_interval: Duration::from_millis(10),
            },
        );

        Harness {
            buffer,
            modem_online,
            publisher,
            pipeline,
        }
    }

    fn fill(buffer: &SampleBuffer, from: usize, count: usize) {
        for i in from..from + count {
            let t = i as f64 * 0.05;
            buffer.push(Reading::new(t, (t * 3.0).sin() * 0.05, 0.0, 1.0));
        }
    }

    #[test]
    fn test_waits_for_full_batch() {
        let mut h = harness(10, true);
        fill(&h.buffer, 0, 4);

        assert_eq!(h.pipeline.run_cycle(), CycleOutcome::Waiting { available: 4 });
        assert!(h.publisher.transport().sent.lock().is_empty());
    }

    #[test]
    fn test_publishes_wire_payload() {
        let mut h = harness(10, true);
        fill(&h.buffer, 0, 10);

        assert_eq!(h.pipeline.run_cycle(), CycleOutcome::Published);

        let sent = h.publisher.transport().sent.lock().clone();
        assert_eq!(sent.len(), 1);
        let features = crate::logic::features::FeatureVector::from_wire(&sent[0]).unwrap();
        assert_eq!(features.get("sample_count"), Some(10.0));
        assert_eq!(h.pipeline.stats().published, 1);
    }

    #[test]
    fn test_rejected_batch_is_not_published() {
        let mut h = harness(3, true);
        fill(&h.buffer, 0, 3);

        // Default extractor wants 5 samples
        assert_eq!(
            h.pipeline.run_cycle(),
            CycleOutcome::Rejected(ExtractError::InsufficientData { required: 5, actual: 3 })
        );
        assert!(h.publisher.transport().sent.lock().is_empty());
        assert_eq!(h.pipeline.stats().rejected, 1);
    }

    #[test]
    fn test_handshake_failure_skips_publish() {
        let mut h = harness(10, true);
        fill(&h.buffer, 0, 10);
        h.modem_online.store(false, Ordering::SeqCst);

        assert_eq!(h.pipeline.run_cycle(), CycleOutcome::HandshakeFailed);
        assert!(h.publisher.transport().sent.lock().is_empty());
        assert_eq!(h.publisher.status().queue_size, 0);
        assert_eq!(h.pipeline.gate().failures(), 1);
    }

    #[test]
    fn test_offline_publisher_buffers() {
        let mut h = harness(10, false);
        fill(&h.buffer, 0, 10);

        assert_eq!(h.pipeline.run_cycle(), CycleOutcome::Buffered);
        assert_eq!(h.publisher.status().queue_size, 1);
    }

    #[test]
    fn test_raw_log_has_no_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = harness(10, true);
        h.pipeline = h.pipeline.with_logs(
            RawLog::create(&dir.path().join("raw")).unwrap(),
            ProcessedLog::create(&dir.path().join("processed")).unwrap(),
        );

        fill(&h.buffer, 0, 10);
        h.pipeline.run_cycle();
        // Overlapping snapshot: 5 old readings, 5 new
        fill(&h.buffer, 10, 5);
        h.pipeline.run_cycle();

        let raw_path = fs::read_dir(dir.path().join("raw")).unwrap().next().unwrap().unwrap().path();
        let raw = fs::read_to_string(raw_path).unwrap();
        // header + 15 unique readings
        assert_eq!(raw.lines().count(), 16);

        let processed_path = fs::read_dir(dir.path().join("processed"))
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .path();
        let processed = fs::read_to_string(processed_path).unwrap();
        // header + one row per extracted batch
        assert_eq!(processed.lines().count(), 3);
    }

    #[test]
    fn test_run_stops_on_signal() {
        let mut h = harness(10, true);
        fill(&h.buffer, 0, 10);
        let stop = StopSignal::new();

        let trigger = Arc::clone(&stop);
        let stopper = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            trigger.trigger();
        });

        h.pipeline.run(&stop);
        stopper.join().unwrap();

        assert!(h.pipeline.stats().cycles >= 1);
        assert!(h.pipeline.stats().published >= 1);
    }
}
