//! Resilient Publisher
//!
//! `publish` sends immediately when connected and otherwise buffers into the
//! offline queue; it never waits on the network. A background drain loop
//! flushes the queue whenever the link is up.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::queue::OfflineQueue;
use super::state::{ConnectionMonitor, ConnectionState};
use super::transport::PublishTransport;
use super::transport::TransportError;
use crate::logic::sampling::BufferError;
use crate::logic::shutdown::StopSignal;

/// What the drain loop does with a payload whose send failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainFailurePolicy {
    /// Put it back at the head of the queue (at-least-once, order kept)
    #[default]
    Requeue,
    /// Discard it (lossy)
    Drop,
}

#[derive(Debug, Clone)]
pub struct PublisherSettings {
    pub topic: String,
    pub queue_capacity: usize,
    pub retry_interval: Duration,
    pub drain_failure_policy: DrainFailurePolicy,
}

/// Publisher status information
#[derive(Debug, Clone, Serialize)]
pub struct PublisherStatus {
    pub connected: bool,
    pub state: ConnectionState,
    pub destination: String,
    pub topic: String,
    pub queue_size: usize,
    pub queue_capacity: usize,
    /// Payloads delivered (direct + drained)
    pub sent: u64,
    /// Payloads that went to the offline queue
    pub buffered: u64,
    /// Payloads evicted by queue overflow
    pub evicted: u64,
    /// Payloads dropped after a failed drain send
    pub dropped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    sent: AtomicU64,
    buffered: AtomicU64,
    evicted: AtomicU64,
    dropped: AtomicU64,
}

struct Shared<T> {
    transport: T,
    queue: OfflineQueue,
    monitor: ConnectionMonitor,
    settings: PublisherSettings,
    counters: Counters,
    stop: Arc<StopSignal>,
}

pub struct ResilientPublisher<T: PublishTransport> {
    shared: Arc<Shared<T>>,
    started: AtomicBool,
    drain: Mutex<Option<JoinHandle<()>>>,
}

impl<T: PublishTransport> ResilientPublisher<T> {
    pub fn new(transport: T, settings: PublisherSettings) -> Result<Self, BufferError> {
        let queue = OfflineQueue::new(settings.queue_capacity)?;
        Ok(Self {
            shared: Arc::new(Shared {
                transport,
                queue,
                monitor: ConnectionMonitor::new(),
                settings,
                counters: Counters::default(),
                stop: StopSignal::new(),
            }),
            started: AtomicBool::new(false),
            drain: Mutex::new(None),
        })
    }

    /// Start connecting and launch the drain loop. A second call is a no-op;
    /// starting after `stop` is refused.
    pub fn start(&self) -> std::io::Result<()> {
        if self.shared.stop.is_triggered() {
            log::error!("Publisher was stopped and cannot be restarted");
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "publisher already stopped",
            ));
        }
        if self.started.swap(true, Ordering::SeqCst) {
            log::warn!("Publisher already started");
            return Ok(());
        }

        let shared = &self.shared;
        log::info!(
            "Publisher starting: {} (topic {})",
            shared.transport.destination(),
            shared.settings.topic
        );

        shared.monitor.notify_connecting();
        if let Err(e) = shared.transport.connect(shared.monitor.clone()) {
            // Payloads keep buffering; the transport owns reconnection
            log::error!("Transport connect failed: {}", e);
            shared.monitor.notify_disconnected();
        }

        let handle = {
            let shared = Arc::clone(&self.shared);
            thread::Builder::new()
                .name("publisher-drain".into())
                .spawn(move || drain_loop(&shared))?
        };
        *self.drain.lock() = Some(handle);
        Ok(())
    }

    /// Send now if connected, otherwise buffer. `true` only when sent.
    pub fn publish(&self, payload: &str) -> bool {
        let shared = &self.shared;

        if shared.monitor.is_connected() {
            match shared.transport.send(&shared.settings.topic, payload) {
                Ok(()) => {
                    shared.counters.sent.fetch_add(1, Ordering::Relaxed);
                    return true;
                }
                Err(e) => log::warn!("Publish failed, buffering: {}", e),
            }
        }

        shared.counters.buffered.fetch_add(1, Ordering::Relaxed);
        if shared.queue.push(payload.to_string()).is_some() {
            shared.counters.evicted.fetch_add(1, Ordering::Relaxed);
            log::debug!("Offline queue full, evicted oldest payload");
        }
        false
    }

    /// Stop draining and close the connection. Queued payloads stay queued.
    /// A stopped publisher is not restartable.
    pub fn stop(&self) {
        self.shared.stop.trigger();
        if let Some(handle) = self.drain.lock().take() {
            if handle.join().is_err() {
                log::error!("Drain thread panicked");
            }
        }
        if self.started.swap(false, Ordering::SeqCst) {
            self.shared.transport.disconnect();
            self.shared.monitor.notify_disconnected();
            log::info!("Publisher stopped ({} payloads still queued)", self.shared.queue.len());
        }
    }

    pub fn status(&self) -> PublisherStatus {
        let shared = &self.shared;
        let state = shared.monitor.state();
        PublisherStatus {
            connected: state == ConnectionState::Connected,
            state,
            destination: shared.transport.destination(),
            topic: shared.settings.topic.clone(),
            queue_size: shared.queue.len(),
            queue_capacity: shared.queue.capacity(),
            sent: shared.counters.sent.load(Ordering::Relaxed),
            buffered: shared.counters.buffered.load(Ordering::Relaxed),
            evicted: shared.counters.evicted.load(Ordering::Relaxed),
            dropped: shared.counters.dropped.load(Ordering::Relaxed),
        }
    }

    /// Handle the transport reports link changes through
    pub fn monitor(&self) -> &ConnectionMonitor {
        &self.shared.monitor
    }

    pub fn transport(&self) -> &T {
        &self.shared.transport
    }

    pub fn queued_payloads(&self) -> Vec<String> {
        self.shared.queue.contents()
    }
}

impl<T: PublishTransport> Drop for ResilientPublisher<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

// ============================================================================
// DRAIN LOOP
// ============================================================================

/// Pause before retrying a send the transport reported as busy
const BUSY_PAUSE: Duration = Duration::from_millis(20);

fn drain_loop<T: PublishTransport>(shared: &Shared<T>) {
    let interval = shared.settings.retry_interval;
    log::info!("Drain loop started (retry every {:?})", interval);

    loop {
        if shared.stop.is_triggered() {
            break;
        }

        if shared.monitor.is_connected() {
            drain_once(shared);
        }

        if shared.stop.wait_timeout(interval) {
            break;
        }
    }

    log::info!("Drain loop stopped");
}

/// Send queued payloads one by one while connected. A failed send ends the
/// cycle; a busy transport only pauses it.
fn drain_once<T: PublishTransport>(shared: &Shared<T>) {
    let mut drained = 0u64;

    while shared.monitor.is_connected() && !shared.stop.is_triggered() {
        let Some(payload) = shared.queue.pop() else {
            break;
        };

        let result = shared.transport.send(&shared.settings.topic, &payload);
        if let Err(TransportError::Busy) = result {
            if shared.queue.push_front(payload).is_err() {
                shared.counters.dropped.fetch_add(1, Ordering::Relaxed);
            }
            if shared.stop.wait_timeout(BUSY_PAUSE) {
                break;
            }
            continue;
        }

        if let Err(e) = result {
            log::warn!("Drain send failed after {} payloads: {}", drained, e);
            match shared.settings.drain_failure_policy {
                DrainFailurePolicy::Requeue => {
                    if shared.queue.push_front(payload).is_err() {
                        shared.counters.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                }
                DrainFailurePolicy::Drop => {
                    shared.counters.dropped.fetch_add(1, Ordering::Relaxed);
                }
            }
            return;
        }

        drained += 1;
        shared.counters.sent.fetch_add(1, Ordering::Relaxed);
    }

    if drained > 0 {
        log::info!("Drained {} buffered payloads", drained);
    }
}
