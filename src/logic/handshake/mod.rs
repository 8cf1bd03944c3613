//! Handshake Module - Modem liveness probe
//!
//! Before every transmission the modem is asked a short command over its
//! serial line and must answer `ACK` or `OK`. The probe retries a bounded
//! number of times and blocks only the caller (the main loop).
//!
//! - `channel.rs` - Probe channel / session traits
//! - `serial.rs` - Serial-port implementation

pub mod channel;
pub mod serial;

pub use channel::{HandshakeError, ProbeChannel, ProbeSession};
pub use serial::SerialChannel;

use std::thread;
use std::time::Duration;

use crate::constants::{
    DEFAULT_PROBE_ATTEMPTS, DEFAULT_PROBE_MESSAGE, DEFAULT_PROBE_RETRY_DELAY_MS, DEFAULT_PROBE_TIMEOUT_MS,
};

/// Responses accepted as a positive acknowledgement (after trim + upper-case)
pub const ACCEPTED_RESPONSES: [&str; 2] = ["ACK", "OK"];

/// Bytes read back per attempt (room for a trailing CR/LF)
pub const RESPONSE_LEN: usize = 4;

// ============================================================================
// PROBE
// ============================================================================

/// Run up to `attempts` request/response exchanges over `channel`.
///
/// Returns `true` on the first accepted response, `false` once every attempt
/// failed. Transport errors and unexpected responses are logged, never raised.
pub fn probe<C: ProbeChannel + ?Sized>(
    channel: &mut C,
    message: &[u8],
    attempts: u32,
    retry_delay: Duration,
    timeout: Duration,
) -> bool {
    for attempt in 1..=attempts {
        match exchange(channel, message, timeout) {
            Ok(response) if is_accepted(&response) => {
                log::debug!("Handshake acknowledged on attempt {} ({:?})", attempt, response);
                return true;
            }
            Ok(response) => {
                log::warn!("Handshake attempt {} got unexpected response {:?}", attempt, response);
            }
            Err(e) => {
                log::warn!("Handshake attempt {} failed: {}", attempt, e);
            }
        }

        if attempt < attempts {
            thread::sleep(retry_delay);
        }
    }
    false
}

/// One open / clear / write / read cycle; the session closes when dropped
fn exchange<C: ProbeChannel + ?Sized>(
    channel: &mut C,
    message: &[u8],
    timeout: Duration,
) -> Result<String, HandshakeError> {
    let mut session = channel.open(timeout)?;
    session.clear_input()?;
    session.send(message)?;
    let raw = session.receive(RESPONSE_LEN)?;
    Ok(String::from_utf8_lossy(&raw).trim().to_ascii_uppercase())
}

fn is_accepted(response: &str) -> bool {
    ACCEPTED_RESPONSES.contains(&response)
}

// ============================================================================
// GATE
// ============================================================================

/// Probe parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeSettings {
    pub message: Vec<u8>,
    pub attempts: u32,
    pub retry_delay: Duration,
    pub timeout: Duration,
}

impl Default for HandshakeSettings {
    fn default() -> Self {
        Self {
            message: DEFAULT_PROBE_MESSAGE.as_bytes().to_vec(),
            attempts: DEFAULT_PROBE_ATTEMPTS,
            retry_delay: Duration::from_millis(DEFAULT_PROBE_RETRY_DELAY_MS),
            timeout: Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS),
        }
    }
}

/// A channel bundled with its probe settings; gates every transmission
pub struct HandshakeGate<C> {
    channel: C,
    settings: HandshakeSettings,
    failures: u64,
}

impl<C: ProbeChannel> HandshakeGate<C> {
    pub fn new(channel: C, settings: HandshakeSettings) -> Self {
        Self {
            channel,
            settings,
            failures: 0,
        }
    }

    /// `true` when the transport answered within the configured attempts
    pub fn probe(&mut self) -> bool {
        let ok = probe(
            &mut self.channel,
            &self.settings.message,
            self.settings.attempts,
            self.settings.retry_delay,
            self.settings.timeout,
        );
        if !ok {
            self.failures += 1;
            log::warn!(
                "Handshake failed after {} attempts ({} failed cycles so far)",
                self.settings.attempts,
                self.failures
            );
        }
        ok
    }

    /// Number of probes that exhausted every attempt
    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn settings(&self) -> &HandshakeSettings {
        &self.settings
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }
}
