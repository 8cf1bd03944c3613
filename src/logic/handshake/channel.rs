//! Probe channel abstraction
//!
//! A channel opens short-lived sessions; each session is one exchange and is
//! closed when dropped.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("failed to open {port}: {reason}")]
    Open { port: String, reason: String },

    #[error("timed out waiting for response")]
    Timeout,

    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub trait ProbeChannel {
    type Session: ProbeSession;

    /// Open the transport; reads on the session give up after `timeout`
    fn open(&mut self, timeout: Duration) -> Result<Self::Session, HandshakeError>;
}

pub trait ProbeSession {
    /// Discard anything pending on the input side
    fn clear_input(&mut self) -> Result<(), HandshakeError>;

    fn send(&mut self, message: &[u8]) -> Result<(), HandshakeError>;

    /// Read up to `max_len` bytes, returning what arrived before the timeout
    fn receive(&mut self, max_len: usize) -> Result<Vec<u8>, HandshakeError>;
}
