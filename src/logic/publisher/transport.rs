//! Network transport seam for the publisher

use thiserror::Error;

use super::state::ConnectionMonitor;

/// Transport errors are recoverable: the payload gets buffered offline
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport not connected")]
    NotConnected,

    /// The outgoing request channel is full; the link itself is fine
    #[error("transport busy, outgoing requests full")]
    Busy,

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("connection setup failed: {0}")]
    Setup(String),
}

pub trait PublishTransport: Send + Sync + 'static {
    /// Begin asynchronous connection attempts. Link changes are reported
    /// through `monitor`; must not block on the network.
    fn connect(&self, monitor: ConnectionMonitor) -> Result<(), TransportError>;

    /// Hand one payload to the transport without blocking
    fn send(&self, topic: &str, payload: &str) -> Result<(), TransportError>;

    /// Close the connection; best-effort
    fn disconnect(&self);

    /// Destination identity for status output, e.g. `host:port`
    fn destination(&self) -> String;
}
