//! Publisher Module - resilient delivery of feature payloads
//!
//! Payloads go straight to the transport while the link is up and into a
//! bounded drop-oldest offline queue otherwise. A background loop drains the
//! queue in FIFO order once the link comes back.

pub mod mqtt;
pub mod queue;
pub mod resilient;
pub mod state;
pub mod transport;

pub use mqtt::{MqttSettings, MqttTransport};
pub use queue::OfflineQueue;
pub use resilient::{DrainFailurePolicy, PublisherSettings, PublisherStatus, ResilientPublisher};
pub use state::{ConnectionMonitor, ConnectionState};
pub use transport::{PublishTransport, TransportError};
