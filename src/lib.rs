//! Rail Resonance Core
//!
//! Vibration telemetry pipeline: a sensor-polling producer fills a bounded
//! sample buffer, batches are reduced to feature vectors, the modem is probed,
//! and payloads are published to an MQTT collector with offline buffering.
//!
//! ```text
//! sampler thread ─▶ SampleBuffer ─▶ FeatureExtractor ─▶ HandshakeGate ─▶ ResilientPublisher
//!                                                                         │
//!                                                           drain thread ◀┘ (OfflineQueue)
//! ```

pub mod constants;
pub mod logic;

pub use logic::config::Config;
pub use logic::features::{FeatureExtractor, FeatureVector};
pub use logic::handshake::HandshakeGate;
pub use logic::pipeline::Pipeline;
pub use logic::publisher::ResilientPublisher;
pub use logic::sampling::{Reading, SampleBuffer};
