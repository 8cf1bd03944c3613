//! Features Module - Feature Extraction Engine
//!
//! Reduces a batch of readings to a named feature vector:
//! - `statistical.rs` - mean / std / min / max / rms / p2p / crest per axis
//! - `spectrum.rs` - Hann-windowed half spectrum, dominant / mean frequency, band energy
//! - `extractor.rs` - Batch validation + assembly
//! - `vector.rs` - Sorted feature map and its CSV wire format

pub mod vector;
pub mod statistical;
pub mod spectrum;
pub mod extractor;


/// Numerical-stability epsilon used in rms and spectrum normalisation
pub const EPS: f64 = 1e-12;

// Re-export common types
pub use vector::{FeatureVector, WireFormatError};
pub use spectrum::Band;
pub use extractor::{ExtractError, FeatureExtractor, RawRecord};
