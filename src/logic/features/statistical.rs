//! Statistical (time-domain) features per axis

use super::vector::FeatureVector;
use super::EPS;

/// Time-domain summary of one axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisStats {
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator)
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub rms: f64,
    pub p2p: f64,
    pub crest: f64,
}

impl AxisStats {
    /// Summarise a non-empty series
    pub fn compute(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;

        let std = if values.len() > 1 {
            let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (n - 1.0)).sqrt()
        } else {
            0.0
        };

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        // Epsilon inside the root keeps all-zero input away from rms == 0
        let mean_square = values.iter().map(|v| v * v).sum::<f64>() / n;
        let rms = (mean_square + EPS).sqrt();

        let crest = if rms > 0.0 {
            max.abs().max(min.abs()) / rms
        } else {
            0.0
        };

        Some(Self {
            mean,
            std,
            min,
            max,
            rms,
            p2p: max - min,
            crest,
        })
    }

    pub fn write_to(&self, axis: &str, vector: &mut FeatureVector) {
        vector.insert(format!("mean_{}", axis), self.mean);
        vector.insert(format!("std_{}", axis), self.std);
        vector.insert(format!("min_{}", axis), self.min);
        vector.insert(format!("max_{}", axis), self.max);
        vector.insert(format!("rms_{}", axis), self.rms);
        vector.insert(format!("p2p_{}", axis), self.p2p);
        vector.insert(format!("crest_{}", axis), self.crest);
    }
}
