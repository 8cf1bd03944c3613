//! Spectrum (frequency-domain) features per axis
//!
//! Hann-windowed real DFT, half spectrum (bins `0..=n/2`), magnitudes
//! normalised by the window sum.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use std::f64::consts::PI;

use super::vector::FeatureVector;
use super::EPS;

/// Frequency band in Hz, half-open `[low, high)`
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Band {
    pub low: f64,
    pub high: f64,
}

impl Band {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, frequency: f64) -> bool {
        frequency >= self.low && frequency < self.high
    }

    /// Feature name, e.g. `energy_X_10_50Hz`
    pub fn feature_name(&self, axis: &str) -> String {
        format!("energy_{}_{}_{}Hz", axis, self.low, self.high)
    }
}

/// Symmetric Hann window: `0.5 - 0.5 cos(2πi / (n - 1))`
pub fn hann_window(n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => {
            let denom = (n - 1) as f64;
            (0..n)
                .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / denom).cos())
                .collect()
        }
    }
}

/// Half spectrum of a real series
#[derive(Debug, Clone)]
pub struct Spectrum {
    pub frequencies: Vec<f64>,
    pub magnitudes: Vec<f64>,
}

impl Spectrum {
    /// `None` for fewer than two samples
    pub fn compute(planner: &mut FftPlanner<f64>, values: &[f64], sampling_rate_hz: f64) -> Option<Self> {
        let n = values.len();
        if n < 2 {
            return None;
        }

        let window = hann_window(n);
        let window_sum: f64 = window.iter().sum();

        let mut buffer: Vec<Complex<f64>> = values
            .iter()
            .zip(&window)
            .map(|(v, w)| Complex::new(v * w, 0.0))
            .collect();
        planner.plan_fft_forward(n).process(&mut buffer);

        let bins = n / 2 + 1;
        let norm = window_sum + EPS;
        let magnitudes = buffer[..bins].iter().map(|c| c.norm() / norm).collect();
        let frequencies = (0..bins)
            .map(|k| k as f64 * sampling_rate_hz / n as f64)
            .collect();

        Some(Self { frequencies, magnitudes })
    }

    pub fn max_magnitude(&self) -> f64 {
        self.magnitudes.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Frequency of the first bin holding the maximum magnitude
    pub fn dominant_frequency(&self) -> f64 {
        let mut best = 0;
        for (i, m) in self.magnitudes.iter().enumerate() {
            if *m > self.magnitudes[best] {
                best = i;
            }
        }
        self.frequencies[best]
    }

    /// Magnitude-weighted mean frequency
    pub fn mean_frequency(&self) -> f64 {
        let weighted: f64 = self
            .frequencies
            .iter()
            .zip(&self.magnitudes)
            .map(|(f, m)| f * m)
            .sum();
        let total: f64 = self.magnitudes.iter().sum();
        weighted / (total + EPS)
    }

    /// Sum of squared magnitudes of bins inside `band`
    pub fn band_energy(&self, band: &Band) -> f64 {
        self.frequencies
            .iter()
            .zip(&self.magnitudes)
            .filter(|(f, _)| band.contains(**f))
            .map(|(_, m)| m * m)
            .sum()
    }

    pub fn write_to(&self, axis: &str, bands: &[Band], vector: &mut FeatureVector) {
        vector.insert(format!("fft_{}_max", axis), self.max_magnitude());
        vector.insert(format!("freq_{}_dominant", axis), self.dominant_frequency());
        vector.insert(format!("freq_{}_mean", axis), self.mean_frequency());
        for band in bands {
            vector.insert(band.feature_name(axis), self.band_energy(band));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_window_shape() {
        let w = hann_window(5);
        let expected = [0.0, 0.5, 1.0, 0.5, 0.0];
        for (a, b) in w.iter().zip(expected) {
            assert!((a - b).abs() < 1e-12);
        }
        assert_eq!(hann_window(1), vec![1.0]);
    }

    #[test]
    fn test_half_spectrum_bins() {
        let mut planner = FftPlanner::new();
        let spectrum = Spectrum::compute(&mut planner, &[0.0; 10], 20.0).unwrap();
        assert_eq!(spectrum.magnitudes.len(), 6);
        assert_eq!(spectrum.frequencies, vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);

        let odd = Spectrum::compute(&mut planner, &[0.0; 9], 9.0).unwrap();
        assert_eq!(odd.magnitudes.len(), 5);
    }

    #[test]
    fn test_sine_dominant_frequency() {
        let rate = 100.0;
        let values: Vec<f64> = (0..100)
            .map(|i| (2.0 * PI * 5.0 * i as f64 / rate).sin())
            .collect();

        let mut planner = FftPlanner::new();
        let spectrum = Spectrum::compute(&mut planner, &values, rate).unwrap();

        assert_eq!(spectrum.dominant_frequency(), 5.0);
        let low = spectrum.band_energy(&Band::new(0.0, 10.0));
        let mid = spectrum.band_energy(&Band::new(10.0, 50.0));
        assert!(low > 100.0 * mid);
    }

    #[test]
    fn test_dc_signal_normalises_to_amplitude() {
        let mut planner = FftPlanner::new();
        let spectrum = Spectrum::compute(&mut planner, &[2.0; 16], 16.0).unwrap();

        assert!((spectrum.max_magnitude() - 2.0).abs() < 1e-9);
        assert_eq!(spectrum.dominant_frequency(), 0.0);
    }

    #[test]
    fn test_too_short() {
        let mut planner = FftPlanner::new();
        assert!(Spectrum::compute(&mut planner, &[1.0], 10.0).is_none());
    }

    #[test]
    fn test_band_feature_name() {
        assert_eq!(Band::new(0.0, 10.0).feature_name("X"), "energy_X_0_10Hz");
        assert_eq!(Band::new(2.5, 7.5).feature_name("Z"), "energy_Z_2.5_7.5Hz");
    }
}
