//! Filter Stage
//!
//! A single 2nd-order IIR section. Holds its own delay state and the
//! coefficient set currently installed; coefficient swaps keep the delay
//! state so a live parameter change does not click.

use biquad::{Biquad, Coefficients, DirectForm2Transposed};

use crate::design::{magnitude_for_frequency, passthrough};

/// One biquad section that can be bypassed
#[derive(Debug, Clone)]
pub struct FilterStage {
    // DirectForm2Transposed: better numerical stability than DF1
    filter: DirectForm2Transposed<f32>,
    coeffs: Coefficients<f32>,
    bypassed: bool,
}

impl Default for FilterStage {
    fn default() -> Self {
        Self::new(passthrough())
    }
}

impl FilterStage {
    pub fn new(coeffs: Coefficients<f32>) -> Self {
        Self {
            filter: DirectForm2Transposed::<f32>::new(coeffs),
            coeffs,
            bypassed: false,
        }
    }

    /// Install a new coefficient set
    ///
    /// Delay registers are left untouched; only `reset()` clears them.
    #[inline]
    pub fn set_coefficients(&mut self, coeffs: Coefficients<f32>) {
        self.filter.update_coefficients(coeffs);
        self.coeffs = coeffs;
    }

    /// Coefficients currently installed
    pub fn coefficients(&self) -> &Coefficients<f32> {
        &self.coeffs
    }

    pub fn set_bypassed(&mut self, bypassed: bool) {
        self.bypassed = bypassed;
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    /// Process one sample; a bypassed stage returns its input unchanged
    #[inline]
    pub fn process_sample(&mut self, sample: f32) -> f32 {
        if self.bypassed {
            return sample;
        }
        self.filter.run(sample)
    }

    /// Process a mono block in-place
    #[inline]
    pub fn process_block(&mut self, block: &mut [f32]) {
        if self.bypassed {
            return;
        }
        for sample in block.iter_mut() {
            *sample = self.filter.run(*sample);
        }
    }

    /// Magnitude this stage contributes at `frequency` (1.0 when bypassed)
    pub fn magnitude_for_frequency(&self, frequency: f64, sample_rate: f64) -> f64 {
        if self.bypassed {
            1.0
        } else {
            magnitude_for_frequency(&self.coeffs, frequency, sample_rate)
        }
    }

    /// Clear delay registers
    pub fn reset(&mut self) {
        self.filter.reset_state();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::peak_filter;

    fn sine(freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / 48000.0).sin() * 0.5)
            .collect()
    }

    #[test]
    fn test_default_stage_is_identity() {
        let mut stage = FilterStage::default();
        let input = sine(440.0, 256);
        let mut output = input.clone();
        stage.process_block(&mut output);
        for (a, b) in input.iter().zip(output.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_bypassed_stage_passes_through() {
        let mut stage = FilterStage::new(peak_filter(1000.0, 1.0, 12.0, 48000.0).unwrap());
        stage.set_bypassed(true);

        let input = sine(1000.0, 512);
        let mut output = input.clone();
        stage.process_block(&mut output);
        assert_eq!(input, output);
        assert_eq!(stage.process_sample(0.25), 0.25);
    }

    #[test]
    fn test_boost_increases_amplitude() {
        let mut stage = FilterStage::new(peak_filter(1000.0, 1.0, 12.0, 48000.0).unwrap());
        let mut block = sine(1000.0, 4800);
        let max_input = block.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        stage.process_block(&mut block);
        let max_output = block[2400..].iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        assert!(max_output > max_input * 3.0, "expected ~4x boost, got {}", max_output / max_input);
    }

    #[test]
    fn test_coefficient_swap_keeps_state() {
        let coeffs = peak_filter(1000.0, 1.0, 6.0, 48000.0).unwrap();
        let mut swapped = FilterStage::new(coeffs);
        let mut untouched = FilterStage::new(coeffs);

        for s in sine(1000.0, 100) {
            swapped.process_sample(s);
            untouched.process_sample(s);
        }

        // Re-installing identical coefficients must not disturb the delay line
        swapped.set_coefficients(coeffs);
        for s in sine(1000.0, 100) {
            assert_eq!(swapped.process_sample(s), untouched.process_sample(s));
        }
    }

    #[test]
    fn test_reset_clears_state() {
        let mut stage = FilterStage::new(peak_filter(1000.0, 1.0, 6.0, 48000.0).unwrap());
        for _ in 0..100 {
            stage.process_sample(1.0);
        }
        stage.reset();

        let mut fresh = FilterStage::new(peak_filter(1000.0, 1.0, 6.0, 48000.0).unwrap());
        assert_eq!(stage.process_sample(0.5), fresh.process_sample(0.5));
    }

    #[test]
    fn test_magnitude_when_bypassed() {
        let mut stage = FilterStage::new(peak_filter(1000.0, 1.0, 12.0, 48000.0).unwrap());
        assert!(stage.magnitude_for_frequency(1000.0, 48000.0) > 3.9);
        stage.set_bypassed(true);
        assert_eq!(stage.magnitude_for_frequency(1000.0, 48000.0), 1.0);
    }
}
