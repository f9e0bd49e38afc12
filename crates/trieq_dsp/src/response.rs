//! Filter response curve for display
//!
//! One magnitude value (dB) per horizontal pixel, with pixel `i` of `width`
//! standing for the frequency `map_to_log10(i / width, 20, 20000)`.

use crate::chain::ChannelChain;
use crate::path::{map_to_log10, MAX_DISPLAY_FREQ, MIN_DISPLAY_FREQ};

/// Frequency shown at pixel `index` of a `width`-pixel wide curve
pub fn pixel_frequency(index: usize, width: usize) -> f64 {
    if width == 0 {
        return MIN_DISPLAY_FREQ as f64;
    }
    map_to_log10(index as f32 / width as f32, MIN_DISPLAY_FREQ, MAX_DISPLAY_FREQ) as f64
}

/// Combined magnitude of the chain's non-bypassed sections at each pixel, in dB
pub fn response_curve(chain: &ChannelChain, width: usize, sample_rate: f64) -> Vec<f64> {
    let mut curve = Vec::with_capacity(width);
    fill_response_curve(chain, width, sample_rate, &mut curve);
    curve
}

/// `response_curve` into an existing buffer
pub fn fill_response_curve(chain: &ChannelChain, width: usize, sample_rate: f64, out: &mut Vec<f64>) {
    out.clear();
    out.extend((0..width).map(|i| {
        let magnitude = chain.magnitude_for_frequency(pixel_frequency(i, width), sample_rate);
        20.0 * magnitude.max(f64::MIN_POSITIVE).log10()
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainSettings;

    const FS: f64 = 48000.0;

    #[test]
    fn test_pixel_frequencies_span_display_range() {
        assert!((pixel_frequency(0, 500) - 20.0).abs() < 1e-3);
        assert!(pixel_frequency(499, 500) < 20000.0);
        assert!(pixel_frequency(499, 500) > 19000.0);
        assert!(pixel_frequency(250, 500) > pixel_frequency(100, 500));
    }

    #[test]
    fn test_default_chain_is_nearly_flat() {
        let chain = ChannelChain::new(&ChainSettings::default(), FS as f32).unwrap();
        let curve = response_curve(&chain, 400, FS);
        assert_eq!(curve.len(), 400);
        // Between the default 20Hz/20kHz cut filters the curve is within a dB of 0
        for db in &curve[40..360] {
            assert!(db.abs() < 1.0, "{}", db);
        }
    }

    #[test]
    fn test_peak_boost_shows_in_curve() {
        let settings = ChainSettings {
            peak_freq: 1000.0,
            peak_gain_db: 12.0,
            ..Default::default()
        };
        let chain = ChannelChain::new(&settings, FS as f32).unwrap();
        let curve = response_curve(&chain, 1000, FS);

        let max = curve.iter().cloned().fold(f64::MIN, f64::max);
        assert!((max - 12.0).abs() < 0.3);

        let mut bypassed = settings;
        bypassed.peak_bypassed = true;
        let flat = ChannelChain::new(&bypassed, FS as f32).unwrap();
        let mut reused = vec![99.0; 3];
        fill_response_curve(&flat, 1000, FS, &mut reused);
        assert_eq!(reused.len(), 1000);
        assert!(reused[500].abs() < 0.5);
    }
}
