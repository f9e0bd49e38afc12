//! Channel Chain
//!
//! LowCut bank -> Peak stage -> HighCut bank, one chain per audio channel.
//! The order is fixed; reordering would change the frequency response.

use biquad::Coefficients;
use serde::{Deserialize, Serialize};

use crate::cut::{CutFilter, Slope};
use crate::design::{make_high_cut_filter, make_low_cut_filter, make_peak_filter, passthrough, MAX_CUT_SECTIONS};
use crate::error::DspError;
use crate::stage::FilterStage;

/// Position of each sub-chain inside a `ChannelChain`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainPosition {
    LowCut,
    Peak,
    HighCut,
}

/// Snapshot of every filter parameter, taken once per block/tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChainSettings {
    pub peak_freq: f32,
    pub peak_gain_db: f32,
    pub peak_q: f32,
    pub low_cut_freq: f32,
    pub high_cut_freq: f32,
    pub low_cut_slope: Slope,
    pub high_cut_slope: Slope,
    pub low_cut_bypassed: bool,
    pub peak_bypassed: bool,
    pub high_cut_bypassed: bool,
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            peak_freq: 750.0,
            peak_gain_db: 0.0,
            peak_q: 1.0,
            low_cut_freq: 20.0,
            high_cut_freq: 20000.0,
            low_cut_slope: Slope::Slope12,
            high_cut_slope: Slope::Slope12,
            low_cut_bypassed: false,
            peak_bypassed: false,
            high_cut_bypassed: false,
        }
    }
}

/// Designed coefficients for one cut bank, ready to install
#[derive(Debug, Clone, Copy)]
pub struct CutUpdate {
    /// Sections beyond `slope` hold passthrough coefficients
    pub coefficients: [Coefficients<f32>; MAX_CUT_SECTIONS],
    pub slope: Slope,
    pub bypassed: bool,
}

impl CutUpdate {
    pub fn new(sections: &[Coefficients<f32>], slope: Slope, bypassed: bool) -> Self {
        let coefficients = core::array::from_fn(|i| sections.get(i).copied().unwrap_or_else(passthrough));
        Self {
            coefficients,
            slope,
            bypassed,
        }
    }
}

/// Designed coefficients for the peak stage
#[derive(Debug, Clone, Copy)]
pub struct PeakUpdate {
    pub coefficients: Coefficients<f32>,
    pub bypassed: bool,
}

/// Everything a `ChannelChain` needs to switch to new settings
///
/// Plain `Copy` data: designing happens off the audio thread, installing is
/// a handful of stores.
#[derive(Debug, Clone, Copy)]
pub struct ChainUpdate {
    pub low_cut: CutUpdate,
    pub peak: PeakUpdate,
    pub high_cut: CutUpdate,
}

impl ChainUpdate {
    /// Design all sections for `settings` at `sample_rate`
    pub fn design(settings: &ChainSettings, sample_rate: f32) -> Result<Self, DspError> {
        let low_cut = make_low_cut_filter(settings, sample_rate)?;
        let peak = make_peak_filter(settings, sample_rate)?;
        let high_cut = make_high_cut_filter(settings, sample_rate)?;

        Ok(Self {
            low_cut: CutUpdate::new(&low_cut, settings.low_cut_slope, settings.low_cut_bypassed),
            peak: PeakUpdate {
                coefficients: peak,
                bypassed: settings.peak_bypassed,
            },
            high_cut: CutUpdate::new(&high_cut, settings.high_cut_slope, settings.high_cut_bypassed),
        })
    }
}

/// Filter chain for a single audio channel
#[derive(Debug, Clone, Default)]
pub struct ChannelChain {
    low_cut: CutFilter,
    peak: FilterStage,
    high_cut: CutFilter,
}

impl ChannelChain {
    /// Create a chain already configured for `settings`
    pub fn new(settings: &ChainSettings, sample_rate: f32) -> Result<Self, DspError> {
        let mut chain = Self::default();
        chain.update_filters(settings, sample_rate)?;
        Ok(chain)
    }

    /// Re-design and install every section for `settings`
    ///
    /// Call this between blocks, not during. Delay state is preserved.
    pub fn update_filters(&mut self, settings: &ChainSettings, sample_rate: f32) -> Result<(), DspError> {
        let update = ChainUpdate::design(settings, sample_rate)?;
        self.apply(&update);
        Ok(())
    }

    /// Install pre-designed coefficients (real-time safe)
    #[inline]
    pub fn apply(&mut self, update: &ChainUpdate) {
        self.update_peak_filter(&update.peak);
        Self::update_cut_filter(&mut self.low_cut, &update.low_cut);
        Self::update_cut_filter(&mut self.high_cut, &update.high_cut);
    }

    fn update_peak_filter(&mut self, update: &PeakUpdate) {
        self.peak.set_coefficients(update.coefficients);
        self.peak.set_bypassed(update.bypassed);
    }

    fn update_cut_filter(bank: &mut CutFilter, update: &CutUpdate) {
        bank.update(&update.coefficients, update.slope);
        bank.set_bypassed(update.bypassed);
    }

    pub fn low_cut(&self) -> &CutFilter {
        &self.low_cut
    }

    pub fn peak(&self) -> &FilterStage {
        &self.peak
    }

    pub fn high_cut(&self) -> &CutFilter {
        &self.high_cut
    }

    pub fn is_bypassed(&self, position: ChainPosition) -> bool {
        match position {
            ChainPosition::LowCut => self.low_cut.is_bypassed(),
            ChainPosition::Peak => self.peak.is_bypassed(),
            ChainPosition::HighCut => self.high_cut.is_bypassed(),
        }
    }

    /// Process one sample through all three sub-chains
    #[inline]
    pub fn process_sample(&mut self, sample: f32) -> f32 {
        let s = self.low_cut.process_sample(sample);
        let s = self.peak.process_sample(s);
        self.high_cut.process_sample(s)
    }

    /// Process a mono block in-place
    ///
    /// # Real-time Safety
    /// No allocations. O(n) where n = block length.
    #[inline]
    pub fn process_block(&mut self, block: &mut [f32]) {
        self.low_cut.process_block(block);
        self.peak.process_block(block);
        self.high_cut.process_block(block);
    }

    /// Magnitude response of the whole chain at `frequency`
    pub fn magnitude_for_frequency(&self, frequency: f64, sample_rate: f64) -> f64 {
        self.low_cut.magnitude_for_frequency(frequency, sample_rate)
            * self.peak.magnitude_for_frequency(frequency, sample_rate)
            * self.high_cut.magnitude_for_frequency(frequency, sample_rate)
    }

    /// Clear delay state (transport reset/flush)
    pub fn reset(&mut self) {
        self.low_cut.reset();
        self.peak.reset();
        self.high_cut.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FS: f32 = 48000.0;

    fn db(chain: &ChannelChain, freq: f64) -> f64 {
        20.0 * chain.magnitude_for_frequency(freq, FS as f64).log10()
    }

    fn sine(freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / FS).sin() * 0.5)
            .collect()
    }

    #[test]
    fn test_default_settings_match_parameter_defaults() {
        let settings = ChainSettings::default();
        assert_eq!(settings.peak_freq, 750.0);
        assert_eq!(settings.peak_q, 1.0);
        assert_eq!(settings.low_cut_freq, 20.0);
        assert_eq!(settings.high_cut_freq, 20000.0);
        assert_eq!(settings.low_cut_slope, Slope::Slope12);
        assert!(!settings.peak_bypassed);
    }

    #[test]
    fn test_default_chain_is_nearly_flat_in_band() {
        let chain = ChannelChain::new(&ChainSettings::default(), FS).unwrap();
        for freq in [200.0, 1000.0, 5000.0] {
            assert!(db(&chain, freq).abs() < 0.5, "{}Hz: {}dB", freq, db(&chain, freq));
        }
    }

    #[test]
    fn test_update_sets_active_section_counts() {
        let mut settings = ChainSettings::default();
        let mut chain = ChannelChain::default();
        for slope in Slope::ALL {
            settings.low_cut_slope = slope;
            settings.high_cut_slope = Slope::from_index(3 - slope.index());
            chain.update_filters(&settings, FS).unwrap();
            assert_eq!(chain.low_cut().active_sections(), slope.index() + 1);
            assert_eq!(chain.high_cut().active_sections(), 4 - slope.index());
        }
    }

    #[test]
    fn test_slope_change_steepens_attenuation() {
        let mut settings = ChainSettings {
            low_cut_freq: 1000.0,
            low_cut_slope: Slope::Slope12,
            ..Default::default()
        };
        let mut chain = ChannelChain::new(&settings, FS).unwrap();
        // Attenuation per octave, measured between 100Hz and 200Hz
        let gentle = db(&chain, 200.0) - db(&chain, 100.0);
        assert!(chain.low_cut().stage(1).unwrap().is_bypassed());

        settings.low_cut_slope = Slope::Slope48;
        chain.update_filters(&settings, FS).unwrap();
        for i in 1..4 {
            assert!(!chain.low_cut().stage(i).unwrap().is_bypassed());
        }
        let steep = db(&chain, 200.0) - db(&chain, 100.0);

        assert!((gentle - 12.0).abs() < 1.0, "12dB/Oct slope measured {}", gentle);
        assert!((steep - 48.0).abs() < 2.0, "48dB/Oct slope measured {}", steep);
        let ratio = steep / gentle;
        assert!((ratio - 4.0).abs() < 0.3, "ratio {}", ratio);
    }

    #[test]
    fn test_bypassed_chain_passes_through() {
        let settings = ChainSettings {
            low_cut_freq: 500.0,
            low_cut_slope: Slope::Slope48,
            high_cut_freq: 2000.0,
            high_cut_slope: Slope::Slope36,
            peak_gain_db: 18.0,
            low_cut_bypassed: true,
            peak_bypassed: true,
            high_cut_bypassed: true,
            ..Default::default()
        };
        let mut chain = ChannelChain::new(&settings, FS).unwrap();
        assert!(chain.is_bypassed(ChainPosition::LowCut));
        assert!(chain.is_bypassed(ChainPosition::Peak));
        assert!(chain.is_bypassed(ChainPosition::HighCut));

        let input = sine(100.0, 1024);
        let mut output = input.clone();
        chain.process_block(&mut output);
        assert_eq!(input, output);
    }

    #[test]
    fn test_bypassing_one_bank_equals_removing_it() {
        let with_bank = ChainSettings {
            high_cut_freq: 2000.0,
            high_cut_slope: Slope::Slope24,
            high_cut_bypassed: true,
            peak_gain_db: 6.0,
            ..Default::default()
        };
        let without_bank = ChainSettings {
            high_cut_freq: 20000.0,
            high_cut_slope: Slope::Slope12,
            high_cut_bypassed: true,
            peak_gain_db: 6.0,
            ..Default::default()
        };

        let mut a = ChannelChain::new(&with_bank, FS).unwrap();
        let mut b = ChannelChain::new(&without_bank, FS).unwrap();
        let mut block_a = sine(5000.0, 512);
        let mut block_b = block_a.clone();
        a.process_block(&mut block_a);
        b.process_block(&mut block_b);
        for (x, y) in block_a.iter().zip(&block_b) {
            assert!((x - y).abs() < 1e-6);
        }
    }

    #[test]
    fn test_peak_boost_in_response() {
        let settings = ChainSettings {
            peak_freq: 1000.0,
            peak_gain_db: 12.0,
            ..Default::default()
        };
        let chain = ChannelChain::new(&settings, FS).unwrap();
        assert!((db(&chain, 1000.0) - 12.0).abs() < 0.2);
    }

    #[test]
    fn test_update_keeps_delay_state() {
        let settings = ChainSettings {
            peak_gain_db: 6.0,
            ..Default::default()
        };
        let mut a = ChannelChain::new(&settings, FS).unwrap();
        let mut b = ChannelChain::new(&settings, FS).unwrap();
        let input = sine(300.0, 256);
        let mut block_a = input.clone();
        let mut block_b = input.clone();
        a.process_block(&mut block_a);
        b.process_block(&mut block_b);

        a.update_filters(&settings, FS).unwrap();
        let mut block_a = input.clone();
        let mut block_b = input;
        a.process_block(&mut block_a);
        b.process_block(&mut block_b);
        assert_eq!(block_a, block_b);
    }

    #[test]
    fn test_process_sample_matches_block() {
        let settings = ChainSettings {
            low_cut_freq: 100.0,
            low_cut_slope: Slope::Slope24,
            peak_gain_db: -6.0,
            high_cut_freq: 8000.0,
            ..Default::default()
        };
        let mut a = ChannelChain::new(&settings, FS).unwrap();
        let mut b = ChannelChain::new(&settings, FS).unwrap();
        let input = sine(440.0, 256);
        let mut block = input.clone();
        b.process_block(&mut block);
        for (x, expected) in input.iter().zip(&block) {
            assert!((a.process_sample(*x) - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_reset_restores_fresh_state() {
        let settings = ChainSettings::default();
        let mut used = ChannelChain::new(&settings, FS).unwrap();
        let mut block = sine(1000.0, 256);
        used.process_block(&mut block);
        used.reset();

        let mut fresh = ChannelChain::new(&settings, FS).unwrap();
        assert_eq!(used.process_sample(0.3), fresh.process_sample(0.3));
    }
}
