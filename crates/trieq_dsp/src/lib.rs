//! TriEQ DSP - Digital Signal Processing Module
//!
//! This crate provides the signal path of the TriEQ three-band equalizer:
//! - LowCut / Peak / HighCut filter chain built from BiQuad sections
//! - Butterworth cut filters with 12/24/36/48 dB/Oct slopes
//! - Lock-free coefficient exchange between control and audio threads
//! - Snapshot FIFOs, per-channel sample collection and FFT analysis
//! - Analyzer path and filter response curve generation
//!
//! # Architecture
//!
//! The audio path follows a strict "no allocation in audio callback" rule.
//! Coefficients are designed off the audio thread and installed between
//! blocks; analysis data leaves the audio thread only through FIFOs that
//! drop when full.

mod chain;
mod collector;
mod cut;
mod design;
mod error;
mod exchange;
mod fft;
mod fifo;
mod path;
mod response;
mod stage;

pub use chain::{ChainPosition, ChainSettings, ChainUpdate, ChannelChain, CutUpdate, PeakUpdate};
pub use collector::{Channel, SingleChannelSampleFifo};
pub use cut::{CutFilter, Slope};
pub use design::{
    butterworth, butterworth_q_values, db_to_gain, gain_to_db, magnitude_for_frequency,
    make_high_cut_filter, make_low_cut_filter, make_peak_filter, passthrough, peak_filter, CutKind,
    MAX_CUT_SECTIONS,
};
pub use error::DspError;
pub use exchange::{CoefficientPublisher, CoefficientReader, SharedCoefficients};
pub use fft::{blackman_harris, FftDataGenerator, FftOrder};
pub use fifo::{fifo, FifoConsumer, FifoProducer, FIFO_CAPACITY};
pub use path::{
    jmap, map_from_log10, map_to_log10, AnalyzerPath, PathGenerator, Point, Rect,
    DEFAULT_PATH_STRIDE, MAX_DISPLAY_FREQ, MIN_DISPLAY_FREQ,
};
pub use response::{fill_response_curve, pixel_frequency, response_curve};
pub use stage::FilterStage;

/// Re-exported so callers can name coefficient sets without depending on
/// `biquad` directly
pub use biquad::Coefficients;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_exports() {
        // Verify all public types are accessible
        let settings = ChainSettings::default();
        let _chain = ChannelChain::new(&settings, 48000.0).unwrap();
        let _generator = FftDataGenerator::new(FftOrder::default());
        let _paths = PathGenerator::new(DEFAULT_PATH_STRIDE);
    }
}
