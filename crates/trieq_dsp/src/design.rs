//! Coefficient Designer
//!
//! Pure functions turning human parameters (frequency, gain, Q, order) into
//! biquad coefficient sets. Based on the RBJ (Robert Bristow-Johnson) Audio EQ
//! Cookbook, with high-order Butterworth cut filters decomposed into cascaded
//! 2nd-order sections.

use std::f64::consts::PI;

use biquad::{Coefficients, ToHertz, Type};
use rustfft::num_complex::Complex;

use crate::chain::ChainSettings;
use crate::error::DspError;

/// Maximum number of cascaded sections in a cut filter (48 dB/Oct)
pub const MAX_CUT_SECTIONS: usize = 4;

/// Lowest frequency the designer will accept before clamping
const MIN_FREQUENCY: f32 = 1.0;

/// Keep clamped frequencies strictly below Nyquist
const NYQUIST_MARGIN: f32 = 0.499;

/// Smallest usable Q (biquad rejects negative Q, zero Q divides by zero)
const MIN_Q: f32 = 0.01;

/// Which side of the spectrum a cut filter removes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutKind {
    /// High-pass: removes content below the cutoff
    LowCut,
    /// Low-pass: removes content above the cutoff
    HighCut,
}

/// Convert dB gain to linear amplitude
/// Formula: amplitude = 10^(dB/20)
pub fn db_to_gain(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to dB, never going below `floor_db`
///
/// Zero, negative and NaN gains map to the floor.
pub fn gain_to_db(gain: f32, floor_db: f32) -> f32 {
    if gain > 0.0 {
        (20.0 * gain.log10()).max(floor_db)
    } else {
        floor_db
    }
}

/// Coefficients of a section that passes audio through untouched
pub fn passthrough() -> Coefficients<f32> {
    Coefficients {
        a1: 0.0,
        a2: 0.0,
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
    }
}

fn validate_sample_rate(sample_rate: f32) -> Result<(), DspError> {
    if sample_rate.is_finite() && sample_rate > 0.0 {
        Ok(())
    } else {
        Err(DspError::InvalidSampleRate(sample_rate))
    }
}

/// Clamp a design frequency into (0, Nyquist)
fn clamp_frequency(frequency: f32, sample_rate: f32) -> Result<f32, DspError> {
    if !frequency.is_finite() {
        return Err(DspError::InvalidCoefficients {
            frequency,
            sample_rate,
        });
    }
    let max = sample_rate * NYQUIST_MARGIN;
    if max <= MIN_FREQUENCY {
        return Err(DspError::InvalidSampleRate(sample_rate));
    }
    Ok(frequency.clamp(MIN_FREQUENCY, max))
}

fn design(
    filter: Type<f32>,
    frequency: f32,
    sample_rate: f32,
    q: f32,
) -> Result<Coefficients<f32>, DspError> {
    validate_sample_rate(sample_rate)?;
    let f0 = clamp_frequency(frequency, sample_rate)?;
    let q = if q.is_finite() { q.max(MIN_Q) } else { MIN_Q };

    Coefficients::<f32>::from_params(filter, sample_rate.hz(), f0.hz(), q).map_err(|_| {
        DspError::InvalidCoefficients {
            frequency,
            sample_rate,
        }
    })
}

/// Design a single bell/peak section
///
/// `gain_db` is the boost/cut at the center frequency; the cookbook's
/// amplitude term is derived from it (A = 10^(dB/40), i.e. the square root of
/// the linear gain 10^(dB/20)).
pub fn peak_filter(
    frequency: f32,
    q: f32,
    gain_db: f32,
    sample_rate: f32,
) -> Result<Coefficients<f32>, DspError> {
    let gain_db = if gain_db.is_finite() { gain_db } else { 0.0 };
    design(Type::PeakingEQ(gain_db), frequency, sample_rate, q)
}

/// Q of each section of an even-order Butterworth filter, section 0 first
///
/// Section `k` of an order-`n` filter: Q = 1 / (2 cos((2k + 1) π / 2n))
pub fn butterworth_q_values(order: usize) -> Result<Vec<f32>, DspError> {
    if order < 2 || order % 2 != 0 || order > 2 * MAX_CUT_SECTIONS {
        return Err(DspError::InvalidFilterOrder(order));
    }
    Ok((0..order / 2)
        .map(|k| {
            let angle = (2 * k + 1) as f64 * PI / (2 * order) as f64;
            (1.0 / (2.0 * angle.cos())) as f32
        })
        .collect())
}

/// Design an even-order Butterworth high-pass or low-pass filter as cascaded
/// 2nd-order sections (`order / 2` of them, section 0 first)
pub fn butterworth(
    kind: CutKind,
    frequency: f32,
    sample_rate: f32,
    order: usize,
) -> Result<Vec<Coefficients<f32>>, DspError> {
    let filter_type = match kind {
        CutKind::LowCut => Type::HighPass,
        CutKind::HighCut => Type::LowPass,
    };

    butterworth_q_values(order)?
        .into_iter()
        .map(|q| design(filter_type, frequency, sample_rate, q))
        .collect()
}

/// Peak section for the given settings
pub fn make_peak_filter(
    settings: &ChainSettings,
    sample_rate: f32,
) -> Result<Coefficients<f32>, DspError> {
    peak_filter(
        settings.peak_freq,
        settings.peak_q,
        settings.peak_gain_db,
        sample_rate,
    )
}

/// Low-cut sections for the given settings (one per active slope step)
pub fn make_low_cut_filter(
    settings: &ChainSettings,
    sample_rate: f32,
) -> Result<Vec<Coefficients<f32>>, DspError> {
    butterworth(
        CutKind::LowCut,
        settings.low_cut_freq,
        sample_rate,
        settings.low_cut_slope.order(),
    )
}

/// High-cut sections for the given settings (one per active slope step)
pub fn make_high_cut_filter(
    settings: &ChainSettings,
    sample_rate: f32,
) -> Result<Vec<Coefficients<f32>>, DspError> {
    butterworth(
        CutKind::HighCut,
        settings.high_cut_freq,
        sample_rate,
        settings.high_cut_slope.order(),
    )
}

/// Magnitude of a section's transfer function at `frequency`
///
/// Evaluates |H(e^jw)| for H(z) = (b0 + b1 z^-1 + b2 z^-2) / (1 + a1 z^-1 + a2 z^-2).
pub fn magnitude_for_frequency(
    coeffs: &Coefficients<f32>,
    frequency: f64,
    sample_rate: f64,
) -> f64 {
    let w = 2.0 * PI * frequency / sample_rate;
    let z1 = Complex::from_polar(1.0, -w);
    let z2 = z1 * z1;

    let numerator = Complex::new(coeffs.b0 as f64, 0.0) + z1 * coeffs.b1 as f64 + z2 * coeffs.b2 as f64;
    let denominator = Complex::new(1.0, 0.0) + z1 * coeffs.a1 as f64 + z2 * coeffs.a2 as f64;

    (numerator / denominator).norm()
}
