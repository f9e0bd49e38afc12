//! Cut Filter Bank
//!
//! Four biquad stages in series. The slope selects how many of them are
//! active; the rest are bypassed (passed through, never muted).

use biquad::Coefficients;
use serde::{Deserialize, Serialize};

use crate::design::MAX_CUT_SECTIONS;
use crate::stage::FilterStage;

/// Cut filter steepness; each step adds one 2nd-order section (12 dB/Oct)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Slope {
    #[default]
    Slope12,
    Slope24,
    Slope36,
    Slope48,
}

impl Slope {
    pub const ALL: [Slope; 4] = [Slope::Slope12, Slope::Slope24, Slope::Slope36, Slope::Slope48];

    /// Ordinal 0..=3
    pub fn index(self) -> usize {
        self as usize
    }

    /// Slope for a choice index; out-of-range indices saturate to the nearest end
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index.min(Self::ALL.len() - 1)]
    }

    /// Number of cascaded sections this slope enables (1..=4)
    pub fn active_sections(self) -> usize {
        self.index() + 1
    }

    /// Butterworth filter order: 2 x active sections
    pub fn order(self) -> usize {
        2 * self.active_sections()
    }

    pub fn db_per_octave(self) -> u32 {
        12 * self.active_sections() as u32
    }

    /// Display label used by the parameter layout ("12 db/Oct" ...)
    pub fn label(self) -> &'static str {
        match self {
            Slope::Slope12 => "12 db/Oct",
            Slope::Slope24 => "24 db/Oct",
            Slope::Slope36 => "36 db/Oct",
            Slope::Slope48 => "48 db/Oct",
        }
    }
}

/// A bank of up to four cascaded sections with a runtime-selected slope
#[derive(Debug, Clone)]
pub struct CutFilter {
    stages: [FilterStage; MAX_CUT_SECTIONS],
    /// Bank-level bypass, overrides the per-stage state
    bypassed: bool,
}

impl Default for CutFilter {
    fn default() -> Self {
        Self {
            stages: core::array::from_fn(|_| FilterStage::default()),
            bypassed: false,
        }
    }
}

impl CutFilter {
    /// Install freshly designed sections for `slope`
    ///
    /// Sections `0..=slope` receive `coefficients[i]` and are enabled, the
    /// remaining sections are bypassed. Delay state is kept.
    pub fn update(&mut self, coefficients: &[Coefficients<f32>], slope: Slope) {
        let active = slope.active_sections().min(coefficients.len());
        debug_assert_eq!(active, slope.active_sections(), "not enough sections designed for slope");

        for (stage, coeffs) in self.stages[..active].iter_mut().zip(coefficients) {
            stage.set_coefficients(*coeffs);
            stage.set_bypassed(false);
        }
        for stage in &mut self.stages[active..] {
            stage.set_bypassed(true);
        }
    }

    pub fn set_bypassed(&mut self, bypassed: bool) {
        self.bypassed = bypassed;
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    /// Number of sections currently enabled (ignores the bank bypass flag)
    pub fn active_sections(&self) -> usize {
        self.stages.iter().filter(|s| !s.is_bypassed()).count()
    }

    pub fn stage(&self, index: usize) -> Option<&FilterStage> {
        self.stages.get(index)
    }

    pub fn stages(&self) -> &[FilterStage; MAX_CUT_SECTIONS] {
        &self.stages
    }

    #[inline]
    pub fn process_sample(&mut self, sample: f32) -> f32 {
        if self.bypassed {
            return sample;
        }
        self.stages
            .iter_mut()
            .fold(sample, |s, stage| stage.process_sample(s))
    }

    #[inline]
    pub fn process_block(&mut self, block: &mut [f32]) {
        if self.bypassed {
            return;
        }
        for stage in &mut self.stages {
            stage.process_block(block);
        }
    }

    /// Combined magnitude of the enabled sections at `frequency`
    pub fn magnitude_for_frequency(&self, frequency: f64, sample_rate: f64) -> f64 {
        if self.bypassed {
            return 1.0;
        }
        self.stages
            .iter()
            .map(|s| s.magnitude_for_frequency(frequency, sample_rate))
            .product()
    }

    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
    }
}
