//! Parameter Store
//!
//! The ten host-visible EQ parameters, stored lock-free so that any thread
//! can write them and the control thread can snapshot them once per tick.
//!
//! Every write raises a single dirty flag. The control thread test-and-clears
//! it, so any number of edits between two ticks cost one filter redesign.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use serde::{Deserialize, Serialize};
use tracing::warn;
use trieq_dsp::{ChainSettings, Slope};

use crate::error::{EngineError, EngineResult};

/// Identifies one EQ parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterId {
    LowCutFreq,
    HighCutFreq,
    PeakFreq,
    PeakGain,
    PeakQuality,
    LowCutSlope,
    HighCutSlope,
    LowCutBypassed,
    PeakBypassed,
    HighCutBypassed,
}

/// How a parameter's value is interpreted
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterKind {
    /// Any value in `min..=max`
    Continuous { min: f32, max: f32 },
    /// Index into a list of labels
    Choice(&'static [&'static str]),
    /// 0.0 = off, 1.0 = on
    Toggle,
}

pub const SLOPE_LABELS: [&str; 4] = ["12 db/Oct", "24 db/Oct", "36 db/Oct", "48 db/Oct"];

pub const NUM_PARAMETERS: usize = 10;

impl ParameterId {
    pub const ALL: [ParameterId; NUM_PARAMETERS] = [
        ParameterId::LowCutFreq,
        ParameterId::HighCutFreq,
        ParameterId::PeakFreq,
        ParameterId::PeakGain,
        ParameterId::PeakQuality,
        ParameterId::LowCutSlope,
        ParameterId::HighCutSlope,
        ParameterId::LowCutBypassed,
        ParameterId::PeakBypassed,
        ParameterId::HighCutBypassed,
    ];

    /// Host-visible parameter name
    pub fn name(self) -> &'static str {
        match self {
            ParameterId::LowCutFreq => "LowCut Freq",
            ParameterId::HighCutFreq => "HighCut Freq",
            ParameterId::PeakFreq => "Peak Freq",
            ParameterId::PeakGain => "Peak Gain",
            ParameterId::PeakQuality => "Peak Q",
            ParameterId::LowCutSlope => "LowCut Slope",
            ParameterId::HighCutSlope => "HighCut Slope",
            ParameterId::LowCutBypassed => "LowCut Bypassed",
            ParameterId::PeakBypassed => "Peak Bypassed",
            ParameterId::HighCutBypassed => "HighCut Bypassed",
        }
    }

    /// Resolve a host-visible name
    pub fn from_name(name: &str) -> EngineResult<Self> {
        Self::ALL
            .into_iter()
            .find(|id| id.name() == name)
            .ok_or_else(|| EngineError::UnknownParameter(name.to_string()))
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn kind(self) -> ParameterKind {
        match self {
            ParameterId::LowCutFreq | ParameterId::HighCutFreq | ParameterId::PeakFreq => {
                ParameterKind::Continuous {
                    min: 20.0,
                    max: 20000.0,
                }
            }
            ParameterId::PeakGain => ParameterKind::Continuous {
                min: -24.0,
                max: 24.0,
            },
            ParameterId::PeakQuality => ParameterKind::Continuous { min: 0.1, max: 10.0 },
            ParameterId::LowCutSlope | ParameterId::HighCutSlope => {
                ParameterKind::Choice(&SLOPE_LABELS)
            }
            ParameterId::LowCutBypassed
            | ParameterId::PeakBypassed
            | ParameterId::HighCutBypassed => ParameterKind::Toggle,
        }
    }

    pub fn default_value(self) -> f32 {
        match self {
            ParameterId::LowCutFreq => 20.0,
            ParameterId::HighCutFreq => 20000.0,
            ParameterId::PeakFreq => 750.0,
            ParameterId::PeakGain => 0.0,
            ParameterId::PeakQuality => 1.0,
            ParameterId::LowCutSlope | ParameterId::HighCutSlope => 0.0,
            ParameterId::LowCutBypassed
            | ParameterId::PeakBypassed
            | ParameterId::HighCutBypassed => 0.0,
        }
    }

    /// Bring `value` into this parameter's domain
    ///
    /// Continuous values are clamped, choices rounded to a valid index,
    /// toggles snapped to 0/1. Returns `None` for NaN.
    pub fn sanitize(self, value: f32) -> Option<f32> {
        if value.is_nan() {
            return None;
        }
        Some(match self.kind() {
            ParameterKind::Continuous { min, max } => value.clamp(min, max),
            ParameterKind::Choice(labels) => value.round().clamp(0.0, (labels.len() - 1) as f32),
            ParameterKind::Toggle => {
                if value >= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
        })
    }

    /// Display text for a value, e.g. "750 Hz", "24 db/Oct", "On"
    pub fn display(self, value: f32) -> String {
        match self.kind() {
            ParameterKind::Choice(labels) => {
                let index = self.sanitize(value).unwrap_or(0.0) as usize;
                labels[index].to_string()
            }
            ParameterKind::Toggle => {
                let text = if value >= 0.5 { "On" } else { "Off" };
                text.to_string()
            }
            ParameterKind::Continuous { .. } => match self {
                ParameterId::PeakGain => format!("{:.1} dB", value),
                ParameterId::PeakQuality => format!("{:.2}", value),
                _ if value >= 1000.0 => format!("{:.2} kHz", value / 1000.0),
                _ => format!("{:.0} Hz", value),
            },
        }
    }
}

/// Raw parameter values keyed by host-visible name
///
/// Names instead of positions keep saved state loadable when parameters are
/// added or removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSnapshot {
    values: BTreeMap<String, f32>,
}

impl Default for ParameterSnapshot {
    fn default() -> Self {
        let values = ParameterId::ALL
            .into_iter()
            .map(|id| (id.name().to_string(), id.default_value()))
            .collect();
        Self { values }
    }
}

impl ParameterSnapshot {
    pub fn get(&self, id: ParameterId) -> Option<f32> {
        self.values.get(id.name()).copied()
    }

    pub fn set(&mut self, id: ParameterId, value: f32) {
        self.values.insert(id.name().to_string(), value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Lock-free parameter storage shared between threads
pub struct ParameterStore {
    /// f32 values stored as bits, indexed by `ParameterId::index`
    values: [AtomicU32; NUM_PARAMETERS],
    dirty: AtomicBool,
}

impl ParameterStore {
    /// All parameters at their defaults, dirty flag clear
    pub fn new() -> Self {
        Self {
            values: core::array::from_fn(|i| {
                AtomicU32::new(ParameterId::ALL[i].default_value().to_bits())
            }),
            dirty: AtomicBool::new(false),
        }
    }

    pub fn get(&self, id: ParameterId) -> f32 {
        f32::from_bits(self.values[id.index()].load(Ordering::Relaxed))
    }

    /// Store a sanitized value and raise the dirty flag
    ///
    /// Returns the value actually stored. NaN is ignored and the current
    /// value returned.
    pub fn set(&self, id: ParameterId, value: f32) -> f32 {
        let Some(value) = id.sanitize(value) else {
            return self.get(id);
        };
        self.values[id.index()].store(value.to_bits(), Ordering::Relaxed);
        self.mark_dirty();
        value
    }

    pub fn set_by_name(&self, name: &str, value: f32) -> EngineResult<f32> {
        Ok(self.set(ParameterId::from_name(name)?, value))
    }

    pub fn set_bool(&self, id: ParameterId, on: bool) {
        self.set(id, if on { 1.0 } else { 0.0 });
    }

    pub fn get_bool(&self, id: ParameterId) -> bool {
        self.get(id) >= 0.5
    }

    /// Publishes all preceding value stores to whoever takes the flag
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Test-and-clear: `true` if anything changed since the last call
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    /// Current values as filter settings
    pub fn chain_settings(&self) -> ChainSettings {
        ChainSettings {
            peak_freq: self.get(ParameterId::PeakFreq),
            peak_gain_db: self.get(ParameterId::PeakGain),
            peak_q: self.get(ParameterId::PeakQuality),
            low_cut_freq: self.get(ParameterId::LowCutFreq),
            high_cut_freq: self.get(ParameterId::HighCutFreq),
            low_cut_slope: Slope::from_index(self.get(ParameterId::LowCutSlope) as usize),
            high_cut_slope: Slope::from_index(self.get(ParameterId::HighCutSlope) as usize),
            low_cut_bypassed: self.get_bool(ParameterId::LowCutBypassed),
            peak_bypassed: self.get_bool(ParameterId::PeakBypassed),
            high_cut_bypassed: self.get_bool(ParameterId::HighCutBypassed),
        }
    }

    pub fn snapshot(&self) -> ParameterSnapshot {
        let values = ParameterId::ALL
            .into_iter()
            .map(|id| (id.name().to_string(), self.get(id)))
            .collect();
        ParameterSnapshot { values }
    }

    /// Apply every known value of `snapshot`
    ///
    /// Parameters missing from the snapshot keep their current value;
    /// unknown names are skipped with a warning.
    pub fn restore(&self, snapshot: &ParameterSnapshot) {
        for (name, &value) in &snapshot.values {
            match ParameterId::from_name(name) {
                Ok(id) => {
                    self.set(id, value);
                }
                Err(_) => warn!("Ignoring unknown parameter in saved state: {}", name),
            }
        }
        self.mark_dirty();
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_chain_defaults() {
        let store = ParameterStore::new();
        assert_eq!(store.chain_settings(), ChainSettings::default());
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_names_round_trip() {
        for id in ParameterId::ALL {
            assert_eq!(ParameterId::from_name(id.name()).unwrap(), id);
        }
        assert!(matches!(
            ParameterId::from_name("Mid Gain"),
            Err(EngineError::UnknownParameter(_))
        ));
    }

    #[test]
    fn test_values_are_clamped() {
        let store = ParameterStore::new();
        assert_eq!(store.set(ParameterId::PeakGain, 40.0), 24.0);
        assert_eq!(store.set(ParameterId::PeakQuality, 0.0), 0.1);
        assert_eq!(store.set(ParameterId::LowCutFreq, 5.0), 20.0);
        assert_eq!(store.set(ParameterId::HighCutSlope, 7.0), 3.0);
        assert_eq!(store.set(ParameterId::LowCutSlope, 1.4), 1.0);
        assert_eq!(store.set(ParameterId::PeakBypassed, 0.7), 1.0);

        let before = store.get(ParameterId::PeakFreq);
        assert_eq!(store.set(ParameterId::PeakFreq, f32::NAN), before);
    }

    #[test]
    fn test_dirty_flag_coalesces_edits() {
        let store = ParameterStore::new();
        for gain in [1.0, 2.0, 3.0, 4.0] {
            store.set(ParameterId::PeakGain, gain);
        }
        assert!(store.take_dirty());
        assert!(!store.take_dirty());
        assert_eq!(store.chain_settings().peak_gain_db, 4.0);
    }

    #[test]
    fn test_chain_settings_reflect_edits() {
        let store = ParameterStore::new();
        store.set_by_name("LowCut Slope", 3.0).unwrap();
        store.set_by_name("HighCut Freq", 8000.0).unwrap();
        store.set_bool(ParameterId::PeakBypassed, true);

        let settings = store.chain_settings();
        assert_eq!(settings.low_cut_slope, Slope::Slope48);
        assert_eq!(settings.high_cut_freq, 8000.0);
        assert!(settings.peak_bypassed);
        assert!(!settings.low_cut_bypassed);
        assert!(store.set_by_name("Nope", 1.0).is_err());
    }

    #[test]
    fn test_snapshot_restore() {
        let store = ParameterStore::new();
        store.set(ParameterId::PeakFreq, 2500.0);
        store.set(ParameterId::HighCutSlope, 2.0);
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), NUM_PARAMETERS);

        let other = ParameterStore::new();
        other.restore(&snapshot);
        assert!(other.take_dirty());
        assert_eq!(other.get(ParameterId::PeakFreq), 2500.0);
        assert_eq!(other.chain_settings(), store.chain_settings());
    }

    #[test]
    fn test_restore_partial_and_unknown() {
        let json = r#"{"Peak Gain": -6.0, "Analyzer Enabled": 1.0}"#;
        let snapshot: ParameterSnapshot = serde_json::from_str(json).unwrap();
        let store = ParameterStore::new();
        store.restore(&snapshot);
        assert_eq!(store.get(ParameterId::PeakGain), -6.0);
        assert_eq!(store.get(ParameterId::PeakFreq), 750.0);
    }

    #[test]
    fn test_display_text() {
        assert_eq!(ParameterId::PeakFreq.display(750.0), "750 Hz");
        assert_eq!(ParameterId::HighCutFreq.display(20000.0), "20.00 kHz");
        assert_eq!(ParameterId::PeakGain.display(-3.0), "-3.0 dB");
        assert_eq!(ParameterId::LowCutSlope.display(3.0), "48 db/Oct");
        assert_eq!(ParameterId::PeakBypassed.display(1.0), "On");
    }
}
