//! Message Types for Thread Communication
//!
//! Commands flow from the caller -> control thread
//! Events flow from the control thread -> caller (display collaborator)
//!
//! Parameter edits do not travel as commands; they go straight to the
//! atomic `ParameterStore`.

use serde::{Deserialize, Serialize};
use trieq_dsp::{Channel, FftOrder, Point, Rect};

use crate::analyzer::AnalysisInputs;
use crate::config::EngineConfig;
use crate::params::ParameterSnapshot;

/// Commands sent to the control thread
pub enum Command {
    /// New FIFOs and configuration after `prepare()`
    Prepare(Box<AnalysisInputs>),

    /// Display rectangle the analyzer paths are drawn into
    SetAnalysisBounds(Rect),

    /// Pixel width of the filter response curve
    SetResponseWidth(usize),

    /// Switch the analyzer FFT size
    ChangeFftOrder(FftOrder),

    /// Draw a path point every n bins
    SetPathStride(usize),

    /// Enable/disable spectrum analysis
    SetAnalyzerEnabled(bool),

    /// Request the newest FFT frame of one channel (triggers SpectrumUpdate
    /// if one exists)
    RequestSpectrum(Channel),

    /// Request current state (triggers StateUpdate event)
    RequestState,

    /// Shutdown the control thread
    Shutdown,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Prepare(_) => write!(f, "Prepare"),
            Command::SetAnalysisBounds(rect) => write!(f, "SetAnalysisBounds({:?})", rect),
            Command::SetResponseWidth(width) => write!(f, "SetResponseWidth({})", width),
            Command::ChangeFftOrder(order) => write!(f, "ChangeFftOrder({:?})", order),
            Command::SetPathStride(stride) => write!(f, "SetPathStride({})", stride),
            Command::SetAnalyzerEnabled(on) => write!(f, "SetAnalyzerEnabled({})", on),
            Command::RequestSpectrum(channel) => write!(f, "RequestSpectrum({:?})", channel),
            Command::RequestState => write!(f, "RequestState"),
            Command::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// Events sent from the control thread
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    /// Analysis buffers were (re)allocated for a new configuration
    Prepared(EngineConfig),

    /// Error occurred
    Error { message: String },

    /// Newest analyzer path of one channel
    PathUpdate { channel: Channel, points: Vec<Point> },

    /// Newest FFT frame of one channel, dB per bin
    SpectrumUpdate { channel: Channel, magnitudes_db: Vec<f32> },

    /// Filter response in dB, one value per pixel (log-frequency x axis)
    ResponseCurveUpdate { magnitudes_db: Vec<f64> },

    /// Current state snapshot
    StateUpdate {
        is_prepared: bool,
        analyzer_enabled: bool,
        fft_order: FftOrder,
        parameters: ParameterSnapshot,
    },
}

impl Event {
    /// Create an error event from any error type
    pub fn error<E: std::fmt::Display>(err: E) -> Self {
        Event::Error {
            message: err.to_string(),
        }
    }

    /// Display data where only the newest value matters
    pub fn is_display_frame(&self) -> bool {
        matches!(
            self,
            Event::PathUpdate { .. } | Event::SpectrumUpdate { .. } | Event::ResponseCurveUpdate { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = Event::PathUpdate {
            channel: Channel::Right,
            points: vec![Point { x: 1.0, y: 2.0 }],
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("PathUpdate"));

        let deserialized: Event = serde_json::from_str(&json).unwrap();
        if let Event::PathUpdate { channel, points } = deserialized {
            assert_eq!(channel, Channel::Right);
            assert_eq!(points, vec![Point { x: 1.0, y: 2.0 }]);
        } else {
            panic!("Deserialization produced wrong variant");
        }
    }

    #[test]
    fn test_error_event() {
        let event = Event::error("Test error message");
        if let Event::Error { message } = event {
            assert_eq!(message, "Test error message");
        } else {
            panic!("Should be Error variant");
        }
    }

    #[test]
    fn test_state_update_serialization() {
        let event = Event::StateUpdate {
            is_prepared: true,
            analyzer_enabled: false,
            fft_order: FftOrder::Order2048,
            parameters: ParameterSnapshot::default(),
        };

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: Event = serde_json::from_str(&json).unwrap();

        if let Event::StateUpdate {
            is_prepared,
            fft_order,
            parameters,
            ..
        } = deserialized
        {
            assert!(is_prepared);
            assert_eq!(fft_order, FftOrder::Order2048);
            assert_eq!(parameters, ParameterSnapshot::default());
        } else {
            panic!("Wrong variant");
        }
    }

    #[test]
    fn test_display_frames() {
        assert!(Event::ResponseCurveUpdate { magnitudes_db: vec![] }.is_display_frame());
        assert!(Event::SpectrumUpdate {
            channel: Channel::Left,
            magnitudes_db: vec![]
        }
        .is_display_frame());
        assert!(!Event::error("x").is_display_frame());
        assert!(!Event::Prepared(EngineConfig::default()).is_display_frame());
    }

    #[test]
    fn test_command_debug() {
        assert_eq!(format!("{:?}", Command::SetAnalyzerEnabled(true)), "SetAnalyzerEnabled(true)");
        assert_eq!(format!("{:?}", Command::Shutdown), "Shutdown");
    }
}
