//! Engine Error Types

use thiserror::Error;

/// Errors that can occur in the EQ engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Failed to spawn control thread: {0}")]
    ThreadSpawnError(String),

    #[error("Settings I/O error: {0}")]
    SettingsIo(#[from] std::io::Error),

    #[error("Settings format error: {0}")]
    SettingsFormat(#[from] serde_json::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("DSP error: {0}")]
    DspError(#[from] trieq_dsp::DspError),

    #[error("Channel send error - receiver dropped")]
    ChannelSendError,
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::UnknownParameter("Mid Gain".into());
        assert!(err.to_string().contains("Mid Gain"));

        let err = EngineError::ConfigError("Invalid sample rate: 100".into());
        assert!(err.to_string().contains("sample rate"));
    }

    #[test]
    fn test_error_from_dsp() {
        let dsp_err = trieq_dsp::DspError::InvalidFftOrder(10);
        let engine_err: EngineError = dsp_err.into();
        assert!(matches!(engine_err, EngineError::DspError(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let engine_err: EngineError = json_err.into();
        assert!(matches!(engine_err, EngineError::SettingsFormat(_)));
    }
}
