//! Engine and Analyzer Configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use trieq_dsp::{FftOrder, DEFAULT_PATH_STRIDE, FIFO_CAPACITY};

/// Spectrum analyzer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// FFT size used for the analyzer display
    pub fft_order: FftOrder,

    /// Level drawn at the bottom of the display; quieter bins clamp to it
    pub silence_floor_db: f32,

    /// Draw a path point every `path_stride` bins
    pub path_stride: usize,

    /// Snapshots each analysis FIFO can hold before dropping
    pub fifo_capacity: usize,

    /// Whether the control thread renders spectra at all
    pub enabled: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            fft_order: FftOrder::Order8192,
            silence_floor_db: -48.0,
            path_stride: DEFAULT_PATH_STRIDE,
            fifo_capacity: FIFO_CAPACITY,
            enabled: true,
        }
    }
}

impl AnalyzerConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(self.silence_floor_db.is_finite() && self.silence_floor_db < 0.0) {
            return Err(format!("Invalid silence floor: {}dB", self.silence_floor_db));
        }
        if self.path_stride == 0 {
            return Err("Path stride must be at least 1".to_string());
        }
        if self.fifo_capacity == 0 {
            return Err("FIFO capacity must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Overall engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Sample rate in Hz (e.g., 44100, 48000, 96000)
    pub sample_rate: u32,

    /// Largest block the host will pass to the processor, in frames
    pub max_block_size: usize,

    /// Number of audio channels (1 = mono, 2 = stereo)
    pub channels: u16,

    /// Spectrum analyzer settings
    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    /// Control/display tick rate in Hz
    pub control_tick_hz: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 2,
            max_block_size: 512,
            analyzer: AnalyzerConfig::default(),
            control_tick_hz: 60,
        }
    }
}

impl EngineConfig {
    /// Create config optimized for low latency
    pub fn low_latency() -> Self {
        Self {
            max_block_size: 64, // ~1.3ms at 48kHz
            analyzer: AnalyzerConfig {
                fft_order: FftOrder::Order2048,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Create config optimized for analyzer detail
    pub fn high_resolution() -> Self {
        Self {
            sample_rate: 96000,
            max_block_size: 1024,
            analyzer: AnalyzerConfig {
                fft_order: FftOrder::Order8192,
                path_stride: 1,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Latency of one full block in milliseconds
    pub fn latency_ms(&self) -> f32 {
        (self.max_block_size as f32 / self.sample_rate as f32) * 1000.0
    }

    /// Period of the control thread's tick
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.control_tick_hz.max(1) as f64)
    }

    /// Hz covered by one analyzer bin
    pub fn bin_width(&self) -> f32 {
        self.sample_rate as f32 / self.analyzer.fft_order.size() as f32
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate < 8000 || self.sample_rate > 384000 {
            return Err(format!("Invalid sample rate: {}", self.sample_rate));
        }
        if self.channels == 0 || self.channels > 2 {
            return Err(format!("Invalid channel count: {}", self.channels));
        }
        if self.max_block_size == 0 || self.max_block_size > 16384 {
            return Err(format!("Invalid block size: {}", self.max_block_size));
        }
        if self.control_tick_hz == 0 {
            return Err("Control tick rate must be at least 1Hz".to_string());
        }
        self.analyzer.validate()
    }
}
