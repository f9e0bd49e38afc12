//! TriEQ Core - EQ Engine
//!
//! This crate ties the TriEQ signal path together:
//! - The ten host-visible parameters, stored lock-free with a dirty flag
//! - The audio-thread processor (filter chains and analysis taps)
//! - The control thread that redesigns filters and renders analyzer paths
//! - Persistent settings
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Caller / Display                        │
//! │  set_parameter ──▶ ParameterStore     Engine ◀──events──    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ dirty flag + crossbeam-channel
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Control Thread (60 Hz)                     │
//! │   design ──seqlock──▶ audio      FIFOs ──▶ FFT ──▶ paths    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Audio Thread                           │
//! │   EqProcessor: chains ──▶ collectors ──rtrb──▶ control      │
//! │              (Zero allocation in this path)                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod analyzer;
mod config;
mod engine;
mod error;
mod message;
mod params;
mod processor;
mod settings;

pub use analyzer::{AnalysisInputs, Analyzer, ChannelPathProducer, TickReport};
pub use config::{AnalyzerConfig, EngineConfig};
pub use engine::EqEngine;
pub use error::{EngineError, EngineResult};
pub use message::{Command, Event};
pub use params::{
    ParameterId, ParameterKind, ParameterSnapshot, ParameterStore, NUM_PARAMETERS, SLOPE_LABELS,
};
pub use processor::EqProcessor;
pub use settings::EqSettings;

// Re-export DSP types for convenience
pub use trieq_dsp::{
    ChainSettings, Channel, FftOrder, Point, Rect, Slope,
};
