//! Control/Display-Thread Analyzer
//!
//! Runs once per control tick (60 Hz by default):
//! - drains each channel's collector FIFO into a sliding mono buffer,
//!   renders FFT frames from it and turns every frame into a display path
//! - when a parameter changed since the last tick, redesigns the filter
//!   coefficients, publishes them to the audio thread and recomputes the
//!   response curve
//!
//! Nothing here is real-time constrained; allocation is fine.

use std::sync::Arc;

use tracing::{debug, info};
use trieq_dsp::{
    fill_response_curve, AnalyzerPath, ChainUpdate, Channel, ChannelChain, CoefficientPublisher,
    FftDataGenerator, FftOrder, FifoConsumer, PathGenerator, Rect,
};

use crate::config::{AnalyzerConfig, EngineConfig};
use crate::error::EngineResult;
use crate::params::{ParameterSnapshot, ParameterStore};

/// Everything the control thread needs from one `EqEngine::prepare` call
pub struct AnalysisInputs {
    pub(crate) config: EngineConfig,
    pub(crate) publisher: CoefficientPublisher,
    pub(crate) blocks: Vec<(Channel, FifoConsumer<Vec<f32>>)>,
}

/// Turns one channel's collected blocks into analyzer paths
pub struct ChannelPathProducer {
    channel: Channel,
    blocks: FifoConsumer<Vec<f32>>,
    incoming: Vec<f32>,
    /// Most recent `fft_size` samples, oldest first
    mono: Vec<f32>,
    /// Samples received since the last reset, capped at `fft_size`
    received: usize,
    fft: FftDataGenerator,
    paths: PathGenerator,
    frame: Vec<f32>,
    latest_frame: Option<Vec<f32>>,
    latest_path: Option<AnalyzerPath>,
    silence_floor_db: f32,
}

impl ChannelPathProducer {
    pub fn new(channel: Channel, blocks: FifoConsumer<Vec<f32>>, config: &AnalyzerConfig) -> Self {
        let fft_size = config.fft_order.size();
        Self {
            channel,
            blocks,
            incoming: Vec::new(),
            mono: vec![0.0; fft_size],
            received: 0,
            fft: FftDataGenerator::with_capacity(config.fft_order, config.fifo_capacity),
            paths: PathGenerator::with_capacity(config.path_stride, config.fifo_capacity),
            frame: Vec::new(),
            latest_frame: None,
            latest_path: None,
            silence_floor_db: config.silence_floor_db,
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Drain collected blocks, render frames and paths
    ///
    /// Returns `true` if a new path became the latest one.
    pub fn process(&mut self, bounds: Rect, sample_rate: f32) -> bool {
        let fft_size = self.fft.fft_size();

        while self.blocks.pull(&mut self.incoming) {
            // Slide the newest samples in at the end of the mono buffer
            let n = self.incoming.len().min(fft_size);
            self.mono.copy_within(n.., 0);
            self.mono[fft_size - n..].copy_from_slice(&self.incoming[self.incoming.len() - n..]);
            self.received = (self.received + n).min(fft_size);

            // Not ready until a full window of real samples has arrived
            if self.received == fft_size {
                self.fft.produce(&self.mono, self.silence_floor_db);
            }
        }

        let bin_width = self.fft.bin_width(sample_rate);
        while self.fft.pull_frame(&mut self.frame) {
            if !bounds.is_empty() {
                self.paths
                    .generate(&self.frame, bounds, fft_size, bin_width, self.silence_floor_db);
            }
            match self.latest_frame.as_mut() {
                Some(latest) => latest.clone_from(&self.frame),
                None => self.latest_frame = Some(self.frame.clone()),
            }
        }

        let latest = self.latest_path.get_or_insert_with(AnalyzerPath::default);
        let pulled = self.paths.pull_latest(latest);
        if !pulled && latest.is_empty() {
            self.latest_path = None;
        }
        pulled
    }

    /// Switch FFT size; restarts the sliding buffer
    pub fn change_order(&mut self, order: FftOrder) {
        self.fft.change_order(order);
        self.mono = vec![0.0; order.size()];
        self.received = 0;
        self.latest_frame = None;
    }

    pub fn set_path_stride(&mut self, stride: usize) {
        self.paths.set_stride(stride);
    }

    pub fn fft_order(&self) -> FftOrder {
        self.fft.order()
    }

    /// Newest rendered path, `None` until the first one exists
    pub fn latest_path(&self) -> Option<&AnalyzerPath> {
        self.latest_path.as_ref()
    }

    /// Newest dB spectrum, `None` until the first frame exists
    pub fn latest_frame(&self) -> Option<&[f32]> {
        self.latest_frame.as_deref()
    }
}

/// What changed during one `Analyzer::tick`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Indexed by `Channel::index`
    pub paths_updated: [bool; 2],
    pub response_updated: bool,
}

/// State tied to one prepare session
struct Session {
    sample_rate: f32,
    publisher: CoefficientPublisher,
    producers: Vec<ChannelPathProducer>,
}

/// Control-thread half of the engine
pub struct Analyzer {
    params: Arc<ParameterStore>,
    config: AnalyzerConfig,
    session: Option<Session>,
    bounds: Rect,
    /// Mirrors the audio chains; used only for the response curve
    mono_chain: ChannelChain,
    response_width: usize,
    response: Vec<f64>,
}

impl Analyzer {
    pub fn new(params: Arc<ParameterStore>, config: AnalyzerConfig) -> Self {
        Self {
            params,
            config,
            session: None,
            bounds: Rect::default(),
            mono_chain: ChannelChain::default(),
            response_width: 0,
            response: Vec::new(),
        }
    }

    /// Start a new session with freshly allocated FIFOs
    ///
    /// Republishes the current parameters at the session's sample rate.
    pub fn prepare(&mut self, inputs: AnalysisInputs) -> EngineResult<()> {
        let AnalysisInputs {
            config,
            publisher,
            blocks,
        } = inputs;

        self.config = config.analyzer.clone();
        let producers = blocks
            .into_iter()
            .map(|(channel, consumer)| ChannelPathProducer::new(channel, consumer, &self.config))
            .collect();

        self.session = Some(Session {
            sample_rate: config.sample_rate as f32,
            publisher,
            producers,
        });
        info!(
            "Analyzer prepared: {}Hz, {} channel(s), FFT {}",
            config.sample_rate,
            config.channels,
            self.config.fft_order.size()
        );

        self.params.take_dirty();
        self.update_chain()
    }

    pub fn is_prepared(&self) -> bool {
        self.session.is_some()
    }

    /// One control tick
    pub fn tick(&mut self) -> EngineResult<TickReport> {
        let mut report = TickReport::default();
        if self.session.is_none() {
            return Ok(report);
        }

        if self.config.enabled {
            let bounds = self.bounds;
            if let Some(session) = self.session.as_mut() {
                for producer in &mut session.producers {
                    if producer.process(bounds, session.sample_rate) {
                        report.paths_updated[producer.channel().index()] = true;
                    }
                }
            }
        }

        if self.params.take_dirty() {
            self.update_chain()?;
            report.response_updated = self.response_width > 0;
        }

        Ok(report)
    }

    /// Redesign, publish and mirror the current parameter set
    fn update_chain(&mut self) -> EngineResult<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        let settings = self.params.chain_settings();
        let update = ChainUpdate::design(&settings, session.sample_rate)?;
        session.publisher.publish(&update);
        self.mono_chain.apply(&update);
        debug!("Published filter update: {:?}", settings);

        self.recompute_response();
        Ok(())
    }

    fn recompute_response(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        fill_response_curve(
            &self.mono_chain,
            self.response_width,
            session.sample_rate as f64,
            &mut self.response,
        );
    }

    pub fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Change the response curve's pixel width and recompute it
    pub fn set_response_width(&mut self, width: usize) {
        self.response_width = width;
        self.recompute_response();
    }

    pub fn response_curve(&self) -> &[f64] {
        &self.response
    }

    pub fn change_order(&mut self, order: FftOrder) {
        self.config.fft_order = order;
        if let Some(session) = self.session.as_mut() {
            for producer in &mut session.producers {
                producer.change_order(order);
            }
        }
    }

    pub fn set_path_stride(&mut self, stride: usize) {
        self.config.path_stride = stride.max(1);
        if let Some(session) = self.session.as_mut() {
            for producer in &mut session.producers {
                producer.set_path_stride(stride);
            }
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn parameters(&self) -> ParameterSnapshot {
        self.params.snapshot()
    }

    pub fn producer(&self, channel: Channel) -> Option<&ChannelPathProducer> {
        self.session
            .as_ref()?
            .producers
            .iter()
            .find(|p| p.channel() == channel)
    }

    pub fn latest_path(&self, channel: Channel) -> Option<&AnalyzerPath> {
        self.producer(channel)?.latest_path()
    }

    pub fn latest_frame(&self, channel: Channel) -> Option<&[f32]> {
        self.producer(channel)?.latest_frame()
    }
}
