//! Audio-Thread Processor
//!
//! `EqProcessor` is what the host calls once per audio block. Per block it:
//! 1. installs newer coefficients from the exchange, if any were published
//! 2. filters each channel in place
//! 3. feeds each filtered channel into its sample collector
//!
//! # Real-time Safety
//! No allocations, no locks, no logging after construction.

use std::sync::Arc;

use trieq_dsp::{
    ChainUpdate, Channel, ChannelChain, CoefficientReader, FifoConsumer, SharedCoefficients,
    SingleChannelSampleFifo,
};

use crate::config::EngineConfig;
use crate::error::EngineResult;

/// Filters up to two channels and taps them for analysis
pub struct EqProcessor {
    chains: [ChannelChain; 2],
    collectors: [SingleChannelSampleFifo; 2],
    coefficients: CoefficientReader,
    sample_rate: f32,
    channels: usize,
    max_block_size: usize,
    /// Planar scratch for interleaved input, `max_block_size` frames each
    scratch: [Vec<f32>; 2],
}

impl EqProcessor {
    /// Build a processor for `config`, starting from `initial` coefficients
    ///
    /// Returns the processor and the consumer end of each channel's
    /// collector FIFO (one per configured channel). Not real-time safe.
    pub(crate) fn new(
        config: &EngineConfig,
        initial: &ChainUpdate,
        shared: Arc<SharedCoefficients>,
    ) -> EngineResult<(Self, Vec<(Channel, FifoConsumer<Vec<f32>>)>)> {
        let channels = config.channels as usize;
        let mut collectors = Channel::ALL.map(SingleChannelSampleFifo::new);
        let mut consumers = Vec::with_capacity(channels);
        for collector in collectors.iter_mut().take(channels) {
            let consumer = collector.prepare(config.max_block_size, config.analyzer.fifo_capacity)?;
            consumers.push((collector.channel(), consumer));
        }

        let mut chains: [ChannelChain; 2] = Default::default();
        for chain in &mut chains {
            chain.apply(initial);
        }

        let processor = Self {
            chains,
            collectors,
            coefficients: CoefficientReader::new(shared),
            sample_rate: config.sample_rate as f32,
            channels,
            max_block_size: config.max_block_size,
            scratch: [vec![0.0; config.max_block_size], vec![0.0; config.max_block_size]],
        };
        Ok((processor, consumers))
    }

    /// Install the latest published coefficients, if newer than ours
    #[inline]
    fn sync_coefficients(&mut self) {
        if let Some(update) = self.coefficients.poll() {
            for chain in &mut self.chains {
                chain.apply(&update);
            }
        }
    }

    /// Process one mono block in place (left channel only)
    #[inline]
    pub fn process_mono(&mut self, block: &mut [f32]) {
        self.sync_coefficients();
        self.chains[0].process_block(block);
        self.collectors[0].push_samples(block);
    }

    /// Process one planar stereo block in place
    ///
    /// With a mono configuration only `left` is processed.
    #[inline]
    pub fn process_planar(&mut self, left: &mut [f32], right: &mut [f32]) {
        debug_assert_eq!(left.len(), right.len(), "planar channels differ in length");
        if self.channels < 2 {
            self.process_mono(left);
            return;
        }

        self.sync_coefficients();
        self.chains[0].process_block(left);
        self.chains[1].process_block(right);
        self.collectors[0].push_samples(left);
        self.collectors[1].push_samples(right);
    }

    /// Process an interleaved block in place
    ///
    /// Blocks longer than `max_block_size` frames are handled in chunks.
    pub fn process_interleaved(&mut self, buffer: &mut [f32]) {
        let channels = self.channels.max(1);
        if channels == 1 {
            self.process_mono(buffer);
            return;
        }

        let frames_per_chunk = self.max_block_size.max(1);
        for chunk in buffer.chunks_mut(frames_per_chunk * channels) {
            self.sync_coefficients();

            let frames = chunk.len() / channels;
            let [left, right] = &mut self.scratch;
            for (i, frame) in chunk.chunks_exact(channels).enumerate() {
                left[i] = frame[0];
                right[i] = frame[1];
            }

            self.chains[0].process_block(&mut left[..frames]);
            self.chains[1].process_block(&mut right[..frames]);
            self.collectors[0].push_samples(&left[..frames]);
            self.collectors[1].push_samples(&right[..frames]);

            for (i, frame) in chunk.chunks_exact_mut(channels).enumerate() {
                frame[0] = left[i];
                frame[1] = right[i];
            }
        }
    }

    /// Clear filter delay state (transport reset/flush)
    pub fn reset(&mut self) {
        for chain in &mut self.chains {
            chain.reset();
        }
    }

    pub fn chain(&self, channel: Channel) -> &ChannelChain {
        &self.chains[channel.index()]
    }

    /// Sample rate of the prepare session this processor belongs to
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }
}
