//! Per-Channel Sample Collector
//!
//! Accumulates the samples of one channel into fixed-length blocks and hands
//! each completed block to the analysis thread through a snapshot FIFO.
//! Runs on the audio thread.

use serde::{Deserialize, Serialize};

use crate::error::DspError;
use crate::fifo::{fifo, FifoConsumer, FifoProducer};

/// Audio channel selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Left,
    Right,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Left, Channel::Right];

    /// Index into a planar channel list
    pub fn index(self) -> usize {
        match self {
            Channel::Left => 0,
            Channel::Right => 1,
        }
    }
}

/// Buffers allocated by `prepare()`
struct Accumulator {
    block: Vec<f32>,
    fill: usize,
    producer: FifoProducer<Vec<f32>>,
}

/// Collects one channel into blocks of a fixed length
pub struct SingleChannelSampleFifo {
    channel: Channel,
    accumulator: Option<Accumulator>,
}

impl SingleChannelSampleFifo {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            accumulator: None,
        }
    }

    /// Fix the block length, allocate the accumulator and a fresh FIFO
    ///
    /// Returns the consumer end of the new FIFO; any blocks queued in a
    /// previous FIFO are discarded with it. Not real-time safe.
    pub fn prepare(&mut self, block_size: usize, capacity: usize) -> Result<FifoConsumer<Vec<f32>>, DspError> {
        if block_size == 0 {
            return Err(DspError::InvalidBlockSize(block_size));
        }
        let (producer, consumer) = fifo(capacity, vec![0.0; block_size]);
        self.accumulator = Some(Accumulator {
            block: vec![0.0; block_size],
            fill: 0,
            producer,
        });
        Ok(consumer)
    }

    /// Append this collector's channel from a planar block
    ///
    /// Channels beyond the ones present are ignored.
    #[inline]
    pub fn update(&mut self, channels: &[&[f32]]) {
        debug_assert!(
            channels.len() > self.channel.index(),
            "block has no {:?} channel",
            self.channel
        );
        if let Some(samples) = channels.get(self.channel.index()) {
            self.push_samples(samples);
        }
    }

    /// Append samples of this collector's channel
    ///
    /// Every time the accumulator reaches the block length it is pushed as
    /// one snapshot (dropped if the FIFO is full) and restarted; the
    /// remainder carries over to the next call.
    ///
    /// # Real-time Safety
    /// No allocations, no locks. Calling before `prepare()` is a contract
    /// violation: asserted in debug builds, ignored in release builds.
    #[inline]
    pub fn push_samples(&mut self, mut samples: &[f32]) {
        debug_assert!(self.accumulator.is_some(), "collector used before prepare()");
        let Some(acc) = self.accumulator.as_mut() else {
            return;
        };

        while !samples.is_empty() {
            let space = acc.block.len() - acc.fill;
            let n = space.min(samples.len());
            acc.block[acc.fill..acc.fill + n].copy_from_slice(&samples[..n]);
            acc.fill += n;
            samples = &samples[n..];

            if acc.fill == acc.block.len() {
                // Drop-on-full: freshness over completeness
                let _ = acc.producer.push(&acc.block);
                acc.fill = 0;
            }
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn is_prepared(&self) -> bool {
        self.accumulator.is_some()
    }

    /// Block length, 0 before `prepare()`
    pub fn size(&self) -> usize {
        self.accumulator.as_ref().map_or(0, |acc| acc.block.len())
    }

    /// Samples waiting in the accumulator for the current block
    pub fn pending(&self) -> usize {
        self.accumulator.as_ref().map_or(0, |acc| acc.fill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fifo::FIFO_CAPACITY;

    const FFT_SIZE: usize = 2048;

    #[test]
    fn test_unprepared_state() {
        let collector = SingleChannelSampleFifo::new(Channel::Right);
        assert!(!collector.is_prepared());
        assert_eq!(collector.size(), 0);
        assert_eq!(collector.channel(), Channel::Right);
    }

    #[test]
    fn test_zero_block_size_rejected() {
        let mut collector = SingleChannelSampleFifo::new(Channel::Left);
        assert!(collector.prepare(0, FIFO_CAPACITY).is_err());
        assert!(!collector.is_prepared());
    }

    #[test]
    fn test_exact_block_one_sample_at_a_time() {
        let mut collector = SingleChannelSampleFifo::new(Channel::Left);
        let mut rx = collector.prepare(FFT_SIZE, FIFO_CAPACITY).unwrap();

        for i in 0..FFT_SIZE - 1 {
            collector.push_samples(&[i as f32]);
        }
        assert_eq!(rx.available_for_reading(), 0);

        collector.push_samples(&[(FFT_SIZE - 1) as f32]);
        assert_eq!(rx.available_for_reading(), 1);
        assert_eq!(collector.pending(), 0);

        let mut block = Vec::new();
        assert!(rx.pull(&mut block));
        assert_eq!(block.len(), FFT_SIZE);
        assert_eq!(block[0], 0.0);
        assert_eq!(block[FFT_SIZE - 1], (FFT_SIZE - 1) as f32);
    }

    #[test]
    fn test_remainder_carries_over() {
        let mut collector = SingleChannelSampleFifo::new(Channel::Left);
        let mut rx = collector.prepare(100, FIFO_CAPACITY).unwrap();

        // 3 x 64 = 192 samples: one full block plus 92 pending
        let input: Vec<f32> = (0..192).map(|i| i as f32).collect();
        for chunk in input.chunks(64) {
            collector.push_samples(chunk);
        }
        assert_eq!(rx.available_for_reading(), 1);
        assert_eq!(collector.pending(), 92);

        collector.push_samples(&input[..8]);
        assert_eq!(rx.available_for_reading(), 2);

        let mut block = Vec::new();
        rx.pull(&mut block);
        assert_eq!(block, input[..100].to_vec());
        rx.pull(&mut block);
        assert_eq!(block[..92], input[100..]);
        assert_eq!(block[92..], input[..8]);
    }

    #[test]
    fn test_selects_designated_channel() {
        let mut collector = SingleChannelSampleFifo::new(Channel::Right);
        let mut rx = collector.prepare(4, FIFO_CAPACITY).unwrap();

        let left = [1.0, 1.0, 1.0, 1.0];
        let right = [2.0, 3.0, 4.0, 5.0];
        collector.update(&[&left, &right]);

        let mut block = Vec::new();
        assert!(rx.pull(&mut block));
        assert_eq!(block, right.to_vec());
    }

    #[test]
    fn test_full_fifo_drops_blocks() {
        let mut collector = SingleChannelSampleFifo::new(Channel::Left);
        let mut rx = collector.prepare(2, 3).unwrap();

        collector.push_samples(&[0.0; 10]);
        assert_eq!(rx.available_for_reading(), 3);

        let mut block = Vec::new();
        let mut count = 0;
        while rx.pull(&mut block) {
            count += 1;
        }
        assert_eq!(count, 3);
    }

    #[test]
    fn test_prepare_discards_old_fifo() {
        let mut collector = SingleChannelSampleFifo::new(Channel::Left);
        let mut old_rx = collector.prepare(4, FIFO_CAPACITY).unwrap();
        collector.push_samples(&[0.0; 6]);
        assert_eq!(old_rx.available_for_reading(), 1);

        let new_rx = collector.prepare(8, FIFO_CAPACITY).unwrap();
        assert_eq!(collector.size(), 8);
        assert_eq!(collector.pending(), 0);
        assert_eq!(new_rx.available_for_reading(), 0);

        let mut block = Vec::new();
        assert!(old_rx.pull(&mut block));
    }
}
