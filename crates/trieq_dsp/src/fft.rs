//! Spectral Frame Generator
//!
//! Turns the most recent `fft_size` samples of a channel into a decibel
//! magnitude spectrum for the analyzer display. Runs on the control thread:
//! it may allocate (on order change) but never blocks.
//!
//! # Pipeline
//!
//! 1. copy the last `fft_size` samples
//! 2. apply a Blackman-Harris window (normalized so its sum equals `fft_size`)
//! 3. forward FFT, keep the magnitudes of the first `fft_size / 2` bins
//! 4. divide each magnitude by the bin count (full-scale sine ≈ 0 dB)
//! 5. convert to dB, clamped below at the silence floor
//! 6. push the frame into the generator's FIFO

use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::{Deserialize, Serialize};

use crate::design::gain_to_db;
use crate::error::DspError;
use crate::fifo::{fifo, FifoConsumer, FifoProducer, FIFO_CAPACITY};

/// Supported FFT sizes, as powers of two
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FftOrder {
    /// 2048 points
    Order2048,
    /// 4096 points
    Order4096,
    /// 8192 points
    #[default]
    Order8192,
}

impl FftOrder {
    pub const ALL: [FftOrder; 3] = [FftOrder::Order2048, FftOrder::Order4096, FftOrder::Order8192];

    /// Base-2 exponent of the FFT size
    pub fn exponent(self) -> u32 {
        match self {
            FftOrder::Order2048 => 11,
            FftOrder::Order4096 => 12,
            FftOrder::Order8192 => 13,
        }
    }

    /// Number of samples per frame
    pub fn size(self) -> usize {
        1 << self.exponent()
    }

    /// Number of magnitude bins per frame
    pub fn num_bins(self) -> usize {
        self.size() / 2
    }
}

impl TryFrom<u32> for FftOrder {
    type Error = DspError;

    fn try_from(exponent: u32) -> Result<Self, Self::Error> {
        match exponent {
            11 => Ok(FftOrder::Order2048),
            12 => Ok(FftOrder::Order4096),
            13 => Ok(FftOrder::Order8192),
            other => Err(DspError::InvalidFftOrder(other)),
        }
    }
}

/// Blackman-Harris window of `size` points, scaled so the coefficients sum
/// to `size`
pub fn blackman_harris(size: usize) -> Vec<f32> {
    if size < 2 {
        return vec![1.0; size];
    }
    let span = (size - 1) as f32;
    let mut window: Vec<f32> = (0..size)
        .map(|i| {
            let phase = 2.0 * PI * i as f32 / span;
            0.35875 - 0.48829 * phase.cos() + 0.14128 * (2.0 * phase).cos()
                - 0.01168 * (3.0 * phase).cos()
        })
        .collect();

    let sum: f32 = window.iter().sum();
    if sum > 0.0 {
        let scale = size as f32 / sum;
        window.iter_mut().for_each(|w| *w *= scale);
    }
    window
}

/// Renders dB spectra and queues them for the path generator
pub struct FftDataGenerator {
    order: FftOrder,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    frame: Vec<f32>,
    capacity: usize,
    producer: FifoProducer<Vec<f32>>,
    consumer: FifoConsumer<Vec<f32>>,
}

impl FftDataGenerator {
    pub fn new(order: FftOrder) -> Self {
        Self::with_capacity(order, FIFO_CAPACITY)
    }

    /// Create a generator whose frame FIFO holds `capacity` frames
    pub fn with_capacity(order: FftOrder, capacity: usize) -> Self {
        let size = order.size();
        let (fft, scratch) = plan(size);
        let (producer, consumer) = fifo(capacity, vec![0.0; order.num_bins()]);
        Self {
            order,
            fft,
            window: blackman_harris(size),
            buffer: vec![Complex::new(0.0, 0.0); size],
            scratch,
            frame: vec![0.0; order.num_bins()],
            capacity,
            producer,
            consumer,
        }
    }

    /// Re-create window, transform and FIFO for a new size
    ///
    /// Frames of the previous size still queued are discarded.
    pub fn change_order(&mut self, order: FftOrder) {
        if order == self.order {
            return;
        }
        tracing::debug!(
            "FFT order change: {} -> {} points",
            self.order.size(),
            order.size()
        );
        *self = Self::with_capacity(order, self.capacity);
    }

    /// Render one frame from the most recent `fft_size` samples
    ///
    /// Returns `false` without rendering when fewer than `fft_size` samples
    /// are supplied. A rendered frame is dropped if the FIFO is full.
    pub fn produce(&mut self, samples: &[f32], silence_floor_db: f32) -> bool {
        let size = self.order.size();
        if samples.len() < size {
            return false;
        }
        let recent = &samples[samples.len() - size..];

        for ((slot, &sample), &w) in self.buffer.iter_mut().zip(recent).zip(&self.window) {
            *slot = Complex::new(sample * w, 0.0);
        }
        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

        let num_bins = self.order.num_bins() as f32;
        for (bin, value) in self.frame.iter_mut().zip(&self.buffer) {
            *bin = gain_to_db(value.norm() / num_bins, silence_floor_db);
        }

        let _ = self.producer.push(&self.frame);
        true
    }

    pub fn order(&self) -> FftOrder {
        self.order
    }

    pub fn fft_size(&self) -> usize {
        self.order.size()
    }

    /// Hz covered by one bin at `sample_rate`
    pub fn bin_width(&self, sample_rate: f32) -> f32 {
        sample_rate / self.fft_size() as f32
    }

    pub fn num_available_frames(&self) -> usize {
        self.consumer.available_for_reading()
    }

    /// Pull the oldest queued frame into `out`
    pub fn pull_frame(&mut self, out: &mut Vec<f32>) -> bool {
        self.consumer.pull(out)
    }
}

fn plan(size: usize) -> (Arc<dyn Fft<f32>>, Vec<Complex<f32>>) {
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(size);
    let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
    (fft, scratch)
}
