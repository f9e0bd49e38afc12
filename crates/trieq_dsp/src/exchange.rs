//! Lock-free coefficient exchange
//!
//! The control thread designs new coefficients and publishes them here; the
//! audio thread polls once per block and installs them into its own chains.
//!
//! # Design
//!
//! Every value is stored in an atomic (f32 stored as its bit pattern) and the
//! whole set is guarded by a sequence counter (seqlock):
//! - the single writer bumps the counter to odd, stores, bumps it to even
//! - the reader only accepts a snapshot if the counter was even and
//!   unchanged across its loads
//!
//! A reader that races with a publication never sees a torn coefficient set;
//! it keeps the previous coefficients for that block and picks up the new
//! ones on the next poll. Neither side ever blocks.

use std::sync::atomic::{fence, AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use biquad::Coefficients;

use crate::chain::{ChainUpdate, CutUpdate, PeakUpdate};
use crate::cut::Slope;
use crate::design::MAX_CUT_SECTIONS;

/// Five biquad taps stored as f32 bit patterns
struct AtomicCoefficients {
    taps: [AtomicU32; 5],
}

impl AtomicCoefficients {
    fn new(coeffs: &Coefficients<f32>) -> Self {
        let value = Self {
            taps: core::array::from_fn(|_| AtomicU32::new(0)),
        };
        value.store(coeffs);
        value
    }

    fn store(&self, coeffs: &Coefficients<f32>) {
        let values = [coeffs.b0, coeffs.b1, coeffs.b2, coeffs.a1, coeffs.a2];
        for (tap, value) in self.taps.iter().zip(values) {
            tap.store(value.to_bits(), Ordering::Relaxed);
        }
    }

    fn load(&self) -> Coefficients<f32> {
        let tap = |i: usize| f32::from_bits(self.taps[i].load(Ordering::Relaxed));
        Coefficients {
            b0: tap(0),
            b1: tap(1),
            b2: tap(2),
            a1: tap(3),
            a2: tap(4),
        }
    }
}

struct AtomicCutUpdate {
    sections: [AtomicCoefficients; MAX_CUT_SECTIONS],
    slope: AtomicU8,
    bypassed: AtomicBool,
}

impl AtomicCutUpdate {
    fn new(update: &CutUpdate) -> Self {
        Self {
            sections: core::array::from_fn(|i| AtomicCoefficients::new(&update.coefficients[i])),
            slope: AtomicU8::new(update.slope.index() as u8),
            bypassed: AtomicBool::new(update.bypassed),
        }
    }

    fn store(&self, update: &CutUpdate) {
        for (section, coeffs) in self.sections.iter().zip(&update.coefficients) {
            section.store(coeffs);
        }
        self.slope.store(update.slope.index() as u8, Ordering::Relaxed);
        self.bypassed.store(update.bypassed, Ordering::Relaxed);
    }

    fn load(&self) -> CutUpdate {
        CutUpdate {
            coefficients: core::array::from_fn(|i| self.sections[i].load()),
            slope: Slope::from_index(self.slope.load(Ordering::Relaxed) as usize),
            bypassed: self.bypassed.load(Ordering::Relaxed),
        }
    }
}

/// Shared, lock-free storage for the latest published `ChainUpdate`
pub struct SharedCoefficients {
    /// Even = stable, odd = publication in progress
    sequence: AtomicU64,
    low_cut: AtomicCutUpdate,
    peak: AtomicCoefficients,
    peak_bypassed: AtomicBool,
    high_cut: AtomicCutUpdate,
}

impl SharedCoefficients {
    /// Create the exchange holding `initial`; returns the single writer
    /// handle and the shared storage for readers
    pub fn new(initial: &ChainUpdate) -> (CoefficientPublisher, Arc<SharedCoefficients>) {
        let shared = Arc::new(Self {
            sequence: AtomicU64::new(0),
            low_cut: AtomicCutUpdate::new(&initial.low_cut),
            peak: AtomicCoefficients::new(&initial.peak.coefficients),
            peak_bypassed: AtomicBool::new(initial.peak.bypassed),
            high_cut: AtomicCutUpdate::new(&initial.high_cut),
        });
        let publisher = CoefficientPublisher {
            shared: Arc::clone(&shared),
        };
        (publisher, shared)
    }

    /// Current publication sequence number (even when stable)
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::Acquire)
    }

    /// Read a consistent snapshot, or `None` if a publication is in progress
    pub fn read(&self) -> Option<(u64, ChainUpdate)> {
        let before = self.sequence.load(Ordering::Acquire);
        if before & 1 == 1 {
            return None;
        }

        let update = ChainUpdate {
            low_cut: self.low_cut.load(),
            peak: PeakUpdate {
                coefficients: self.peak.load(),
                bypassed: self.peak_bypassed.load(Ordering::Relaxed),
            },
            high_cut: self.high_cut.load(),
        };

        fence(Ordering::Acquire);
        let after = self.sequence.load(Ordering::Relaxed);
        (before == after).then_some((before, update))
    }

    fn write(&self, update: &ChainUpdate) {
        let seq = self.sequence.load(Ordering::Relaxed);
        self.sequence.store(seq.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);

        self.low_cut.store(&update.low_cut);
        self.peak.store(&update.peak.coefficients);
        self.peak_bypassed.store(update.peak.bypassed, Ordering::Relaxed);
        self.high_cut.store(&update.high_cut);

        self.sequence.store(seq.wrapping_add(2), Ordering::Release);
    }
}

/// The single writer of a `SharedCoefficients`
///
/// Not `Clone`: owning the publisher is what makes the writer unique.
pub struct CoefficientPublisher {
    shared: Arc<SharedCoefficients>,
}

impl CoefficientPublisher {
    /// Publish a new coefficient set for the audio thread to pick up
    pub fn publish(&mut self, update: &ChainUpdate) {
        self.shared.write(update);
    }

    pub fn shared(&self) -> &Arc<SharedCoefficients> {
        &self.shared
    }
}

/// Audio-thread side: remembers which publication it last installed
pub struct CoefficientReader {
    shared: Arc<SharedCoefficients>,
    last_seen: Option<u64>,
}

impl CoefficientReader {
    pub fn new(shared: Arc<SharedCoefficients>) -> Self {
        Self {
            shared,
            last_seen: None,
        }
    }

    /// Return the latest publication if it is newer than the last one
    /// returned and could be read consistently
    ///
    /// # Real-time Safety
    /// No allocations, no locks. A fixed number of atomic loads.
    #[inline]
    pub fn poll(&mut self) -> Option<ChainUpdate> {
        if self.last_seen == Some(self.shared.sequence()) {
            return None;
        }
        let (seq, update) = self.shared.read()?;
        self.last_seen = Some(seq);
        Some(update)
    }
}
