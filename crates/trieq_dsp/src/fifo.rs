//! Lock-free snapshot FIFO
//!
//! Fixed-capacity single-producer/single-consumer queue of whole values
//! (audio blocks, spectra, paths), built from two `rtrb` ring buffers:
//!
//! ```text
//!            ┌──────── filled ────────┐
//! Producer ──┤                        ├──▶ Consumer
//!            └◀─────── spare ─────────┘
//! ```
//!
//! All `capacity` slots are allocated up front and circulate between the two
//! rings. `push` takes a spare slot, copies the value into it with
//! `clone_from` (which reuses the slot's allocation) and hands it over;
//! `pull` copies the oldest slot out and returns the slot to the spare ring.
//! When no spare slot is left the queue is full and `push` drops the value.

use rtrb::{Consumer, Producer, RingBuffer};

/// Default number of snapshots a FIFO can hold
pub const FIFO_CAPACITY: usize = 30;

/// Create a FIFO of `capacity` slots, each initialised to a clone of
/// `prototype`
///
/// `prototype` should already have the size values will have (e.g. a
/// `Vec<f32>` of the block length) so later copies never reallocate.
pub fn fifo<T: Clone>(capacity: usize, prototype: T) -> (FifoProducer<T>, FifoConsumer<T>) {
    let (filled_tx, filled_rx) = RingBuffer::new(capacity);
    let (mut spare_tx, spare_rx) = RingBuffer::new(capacity);

    for _ in 0..capacity {
        // Cannot fail: exactly `capacity` pushes into an empty ring of that size
        let _ = spare_tx.push(prototype.clone());
    }

    (
        FifoProducer {
            filled: filled_tx,
            spare: spare_rx,
            capacity,
        },
        FifoConsumer {
            filled: filled_rx,
            spare: spare_tx,
            capacity,
        },
    )
}

/// Writing half of a snapshot FIFO
pub struct FifoProducer<T> {
    filled: Producer<T>,
    spare: Consumer<T>,
    capacity: usize,
}

impl<T: Clone> FifoProducer<T> {
    /// Copy `value` into the next free slot
    ///
    /// Returns `false` (and drops nothing already queued) when the FIFO is
    /// full.
    ///
    /// # Real-time Safety
    /// Never blocks. Allocation-free when `T::clone_from` is (e.g. `Vec`s of
    /// matching length).
    #[inline]
    pub fn push(&mut self, value: &T) -> bool {
        let Ok(mut slot) = self.spare.pop() else {
            return false;
        };
        slot.clone_from(value);
        // A spare slot guarantees room in `filled`: both rings share `capacity`
        self.filled.push(slot).is_ok()
    }

    /// Free slots at the time of the call (advisory under concurrency)
    pub fn available_for_writing(&self) -> usize {
        self.spare.slots()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Reading half of a snapshot FIFO
pub struct FifoConsumer<T> {
    filled: Consumer<T>,
    spare: Producer<T>,
    capacity: usize,
}

impl<T: Clone> FifoConsumer<T> {
    /// Copy the oldest queued value into `out`
    ///
    /// Returns `false` and leaves `out` untouched when the FIFO is empty.
    #[inline]
    pub fn pull(&mut self, out: &mut T) -> bool {
        let Ok(slot) = self.filled.pop() else {
            return false;
        };
        out.clone_from(&slot);
        // Cannot fail: the slot we just took is the room we give back
        let _ = self.spare.push(slot);
        true
    }

    /// Drain the FIFO, keeping only the most recent value in `out`
    ///
    /// Returns `true` if at least one value was pulled.
    pub fn pull_latest(&mut self, out: &mut T) -> bool {
        let mut pulled = false;
        while self.pull(out) {
            pulled = true;
        }
        pulled
    }

    /// Queued values at the time of the call (advisory under concurrency)
    pub fn available_for_reading(&self) -> usize {
        self.filled.slots()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
