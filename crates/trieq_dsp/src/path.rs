//! Path Generator
//!
//! Maps a dB spectrum (linear bin index) onto a display rectangle as a
//! polyline: x follows log-frequency over 20 Hz..20 kHz, y follows level
//! from the silence floor (bottom) to 0 dB (top).

use serde::{Deserialize, Serialize};

use crate::fifo::{fifo, FifoConsumer, FifoProducer, FIFO_CAPACITY};

/// Lowest frequency shown by the analyzer
pub const MIN_DISPLAY_FREQ: f32 = 20.0;

/// Highest frequency shown by the analyzer
pub const MAX_DISPLAY_FREQ: f32 = 20000.0;

/// Draw a point every `DEFAULT_PATH_STRIDE` bins
pub const DEFAULT_PATH_STRIDE: usize = 2;

/// Display area in pixels; y grows downwards
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// True if there is nothing to draw into
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// A rendered analyzer polyline
#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerPath {
    points: Vec<Point>,
}

impl Clone for AnalyzerPath {
    fn clone(&self) -> Self {
        Self {
            points: self.points.clone(),
        }
    }

    // Keep the destination allocation when paths cycle through a FIFO
    fn clone_from(&mut self, source: &Self) {
        self.points.clone_from(&source.points);
    }
}

impl AnalyzerPath {
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn into_points(self) -> Vec<Point> {
        self.points
    }
}

/// Linear remap of `value` from one range onto another
pub fn jmap(value: f32, source_min: f32, source_max: f32, target_min: f32, target_max: f32) -> f32 {
    target_min + (value - source_min) * (target_max - target_min) / (source_max - source_min)
}

/// Position of `value` in [min, max] on a log10 scale, as 0..1
pub fn map_from_log10(value: f32, min: f32, max: f32) -> f32 {
    (value / min).log10() / (max / min).log10()
}

/// Inverse of `map_from_log10`: 0..1 back to a value in [min, max]
pub fn map_to_log10(normalized: f32, min: f32, max: f32) -> f32 {
    min * (max / min).powf(normalized)
}

/// Converts spectra to paths and queues them for the display
pub struct PathGenerator {
    stride: usize,
    path: AnalyzerPath,
    producer: FifoProducer<AnalyzerPath>,
    consumer: FifoConsumer<AnalyzerPath>,
}

impl PathGenerator {
    /// `stride` of 0 is treated as 1 (every bin)
    pub fn new(stride: usize) -> Self {
        Self::with_capacity(stride, FIFO_CAPACITY)
    }

    pub fn with_capacity(stride: usize, capacity: usize) -> Self {
        let (producer, consumer) = fifo(capacity, AnalyzerPath::default());
        Self {
            stride: stride.max(1),
            path: AnalyzerPath::default(),
            producer,
            consumer,
        }
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn set_stride(&mut self, stride: usize) {
        self.stride = stride.max(1);
    }

    /// Build a path from `spectrum` (dB per bin) and queue it
    ///
    /// The first point sits at the left edge with bin 0's level; every
    /// `stride`-th bin from 1 up to `fft_size / 2` follows. Bins whose
    /// frequency falls outside 20 Hz..20 kHz, or whose mapped position is
    /// not finite, are skipped. Returns `false` if the FIFO was full.
    pub fn generate(
        &mut self,
        spectrum: &[f32],
        bounds: Rect,
        fft_size: usize,
        bin_width: f32,
        silence_floor_db: f32,
    ) -> bool {
        let top = bounds.y;
        let bottom = bounds.bottom();
        let level_to_y = |db: f32| jmap(db, silence_floor_db, 0.0, bottom, top);
        let num_bins = (fft_size / 2).min(spectrum.len());

        let points = &mut self.path.points;
        points.clear();

        if let Some(&first) = spectrum.first() {
            let y = level_to_y(first);
            if y.is_finite() {
                points.push(Point { x: bounds.x, y });
            }
        }

        for bin in (1..num_bins).step_by(self.stride) {
            let normalized = map_from_log10(bin as f32 * bin_width, MIN_DISPLAY_FREQ, MAX_DISPLAY_FREQ);
            if !(0.0..=1.0).contains(&normalized) {
                continue;
            }
            let x = bounds.x + normalized * bounds.width;
            let y = level_to_y(spectrum[bin]);
            if x.is_finite() && y.is_finite() {
                points.push(Point { x, y });
            }
        }

        self.producer.push(&self.path)
    }

    pub fn num_paths_available(&self) -> usize {
        self.consumer.available_for_reading()
    }

    /// Pull the oldest queued path into `out`
    pub fn pull_path(&mut self, out: &mut AnalyzerPath) -> bool {
        self.consumer.pull(out)
    }

    /// Drain the queue keeping only the newest path
    pub fn pull_latest(&mut self, out: &mut AnalyzerPath) -> bool {
        self.consumer.pull_latest(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLOOR: f32 = -48.0;

    fn bounds() -> Rect {
        Rect::new(10.0, 5.0, 600.0, 200.0)
    }

    #[test]
    fn test_log10_mapping() {
        assert!(map_from_log10(20.0, 20.0, 20000.0).abs() < 1e-6);
        assert!((map_from_log10(20000.0, 20.0, 20000.0) - 1.0).abs() < 1e-6);
        assert!((map_from_log10(632.456, 20.0, 20000.0) - 0.5).abs() < 1e-4);
        assert!((map_to_log10(0.5, 20.0, 20000.0) - 632.456).abs() < 0.01);
        assert!(map_from_log10(0.0, 20.0, 20000.0).is_infinite());
    }

    #[test]
    fn test_jmap() {
        assert_eq!(jmap(FLOOR, FLOOR, 0.0, 205.0, 5.0), 205.0);
        assert_eq!(jmap(0.0, FLOOR, 0.0, 205.0, 5.0), 5.0);
        assert_eq!(jmap(-24.0, FLOOR, 0.0, 205.0, 5.0), 105.0);
    }

    #[test]
    fn test_flat_floor_sits_on_bottom_edge() {
        let mut generator = PathGenerator::new(DEFAULT_PATH_STRIDE);
        let spectrum = vec![FLOOR; 4096];
        assert!(generator.generate(&spectrum, bounds(), 8192, 48000.0 / 8192.0, FLOOR));

        let mut path = AnalyzerPath::default();
        assert!(generator.pull_path(&mut path));
        assert!(path.len() > 100);
        for point in path.points() {
            assert!((point.y - bounds().bottom()).abs() < 1e-3);
            assert!(point.x >= bounds().x && point.x <= bounds().right() + 1e-3);
        }
    }

    #[test]
    fn test_bin_100_position_at_48k_8192() {
        let bin_width: f32 = 48000.0 / 8192.0;
        assert!((bin_width - 5.859).abs() < 1e-3);

        let mut spectrum = vec![FLOOR; 4096];
        spectrum[100] = 0.0;
        let mut generator = PathGenerator::new(1);
        generator.generate(&spectrum, bounds(), 8192, bin_width, FLOOR);

        let mut path = AnalyzerPath::default();
        generator.pull_path(&mut path);
        let peak = path
            .points()
            .iter()
            .find(|p| (p.y - bounds().y).abs() < 1e-3)
            .unwrap();

        let expected = bounds().x + bounds().width * map_from_log10(585.9375, 20.0, 20000.0);
        assert!((peak.x - expected).abs() < 1e-3);
    }

    #[test]
    fn test_stride_thins_points() {
        let spectrum = vec![-12.0; 1024];
        let mut every = PathGenerator::new(1);
        let mut halved = PathGenerator::new(2);
        every.generate(&spectrum, bounds(), 2048, 48000.0 / 2048.0, FLOOR);
        halved.generate(&spectrum, bounds(), 2048, 48000.0 / 2048.0, FLOOR);

        let mut a = AnalyzerPath::default();
        let mut b = AnalyzerPath::default();
        every.pull_path(&mut a);
        halved.pull_path(&mut b);
        assert!(b.len() < a.len());
        assert!(b.len() * 2 >= a.len() - 2);
        assert_eq!(PathGenerator::new(0).stride(), 1);
    }

    #[test]
    fn test_non_finite_levels_are_skipped() {
        let mut spectrum = vec![-20.0; 1024];
        spectrum[0] = f32::NAN;
        spectrum[51] = f32::NAN;
        spectrum[53] = f32::INFINITY;
        let mut generator = PathGenerator::new(2);
        generator.generate(&spectrum, bounds(), 2048, 48000.0 / 2048.0, FLOOR);

        let mut path = AnalyzerPath::default();
        generator.pull_path(&mut path);
        assert!(!path.is_empty());
        assert!(path.points().iter().all(|p| p.x.is_finite() && p.y.is_finite()));
        assert!(path.points()[0].x > bounds().x);
    }

    #[test]
    fn test_consumer_keeps_latest() {
        let mut generator = PathGenerator::new(2);
        let bin_width = 48000.0 / 2048.0;
        for level in [-40.0, -30.0, -10.0] {
            generator.generate(&vec![level; 1024], bounds(), 2048, bin_width, FLOOR);
        }
        assert_eq!(generator.num_paths_available(), 3);

        let mut path = AnalyzerPath::default();
        assert!(generator.pull_latest(&mut path));
        let expected_y = jmap(-10.0, FLOOR, 0.0, bounds().bottom(), bounds().y);
        assert!((path.points()[1].y - expected_y).abs() < 1e-3);
        assert_eq!(generator.num_paths_available(), 0);
    }
}
