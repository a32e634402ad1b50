//! Live waveform meter.
//!
//! Turns microphone chunks into a 0-100 % loudness level and keeps a
//! scrolling history of levels for the terminal sparkline.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Meter shared between the visualizer's audio thread and the renderer.
pub type SharedWaveform = Arc<Mutex<WaveformMeter>>;

/// Lowest level shown for non-silent input, so the waveform never flatlines
/// while the microphone is open.
const FLOOR_PERCENT: f32 = 4.0;

/// dB range mapped onto 0-100 %.
const DISPLAY_RANGE_DB: f32 = 40.0;

/// Rolling loudness meter with a fixed-width history.
#[derive(Debug, Clone)]
pub struct WaveformMeter {
    recent: VecDeque<i16>,
    window: usize,
    reference_level_db: i8,
    level: u8,
    history: VecDeque<u64>,
    width: usize,
}

impl WaveformMeter {
    /// Creates a silent meter.
    ///
    /// # Arguments
    /// * `reference_level_db` - dBFS shown as 100 %
    /// * `width` - number of history columns
    pub fn new(reference_level_db: i8, width: usize) -> Self {
        Self {
            recent: VecDeque::new(),
            window: 2205,
            reference_level_db,
            level: 0,
            history: std::iter::repeat(0).take(width).collect(),
            width,
        }
    }

    /// Sizes the level window to 50 ms at `sample_rate`.
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.window = (sample_rate as usize / 20).max(1);
        self.trim_recent();
    }

    /// Feeds a mono chunk and recomputes the current level.
    pub fn push_samples(&mut self, chunk: &[i16]) {
        self.recent.extend(chunk.iter().copied());
        self.trim_recent();
        let reference_level_db = self.reference_level_db;
        self.level = volume_percent(self.recent.make_contiguous(), reference_level_db);
    }

    /// Appends the current level as the newest history column.
    pub fn record_level(&mut self) {
        self.history.push_back(u64::from(self.level));
        while self.history.len() > self.width {
            self.history.pop_front();
        }
    }

    /// Adjusts history to `width` columns, dropping the oldest or padding with silence.
    pub fn resize(&mut self, width: usize) {
        self.width = width;
        while self.history.len() > width {
            self.history.pop_front();
        }
        while self.history.len() < width {
            self.history.push_front(0);
        }
    }

    /// Clears the live level; history scrolls out naturally.
    pub fn reset(&mut self) {
        self.recent.clear();
        self.level = 0;
    }

    /// Current level, 0-100.
    pub fn level(&self) -> u8 {
        self.level
    }

    /// History columns, oldest first.
    pub fn history(&self) -> Vec<u64> {
        self.history.iter().copied().collect()
    }

    fn trim_recent(&mut self) {
        while self.recent.len() > self.window {
            self.recent.pop_front();
        }
    }
}

/// Loudness of `samples` as a percentage of `reference_level_db`.
///
/// RMS is converted to dBFS and mapped linearly from 40 dB below the
/// reference (4 %, the floor) up to the reference (100 %). Empty input is 0.
pub fn volume_percent(samples: &[i16], reference_level_db: i8) -> u8 {
    if samples.is_empty() {
        return 0;
    }

    let sum_of_squares: i64 = samples.iter().map(|&x| i64::from(x).pow(2)).sum();
    let mean_square = sum_of_squares / samples.len() as i64;
    let rms = (mean_square as f32).sqrt();

    let db_fs = if rms > 0.0 {
        20.0 * (rms / 32767.0).log10()
    } else {
        -160.0
    };

    let min_db = f32::from(reference_level_db) - DISPLAY_RANGE_DB;
    ((db_fs - min_db) / DISPLAY_RANGE_DB * 100.0).clamp(FLOOR_PERCENT, 100.0) as u8
}
