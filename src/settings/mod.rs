pub mod events;
pub mod range;
pub mod store;

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

pub use events::{ChangeKind, SettingsEvent};
pub use range::Interval;
pub use store::{AnalyzeSettingsSnapshot, SettingsStore};

pub const WINDOW_SIZES: [usize; 8] = [256, 512, 1024, 2048, 4096, 8192, 16384, 32768];
pub const DEFAULT_WINDOW_SIZE_INDEX: usize = 2;

pub const AMPLITUDE_LIMITS: Interval = Interval::new(-100.0, 100.0);
pub const DB_FLOOR_LIMITS: Interval = Interval::new(-1000.0, 0.0);
pub const DEFAULT_DB_FLOOR: f64 = -90.0;

pub const MEL_FILTER_LIMITS: Interval = Interval::new(20.0, 200.0);
pub const DEFAULT_MEL_FILTER_COUNT: usize = 40;

pub const VERTICAL_SCALE_LIMITS: Interval = Interval::new(0.2, 2.0);
pub const DEFAULT_VERTICAL_SCALE: f64 = 1.0;

/// Spectrogram width in pixels the auto hop size is tuned for.
pub const HOP_PIXEL_BUDGET: f64 = 1800.0;

/// How spectrogram bins are spaced along the frequency axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FrequencyScale {
    #[default]
    Linear,
    Log,
    Mel,
}

/// Generation marker for one analysis.
///
/// Tokens are unique per process; results carrying an older token are stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalyzeToken(u64);

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

impl AnalyzeToken {
    pub fn generate() -> Self {
        Self(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }

    pub fn from_u64(raw: u64) -> Self {
        Self(raw)
    }
}

/// Window size for a `WINDOW_SIZES` index, or the default size when out of range.
pub fn window_size_for_index(index: usize) -> usize {
    WINDOW_SIZES
        .get(index)
        .copied()
        .unwrap_or(WINDOW_SIZES[DEFAULT_WINDOW_SIZE_INDEX])
}

pub fn window_size_index(size: usize) -> Option<usize> {
    WINDOW_SIZES.iter().position(|&s| s == size)
}

/// Hop size that keeps spectrogram rectangles at least `4 * window/1024`
/// pixels wide across a [`HOP_PIXEL_BUDGET`]-wide figure, never below a
/// quarter window.
pub fn auto_hop_size(window_size: usize, min_time: f64, max_time: f64, sample_rate: f64) -> usize {
    let min_rect_width = 4.0 * window_size as f64 / 1024.0;
    let spread = (min_rect_width * (max_time - min_time) * sample_rate / HOP_PIXEL_BUDGET).trunc();
    let spread = if spread.is_finite() && spread > 0.0 { spread as usize } else { 0 };
    spread.max(window_size / 4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_hop_matches_pixel_budget() {
        assert_eq!(auto_hop_size(1024, 0.0, 4.0, 44100.0), 392);
        assert_eq!(auto_hop_size(1024, 2.0, 6.0, 44100.0), 392);
    }

    #[test]
    fn auto_hop_never_below_quarter_window() {
        assert_eq!(auto_hop_size(1024, 0.0, 0.1, 44100.0), 256);
        assert_eq!(auto_hop_size(32768, 0.0, 1.0, 8000.0), 8192);
    }

    #[test]
    fn window_size_lookup() {
        assert_eq!(window_size_for_index(0), 256);
        assert_eq!(window_size_for_index(7), 32768);
        assert_eq!(window_size_for_index(8), 1024);
        assert_eq!(window_size_index(4096), Some(4));
        assert_eq!(window_size_index(1000), None);
    }

    #[test]
    fn tokens_are_unique() {
        let a = AnalyzeToken::generate();
        let b = AnalyzeToken::generate();
        assert_ne!(a, b);
    }
}
