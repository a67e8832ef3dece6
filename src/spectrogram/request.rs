use serde::{Deserialize, Serialize};

use crate::settings::{AnalyzeSettingsSnapshot, AnalyzeToken};

/// One chunk of spectrogram work for a single channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpectrogramRequest {
    pub channel: usize,
    pub sample_start: usize,
    pub sample_end: usize,
    pub settings: AnalyzeSettingsSnapshot,
    pub token: AnalyzeToken,
}

/// Result of one request: one frame per hop, one value in `[0, 1]` per
/// displayed frequency bin (lowest frequency first).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpectrogramTile {
    pub channel: usize,
    pub sample_start: usize,
    pub sample_end: usize,
    pub settings: AnalyzeSettingsSnapshot,
    pub token: AnalyzeToken,
    pub magnitude_frames: Vec<Vec<f32>>,
}

impl SpectrogramTile {
    pub fn frame_count(&self) -> usize {
        self.magnitude_frames.len()
    }

    pub fn bin_count(&self) -> usize {
        self.magnitude_frames.first().map_or(0, Vec::len)
    }
}
