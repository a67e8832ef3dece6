use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::settings::FrequencyScale;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analyze: AnalyzeDefault,
    #[serde(default)]
    pub player: PlayerConfig,
}

/// Initial analysis settings for a newly opened buffer.
///
/// Every field is optional; missing or invalid values fall back to the
/// settings store defaults when the store validates them.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AnalyzeDefault {
    pub waveform_visible: Option<bool>,
    pub waveform_vertical_scale: Option<f64>,
    pub spectrogram_visible: Option<bool>,
    pub spectrogram_vertical_scale: Option<f64>,
    /// 0 = 256 samples, 7 = 32768 samples
    pub window_size_index: Option<usize>,
    pub min_amplitude: Option<f64>,
    pub max_amplitude: Option<f64>,
    pub min_frequency: Option<f64>,
    pub max_frequency: Option<f64>,
    pub spectrogram_db_floor: Option<f64>,
    pub frequency_scale: Option<FrequencyScale>,
    pub mel_filter_count: Option<f64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_volume")]
    pub volume: f64,
    /// Start playback whenever the seek bar is moved
    #[serde(default)]
    pub seek_to_play: bool,
    /// Analyze as soon as the file is loaded
    #[serde(default = "default_auto_analyze")]
    pub auto_analyze: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            seek_to_play: false,
            auto_analyze: default_auto_analyze(),
        }
    }
}

fn default_volume() -> f64 { 1.0 }

fn default_auto_analyze() -> bool { true }

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(err) => {
            log::warn!("Invalid config {}: {}", path.display(), err);
            None
        }
    }
}

/// Explicit path first, then `wavpeek.toml` in the working directory, then
/// the per-user config locations.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("wavpeek.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("wavpeek").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("wavpeek").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}
