//! Gridlines and labels for figure axes.

use super::surface::AxisTick;
use crate::settings::AnalyzeSettingsSnapshot;
use crate::spectrogram::FrequencyBins;

pub const GRIDLINES: usize = 10;

/// Time gridlines, left to right. The first line is unlabeled since it
/// sits on the figure edge.
pub fn time_ticks(settings: &AnalyzeSettingsSnapshot) -> Vec<AxisTick> {
    let span = settings.max_time - settings.min_time;
    (0..GRIDLINES)
        .map(|i| {
            let fraction = i as f64 / GRIDLINES as f64;
            let t = fraction * span + settings.min_time;
            AxisTick {
                position: fraction,
                label: (i != 0).then(|| format!("{:.2}", t)),
            }
        })
        .collect()
}

/// Amplitude gridlines, top to bottom, starting one step below the top.
pub fn amplitude_ticks(settings: &AnalyzeSettingsSnapshot) -> Vec<AxisTick> {
    let step = (settings.min_amplitude - settings.max_amplitude) / GRIDLINES as f64;
    (0..GRIDLINES)
        .map(|i| {
            let a = (i + 1) as f64 * step + settings.max_amplitude;
            AxisTick {
                position: (i + 1) as f64 / GRIDLINES as f64,
                label: Some(format!("{:.2}", a)),
            }
        })
        .collect()
}

/// Frequency gridlines, top to bottom, labeled in kHz. Labels follow the
/// bin layout, so log and mel axes are not evenly spaced in Hz.
pub fn frequency_ticks(settings: &AnalyzeSettingsSnapshot) -> Vec<AxisTick> {
    let bins = FrequencyBins::new(settings);
    let last = bins.len().saturating_sub(1);
    (0..GRIDLINES)
        .map(|i| {
            let position = i as f64 / GRIDLINES as f64;
            let from_bottom = 1.0 - position;
            let index = (from_bottom * last as f64).round() as usize;
            let hz = bins.centre_hz(index).unwrap_or(settings.min_frequency);
            AxisTick {
                position,
                label: Some(format!("{:.2}k", hz / 1000.0)),
            }
        })
        .collect()
}
