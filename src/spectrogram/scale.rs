//! Mapping from FFT bins to displayed frequency bins.

use crate::settings::{AnalyzeSettingsSnapshot, FrequencyScale};

pub fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

pub fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10f64.powf(mel / 2595.0) - 1.0)
}

#[derive(Clone, Debug)]
struct Triangle {
    lower: f64,
    centre: f64,
    upper: f64,
}

impl Triangle {
    fn weight(&self, hz: f64) -> f64 {
        if hz <= self.lower || hz >= self.upper {
            0.0
        } else if hz <= self.centre {
            (hz - self.lower) / (self.centre - self.lower)
        } else {
            (self.upper - hz) / (self.upper - self.centre)
        }
    }
}

#[derive(Clone, Debug)]
enum Layout {
    Linear { first: usize },
    Log,
    Mel(Vec<Triangle>),
}

/// Output bins of one spectrogram frame, lowest frequency first.
///
/// The layout depends on the frequency scale; tile shape does not: every
/// frame of a tile has [`FrequencyBins::len`] values.
#[derive(Clone, Debug)]
pub struct FrequencyBins {
    bin_hz: f64,
    centres: Vec<f64>,
    layout: Layout,
}

impl FrequencyBins {
    pub fn new(settings: &AnalyzeSettingsSnapshot) -> Self {
        let window = settings.window_size.max(2);
        let nyquist_bin = window / 2;
        let bin_hz = settings.sample_rate / window as f64;
        let min_f = settings.min_frequency.max(0.0);
        let max_f = settings.max_frequency.min(settings.sample_rate / 2.0).max(min_f);

        let first = ((min_f / bin_hz).ceil() as usize).min(nyquist_bin);
        let last = ((max_f / bin_hz).floor() as usize).clamp(first, nyquist_bin);
        let linear_count = last - first + 1;

        match settings.frequency_scale {
            FrequencyScale::Linear => Self {
                bin_hz,
                centres: (first..=last).map(|k| k as f64 * bin_hz).collect(),
                layout: Layout::Linear { first },
            },
            FrequencyScale::Log => {
                let lo = min_f.max(bin_hz);
                let hi = max_f.max(lo);
                let centres = if linear_count == 1 {
                    vec![lo]
                } else {
                    let ratio = hi / lo;
                    (0..linear_count)
                        .map(|i| lo * ratio.powf(i as f64 / (linear_count - 1) as f64))
                        .collect()
                };
                Self {
                    bin_hz,
                    centres,
                    layout: Layout::Log,
                }
            }
            FrequencyScale::Mel => {
                let count = settings.mel_filter_count.max(1);
                let mel_lo = hz_to_mel(min_f);
                let mel_hi = hz_to_mel(max_f);
                let edges: Vec<f64> = (0..count + 2)
                    .map(|i| mel_to_hz(mel_lo + (mel_hi - mel_lo) * i as f64 / (count + 1) as f64))
                    .collect();
                let filters: Vec<Triangle> = edges
                    .windows(3)
                    .map(|w| Triangle {
                        lower: w[0],
                        centre: w[1],
                        upper: w[2],
                    })
                    .collect();
                Self {
                    bin_hz,
                    centres: filters.iter().map(|f| f.centre).collect(),
                    layout: Layout::Mel(filters),
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.centres.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centres.is_empty()
    }

    /// Centre frequency of output bin `index` in Hz
    pub fn centre_hz(&self, index: usize) -> Option<f64> {
        self.centres.get(index).copied()
    }

    /// Project a linear amplitude spectrum (`window/2 + 1` values) onto the
    /// output bins.
    pub fn project(&self, spectrum: &[f32]) -> Vec<f32> {
        match &self.layout {
            Layout::Linear { first } => (0..self.centres.len())
                .map(|i| spectrum.get(first + i).copied().unwrap_or(0.0))
                .collect(),
            Layout::Log => self
                .centres
                .iter()
                .map(|&hz| self.interpolate(spectrum, hz))
                .collect(),
            Layout::Mel(filters) => filters
                .iter()
                .map(|filter| {
                    let lo = (filter.lower / self.bin_hz).floor().max(0.0) as usize;
                    let hi = ((filter.upper / self.bin_hz).ceil() as usize)
                        .min(spectrum.len().saturating_sub(1));
                    let mut energy = 0.0f64;
                    let mut weight_sum = 0.0f64;
                    for k in lo..=hi {
                        let w = filter.weight(k as f64 * self.bin_hz);
                        energy += w * (spectrum[k] as f64).powi(2);
                        weight_sum += w;
                    }
                    if weight_sum > 0.0 {
                        (energy / weight_sum).sqrt() as f32
                    } else {
                        // Filter narrower than one FFT bin
                        self.interpolate(spectrum, filter.centre)
                    }
                })
                .collect(),
        }
    }

    fn interpolate(&self, spectrum: &[f32], hz: f64) -> f32 {
        if spectrum.is_empty() {
            return 0.0;
        }
        let pos = (hz / self.bin_hz).max(0.0);
        let k = pos.floor() as usize;
        if k + 1 >= spectrum.len() {
            return spectrum[spectrum.len() - 1];
        }
        let frac = (pos - k as f64) as f32;
        spectrum[k] * (1.0 - frac) + spectrum[k + 1] * frac
    }
}

/// Compress a linear amplitude to `[0, 1]` against a dB floor.
pub fn normalize_db(amplitude: f32, db_floor: f64) -> f32 {
    if db_floor >= 0.0 {
        return 0.0;
    }
    let db = 20.0 * (amplitude.max(1e-12) as f64).log10();
    ((db - db_floor) / -db_floor).clamp(0.0, 1.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::AnalyzeToken;

    fn snapshot(scale: FrequencyScale) -> AnalyzeSettingsSnapshot {
        AnalyzeSettingsSnapshot {
            sample_rate: 1024.0,
            window_size: 256,
            hop_size: 64,
            min_frequency: 0.0,
            max_frequency: 512.0,
            min_time: 0.0,
            max_time: 1.0,
            min_amplitude: -1.0,
            max_amplitude: 1.0,
            spectrogram_db_floor: -90.0,
            frequency_scale: scale,
            mel_filter_count: 40,
            token: AnalyzeToken::from_u64(1),
        }
    }

    #[test]
    fn linear_bins_cover_range_to_nyquist() {
        let bins = FrequencyBins::new(&snapshot(FrequencyScale::Linear));
        assert_eq!(bins.len(), 129);
        assert_eq!(bins.centre_hz(0), Some(0.0));
        assert_eq!(bins.centre_hz(128), Some(512.0));
    }

    #[test]
    fn linear_bins_honour_frequency_range() {
        let mut s = snapshot(FrequencyScale::Linear);
        s.min_frequency = 100.0;
        s.max_frequency = 200.0;
        let bins = FrequencyBins::new(&s);
        // bin width is 4 Hz: bins 25..=50
        assert_eq!(bins.len(), 26);
        assert_eq!(bins.centre_hz(0), Some(100.0));
        let spectrum: Vec<f32> = (0..129).map(|k| k as f32).collect();
        assert_eq!(bins.project(&spectrum)[0], 25.0);
    }

    #[test]
    fn log_bins_are_geometric() {
        let bins = FrequencyBins::new(&snapshot(FrequencyScale::Log));
        assert_eq!(bins.len(), 129);
        let a = bins.centre_hz(1).unwrap() / bins.centre_hz(0).unwrap();
        let b = bins.centre_hz(101).unwrap() / bins.centre_hz(100).unwrap();
        assert!((a - b).abs() < 1e-9);
        assert!((bins.centre_hz(128).unwrap() - 512.0).abs() < 1e-6);
    }

    #[test]
    fn mel_bins_follow_filter_count() {
        let mut s = snapshot(FrequencyScale::Mel);
        s.mel_filter_count = 20;
        let bins = FrequencyBins::new(&s);
        assert_eq!(bins.len(), 20);
        let spectrum = vec![0.5f32; 129];
        for v in bins.project(&spectrum) {
            assert!((v - 0.5).abs() < 1e-4);
        }
    }

    #[test]
    fn mel_round_trip() {
        for hz in [0.0, 440.0, 8000.0] {
            assert!((mel_to_hz(hz_to_mel(hz)) - hz).abs() < 1e-6);
        }
    }

    #[test]
    fn db_normalization() {
        assert_eq!(normalize_db(1.0, -90.0), 1.0);
        assert_eq!(normalize_db(0.0, -90.0), 0.0);
        // -45 dB sits halfway down a 90 dB range
        let half = normalize_db(10f32.powf(-45.0 / 20.0), -90.0);
        assert!((half - 0.5).abs() < 1e-4);
    }
}
