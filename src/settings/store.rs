use crossbeam::channel::Receiver;
use serde::{Deserialize, Serialize};

use super::events::{SettingsEvent, Subscribers};
use super::range::{resolve_range, resolve_scalar, Interval};
use super::{
    auto_hop_size, window_size_for_index, AnalyzeToken, FrequencyScale, AMPLITUDE_LIMITS,
    DB_FLOOR_LIMITS, DEFAULT_DB_FLOOR, DEFAULT_MEL_FILTER_COUNT, DEFAULT_VERTICAL_SCALE,
    DEFAULT_WINDOW_SIZE_INDEX, MEL_FILTER_LIMITS, VERTICAL_SCALE_LIMITS, WINDOW_SIZES,
};
use crate::audio::AudioBuffer;
use crate::config::AnalyzeDefault;

/// Immutable copy of the analysis parameters at one point in time.
///
/// Requests carry one of these so later mutation of the store is never
/// observed by in-flight work.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeSettingsSnapshot {
    pub sample_rate: f64,
    pub window_size: usize,
    pub hop_size: usize,
    pub min_frequency: f64,
    pub max_frequency: f64,
    pub min_time: f64,
    pub max_time: f64,
    pub min_amplitude: f64,
    pub max_amplitude: f64,
    pub spectrogram_db_floor: f64,
    pub frequency_scale: FrequencyScale,
    pub mel_filter_count: usize,
    pub token: AnalyzeToken,
}

impl AnalyzeSettingsSnapshot {
    /// First sample of the visible window
    pub fn start_sample(&self) -> usize {
        (self.min_time * self.sample_rate).round().max(0.0) as usize
    }

    /// One past the last sample of the visible window
    pub fn end_sample(&self) -> usize {
        (self.max_time * self.sample_rate).round().max(0.0) as usize
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Pair {
    Frequency,
    Time,
    Amplitude,
}

#[derive(Clone, Copy)]
enum Echo {
    Min,
    Max,
    Both,
}

/// Owner of the live analysis settings for one open document.
pub struct SettingsStore {
    sample_rate: f64,
    duration: f64,
    buffer_amplitude: Interval,

    auto_hop: bool,
    window_size: usize,
    hop_size: usize,
    frequency: Interval,
    time: Interval,
    amplitude: Interval,
    db_floor: f64,
    frequency_scale: FrequencyScale,
    mel_filter_count: usize,

    waveform_visible: bool,
    waveform_vertical_scale: f64,
    spectrogram_visible: bool,
    spectrogram_vertical_scale: f64,

    token: AnalyzeToken,
    subscribers: Subscribers<SettingsEvent>,
}

impl SettingsStore {
    /// Build the store for a freshly loaded buffer and apply `defaults`
    /// through the validating setters.
    pub fn from_default_setting(defaults: &AnalyzeDefault, buffer: &AudioBuffer) -> Self {
        let sample_rate = buffer.sample_rate();
        let duration = buffer.duration();
        let buffer_amplitude = amplitude_defaults(buffer.amplitude_range());
        let window_size = WINDOW_SIZES[DEFAULT_WINDOW_SIZE_INDEX];

        let mut store = Self {
            sample_rate,
            duration,
            buffer_amplitude,
            auto_hop: true,
            window_size,
            hop_size: window_size / 4,
            frequency: Interval::new(0.0, sample_rate / 2.0),
            time: Interval::new(0.0, duration),
            amplitude: buffer_amplitude,
            db_floor: DEFAULT_DB_FLOOR,
            frequency_scale: FrequencyScale::default(),
            mel_filter_count: DEFAULT_MEL_FILTER_COUNT,
            waveform_visible: true,
            waveform_vertical_scale: DEFAULT_VERTICAL_SCALE,
            spectrogram_visible: true,
            spectrogram_vertical_scale: DEFAULT_VERTICAL_SCALE,
            token: AnalyzeToken::generate(),
            subscribers: Subscribers::default(),
        };

        store.set_waveform_visible(defaults.waveform_visible.unwrap_or(true));
        store.set_waveform_vertical_scale(
            defaults.waveform_vertical_scale.unwrap_or(DEFAULT_VERTICAL_SCALE),
        );
        store.set_spectrogram_visible(defaults.spectrogram_visible.unwrap_or(true));
        store.set_spectrogram_vertical_scale(
            defaults.spectrogram_vertical_scale.unwrap_or(DEFAULT_VERTICAL_SCALE),
        );

        store.set_window_size_index(defaults.window_size_index.unwrap_or(DEFAULT_WINDOW_SIZE_INDEX));

        store.set_min_frequency(defaults.min_frequency.unwrap_or(0.0));
        store.set_max_frequency(defaults.max_frequency.unwrap_or(sample_rate / 2.0));

        store.set_min_time(0.0);
        store.set_max_time(duration);

        store.set_min_amplitude(defaults.min_amplitude.unwrap_or(buffer_amplitude.min));
        store.set_max_amplitude(defaults.max_amplitude.unwrap_or(buffer_amplitude.max));

        store.set_spectrogram_db_floor(defaults.spectrogram_db_floor.unwrap_or(DEFAULT_DB_FLOOR));
        store.set_frequency_scale(defaults.frequency_scale.unwrap_or_default());
        store.set_mel_filter_count(
            defaults
                .mel_filter_count
                .unwrap_or(DEFAULT_MEL_FILTER_COUNT as f64),
        );

        log::debug!(
            "Settings initialised: window={} hop={} freq={:.0}-{:.0}Hz time={:.3}-{:.3}s",
            store.window_size,
            store.hop_size,
            store.frequency.min,
            store.frequency.max,
            store.time.min,
            store.time.max
        );

        store
    }

    /// Receive every committed change from now on.
    pub fn subscribe(&mut self) -> Receiver<SettingsEvent> {
        self.subscribers.subscribe()
    }

    pub fn snapshot(&self) -> AnalyzeSettingsSnapshot {
        AnalyzeSettingsSnapshot {
            sample_rate: self.sample_rate,
            window_size: self.window_size,
            hop_size: self.hop_size,
            min_frequency: self.frequency.min,
            max_frequency: self.frequency.max,
            min_time: self.time.min,
            max_time: self.time.max,
            min_amplitude: self.amplitude.min,
            max_amplitude: self.amplitude.max,
            spectrogram_db_floor: self.db_floor,
            frequency_scale: self.frequency_scale,
            mel_filter_count: self.mel_filter_count,
            token: self.token,
        }
    }

    pub fn token(&self) -> AnalyzeToken {
        self.token
    }

    /// Start a new analysis generation; everything issued under the old
    /// token becomes stale.
    pub fn regenerate_token(&mut self) -> AnalyzeToken {
        self.token = AnalyzeToken::generate();
        self.token
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn buffer_amplitude(&self) -> Interval {
        self.buffer_amplitude
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    pub fn is_hop_pinned(&self) -> bool {
        !self.auto_hop
    }

    pub fn frequency_range(&self) -> Interval {
        self.frequency
    }

    pub fn time_range(&self) -> Interval {
        self.time
    }

    pub fn amplitude_range(&self) -> Interval {
        self.amplitude
    }

    pub fn spectrogram_db_floor(&self) -> f64 {
        self.db_floor
    }

    pub fn frequency_scale(&self) -> FrequencyScale {
        self.frequency_scale
    }

    pub fn mel_filter_count(&self) -> usize {
        self.mel_filter_count
    }

    pub fn waveform_visible(&self) -> bool {
        self.waveform_visible
    }

    pub fn waveform_vertical_scale(&self) -> f64 {
        self.waveform_vertical_scale
    }

    pub fn spectrogram_visible(&self) -> bool {
        self.spectrogram_visible
    }

    pub fn spectrogram_vertical_scale(&self) -> f64 {
        self.spectrogram_vertical_scale
    }

    // --- Analysis parameters ---

    /// Select a window size by index into [`WINDOW_SIZES`].
    pub fn set_window_size_index(&mut self, index: usize) {
        self.set_window_size(window_size_for_index(index));
    }

    /// Unsupported sizes fall back to the default window.
    pub fn set_window_size(&mut self, size: usize) {
        let size = if WINDOW_SIZES.contains(&size) {
            size
        } else {
            WINDOW_SIZES[DEFAULT_WINDOW_SIZE_INDEX]
        };
        let changed = size != self.window_size;
        self.window_size = size;
        let hop_changed = self.refresh_auto_hop();
        self.finish(changed || hop_changed);
        self.subscribers.publish(SettingsEvent::WindowSize(size));
        if hop_changed {
            self.subscribers.publish(SettingsEvent::AutoHopSize(self.hop_size));
        }
    }

    /// Pin the hop size. Zero returns to the automatic hop.
    pub fn set_hop_size(&mut self, hop: usize) {
        if hop == 0 {
            self.unpin_hop_size();
            return;
        }
        self.auto_hop = false;
        let changed = hop != self.hop_size;
        self.hop_size = hop;
        self.finish(changed);
        self.subscribers.publish(SettingsEvent::HopSize(hop));
    }

    pub fn unpin_hop_size(&mut self) {
        self.auto_hop = true;
        let changed = self.refresh_auto_hop();
        self.finish(changed);
        self.subscribers.publish(SettingsEvent::HopSize(self.hop_size));
    }

    pub fn set_min_frequency(&mut self, value: f64) {
        self.set_endpoint(Pair::Frequency, Echo::Min, value);
    }

    pub fn set_max_frequency(&mut self, value: f64) {
        self.set_endpoint(Pair::Frequency, Echo::Max, value);
    }

    pub fn set_min_time(&mut self, value: f64) {
        self.set_endpoint(Pair::Time, Echo::Min, value);
    }

    pub fn set_max_time(&mut self, value: f64) {
        self.set_endpoint(Pair::Time, Echo::Max, value);
    }

    pub fn set_min_amplitude(&mut self, value: f64) {
        self.set_endpoint(Pair::Amplitude, Echo::Min, value);
    }

    pub fn set_max_amplitude(&mut self, value: f64) {
        self.set_endpoint(Pair::Amplitude, Echo::Max, value);
    }

    /// The floor is validated as the pair `(floor, 0)`, so a floor of 0 is
    /// an empty range and resets to the default.
    pub fn set_spectrogram_db_floor(&mut self, value: f64) {
        let floor = resolve_range(
            value,
            0.0,
            DB_FLOOR_LIMITS,
            Interval::new(DEFAULT_DB_FLOOR, 0.0),
        )
        .min;
        let changed = floor != self.db_floor;
        self.db_floor = floor;
        self.finish(changed);
        self.subscribers.publish(SettingsEvent::SpectrogramDbFloor(floor));
    }

    pub fn set_frequency_scale(&mut self, scale: FrequencyScale) {
        let changed = scale != self.frequency_scale;
        self.frequency_scale = scale;
        self.finish(changed);
        self.subscribers.publish(SettingsEvent::FrequencyScale(scale));
    }

    /// Fractional counts are truncated before validation.
    pub fn set_mel_filter_count(&mut self, value: f64) {
        let count = resolve_scalar(
            value.trunc(),
            MEL_FILTER_LIMITS,
            DEFAULT_MEL_FILTER_COUNT as f64,
        ) as usize;
        let changed = count != self.mel_filter_count;
        self.mel_filter_count = count;
        self.finish(changed);
        self.subscribers.publish(SettingsEvent::MelFilterCount(count));
    }

    pub fn reset_time_range(&mut self) {
        let default = self.pair_default(Pair::Time);
        self.apply_pair(Pair::Time, default, Echo::Both);
    }

    pub fn reset_amplitude_range(&mut self) {
        let default = self.pair_default(Pair::Amplitude);
        self.apply_pair(Pair::Amplitude, default, Echo::Both);
    }

    pub fn reset_frequency_range(&mut self) {
        let default = self.pair_default(Pair::Frequency);
        self.apply_pair(Pair::Frequency, default, Echo::Both);
    }

    // --- View parameters (never invalidate analysis) ---

    pub fn set_waveform_visible(&mut self, visible: bool) {
        self.waveform_visible = visible;
        self.subscribers.publish(SettingsEvent::WaveformVisible(visible));
    }

    pub fn set_spectrogram_visible(&mut self, visible: bool) {
        self.spectrogram_visible = visible;
        self.subscribers.publish(SettingsEvent::SpectrogramVisible(visible));
    }

    pub fn set_waveform_vertical_scale(&mut self, value: f64) {
        self.waveform_vertical_scale =
            resolve_scalar(value, VERTICAL_SCALE_LIMITS, DEFAULT_VERTICAL_SCALE);
        self.subscribers
            .publish(SettingsEvent::WaveformVerticalScale(self.waveform_vertical_scale));
    }

    pub fn set_spectrogram_vertical_scale(&mut self, value: f64) {
        self.spectrogram_vertical_scale =
            resolve_scalar(value, VERTICAL_SCALE_LIMITS, DEFAULT_VERTICAL_SCALE);
        self.subscribers.publish(SettingsEvent::SpectrogramVerticalScale(
            self.spectrogram_vertical_scale,
        ));
    }

    // --- internals ---

    fn pair(&self, pair: Pair) -> Interval {
        match pair {
            Pair::Frequency => self.frequency,
            Pair::Time => self.time,
            Pair::Amplitude => self.amplitude,
        }
    }

    fn pair_limits(&self, pair: Pair) -> Interval {
        match pair {
            Pair::Frequency => Interval::new(0.0, self.sample_rate / 2.0),
            Pair::Time => Interval::new(0.0, self.duration),
            Pair::Amplitude => AMPLITUDE_LIMITS,
        }
    }

    fn pair_default(&self, pair: Pair) -> Interval {
        match pair {
            Pair::Amplitude => self.buffer_amplitude,
            other => self.pair_limits(other),
        }
    }

    fn set_endpoint(&mut self, pair: Pair, echo: Echo, value: f64) {
        let current = self.pair(pair);
        let valid = self.pair_limits(pair);
        let default = self.pair_default(pair);
        let resolved = match echo {
            Echo::Min => resolve_range(value, current.max, valid, default),
            Echo::Max => resolve_range(current.min, value, valid, default),
            Echo::Both => default,
        };
        self.apply_pair(pair, resolved, echo);
    }

    fn apply_pair(&mut self, pair: Pair, resolved: Interval, echo: Echo) {
        let previous = self.pair(pair);
        match pair {
            Pair::Frequency => self.frequency = resolved,
            Pair::Time => self.time = resolved,
            Pair::Amplitude => self.amplitude = resolved,
        }

        let hop_changed = pair == Pair::Time && self.refresh_auto_hop();
        self.finish(previous != resolved || hop_changed);

        let (min_event, max_event) = match pair {
            Pair::Frequency => (
                SettingsEvent::MinFrequency(resolved.min),
                SettingsEvent::MaxFrequency(resolved.max),
            ),
            Pair::Time => (
                SettingsEvent::MinTime(resolved.min),
                SettingsEvent::MaxTime(resolved.max),
            ),
            Pair::Amplitude => (
                SettingsEvent::MinAmplitude(resolved.min),
                SettingsEvent::MaxAmplitude(resolved.max),
            ),
        };
        if matches!(echo, Echo::Min | Echo::Both) || previous.min != resolved.min {
            self.subscribers.publish(min_event);
        }
        if matches!(echo, Echo::Max | Echo::Both) || previous.max != resolved.max {
            self.subscribers.publish(max_event);
        }
        if hop_changed {
            self.subscribers.publish(SettingsEvent::AutoHopSize(self.hop_size));
        }
    }

    /// Recompute an unpinned hop size; returns whether it moved.
    fn refresh_auto_hop(&mut self) -> bool {
        if !self.auto_hop {
            return false;
        }
        let hop = auto_hop_size(self.window_size, self.time.min, self.time.max, self.sample_rate);
        let changed = hop != self.hop_size;
        self.hop_size = hop;
        changed
    }

    fn finish(&mut self, changed: bool) {
        if changed {
            self.regenerate_token();
        }
    }
}

/// Observed buffer extrema as the amplitude default pair, kept inside the
/// valid limits and widened when the buffer is flat.
fn amplitude_defaults((min, max): (f64, f64)) -> Interval {
    let min = min.clamp(AMPLITUDE_LIMITS.min, AMPLITUDE_LIMITS.max);
    let max = max.clamp(AMPLITUDE_LIMITS.min, AMPLITUDE_LIMITS.max);
    if max > min {
        Interval::new(min, max)
    } else {
        Interval::new(
            (min - 1.0).max(AMPLITUDE_LIMITS.min),
            (max + 1.0).min(AMPLITUDE_LIMITS.max),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_buffer() -> AudioBuffer {
        let samples: Vec<f32> = (0..44100)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin())
            .collect();
        AudioBuffer::new(vec![samples], 44100.0).unwrap()
    }

    fn store() -> SettingsStore {
        SettingsStore::from_default_setting(&AnalyzeDefault::default(), &sine_buffer())
    }

    fn drain(rx: &Receiver<SettingsEvent>) -> Vec<SettingsEvent> {
        rx.try_iter().collect()
    }

    #[test]
    fn defaults_without_config() {
        let s = store();
        assert_eq!(s.window_size(), 1024);
        assert_eq!(s.frequency_range(), Interval::new(0.0, 22050.0));
        assert_eq!(s.time_range(), Interval::new(0.0, 1.0));
        assert_eq!(s.amplitude_range(), s.buffer_amplitude());
        assert!((s.buffer_amplitude().max - 0.5).abs() < 1e-3);
        assert_eq!(s.spectrogram_db_floor(), -90.0);
        assert_eq!(s.frequency_scale(), FrequencyScale::Linear);
        assert_eq!(s.mel_filter_count(), 40);
        assert!(s.waveform_visible());
        assert!(s.spectrogram_visible());
        assert_eq!(s.waveform_vertical_scale(), 1.0);
    }

    #[test]
    fn config_values_are_validated() {
        let defaults = AnalyzeDefault {
            window_size_index: Some(4),
            min_frequency: Some(-10.0),
            max_frequency: Some(8000.0),
            spectrogram_db_floor: Some(-1200.0),
            mel_filter_count: Some(64.7),
            waveform_vertical_scale: Some(10.0),
            spectrogram_vertical_scale: Some(1.5),
            frequency_scale: Some(FrequencyScale::Mel),
            ..Default::default()
        };
        let s = SettingsStore::from_default_setting(&defaults, &sine_buffer());
        assert_eq!(s.window_size(), 4096);
        assert_eq!(s.frequency_range(), Interval::new(0.0, 8000.0));
        assert_eq!(s.spectrogram_db_floor(), -90.0);
        assert_eq!(s.mel_filter_count(), 64);
        assert_eq!(s.waveform_vertical_scale(), 1.0);
        assert_eq!(s.spectrogram_vertical_scale(), 1.5);
        assert_eq!(s.frequency_scale(), FrequencyScale::Mel);
    }

    #[test]
    fn invalid_pair_input_yields_defaults() {
        let mut s = store();
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, -1.0, 30000.0] {
            s.set_min_frequency(1000.0);
            s.set_max_frequency(bad);
            assert_eq!(s.frequency_range().max, 22050.0);
            assert!(s.frequency_range().min <= s.frequency_range().max);
        }
        s.set_min_time(f64::NAN);
        assert_eq!(s.time_range().min, 0.0);
        s.set_max_amplitude(101.0);
        assert_eq!(s.amplitude_range().max, s.buffer_amplitude().max);
        s.set_min_amplitude(-100.5);
        assert_eq!(s.amplitude_range().min, s.buffer_amplitude().min);
    }

    #[test]
    fn inverted_update_resets_both_ends() {
        let mut s = store();
        s.set_min_frequency(1000.0);
        s.set_max_frequency(5000.0);
        s.set_min_frequency(6000.0);
        assert_eq!(s.frequency_range(), Interval::new(0.0, 22050.0));

        s.set_min_time(0.2);
        s.set_max_time(0.2);
        assert_eq!(s.time_range(), Interval::new(0.0, 1.0));
    }

    #[test]
    fn valid_endpoint_leaves_other_end_alone() {
        let mut s = store();
        s.set_max_time(0.8);
        s.set_min_time(0.3);
        assert_eq!(s.time_range(), Interval::new(0.3, 0.8));
    }

    #[test]
    fn db_floor_range() {
        let mut s = store();
        s.set_spectrogram_db_floor(-120.0);
        assert_eq!(s.spectrogram_db_floor(), -120.0);
        s.set_spectrogram_db_floor(0.0);
        assert_eq!(s.spectrogram_db_floor(), -90.0);
        s.set_spectrogram_db_floor(-1000.5);
        assert_eq!(s.spectrogram_db_floor(), -90.0);
        s.set_spectrogram_db_floor(f64::NAN);
        assert_eq!(s.spectrogram_db_floor(), -90.0);
    }

    #[test]
    fn mel_filter_count_range() {
        let mut s = store();
        s.set_mel_filter_count(128.9);
        assert_eq!(s.mel_filter_count(), 128);
        s.set_mel_filter_count(19.0);
        assert_eq!(s.mel_filter_count(), 40);
        s.set_mel_filter_count(201.0);
        assert_eq!(s.mel_filter_count(), 40);
    }

    #[test]
    fn window_size_recomputes_hop_unless_pinned() {
        let buffer = AudioBuffer::silent(1, 44100 * 10, 44100.0).unwrap();
        let mut s = SettingsStore::from_default_setting(&AnalyzeDefault::default(), &buffer);
        s.set_min_time(2.0);
        s.set_max_time(6.0);
        assert_eq!(s.hop_size(), 392);

        s.set_window_size(2048);
        assert_eq!(s.hop_size(), 784);

        s.set_hop_size(300);
        s.set_window_size(1024);
        assert_eq!(s.hop_size(), 300);
        assert!(s.is_hop_pinned());

        s.unpin_hop_size();
        assert_eq!(s.hop_size(), 392);
    }

    #[test]
    fn time_edit_reports_auto_hop_separately() {
        let buffer = AudioBuffer::silent(1, 44100 * 10, 44100.0).unwrap();
        let mut s = SettingsStore::from_default_setting(&AnalyzeDefault::default(), &buffer);
        let rx = s.subscribe();
        let hop = s.hop_size();

        s.set_min_time(5.0);
        assert_ne!(s.hop_size(), hop);
        assert_eq!(
            drain(&rx),
            vec![SettingsEvent::MinTime(5.0), SettingsEvent::AutoHopSize(s.hop_size())]
        );

        s.set_hop_size(256);
        assert_eq!(drain(&rx), vec![SettingsEvent::HopSize(256)]);
    }

    #[test]
    fn unsupported_window_size_falls_back() {
        let mut s = store();
        s.set_window_size(1000);
        assert_eq!(s.window_size(), 1024);
        s.set_window_size_index(9);
        assert_eq!(s.window_size(), 1024);
    }

    #[test]
    fn resets_restore_exact_defaults() {
        let mut s = store();
        s.set_min_time(0.25);
        s.set_min_amplitude(-0.1);
        s.set_max_frequency(1000.0);
        s.reset_time_range();
        s.reset_amplitude_range();
        s.reset_frequency_range();
        assert_eq!(s.time_range(), Interval::new(0.0, 1.0));
        assert_eq!(s.amplitude_range(), s.buffer_amplitude());
        assert_eq!(s.frequency_range(), Interval::new(0.0, 22050.0));
    }

    #[test]
    fn changes_emit_events_and_new_token() {
        let mut s = store();
        let rx = s.subscribe();
        let before = s.token();

        s.set_min_frequency(100.0);
        assert_eq!(drain(&rx), vec![SettingsEvent::MinFrequency(100.0)]);
        let after = s.token();
        assert_ne!(before, after);

        // Rejected input still echoes the corrected value, token unchanged
        s.set_min_frequency(100.0);
        assert_eq!(drain(&rx), vec![SettingsEvent::MinFrequency(100.0)]);
        assert_eq!(s.token(), after);
    }

    #[test]
    fn pair_reset_echoes_both_ends() {
        let mut s = store();
        s.set_min_frequency(1000.0);
        s.set_max_frequency(2000.0);
        let rx = s.subscribe();
        s.set_min_frequency(3000.0);
        assert_eq!(
            drain(&rx),
            vec![
                SettingsEvent::MinFrequency(0.0),
                SettingsEvent::MaxFrequency(22050.0)
            ]
        );
    }

    #[test]
    fn display_changes_keep_token() {
        let mut s = store();
        let rx = s.subscribe();
        let token = s.token();
        s.set_waveform_visible(false);
        s.set_spectrogram_vertical_scale(1.5);
        assert_eq!(s.token(), token);
        assert_eq!(
            drain(&rx),
            vec![
                SettingsEvent::WaveformVisible(false),
                SettingsEvent::SpectrogramVerticalScale(1.5)
            ]
        );
    }

    #[test]
    fn snapshot_is_detached() {
        let mut s = store();
        let snap = s.snapshot();
        s.set_max_time(0.5);
        assert_eq!(snap.max_time, 1.0);
        assert_ne!(snap.token, s.token());
        assert_eq!(snap.end_sample(), 44100);
    }

    #[test]
    fn flat_buffer_gets_usable_amplitude_range() {
        let buffer = AudioBuffer::silent(1, 100, 8000.0).unwrap();
        let s = SettingsStore::from_default_setting(&AnalyzeDefault::default(), &buffer);
        assert_eq!(s.amplitude_range(), Interval::new(-1.0, 1.0));
    }
}
