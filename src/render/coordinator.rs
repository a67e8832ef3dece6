use crossbeam::channel::Receiver;
use std::sync::Arc;
use std::time::Duration;

use super::axis::{amplitude_ticks, frequency_ticks, time_ticks};
use super::overlay::SeekOverlay;
use super::surface::{AxisSide, FigureKind, FigureSurface, SurfaceFactory, TilePlacement};
use super::waveform::{BatchOutcome, WaveformDrawer};
use crate::audio::AudioBuffer;
use crate::settings::{AnalyzeSettingsSnapshot, AnalyzeToken, ChangeKind, SettingsEvent, SettingsStore};
use crate::spectrogram::{SpectrogramPipeline, SpectrogramTile, TransformProvider};
use crate::transport::TransportEvent;

/// How long `run_until_idle` blocks for a tile when nothing else is left.
const TILE_WAIT: Duration = Duration::from_millis(50);

struct Figure {
    kind: FigureKind,
    channel: usize,
    settings: AnalyzeSettingsSnapshot,
    surface: Box<dyn FigureSurface>,
    waveform: Option<WaveformDrawer>,
}

impl Figure {
    fn paint_axes(&mut self) {
        self.surface
            .paint_axis(AxisSide::Horizontal, &time_ticks(&self.settings));
        let vertical = match self.kind {
            FigureKind::Waveform => amplitude_ticks(&self.settings),
            FigureKind::Spectrogram => frequency_ticks(&self.settings),
        };
        self.surface.paint_axis(AxisSide::Vertical, &vertical);
    }
}

/// Drives the figures of one open document.
///
/// Owns the settings, the spectrogram pipeline and one waveform and one
/// spectrogram figure per channel. Work is done in cooperative turns so a
/// host can interleave it with input handling.
pub struct Analyzer<F: SurfaceFactory> {
    buffer: Arc<AudioBuffer>,
    settings: SettingsStore,
    settings_events: Receiver<SettingsEvent>,
    transport_events: Option<Receiver<TransportEvent>>,
    pipeline: SpectrogramPipeline,
    factory: F,
    figures: Vec<Figure>,
    overlay: Option<SeekOverlay>,
    seek_value: f64,
    current: Option<AnalyzeToken>,
}

impl<F: SurfaceFactory> Analyzer<F> {
    pub fn new(
        buffer: Arc<AudioBuffer>,
        mut settings: SettingsStore,
        provider: Option<Box<dyn TransformProvider>>,
        factory: F,
    ) -> Self {
        let settings_events = settings.subscribe();
        let pipeline = SpectrogramPipeline::new(provider, buffer.channel_count());
        Self {
            buffer,
            settings,
            settings_events,
            transport_events: None,
            pipeline,
            factory,
            figures: Vec::new(),
            overlay: None,
            seek_value: 0.0,
            current: None,
        }
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    /// Changes are picked up on the next turn.
    pub fn settings_mut(&mut self) -> &mut SettingsStore {
        &mut self.settings
    }

    pub fn attach_transport(&mut self, events: Receiver<TransportEvent>) {
        self.transport_events = Some(events);
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn pipeline(&self) -> &SpectrogramPipeline {
        &self.pipeline
    }

    /// Token of the analysis on screen, if any.
    pub fn current_token(&self) -> Option<AnalyzeToken> {
        self.current
    }

    pub fn figure_count(&self) -> usize {
        self.figures.len()
    }

    pub fn overlay(&self) -> Option<&SeekOverlay> {
        self.overlay.as_ref()
    }

    /// Called once the buffer is loaded: analyze right away when the host
    /// asked for it, otherwise wait for an explicit `analyze()`.
    pub fn activate(&mut self, auto_analyze: bool) {
        if auto_analyze {
            self.analyze();
        } else {
            log::info!("Auto analyze is off, waiting for an explicit analysis");
        }
    }

    /// Throw away every figure and start a fresh analysis.
    pub fn analyze(&mut self) {
        // anything queued so far is covered by this analysis
        while self.settings_events.try_recv().is_ok() {}

        for mut figure in self.figures.drain(..) {
            figure.surface.dispose();
        }

        let token = self.settings.regenerate_token();
        let snapshot = self.settings.snapshot();
        self.current = Some(token);
        self.pipeline.set_token(token);

        log::info!(
            "Analyzing {} channel(s): {:.3}-{:.3}s window={} hop={} scale={:?}",
            self.buffer.channel_count(),
            snapshot.min_time,
            snapshot.max_time,
            snapshot.window_size,
            snapshot.hop_size,
            snapshot.frequency_scale
        );

        for channel in 0..self.buffer.channel_count() {
            let waveform = self.create_figure(FigureKind::Waveform, channel, &snapshot);
            self.figures.push(waveform);
            let spectrogram = self.create_figure(FigureKind::Spectrogram, channel, &snapshot);
            self.figures.push(spectrogram);
            self.pipeline.start_channel(channel, &snapshot);
        }

        self.reset_overlay(&snapshot);
    }

    /// Re-bind the existing figures to the current visible window and
    /// restart their content.
    pub fn window_changed(&mut self) {
        if self.figures.is_empty() {
            self.analyze();
            return;
        }
        while self.settings_events.try_recv().is_ok() {}

        let token = self.settings.regenerate_token();
        let snapshot = self.settings.snapshot();
        self.current = Some(token);
        self.pipeline.set_token(token);
        log::debug!("Window changed: {:.3}-{:.3}s", snapshot.min_time, snapshot.max_time);

        for figure in &mut self.figures {
            figure.settings = snapshot.clone();
            figure.surface.clear(token);
            figure.paint_axes();
            if figure.kind == FigureKind::Waveform {
                figure.waveform = Some(WaveformDrawer::new(&snapshot, self.buffer.len()));
            }
        }
        for channel in 0..self.buffer.channel_count() {
            self.pipeline.start_channel(channel, &snapshot);
        }

        self.reset_overlay(&snapshot);
    }

    /// A drag on the seek overlay. Returns the transport seek value to
    /// apply, or `None` before the first analysis.
    pub fn on_overlay_input(&mut self, value: f64) -> Option<f64> {
        self.overlay.as_mut().map(|o| o.on_input(value))
    }

    /// All waveforms are drawn and no tile is outstanding.
    pub fn is_idle(&self) -> bool {
        self.pipeline.is_idle()
            && self
                .figures
                .iter()
                .all(|f| f.waveform.as_ref().map_or(true, WaveformDrawer::is_done))
    }

    /// One cooperative turn: apply pending events, paint one waveform batch
    /// per figure and any tiles that are ready. Returns true while work
    /// remains.
    pub fn run_turn(&mut self) -> bool {
        self.drain_settings_events();
        self.drain_transport_events();
        self.draw_waveform_batches();
        let tiles = self.pipeline.poll();
        self.paint_tiles(tiles);
        !self.is_idle()
    }

    /// Run turns until idle or `max_turns` ran out. Returns the number of
    /// turns taken.
    pub fn run_until_idle(&mut self, max_turns: usize) -> usize {
        let mut turns = 0;
        while turns < max_turns {
            turns += 1;
            if !self.run_turn() {
                break;
            }
            let waveforms_done = self
                .figures
                .iter()
                .all(|f| f.waveform.as_ref().map_or(true, WaveformDrawer::is_done));
            if waveforms_done && !self.pipeline.is_idle() {
                let tiles = self.pipeline.wait(TILE_WAIT);
                self.paint_tiles(tiles);
            }
        }
        turns
    }

    fn create_figure(
        &mut self,
        kind: FigureKind,
        channel: usize,
        snapshot: &AnalyzeSettingsSnapshot,
    ) -> Figure {
        let mut surface = self.factory.create(kind, channel);
        surface.clear(snapshot.token);
        let (visible, scale) = match kind {
            FigureKind::Waveform => (
                self.settings.waveform_visible(),
                self.settings.waveform_vertical_scale(),
            ),
            FigureKind::Spectrogram => (
                self.settings.spectrogram_visible(),
                self.settings.spectrogram_vertical_scale(),
            ),
        };
        surface.set_visible(visible);
        surface.set_vertical_scale(scale);

        let waveform = (kind == FigureKind::Waveform)
            .then(|| WaveformDrawer::new(snapshot, self.buffer.len()));
        let mut figure = Figure {
            kind,
            channel,
            settings: snapshot.clone(),
            surface,
            waveform,
        };
        figure.paint_axes();
        figure
    }

    fn reset_overlay(&mut self, snapshot: &AnalyzeSettingsSnapshot) {
        let mut overlay = SeekOverlay::new(snapshot, self.buffer.duration());
        overlay.update(self.seek_value);
        self.overlay = Some(overlay);
    }

    fn drain_settings_events(&mut self) {
        let mut pending: Option<ChangeKind> = None;
        while let Ok(event) = self.settings_events.try_recv() {
            if event.invalidates_analysis() {
                pending = pending.max(Some(event.kind()));
                continue;
            }
            match event {
                SettingsEvent::WaveformVisible(visible) => {
                    self.for_kind(FigureKind::Waveform, |s| s.set_visible(visible))
                }
                SettingsEvent::SpectrogramVisible(visible) => {
                    self.for_kind(FigureKind::Spectrogram, |s| s.set_visible(visible))
                }
                SettingsEvent::WaveformVerticalScale(scale) => {
                    self.for_kind(FigureKind::Waveform, |s| s.set_vertical_scale(scale))
                }
                SettingsEvent::SpectrogramVerticalScale(scale) => {
                    self.for_kind(FigureKind::Spectrogram, |s| s.set_vertical_scale(scale))
                }
                _ => {}
            }
        }

        // echoes of unchanged values keep the token
        if self.current.is_none() || Some(self.settings.token()) == self.current {
            return;
        }
        match pending {
            Some(ChangeKind::Destructive) => self.analyze(),
            Some(ChangeKind::Window) => self.window_changed(),
            _ => {}
        }
    }

    fn drain_transport_events(&mut self) {
        let Some(events) = self.transport_events.as_ref() else {
            return;
        };
        let mut latest = None;
        while let Ok(event) = events.try_recv() {
            if let TransportEvent::Position { seek_value, .. } = event {
                latest = Some(seek_value);
            }
        }
        if let Some(seek_value) = latest {
            self.seek_value = seek_value;
            if let Some(overlay) = self.overlay.as_mut() {
                overlay.update(seek_value);
            }
        }
    }

    fn for_kind(&mut self, kind: FigureKind, mut apply: impl FnMut(&mut dyn FigureSurface)) {
        for figure in self.figures.iter_mut().filter(|f| f.kind == kind) {
            apply(figure.surface.as_mut());
        }
    }

    fn draw_waveform_batches(&mut self) {
        let Some(current) = self.current else {
            return;
        };
        for figure in &mut self.figures {
            let Some(drawer) = figure.waveform.as_mut() else {
                continue;
            };
            let Some(samples) = self.buffer.channel(figure.channel) else {
                continue;
            };
            if drawer.draw_batch(samples, current, figure.surface.as_mut()) == BatchOutcome::Stale {
                figure.waveform = None;
            }
        }
    }

    fn paint_tiles(&mut self, tiles: Vec<SpectrogramTile>) {
        for tile in tiles {
            let Some(figure) = self.figures.iter_mut().find(|f| {
                f.kind == FigureKind::Spectrogram
                    && f.channel == tile.channel
                    && f.settings.token == tile.token
            }) else {
                log::debug!("No figure for tile ch{}", tile.channel);
                continue;
            };
            let start = figure.settings.start_sample() as f64;
            let whole = (figure.settings.end_sample() as f64 - start).max(1.0);
            let placement = TilePlacement {
                x_start: (tile.sample_start as f64 - start) / whole,
                x_end: (tile.sample_end as f64 - start) / whole,
                frame_width: figure.settings.hop_size as f64 / whole,
            };
            figure.surface.paint_tile(placement, &tile);
        }
    }
}
