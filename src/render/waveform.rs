use super::surface::FigureSurface;
use crate::settings::{AnalyzeSettingsSnapshot, AnalyzeToken};

/// Samples painted per scheduling turn.
pub const WAVEFORM_BATCH: usize = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Painted one batch, more remain
    Painted(usize),
    /// The whole window has been painted
    Done,
    /// The analysis this drawer belongs to was superseded
    Stale,
}

/// Paints one channel's visible samples a batch at a time.
#[derive(Clone, Debug)]
pub struct WaveformDrawer {
    token: AnalyzeToken,
    start: usize,
    end: usize,
    next: usize,
    batch: usize,
    min_amplitude: f64,
    max_amplitude: f64,
}

impl WaveformDrawer {
    pub fn new(settings: &AnalyzeSettingsSnapshot, channel_len: usize) -> Self {
        let start = settings.start_sample().min(channel_len);
        let end = settings.end_sample().clamp(start, channel_len);
        Self {
            token: settings.token,
            start,
            end,
            next: start,
            batch: WAVEFORM_BATCH,
            min_amplitude: settings.min_amplitude,
            max_amplitude: settings.max_amplitude,
        }
    }

    pub fn with_batch(mut self, batch: usize) -> Self {
        self.batch = batch.max(1);
        self
    }

    pub fn is_done(&self) -> bool {
        self.next >= self.end
    }

    /// Paint the next batch unless `current` has moved on.
    pub fn draw_batch(
        &mut self,
        samples: &[f32],
        current: AnalyzeToken,
        surface: &mut dyn FigureSurface,
    ) -> BatchOutcome {
        if current != self.token {
            return BatchOutcome::Stale;
        }
        if self.is_done() {
            return BatchOutcome::Done;
        }

        let batch_end = (self.next + self.batch).min(self.end);
        let width = (self.end - self.start) as f64;
        let range = self.max_amplitude - self.min_amplitude;

        let points: Vec<(f64, f64)> = (self.next..batch_end)
            .filter_map(|i| {
                let y = (samples.get(i).copied()? as f64 - self.min_amplitude) / range;
                // outside the amplitude window
                if !(0.0..=1.0).contains(&y) {
                    return None;
                }
                Some(((i - self.start) as f64 / width, y))
            })
            .collect();
        surface.paint_points(&points);

        self.next = batch_end;
        if self.is_done() {
            BatchOutcome::Done
        } else {
            BatchOutcome::Painted(points.len())
        }
    }
}
