use crate::settings::AnalyzeSettingsSnapshot;

/// The seek bar drawn across every figure of one analysis.
///
/// It shows where the transport is inside the visible time window and turns
/// drags on the figures back into transport seek values.
#[derive(Clone, Debug, PartialEq)]
pub struct SeekOverlay {
    min_time: f64,
    max_time: f64,
    duration: f64,
    /// Width of the played part, in percent of the figure
    position_percent: f64,
    /// Value of the drag input; rests at 100
    input_value: f64,
}

impl SeekOverlay {
    pub fn new(settings: &AnalyzeSettingsSnapshot, duration: f64) -> Self {
        Self {
            min_time: settings.min_time,
            max_time: settings.max_time,
            duration,
            position_percent: 0.0,
            input_value: 100.0,
        }
    }

    pub fn position_percent(&self) -> f64 {
        self.position_percent
    }

    pub fn input_value(&self) -> f64 {
        self.input_value
    }

    /// Follow a transport seek value (percent of the whole file).
    ///
    /// Returns true when the position is past the visible window.
    pub fn update(&mut self, seek_value: f64) -> bool {
        let t = seek_value * self.duration / 100.0;
        let span = self.max_time - self.min_time;
        let v = if span > 0.0 {
            (t - self.min_time) / span * 100.0
        } else {
            0.0
        };
        self.position_percent = v.clamp(0.0, 100.0);
        v > 100.0
    }

    /// Turn a drag to `value` (percent of the visible window) into a
    /// transport seek value, and snap the input back to rest.
    pub fn on_input(&mut self, value: f64) -> f64 {
        let span = self.max_time - self.min_time;
        let t = value / 100.0 * span + self.min_time;
        self.input_value = 100.0;
        if self.duration > 0.0 {
            t / self.duration * 100.0
        } else {
            0.0
        }
    }
}
