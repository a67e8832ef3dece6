use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;

use crate::settings::AnalyzeToken;
use crate::spectrogram::SpectrogramTile;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FigureKind {
    Waveform,
    Spectrogram,
}

/// Which edge of a figure an axis belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisSide {
    Horizontal,
    Vertical,
}

/// One gridline. `position` is a fraction of the figure: left to right for
/// horizontal axes, top to bottom for vertical ones.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AxisTick {
    pub position: f64,
    pub label: Option<String>,
}

/// Where a tile lands horizontally, as fractions of the figure width.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TilePlacement {
    pub x_start: f64,
    pub x_end: f64,
    /// Width of one frame rectangle
    pub frame_width: f64,
}

/// Drawing target for one figure.
///
/// Coordinates are normalized: `x` in `[0, 1]` left to right, `y` in
/// `[0, 1]` bottom to top.
pub trait FigureSurface {
    fn clear(&mut self, token: AnalyzeToken);
    fn paint_points(&mut self, points: &[(f64, f64)]);
    fn paint_tile(&mut self, placement: TilePlacement, tile: &SpectrogramTile);
    fn paint_axis(&mut self, side: AxisSide, ticks: &[AxisTick]);
    fn set_visible(&mut self, visible: bool);
    fn set_vertical_scale(&mut self, scale: f64);
    /// The figure was removed; nothing will be drawn on it again.
    fn dispose(&mut self);
}

pub trait SurfaceFactory {
    fn create(&mut self, kind: FigureKind, channel: usize) -> Box<dyn FigureSurface>;
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TileRecord {
    pub sample_start: usize,
    pub sample_end: usize,
    pub token: u64,
    pub frames: usize,
    pub bins: usize,
    pub placement: TilePlacement,
    /// Mean normalized magnitude over the tile
    pub mean: f32,
}

/// Everything a [`RecordingSurface`] was asked to draw.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FigureLog {
    pub kind: FigureKind,
    pub channel: usize,
    pub token: Option<u64>,
    pub clears: usize,
    pub points: usize,
    pub tiles: Vec<TileRecord>,
    pub horizontal_axis: Vec<AxisTick>,
    pub vertical_axis: Vec<AxisTick>,
    pub visible: bool,
    pub vertical_scale: f64,
    pub disposed: bool,
}

impl FigureLog {
    fn new(kind: FigureKind, channel: usize) -> Self {
        Self {
            kind,
            channel,
            token: None,
            clears: 0,
            points: 0,
            tiles: Vec::new(),
            horizontal_axis: Vec::new(),
            vertical_axis: Vec::new(),
            visible: true,
            vertical_scale: 1.0,
            disposed: false,
        }
    }
}

/// Headless surface that keeps a log of draw calls instead of pixels.
pub struct RecordingSurface {
    log: Rc<RefCell<FigureLog>>,
}

impl RecordingSurface {
    pub fn new(kind: FigureKind, channel: usize) -> Self {
        Self {
            log: Rc::new(RefCell::new(FigureLog::new(kind, channel))),
        }
    }

    pub fn log(&self) -> FigureLog {
        self.log.borrow().clone()
    }
}

impl FigureSurface for RecordingSurface {
    fn clear(&mut self, token: AnalyzeToken) {
        let mut log = self.log.borrow_mut();
        log.token = Some(token.as_u64());
        log.clears += 1;
        log.points = 0;
        log.tiles.clear();
    }

    fn paint_points(&mut self, points: &[(f64, f64)]) {
        self.log.borrow_mut().points += points.len();
    }

    fn paint_tile(&mut self, placement: TilePlacement, tile: &SpectrogramTile) {
        let cells = tile.frame_count() * tile.bin_count();
        let sum: f32 = tile.magnitude_frames.iter().flatten().sum();
        self.log.borrow_mut().tiles.push(TileRecord {
            sample_start: tile.sample_start,
            sample_end: tile.sample_end,
            token: tile.token.as_u64(),
            frames: tile.frame_count(),
            bins: tile.bin_count(),
            placement,
            mean: if cells == 0 { 0.0 } else { sum / cells as f32 },
        });
    }

    fn paint_axis(&mut self, side: AxisSide, ticks: &[AxisTick]) {
        let mut log = self.log.borrow_mut();
        match side {
            AxisSide::Horizontal => log.horizontal_axis = ticks.to_vec(),
            AxisSide::Vertical => log.vertical_axis = ticks.to_vec(),
        }
    }

    fn set_visible(&mut self, visible: bool) {
        self.log.borrow_mut().visible = visible;
    }

    fn set_vertical_scale(&mut self, scale: f64) {
        self.log.borrow_mut().vertical_scale = scale;
    }

    fn dispose(&mut self) {
        self.log.borrow_mut().disposed = true;
    }
}

/// Creates [`RecordingSurface`]s and keeps a handle on every log so the
/// result can be inspected after the figures are gone.
#[derive(Clone, Default)]
pub struct RecordingFactory {
    logs: Rc<RefCell<Vec<Rc<RefCell<FigureLog>>>>>,
}

impl RecordingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs of every figure created so far, disposed ones included.
    pub fn all(&self) -> Vec<FigureLog> {
        self.logs.borrow().iter().map(|l| l.borrow().clone()).collect()
    }

    /// Logs of figures that are still on screen.
    pub fn live(&self) -> Vec<FigureLog> {
        self.all().into_iter().filter(|l| !l.disposed).collect()
    }
}

impl SurfaceFactory for RecordingFactory {
    fn create(&mut self, kind: FigureKind, channel: usize) -> Box<dyn FigureSurface> {
        let surface = RecordingSurface::new(kind, channel);
        self.logs.borrow_mut().push(Rc::clone(&surface.log));
        Box::new(surface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_resets_content_and_records_token() {
        let mut factory = RecordingFactory::new();
        let mut surface = factory.create(FigureKind::Waveform, 1);
        surface.paint_points(&[(0.0, 0.5), (0.1, 0.6)]);
        let token = AnalyzeToken::from_u64(7);
        surface.clear(token);

        let log = &factory.all()[0];
        assert_eq!(log.channel, 1);
        assert_eq!(log.points, 0);
        assert_eq!(log.clears, 1);
        assert_eq!(log.token, Some(7));
    }

    #[test]
    fn disposed_figures_leave_the_live_set() {
        let mut factory = RecordingFactory::new();
        let mut a = factory.create(FigureKind::Waveform, 0);
        let _b = factory.create(FigureKind::Spectrogram, 0);
        a.dispose();
        assert_eq!(factory.all().len(), 2);
        let live = factory.live();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].kind, FigureKind::Spectrogram);
    }
}
