pub mod axis;
pub mod coordinator;
pub mod overlay;
pub mod surface;
pub mod waveform;

pub use coordinator::Analyzer;
pub use overlay::SeekOverlay;
pub use surface::{
    AxisSide, AxisTick, FigureKind, FigureLog, FigureSurface, RecordingFactory, RecordingSurface,
    SurfaceFactory, TilePlacement,
};
