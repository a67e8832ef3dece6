pub mod pipeline;
pub mod request;
pub mod scale;
pub mod transform;

pub use pipeline::{SpectrogramPipeline, DEFAULT_CHUNK_SAMPLES};
pub use request::{SpectrogramRequest, SpectrogramTile};
pub use scale::FrequencyBins;
pub use transform::{compute_tile, FftProvider, TransformProvider, WorkerProvider};
