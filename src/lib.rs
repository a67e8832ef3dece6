pub mod audio;
pub mod config;
pub mod error;
pub mod protocol;
pub mod render;
pub mod session;
pub mod settings;
pub mod spectrogram;
pub mod transport;

pub use error::{EngineError, EngineResult};
