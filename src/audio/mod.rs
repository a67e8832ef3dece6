pub mod buffer;
pub mod decode;

pub use buffer::AudioBuffer;
