//! Engine error types

use thiserror::Error;

/// Errors raised at the edges of the analysis engine.
///
/// Invalid settings input is never an error: setters substitute defaults.
/// Stale tiles are never an error either: they are dropped where they arrive.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The container or codec could not be decoded
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// The decoded buffer has no channels or no samples
    #[error("Audio buffer is empty")]
    EmptyBuffer,

    /// A request addressed a channel the buffer does not have
    #[error("Channel {channel} out of range (buffer has {channel_count})")]
    ChannelOutOfRange { channel: usize, channel_count: usize },

    /// The transform provider went away
    #[error("Transform provider unavailable")]
    ProviderUnavailable,

    /// A host message arrived that the session could not use
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
