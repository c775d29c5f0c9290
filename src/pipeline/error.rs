//! Lifecycle errors
//!
//! Every error here is recoverable: the context is left in a consistent
//! state and the caller may fix the cause and retry. Per-frame failures are
//! not errors at this level, see [`super::stats`].

use std::io;

use thiserror::Error;

use crate::encoder::{CodecError, CodecId};

/// Errors returned by [`super::EncodingContext`] operations
#[derive(Debug, Error)]
pub enum PipelineError {
    /// `open` without a codec identifier or pre-supplied handle, or `start`
    /// before any codec was opened
    #[error("No codec specified")]
    NoCodecSpecified,

    /// No implementation registered for the identifier
    #[error("Codec not found: {0}")]
    CodecNotFound(CodecId),

    /// The implementation rejected the configuration
    #[error("Could not open codec {codec}: {source}")]
    CouldNotOpenCodec {
        codec: CodecId,
        #[source]
        source: CodecError,
    },

    /// Width or height is not positive
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: i32, height: i32 },

    /// The output sink could not be opened or the descriptor is unusable
    #[error("Invalid output target: {0}")]
    InvalidOutputTarget(String),

    /// `start` while the worker is running
    #[error("Encoder already running")]
    AlreadyRunning,

    /// `stop` while the worker is not running
    #[error("Encoder already stopped")]
    AlreadyStopped,

    /// The OS refused to create the worker thread
    #[error("Failed to spawn encoding worker: {0}")]
    WorkerSpawn(#[source] io::Error),
}

/// Result type for lifecycle operations
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display() {
        let err = PipelineError::InvalidDimensions {
            width: 0,
            height: -5,
        };
        assert_eq!(err.to_string(), "Invalid dimensions: 0x-5");

        let err = PipelineError::CodecNotFound(CodecId::new("X"));
        assert_eq!(err.to_string(), "Codec not found: X");
    }

    #[test]
    fn test_open_error_keeps_source() {
        let err = PipelineError::CouldNotOpenCodec {
            codec: CodecId::RAWVIDEO,
            source: CodecError::UnsupportedConfig("odd width".into()),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("rawvideo"));
    }
}
