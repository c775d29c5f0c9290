//! Error types for codec implementations
//!
//! Backends report configuration rejections and per-frame failures through
//! [`CodecError`]. The pipeline maps open failures to
//! `PipelineError::CouldNotOpenCodec` and only logs per-frame failures.

use thiserror::Error;

/// Error type for codec operations
#[derive(Debug, Error)]
pub enum CodecError {
    // =========================================================================
    // Open Errors
    // =========================================================================
    /// The requested configuration is not supported by this codec
    #[error("Unsupported configuration: {0}")]
    UnsupportedConfig(String),

    /// The codec failed to initialize
    #[error("Encoder initialization failed: {0}")]
    InitFailed(String),

    // =========================================================================
    // Runtime Encoding Errors
    // =========================================================================
    /// Frame encoding failed
    #[error("Encode failed: {0}")]
    EncodeFailed(String),

    /// Frame does not match the configured dimensions
    #[error("Frame is {width}x{height}, encoder expects {expected_width}x{expected_height}")]
    FrameMismatch {
        width: u32,
        height: u32,
        expected_width: u32,
        expected_height: u32,
    },
}

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;
