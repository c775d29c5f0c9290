//! Codec abstraction driven by the encoding pipeline
//!
//! The pipeline never compresses pixels itself. It drives a [`VideoCodec`]
//! handle produced by a [`CodecBackend`], looked up by [`CodecId`] in a
//! [`CodecRegistry`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  CodecRegistry                       │
//! │        CodecId ──> Arc<dyn CodecBackend>             │
//! └─────────────────────────────────────────────────────┘
//!                          │ open(&EncoderConfig)
//!          ┌───────────────┴───────────────┐
//!          ▼                               ▼
//!    ┌──────────┐                   ┌──────────────┐
//!    │ rawvideo │                   │ h264         │
//!    │ (packed  │                   │ (OpenH264,   │
//!    │  I420)   │                   │  feature)    │
//!    └──────────┘                   └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use lamco_capture_encoder::encoder::{CodecId, CodecRegistry, EncoderConfig, EncoderTuning};
//!
//! let registry = CodecRegistry::with_defaults();
//! let config = EncoderConfig::new(640, 480, &EncoderTuning::default());
//! let mut codec = registry.open(&CodecId::RAWVIDEO, &config)?;
//!
//! if let Some(packet) = codec.encode(Some(&planes), 0)? {
//!     sink.write_all(&packet.data)?;
//! }
//! // End of stream: keep asking until the codec has nothing left
//! while let Some(packet) = codec.encode(None, next_pts)? { /* ... */ }
//! ```

mod config;
mod error;
mod rawvideo;
mod registry;

#[cfg(feature = "h264")]
pub mod h264;

use std::borrow::Cow;
use std::fmt;

pub use config::{ColorSpace, EncoderConfig, EncoderTuning, PixelFormat, Rational};
pub use error::{CodecError, CodecResult};
pub use rawvideo::{RawVideoBackend, RawVideoCodec};
pub use registry::CodecRegistry;

/// Identifier of a codec implementation
///
/// Identifiers are plain names ("rawvideo", "h264"). Backends registered at
/// runtime may use any name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CodecId(Cow<'static, str>);

impl CodecId {
    /// Uncompressed packed I420 output
    pub const RAWVIDEO: CodecId = CodecId(Cow::Borrowed("rawvideo"));

    /// H.264 Annex B output via OpenH264
    pub const H264: CodecId = CodecId(Cow::Borrowed("h264"));

    /// Create an identifier from any name
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Name of the codec
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for CodecId {
    fn from(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }
}

impl From<String> for CodecId {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

/// Borrowed view of one planar 4:2:0 frame
///
/// The luma plane is `width x height` bytes with stride `y_stride`; both
/// chroma planes are quarter size with stride `uv_stride`.
#[derive(Debug, Clone, Copy)]
pub struct YuvPlanes<'a> {
    /// Luma plane
    pub y: &'a [u8],
    /// Cb plane
    pub u: &'a [u8],
    /// Cr plane
    pub v: &'a [u8],
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Luma row stride in bytes
    pub y_stride: usize,
    /// Chroma row stride in bytes
    pub uv_stride: usize,
}

impl YuvPlanes<'_> {
    /// Strides as (y, u, v)
    pub fn strides(&self) -> (usize, usize, usize) {
        (self.y_stride, self.uv_stride, self.uv_stride)
    }
}

/// Compressed output unit emitted by a codec
#[derive(Debug, Clone)]
pub struct EncodedPacket {
    /// Encoded bitstream bytes
    pub data: Vec<u8>,

    /// Presentation timestamp of the frame this packet belongs to
    pub pts: u64,

    /// Whether this packet starts a group of pictures
    pub is_keyframe: bool,
}

impl EncodedPacket {
    /// Create a new packet
    pub fn new(data: Vec<u8>, pts: u64, is_keyframe: bool) -> Self {
        Self {
            data,
            pts,
            is_keyframe,
        }
    }

    /// Encoded size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// An opened, fully configured encoder instance
///
/// A handle is owned by exactly one party at a time: the encoding context
/// while configured, the encoding worker while running. Dropping the handle
/// releases the codec.
///
/// # Thread Safety
///
/// Handles must be `Send` because they move onto the worker thread at start
/// and back at close. They are never shared.
pub trait VideoCodec: Send {
    /// Identifier of the codec this handle was opened for
    fn codec_id(&self) -> CodecId;

    /// Configuration the handle was opened with
    fn config(&self) -> &EncoderConfig;

    /// Submit one frame, or end of input when `frame` is `None`
    ///
    /// # Returns
    ///
    /// - `Ok(Some(packet))` - the codec emitted a packet
    /// - `Ok(None)` - nothing to emit for this input (look-ahead, or fully
    ///   drained when `frame` is `None`)
    /// - `Err(e)` - the submission failed
    fn encode(
        &mut self,
        frame: Option<&YuvPlanes<'_>>,
        pts: u64,
    ) -> CodecResult<Option<EncodedPacket>>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Factory for [`VideoCodec`] handles of one codec
#[cfg_attr(test, mockall::automock)]
pub trait CodecBackend: Send + Sync {
    /// Identifier this backend implements
    fn codec_id(&self) -> CodecId;

    /// Open a handle with the given configuration
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the implementation rejects the configuration.
    fn open(&self, config: &EncoderConfig) -> CodecResult<Box<dyn VideoCodec>>;
}

/// Check that a frame matches the dimensions a codec was opened with
pub(crate) fn check_frame_dimensions(
    config: &EncoderConfig,
    frame: &YuvPlanes<'_>,
) -> CodecResult<()> {
    if frame.width != config.width || frame.height != config.height {
        return Err(CodecError::FrameMismatch {
            width: frame.width,
            height: frame.height,
            expected_width: config.width,
            expected_height: config.height,
        });
    }
    Ok(())
}
