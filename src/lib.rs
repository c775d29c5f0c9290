//! # lamco-capture-encoder
//!
//! Camera frame encoding pipeline: ordered hand-off from a capture producer
//! to a dedicated encoding thread, with graceful drain on shutdown.
//!
//! This crate integrates:
//! - [`pipeline`] - frame queue, encoding worker and lifecycle context
//! - [`encoder`] - codec abstraction (`rawvideo`, OpenH264 `h264`)
//! - [`config`] - TOML configuration for the command-line tool
//!
//! # Architecture
//!
//! ```text
//! lamco-capture-encoder
//!   ├─> FrameProducer (capture thread pushes RawFrames)
//!   ├─> FrameQueue (Mutex + Condvar FIFO)
//!   ├─> EncodingWorker ("encoding-worker" thread)
//!   │     ├─> VideoCodec (from CodecRegistry)
//!   │     └─> write_all → output sink (file, fd, writer)
//!   └─> EncodingContext (open / start / stop / close)
//! ```
//!
//! # Data Flow
//!
//! **Live:** Capture → FrameQueue → encode(frame, seq) → Sink
//!
//! **Stop:** drain FrameQueue → encode(None, seq) until empty → join → release

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Command-line tool configuration
pub mod config;

/// Codec abstraction and backends
pub mod encoder;

/// Capture-to-bitstream encoding pipeline
pub mod pipeline;

pub use encoder::{CodecId, CodecRegistry, EncoderConfig, EncoderTuning};
pub use pipeline::{
    ContextSettings, EncoderState, EncodingContext, FrameProducer, OutputTarget, PipelineError,
    PipelineStats, PlaneLayout, RawFrame,
};
