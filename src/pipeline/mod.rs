//! Capture-to-bitstream encoding pipeline
//!
//! A single producer (the capture side) pushes [`RawFrame`]s; a single
//! consumer (the encoding worker thread) encodes them in arrival order and
//! writes every packet to the output sink. Stopping drains the queue and then
//! the codec, so no frame accepted before `stop` is lost.
//!
//! # Architecture
//!
//! ```text
//!  capture thread                         encoding-worker thread
//!  ──────────────                         ──────────────────────
//!  FrameProducer::push ──> FrameQueue ──> pop_blocking
//!                     (Mutex + Condvar)        │
//!                                              ▼
//!                                       VideoCodec::encode(frame, seq)
//!                                              │ packet
//!                                              ▼
//!                                       write_all(sink) ──> output
//!
//!  stop: running = false, notify_all ──> worker drains queue,
//!                                        then encode(None, seq) until empty
//! ```
//!
//! # Lifecycle
//!
//! [`EncodingContext`] owns the codec, the sink and the worker handle and
//! moves through [`EncoderState`]: `Idle → Configured → Running → Stopping →
//! Closed`. Lifecycle misuse returns a [`PipelineError`]; per-frame failures
//! are counted in [`PipelineStats`] and reported through a [`FrameObserver`].

mod context;
mod error;
mod frame;
mod lifecycle;
mod output;
mod queue;
mod stats;
mod worker;
mod writer;

pub use context::{ContextSettings, EncodingContext, FrameProducer};
pub use error::{PipelineError, PipelineResult};
pub use frame::{FrameError, PlaneLayout, RawFrame};
pub use lifecycle::EncoderState;
pub use output::OutputTarget;
pub use queue::FrameQueue;
pub use stats::{FrameObserver, FrameOutcome, FrameReport, PipelineStats};
pub use writer::{write_all, WriteOutcome};
