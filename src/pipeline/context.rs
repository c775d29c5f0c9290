//! Encoding context: lifecycle owner of codec, sink, queue and worker
//!
//! # Ownership
//!
//! While configured, the context owns the codec handle and the output sink.
//! `start` moves both onto the worker thread; joining the worker (in `close`,
//! or in `start`/`open` after a `stop`) moves them back. The codec is never
//! reachable from two threads at once, so it needs no lock.

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{debug, error, info, warn};

use super::error::{PipelineError, PipelineResult};
use super::frame::RawFrame;
use super::lifecycle::EncoderState;
use super::output::OutputTarget;
use super::queue::FrameQueue;
use super::stats::{FrameObserver, PipelineStats, StatsCollector};
use super::worker::{EncodingWorker, WorkerOutput};
use crate::encoder::{CodecId, CodecRegistry, EncoderConfig, EncoderTuning, VideoCodec};

/// Construction parameters for an [`EncodingContext`]
#[derive(Debug)]
pub struct ContextSettings {
    /// Target width in pixels (validated at `open`)
    pub width: i32,

    /// Target height in pixels (validated at `open`)
    pub height: i32,

    /// Output sink
    pub output: OutputTarget,

    /// Encoder tuning applied when a codec is opened
    pub tuning: EncoderTuning,

    /// Codec implementations available to `open`
    pub registry: Arc<CodecRegistry>,
}

impl ContextSettings {
    /// Settings with default tuning and every built-in codec
    pub fn new(output: OutputTarget, width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            output,
            tuning: EncoderTuning::default(),
            registry: Arc::new(CodecRegistry::with_defaults()),
        }
    }

    /// Replace the encoder tuning
    pub fn with_tuning(mut self, tuning: EncoderTuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Replace the codec registry
    pub fn with_registry(mut self, registry: Arc<CodecRegistry>) -> Self {
        self.registry = registry;
        self
    }
}

/// Cloneable capture-side handle for pushing frames from another thread
#[derive(Debug, Clone)]
pub struct FrameProducer {
    queue: Arc<FrameQueue>,
    stats: Arc<StatsCollector>,
}

impl FrameProducer {
    /// Hand a frame to the pipeline; never blocks on encoding
    pub fn push(&self, frame: RawFrame) {
        let depth = self.queue.push(frame);
        self.stats.record_push(depth);
    }

    /// Frames waiting for the worker
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

/// Capture-to-bitstream encoding pipeline
///
/// # Example
///
/// ```rust,ignore
/// let settings = ContextSettings::new(OutputTarget::Path("out.yuv".into()), 640, 480);
/// let mut ctx = EncodingContext::new(settings);
/// ctx.open(Some(CodecId::RAWVIDEO))?;
/// ctx.start()?;
/// ctx.push_frame(frame)?;
/// ctx.stop()?;
/// ctx.close()?;
/// ```
pub struct EncodingContext {
    width: i32,
    height: i32,
    tuning: EncoderTuning,
    registry: Arc<CodecRegistry>,

    output: Option<OutputTarget>,
    sink: Option<Box<dyn Write + Send>>,
    codec: Option<Box<dyn VideoCodec>>,
    worker: Option<JoinHandle<WorkerOutput>>,
    state: EncoderState,

    queue: Arc<FrameQueue>,
    frame_counter: Arc<AtomicU64>,
    stats: Arc<StatsCollector>,
    observer: Option<FrameObserver>,
}

impl EncodingContext {
    /// Create an idle context
    pub fn new(settings: ContextSettings) -> Self {
        debug!(
            "Encoding context created: {}x{}, output {:?}",
            settings.width, settings.height, settings.output
        );

        Self {
            width: settings.width,
            height: settings.height,
            tuning: settings.tuning,
            registry: settings.registry,
            output: Some(settings.output),
            sink: None,
            codec: None,
            worker: None,
            state: EncoderState::Idle,
            queue: Arc::new(FrameQueue::new()),
            frame_counter: Arc::new(AtomicU64::new(0)),
            stats: Arc::new(StatsCollector::new()),
            observer: None,
        }
    }

    /// Create a context around an already opened codec handle
    ///
    /// The context stays idle until `open(None)` adopts the handle.
    pub fn with_codec(settings: ContextSettings, codec: Box<dyn VideoCodec>) -> Self {
        let mut ctx = Self::new(settings);
        ctx.codec = Some(codec);
        ctx
    }

    /// Configure the codec
    ///
    /// With `Some(id)`, looks up and opens that codec, releasing a different
    /// codec opened earlier. Re-opening the same codec is a no-op. With `None`,
    /// adopts the handle supplied through [`EncodingContext::with_codec`] (or
    /// keeps the current one) without re-checking its dimensions.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::InvalidDimensions`] if width or height is not positive
    /// - [`PipelineError::AlreadyRunning`] while the worker is running
    /// - [`PipelineError::InvalidOutputTarget`] if the sink cannot be opened
    /// - [`PipelineError::NoCodecSpecified`] with `None` and no handle
    /// - [`PipelineError::CodecNotFound`] if no backend implements `id`
    /// - [`PipelineError::CouldNotOpenCodec`] if the backend rejects the configuration
    pub fn open(&mut self, codec_id: Option<CodecId>) -> PipelineResult<()> {
        if self.width <= 0 || self.height <= 0 {
            return Err(PipelineError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }

        match self.state {
            EncoderState::Running => return Err(PipelineError::AlreadyRunning),
            EncoderState::Stopping => self.join_worker(),
            _ => {}
        }

        self.ensure_sink()?;

        let Some(id) = codec_id else {
            if self.codec.is_none() {
                return Err(PipelineError::NoCodecSpecified);
            }
            self.state = EncoderState::Configured;
            debug!("Using pre-supplied codec handle");
            return Ok(());
        };

        if let Some(current) = &self.codec {
            if current.codec_id() == id {
                debug!("Codec {} already open", id);
                self.state = EncoderState::Configured;
                return Ok(());
            }
            info!("Releasing codec {} before opening {}", current.codec_id(), id);
            self.codec = None;
            self.state = EncoderState::Idle;
        }

        let config = EncoderConfig::new(self.width as u32, self.height as u32, &self.tuning);
        match self.registry.open(&id, &config) {
            None => Err(PipelineError::CodecNotFound(id)),
            Some(Err(source)) => Err(PipelineError::CouldNotOpenCodec { codec: id, source }),
            Some(Ok(codec)) => {
                info!("Codec {} configured ({} backend)", id, codec.backend_name());
                self.codec = Some(codec);
                self.state = EncoderState::Configured;
                Ok(())
            }
        }
    }

    /// Launch the encoding worker
    ///
    /// Resets the frame counter. Frames pushed before `start` are encoded
    /// first.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::AlreadyRunning`] if the worker is running
    /// - [`PipelineError::NoCodecSpecified`] if no codec is open
    /// - [`PipelineError::WorkerSpawn`] if the thread cannot be created
    pub fn start(&mut self) -> PipelineResult<()> {
        match self.state {
            EncoderState::Running => return Err(PipelineError::AlreadyRunning),
            EncoderState::Stopping => self.join_worker(),
            _ => {}
        }

        if self.codec.is_none() {
            return Err(PipelineError::NoCodecSpecified);
        }
        self.ensure_sink()?;

        let (Some(codec), Some(sink)) = (self.codec.take(), self.sink.take()) else {
            return Err(PipelineError::NoCodecSpecified);
        };

        self.frame_counter.store(0, Ordering::SeqCst);
        self.queue.start();

        let worker = EncodingWorker::new(
            codec,
            sink,
            Arc::clone(&self.queue),
            Arc::clone(&self.frame_counter),
            Arc::clone(&self.stats),
            self.observer.clone(),
        );

        match worker.spawn() {
            Ok(handle) => {
                self.worker = Some(handle);
                self.state = EncoderState::Running;
                info!("Encoder started ({} frames queued)", self.queue.len());
                Ok(())
            }
            Err(e) => {
                self.queue.shutdown();
                self.state = EncoderState::Idle;
                error!("Failed to spawn encoding worker: {}", e);
                Err(PipelineError::WorkerSpawn(e))
            }
        }
    }

    /// Ask the worker to finish
    ///
    /// Returns immediately. The worker encodes every queued frame, drains the
    /// codec and exits; `close` waits for that.
    ///
    /// # Errors
    ///
    /// [`PipelineError::AlreadyStopped`] if the worker is not running.
    pub fn stop(&mut self) -> PipelineResult<()> {
        if !self.state.is_running() {
            return Err(PipelineError::AlreadyStopped);
        }

        self.queue.shutdown();
        self.state = EncoderState::Stopping;
        info!("Encoder stopping ({} frames queued)", self.queue.len());
        Ok(())
    }

    /// Join the worker and release the codec
    ///
    /// Stops a running worker first. The output sink is flushed and kept so
    /// the context can be opened again. Without a codec this is a no-op.
    pub fn close(&mut self) -> PipelineResult<()> {
        if self.state.is_running() {
            warn!("Closing a running encoder, stopping first");
            self.queue.shutdown();
            self.state = EncoderState::Stopping;
        }

        self.join_worker();

        let Some(codec) = self.codec.take() else {
            return Ok(());
        };
        info!("Releasing codec {}", codec.codec_id());
        drop(codec);

        if let Some(sink) = self.sink.as_mut() {
            if let Err(e) = sink.flush() {
                warn!("Failed to flush output: {}", e);
            }
        }

        self.state = EncoderState::Closed;
        info!("Encoder closed: {}", self.stats().summary());
        Ok(())
    }

    /// Queue a captured frame
    ///
    /// Accepted in every state; frames queued while stopped are encoded after
    /// the next `start`.
    pub fn push_frame(&self, frame: RawFrame) -> PipelineResult<()> {
        let depth = self.queue.push(frame);
        self.stats.record_push(depth);
        Ok(())
    }

    /// Handle for pushing frames from a capture thread
    pub fn producer(&self) -> FrameProducer {
        FrameProducer {
            queue: Arc::clone(&self.queue),
            stats: Arc::clone(&self.stats),
        }
    }

    /// Install a per-frame observer, used from the next `start`
    pub fn set_frame_observer(&mut self, observer: FrameObserver) {
        self.observer = Some(observer);
    }

    /// Current lifecycle state
    pub fn state(&self) -> EncoderState {
        self.state
    }

    /// Sequence number the next dequeued frame will take
    pub fn frame_count(&self) -> u64 {
        self.frame_counter.load(Ordering::SeqCst)
    }

    /// Frames waiting for the worker
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Statistics snapshot
    pub fn stats(&self) -> PipelineStats {
        self.stats.snapshot()
    }

    /// Target dimensions
    pub fn dimensions(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    /// Identifier of the open codec, if the context currently holds one
    pub fn codec_id(&self) -> Option<CodecId> {
        self.codec.as_ref().map(|codec| codec.codec_id())
    }

    /// Open the output target on first use
    fn ensure_sink(&mut self) -> PipelineResult<()> {
        if self.sink.is_some() {
            return Ok(());
        }

        let target = self.output.take().ok_or_else(|| {
            PipelineError::InvalidOutputTarget("output sink is no longer available".to_string())
        })?;

        // A path can be retried after the caller fixes the filesystem
        let retry = match &target {
            OutputTarget::Path(path) => Some(OutputTarget::Path(path.clone())),
            _ => None,
        };

        match target.open() {
            Ok(sink) => {
                self.sink = Some(sink);
                Ok(())
            }
            Err(e) => {
                self.output = retry;
                Err(e)
            }
        }
    }

    /// Wait for the worker and take back the codec and sink
    fn join_worker(&mut self) {
        if let Some(handle) = self.worker.take() {
            debug!("Joining encoding worker");
            match handle.join() {
                Ok(output) => {
                    self.codec = Some(output.codec);
                    self.sink = Some(output.sink);
                }
                Err(_) => error!("Encoding worker panicked, codec and output lost"),
            }
        }

        if self.state.has_worker() {
            self.state = if self.codec.is_some() {
                EncoderState::Configured
            } else {
                EncoderState::Idle
            };
        }
    }
}

impl Drop for EncodingContext {
    fn drop(&mut self) {
        if self.state.has_worker() {
            self.queue.shutdown();
            self.join_worker();
        }
        if let Some(sink) = self.sink.as_mut() {
            let _ = sink.flush();
        }
    }
}

impl std::fmt::Debug for EncodingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodingContext")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("state", &self.state)
            .field("codec", &self.codec_id())
            .field("queue_len", &self.queue.len())
            .finish()
    }
}
