//! Encoding worker
//!
//! The consumer half of the pipeline. Runs on its own thread from `start`
//! until the queue is shut down and empty, then drains the codec and hands
//! the codec and sink back to the context.
//!
//! # Sequence Numbers
//!
//! Every dequeued frame takes the next sequence number (post-increment)
//! before submission, whether or not the codec accepts it. During the drain,
//! a number is taken only when the codec emits a packet, so flush packets
//! continue the sequence without gaps.

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, info, trace, warn};

use super::frame::RawFrame;
use super::queue::FrameQueue;
use super::stats::{EncodeTimer, FrameObserver, FrameOutcome, FrameReport, StatsCollector};
use super::writer::write_all;
use crate::encoder::{EncodedPacket, VideoCodec};

/// Name of the worker thread
pub(crate) const WORKER_THREAD_NAME: &str = "encoding-worker";

/// Resources returned by a finished worker
pub(crate) struct WorkerOutput {
    pub(crate) codec: Box<dyn VideoCodec>,
    pub(crate) sink: Box<dyn Write + Send>,
}

/// Consumer loop state, owned by the worker thread
pub(crate) struct EncodingWorker {
    codec: Box<dyn VideoCodec>,
    sink: Box<dyn Write + Send>,
    queue: Arc<FrameQueue>,
    frame_counter: Arc<AtomicU64>,
    stats: Arc<StatsCollector>,
    observer: Option<FrameObserver>,
}

impl EncodingWorker {
    pub(crate) fn new(
        codec: Box<dyn VideoCodec>,
        sink: Box<dyn Write + Send>,
        queue: Arc<FrameQueue>,
        frame_counter: Arc<AtomicU64>,
        stats: Arc<StatsCollector>,
        observer: Option<FrameObserver>,
    ) -> Self {
        Self {
            codec,
            sink,
            queue,
            frame_counter,
            stats,
            observer,
        }
    }

    /// Run on a dedicated named thread
    ///
    /// On failure the worker is dropped and with it the codec and sink.
    pub(crate) fn spawn(self) -> io::Result<JoinHandle<WorkerOutput>> {
        thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || self.run())
    }

    /// Consume frames until shutdown, then drain
    pub(crate) fn run(mut self) -> WorkerOutput {
        info!(
            "Encoding worker started ({} backend)",
            self.codec.backend_name()
        );

        while let Some(frame) = self.queue.pop_blocking() {
            self.process_frame(frame);
        }

        debug!("Frame queue closed, draining codec");
        let flushed = self.drain();

        info!(
            "Encoding worker finished: {} frames, {} delayed packets",
            self.frame_counter.load(Ordering::SeqCst),
            flushed
        );

        WorkerOutput {
            codec: self.codec,
            sink: self.sink,
        }
    }

    fn process_frame(&mut self, frame: RawFrame) {
        let sequence = self.frame_counter.fetch_add(1, Ordering::SeqCst);

        let timer = EncodeTimer::start();
        let result = self.codec.encode(Some(&frame.planes()), sequence);
        self.stats.record_submission(timer.elapsed_ms(), true);
        drop(frame);

        let outcome = match result {
            Ok(Some(packet)) => self.write_packet(&packet, sequence),
            Ok(None) => {
                trace!("Frame {} produced no packet", sequence);
                FrameOutcome::Skipped
            }
            Err(e) => {
                warn!("Failed to encode frame {}: {}", sequence, e);
                FrameOutcome::EncodeFailed(e.to_string())
            }
        };

        self.report(sequence, false, outcome);
    }

    /// Submit end-of-input until the codec has nothing left
    ///
    /// Returns the number of delayed packets emitted.
    fn drain(&mut self) -> u64 {
        let mut flushed = 0;

        loop {
            let sequence = self.frame_counter.load(Ordering::SeqCst);

            let timer = EncodeTimer::start();
            let result = self.codec.encode(None, sequence);
            self.stats.record_submission(timer.elapsed_ms(), false);

            match result {
                Ok(Some(packet)) => {
                    self.frame_counter.fetch_add(1, Ordering::SeqCst);
                    let outcome = self.write_packet(&packet, sequence);
                    self.report(sequence, true, outcome);
                    flushed += 1;
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Codec flush failed at {}: {}", sequence, e);
                    self.report(sequence, true, FrameOutcome::EncodeFailed(e.to_string()));
                    break;
                }
            }
        }

        flushed
    }

    fn write_packet(&mut self, packet: &EncodedPacket, sequence: u64) -> FrameOutcome {
        let outcome = write_all(self.sink.as_mut(), &packet.data);

        match outcome.error {
            None if outcome.written == outcome.expected => {
                trace!(
                    "Wrote packet {} ({} bytes, keyframe: {})",
                    sequence,
                    outcome.written,
                    packet.is_keyframe
                );
                FrameOutcome::Written {
                    bytes: outcome.written,
                }
            }
            error => {
                match error {
                    Some(e) => warn!(
                        "Failed to write packet {}: {}/{} bytes written: {}",
                        sequence, outcome.written, outcome.expected, e
                    ),
                    None => warn!(
                        "Failed to write packet {}: {}/{} bytes written",
                        sequence, outcome.written, outcome.expected
                    ),
                }
                FrameOutcome::WriteFailed {
                    written: outcome.written,
                    expected: outcome.expected,
                }
            }
        }
    }

    fn report(&self, sequence: u64, delayed: bool, outcome: FrameOutcome) {
        let report = FrameReport {
            sequence,
            delayed,
            outcome,
        };
        self.stats.record_outcome(&report);
        if let Some(observer) = &self.observer {
            observer(&report);
        }
    }
}
