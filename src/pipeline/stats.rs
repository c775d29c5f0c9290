//! Pipeline statistics and per-frame reporting
//!
//! Per-frame failures never stop the pipeline. They are counted here and, if
//! an observer is installed, reported to it as they happen.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::Serialize;

/// Snapshot of pipeline counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineStats {
    /// Frames accepted by the queue
    pub frames_pushed: u64,

    /// Frames submitted to the codec
    pub frames_submitted: u64,

    /// Packets fully written to the sink (live and flush)
    pub packets_written: u64,

    /// Packets emitted while draining the codec at end of stream
    pub delayed_packets: u64,

    /// Total bytes written to the sink, including partial writes
    pub bytes_written: u64,

    /// Submissions for which the codec emitted nothing
    pub frames_skipped: u64,

    /// Submissions the codec rejected
    pub encode_errors: u64,

    /// Packets that could not be written completely
    pub write_failures: u64,

    /// Average codec time per submission in milliseconds (EMA, α = 0.1)
    pub avg_encode_time_ms: f32,

    /// Slowest codec submission observed (ms)
    pub max_encode_time_ms: f32,

    /// Highest queue depth observed
    pub peak_queue_depth: usize,
}

impl PipelineStats {
    /// Packets the codec emitted, whether or not the write succeeded
    pub fn packets_produced(&self) -> u64 {
        self.packets_written + self.write_failures
    }

    /// One-line summary for logging
    pub fn summary(&self) -> String {
        format!(
            "{} pushed, {} encoded, {} packets written ({} delayed, {} bytes), \
             {} skipped, {} encode errors, {} write failures, avg {:.2}ms/frame, peak queue {}",
            self.frames_pushed,
            self.frames_submitted,
            self.packets_written,
            self.delayed_packets,
            self.bytes_written,
            self.frames_skipped,
            self.encode_errors,
            self.write_failures,
            self.avg_encode_time_ms,
            self.peak_queue_depth
        )
    }
}

/// What happened to one codec submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Packet written completely
    Written { bytes: usize },

    /// Packet emitted but the sink stopped early
    WriteFailed { written: usize, expected: usize },

    /// Codec accepted the input without emitting a packet
    Skipped,

    /// Codec rejected the input
    EncodeFailed(String),
}

/// Report delivered to a [`FrameObserver`] after every submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameReport {
    /// Sequence number (pts) of the submission
    pub sequence: u64,

    /// Whether the submission was an end-of-input drain
    pub delayed: bool,

    /// Result of the submission
    pub outcome: FrameOutcome,
}

/// Callback invoked on the worker thread for every [`FrameReport`]
pub type FrameObserver = Arc<dyn Fn(&FrameReport) + Send + Sync>;

/// Shared, thread-safe stats accumulator
#[derive(Debug, Default)]
pub(crate) struct StatsCollector {
    inner: RwLock<PipelineStats>,
}

impl StatsCollector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn snapshot(&self) -> PipelineStats {
        self.inner.read().clone()
    }

    pub(crate) fn record_push(&self, queue_depth: usize) {
        let mut stats = self.inner.write();
        stats.frames_pushed += 1;
        stats.peak_queue_depth = stats.peak_queue_depth.max(queue_depth);
    }

    pub(crate) fn record_submission(&self, encode_time_ms: f32, is_frame: bool) {
        let mut stats = self.inner.write();
        let samples = stats.frames_submitted;
        if is_frame {
            stats.frames_submitted += 1;
        }

        if samples == 0 {
            stats.avg_encode_time_ms = encode_time_ms;
        } else {
            stats.avg_encode_time_ms = stats.avg_encode_time_ms * 0.9 + encode_time_ms * 0.1;
        }
        stats.max_encode_time_ms = stats.max_encode_time_ms.max(encode_time_ms);
    }

    /// Fold one submission outcome into the counters
    pub(crate) fn record_outcome(&self, report: &FrameReport) {
        let mut stats = self.inner.write();
        match &report.outcome {
            FrameOutcome::Written { bytes } => {
                stats.packets_written += 1;
                stats.bytes_written += *bytes as u64;
                if report.delayed {
                    stats.delayed_packets += 1;
                }
            }
            FrameOutcome::WriteFailed { written, .. } => {
                stats.write_failures += 1;
                stats.bytes_written += *written as u64;
                if report.delayed {
                    stats.delayed_packets += 1;
                }
            }
            FrameOutcome::Skipped => stats.frames_skipped += 1,
            FrameOutcome::EncodeFailed(_) => stats.encode_errors += 1,
        }
    }
}

/// Timing helper for codec submissions
pub(crate) struct EncodeTimer {
    start: Instant,
}

impl EncodeTimer {
    pub(crate) fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub(crate) fn elapsed_ms(&self) -> f32 {
        self.start.elapsed().as_secs_f32() * 1000.0
    }
}
