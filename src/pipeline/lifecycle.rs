//! Encoder lifecycle states

use std::fmt;

use serde::Serialize;

/// Lifecycle state of an [`super::EncodingContext`]
///
/// ```text
///  Idle ──open──> Configured ──start──> Running ──stop──> Stopping ──close──> Closed
///   ^                 │  ^                                    │                 │
///   └── open failed ──┘  └────────────── start ───────────────┘                 │
///   Closed ──open──> Configured <───────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderState {
    /// No codec handle
    Idle,
    /// Codec opened and configured, worker not running
    Configured,
    /// Worker consuming frames
    Running,
    /// Worker draining after stop, not yet joined
    Stopping,
    /// Worker joined and codec released
    Closed,
}

impl EncoderState {
    /// Whether the worker thread may be alive
    pub fn has_worker(self) -> bool {
        matches!(self, EncoderState::Running | EncoderState::Stopping)
    }

    /// Whether frames are being consumed
    pub fn is_running(self) -> bool {
        self == EncoderState::Running
    }
}

impl fmt::Display for EncoderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EncoderState::Idle => "idle",
            EncoderState::Configured => "configured",
            EncoderState::Running => "running",
            EncoderState::Stopping => "stopping",
            EncoderState::Closed => "closed",
        };
        f.write_str(name)
    }
}
