//! Configuration type definitions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::encoder::{CodecId, EncoderTuning};

/// Encoder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderSection {
    /// Codec to open ("rawvideo", "h264")
    pub codec: String,

    /// Target bit rate in bits per second
    pub bitrate: u32,

    /// Frames per second
    pub fps: u32,

    /// Timebase ticks per frame
    pub ticks_per_frame: u32,

    /// Keyframe interval in frames
    pub gop_size: u32,

    /// Codec worker threads
    pub threads: u32,
}

impl Default for EncoderSection {
    fn default() -> Self {
        let tuning = EncoderTuning::default();
        Self {
            codec: default_codec().to_string(),
            bitrate: tuning.bit_rate,
            fps: tuning.frame_rate,
            ticks_per_frame: tuning.ticks_per_frame,
            gop_size: tuning.gop_size,
            threads: tuning.thread_count,
        }
    }
}

impl EncoderSection {
    /// Codec identifier
    pub fn codec_id(&self) -> CodecId {
        CodecId::from(self.codec.clone())
    }

    /// Tuning handed to the encoding context
    pub fn to_tuning(&self) -> EncoderTuning {
        EncoderTuning {
            bit_rate: self.bitrate,
            frame_rate: self.fps,
            ticks_per_frame: self.ticks_per_frame,
            gop_size: self.gop_size,
            thread_count: self.threads,
        }
    }
}

fn default_codec() -> &'static str {
    if cfg!(feature = "h264") {
        "h264"
    } else {
        "rawvideo"
    }
}

/// Capture source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Frame width in pixels
    pub width: i32,

    /// Frame height in pixels
    pub height: i32,

    /// Frames to capture (0 = until end of input or interrupted)
    pub frames: u64,

    /// Raw I420 input file (None = synthetic test pattern)
    pub input: Option<PathBuf>,

    /// Deliver synthetic frames at the encoder frame rate
    pub realtime: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            frames: 300,
            input: None,
            realtime: false,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output file path
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("capture.out"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level ("trace", "debug", "info", "warn", "error")
    pub level: String,

    /// Directory for daily rotated log files (None = console only)
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
        }
    }
}
