//! Encoder configuration applied when a codec is opened

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default target bit rate (bits per second)
const DEFAULT_BIT_RATE: u32 = 400_000;

/// Default frame rate (frames per second)
const DEFAULT_FRAME_RATE: u32 = 30;

/// Default timebase ticks per frame
const DEFAULT_TICKS_PER_FRAME: u32 = 2;

/// Default group-of-pictures size
const DEFAULT_GOP_SIZE: u32 = 15;

/// Default worker threads requested from the codec
const DEFAULT_THREAD_COUNT: u32 = 2;

/// Pixel layout of frames handed to the codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// Planar YUV 4:2:0 (one luma plane, two quarter-size chroma planes)
    Yuv420p,
}

/// Colour space signalled in the bitstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpace {
    /// SMPTE 170M (analog component video, BT.601 coefficients)
    Smpte170m,
}

/// Rational number, used for timebases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rational {
    /// Numerator
    pub num: u32,
    /// Denominator
    pub den: u32,
}

impl Rational {
    /// Create a new rational
    pub const fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Tunable inputs to the encoder configuration
///
/// This is the only place encoder parameters can be overridden. A tuning
/// value is supplied once when the encoding context is created and turned
/// into an immutable [`EncoderConfig`] when a codec is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderTuning {
    /// Target bit rate in bits per second
    pub bit_rate: u32,

    /// Frames per second (timebase is `1/frame_rate`)
    pub frame_rate: u32,

    /// Timebase ticks per frame
    pub ticks_per_frame: u32,

    /// Keyframe interval in frames
    pub gop_size: u32,

    /// Worker threads requested from the codec implementation
    pub thread_count: u32,
}

impl Default for EncoderTuning {
    fn default() -> Self {
        Self {
            bit_rate: DEFAULT_BIT_RATE,
            frame_rate: DEFAULT_FRAME_RATE,
            ticks_per_frame: DEFAULT_TICKS_PER_FRAME,
            gop_size: DEFAULT_GOP_SIZE,
            thread_count: DEFAULT_THREAD_COUNT,
        }
    }
}

/// Immutable encoder configuration
///
/// Produced exactly once per open, never modified afterwards. Codec handles
/// keep their own copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct EncoderConfig {
    /// Frame width in pixels
    pub width: u32,

    /// Frame height in pixels
    pub height: u32,

    /// Input pixel layout
    pub pixel_format: PixelFormat,

    /// Target bit rate in bits per second
    pub bit_rate: u32,

    /// Timebase of presentation timestamps
    pub time_base: Rational,

    /// Timebase ticks per frame
    pub ticks_per_frame: u32,

    /// Keyframe interval in frames
    pub gop_size: u32,

    /// Signalled colour space
    pub color_space: ColorSpace,

    /// Worker threads requested from the codec implementation
    pub thread_count: u32,
}

impl EncoderConfig {
    /// Build the configuration for the given frame size
    pub fn new(width: u32, height: u32, tuning: &EncoderTuning) -> Self {
        Self {
            width,
            height,
            pixel_format: PixelFormat::Yuv420p,
            bit_rate: tuning.bit_rate,
            time_base: Rational::new(1, tuning.frame_rate),
            ticks_per_frame: tuning.ticks_per_frame,
            gop_size: tuning.gop_size,
            color_space: ColorSpace::Smpte170m,
            thread_count: tuning.thread_count,
        }
    }

    /// Frames per second implied by the timebase
    pub fn frame_rate(&self) -> u32 {
        if self.time_base.num == 0 {
            0
        } else {
            self.time_base.den / self.time_base.num
        }
    }

    /// Size in bytes of one packed 4:2:0 frame
    pub fn frame_size(&self) -> usize {
        let luma = self.width as usize * self.height as usize;
        luma + 2 * (luma / 4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tuning() {
        let tuning = EncoderTuning::default();
        assert_eq!(tuning.bit_rate, 400_000);
        assert_eq!(tuning.frame_rate, 30);
        assert_eq!(tuning.ticks_per_frame, 2);
        assert_eq!(tuning.gop_size, 15);
        assert_eq!(tuning.thread_count, 2);
    }

    #[test]
    fn test_config_from_tuning() {
        let config = EncoderConfig::new(640, 480, &EncoderTuning::default());
        assert_eq!(config.pixel_format, PixelFormat::Yuv420p);
        assert_eq!(config.color_space, ColorSpace::Smpte170m);
        assert_eq!(config.time_base, Rational::new(1, 30));
        assert_eq!(config.frame_rate(), 30);
        assert_eq!(config.frame_size(), 640 * 480 * 3 / 2);
    }

    #[test]
    fn test_tuning_override() {
        let tuning = EncoderTuning {
            bit_rate: 2_000_000,
            frame_rate: 60,
            ..Default::default()
        };
        let config = EncoderConfig::new(1280, 720, &tuning);
        assert_eq!(config.bit_rate, 2_000_000);
        assert_eq!(config.time_base.to_string(), "1/60");
        assert_eq!(config.gop_size, 15);
    }
}
