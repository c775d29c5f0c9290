//! H.264 encoding via OpenH264
//!
//! Produces an Annex B byte stream (start-code prefixed NAL units), which is
//! what a raw `.h264` file sink expects.
//!
//! # OpenH264 Licensing
//!
//! OpenH264 is licensed under BSD by Cisco. The openh264 Rust crate
//! bundles the source code and builds it automatically.
//!
//! # Encoder Delay
//!
//! OpenH264 emits only I and P frames and never reorders, so every packet is
//! returned by the call that submitted its frame. End of input therefore
//! yields nothing. GOP size and thread count are recorded in the
//! configuration but OpenH264 picks its own values for them.

use openh264::encoder::{
    BitRate, Encoder, EncoderConfig as OpenH264Config, FrameRate, FrameType, UsageType,
};
use openh264::formats::YUVSlices;
use tracing::{debug, trace};

use super::{
    check_frame_dimensions, CodecBackend, CodecError, CodecId, CodecResult, EncodedPacket,
    EncoderConfig, VideoCodec, YuvPlanes,
};

/// Backend for [`CodecId::H264`]
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenH264Backend;

impl CodecBackend for OpenH264Backend {
    fn codec_id(&self) -> CodecId {
        CodecId::H264
    }

    fn open(&self, config: &EncoderConfig) -> CodecResult<Box<dyn VideoCodec>> {
        Ok(Box::new(OpenH264Codec::new(config.clone())?))
    }
}

/// H.264 encoder handle backed by OpenH264
pub struct OpenH264Codec {
    encoder: Encoder,
    config: EncoderConfig,
    frames_encoded: u64,
}

impl OpenH264Codec {
    /// Create a new H.264 encoder
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnsupportedConfig`] for odd dimensions or a zero
    /// bit rate or frame rate, and [`CodecError::InitFailed`] if OpenH264
    /// cannot be initialized.
    pub fn new(config: EncoderConfig) -> CodecResult<Self> {
        if config.width % 2 != 0 || config.height % 2 != 0 {
            return Err(CodecError::UnsupportedConfig(format!(
                "H.264 4:2:0 requires even dimensions, got {}x{}",
                config.width, config.height
            )));
        }
        if config.bit_rate == 0 || config.frame_rate() == 0 {
            return Err(CodecError::UnsupportedConfig(format!(
                "bit rate ({}) and frame rate ({}) must be positive",
                config.bit_rate,
                config.frame_rate()
            )));
        }

        let encoder_config = OpenH264Config::new()
            .bitrate(BitRate::from_bps(config.bit_rate))
            .max_frame_rate(FrameRate::from_hz(config.frame_rate() as f32))
            .skip_frames(false)
            .usage_type(UsageType::CameraVideoRealTime);

        let encoder =
            Encoder::with_api_config(openh264::OpenH264API::from_source(), encoder_config)
                .map_err(|e| CodecError::InitFailed(format!("OpenH264 init failed: {:?}", e)))?;

        debug!(
            "Created H.264 encoder: {}x{}, bitrate={}bps, fps={}, gop={} (advisory), threads={} (advisory)",
            config.width,
            config.height,
            config.bit_rate,
            config.frame_rate(),
            config.gop_size,
            config.thread_count
        );

        Ok(Self {
            encoder,
            config,
            frames_encoded: 0,
        })
    }
}

impl VideoCodec for OpenH264Codec {
    fn codec_id(&self) -> CodecId {
        CodecId::H264
    }

    fn config(&self) -> &EncoderConfig {
        &self.config
    }

    fn encode(
        &mut self,
        frame: Option<&YuvPlanes<'_>>,
        pts: u64,
    ) -> CodecResult<Option<EncodedPacket>> {
        let Some(frame) = frame else {
            return Ok(None);
        };
        check_frame_dimensions(&self.config, frame)?;

        let yuv = YUVSlices::new(
            (frame.y, frame.u, frame.v),
            (frame.width as usize, frame.height as usize),
            frame.strides(),
        );

        let bitstream = self
            .encoder
            .encode(&yuv)
            .map_err(|e| CodecError::EncodeFailed(format!("OpenH264 encode failed: {:?}", e)))?;

        let is_keyframe = matches!(bitstream.frame_type(), FrameType::IDR | FrameType::I);
        let data = bitstream.to_vec();
        if data.is_empty() {
            return Ok(None);
        }

        self.frames_encoded += 1;
        trace!(
            "Encoded frame {} (pts {}): {} bytes, keyframe={}",
            self.frames_encoded,
            pts,
            data.len(),
            is_keyframe
        );

        Ok(Some(EncodedPacket::new(data, pts, is_keyframe)))
    }

    fn backend_name(&self) -> &'static str {
        "openh264"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::EncoderTuning;

    #[test]
    fn test_rejects_odd_dimensions() {
        let config = EncoderConfig::new(639, 480, &EncoderTuning::default());
        assert!(matches!(
            OpenH264Backend.open(&config),
            Err(CodecError::UnsupportedConfig(_))
        ));
    }

    #[test]
    fn test_encode_gray_frame() {
        let config = EncoderConfig::new(64, 64, &EncoderTuning::default());
        let mut codec = OpenH264Backend.open(&config).unwrap();

        let y = vec![128u8; 64 * 64];
        let c = vec![128u8; 32 * 32];
        let planes = YuvPlanes {
            y: &y,
            u: &c,
            v: &c,
            width: 64,
            height: 64,
            y_stride: 64,
            uv_stride: 32,
        };

        let packet = codec
            .encode(Some(&planes), 0)
            .unwrap()
            .expect("first frame produces an IDR");
        assert!(packet.is_keyframe);
        // Annex B start code
        assert_eq!(&packet.data[..2], &[0x00, 0x00]);

        assert!(codec.encode(None, 1).unwrap().is_none());
    }
}
