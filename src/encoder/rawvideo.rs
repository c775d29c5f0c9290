//! Uncompressed packed I420 output
//!
//! Emits one packet per frame containing the three planes tightly packed
//! (`Y` then `U` then `V`, strides removed). The output is a raw `.yuv`
//! stream playable with `ffplay -f rawvideo -pixel_format yuv420p`.
//!
//! The codec has no look-ahead, so end of input never yields a packet.

use tracing::debug;

use super::{
    check_frame_dimensions, CodecBackend, CodecError, CodecId, CodecResult, EncodedPacket,
    EncoderConfig, VideoCodec, YuvPlanes,
};

/// Backend for [`CodecId::RAWVIDEO`]
#[derive(Debug, Clone, Copy, Default)]
pub struct RawVideoBackend;

impl CodecBackend for RawVideoBackend {
    fn codec_id(&self) -> CodecId {
        CodecId::RAWVIDEO
    }

    fn open(&self, config: &EncoderConfig) -> CodecResult<Box<dyn VideoCodec>> {
        if config.width % 2 != 0 || config.height % 2 != 0 {
            return Err(CodecError::UnsupportedConfig(format!(
                "4:2:0 output requires even dimensions, got {}x{}",
                config.width, config.height
            )));
        }
        if config.bit_rate == 0 {
            return Err(CodecError::UnsupportedConfig(
                "bit rate must be positive".to_string(),
            ));
        }

        Ok(Box::new(RawVideoCodec::new(config.clone())))
    }
}

/// Packed I420 "encoder"
#[derive(Debug)]
pub struct RawVideoCodec {
    config: EncoderConfig,
}

impl RawVideoCodec {
    /// Create a handle without validating the configuration
    pub fn new(config: EncoderConfig) -> Self {
        debug!(
            "Created rawvideo codec: {}x{}, {} bytes/frame",
            config.width,
            config.height,
            config.frame_size()
        );
        Self { config }
    }
}

/// Bytes a strided plane must hold for `rows` rows of `row_len` bytes
fn plane_len(stride: usize, row_len: usize, rows: usize) -> usize {
    if rows == 0 {
        0
    } else {
        stride * (rows - 1) + row_len
    }
}

/// Copy `rows` rows of `row_len` bytes out of a strided plane
fn pack_plane(out: &mut Vec<u8>, plane: &[u8], stride: usize, row_len: usize, rows: usize) {
    if stride == row_len {
        out.extend_from_slice(&plane[..row_len * rows]);
        return;
    }
    for row in plane.chunks(stride).take(rows) {
        out.extend_from_slice(&row[..row_len]);
    }
}

impl VideoCodec for RawVideoCodec {
    fn codec_id(&self) -> CodecId {
        CodecId::RAWVIDEO
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

        let width = frame.width as usize;
        let height = frame.height as usize;
        let chroma_width = width / 2;
        let chroma_height = height / 2;

        let chroma_len = plane_len(frame.uv_stride, chroma_width, chroma_height);
        if frame.y_stride < width
            || frame.uv_stride < chroma_width
            || frame.y.len() < plane_len(frame.y_stride, width, height)
            || frame.u.len() < chroma_len
            || frame.v.len() < chroma_len
        {
            return Err(CodecError::EncodeFailed(format!(
                "plane buffers too small for {}x{} frame",
                width, height
            )));
        }

        let mut data = Vec::with_capacity(self.config.frame_size());
        pack_plane(&mut data, frame.y, frame.y_stride, width, height);
        pack_plane(&mut data, frame.u, frame.uv_stride, chroma_width, chroma_height);
        pack_plane(&mut data, frame.v, frame.uv_stride, chroma_width, chroma_height);

        Ok(Some(EncodedPacket::new(data, pts, true)))
    }

    fn backend_name(&self) -> &'static str {
        "rawvideo"
    }
}
