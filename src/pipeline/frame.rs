//! Captured frame buffers
//!
//! A [`RawFrame`] owns its pixel buffer. The capture side builds one, moves
//! it into the frame queue, the encoding worker takes it out, submits it and
//! drops it. Nothing else ever holds it, so the buffer is freed exactly once
//! whatever the encode outcome.
//!
//! Buffers use the planar 4:2:0 layout camera stacks deliver: a full-size
//! luma plane at the start of the buffer, then two quarter-size chroma planes
//! beginning at a stored byte offset.

use thiserror::Error;

use crate::encoder::YuvPlanes;

/// Frame construction errors
#[derive(Debug, Error)]
pub enum FrameError {
    /// Width or height is zero
    #[error("Invalid frame dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// Chroma planes would overlap the luma plane
    #[error("Chroma offset {offset} overlaps luma plane of {luma_len} bytes")]
    ChromaOverlap { offset: usize, luma_len: usize },

    /// Buffer is shorter than the layout requires
    #[error("Frame buffer too small: {actual} < {needed}")]
    BufferTooSmall { needed: usize, actual: usize },
}

/// Plane layout metadata supplied by the capture side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneLayout {
    /// Frame width in pixels
    pub width: u32,

    /// Frame height in pixels
    pub height: u32,

    /// Byte offset of the first chroma plane
    pub chroma_offset: usize,
}

impl PlaneLayout {
    /// Layout with the chroma planes directly after the luma plane
    pub fn contiguous(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            chroma_offset: width as usize * height as usize,
        }
    }

    /// Layout with an explicit chroma offset (padded capture buffers)
    pub fn with_chroma_offset(width: u32, height: u32, chroma_offset: usize) -> Self {
        Self {
            width,
            height,
            chroma_offset,
        }
    }

    /// Luma row stride in bytes
    pub fn luma_stride(&self) -> usize {
        self.width as usize
    }

    /// Chroma row stride in bytes
    pub fn chroma_stride(&self) -> usize {
        self.width as usize / 2
    }

    /// Size of the luma plane in bytes
    pub fn luma_len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Size of one chroma plane in bytes
    pub fn chroma_len(&self) -> usize {
        self.luma_len() / 4
    }

    /// Byte offset of the second chroma plane, `None` if it overflows
    pub fn second_chroma_offset(&self) -> Option<usize> {
        self.chroma_offset.checked_add(self.chroma_len())
    }

    /// Minimum buffer length for this layout, `None` if it overflows
    pub fn required_len(&self) -> Option<usize> {
        self.second_chroma_offset()?.checked_add(self.chroma_len())
    }

    fn validate(&self, buffer_len: usize) -> Result<(), FrameError> {
        if self.width == 0 || self.height == 0 {
            return Err(FrameError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.chroma_offset < self.luma_len() {
            return Err(FrameError::ChromaOverlap {
                offset: self.chroma_offset,
                luma_len: self.luma_len(),
            });
        }
        match self.required_len() {
            Some(needed) if buffer_len >= needed => {}
            needed => {
                return Err(FrameError::BufferTooSmall {
                    needed: needed.unwrap_or(usize::MAX),
                    actual: buffer_len,
                })
            }
        }
        Ok(())
    }
}

/// One captured image
///
/// Move-only: ownership goes producer → queue → worker → dropped.
#[derive(Debug)]
pub struct RawFrame {
    buffer: Vec<u8>,
    layout: PlaneLayout,
}

impl RawFrame {
    /// Wrap a captured buffer
    ///
    /// # Errors
    ///
    /// Returns [`FrameError`] if the layout is empty, the chroma planes overlap
    /// the luma plane, or the buffer is too short for the layout.
    pub fn new(buffer: Vec<u8>, layout: PlaneLayout) -> Result<Self, FrameError> {
        layout.validate(buffer.len())?;
        Ok(Self { buffer, layout })
    }

    /// Wrap a tightly packed I420 buffer
    pub fn contiguous(buffer: Vec<u8>, width: u32, height: u32) -> Result<Self, FrameError> {
        Self::new(buffer, PlaneLayout::contiguous(width, height))
    }

    /// Plane layout
    pub fn layout(&self) -> &PlaneLayout {
        &self.layout
    }

    /// Frame width in pixels
    pub fn width(&self) -> u32 {
        self.layout.width
    }

    /// Frame height in pixels
    pub fn height(&self) -> u32 {
        self.layout.height
    }

    /// Size of the owned buffer in bytes
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the owned buffer is empty (never true for a valid frame)
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Plane views for submission to a codec
    ///
    /// Luma at the buffer base, first chroma plane at the stored chroma
    /// offset, second chroma plane `width * height / 4` bytes after it.
    pub fn planes(&self) -> YuvPlanes<'_> {
        // Offsets were bounds-checked against the buffer in `new`
        let layout = &self.layout;
        let chroma_len = layout.chroma_len();
        let u_start = layout.chroma_offset;
        let v_start = u_start + chroma_len;

        YuvPlanes {
            y: &self.buffer[..layout.luma_len()],
            u: &self.buffer[u_start..u_start + chroma_len],
            v: &self.buffer[v_start..v_start + chroma_len],
            width: layout.width,
            height: layout.height,
            y_stride: layout.luma_stride(),
            uv_stride: layout.chroma_stride(),
        }
    }

    /// Give the buffer back to the caller
    pub fn into_buffer(self) -> Vec<u8> {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contiguous_layout() {
        let layout = PlaneLayout::contiguous(640, 480);
        assert_eq!(layout.luma_len(), 307_200);
        assert_eq!(layout.chroma_len(), 76_800);
        assert_eq!(layout.chroma_offset, 307_200);
        assert_eq!(layout.second_chroma_offset(), Some(384_000));
        assert_eq!(layout.required_len(), Some(460_800));
        assert_eq!(layout.luma_stride(), 640);
        assert_eq!(layout.chroma_stride(), 320);
    }

    #[test]
    fn test_planes_follow_offsets() {
        // 4x2 frame: 8 luma bytes, 2 bytes per chroma plane, 2 bytes padding
        let mut buffer = vec![1u8; 8];
        buffer.extend_from_slice(&[0, 0]);
        buffer.extend_from_slice(&[2, 2, 3, 3]);

        let frame = RawFrame::new(buffer, PlaneLayout::with_chroma_offset(4, 2, 10)).unwrap();
        let planes = frame.planes();
        assert_eq!(planes.y, &[1u8; 8][..]);
        assert_eq!(planes.u, &[2, 2][..]);
        assert_eq!(planes.v, &[3, 3][..]);
        assert_eq!(planes.strides(), (4, 2, 2));
    }

    #[test]
    fn test_rejects_short_buffer() {
        let result = RawFrame::contiguous(vec![0u8; 100], 640, 480);
        assert!(matches!(
            result,
            Err(FrameError::BufferTooSmall {
                needed: 460_800,
                actual: 100
            })
        ));
    }

    #[test]
    fn test_rejects_overflowing_chroma_offset() {
        let layout = PlaneLayout::with_chroma_offset(4, 2, usize::MAX);
        assert_eq!(layout.second_chroma_offset(), None);
        assert_eq!(layout.required_len(), None);

        let result = RawFrame::new(vec![0u8; 12], layout);
        assert!(matches!(
            result,
            Err(FrameError::BufferTooSmall {
                needed: usize::MAX,
                actual: 12
            })
        ));

        // Offset whose first plane fits but second plane overflows
        let layout = PlaneLayout::with_chroma_offset(4, 2, usize::MAX - 1);
        assert!(RawFrame::new(vec![0u8; 12], layout).is_err());
    }

    #[test]
    fn test_rejects_overlapping_chroma() {
        let layout = PlaneLayout::with_chroma_offset(4, 4, 8);
        let result = RawFrame::new(vec![0u8; 64], layout);
        assert!(matches!(result, Err(FrameError::ChromaOverlap { .. })));
    }

    #[test]
    fn test_rejects_empty_dimensions() {
        let result = RawFrame::contiguous(Vec::new(), 0, 480);
        assert!(matches!(result, Err(FrameError::InvalidDimensions { .. })));
    }

    #[test]
    fn test_into_buffer_returns_ownership() {
        let frame = RawFrame::contiguous(vec![7u8; 12], 4, 2).unwrap();
        assert_eq!(frame.len(), 12);
        assert_eq!(frame.into_buffer(), vec![7u8; 12]);
    }
}
