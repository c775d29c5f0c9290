//! Shared fixtures for pipeline integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{self, ErrorKind, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use lamco_capture_encoder::encoder::{
    CodecBackend, CodecError, CodecId, CodecRegistry, CodecResult, EncodedPacket, EncoderConfig,
    VideoCodec, YuvPlanes,
};
use lamco_capture_encoder::pipeline::{FrameObserver, FrameReport, RawFrame};

/// Identifier of the test codec
pub const TEST_CODEC: &str = "X";

/// Test codec with configurable look-ahead and flush trailer
///
/// Each packet carries the pts of the frame it belongs to (8 bytes LE)
/// followed by the first luma byte of that frame. Trailer packets emitted
/// during the flush carry the flush submission pts and a 0xFF marker.
pub struct DelayCodec {
    config: EncoderConfig,
    lookahead: usize,
    trailer: usize,
    pending: VecDeque<(u64, u8)>,
}

impl VideoCodec for DelayCodec {
    fn codec_id(&self) -> CodecId {
        CodecId::new(TEST_CODEC)
    }

    fn config(&self) -> &EncoderConfig {
        &self.config
    }

    fn encode(
        &mut self,
        frame: Option<&YuvPlanes<'_>>,
        pts: u64,
    ) -> CodecResult<Option<EncodedPacket>> {
        match frame {
            Some(planes) => {
                if planes.width != self.config.width || planes.height != self.config.height {
                    return Err(CodecError::EncodeFailed("size mismatch".into()));
                }
                self.pending.push_back((pts, planes.y[0]));
                if self.pending.len() > self.lookahead {
                    Ok(self.pending.pop_front().map(|(p, tag)| packet(p, tag)))
                } else {
                    Ok(None)
                }
            }
            None => {
                if let Some((p, tag)) = self.pending.pop_front() {
                    return Ok(Some(packet(p, tag)));
                }
                if self.trailer > 0 {
                    self.trailer -= 1;
                    return Ok(Some(packet(pts, 0xFF)));
                }
                Ok(None)
            }
        }
    }

    fn backend_name(&self) -> &'static str {
        "delay"
    }
}

fn packet(pts: u64, tag: u8) -> EncodedPacket {
    let mut data = pts.to_le_bytes().to_vec();
    data.push(tag);
    EncodedPacket::new(data, pts, pts == 0)
}

/// Decode (pts, tag) from a test codec packet
pub fn decode_packet(data: &[u8]) -> (u64, u8) {
    let mut pts = [0u8; 8];
    pts.copy_from_slice(&data[..8]);
    (u64::from_le_bytes(pts), data[8])
}

/// Backend for [`DelayCodec`]
pub struct DelayBackend {
    pub lookahead: usize,
    pub trailer: usize,
}

impl CodecBackend for DelayBackend {
    fn codec_id(&self) -> CodecId {
        CodecId::new(TEST_CODEC)
    }

    fn open(&self, config: &EncoderConfig) -> CodecResult<Box<dyn VideoCodec>> {
        Ok(Box::new(DelayCodec {
            config: config.clone(),
            lookahead: self.lookahead,
            trailer: self.trailer,
            pending: VecDeque::new(),
        }))
    }
}

/// Default registry plus the test codec
pub fn registry_with_test_codec(lookahead: usize, trailer: usize) -> Arc<CodecRegistry> {
    let mut registry = CodecRegistry::with_defaults();
    registry.register(Arc::new(DelayBackend { lookahead, trailer }));
    Arc::new(registry)
}

/// Packets recorded by a [`RecordingSink`], one entry per flushed packet
pub type PacketLog = Arc<Mutex<Vec<Vec<u8>>>>;

/// Sink that splits its input into packets at each flush
///
/// With `max_chunk` set, accepts at most that many bytes per write call.
#[derive(Clone)]
pub struct RecordingSink {
    current: Vec<u8>,
    packets: PacketLog,
    max_chunk: Option<usize>,
}

impl RecordingSink {
    pub fn new() -> (Self, PacketLog) {
        let packets = PacketLog::default();
        let sink = Self {
            current: Vec::new(),
            packets: Arc::clone(&packets),
            max_chunk: None,
        };
        (sink, packets)
    }

    pub fn with_max_chunk(max_chunk: usize) -> (Self, PacketLog) {
        let (mut sink, packets) = Self::new();
        sink.max_chunk = Some(max_chunk);
        (sink, packets)
    }
}

impl Write for RecordingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.max_chunk.map_or(buf.len(), |max| buf.len().min(max));
        self.current.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.current.is_empty() {
            self.packets.lock().push(std::mem::take(&mut self.current));
        }
        Ok(())
    }
}

/// Sink that rejects every second packet with `BrokenPipe`
pub struct FlakySink {
    packet_index: usize,
    packets: PacketLog,
}

impl FlakySink {
    pub fn new() -> (Self, PacketLog) {
        let packets = PacketLog::default();
        let sink = Self {
            packet_index: 0,
            packets: Arc::clone(&packets),
        };
        (sink, packets)
    }
}

impl Write for FlakySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.packet_index % 2 == 1 {
            self.packet_index += 1;
            return Err(io::Error::new(ErrorKind::BrokenPipe, "reader went away"));
        }
        self.packets.lock().push(buf.to_vec());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.packet_index += 1;
        Ok(())
    }
}

/// Tightly packed I420 frame with every luma byte set to `tag`
pub fn tagged_frame(width: u32, height: u32, tag: u8) -> RawFrame {
    let luma = (width * height) as usize;
    let mut buffer = vec![tag; luma];
    buffer.resize(luma + luma / 2, 0x80);
    RawFrame::contiguous(buffer, width, height).unwrap()
}

/// Observer that stores every report
pub fn collecting_observer() -> (FrameObserver, Arc<Mutex<Vec<FrameReport>>>) {
    let reports = Arc::new(Mutex::new(Vec::new()));
    let observer: FrameObserver = {
        let reports = Arc::clone(&reports);
        Arc::new(move |report: &FrameReport| reports.lock().push(report.clone()))
    };
    (observer, reports)
}
