//! Reliable full-buffer writes to the output sink
//!
//! Sinks may accept fewer bytes than offered. [`write_all`] re-issues the
//! remaining tail until the packet is fully written or the sink fails, and
//! reports how far it got instead of discarding that information the way
//! `Write::write_all` does.

use std::io::{self, ErrorKind, Write};

/// Result of writing one packet
#[derive(Debug)]
pub struct WriteOutcome {
    /// Bytes accepted by the sink
    pub written: usize,

    /// Bytes that should have been written
    pub expected: usize,

    /// Error that stopped the write, if any
    pub error: Option<io::Error>,
}

impl WriteOutcome {
    /// Whether every byte was written and flushed
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.written == self.expected
    }
}

/// Write `buf` completely, retrying short writes
///
/// `Interrupted` errors are retried. A sink that accepts zero bytes is
/// treated as failed (`WriteZero`). The sink is flushed after the last byte.
pub fn write_all<W: Write + ?Sized>(sink: &mut W, buf: &[u8]) -> WriteOutcome {
    let mut written = 0;

    while written < buf.len() {
        match sink.write(&buf[written..]) {
            Ok(0) => {
                return WriteOutcome {
                    written,
                    expected: buf.len(),
                    error: Some(io::Error::new(
                        ErrorKind::WriteZero,
                        "sink accepted zero bytes",
                    )),
                };
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                return WriteOutcome {
                    written,
                    expected: buf.len(),
                    error: Some(e),
                };
            }
        }
    }

    WriteOutcome {
        written,
        expected: buf.len(),
        error: sink.flush().err(),
    }
}
