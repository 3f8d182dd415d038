//! Streaming frame reassembly over an unreliable serial line
//!
//! Serial reads arrive in arbitrary chunks: a frame may be split across reads
//! or several frames may arrive at once, surrounded by line noise. The
//! reassembler buffers bytes and yields complete frame bodies lazily.
//!
//! Parsing is greedy and never backtracks into discarded bytes. After every
//! pass the buffer holds at most one partial frame, or at most 3 bytes (a
//! possible split header) when no header was found.

use bytes::{Buf, Bytes, BytesMut};

use super::{FrameMagic, COMMAND_MAGIC, FRAME_OVERHEAD, MAX_PAYLOAD_LEN, MIN_FRAME_SIZE, REPORT_MAGIC};

/// Offset of the u16 length field
const LEN_OFFSET: usize = 4;

/// Counters for one reassembler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReassemblerStats {
    /// Frames with a valid tail that were emitted
    pub frames: u64,
    /// Candidates dropped for a bad tail or an implausible length
    pub dropped: u64,
    /// Bytes skipped while searching for a header
    pub noise_bytes: u64,
}

/// Byte buffer turning a chunked stream into frame bodies
pub struct FrameReassembler {
    magic: FrameMagic,
    buffer: BytesMut,
    stats: ReassemblerStats,
}

impl FrameReassembler {
    pub fn new(magic: FrameMagic) -> Self {
        Self {
            magic,
            buffer: BytesMut::with_capacity(256),
            stats: ReassemblerStats::default(),
        }
    }

    /// Reassembler for sensor report frames
    pub fn for_reports() -> Self {
        Self::new(REPORT_MAGIC)
    }

    /// Reassembler for command/ACK frames
    pub fn for_commands() -> Self {
        Self::new(COMMAND_MAGIC)
    }

    /// Append raw bytes from the transport
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Pull the next complete frame body, if one is buffered
    ///
    /// The body excludes header, length field and tail. Returns `None` when
    /// more bytes are needed; calling again after `push` resumes parsing.
    pub fn next_frame(&mut self) -> Option<Bytes> {
        while self.buffer.len() >= MIN_FRAME_SIZE {
            let Some(offset) = find(&self.buffer, &self.magic.header) else {
                // Keep a possible partial header
                let keep = self.magic.header.len() - 1;
                let discard = self.buffer.len() - keep;
                self.buffer.advance(discard);
                self.stats.noise_bytes += discard as u64;
                return None;
            };

            if offset > 0 {
                self.buffer.advance(offset);
                self.stats.noise_bytes += offset as u64;
                continue;
            }

            if self.buffer.len() < LEN_OFFSET + 2 {
                return None;
            }

            let len =
                u16::from_le_bytes([self.buffer[LEN_OFFSET], self.buffer[LEN_OFFSET + 1]]) as usize;

            if len > MAX_PAYLOAD_LEN {
                tracing::debug!("Dropping frame header with implausible length {}", len);
                self.buffer.advance(self.magic.header.len());
                self.stats.dropped += 1;
                continue;
            }

            let total = FRAME_OVERHEAD + len;
            if self.buffer.len() < total {
                return None;
            }

            let candidate = self.buffer.split_to(total).freeze();
            if candidate[total - 4..] == self.magic.tail {
                self.stats.frames += 1;
                return Some(candidate.slice(LEN_OFFSET + 2..total - 4));
            }

            tracing::trace!("Dropping {}-byte frame with bad tail", total);
            self.stats.dropped += 1;
        }

        None
    }

    /// Iterate over every frame that is complete right now
    pub fn drain(&mut self) -> Frames<'_> {
        Frames { inner: self }
    }

    /// Forget buffered bytes (e.g. after reconnecting)
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Number of bytes waiting for more input
    #[inline]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn stats(&self) -> ReassemblerStats {
        self.stats
    }
}

/// Iterator returned by [`FrameReassembler::drain`]
pub struct Frames<'a> {
    inner: &'a mut FrameReassembler,
}

impl Iterator for Frames<'_> {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        self.inner.next_frame()
    }
}

fn find(haystack: &[u8], needle: &[u8; 4]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
