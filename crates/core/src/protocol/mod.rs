//! Binary wire protocol of the 24GHz mmWave sensor
//!
//! Two framing namespaces share the serial line:
//! - report frames (sensor → host): `F4 F3 F2 F1` … `F8 F7 F6 F5`
//! - command/ACK frames (host ↔ sensor): `FD FC FB FA` … `04 03 02 01`
//!
//! Both use `[header:4][len:u16 LE][body:len][tail:4]`. There is no checksum;
//! integrity relies on the magic values only.

pub mod codec;
pub mod reassembler;

pub use codec::FrameCodec;
pub use reassembler::{FrameReassembler, ReassemblerStats};

/// Header + length field + tail
pub const FRAME_OVERHEAD: usize = 4 + 2 + 4;

/// Shortest byte run worth scanning for a frame
pub const MIN_FRAME_SIZE: usize = 10;

/// Declared body lengths above this are treated as corrupt
pub const MAX_PAYLOAD_LEN: usize = 256;

/// Header/tail pair identifying one framing namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameMagic {
    pub header: [u8; 4],
    pub tail: [u8; 4],
}

/// Sensor report frames
pub const REPORT_MAGIC: FrameMagic = FrameMagic {
    header: [0xF4, 0xF3, 0xF2, 0xF1],
    tail: [0xF8, 0xF7, 0xF6, 0xF5],
};

/// Configuration commands and their ACKs
pub const COMMAND_MAGIC: FrameMagic = FrameMagic {
    header: [0xFD, 0xFC, 0xFB, 0xFA],
    tail: [0x04, 0x03, 0x02, 0x01],
};

/// Wrap `body` in `magic` with a little-endian length prefix
pub(crate) fn frame(magic: &FrameMagic, body: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(FRAME_OVERHEAD + body.len());
    buf.extend_from_slice(&magic.header);
    buf.extend_from_slice(&(body.len() as u16).to_le_bytes());
    buf.extend_from_slice(body);
    buf.extend_from_slice(&magic.tail);
    buf
}
