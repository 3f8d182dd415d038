//! Report decoding and command encoding

use crate::error::{CoreError, DecodeError, Result};
use crate::protocol::{frame, COMMAND_MAGIC, REPORT_MAGIC};
use crate::types::{CommandFrame, DataType, ReportFrame, TargetStatus};

/// Secondary header byte at the start of every report body
const DATA_HEADER: u8 = 0xAA;

/// Trailer the sensor appends after the target data
const DATA_TRAILER: [u8; 2] = [0x55, 0x00];

/// Bytes needed to read every field of a report body
const REPORT_FIELDS_LEN: usize = 11;

/// Largest command body the u16 length field can describe
const MAX_COMMAND_BODY: usize = u16::MAX as usize;

/// Stateless encoder/decoder for sensor frames
pub struct FrameCodec;

impl FrameCodec {
    /// Decode a report body (bytes between the length field and the tail)
    ///
    /// Layout, little-endian:
    /// `[type][0xAA][status][motion cm:2][motion energy][static cm:2][static energy][detect cm:2]…`
    pub fn decode_report(payload: &[u8]) -> std::result::Result<ReportFrame, DecodeError> {
        if payload.len() < REPORT_FIELDS_LEN {
            return Err(DecodeError::Truncated {
                len: payload.len(),
                need: REPORT_FIELDS_LEN,
            });
        }

        if payload[1] != DATA_HEADER {
            return Err(DecodeError::InvalidDataHeader(payload[1]));
        }

        let data_type =
            DataType::from_byte(payload[0]).ok_or(DecodeError::UnknownDataType(payload[0]))?;
        // Only the four documented states are accepted; anything else is a
        // corrupt frame and must not count as presence.
        let target_status = TargetStatus::from_byte(payload[2])
            .ok_or(DecodeError::UnknownTargetStatus(payload[2]))?;

        Ok(ReportFrame {
            data_type,
            target_status,
            motion_distance_cm: u16::from_le_bytes([payload[3], payload[4]]),
            motion_energy: payload[5],
            static_distance_cm: u16::from_le_bytes([payload[6], payload[7]]),
            static_energy: payload[8],
            detection_distance_cm: u16::from_le_bytes([payload[9], payload[10]]),
        })
    }

    /// Encode a command frame
    ///
    /// Returns `[FD FC FB FA][len:u16 LE][word:u16 LE][payload][04 03 02 01]`
    /// where `len` covers the command word and payload.
    pub fn encode_command(word: u16, payload: &[u8]) -> Result<Vec<u8>> {
        let body_len = 2 + payload.len();
        if body_len > MAX_COMMAND_BODY {
            return Err(CoreError::InvalidCommand(format!(
                "payload of {} bytes does not fit the length field",
                payload.len()
            )));
        }

        let mut body = Vec::with_capacity(body_len);
        body.extend_from_slice(&word.to_le_bytes());
        body.extend_from_slice(payload);
        Ok(frame(&COMMAND_MAGIC, &body))
    }

    /// Encode a prepared `CommandFrame`
    pub fn encode(cmd: &CommandFrame) -> Result<Vec<u8>> {
        Self::encode_command(cmd.word, &cmd.payload)
    }

    /// Split a command/ACK body into its command word and parameters
    pub fn split_command(body: &[u8]) -> std::result::Result<(u16, &[u8]), DecodeError> {
        if body.len() < 2 {
            return Err(DecodeError::Truncated {
                len: body.len(),
                need: 2,
            });
        }
        Ok((u16::from_le_bytes([body[0], body[1]]), &body[2..]))
    }

    /// Encode a complete report frame the way the sensor emits it
    ///
    /// Used by simulators and tests that need realistic byte streams.
    pub fn encode_report(report: &ReportFrame) -> Vec<u8> {
        let mut body = Vec::with_capacity(REPORT_FIELDS_LEN + DATA_TRAILER.len());
        body.push(report.data_type.to_byte());
        body.push(DATA_HEADER);
        body.push(report.target_status.to_byte());
        body.extend_from_slice(&report.motion_distance_cm.to_le_bytes());
        body.push(report.motion_energy);
        body.extend_from_slice(&report.static_distance_cm.to_le_bytes());
        body.push(report.static_energy);
        body.extend_from_slice(&report.detection_distance_cm.to_le_bytes());
        body.extend_from_slice(&DATA_TRAILER);
        frame(&REPORT_MAGIC, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{FrameReassembler, FRAME_OVERHEAD};

    // Basic frame captured from a sensor: moving target at 150cm
    const CAPTURED_BODY: [u8; 13] = [
        0x02, 0xAA, 0x01, 0x96, 0x00, 0x3C, 0x00, 0x00, 0x00, 0xB4, 0x00, 0x55, 0x00,
    ];

    #[test]
    fn test_decode_captured_report() {
        let frame = FrameCodec::decode_report(&CAPTURED_BODY).unwrap();
        assert_eq!(frame.data_type, DataType::Basic);
        assert_eq!(frame.target_status, TargetStatus::Moving);
        assert_eq!(frame.motion_distance_cm, 150);
        assert_eq!(frame.motion_energy, 60);
        assert_eq!(frame.static_distance_cm, 0);
        assert_eq!(frame.detection_distance_cm, 180);
    }

    #[test]
    fn test_engineering_report_uses_same_layout() {
        let mut body = CAPTURED_BODY.to_vec();
        body[0] = 0x01;
        // Per-gate energies follow the basic fields in engineering mode
        body.splice(11..11, [0x08, 0x08, 10, 20, 30].iter().copied());

        let frame = FrameCodec::decode_report(&body).unwrap();
        assert_eq!(frame.data_type, DataType::Engineering);
        assert_eq!(frame.motion_distance_cm, 150);
    }

    #[test]
    fn test_invalid_data_header() {
        let mut body = CAPTURED_BODY;
        body[1] = 0x55;
        assert_eq!(
            FrameCodec::decode_report(&body),
            Err(DecodeError::InvalidDataHeader(0x55))
        );
    }

    #[test]
    fn test_unknown_data_type() {
        let mut body = CAPTURED_BODY;
        body[0] = 0x07;
        assert_eq!(
            FrameCodec::decode_report(&body),
            Err(DecodeError::UnknownDataType(0x07))
        );
    }

    #[test]
    fn test_header_checked_before_type() {
        let mut body = CAPTURED_BODY;
        body[0] = 0x07;
        body[1] = 0x00;
        assert_eq!(
            FrameCodec::decode_report(&body),
            Err(DecodeError::InvalidDataHeader(0x00))
        );
    }

    #[test]
    fn test_unknown_target_status() {
        let mut body = CAPTURED_BODY;
        body[2] = 0x09;
        assert_eq!(
            FrameCodec::decode_report(&body),
            Err(DecodeError::UnknownTargetStatus(0x09))
        );
    }

    #[test]
    fn test_truncated_report() {
        let result = FrameCodec::decode_report(&CAPTURED_BODY[..6]);
        assert_eq!(result, Err(DecodeError::Truncated { len: 6, need: 11 }));
    }

    #[test]
    fn test_encode_enable_config_matches_wire() {
        let encoded = FrameCodec::encode(&CommandFrame::enable_config()).unwrap();
        assert_eq!(
            encoded,
            vec![
                0xFD, 0xFC, 0xFB, 0xFA, 0x04, 0x00, 0xFF, 0x00, 0x01, 0x00, 0x04, 0x03, 0x02,
                0x01
            ]
        );
    }

    #[test]
    fn test_encode_sensitivity_length() {
        let encoded = FrameCodec::encode(&CommandFrame::set_sensitivity(40)).unwrap();
        assert_eq!(encoded.len(), 30);
        assert_eq!(&encoded[4..6], &20u16.to_le_bytes());
        assert_eq!(&encoded[6..8], &[0x64, 0x00]);
    }

    #[test]
    fn test_encode_rejects_oversized_payload() {
        let payload = vec![0u8; MAX_COMMAND_BODY];
        let result = FrameCodec::encode_command(0x0001, &payload);
        assert!(matches!(result, Err(CoreError::InvalidCommand(_))));
    }

    fn roundtrip(word: u16, payload: &[u8]) -> (u16, Vec<u8>) {
        let encoded = FrameCodec::encode_command(word, payload).unwrap();
        assert_eq!(encoded.len(), FRAME_OVERHEAD + 2 + payload.len());

        let mut reassembler = FrameReassembler::for_commands();
        reassembler.push(&encoded);
        let body = reassembler.next_frame().expect("frame should reassemble");
        assert!(reassembler.next_frame().is_none());

        let (decoded_word, rest) = FrameCodec::split_command(&body).unwrap();
        (decoded_word, rest.to_vec())
    }

    #[test]
    fn test_command_roundtrip_enable_config() {
        assert_eq!(roundtrip(0x00FF, &[0x01, 0x00]), (0x00FF, vec![0x01, 0x00]));
    }

    #[test]
    fn test_command_roundtrip_sensitivity() {
        let payload: Vec<u8> = (1..=14).collect();
        assert_eq!(roundtrip(0x0064, &payload), (0x0064, payload.clone()));

        let real = CommandFrame::set_sensitivity(75);
        assert_eq!(roundtrip(real.word, &real.payload), (0x0064, real.payload));
    }

    #[test]
    fn test_command_roundtrip_empty_payload() {
        assert_eq!(roundtrip(0x00FE, &[]), (0x00FE, vec![]));
    }

    #[test]
    fn test_split_command_too_short() {
        assert!(FrameCodec::split_command(&[0x01]).is_err());
    }

    #[test]
    fn test_encode_report_decodes_back() {
        let report = ReportFrame::basic(TargetStatus::Both)
            .with_motion(120, 40)
            .with_static(95, 77)
            .with_detection_distance(130);
        let framed = FrameCodec::encode_report(&report);

        let mut reassembler = FrameReassembler::for_reports();
        reassembler.push(&framed);
        let body = reassembler.next_frame().unwrap();
        assert_eq!(FrameCodec::decode_report(&body).unwrap(), report);
    }
}
