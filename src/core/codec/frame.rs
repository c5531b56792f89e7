//! Frame layout, construction, parsing, and the completeness scanner
//!
//! Wire order: STX, terminal id (16), timestamp (14), job code (1),
//! reserved response code (1), payload length (2, LE), payload, ETX,
//! BCC. The BCC is the XOR of every byte from STX through ETX.

use super::wire::JobCode;
use super::{fields, CodecError};
use chrono::Local;

/// Start-of-frame sentinel
pub const STX: u8 = 0x02;
/// End-of-frame sentinel
pub const ETX: u8 = 0x03;

/// Fixed header size: STX + terminal id + timestamp + job + reserved + length
pub const HEADER_LEN: usize = 1 + TERMINAL_ID_LEN + TIMESTAMP_LEN + 1 + 1 + 2;
/// Trailer size: ETX + BCC
pub const TRAILER_LEN: usize = 2;
/// Terminal identifier field width
pub const TERMINAL_ID_LEN: usize = 16;
/// Timestamp field width (`YYYYMMDDhhmmss`)
pub const TIMESTAMP_LEN: usize = 14;

/// Block check character: XOR of all bytes.
pub fn bcc(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &b| acc ^ b)
}

/// Build a complete frame for `job` with the given payload.
///
/// The terminal identifier is fit-or-truncated into its 16-byte field
/// (NUL padding) and the timestamp is stamped from the local clock.
pub fn build_frame(terminal_id: &str, job: JobCode, payload: &[u8]) -> Result<Vec<u8>, CodecError> {
    if payload.len() > u16::MAX as usize {
        return Err(CodecError::PayloadTooLarge(payload.len()));
    }

    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len() + TRAILER_LEN);
    frame.push(STX);
    fields::push_text(&mut frame, terminal_id, TERMINAL_ID_LEN, 0x00);
    frame.extend_from_slice(
        Local::now()
            .format("%Y%m%d%H%M%S")
            .to_string()
            .as_bytes(),
    );
    frame.push(job.as_u8());
    frame.push(0x00);
    frame.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    frame.extend_from_slice(payload);
    frame.push(ETX);
    frame.push(bcc(&frame));

    Ok(frame)
}

/// A parsed frame with its wire-level validity verdict.
///
/// Parsing never fails outright: the engine decides how to react to an
/// invalid frame (NACK + discard), so validity is a flag, not an error.
#[derive(Debug, Clone)]
pub struct ParsedFrame {
    /// Terminal identifier, NUL padding stripped
    pub terminal_id: String,
    /// Timestamp digits as sent (`YYYYMMDDhhmmss`)
    pub timestamp: String,
    /// Job code
    pub job: JobCode,
    /// Reserved response code byte
    pub response_code: u8,
    /// Payload bytes
    pub payload: Vec<u8>,
    /// True iff length, end sentinel, and BCC all check out
    pub is_valid: bool,
}

impl ParsedFrame {
    fn invalid() -> Self {
        Self {
            terminal_id: String::new(),
            timestamp: String::new(),
            job: JobCode::Unknown(0),
            response_code: 0,
            payload: Vec::new(),
            is_valid: false,
        }
    }
}

/// Parse a byte buffer holding exactly one frame candidate.
pub fn parse_frame(data: &[u8]) -> ParsedFrame {
    if data.len() < HEADER_LEN + TRAILER_LEN || data[0] != STX {
        return ParsedFrame::invalid();
    }

    let terminal_id = fields::trim_ascii(&data[1..1 + TERMINAL_ID_LEN]);
    let timestamp = fields::trim_ascii(&data[17..17 + TIMESTAMP_LEN]);
    let job = JobCode::from_u8(data[31]);
    let response_code = data[32];
    let payload_len = u16::from_le_bytes([data[33], data[34]]) as usize;

    let total = HEADER_LEN + payload_len + TRAILER_LEN;
    if data.len() != total {
        return ParsedFrame {
            terminal_id,
            timestamp,
            job,
            response_code,
            payload: Vec::new(),
            is_valid: false,
        };
    }

    let payload = data[HEADER_LEN..HEADER_LEN + payload_len].to_vec();
    let etx_ok = data[HEADER_LEN + payload_len] == ETX;
    let bcc_ok = bcc(&data[..total - 1]) == data[total - 1];

    ParsedFrame {
        terminal_id,
        timestamp,
        job,
        response_code,
        payload,
        is_valid: etx_ok && bcc_ok,
    }
}

/// Scan a byte window for a complete frame candidate.
///
/// Returns the candidate's total length when the window holds, starting
/// at its first STX, a full header, the declared payload, and the end
/// sentinel at the computed offset. Returns 0 when no STX is present
/// or more bytes are needed. Never consumes bytes.
pub fn find_complete_packet(window: &[u8]) -> usize {
    let start = match window.iter().position(|&b| b == STX) {
        Some(i) => i,
        None => return 0,
    };

    let candidate = &window[start..];
    if candidate.len() < HEADER_LEN {
        return 0;
    }

    let payload_len = u16::from_le_bytes([candidate[33], candidate[34]]) as usize;
    let total = HEADER_LEN + payload_len + TRAILER_LEN;
    if candidate.len() < total {
        return 0;
    }
    if candidate[HEADER_LEN + payload_len] != ETX {
        return 0;
    }

    total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> Vec<u8> {
        build_frame("TERM0001", JobCode::ApprovalRequest, b"PAYLOAD").unwrap()
    }

    #[test]
    fn test_build_parse_round_trip() {
        let frame = build_frame("TERM0001", JobCode::ApprovalRequest, b"PAYLOAD").unwrap();
        assert_eq!(frame.len(), HEADER_LEN + 7 + TRAILER_LEN);

        let parsed = parse_frame(&frame);
        assert!(parsed.is_valid);
        assert_eq!(parsed.terminal_id, "TERM0001");
        assert_eq!(parsed.job, JobCode::ApprovalRequest);
        assert_eq!(parsed.response_code, 0);
        assert_eq!(parsed.payload, b"PAYLOAD");
        assert_eq!(parsed.timestamp.len(), TIMESTAMP_LEN);
        assert!(parsed.timestamp.bytes().all(|b| b.is_ascii_digit()));
    }

    #[test]
    fn test_empty_payload_round_trip() {
        let frame = build_frame("TERM0001", JobCode::DeviceCheck, &[]).unwrap();
        let parsed = parse_frame(&frame);
        assert!(parsed.is_valid);
        assert!(parsed.payload.is_empty());
    }

    #[test]
    fn test_terminal_id_exact_and_truncated() {
        let exact = "ABCDEFGHIJKLMNOP"; // 16 bytes
        let parsed = parse_frame(&build_frame(exact, JobCode::ApprovalRequest, &[]).unwrap());
        assert_eq!(parsed.terminal_id, exact);

        let long = "ABCDEFGHIJKLMNOPQRST"; // 20 bytes
        let parsed = parse_frame(&build_frame(long, JobCode::ApprovalRequest, &[]).unwrap());
        assert_eq!(parsed.terminal_id, exact);
    }

    #[test]
    fn test_checksum_sensitivity_every_bit() {
        let frame = sample_frame();
        for i in 0..frame.len() - 1 {
            for bit in 0..8 {
                let mut corrupted = frame.clone();
                corrupted[i] ^= 1 << bit;
                // Flipping a payload-length or sentinel bit breaks the
                // structure; anything else breaks the BCC.
                assert!(
                    !parse_frame(&corrupted).is_valid,
                    "bit {} of byte {} went undetected",
                    bit,
                    i
                );
            }
        }
    }

    #[test]
    fn test_checksum_byte_itself_is_checked() {
        let mut frame = sample_frame();
        let last = frame.len() - 1;
        frame[last] ^= 0x01;
        assert!(!parse_frame(&frame).is_valid);
    }

    #[test]
    fn test_parse_rejects_short_buffer() {
        assert!(!parse_frame(&[STX, 0x00, 0x01]).is_valid);
        assert!(!parse_frame(&[]).is_valid);
    }

    #[test]
    fn test_scanner_exact_frame() {
        let frame = sample_frame();
        assert_eq!(find_complete_packet(&frame), frame.len());
    }

    #[test]
    fn test_scanner_trailing_bytes_ignored() {
        let mut window = sample_frame();
        let frame_len = window.len();
        window.extend_from_slice(b"GARBAGE");
        assert_eq!(find_complete_packet(&window), frame_len);
    }

    #[test]
    fn test_scanner_incomplete() {
        let frame = sample_frame();
        assert_eq!(find_complete_packet(&frame[..frame.len() - 1]), 0);
        assert_eq!(find_complete_packet(&frame[..HEADER_LEN - 1]), 0);
    }

    #[test]
    fn test_scanner_no_stx() {
        assert_eq!(find_complete_packet(b"no sentinel here"), 0);
        assert_eq!(find_complete_packet(&[]), 0);
    }

    #[test]
    fn test_scanner_bad_end_sentinel() {
        let mut frame = sample_frame();
        let etx_at = frame.len() - 2;
        frame[etx_at] = 0x00;
        assert_eq!(find_complete_packet(&frame), 0);
    }
}
