//! Receive-buffer reassembly
//!
//! Turns an arbitrary sequence of inbound byte chunks into discrete
//! items: handshake signals, validated frames, and invalid candidates.
//! A single-byte ACK/NACK chunk is a handshake signal and never enters
//! the frame buffer; everything else accumulates until the scanner
//! finds a complete candidate.

use super::{ACK, NACK};
use crate::core::codec::{find_complete_packet, parse_frame, ParsedFrame, STX};

/// Receive buffer cap. A corrupted length field can stall the scanner
/// until the buffer fills; past this point the stream is garbage and
/// the buffer resets.
const MAX_BUFFER: usize = 128 * 1024;

/// One reassembled item.
#[derive(Debug)]
pub enum RxItem {
    /// Handshake byte: `true` for ACK, `false` for NACK
    Handshake(bool),
    /// A complete, checksum-valid frame
    Frame(ParsedFrame),
    /// A complete candidate that failed validation (bad BCC)
    Invalid,
}

/// Stream reassembler feeding the codec's completeness scanner.
#[derive(Debug, Default)]
pub struct Reassembler {
    buffer: Vec<u8>,
}

impl Reassembler {
    /// Create an empty reassembler
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes currently buffered
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Feed one inbound chunk; returns the items it completed.
    ///
    /// Multiple frames arriving back-to-back in one chunk all come out
    /// in order. Bytes preceding a start sentinel are line noise and
    /// are discarded.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<RxItem> {
        let mut items = Vec::new();

        if chunk.len() == 1 && (chunk[0] == ACK || chunk[0] == NACK) {
            items.push(RxItem::Handshake(chunk[0] == ACK));
            return items;
        }

        self.buffer.extend_from_slice(chunk);

        loop {
            match self.buffer.iter().position(|&b| b == STX) {
                Some(start) if start > 0 => {
                    tracing::debug!(bytes = start, "discarding noise before start sentinel");
                    self.buffer.drain(..start);
                }
                Some(_) => {}
                None => {
                    self.buffer.clear();
                    break;
                }
            }

            let frame_len = find_complete_packet(&self.buffer);
            if frame_len == 0 {
                if self.buffer.len() > MAX_BUFFER {
                    tracing::warn!(bytes = self.buffer.len(), "receive buffer overflow, resetting");
                    self.buffer.clear();
                }
                break;
            }

            let candidate: Vec<u8> = self.buffer.drain(..frame_len).collect();
            let parsed = parse_frame(&candidate);
            if parsed.is_valid {
                items.push(RxItem::Frame(parsed));
            } else {
                items.push(RxItem::Invalid);
            }
        }

        items
    }
}
