//! Core module containing the terminal-communication layer
//!
//! This module provides:
//! - Packet codec for the TL3600 wire format (frames, BCC, fixed-width
//!   fields, request builders, response decoders, frame scanner)
//! - Protocol engine (ACK/NACK handshake, bounded retries, timeouts,
//!   stream reassembly, unsolicited event dispatch)
//! - Duplex byte-channel boundary and serial port implementation

pub mod codec;
pub mod link;
pub mod transport;
