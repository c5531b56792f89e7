//! # Payterm Core Library
//!
//! Terminal-communication layer for TL3600-class serial card payment
//! devices:
//! - Binary packet codec: frame construction/parsing, XOR block check
//!   character, fixed-width decimal and text fields, per-job response
//!   decoders, EUC-KR payload text with ASCII fallback
//! - Protocol engine: ACK/NACK handshake with bounded retries,
//!   independent handshake/response timeouts, byte-stream reassembly,
//!   unsolicited event dispatch
//! - Serial transport with port discovery
//!
//! The library encodes requests, decodes responses, and guarantees
//! reliable byte-level delivery. It does not decide when to charge,
//! how much, or what happens after approval — that is the payment
//! orchestrator's job.
//!
//! ## Example
//!
//! ```rust,no_run
//! use payterm_core::{
//!     build_approval_request, decode_response, ApprovalRequest, LinkConfig, ResponsePayload,
//!     TerminalLink, TransactionKind,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = LinkConfig::default();
//!     let link = TerminalLink::connect("/dev/ttyUSB0", None, config).await?;
//!
//!     let request = ApprovalRequest::simple(TransactionKind::Credit, 5000);
//!     let frame = build_approval_request("TERM0001", &request)?;
//!
//!     if let Some(response) = link.send_packet(&frame, true).await? {
//!         if let ResponsePayload::Approval(approval) = decode_response(&response)? {
//!             println!("approved: {}", !approval.is_rejected);
//!         }
//!     }
//!
//!     link.disconnect().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod core;

// Re-exports for convenience
pub use crate::config::LinkConfig;
pub use crate::core::codec::{
    build_approval_request, build_cancel_request, build_card_inquiry_request,
    build_device_check_request, build_frame, decode_response, find_complete_packet, parse_frame,
    ApprovalRequest, ApprovalResponse, CancelRequest, CancelType, CardInquiryResponse, CodecError,
    DeviceCheckResponse, EventResponse, EventType, JobCode, ModuleStatus, ParsedFrame,
    ResponsePayload, ResponseType, TransactionKind, TransactionMedia,
};
pub use crate::core::link::{LinkError, LinkEvent, TerminalLink, ACK, NACK};
pub use crate::core::transport::{
    list_ports, ByteChannel, PortInfo, SerialConfig, SerialParity, SerialTransport, TransportError,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
