//! Packet codec for the TL3600 wire format
//!
//! Pure, I/O-free building blocks:
//! - Frame construction and parsing with BCC (XOR) validation
//! - Fixed-width field encoding/decoding primitives
//! - Request builders (approval, cancel, device check, card inquiry)
//! - Response decoders, one per job code
//! - Frame-completeness scanner for stream reassembly

mod fields;
mod frame;
mod request;
mod response;
mod wire;

pub use fields::{parse_u64, push_numeric, push_text, put_fixed, trim_ascii, trim_localized};
pub use frame::{
    bcc, build_frame, find_complete_packet, parse_frame, ParsedFrame, ETX, HEADER_LEN, STX,
    TERMINAL_ID_LEN, TIMESTAMP_LEN, TRAILER_LEN,
};
pub use request::{
    build_approval_request, build_cancel_request, build_card_inquiry_request,
    build_device_check_request, ApprovalRequest, CancelRequest, APPROVAL_NUMBER_LEN,
    APPROVAL_PAYLOAD_LEN, CANCEL_FIXED_PAYLOAD_LEN,
};
pub use response::{
    decode_approval_response, decode_card_inquiry_response, decode_device_check_response,
    decode_event_response, decode_response, ApprovalResponse, CardInquiryResponse,
    DeviceCheckResponse, EventResponse, ResponsePayload, APPROVAL_RESPONSE_LEN,
    CARD_INQUIRY_RESPONSE_LEN, DEVICE_CHECK_RESPONSE_LEN, EVENT_RESPONSE_LEN,
};
pub use wire::{
    reject_message, CancelType, EventType, JobCode, ModuleStatus, ResponseType, TransactionKind,
    TransactionMedia,
};

/// Codec errors
///
/// Wire-level invalidity of an inbound frame is NOT an error — it is
/// the `is_valid` flag on [`ParsedFrame`]. These errors cover build-side
/// validation and payloads too short to decode.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Numeric value does not fit its fixed decimal field
    #[error("value {value} does not fit a {width}-digit field")]
    ValueTooLarge {
        /// The offending value
        value: u64,
        /// Field width in digits
        width: usize,
    },

    /// Payload exceeds the 2-byte length field
    #[error("payload of {0} bytes exceeds the wire limit")]
    PayloadTooLarge(usize),

    /// Additional info exceeds its 2-digit length prefix
    #[error("additional info of {0} bytes exceeds the 2-digit count")]
    AdditionalInfoTooLong(usize),

    /// Response payload shorter than its fixed layout
    #[error("payload too short: expected {expected} bytes, got {actual}")]
    PayloadTooShort {
        /// Bytes required by the layout
        expected: usize,
        /// Bytes actually present
        actual: usize,
    },

    /// Frame's job code is not a decodable response kind
    #[error("job code {0:#04x} is not a response")]
    NotAResponse(u8),
}
