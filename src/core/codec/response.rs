//! Response payload decoders, one per job code
//!
//! Each decoder walks the payload's fixed cumulative offsets and
//! produces a typed record. Text regions are best-effort: ASCII fields
//! are NUL-stripped and trimmed, localized fields decode EUC-KR with
//! an ASCII fallback.

use super::frame::ParsedFrame;
use super::wire::{
    reject_message, EventType, JobCode, ModuleStatus, ResponseType, TransactionMedia,
};
use super::{fields, CodecError};

/// Approval response payload width
pub const APPROVAL_RESPONSE_LEN: usize = 161;
/// Card inquiry response payload width
pub const CARD_INQUIRY_RESPONSE_LEN: usize = 57;
/// Device check response payload width
pub const DEVICE_CHECK_RESPONSE_LEN: usize = 4;
/// Event response payload width
pub const EVENT_RESPONSE_LEN: usize = 1;

/// Sequential reader over a fixed-width payload.
struct FieldCursor<'a> {
    payload: &'a [u8],
    pos: usize,
}

impl<'a> FieldCursor<'a> {
    fn new(payload: &'a [u8], expected: usize) -> Result<Self, CodecError> {
        if payload.len() < expected {
            return Err(CodecError::PayloadTooShort {
                expected,
                actual: payload.len(),
            });
        }
        Ok(Self { payload, pos: 0 })
    }

    fn take(&mut self, width: usize) -> &'a [u8] {
        let region = &self.payload[self.pos..self.pos + width];
        self.pos += width;
        region
    }

    fn take_byte(&mut self) -> u8 {
        self.take(1)[0]
    }
}

/// Decoded approval (or rejection) response.
///
/// A rejection here is a successfully decoded business outcome, not a
/// protocol failure: the frame was valid, the card was declined.
#[derive(Debug, Clone)]
pub struct ApprovalResponse {
    /// Transaction outcome
    pub response: ResponseType,
    /// Card presentation medium
    pub media: TransactionMedia,
    /// Masked card number
    pub card_number: String,
    /// Approved amount
    pub approved_amount: u64,
    /// Tax portion
    pub tax: u64,
    /// Service charge portion
    pub service_charge: u64,
    /// Installment months (0 = lump sum)
    pub installment_months: u8,
    /// Issuer approval number
    pub approval_number: String,
    /// Sales date (`YYYYMMDD`)
    pub sales_date: String,
    /// Sales time (`hhmmss`)
    pub sales_time: String,
    /// Acquirer transaction identifier
    pub transaction_id: String,
    /// Merchant identifier
    pub merchant_id: String,
    /// Terminal number at the acquirer
    pub terminal_number: String,
    /// Card issuer code (approval only)
    pub issuer_code: String,
    /// Card issuer name (approval only)
    pub issuer_name: String,
    /// Acquirer code (approval only)
    pub acquirer_code: String,
    /// Acquirer name (approval only)
    pub acquirer_name: String,
    /// True when the terminal declined the transaction
    pub is_rejected: bool,
    /// 2-character terminal error code, when the rejection carried one
    pub reject_code: Option<String>,
    /// Human-readable rejection reason
    pub reject_message: Option<String>,
}

/// Decode an approval response payload.
///
/// The two trailing 20-byte regions are contextual: on approval they
/// hold issuer/acquirer code+name pairs; on rejection the first holds
/// the terminal's raw rejection message and the second optionally
/// holds `-XX<message>` with a 2-character error code.
pub fn decode_approval_response(payload: &[u8]) -> Result<ApprovalResponse, CodecError> {
    let mut cursor = FieldCursor::new(payload, APPROVAL_RESPONSE_LEN)?;

    let response = ResponseType::from_u8(cursor.take_byte());
    let media = TransactionMedia::from_u8(cursor.take_byte());
    let card_number = fields::trim_ascii(cursor.take(20));
    let approved_amount = fields::parse_u64(cursor.take(10));
    let tax = fields::parse_u64(cursor.take(8));
    let service_charge = fields::parse_u64(cursor.take(8));
    let installment_months = fields::parse_u64(cursor.take(2)) as u8;
    let approval_number = fields::trim_ascii(cursor.take(12));
    let sales_date = fields::trim_ascii(cursor.take(8));
    let sales_time = fields::trim_ascii(cursor.take(6));
    let transaction_id = fields::trim_ascii(cursor.take(20));
    let merchant_id = fields::trim_ascii(cursor.take(15));
    let terminal_number = fields::trim_ascii(cursor.take(10));
    let issuer_region = cursor.take(20);
    let acquirer_region = cursor.take(20);

    let is_rejected = response == ResponseType::Rejected;

    let mut issuer_code = String::new();
    let mut issuer_name = String::new();
    let mut acquirer_code = String::new();
    let mut acquirer_name = String::new();
    let mut reject_code = None;
    let mut reject_message_text = None;

    if is_rejected {
        let raw = fields::trim_localized(issuer_region);
        if acquirer_region.len() >= 3 && acquirer_region[0] == b'-' {
            let code = fields::trim_ascii(&acquirer_region[1..3]);
            if code.len() == 2 {
                reject_message_text = Some(match reject_message(&code) {
                    Some(friendly) => friendly.to_string(),
                    None => fields::trim_localized(&acquirer_region[3..]),
                });
                reject_code = Some(code);
            }
        }
        if reject_message_text.is_none() && !raw.is_empty() {
            reject_message_text = Some(raw);
        }
    } else {
        issuer_code = fields::trim_ascii(&issuer_region[..2]);
        issuer_name = fields::trim_localized(&issuer_region[2..]);
        acquirer_code = fields::trim_ascii(&acquirer_region[..2]);
        acquirer_name = fields::trim_localized(&acquirer_region[2..]);
    }

    Ok(ApprovalResponse {
        response,
        media,
        card_number,
        approved_amount,
        tax,
        service_charge,
        installment_months,
        approval_number,
        sales_date,
        sales_time,
        transaction_id,
        merchant_id,
        terminal_number,
        issuer_code,
        issuer_name,
        acquirer_code,
        acquirer_name,
        is_rejected,
        reject_code,
        reject_message: reject_message_text,
    })
}

/// Decoded card inquiry response.
#[derive(Debug, Clone)]
pub struct CardInquiryResponse {
    /// Card presentation medium
    pub media: TransactionMedia,
    /// Card type code as sent by the terminal
    pub card_type: String,
    /// Masked card number
    pub card_number: String,
    /// Last transaction timestamp (`YYYYMMDDhhmmss`)
    pub last_transaction_datetime: String,
    /// Last transaction amount
    pub last_transaction_amount: u64,
    /// Remaining card balance
    pub card_balance: u64,
    /// Transaction status code as sent by the terminal
    pub transaction_status: String,
}

/// Decode a card inquiry response payload.
pub fn decode_card_inquiry_response(payload: &[u8]) -> Result<CardInquiryResponse, CodecError> {
    let mut cursor = FieldCursor::new(payload, CARD_INQUIRY_RESPONSE_LEN)?;

    Ok(CardInquiryResponse {
        media: TransactionMedia::from_u8(cursor.take_byte()),
        card_type: fields::trim_ascii(cursor.take(1)),
        card_number: fields::trim_ascii(cursor.take(20)),
        last_transaction_datetime: fields::trim_ascii(cursor.take(14)),
        last_transaction_amount: fields::parse_u64(cursor.take(10)),
        card_balance: fields::parse_u64(cursor.take(10)),
        transaction_status: fields::trim_ascii(cursor.take(1)),
    })
}

/// Decoded device self-check response: one status per hardware module.
#[derive(Debug, Clone)]
pub struct DeviceCheckResponse {
    /// Card reader module
    pub card_reader: ModuleStatus,
    /// Receipt printer module
    pub printer: ModuleStatus,
    /// Customer display module
    pub display: ModuleStatus,
    /// Acquirer network module
    pub network: ModuleStatus,
}

impl DeviceCheckResponse {
    /// True when every module reports normal.
    pub fn all_normal(&self) -> bool {
        [self.card_reader, self.printer, self.display, self.network]
            .iter()
            .all(|s| *s == ModuleStatus::Normal)
    }
}

/// Decode a device self-check response payload.
pub fn decode_device_check_response(payload: &[u8]) -> Result<DeviceCheckResponse, CodecError> {
    let mut cursor = FieldCursor::new(payload, DEVICE_CHECK_RESPONSE_LEN)?;

    Ok(DeviceCheckResponse {
        card_reader: ModuleStatus::from_u8(cursor.take_byte()),
        printer: ModuleStatus::from_u8(cursor.take_byte()),
        display: ModuleStatus::from_u8(cursor.take_byte()),
        network: ModuleStatus::from_u8(cursor.take_byte()),
    })
}

/// Decoded unsolicited event response.
#[derive(Debug, Clone)]
pub struct EventResponse {
    /// Event kind
    pub event: EventType,
}

/// Decode an event response payload.
pub fn decode_event_response(payload: &[u8]) -> Result<EventResponse, CodecError> {
    let mut cursor = FieldCursor::new(payload, EVENT_RESPONSE_LEN)?;

    Ok(EventResponse {
        event: EventType::from_u8(cursor.take_byte()),
    })
}

/// A decoded response payload of any kind.
#[derive(Debug, Clone)]
pub enum ResponsePayload {
    /// Approval/rejection outcome
    Approval(ApprovalResponse),
    /// Card inquiry result
    CardInquiry(CardInquiryResponse),
    /// Device self-check result
    DeviceCheck(DeviceCheckResponse),
    /// Unsolicited event
    Event(EventResponse),
}

/// Decode a parsed frame's payload according to its job code.
pub fn decode_response(frame: &ParsedFrame) -> Result<ResponsePayload, CodecError> {
    match frame.job {
        JobCode::ApprovalResponse => {
            Ok(ResponsePayload::Approval(decode_approval_response(&frame.payload)?))
        }
        JobCode::CardInquiry => Ok(ResponsePayload::CardInquiry(decode_card_inquiry_response(
            &frame.payload,
        )?)),
        JobCode::DeviceCheck => Ok(ResponsePayload::DeviceCheck(decode_device_check_response(
            &frame.payload,
        )?)),
        JobCode::EventResponse => {
            Ok(ResponsePayload::Event(decode_event_response(&frame.payload)?))
        }
        other => Err(CodecError::NotAResponse(other.as_u8())),
    }
}
