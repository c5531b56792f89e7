//! Request frame builders
//!
//! One builder per request kind, assembling the fixed-width payload in
//! wire order and handing it to the frame layer. Numeric fields are
//! validated against their widths; the approval number is the one
//! space-padded, left-aligned field on the wire and must stay that way.

use super::frame::build_frame;
use super::wire::{CancelType, JobCode, TransactionKind};
use super::{fields, CodecError};

/// Approval request payload width: kind + amount + tax + service
/// charge + installment + signature flag.
pub const APPROVAL_PAYLOAD_LEN: usize = 1 + 10 + 8 + 8 + 2 + 1;

/// Fixed portion of the cancel request payload, before the
/// length-prefixed additional info.
pub const CANCEL_FIXED_PAYLOAD_LEN: usize = 1 + 1 + 10 + 8 + 8 + 2 + 1 + 12 + 8 + 6 + 2;

/// Approval number field width (space-padded, left-aligned)
pub const APPROVAL_NUMBER_LEN: usize = 12;

/// Parameters for an approval (charge) request.
#[derive(Debug, Clone)]
pub struct ApprovalRequest {
    /// Transaction kind
    pub kind: TransactionKind,
    /// Amount to charge, in the terminal's minor unit
    pub amount: u64,
    /// Tax portion of the amount
    pub tax: u64,
    /// Service charge portion of the amount
    pub service_charge: u64,
    /// Installment months (0 = lump sum)
    pub installment_months: u8,
    /// Whether a customer signature was captured
    pub signature: bool,
}

impl ApprovalRequest {
    /// Lump-sum charge with no tax or service breakdown.
    pub fn simple(kind: TransactionKind, amount: u64) -> Self {
        Self {
            kind,
            amount,
            tax: 0,
            service_charge: 0,
            installment_months: 0,
            signature: false,
        }
    }
}

/// Parameters for a cancel request.
#[derive(Debug, Clone)]
pub struct CancelRequest {
    /// Cancellation variant
    pub cancel_type: CancelType,
    /// Transaction kind of the original charge
    pub kind: TransactionKind,
    /// Original amount
    pub amount: u64,
    /// Original tax
    pub tax: u64,
    /// Original service charge
    pub service_charge: u64,
    /// Original installment months
    pub installment_months: u8,
    /// Whether a customer signature was captured
    pub signature: bool,
    /// Approval number of the original transaction
    pub approval_number: String,
    /// Original sales date (`YYYYMMDD`)
    pub original_date: String,
    /// Original sales time (`hhmmss`)
    pub original_time: String,
    /// Card-less cancel key, wallet barcode, or cash-receipt
    /// authorization number
    pub additional_info: Option<String>,
}

fn signature_flag(present: bool) -> u8 {
    if present {
        b'1'
    } else {
        b'0'
    }
}

/// Build a complete approval request frame (30-byte payload).
pub fn build_approval_request(
    terminal_id: &str,
    req: &ApprovalRequest,
) -> Result<Vec<u8>, CodecError> {
    let mut payload = Vec::with_capacity(APPROVAL_PAYLOAD_LEN);
    payload.push(req.kind.as_u8());
    fields::push_numeric(&mut payload, req.amount, 10)?;
    fields::push_numeric(&mut payload, req.tax, 8)?;
    fields::push_numeric(&mut payload, req.service_charge, 8)?;
    fields::push_numeric(&mut payload, u64::from(req.installment_months), 2)?;
    payload.push(signature_flag(req.signature));

    debug_assert_eq!(payload.len(), APPROVAL_PAYLOAD_LEN);
    build_frame(terminal_id, JobCode::ApprovalRequest, &payload)
}

/// Build a complete cancel request frame (59 + additional-info bytes).
pub fn build_cancel_request(
    terminal_id: &str,
    req: &CancelRequest,
) -> Result<Vec<u8>, CodecError> {
    let info = req.additional_info.as_deref().unwrap_or("");
    if info.len() > 99 {
        return Err(CodecError::AdditionalInfoTooLong(info.len()));
    }

    let mut payload = Vec::with_capacity(CANCEL_FIXED_PAYLOAD_LEN + info.len());
    payload.push(req.cancel_type.as_u8());
    payload.push(req.kind.as_u8());
    fields::push_numeric(&mut payload, req.amount, 10)?;
    fields::push_numeric(&mut payload, req.tax, 8)?;
    fields::push_numeric(&mut payload, req.service_charge, 8)?;
    fields::push_numeric(&mut payload, u64::from(req.installment_months), 2)?;
    payload.push(signature_flag(req.signature));
    fields::push_text(&mut payload, &req.approval_number, APPROVAL_NUMBER_LEN, b' ');
    fields::push_text(&mut payload, &req.original_date, 8, b' ');
    fields::push_text(&mut payload, &req.original_time, 6, b' ');
    fields::push_numeric(&mut payload, info.len() as u64, 2)?;
    payload.extend_from_slice(info.as_bytes());

    debug_assert_eq!(payload.len(), CANCEL_FIXED_PAYLOAD_LEN + info.len());
    build_frame(terminal_id, JobCode::CancelRequest, &payload)
}

/// Build an empty-payload device self-check request frame.
pub fn build_device_check_request(terminal_id: &str) -> Result<Vec<u8>, CodecError> {
    build_frame(terminal_id, JobCode::DeviceCheck, &[])
}

/// Build an empty-payload card inquiry request frame.
pub fn build_card_inquiry_request(terminal_id: &str) -> Result<Vec<u8>, CodecError> {
    build_frame(terminal_id, JobCode::CardInquiry, &[])
}
