//! Wire vocabulary: single-byte code sets and the terminal error table
//!
//! Every code is one ASCII character on the wire. Each set decodes
//! into a closed enum with an `Unknown` fallback; an unrecognized
//! byte is data, not a panic.

/// Frame job code, identifying the request/response kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobCode {
    /// Approval (charge) request ('A')
    ApprovalRequest,
    /// Cancel request ('C')
    CancelRequest,
    /// Approval response ('B')
    ApprovalResponse,
    /// Card inquiry ('Q'), both directions
    CardInquiry,
    /// Device self-check ('D'), both directions
    DeviceCheck,
    /// Unsolicited event response ('E')
    EventResponse,
    /// Unrecognized job code
    Unknown(u8),
}

impl JobCode {
    /// Decode a job code byte
    pub fn from_u8(code: u8) -> Self {
        match code {
            b'A' => JobCode::ApprovalRequest,
            b'C' => JobCode::CancelRequest,
            b'B' => JobCode::ApprovalResponse,
            b'Q' => JobCode::CardInquiry,
            b'D' => JobCode::DeviceCheck,
            b'E' => JobCode::EventResponse,
            other => JobCode::Unknown(other),
        }
    }

    /// Wire byte for this job code
    pub fn as_u8(&self) -> u8 {
        match self {
            JobCode::ApprovalRequest => b'A',
            JobCode::CancelRequest => b'C',
            JobCode::ApprovalResponse => b'B',
            JobCode::CardInquiry => b'Q',
            JobCode::DeviceCheck => b'D',
            JobCode::EventResponse => b'E',
            JobCode::Unknown(other) => *other,
        }
    }

    /// Get name of job code
    pub fn name(&self) -> &'static str {
        match self {
            JobCode::ApprovalRequest => "Approval Request",
            JobCode::CancelRequest => "Cancel Request",
            JobCode::ApprovalResponse => "Approval Response",
            JobCode::CardInquiry => "Card Inquiry",
            JobCode::DeviceCheck => "Device Check",
            JobCode::EventResponse => "Event",
            JobCode::Unknown(_) => "Unknown",
        }
    }
}

/// Transaction outcome reported by the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    /// Transaction approved ('O')
    Approved,
    /// Transaction rejected ('X')
    Rejected,
    /// Unrecognized outcome code
    Unknown(u8),
}

impl ResponseType {
    /// Decode an outcome byte
    pub fn from_u8(code: u8) -> Self {
        match code {
            b'O' => ResponseType::Approved,
            b'X' => ResponseType::Rejected,
            other => ResponseType::Unknown(other),
        }
    }
}

/// Physical medium the card was presented with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMedia {
    /// IC chip contact ('I')
    IcChip,
    /// Contactless RF or magnetic swipe ('R')
    RfOrSwipe,
    /// Manually keyed card number ('M')
    ManualEntry,
    /// Unrecognized media code
    Unknown(u8),
}

impl TransactionMedia {
    /// Decode a media byte
    pub fn from_u8(code: u8) -> Self {
        match code {
            b'I' => TransactionMedia::IcChip,
            b'R' => TransactionMedia::RfOrSwipe,
            b'M' => TransactionMedia::ManualEntry,
            other => TransactionMedia::Unknown(other),
        }
    }
}

/// Status of one hardware module in a device-check response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleStatus {
    /// Module operational ('0')
    Normal,
    /// Module faulted ('1')
    Faulted,
    /// Unrecognized status code
    Unknown(u8),
}

impl ModuleStatus {
    /// Decode a status byte
    pub fn from_u8(code: u8) -> Self {
        match code {
            b'0' => ModuleStatus::Normal,
            b'1' => ModuleStatus::Faulted,
            other => ModuleStatus::Unknown(other),
        }
    }
}

/// Device-originated event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    /// Card inserted into the IC slot ('1')
    CardInserted,
    /// Card removed ('2')
    CardRemoved,
    /// Customer signature captured ('3')
    SignatureCaptured,
    /// Unrecognized event code
    Unknown(u8),
}

impl EventType {
    /// Decode an event byte
    pub fn from_u8(code: u8) -> Self {
        match code {
            b'1' => EventType::CardInserted,
            b'2' => EventType::CardRemoved,
            b'3' => EventType::SignatureCaptured,
            other => EventType::Unknown(other),
        }
    }
}

/// Cancellation variant carried in a cancel request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelType {
    /// Cancel with the original card present ('N')
    Normal,
    /// Card-less cancel ('K')
    CardLess,
    /// Wallet barcode cancel ('W')
    WalletBarcode,
    /// Cash-receipt authorization cancel ('C')
    CashReceipt,
}

impl CancelType {
    /// Wire byte for this cancel type
    pub fn as_u8(&self) -> u8 {
        match self {
            CancelType::Normal => b'N',
            CancelType::CardLess => b'K',
            CancelType::WalletBarcode => b'W',
            CancelType::CashReceipt => b'C',
        }
    }
}

/// Transaction kind requested from the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    /// Credit card charge ('1')
    Credit,
    /// Debit/check card charge ('2')
    Debit,
    /// Cash receipt issuance ('3')
    CashReceipt,
}

impl TransactionKind {
    /// Wire byte for this transaction kind
    pub fn as_u8(&self) -> u8 {
        match self {
            TransactionKind::Credit => b'1',
            TransactionKind::Debit => b'2',
            TransactionKind::CashReceipt => b'3',
        }
    }
}

/// Look up the user-facing message for a 2-character terminal error
/// code. Returns `None` for codes outside the table; callers then keep
/// the terminal's raw rejection text.
pub fn reject_message(code: &str) -> Option<&'static str> {
    let message = match code {
        "01" => "Card read error",
        "02" => "Invalid card",
        "03" => "Invalid merchant",
        "05" => "Declined by issuer",
        "07" => "Pick up card",
        "09" => "Duplicate transaction",
        "12" => "Invalid transaction",
        "14" => "Invalid card number",
        "15" => "No such issuer",
        "30" => "Message format error",
        "41" => "Lost card",
        "43" => "Stolen card",
        "51" => "Insufficient funds",
        "54" => "Expired card",
        "55" => "Incorrect PIN",
        "61" => "Amount limit exceeded",
        "62" => "Restricted card",
        "75" => "PIN tries exceeded",
        "91" => "Issuer unavailable",
        "96" => "System malfunction",
        _ => return None,
    };
    Some(message)
}
