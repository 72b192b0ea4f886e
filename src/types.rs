//! Core data types for MBO events and book orders.
//!
//! These types are designed to be:
//! - Closed: actions and sides are exhaustive enums, never raw characters
//! - Exact: prices are fixed-point integers (1e-9 units), never floats
//! - Pass-through: event metadata is carried verbatim for the output record

use serde::{Deserialize, Serialize};

use crate::error::{BookError, Result};

/// Number of price levels per side in an MBP-10 snapshot.
pub const MBP_DEPTH: usize = 10;

/// Number of fields in an input MBO row.
pub const MBO_ROW_FIELDS: usize = 15;

/// Fixed-point scale for prices (9 implied decimals).
pub const PRICE_SCALE: i64 = 1_000_000_000;

const PRICE_DECIMALS: usize = 9;

/// Input field positions.
pub mod field {
    pub const TS_RECV: usize = 0;
    pub const TS_EVENT: usize = 1;
    pub const RTYPE: usize = 2;
    pub const PUBLISHER_ID: usize = 3;
    pub const INSTRUMENT_ID: usize = 4;
    pub const ACTION: usize = 5;
    pub const SIDE: usize = 6;
    pub const PRICE: usize = 7;
    pub const SIZE: usize = 8;
    pub const CHANNEL_ID: usize = 9;
    pub const ORDER_ID: usize = 10;
    pub const FLAGS: usize = 11;
    pub const TS_IN_DELTA: usize = 12;
    pub const SEQUENCE: usize = 13;
    pub const SYMBOL: usize = 14;
}

/// MBO action type (what happened to the order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Action {
    /// Add new order to book
    Add = b'A',
    /// Cancel/remove order
    Cancel = b'C',
    /// Trade execution (no book effect on its own)
    Trade = b'T',
    /// Fill of a resting order (no book effect on its own)
    Fill = b'F',
    /// Book reset / clear notification
    Reset = b'R',
}

impl Action {
    /// Parse action from a byte. Unrecognized codes return `None`.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'A' => Some(Action::Add),
            b'C' => Some(Action::Cancel),
            b'T' => Some(Action::Trade),
            b'F' => Some(Action::Fill),
            b'R' => Some(Action::Reset),
            _ => None,
        }
    }

    /// Convert to byte representation.
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Single-character code as written in the output record.
    pub fn as_char(self) -> char {
        self.to_byte() as char
    }
}

/// Order side (bid or ask)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Side {
    /// Buy order (bid)
    Bid = b'B',
    /// Sell order (ask)
    Ask = b'A',
    /// Neutral / unknown side
    None = b'N',
}

impl Side {
    /// Parse side from a byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'B' => Some(Side::Bid),
            b'A' => Some(Side::Ask),
            b'N' => Some(Side::None),
            _ => None,
        }
    }

    /// Convert to byte representation.
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Single-character code as written in the output record.
    pub fn as_char(self) -> char {
        self.to_byte() as char
    }

    /// Check if this is a bid.
    #[inline(always)]
    pub fn is_bid(self) -> bool {
        matches!(self, Side::Bid)
    }

    /// Check if this is an ask.
    #[inline(always)]
    pub fn is_ask(self) -> bool {
        matches!(self, Side::Ask)
    }
}

/// Metadata carried through from the input row to the output record.
///
/// Values are kept as the exact text of the input so the output echoes them
/// byte for byte.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    pub ts_recv: String,
    pub ts_event: String,
    pub rtype: String,
    pub publisher_id: String,
    pub instrument_id: String,
    pub channel_id: String,
    pub flags: String,
    pub ts_in_delta: String,
    pub sequence: String,
    pub symbol: String,
}

/// Market By Order (MBO) event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MboEvent {
    /// Order identifier
    pub order_id: u64,

    /// Decoded action; `None` for codes this protocol subset does not know
    pub action: Option<Action>,

    /// Order side
    pub side: Side,

    /// Fixed-point price (1e-9 units); `None` when the field was blank
    pub price: Option<i64>,

    /// Order size
    pub size: u32,

    /// Pass-through fields
    pub meta: EventMetadata,
}

impl MboEvent {
    /// Create a new event with empty metadata.
    pub fn new(order_id: u64, action: Action, side: Side, price: i64, size: u32) -> Self {
        Self {
            order_id,
            action: Some(action),
            side,
            price: Some(price),
            size,
            meta: EventMetadata::default(),
        }
    }

    /// Attach pass-through metadata.
    pub fn with_metadata(mut self, meta: EventMetadata) -> Self {
        self.meta = meta;
        self
    }

    /// Set the symbol.
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.meta.symbol = symbol.into();
        self
    }

    /// Set the sequence number text.
    pub fn with_sequence(mut self, sequence: impl Into<String>) -> Self {
        self.meta.sequence = sequence.into();
        self
    }

    /// Decode an event from one input row (15 ordered text fields).
    ///
    /// Side, price, size and order id are only validated for actions that
    /// touch the book or the trade sequence (`A`, `C`, `T`, `F`). Reset rows
    /// and unrecognized actions decode with `Side::None`, no price and zero
    /// size/id wherever those fields do not parse.
    ///
    /// # Errors
    /// - `MalformedRow` if the field count is wrong
    /// - `Parse` if the action code is not a single character, or a book
    ///   action carries an invalid side code or numeric field
    pub fn from_fields<S: AsRef<str>>(fields: &[S]) -> Result<Self> {
        if fields.len() != MBO_ROW_FIELDS {
            return Err(BookError::MalformedRow {
                expected: MBO_ROW_FIELDS,
                found: fields.len(),
            });
        }
        let get = |i: usize| fields[i].as_ref().trim();

        let action = match get(field::ACTION).as_bytes() {
            [code] => Action::from_byte(*code),
            _ => return Err(BookError::parse("action", get(field::ACTION))),
        };
        let strict = matches!(
            action,
            Some(Action::Add | Action::Cancel | Action::Trade | Action::Fill)
        );

        let side = match get(field::SIDE).as_bytes() {
            [code] => Side::from_byte(*code),
            _ => None,
        }
        .ok_or_else(|| BookError::parse("side", get(field::SIDE)));
        let side = lenient(side, strict, Side::None)?;

        let price = match get(field::PRICE) {
            "" => Ok(None),
            text => parse_price(text).map(Some),
        };
        let price = lenient(price, strict, None)?;

        let size = get(field::SIZE)
            .parse::<u32>()
            .map_err(|_| BookError::parse("size", get(field::SIZE)));
        let size = lenient(size, strict, 0)?;

        let order_id = get(field::ORDER_ID)
            .parse::<u64>()
            .map_err(|_| BookError::parse("order_id", get(field::ORDER_ID)));
        let order_id = lenient(order_id, strict, 0)?;

        Ok(Self {
            order_id,
            action,
            side,
            price,
            size,
            meta: EventMetadata {
                ts_recv: get(field::TS_RECV).to_string(),
                ts_event: get(field::TS_EVENT).to_string(),
                rtype: get(field::RTYPE).to_string(),
                publisher_id: get(field::PUBLISHER_ID).to_string(),
                instrument_id: get(field::INSTRUMENT_ID).to_string(),
                channel_id: get(field::CHANNEL_ID).to_string(),
                flags: get(field::FLAGS).to_string(),
                ts_in_delta: get(field::TS_IN_DELTA).to_string(),
                sequence: get(field::SEQUENCE).to_string(),
                symbol: get(field::SYMBOL).to_string(),
            },
        })
    }

    /// Check whether this event carries the given action.
    #[inline]
    pub fn is(&self, action: Action) -> bool {
        self.action == Some(action)
    }

    /// Price as floating point dollars (for display only).
    #[inline]
    pub fn price_as_f64(&self) -> Option<f64> {
        self.price.map(price_to_f64)
    }
}

/// Order information stored in the order index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: u64,
    pub side: Side,
    pub price: i64,
    pub size: u32,
}

/// Substitute `fallback` for a decode failure unless the field is required.
fn lenient<T>(decoded: Result<T>, strict: bool, fallback: T) -> Result<T> {
    match decoded {
        Err(_) if !strict => Ok(fallback),
        other => other,
    }
}

/// Fixed-point price as floating point dollars (for display only).
#[inline]
pub fn price_to_f64(price: i64) -> f64 {
    price as f64 / PRICE_SCALE as f64
}

/// Parse a decimal price string into fixed-point (1e-9 units).
///
/// Accepts an optional sign, integer digits and up to nine fractional digits.
pub fn parse_price(text: &str) -> Result<i64> {
    let err = || BookError::parse("price", text);

    let (negative, body) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(err());
    }
    if frac_part.len() > PRICE_DECIMALS
        || !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(err());
    }

    let mut value: i64 = 0;
    for b in int_part.bytes().chain(frac_part.bytes()) {
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(i64::from(b - b'0')))
            .ok_or_else(err)?;
    }
    for _ in frac_part.len()..PRICE_DECIMALS {
        value = value.checked_mul(10).ok_or_else(err)?;
    }

    Ok(if negative { -value } else { value })
}

/// Format a fixed-point price with two decimals, rounding half away from zero.
pub fn format_price(price: i64) -> String {
    const CENT: i128 = (PRICE_SCALE / 100) as i128;
    let magnitude = (price as i128).abs();
    let cents = (magnitude + CENT / 2) / CENT;
    let sign = if price < 0 && cents != 0 { "-" } else { "" };
    format!("{sign}{}.{:02}", cents / 100, cents % 100)
}
