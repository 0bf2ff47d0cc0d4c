//! Application messages and close outcomes.

use crate::error::{Error, Result};

/// Close status code carried by a close frame (RFC 6455 Section 7.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum CloseCode {
    /// 1000, the purpose of the connection has been fulfilled.
    #[default]
    Normal,
    /// 1001, the endpoint is going away.
    GoingAway,
    /// 1002, protocol error.
    ProtocolError,
    /// 1003, the endpoint cannot accept this kind of data.
    UnsupportedData,
    /// 1007, message data inconsistent with its type (e.g. non-UTF-8 text).
    InvalidPayload,
    /// 1008, policy violation.
    PolicyViolation,
    /// 1009, message too big to process.
    MessageTooBig,
    /// 1010, a required extension was not negotiated.
    MandatoryExtension,
    /// 1011, unexpected condition on the server.
    InternalError,
    /// Any other code.
    Other(u16),
}

impl CloseCode {
    /// Create a `CloseCode` from its numeric value.
    #[must_use]
    pub const fn from_u16(code: u16) -> Self {
        match code {
            1000 => CloseCode::Normal,
            1001 => CloseCode::GoingAway,
            1002 => CloseCode::ProtocolError,
            1003 => CloseCode::UnsupportedData,
            1007 => CloseCode::InvalidPayload,
            1008 => CloseCode::PolicyViolation,
            1009 => CloseCode::MessageTooBig,
            1010 => CloseCode::MandatoryExtension,
            1011 => CloseCode::InternalError,
            other => CloseCode::Other(other),
        }
    }

    /// Numeric value of this close code.
    #[must_use]
    pub const fn as_u16(&self) -> u16 {
        match self {
            CloseCode::Normal => 1000,
            CloseCode::GoingAway => 1001,
            CloseCode::ProtocolError => 1002,
            CloseCode::UnsupportedData => 1003,
            CloseCode::InvalidPayload => 1007,
            CloseCode::PolicyViolation => 1008,
            CloseCode::MessageTooBig => 1009,
            CloseCode::MandatoryExtension => 1010,
            CloseCode::InternalError => 1011,
            CloseCode::Other(code) => *code,
        }
    }

    /// Whether this code may appear in a close frame on the wire.
    ///
    /// Accepted: 1000-1003, 1007-1014 and the application range 3000-4999.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self.as_u16(), 1000..=1003 | 1007..=1014 | 3000..=4999)
    }

    /// Codes an endpoint must never put in a close frame (1004-1006, 1015).
    #[must_use]
    pub const fn is_reserved(&self) -> bool {
        matches!(self.as_u16(), 1004..=1006 | 1015)
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        CloseCode::from_u16(code)
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

/// Code and reason of a finished close handshake.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CloseFrame {
    /// The close status code.
    pub code: CloseCode,
    /// Human-readable reason, possibly empty.
    pub reason: String,
}

impl CloseFrame {
    /// Create a new close outcome with the given code and reason.
    #[must_use]
    pub fn new(code: CloseCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Decode the payload of a received close frame.
    ///
    /// An empty payload means a normal closure with no reason.
    ///
    /// # Errors
    ///
    /// - `Error::MalformedClosePayload` for a one-byte payload
    /// - `Error::InvalidCloseCode` if the code may not be sent on the wire
    /// - `Error::InvalidUtf8` if the reason is not UTF-8
    pub fn parse(payload: &[u8]) -> Result<Self> {
        match payload {
            [] => Ok(Self::default()),
            [_] => Err(Error::MalformedClosePayload),
            [hi, lo, reason @ ..] => {
                let code = CloseCode::from_u16(u16::from_be_bytes([*hi, *lo]));
                if !code.is_valid() {
                    return Err(Error::InvalidCloseCode(code.as_u16()));
                }
                let reason = std::str::from_utf8(reason)?;
                Ok(Self::new(code, reason))
            }
        }
    }
}

/// A complete data message, either received or to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A UTF-8 text message.
    Text(String),
    /// A binary message.
    Binary(Vec<u8>),
}

impl Message {
    /// Create a text message.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Message::Text(s.into())
    }

    /// Create a binary message.
    #[must_use]
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Message::Binary(data.into())
    }

    /// Returns `true` if this is a text message.
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Message::Text(_))
    }

    /// Returns `true` if this is a binary message.
    #[must_use]
    pub const fn is_binary(&self) -> bool {
        matches!(self, Message::Binary(_))
    }

    /// Raw payload bytes as they go on the wire.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Message::Text(s) => s.as_bytes(),
            Message::Binary(data) => data,
        }
    }

    /// Borrow the text content, if this is a text message.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Message::Text(s) => Some(s),
            Message::Binary(_) => None,
        }
    }

    /// Consume and return the text content, if this is a text message.
    #[must_use]
    pub fn into_text(self) -> Option<String> {
        match self {
            Message::Text(s) => Some(s),
            Message::Binary(_) => None,
        }
    }

    /// Consume and return the payload bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Message::Text(s) => s.into_bytes(),
            Message::Binary(data) => data,
        }
    }
}

impl From<String> for Message {
    fn from(s: String) -> Self {
        Message::Text(s)
    }
}

impl From<&str> for Message {
    fn from(s: &str) -> Self {
        Message::Text(s.to_owned())
    }
}

impl From<Vec<u8>> for Message {
    fn from(data: Vec<u8>) -> Self {
        Message::Binary(data)
    }
}

impl From<&[u8]> for Message {
    fn from(data: &[u8]) -> Self {
        Message::Binary(data.to_vec())
    }
}
