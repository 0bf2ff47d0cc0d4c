//! Error types for the WebSocket protocol driver.
//!
//! Every protocol violation the parser or the connection can detect has a
//! variant here. The `Display` text of a variant is the human-readable reason
//! that ends up in the error event and in the close frame sent to the peer.

use thiserror::Error;

use crate::message::CloseCode;

/// Result type alias for WebSocket operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving a WebSocket connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Invalid or incomplete opening handshake request.
    #[error("Invalid handshake: {0}")]
    InvalidHandshake(String),

    /// A header value contains characters that would break the response.
    #[error("Invalid value for header {header}: {reason}")]
    InvalidHeaderValue {
        /// Header name.
        header: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Response headers can no longer be changed.
    #[error("Handshake response has already been sent")]
    HandshakeAlreadySent,

    /// Frame carried an opcode RFC 6455 does not define.
    #[error("Unrecognized frame opcode: {0}")]
    UnrecognizedOpcode(u8),

    /// Peer sent an unmasked frame while masking is required.
    #[error("Received unmasked frame but masking is required")]
    UnmaskedFrame,

    /// Reserved bits set without a negotiated extension.
    #[error(
        "One or more reserved bits are on: reserved1 = {}, reserved2 = {}, reserved3 = {}",
        bit(.rsv1),
        bit(.rsv2),
        bit(.rsv3)
    )]
    ReservedBitsSet {
        /// Reserved bit 1.
        rsv1: bool,
        /// Reserved bit 2.
        rsv2: bool,
        /// Reserved bit 3.
        rsv3: bool,
    },

    /// Control frame with FIN=0.
    #[error("Received fragmented control frame: opcode = {0}")]
    FragmentedControlFrame(u8),

    /// Control frame payload over 125 bytes.
    #[error("Received control frame having too long payload: {0}")]
    ControlFrameTooLarge(u64),

    /// 64-bit payload length with the most significant bit set.
    #[error("Received frame with invalid payload length: {0}")]
    InvalidPayloadLength(u64),

    /// Continuation frame without a message in progress.
    #[error("Received unexpected continuation frame")]
    UnexpectedContinuation,

    /// New data frame while a fragmented message is still open.
    #[error("Received new data frame but previous continuous frame is unfinished")]
    UnfinishedMessage,

    /// Text message or close reason that is not valid UTF-8.
    #[error("Could not decode a text frame as UTF-8")]
    InvalidUtf8,

    /// Close frame whose payload is a single byte.
    #[error("Received close frame with malformed payload")]
    MalformedClosePayload,

    /// Close frame carrying a code that must not appear on the wire.
    #[error("Received close frame with invalid code: {0}")]
    InvalidCloseCode(u16),

    /// Frame size exceeds configured maximum.
    #[error("WebSocket frame length too large: {size} bytes (max: {max})")]
    FrameTooLarge {
        /// Declared payload length.
        size: u64,
        /// Maximum allowed size.
        max: usize,
    },

    /// Message size exceeds configured maximum.
    #[error("WebSocket message too large: {size} bytes (max: {max})")]
    MessageTooLarge {
        /// Accumulated message size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },
}

fn bit(flag: &bool) -> u8 {
    u8::from(*flag)
}

impl Error {
    /// The close code sent to the peer when this error terminates a connection.
    #[must_use]
    pub const fn close_code(&self) -> CloseCode {
        match self {
            Error::UnmaskedFrame => CloseCode::UnsupportedData,
            Error::InvalidUtf8 => CloseCode::InvalidPayload,
            Error::FrameTooLarge { .. } | Error::MessageTooLarge { .. } => {
                CloseCode::MessageTooBig
            }
            _ => CloseCode::ProtocolError,
        }
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(_: std::str::Utf8Error) -> Self {
        Error::InvalidUtf8
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(_: std::string::FromUtf8Error) -> Self {
        Error::InvalidUtf8
    }
}
