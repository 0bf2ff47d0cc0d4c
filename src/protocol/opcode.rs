//! WebSocket frame opcodes as defined in RFC 6455.

use crate::error::{Error, Result};

/// WebSocket frame opcode.
///
/// Values outside this set are reported as [`Error::UnrecognizedOpcode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// Continuation frame (0x0), carries a later fragment of a message.
    Continuation = 0x0,
    /// Text frame (0x1).
    Text = 0x1,
    /// Binary frame (0x2).
    Binary = 0x2,
    /// Close frame (0x8).
    Close = 0x8,
    /// Ping frame (0x9).
    Ping = 0x9,
    /// Pong frame (0xA).
    Pong = 0xA,
}

impl OpCode {
    /// Decode the low nibble of a frame's first byte.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnrecognizedOpcode` for reserved values (0x3-0x7, 0xB-0xF)
    /// and for anything that does not fit in four bits.
    pub fn from_u8(byte: u8) -> Result<Self> {
        match byte {
            0x0 => Ok(OpCode::Continuation),
            0x1 => Ok(OpCode::Text),
            0x2 => Ok(OpCode::Binary),
            0x8 => Ok(OpCode::Close),
            0x9 => Ok(OpCode::Ping),
            0xA => Ok(OpCode::Pong),
            other => Err(Error::UnrecognizedOpcode(other)),
        }
    }

    /// Convert OpCode to raw byte value.
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Close, Ping and Pong.
    #[inline]
    #[must_use]
    pub const fn is_control(self) -> bool {
        matches!(self, OpCode::Close | OpCode::Ping | OpCode::Pong)
    }

    /// Continuation, Text and Binary.
    #[inline]
    #[must_use]
    pub const fn is_data(self) -> bool {
        matches!(self, OpCode::Continuation | OpCode::Text | OpCode::Binary)
    }

    /// Get human-readable name for this opcode.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            OpCode::Continuation => "Continuation",
            OpCode::Text => "Text",
            OpCode::Binary => "Binary",
            OpCode::Close => "Close",
            OpCode::Ping => "Ping",
            OpCode::Pong => "Pong",
        }
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
