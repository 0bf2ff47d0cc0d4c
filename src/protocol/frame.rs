//! WebSocket frames and their wire encoding (RFC 6455 Section 5.2).

use bytes::{BufMut, Bytes, BytesMut};

use crate::protocol::OpCode;
use crate::protocol::mask::apply_mask_fast;

/// Maximum payload size for control frames (RFC 6455).
pub const MAX_CONTROL_FRAME_PAYLOAD: usize = 125;

/// Largest header: 2 bytes + 8-byte extended length + 4-byte mask key.
pub const MAX_HEADER_SIZE: usize = 14;

/// A single WebSocket frame.
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-------+-+-------------+-------------------------------+
/// |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
/// |I|S|S|S|  (4)  |A|     (7)     |             (16/64)           |
/// |N|V|V|V|       |S|             |   (if payload len==126/127)   |
/// | |1|2|3|       |K|             |                               |
/// +-+-+-+-+-------+-+-------------+-------------------------------+
/// |                     Masking key (if present)                  |
/// +---------------------------------------------------------------+
/// |                          Payload data                         |
/// +---------------------------------------------------------------+
/// ```
///
/// Frames produced by the parser always hold the unmasked payload; `mask`
/// records the key that was on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Final fragment flag.
    pub fin: bool,
    /// Reserved bit 1.
    pub rsv1: bool,
    /// Reserved bit 2.
    pub rsv2: bool,
    /// Reserved bit 3.
    pub rsv3: bool,
    /// Frame opcode.
    pub opcode: OpCode,
    /// Masking key the frame arrived with, if any.
    pub mask: Option<[u8; 4]>,
    payload: Bytes,
}

impl Frame {
    /// Create a new unmasked frame.
    #[must_use]
    pub fn new(fin: bool, opcode: OpCode, payload: impl Into<Bytes>) -> Self {
        Self {
            fin,
            rsv1: false,
            rsv2: false,
            rsv3: false,
            opcode,
            mask: None,
            payload: payload.into(),
        }
    }

    /// Create a text frame.
    #[must_use]
    pub fn text(data: impl Into<Bytes>) -> Self {
        Self::new(true, OpCode::Text, data)
    }

    /// Create a binary frame.
    #[must_use]
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Self::new(true, OpCode::Binary, data)
    }

    /// Create a close frame.
    ///
    /// With `code == None` the payload is empty and `reason` is ignored.
    #[must_use]
    pub fn close(code: Option<u16>, reason: &str) -> Self {
        let payload = match code {
            Some(code) => {
                let mut data = BytesMut::with_capacity(2 + reason.len());
                data.put_u16(code);
                data.put_slice(reason.as_bytes());
                data.freeze()
            }
            None => Bytes::new(),
        };
        Self::new(true, OpCode::Close, payload)
    }

    /// Create a ping frame.
    #[must_use]
    pub fn ping(data: impl Into<Bytes>) -> Self {
        Self::new(true, OpCode::Ping, data)
    }

    /// Create a pong frame.
    #[must_use]
    pub fn pong(data: impl Into<Bytes>) -> Self {
        Self::new(true, OpCode::Pong, data)
    }

    /// Whether the frame arrived masked.
    #[inline]
    #[must_use]
    pub const fn is_masked(&self) -> bool {
        self.mask.is_some()
    }

    /// Get the payload bytes.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Take ownership of the payload.
    #[must_use]
    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Serialize the frame into `dst`.
    ///
    /// When `mask` is given the mask bit is set, the key follows the length
    /// field and the payload is XORed with it. The frame's own `mask` field is
    /// not consulted.
    pub fn encode(&self, dst: &mut BytesMut, mask: Option<[u8; 4]>) {
        let payload_len = self.payload.len();
        dst.reserve(self.wire_size(mask.is_some()));

        let mut byte0 = self.opcode.as_u8();
        if self.fin {
            byte0 |= 0x80;
        }
        if self.rsv1 {
            byte0 |= 0x40;
        }
        if self.rsv2 {
            byte0 |= 0x20;
        }
        if self.rsv3 {
            byte0 |= 0x10;
        }
        dst.put_u8(byte0);

        let mask_bit = if mask.is_some() { 0x80 } else { 0x00 };
        if payload_len <= 125 {
            dst.put_u8(mask_bit | payload_len as u8);
        } else if payload_len <= 65535 {
            dst.put_u8(mask_bit | 126);
            dst.put_u16(payload_len as u16);
        } else {
            dst.put_u8(mask_bit | 127);
            dst.put_u64(payload_len as u64);
        }

        match mask {
            Some(key) => {
                dst.put_slice(&key);
                let start = dst.len();
                dst.put_slice(&self.payload);
                apply_mask_fast(&mut dst[start..], key);
            }
            None => dst.put_slice(&self.payload),
        }
    }

    /// Serialize the frame into a fresh buffer.
    #[must_use]
    pub fn to_bytes(&self, mask: Option<[u8; 4]>) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.wire_size(mask.is_some()));
        self.encode(&mut buf, mask);
        buf.freeze()
    }

    /// Calculate the size needed to write this frame.
    #[must_use]
    pub fn wire_size(&self, masked: bool) -> usize {
        let payload_len = self.payload.len();
        let extended_len_size = if payload_len <= 125 {
            0
        } else if payload_len <= 65535 {
            2
        } else {
            8
        };
        let mask_size = if masked { 4 } else { 0 };
        2 + extended_len_size + mask_size + payload_len
    }
}
