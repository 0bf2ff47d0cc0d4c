//! Incremental frame parser.
//!
//! Bytes are pushed in whatever chunks the transport delivers. The parser
//! keeps one growable buffer and walks each frame through the stages of its
//! layout, returning control whenever the next stage needs more bytes than
//! are buffered. Nothing is lost between calls, so a frame may be split at any
//! byte: inside the header, the extended length, the mask key or the payload.

use bytes::{Buf, Bytes, BytesMut};

use crate::config::{Config, Limits};
use crate::error::{Error, Result};
use crate::message::Message;
use crate::protocol::assembler::MessageAssembler;
use crate::protocol::frame::MAX_CONTROL_FRAME_PAYLOAD;
use crate::protocol::mask::apply_mask_fast;
use crate::protocol::{Frame, OpCode};

/// Header fields decoded so far.
#[derive(Debug, Clone, Copy)]
struct Head {
    fin: bool,
    opcode: OpCode,
    masked: bool,
    length: u64,
}

/// What the parser is waiting for.
#[derive(Debug, Clone, Copy)]
enum Stage {
    /// FIN, RSV and opcode byte.
    Opcode,
    /// Mask bit and 7-bit length byte.
    Length(Head),
    /// 2 or 8 byte big-endian extended length.
    ExtendedLength(Head, usize),
    /// 4 byte masking key.
    MaskKey(Head),
    /// The payload itself.
    Payload(Head, Option<[u8; 4]>),
}

/// Something the connection has to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A complete, reassembled data message.
    Message(Message),
    /// Ping with its payload.
    Ping(Bytes),
    /// Pong with its payload.
    Pong(Bytes),
    /// Raw close payload (code + reason, possibly empty).
    Close(Bytes),
}

/// Resumable RFC 6455 frame parser with message reassembly.
#[derive(Debug)]
pub struct FrameParser {
    buffer: BytesMut,
    stage: Stage,
    require_masking: bool,
    limits: Limits,
    assembler: MessageAssembler,
}

impl FrameParser {
    /// Create a parser using the masking policy and limits of `config`.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            stage: Stage::Opcode,
            require_masking: config.require_masking,
            limits: config.limits.clone(),
            assembler: MessageAssembler::new(config.limits.clone()),
        }
    }

    /// Append a chunk of inbound bytes.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Number of bytes received but not yet consumed by a frame stage.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Whether a fragmented message is waiting for more frames.
    #[must_use]
    pub fn is_assembling(&self) -> bool {
        self.assembler.is_assembling()
    }

    /// Drop all buffered input and any partial message.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.stage = Stage::Opcode;
        self.assembler.reset();
    }

    /// Extract the next complete frame, payload unmasked.
    ///
    /// Returns `Ok(None)` when more input is needed.
    ///
    /// # Errors
    ///
    /// Any framing violation detected in the header: reserved bits, unknown
    /// opcode, fragmented or oversized control frame, missing mask when one is
    /// required, invalid or oversized length. After an error the parser state
    /// is unspecified and should be [`reset`](Self::reset).
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            match self.stage {
                Stage::Opcode => {
                    if self.buffer.is_empty() {
                        return Ok(None);
                    }
                    let byte = self.buffer.get_u8();

                    let (rsv1, rsv2, rsv3) = (byte & 0x40 != 0, byte & 0x20 != 0, byte & 0x10 != 0);
                    if rsv1 || rsv2 || rsv3 {
                        return Err(Error::ReservedBitsSet { rsv1, rsv2, rsv3 });
                    }

                    let fin = byte & 0x80 != 0;
                    let opcode = OpCode::from_u8(byte & 0x0F)?;
                    if opcode.is_control() && !fin {
                        return Err(Error::FragmentedControlFrame(opcode.as_u8()));
                    }

                    self.stage = Stage::Length(Head {
                        fin,
                        opcode,
                        masked: false,
                        length: 0,
                    });
                }
                Stage::Length(mut head) => {
                    if self.buffer.is_empty() {
                        return Ok(None);
                    }
                    let byte = self.buffer.get_u8();

                    head.masked = byte & 0x80 != 0;
                    if self.require_masking && !head.masked {
                        return Err(Error::UnmaskedFrame);
                    }

                    self.stage = match byte & 0x7F {
                        126 => Stage::ExtendedLength(head, 2),
                        127 => Stage::ExtendedLength(head, 8),
                        len => {
                            head.length = u64::from(len);
                            self.after_length(head)?
                        }
                    };
                }
                Stage::ExtendedLength(mut head, width) => {
                    if self.buffer.len() < width {
                        return Ok(None);
                    }
                    head.length = self.buffer.get_uint(width);
                    if head.length >> 63 != 0 {
                        return Err(Error::InvalidPayloadLength(head.length));
                    }
                    self.stage = self.after_length(head)?;
                }
                Stage::MaskKey(head) => {
                    if self.buffer.len() < 4 {
                        return Ok(None);
                    }
                    let mut key = [0u8; 4];
                    self.buffer.copy_to_slice(&mut key);
                    self.stage = Stage::Payload(head, Some(key));
                }
                Stage::Payload(head, mask) => {
                    // after_length bounded this by max_frame_size, a usize
                    let len = head.length as usize;
                    if self.buffer.len() < len {
                        return Ok(None);
                    }

                    let mut payload = self.buffer.split_to(len);
                    if let Some(key) = mask {
                        apply_mask_fast(&mut payload, key);
                    }
                    self.stage = Stage::Opcode;

                    let mut frame = Frame::new(head.fin, head.opcode, payload.freeze());
                    frame.mask = mask;
                    return Ok(Some(frame));
                }
            }
        }
    }

    /// Extract the next thing the connection must handle.
    ///
    /// Data frames are fed through the assembler and only surface once their
    /// message is complete. Control frames surface immediately, even in the
    /// middle of a fragmented message.
    ///
    /// # Errors
    ///
    /// Everything [`next_frame`](Self::next_frame) reports, plus fragmentation
    /// violations, message size overflow and invalid UTF-8 in text messages.
    pub fn next_inbound(&mut self) -> Result<Option<Inbound>> {
        while let Some(frame) = self.next_frame()? {
            log::trace!(
                "received {} frame: fin={} masked={} len={}",
                frame.opcode,
                frame.fin,
                frame.is_masked(),
                frame.payload().len()
            );

            match frame.opcode {
                OpCode::Ping => return Ok(Some(Inbound::Ping(frame.into_payload()))),
                OpCode::Pong => return Ok(Some(Inbound::Pong(frame.into_payload()))),
                OpCode::Close => return Ok(Some(Inbound::Close(frame.into_payload()))),
                OpCode::Continuation | OpCode::Text | OpCode::Binary => {
                    if let Some(message) = self.assembler.push(&frame)? {
                        return Ok(Some(Inbound::Message(message)));
                    }
                }
            }
        }
        Ok(None)
    }

    fn after_length(&self, head: Head) -> Result<Stage> {
        if head.opcode.is_control() && head.length > MAX_CONTROL_FRAME_PAYLOAD as u64 {
            return Err(Error::ControlFrameTooLarge(head.length));
        }
        self.limits.check_frame_size(head.length)?;

        Ok(if head.masked {
            Stage::MaskKey(head)
        } else {
            Stage::Payload(head, None)
        })
    }
}
