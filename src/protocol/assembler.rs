//! Reassembly of fragmented data messages (RFC 6455 Section 5.4).

use bytes::BytesMut;

use crate::config::Limits;
use crate::error::{Error, Result};
use crate::message::Message;
use crate::protocol::{Frame, OpCode};

/// Accumulates data frames until a frame with FIN=1 completes the message.
///
/// Only one message can be in progress at a time. Control frames are not
/// accepted here; the parser surfaces them directly.
#[derive(Debug)]
pub struct MessageAssembler {
    buffer: BytesMut,
    opcode: Option<OpCode>,
    limits: Limits,
}

impl MessageAssembler {
    pub fn new(limits: Limits) -> Self {
        Self {
            buffer: BytesMut::new(),
            opcode: None,
            limits,
        }
    }

    /// Add a data frame to the message being assembled.
    ///
    /// Returns `Some(message)` once a FIN frame completes it.
    ///
    /// # Errors
    ///
    /// - `Error::UnexpectedContinuation` if no message is in progress
    /// - `Error::UnfinishedMessage` if a new message starts before the last one ended
    /// - `Error::MessageTooLarge` if the accumulated payload exceeds the limit
    /// - `Error::InvalidUtf8` if a completed text message is not UTF-8
    pub fn push(&mut self, frame: &Frame) -> Result<Option<Message>> {
        debug_assert!(frame.opcode.is_data());

        match (frame.opcode, self.opcode) {
            (OpCode::Continuation, None) => return Err(Error::UnexpectedContinuation),
            (OpCode::Continuation, Some(_)) => {}
            (_, Some(_)) => return Err(Error::UnfinishedMessage),
            (opcode, None) => self.opcode = Some(opcode),
        }

        let size = self.buffer.len() + frame.payload().len();
        if let Err(err) = self.limits.check_message_size(size) {
            self.reset();
            return Err(err);
        }
        self.buffer.extend_from_slice(frame.payload());

        if !frame.fin {
            return Ok(None);
        }

        let payload = self.buffer.to_vec();
        self.buffer.clear();
        match self.opcode.take() {
            Some(OpCode::Text) => Ok(Some(Message::Text(String::from_utf8(payload)?))),
            _ => Ok(Some(Message::Binary(payload))),
        }
    }

    pub fn is_assembling(&self) -> bool {
        self.opcode.is_some()
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.opcode = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assembler() -> MessageAssembler {
        MessageAssembler::new(Limits::default())
    }

    #[test]
    fn test_single_frame_message() {
        let mut assembler = assembler();
        let result = assembler.push(&Frame::text("Hello")).unwrap();
        assert_eq!(result, Some(Message::text("Hello")));
        assert!(!assembler.is_assembling());
    }

    #[test]
    fn test_two_fragment_message() {
        let mut assembler = assembler();

        let first = Frame::new(false, OpCode::Text, &b"Hel"[..]);
        assert!(assembler.push(&first).unwrap().is_none());
        assert!(assembler.is_assembling());

        let last = Frame::new(true, OpCode::Continuation, &b"lo"[..]);
        let result = assembler.push(&last).unwrap();
        assert_eq!(result, Some(Message::text("Hello")));
    }

    #[test]
    fn test_many_binary_fragments() {
        let mut assembler = assembler();

        assert!(assembler
            .push(&Frame::new(false, OpCode::Binary, vec![1, 2]))
            .unwrap()
            .is_none());
        assert!(assembler
            .push(&Frame::new(false, OpCode::Continuation, vec![3, 4]))
            .unwrap()
            .is_none());
        let result = assembler
            .push(&Frame::new(true, OpCode::Continuation, vec![5, 6]))
            .unwrap();

        assert_eq!(result, Some(Message::Binary(vec![1, 2, 3, 4, 5, 6])));
    }

    #[test]
    fn test_multibyte_character_split_across_fragments() {
        let mut assembler = assembler();

        let first = Frame::new(false, OpCode::Text, vec![0xf0, 0x9f]);
        assert!(assembler.push(&first).unwrap().is_none());

        let last = Frame::new(true, OpCode::Continuation, vec![0x8e, 0x89]);
        let result = assembler.push(&last).unwrap();
        assert_eq!(result, Some(Message::text("\u{1f389}")));
    }

    #[test]
    fn test_continuation_without_start_fails() {
        let mut assembler = assembler();
        let frame = Frame::new(true, OpCode::Continuation, &b"data"[..]);
        assert_eq!(assembler.push(&frame), Err(Error::UnexpectedContinuation));
    }

    #[test]
    fn test_new_message_without_continuation_fails() {
        let mut assembler = assembler();

        let first = Frame::new(false, OpCode::Text, &b"first"[..]);
        assembler.push(&first).unwrap();

        let second = Frame::new(true, OpCode::Binary, &b"second"[..]);
        assert_eq!(assembler.push(&second), Err(Error::UnfinishedMessage));
    }

    #[test]
    fn test_invalid_utf8_fails() {
        let mut assembler = assembler();
        let frame = Frame::new(true, OpCode::Text, vec![0x80, 0x81]);
        assert_eq!(assembler.push(&frame), Err(Error::InvalidUtf8));
    }

    #[test]
    fn test_binary_skips_utf8_check() {
        let mut assembler = assembler();
        let frame = Frame::new(true, OpCode::Binary, vec![0x80, 0x81, 0xff]);
        let result = assembler.push(&frame).unwrap();
        assert_eq!(result, Some(Message::Binary(vec![0x80, 0x81, 0xff])));
    }

    #[test]
    fn test_message_size_limit() {
        let mut assembler = MessageAssembler::new(Limits::new(1024, 4));

        let first = Frame::new(false, OpCode::Binary, vec![0; 3]);
        assert!(assembler.push(&first).unwrap().is_none());

        let last = Frame::new(true, OpCode::Continuation, vec![0; 2]);
        assert_eq!(
            assembler.push(&last),
            Err(Error::MessageTooLarge { size: 5, max: 4 })
        );
        assert!(!assembler.is_assembling());
    }

    #[test]
    fn test_reset() {
        let mut assembler = assembler();

        assembler
            .push(&Frame::new(false, OpCode::Text, &b"partial"[..]))
            .unwrap();
        assert!(assembler.is_assembling());

        assembler.reset();
        assert!(!assembler.is_assembling());

        let result = assembler.push(&Frame::text("fresh")).unwrap();
        assert_eq!(result, Some(Message::text("fresh")));
    }
}
