//! Property-based tests for the frame parser and connection driver.
//!
//! These tests use proptest to check that parsing does not depend on how the
//! input is chunked and that the close and ping handshakes behave for any
//! payload.

mod harness;

use std::sync::{Arc, Mutex};

use harness::open_driver;
use hybi::protocol::{Frame, FrameParser, Inbound, OpCode};
use hybi::{CloseCode, CloseFrame, Config, Error, Message};
use proptest::prelude::*;

fn message_strategy() -> impl Strategy<Value = Message> {
    prop_oneof![
        any::<String>().prop_map(Message::Text),
        prop::collection::vec(any::<u8>(), 0..300).prop_map(Message::Binary),
    ]
}

fn mask_strategy() -> impl Strategy<Value = Option<[u8; 4]>> {
    prop_oneof![Just(None), any::<[u8; 4]>().prop_map(Some)]
}

fn valid_close_code() -> impl Strategy<Value = u16> {
    prop_oneof![1000u16..=1003, 1007u16..=1014, 3000u16..=4999]
}

/// Encode `message` as `pieces` frames, splitting the payload at byte
/// boundaries (possibly inside a UTF-8 sequence).
fn encode_fragments(message: &Message, pieces: usize, mask: Option<[u8; 4]>, out: &mut Vec<u8>) {
    let payload = message.as_bytes();
    let opcode = if message.is_text() {
        OpCode::Text
    } else {
        OpCode::Binary
    };
    let step = payload.len().div_ceil(pieces).max(1);
    let mut chunks: Vec<&[u8]> = payload.chunks(step).collect();
    if chunks.is_empty() {
        chunks.push(&[]);
    }

    let last = chunks.len() - 1;
    for (i, chunk) in chunks.into_iter().enumerate() {
        let op = if i == 0 { opcode } else { OpCode::Continuation };
        let frame = Frame::new(i == last, op, chunk.to_vec());
        out.extend_from_slice(&frame.to_bytes(mask));
    }
}

/// Feed `stream` to a fresh parser split at `cuts` and collect the messages.
fn parse_in_chunks(stream: &[u8], cuts: &[usize]) -> Vec<Message> {
    let mut parser = FrameParser::new(&Config::default());
    let mut cuts: Vec<usize> = cuts.iter().map(|c| c % (stream.len() + 1)).collect();
    cuts.sort_unstable();
    cuts.push(stream.len());

    let mut messages = Vec::new();
    let mut start = 0;
    for cut in cuts {
        parser.push(&stream[start..cut]);
        start = cut;
        while let Some(inbound) = parser.next_inbound().unwrap() {
            if let Inbound::Message(message) = inbound {
                messages.push(message);
            }
        }
    }
    assert_eq!(parser.buffered(), 0);
    messages
}

proptest! {
    // =========================================================================
    // Property 1: Chunk boundaries never change the parsed messages
    // =========================================================================
    #[test]
    fn test_chunk_split_invariance(
        messages in prop::collection::vec(message_strategy(), 1..5),
        pieces in 1usize..4,
        mask in mask_strategy(),
        cuts in prop::collection::vec(any::<usize>(), 0..12)
    ) {
        let mut stream = Vec::new();
        for message in &messages {
            encode_fragments(message, pieces, mask, &mut stream);
        }

        let whole = parse_in_chunks(&stream, &[]);
        let split = parse_in_chunks(&stream, &cuts);
        prop_assert_eq!(&whole, &messages);
        prop_assert_eq!(split, whole);
    }

    // =========================================================================
    // Property 2: Byte-at-a-time parsing matches whole-stream parsing
    // =========================================================================
    #[test]
    fn test_byte_at_a_time(
        message in message_strategy(),
        mask in mask_strategy()
    ) {
        let mut stream = Vec::new();
        encode_fragments(&message, 1, mask, &mut stream);

        let cuts: Vec<usize> = (1..stream.len()).collect();
        prop_assert_eq!(parse_in_chunks(&stream, &cuts), vec![message]);
    }

    // =========================================================================
    // Property 3: N fragments reassemble to the original text
    // =========================================================================
    #[test]
    fn test_fragmentation_reassembles(
        text in "\\PC{1,200}",
        pieces in 1usize..10
    ) {
        let message = Message::text(text);
        let mut stream = Vec::new();
        encode_fragments(&message, pieces, None, &mut stream);
        prop_assert_eq!(parse_in_chunks(&stream, &[]), vec![message]);
    }

    // =========================================================================
    // Property 4: A new data frame inside a fragmented message is a violation
    // =========================================================================
    #[test]
    fn test_interleaved_data_frame_rejected(
        first in prop::collection::vec(any::<u8>(), 0..50),
        intruder in prop::collection::vec(any::<u8>(), 0..50),
        text in any::<bool>()
    ) {
        let mut parser = FrameParser::new(&Config::default());
        parser.push(&Frame::new(false, OpCode::Binary, first).to_bytes(None));
        let opcode = if text { OpCode::Text } else { OpCode::Binary };
        parser.push(&Frame::new(true, opcode, intruder).to_bytes(None));

        prop_assert_eq!(parser.next_inbound(), Err(Error::UnfinishedMessage));
    }

    // =========================================================================
    // Property 5: Pong matching runs the callback exactly once
    // =========================================================================
    #[test]
    fn test_pong_matching(
        payload in prop::collection::vec(any::<u8>(), 0..=125),
        other in prop::collection::vec(any::<u8>(), 0..=125)
    ) {
        let (mut conn, _) = open_driver(Config::default());
        let calls = Arc::new(Mutex::new(0u32));
        let counter = Arc::clone(&calls);
        prop_assert!(conn.ping_with(&payload, move || *counter.lock().unwrap() += 1));

        if other != payload {
            conn.parse(&Frame::pong(other).to_bytes(None));
            prop_assert_eq!(*calls.lock().unwrap(), 0);
        }

        conn.parse(&Frame::pong(payload.clone()).to_bytes(None));
        conn.parse(&Frame::pong(payload).to_bytes(None));
        prop_assert_eq!(*calls.lock().unwrap(), 1);
    }

    // =========================================================================
    // Property 6: A peer close while open is echoed verbatim
    // =========================================================================
    #[test]
    fn test_close_symmetry(
        code in valid_close_code(),
        reason in "[a-zA-Z0-9 .,!?]{0,100}",
        mask in mask_strategy()
    ) {
        let (mut conn, events) = open_driver(Config::default());
        conn.parse(&Frame::close(Some(code), &reason).to_bytes(mask));

        let echo = Frame::close(Some(code), &reason).to_bytes(None);
        prop_assert_eq!(conn.socket().last(), Some(&echo[..]));
        prop_assert_eq!(
            events.closes(),
            vec![CloseFrame::new(CloseCode::from_u16(code), reason)]
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    // =========================================================================
    // Property 7: Masked frames round-trip at every length encoding
    // =========================================================================
    #[test]
    fn test_mask_roundtrip(
        len in prop_oneof![Just(0usize), Just(125), Just(126), Just(65535), Just(65536), 65537usize..70000],
        mask in any::<[u8; 4]>(),
        seed in any::<u8>()
    ) {
        let payload: Vec<u8> = (0..len).map(|i| (i as u8).wrapping_add(seed)).collect();
        let bytes = Frame::binary(payload.clone()).to_bytes(Some(mask));

        let mut parser = FrameParser::new(&Config::server());
        parser.push(&bytes);
        let frame = parser.next_frame().unwrap().unwrap();

        prop_assert_eq!(frame.mask, Some(mask));
        prop_assert_eq!(frame.payload(), &payload[..]);
    }
}
