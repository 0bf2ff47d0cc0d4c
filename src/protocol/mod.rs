//! WebSocket protocol core implementation (RFC 6455).

pub mod assembler;
pub mod frame;
pub mod handshake;
pub mod mask;
pub mod opcode;
pub mod parser;

pub use assembler::MessageAssembler;
pub use frame::Frame;
pub use handshake::{
    HandshakeRequest, HandshakeResponse, Headers, WS_GUID, WS_VERSION, compute_accept_key,
};
pub use mask::{MaskGenerator, apply_mask, apply_mask_fast};
pub use opcode::OpCode;
pub use parser::{FrameParser, Inbound};
