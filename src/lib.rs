//! # hybi - Sans-I/O WebSocket Protocol Driver
//!
//! `hybi` implements the server side of RFC 6455 ("hybi-13") without doing any
//! I/O. The host feeds it the bytes it reads and gives it a [`Socket`] to write
//! to; the driver answers the opening handshake, frames outbound messages,
//! reassembles inbound ones and runs the close handshake.
//!
//! ## Features
//!
//! - **Resumable parsing** across arbitrary chunk boundaries
//! - **Event listeners** for open, message, error and close
//! - **Strict validation** of framing, UTF-8, close codes and masking
//! - **Resource limits** on frame and message size
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hybi::{Config, Connection};
//!
//! let mut conn = Connection::new(socket, Config::server());
//! conn.on_message(|msg| println!("{:?}", msg));
//! conn.start();
//! conn.parse(&incoming);
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod event;
pub mod message;
pub mod protocol;
pub mod transport;

pub use config::{Config, Limits, ProtocolSelection};
pub use connection::{Connection, ConnectionState};
pub use error::{Error, Result};
pub use event::{Event, EventKind, Listeners};
pub use message::{CloseCode, CloseFrame, Message};
pub use protocol::{
    Frame, FrameParser, HandshakeRequest, HandshakeResponse, Headers, OpCode, WS_GUID,
    compute_accept_key,
};
pub use transport::Socket;

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[allow(dead_code)]
    struct NullSocket(Headers);

    impl Socket for NullSocket {
        fn headers(&self) -> &Headers {
            &self.0
        }

        fn write(&mut self, _data: &[u8]) {}
    }

    #[test]
    fn test_public_types_are_send() {
        assert_send::<Error>();
        assert_send::<Config>();
        assert_send::<Limits>();
        assert_send::<Message>();
        assert_send::<CloseCode>();
        assert_send::<CloseFrame>();
        assert_send::<ConnectionState>();
        assert_send::<Event>();
        assert_send::<Listeners>();
        assert_send::<FrameParser>();
        assert_send::<Connection<NullSocket>>();
    }

    #[test]
    fn test_public_types_are_sync() {
        assert_sync::<Error>();
        assert_sync::<Config>();
        assert_sync::<Limits>();
        assert_sync::<Message>();
        assert_sync::<CloseCode>();
        assert_sync::<CloseFrame>();
        assert_sync::<ConnectionState>();
        assert_sync::<Headers>();
    }
}
