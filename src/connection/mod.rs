//! Connection state machine.
//!
//! [`Connection`] ties the handshake, the frame parser and the encoder
//! together behind a [`Socket`](crate::Socket).
//!
//! ## Connection Lifecycle
//!
//! 1. **Connecting** - Initial state; outbound frames are queued
//! 2. **Open** - Handshake written, queued frames flushed
//! 3. **Closing** - Close frame sent, waiting for peer close
//! 4. **Closed** - Connection fully closed
//!
//! ## Example
//!
//! ```rust,ignore
//! use hybi::{CloseCode, Config, Connection};
//!
//! let mut conn = Connection::new(socket, Config::server());
//! conn.on_message(|msg| println!("Received: {:?}", msg));
//! conn.start();
//!
//! conn.parse(&bytes_from_peer);
//! conn.text("Hello");
//! conn.close(CloseCode::Normal, "done");
//! ```

mod state;

#[allow(clippy::module_inception)]
mod connection;

pub use connection::{Connection, VERSION};
pub use state::ConnectionState;
