//! The transport seam.
//!
//! The driver never touches a network stream. Whatever carries the bytes
//! implements [`Socket`]: it hands over the request headers it read during the
//! HTTP upgrade and accepts every byte sequence the driver produces.

use crate::protocol::Headers;

/// Capability a host provides to a [`Connection`](crate::Connection).
///
/// `write` is invoked synchronously, once per handshake response or frame, in
/// the order the output was produced. Buffering, flushing and error handling of
/// the underlying stream are the implementor's concern.
pub trait Socket {
    /// Headers of the client's opening request.
    fn headers(&self) -> &Headers;

    /// Accept a chunk of outbound bytes.
    fn write(&mut self, data: &[u8]);
}

impl<S: Socket + ?Sized> Socket for &mut S {
    fn headers(&self) -> &Headers {
        (**self).headers()
    }

    fn write(&mut self, data: &[u8]) {
        (**self).write(data);
    }
}

impl<S: Socket + ?Sized> Socket for Box<S> {
    fn headers(&self) -> &Headers {
        (**self).headers()
    }

    fn write(&mut self, data: &[u8]) {
        (**self).write(data);
    }
}
