//! Connection lifecycle as defined in RFC 6455 Section 4 and 7.

/// Lifecycle state of a [`Connection`](crate::Connection).
///
/// ```text
/// Connecting --start()--> Open --close()--> Closing --peer close--> Closed
///      |                   |                                          ^
///      +---close()---------+--peer close / violation------------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum ConnectionState {
    /// Handshake not yet written. Outbound frames are queued.
    #[default]
    Connecting,
    /// Handshake written, frames flow both ways.
    Open,
    /// Our close frame is out, waiting for the peer's.
    Closing,
    /// Terminal.
    Closed,
}

impl ConnectionState {
    /// Whether the connection has not reached `Closed`.
    #[must_use]
    #[inline]
    pub const fn is_active(&self) -> bool {
        !matches!(self, ConnectionState::Closed)
    }

    /// Whether data and ping frames may be produced, written immediately when
    /// `Open` or queued when `Connecting`.
    #[must_use]
    #[inline]
    pub const fn accepts_outbound(&self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Open)
    }

    /// Whether inbound frames are processed.
    #[must_use]
    #[inline]
    pub const fn can_receive(&self) -> bool {
        matches!(self, ConnectionState::Open | ConnectionState::Closing)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Open => write!(f, "open"),
            ConnectionState::Closing => write!(f, "closing"),
            ConnectionState::Closed => write!(f, "closed"),
        }
    }
}
