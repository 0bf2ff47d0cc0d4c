//! Configuration and limits for WebSocket connections.

use crate::error::Error;

/// Size limits applied to inbound traffic.
///
/// These bound the memory a single peer can make the driver buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum payload size of a single frame in bytes.
    ///
    /// Default: 16 MB (16 * 1024 * 1024)
    pub max_frame_size: usize,

    /// Maximum size of a complete message in bytes, after reassembly.
    ///
    /// Default: 64 MB (64 * 1024 * 1024)
    pub max_message_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_frame_size: 16 * 1024 * 1024,   // 16 MB
            max_message_size: 64 * 1024 * 1024, // 64 MB
        }
    }
}

impl Limits {
    /// Create new limits with custom values.
    #[must_use]
    pub const fn new(max_frame_size: usize, max_message_size: usize) -> Self {
        Self {
            max_frame_size,
            max_message_size,
        }
    }

    /// Limits for small embedded systems: 64 KB frames, 256 KB messages.
    #[must_use]
    pub const fn embedded() -> Self {
        Self {
            max_frame_size: 64 * 1024,
            max_message_size: 256 * 1024,
        }
    }

    /// No practical limit. Use only with trusted peers.
    #[must_use]
    pub const fn unrestricted() -> Self {
        Self {
            max_frame_size: usize::MAX,
            max_message_size: usize::MAX,
        }
    }

    /// Validate a declared frame payload length.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FrameTooLarge`] if `size` exceeds the configured maximum.
    pub const fn check_frame_size(&self, size: u64) -> Result<(), Error> {
        if size > self.max_frame_size as u64 {
            Err(Error::FrameTooLarge {
                size,
                max: self.max_frame_size,
            })
        } else {
            Ok(())
        }
    }

    /// Validate the accumulated size of a message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MessageTooLarge`] if `size` exceeds the configured maximum.
    pub const fn check_message_size(&self, size: usize) -> Result<(), Error> {
        if size > self.max_message_size {
            Err(Error::MessageTooLarge {
                size,
                max: self.max_message_size,
            })
        } else {
            Ok(())
        }
    }
}

/// Which side's preference order decides the subprotocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProtocolSelection {
    /// First entry of the server's list that the client offered.
    #[default]
    ServerPreference,
    /// First entry of the client's offer that the server supports.
    ClientPreference,
}

/// WebSocket connection configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Mask outbound frames.
    ///
    /// RFC 6455 requires clients to mask and servers not to.
    ///
    /// Default: false
    pub masking: bool,

    /// Reject inbound frames that arrive unmasked (close code 1003).
    ///
    /// Default: false
    pub require_masking: bool,

    /// Supported subprotocols, in server preference order.
    ///
    /// Default: empty, no subprotocol is ever negotiated.
    pub protocols: Vec<String>,

    /// Tie-break rule for subprotocol negotiation.
    pub protocol_selection: ProtocolSelection,

    /// Resource limits.
    pub limits: Limits,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            masking: false,
            require_masking: false,
            protocols: Vec::new(),
            protocol_selection: ProtocolSelection::default(),
            limits: Limits::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Server side: outbound frames unmasked, inbound frames must be masked.
    #[must_use]
    pub fn server() -> Self {
        Self {
            masking: false,
            require_masking: true,
            ..Default::default()
        }
    }

    /// Client side: outbound frames masked.
    #[must_use]
    pub fn client() -> Self {
        Self {
            masking: true,
            require_masking: false,
            ..Default::default()
        }
    }

    /// Set whether outbound frames are masked.
    #[must_use]
    pub const fn with_masking(mut self, masking: bool) -> Self {
        self.masking = masking;
        self
    }

    /// Set whether unmasked inbound frames are rejected.
    #[must_use]
    pub const fn with_require_masking(mut self, require: bool) -> Self {
        self.require_masking = require;
        self
    }

    /// Set the supported subprotocols, most preferred first.
    #[must_use]
    pub fn with_protocols<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protocols = protocols.into_iter().map(Into::into).collect();
        self
    }

    /// Set the subprotocol tie-break rule.
    #[must_use]
    pub const fn with_protocol_selection(mut self, selection: ProtocolSelection) -> Self {
        self.protocol_selection = selection;
        self
    }

    /// Set custom limits.
    #[must_use]
    pub const fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }
}
