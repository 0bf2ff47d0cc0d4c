//! Server side of the WebSocket opening handshake (RFC 6455 Section 4.2).

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use sha1::{Digest, Sha1};

use crate::config::{Config, ProtocolSelection};
use crate::error::{Error, Result};

/// The WebSocket GUID used in the Sec-WebSocket-Accept calculation (RFC 6455).
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Protocol version spoken by this driver.
pub const WS_VERSION: u8 = 13;

/// Headers that must not appear twice in a request.
const SECURITY_HEADERS: [&str; 5] = [
    "host",
    "upgrade",
    "connection",
    "sec-websocket-key",
    "sec-websocket-version",
];

/// Validate that a header value does not contain CR or LF characters.
///
/// # Errors
/// Returns `Error::InvalidHeaderValue` if the value contains `\r` or `\n`.
pub fn validate_header_value(header_name: &str, value: &str) -> Result<()> {
    if value.contains(['\r', '\n']) {
        return Err(Error::InvalidHeaderValue {
            header: header_name.to_string(),
            reason: "contains CR or LF characters".to_string(),
        });
    }
    Ok(())
}

/// Computes the Sec-WebSocket-Accept value from the client's Sec-WebSocket-Key.
///
/// The accept key is calculated as: Base64(SHA-1(key + GUID))
///
/// # Example
///
/// ```
/// use hybi::protocol::handshake::compute_accept_key;
///
/// let key = "dGhlIHNhbXBsZSBub25jZQ==";
/// let accept = compute_accept_key(key);
/// assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
/// ```
pub fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    let hash = hasher.finalize();
    BASE64.encode(hash)
}

/// Choose a subprotocol from the client's offer.
///
/// Returns `None` when the two lists share no entry.
pub fn select_protocol(
    offered: &[String],
    supported: &[String],
    selection: ProtocolSelection,
) -> Option<String> {
    let (preferred, other) = match selection {
        ProtocolSelection::ServerPreference => (supported, offered),
        ProtocolSelection::ClientPreference => (offered, supported),
    };
    preferred.iter().find(|p| other.contains(p)).cloned()
}

/// Request headers as supplied by the transport.
///
/// Lookups are case-insensitive; insertion order is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// An empty header set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a header, replacing any existing value for the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Value of the header `name`, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Whether the header `name` is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse the head of a raw HTTP request.
    ///
    /// The request line is skipped; parsing stops at the first empty line.
    /// Values are trimmed, lines without a colon are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandshake`] if the data is not UTF-8, is empty,
    /// or repeats a security-critical header such as `Sec-WebSocket-Key`.
    pub fn parse_request(data: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(data)
            .map_err(|_| Error::InvalidHandshake("Invalid UTF-8".into()))?;

        let mut lines = text.lines();
        lines
            .next()
            .filter(|line| !line.is_empty())
            .ok_or_else(|| Error::InvalidHandshake("Empty request".into()))?;

        let mut headers = Headers::new();
        for line in lines {
            if line.is_empty() {
                break;
            }
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            let name = name.trim();
            if headers.contains(name)
                && SECURITY_HEADERS
                    .iter()
                    .any(|h| h.eq_ignore_ascii_case(name))
            {
                return Err(Error::InvalidHandshake(format!(
                    "Duplicate header: {}",
                    name
                )));
            }
            headers.insert(name, value.trim());
        }
        Ok(headers)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// The parts of a client's opening request the handshake depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeRequest {
    /// The Sec-WebSocket-Key header value.
    pub key: String,
    /// The Sec-WebSocket-Version, when sent.
    pub version: Option<String>,
    /// Offered subprotocols, in client preference order.
    pub protocols: Vec<String>,
    /// Offered extensions. Recorded but never negotiated.
    pub extensions: Vec<String>,
}

impl HandshakeRequest {
    /// Extract the handshake fields from request headers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandshake`] if `Sec-WebSocket-Key` is missing.
    pub fn from_headers(headers: &Headers) -> Result<Self> {
        let key = headers
            .get("sec-websocket-key")
            .ok_or_else(|| Error::InvalidHandshake("Missing Sec-WebSocket-Key header".into()))?
            .to_string();

        Ok(Self {
            key,
            version: headers.get("sec-websocket-version").map(str::to_string),
            protocols: split_list(headers.get("sec-websocket-protocol")),
            extensions: split_list(headers.get("sec-websocket-extensions")),
        })
    }

    /// Validate the request according to RFC 6455.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandshake`] if:
    /// - The `Sec-WebSocket-Key` is not Base64 for exactly 16 bytes.
    /// - A `Sec-WebSocket-Version` other than 13 was sent.
    pub fn validate(&self) -> Result<()> {
        match BASE64.decode(&self.key) {
            Ok(decoded) if decoded.len() == 16 => {}
            Ok(decoded) => {
                return Err(Error::InvalidHandshake(format!(
                    "Sec-WebSocket-Key must be 16 bytes, got {}",
                    decoded.len()
                )));
            }
            Err(_) => {
                return Err(Error::InvalidHandshake(
                    "Invalid Sec-WebSocket-Key: not valid Base64".into(),
                ));
            }
        }

        if let Some(version) = &self.version {
            if version.trim() != WS_VERSION.to_string() {
                return Err(Error::InvalidHandshake(format!(
                    "Unsupported WebSocket version: {} (expected {})",
                    version, WS_VERSION
                )));
            }
        }

        Ok(())
    }
}

/// The `101 Switching Protocols` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResponse {
    /// The Sec-WebSocket-Accept value.
    pub accept: String,
    /// The selected Sec-WebSocket-Protocol, if any.
    pub protocol: Option<String>,
    /// Extra headers, written after the standard ones in this order.
    pub headers: Vec<(String, String)>,
}

impl HandshakeResponse {
    /// Build the response for a request under the given configuration.
    #[must_use]
    pub fn new(req: &HandshakeRequest, config: &Config, headers: &[(String, String)]) -> Self {
        Self {
            accept: compute_accept_key(&req.key),
            protocol: select_protocol(&req.protocols, &config.protocols, config.protocol_selection),
            headers: headers.to_vec(),
        }
    }

    /// Write the HTTP response to a buffer.
    ///
    /// # Errors
    /// Returns `Error::InvalidHeaderValue` if the protocol or a custom header contains CR/LF.
    pub fn write(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.extend_from_slice(b"HTTP/1.1 101 Switching Protocols\r\n");
        buf.extend_from_slice(b"Upgrade: websocket\r\n");
        buf.extend_from_slice(b"Connection: Upgrade\r\n");
        buf.extend_from_slice(format!("Sec-WebSocket-Accept: {}\r\n", self.accept).as_bytes());

        if let Some(ref proto) = self.protocol {
            validate_header_value("Sec-WebSocket-Protocol", proto)?;
            buf.extend_from_slice(format!("Sec-WebSocket-Protocol: {}\r\n", proto).as_bytes());
        }

        for (name, value) in &self.headers {
            validate_header_value(name, name)?;
            validate_header_value(name, value)?;
            buf.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
        }

        buf.extend_from_slice(b"\r\n");
        Ok(())
    }
}

/// A `400 Bad Request` response explaining why the handshake was refused.
#[must_use]
pub fn bad_request(reason: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 400 Bad Request\r\nContent-Type: text/plain\r\nContent-Length: {}\r\n\r\n{}",
        reason.len(),
        reason
    )
    .into_bytes()
}
