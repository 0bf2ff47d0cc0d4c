use std::collections::HashMap;

use bytes::Bytes;

use crate::config::Config;
use crate::connection::ConnectionState;
use crate::error::{Error, Result};
use crate::event::{Event, Listeners};
use crate::message::{CloseCode, CloseFrame, Message};
use crate::protocol::frame::{MAX_CONTROL_FRAME_PAYLOAD, MAX_HEADER_SIZE};
use crate::protocol::handshake::{bad_request, validate_header_value};
use crate::protocol::{Frame, FrameParser, HandshakeRequest, HandshakeResponse, Inbound, MaskGenerator};
use crate::transport::Socket;

/// Protocol version reported by [`Connection::version`].
pub const VERSION: &str = "hybi-13";

/// Longest close reason that still fits a control frame next to the code.
const MAX_CLOSE_REASON: usize = MAX_CONTROL_FRAME_PAYLOAD - 2;

type PingCallback = Box<dyn FnOnce() + Send>;

/// Server side of one WebSocket connection.
///
/// `Connection` performs no I/O. Inbound bytes are handed to
/// [`parse`](Self::parse); everything it produces goes to the [`Socket`]'s
/// `write`. Application-facing outcomes are delivered to the handlers
/// registered with `on_open`, `on_message`, `on_error` and `on_close`.
///
/// Operations that are not allowed in the current state return `false` and
/// write nothing. Protocol violations by the peer never surface as `Err`: they
/// become an error event followed by a close event.
///
/// ## Example
///
/// ```
/// use hybi::{Config, Connection, Headers, Socket};
///
/// struct Buffer {
///     headers: Headers,
///     out: Vec<u8>,
/// }
///
/// impl Socket for Buffer {
///     fn headers(&self) -> &Headers {
///         &self.headers
///     }
///     fn write(&mut self, data: &[u8]) {
///         self.out.extend_from_slice(data);
///     }
/// }
///
/// let socket = Buffer {
///     headers: Headers::new().with("Sec-WebSocket-Key", "dGhlIHNhbXBsZSBub25jZQ=="),
///     out: Vec::new(),
/// };
/// let mut conn = Connection::new(socket, Config::default());
/// conn.on_message(|msg| println!("{:?}", msg));
///
/// assert!(conn.start());
/// conn.parse(&[0x81, 0x05, b'H', b'e', b'l', b'l', b'o']);
/// assert!(conn.text("Hi"));
/// ```
pub struct Connection<S> {
    socket: S,
    config: Config,
    state: ConnectionState,
    protocol: Option<String>,
    headers: Vec<(String, String)>,
    queued: Vec<Bytes>,
    pings: HashMap<Vec<u8>, PingCallback>,
    parser: FrameParser,
    listeners: Listeners,
    masks: MaskGenerator,
}

impl<S> Connection<S> {
    /// Create a connection in the `Connecting` state.
    pub fn new(socket: S, config: Config) -> Self {
        Self {
            socket,
            parser: FrameParser::new(&config),
            config,
            state: ConnectionState::Connecting,
            protocol: None,
            headers: Vec::new(),
            queued: Vec::new(),
            pings: HashMap::new(),
            listeners: Listeners::new(),
            masks: MaskGenerator::new(),
        }
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Protocol version spoken, always `"hybi-13"`.
    pub fn version(&self) -> &'static str {
        VERSION
    }

    /// The negotiated subprotocol, once the handshake selected one.
    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_deref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn socket(&self) -> &S {
        &self.socket
    }

    pub fn socket_mut(&mut self) -> &mut S {
        &mut self.socket
    }

    /// Give back the socket, dropping any queued frames and buffered input.
    pub fn into_inner(self) -> S {
        self.socket
    }

    /// Mutable access to the listener table.
    pub fn listeners_mut(&mut self) -> &mut Listeners {
        &mut self.listeners
    }

    pub fn on_open<F>(&mut self, handler: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.listeners.on_open(handler);
    }

    pub fn on_message<F>(&mut self, handler: F)
    where
        F: FnMut(Message) + Send + 'static,
    {
        self.listeners.on_message(handler);
    }

    pub fn on_error<F>(&mut self, handler: F)
    where
        F: FnMut(String) + Send + 'static,
    {
        self.listeners.on_error(handler);
    }

    pub fn on_close<F>(&mut self, handler: F)
    where
        F: FnMut(CloseFrame) + Send + 'static,
    {
        self.listeners.on_close(handler);
    }

    /// Add a header to the handshake response.
    ///
    /// Headers are written after the standard ones, in the order they were
    /// set. Setting a name again replaces its value in place.
    ///
    /// ## Errors
    ///
    /// - `Error::HandshakeAlreadySent` once the connection has left `Connecting`
    /// - `Error::InvalidHeaderValue` if the name or value contains CR or LF
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        if self.state != ConnectionState::Connecting {
            return Err(Error::HandshakeAlreadySent);
        }
        validate_header_value(name, name)?;
        validate_header_value(name, value)?;

        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
        Ok(())
    }
}

impl<S: Socket> Connection<S> {
    /// Write the handshake response and open the connection.
    ///
    /// Frames queued while connecting are written next, one write per frame,
    /// then the open event fires and any input passed to `parse` beforehand is
    /// processed. Returns `false` if the connection is not `Connecting`.
    ///
    /// An invalid opening request is answered with `400 Bad Request`, an error
    /// event and a close event (1002); the connection ends up `Closed` and
    /// `false` is returned.
    pub fn start(&mut self) -> bool {
        if self.state != ConnectionState::Connecting {
            return false;
        }

        let response = match self.negotiate() {
            Ok(response) => response,
            Err(err) => {
                self.reject(err);
                return false;
            }
        };

        self.socket.write(&response);
        for frame in std::mem::take(&mut self.queued) {
            self.socket.write(&frame);
        }

        self.state = ConnectionState::Open;
        log::debug!(
            "connection open: version={} protocol={:?}",
            VERSION,
            self.protocol
        );
        self.listeners.emit(Event::Open);
        self.process();
        true
    }

    /// Send a data message.
    ///
    /// Queued while `Connecting`, written while `Open`. Returns `false` in
    /// `Closing` or `Closed`.
    pub fn send(&mut self, message: impl Into<Message>) -> bool {
        if !self.state.accepts_outbound() {
            return false;
        }
        let frame = match message.into() {
            Message::Text(text) => Frame::text(text),
            Message::Binary(data) => Frame::binary(data),
        };
        self.transmit(&frame);
        true
    }

    /// Send a text message.
    pub fn text(&mut self, text: &str) -> bool {
        self.send(Message::text(text))
    }

    /// Send a binary message.
    pub fn binary(&mut self, data: impl Into<Vec<u8>>) -> bool {
        self.send(Message::binary(data))
    }

    /// Send a ping.
    ///
    /// Same state rules as [`send`](Self::send). Payloads over 125 bytes are
    /// refused.
    pub fn ping(&mut self, payload: &[u8]) -> bool {
        self.send_ping(payload, None)
    }

    /// Send a ping and run `callback` when a pong with the same payload arrives.
    ///
    /// The callback runs at most once. A later ping with an identical payload
    /// replaces a callback that has not run yet.
    pub fn ping_with<F>(&mut self, payload: &[u8], callback: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.send_ping(payload, Some(Box::new(callback)))
    }

    /// Send an unsolicited pong, for example as a heartbeat.
    ///
    /// Same state rules as [`ping`](Self::ping). Payloads over 125 bytes are
    /// refused.
    pub fn pong(&mut self, payload: &[u8]) -> bool {
        if !self.state.accepts_outbound() || payload.len() > MAX_CONTROL_FRAME_PAYLOAD {
            return false;
        }
        self.transmit(&Frame::pong(Bytes::copy_from_slice(payload)));
        true
    }

    /// Close with `1000` and an empty reason.
    pub fn close_normal(&mut self) -> bool {
        self.close(CloseCode::Normal, "")
    }

    /// Start or short-circuit the close handshake.
    ///
    /// [`close_normal`](Self::close_normal) is the usual `(1000, "")` case.
    ///
    /// - `Connecting`: nothing is written, the state becomes `Closed` and the
    ///   close event fires with `(1000, "")`.
    /// - `Open`: a close frame is written and the state becomes `Closing`. The
    ///   close event fires when the peer answers.
    /// - `Closing`/`Closed`: returns `false`.
    ///
    /// A code that may not appear on the wire, or a reason longer than 123
    /// bytes, is refused with `false`.
    pub fn close(&mut self, code: CloseCode, reason: &str) -> bool {
        match self.state {
            ConnectionState::Connecting => {
                log::debug!("closing before handshake");
                self.terminate();
                self.listeners.emit(Event::Close(CloseFrame::default()));
                true
            }
            ConnectionState::Open => {
                if !code.is_valid() || reason.len() > MAX_CLOSE_REASON {
                    return false;
                }
                self.transmit(&Frame::close(Some(code.as_u16()), reason));
                self.state = ConnectionState::Closing;
                log::debug!("close handshake started: code={}", code);
                true
            }
            _ => false,
        }
    }

    /// Feed bytes received from the peer.
    ///
    /// While `Connecting` the bytes are only buffered; `start` processes them.
    /// Buffering more than one maximum-size frame before `start` fails the
    /// connection with 1009. In `Closed` the bytes are dropped.
    pub fn parse(&mut self, data: &[u8]) {
        match self.state {
            ConnectionState::Closed => {
                log::trace!("dropping {} bytes on closed connection", data.len());
            }
            ConnectionState::Connecting => {
                let max = self.config.limits.max_frame_size.saturating_add(MAX_HEADER_SIZE);
                let size = self.parser.buffered().saturating_add(data.len());
                if size > max {
                    self.fail(Error::FrameTooLarge {
                        size: size as u64,
                        max,
                    });
                } else {
                    self.parser.push(data);
                }
            }
            _ => {
                self.parser.push(data);
                self.process();
            }
        }
    }

    fn negotiate(&mut self) -> Result<Vec<u8>> {
        let request = HandshakeRequest::from_headers(self.socket.headers())?;
        request.validate()?;

        let response = HandshakeResponse::new(&request, &self.config, &self.headers);
        let mut buf = Vec::new();
        response.write(&mut buf)?;

        self.protocol = response.protocol;
        Ok(buf)
    }

    fn reject(&mut self, err: Error) {
        let reason = err.to_string();
        log::warn!("rejecting handshake: {}", reason);

        self.socket.write(&bad_request(&reason));
        self.terminate();
        self.listeners.emit(Event::Error(reason.clone()));
        self.listeners
            .emit(Event::Close(CloseFrame::new(CloseCode::ProtocolError, reason)));
    }

    fn send_ping(&mut self, payload: &[u8], callback: Option<PingCallback>) -> bool {
        if !self.state.accepts_outbound() || payload.len() > MAX_CONTROL_FRAME_PAYLOAD {
            return false;
        }
        if let Some(callback) = callback {
            self.pings.insert(payload.to_vec(), callback);
        }
        self.transmit(&Frame::ping(Bytes::copy_from_slice(payload)));
        true
    }

    /// Encode `frame` and either queue it or write it out.
    fn transmit(&mut self, frame: &Frame) {
        let mask = self.config.masking.then(|| self.masks.next_mask());
        let bytes = frame.to_bytes(mask);
        log::trace!(
            "sending {} frame: len={} masked={}",
            frame.opcode,
            frame.payload().len(),
            mask.is_some()
        );

        if self.state == ConnectionState::Connecting {
            self.queued.push(bytes);
        } else {
            self.socket.write(&bytes);
        }
    }

    fn process(&mut self) {
        while self.state.can_receive() {
            match self.parser.next_inbound() {
                Ok(Some(inbound)) => self.dispatch(inbound),
                Ok(None) => break,
                Err(err) => self.fail(err),
            }
        }
    }

    fn dispatch(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Message(message) => self.listeners.emit(Event::Message(message)),
            Inbound::Ping(payload) => self.transmit(&Frame::pong(payload)),
            Inbound::Pong(payload) => {
                if let Some(callback) = self.pings.remove(&payload[..]) {
                    callback();
                }
            }
            Inbound::Close(payload) => match CloseFrame::parse(&payload) {
                Ok(frame) => self.shutdown(frame),
                Err(err) => self.fail(err),
            },
        }
    }

    /// Finish the close handshake the peer started or answered.
    fn shutdown(&mut self, frame: CloseFrame) {
        if self.state == ConnectionState::Open {
            self.transmit(&Frame::close(Some(frame.code.as_u16()), &frame.reason));
        }
        log::debug!("connection closed by peer: code={}", frame.code);
        self.terminate();
        self.listeners.emit(Event::Close(frame));
    }

    /// Tear the connection down after a protocol violation.
    fn fail(&mut self, err: Error) {
        let code = err.close_code();
        let reason = err.to_string();
        log::warn!("protocol violation ({}): {}", code, reason);

        if self.state == ConnectionState::Open {
            self.transmit(&Frame::close(Some(code.as_u16()), &reason));
        }
        self.terminate();
        self.listeners.emit(Event::Error(reason.clone()));
        self.listeners.emit(Event::Close(CloseFrame::new(code, reason)));
    }

    fn terminate(&mut self) {
        self.state = ConnectionState::Closed;
        self.queued.clear();
        self.parser.reset();
        self.pings.clear();
    }
}

impl<S> std::fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state)
            .field("protocol", &self.protocol)
            .field("queued", &self.queued.len())
            .field("pings", &self.pings.len())
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}
