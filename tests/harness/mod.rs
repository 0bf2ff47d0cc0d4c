//! Test doubles for driving a `Connection` without a network.
//!
//! `RecordingSocket` keeps every write separately so tests can assert on
//! write boundaries; `Recorder` captures the events a connection emits.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use hybi::{CloseFrame, Config, Connection, Event, Headers, Message, Socket};

pub const KEY: &str = "JFBCWHksyIpXV+6Wlq/9pw==";

pub const HANDSHAKE: &str = "HTTP/1.1 101 Switching Protocols\r\n\
    Upgrade: websocket\r\n\
    Connection: Upgrade\r\n\
    Sec-WebSocket-Accept: JdiiuafpBKRqD7eol0y4vJDTsTs=\r\n\
    \r\n";

pub struct RecordingSocket {
    pub headers: Headers,
    pub writes: Vec<Vec<u8>>,
}

impl RecordingSocket {
    /// A socket whose request carries a valid version 13 upgrade.
    pub fn new() -> Self {
        Self {
            headers: Headers::new()
                .with("Connection", "Upgrade")
                .with("Upgrade", "websocket")
                .with("Origin", "http://www.example.com")
                .with("Sec-WebSocket-Key", KEY)
                .with("Sec-WebSocket-Version", "13"),
            writes: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn last(&self) -> Option<&[u8]> {
        self.writes.last().map(Vec::as_slice)
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.writes.concat()
    }
}

impl Socket for RecordingSocket {
    fn headers(&self) -> &Headers {
        &self.headers
    }

    fn write(&mut self, data: &[u8]) {
        self.writes.push(data.to_vec());
    }
}

#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    /// Register a handler for every event kind on `conn`.
    pub fn attach<S>(&self, conn: &mut Connection<S>) {
        let sink = Arc::clone(&self.events);
        conn.on_open(move || sink.lock().unwrap().push(Event::Open));
        let sink = Arc::clone(&self.events);
        conn.on_message(move |m| sink.lock().unwrap().push(Event::Message(m)));
        let sink = Arc::clone(&self.events);
        conn.on_error(move |e| sink.lock().unwrap().push(Event::Error(e)));
        let sink = Arc::clone(&self.events);
        conn.on_close(move |c| sink.lock().unwrap().push(Event::Close(c)));
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    pub fn messages(&self) -> Vec<Message> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Message(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    /// All text messages concatenated.
    pub fn text(&self) -> String {
        self.messages()
            .iter()
            .filter_map(Message::as_text)
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Error(reason) => Some(reason),
                _ => None,
            })
            .collect()
    }

    pub fn closes(&self) -> Vec<CloseFrame> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Close(frame) => Some(frame),
                _ => None,
            })
            .collect()
    }
}

/// A connection in the `Connecting` state with all events recorded.
pub fn driver(config: Config) -> (Connection<RecordingSocket>, Recorder) {
    driver_with(RecordingSocket::new(), config)
}

pub fn driver_with(
    socket: RecordingSocket,
    config: Config,
) -> (Connection<RecordingSocket>, Recorder) {
    let mut conn = Connection::new(socket, config);
    let recorder = Recorder::default();
    recorder.attach(&mut conn);
    (conn, recorder)
}

/// A started connection with the handshake write and open event discarded.
pub fn open_driver(config: Config) -> (Connection<RecordingSocket>, Recorder) {
    let (mut conn, recorder) = driver(config);
    assert!(conn.start());
    conn.socket_mut().writes.clear();
    recorder.clear();
    (conn, recorder)
}

/// XOR `data` with `mask` the way a client would before sending.
pub fn mask_bytes(data: &[u8], mask: [u8; 4]) -> Vec<u8> {
    data.iter()
        .enumerate()
        .map(|(i, b)| b ^ mask[i % 4])
        .collect()
}
