//! Events emitted by a connection and the handlers that receive them.

use std::fmt;

use crate::message::{CloseFrame, Message};

/// Something that happened on a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The handshake was written and the connection is open.
    Open,
    /// A complete data message arrived.
    Message(Message),
    /// The peer violated the protocol or sent an unacceptable handshake.
    Error(String),
    /// The connection is closed, with the code and reason that ended it.
    Close(CloseFrame),
}

impl Event {
    /// The kind of this event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Event::Open => EventKind::Open,
            Event::Message(_) => EventKind::Message,
            Event::Error(_) => EventKind::Error,
            Event::Close(_) => EventKind::Close,
        }
    }
}

/// Discriminant of [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Open,
    Message,
    Error,
    Close,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Open => write!(f, "open"),
            EventKind::Message => write!(f, "message"),
            EventKind::Error => write!(f, "error"),
            EventKind::Close => write!(f, "close"),
        }
    }
}

type Handler<T> = Box<dyn FnMut(T) + Send>;

/// One optional handler per event kind.
///
/// Registering a handler for a kind replaces the previous one. Events of a
/// kind with no handler are dropped.
#[derive(Default)]
pub struct Listeners {
    open: Option<Box<dyn FnMut() + Send>>,
    message: Option<Handler<Message>>,
    error: Option<Handler<String>>,
    close: Option<Handler<CloseFrame>>,
}

impl Listeners {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_open<F>(&mut self, handler: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.open = Some(Box::new(handler));
    }

    pub fn on_message<F>(&mut self, handler: F)
    where
        F: FnMut(Message) + Send + 'static,
    {
        self.message = Some(Box::new(handler));
    }

    pub fn on_error<F>(&mut self, handler: F)
    where
        F: FnMut(String) + Send + 'static,
    {
        self.error = Some(Box::new(handler));
    }

    pub fn on_close<F>(&mut self, handler: F)
    where
        F: FnMut(CloseFrame) + Send + 'static,
    {
        self.close = Some(Box::new(handler));
    }

    /// Whether a handler is registered for `kind`.
    #[must_use]
    pub fn is_registered(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::Open => self.open.is_some(),
            EventKind::Message => self.message.is_some(),
            EventKind::Error => self.error.is_some(),
            EventKind::Close => self.close.is_some(),
        }
    }

    /// Drop the handler for `kind`.
    pub fn remove(&mut self, kind: EventKind) {
        match kind {
            EventKind::Open => self.open = None,
            EventKind::Message => self.message = None,
            EventKind::Error => self.error = None,
            EventKind::Close => self.close = None,
        }
    }

    /// Deliver `event` to the handler for its kind.
    pub fn emit(&mut self, event: Event) {
        log::trace!("emitting {} event", event.kind());
        match event {
            Event::Open => {
                if let Some(handler) = self.open.as_mut() {
                    handler();
                }
            }
            Event::Message(message) => {
                if let Some(handler) = self.message.as_mut() {
                    handler(message);
                }
            }
            Event::Error(reason) => {
                if let Some(handler) = self.error.as_mut() {
                    handler(reason);
                }
            }
            Event::Close(frame) => {
                if let Some(handler) = self.close.as_mut() {
                    handler(frame);
                }
            }
        }
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("open", &self.open.is_some())
            .field("message", &self.message.is_some())
            .field("error", &self.error.is_some())
            .field("close", &self.close.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::CloseCode;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_emit_reaches_matching_handler() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut listeners = Listeners::new();

        let sink = Arc::clone(&seen);
        listeners.on_message(move |m| sink.lock().unwrap().push(format!("message:{:?}", m.as_text())));
        let sink = Arc::clone(&seen);
        listeners.on_close(move |c| sink.lock().unwrap().push(format!("close:{}", c.code)));

        listeners.emit(Event::Open);
        listeners.emit(Event::Message(Message::text("hi")));
        listeners.emit(Event::Error("ignored".into()));
        listeners.emit(Event::Close(CloseFrame::new(CloseCode::GoingAway, "")));

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["message:Some(\"hi\")".to_string(), "close:1001".to_string()]
        );
    }

    #[test]
    fn test_register_replaces_handler() {
        let count = Arc::new(Mutex::new((0, 0)));
        let mut listeners = Listeners::new();

        let c = Arc::clone(&count);
        listeners.on_open(move || c.lock().unwrap().0 += 1);
        let c = Arc::clone(&count);
        listeners.on_open(move || c.lock().unwrap().1 += 1);

        listeners.emit(Event::Open);
        assert_eq!(*count.lock().unwrap(), (0, 1));
    }

    #[test]
    fn test_is_registered_and_remove() {
        let mut listeners = Listeners::new();
        assert!(!listeners.is_registered(EventKind::Error));

        listeners.on_error(|_| {});
        assert!(listeners.is_registered(EventKind::Error));

        listeners.remove(EventKind::Error);
        assert!(!listeners.is_registered(EventKind::Error));
    }

    #[test]
    fn test_event_kind() {
        assert_eq!(Event::Open.kind(), EventKind::Open);
        assert_eq!(Event::Error(String::new()).kind(), EventKind::Error);
        assert_eq!(EventKind::Close.to_string(), "close");
    }
}
