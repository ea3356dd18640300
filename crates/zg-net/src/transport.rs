use bytes::Bytes;
use zg_core::{EventSink, Handle, Result};

/// A message queued for sending on a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    Text(String),
    Binary(Bytes),
}

impl OutboundMessage {
    /// Build a message from guest bytes. Text payloads are decoded lossily.
    pub fn from_guest(binary: bool, data: &[u8]) -> Self {
        if binary {
            OutboundMessage::Binary(Bytes::copy_from_slice(data))
        } else {
            OutboundMessage::Text(String::from_utf8_lossy(data).into_owned())
        }
    }

    pub fn len(&self) -> usize {
        match self {
            OutboundMessage::Text(text) => text.len(),
            OutboundMessage::Binary(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sending half of an open session.
pub trait MessageStream: Send {
    /// Queue a message. Delivery is not awaited.
    fn send(&mut self, message: OutboundMessage) -> Result<()>;

    /// Start closing the stream. No events are expected afterwards.
    fn close(&mut self);
}

/// Opens full-duplex message streams.
///
/// `open` returns as soon as the stream is set up, before the connection is
/// established. From then on the transport reports `Open`, every inbound
/// message, and finally one of `Close` or `Error` for `session` into `events`.
pub trait SocketTransport: Send {
    fn open(
        &mut self,
        session: Handle,
        endpoint: &str,
        subprotocols: &[String],
        events: EventSink,
    ) -> Result<Box<dyn MessageStream>>;
}
