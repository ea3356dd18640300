use crate::transport::{MessageStream, OutboundMessage, SocketTransport};
use tracing::{debug, warn};
use zg_core::{EventSink, Handle, HandleTable, ResourceKind, Result};

/// One guest-visible socket.
pub struct SocketSession {
    endpoint: String,
    stream: Box<dyn MessageStream>,
    open: bool,
}

impl SocketSession {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Whether the transport has reported the connection as established.
    pub fn is_open(&self) -> bool {
        self.open
    }
}

impl std::fmt::Debug for SocketSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketSession")
            .field("endpoint", &self.endpoint)
            .field("open", &self.open)
            .finish()
    }
}

/// Owns every socket session of a guest.
///
/// Session ids come from a [`HandleTable`], so they start at 1, increase
/// strictly and are never reused for the life of the manager.
pub struct SocketManager {
    sessions: HandleTable<SocketSession>,
    transport: Box<dyn SocketTransport>,
    events: EventSink,
}

impl SocketManager {
    pub fn new(transport: Box<dyn SocketTransport>, events: EventSink) -> Self {
        Self {
            sessions: HandleTable::new(ResourceKind::SocketSession),
            transport,
            events,
        }
    }

    /// Start connecting to `endpoint` and return the new session id.
    ///
    /// Returns before the connection is established; the outcome arrives as
    /// an `Open` or `Error` event. If the transport rejects the request up
    /// front no id is consumed.
    pub fn connect(&mut self, endpoint: &str, subprotocols: &[String]) -> Result<Handle> {
        let transport = &mut self.transport;
        let events = &self.events;
        let session = self.sessions.allocate_with(|session| {
            transport
                .open(session, endpoint, subprotocols, events.clone())
                .map(|stream| SocketSession {
                    endpoint: endpoint.to_string(),
                    stream,
                    open: false,
                })
        })?;
        debug!(%session, endpoint, ?subprotocols, "socket session created");
        Ok(session)
    }

    /// Queue `data` on the session, as a binary message or as UTF-8 text.
    pub fn send(&mut self, session: impl Into<Handle>, binary: bool, data: &[u8]) -> Result<()> {
        let session = session.into();
        let entry = self.sessions.lookup_mut(session)?;
        let message = OutboundMessage::from_guest(binary, data);
        if let Err(err) = entry.stream.send(message) {
            warn!(%session, "socket send failed: {}", err);
        }
        Ok(())
    }

    /// Close and forget the session. Unknown ids are ignored.
    pub fn destroy(&mut self, session: impl Into<Handle>) {
        let session = session.into();
        match self.sessions.delete(session) {
            Ok(Some(mut entry)) => {
                entry.stream.close();
                debug!(%session, "socket session destroyed");
            }
            Ok(None) | Err(_) => debug!(%session, "destroy of unknown socket session ignored"),
        }
    }

    /// Whether events for `session` should still reach the guest.
    pub fn is_live(&self, session: impl Into<Handle>) -> bool {
        self.sessions.contains(session)
    }

    pub fn session(&self, session: impl Into<Handle>) -> Result<&SocketSession> {
        self.sessions.lookup(session)
    }

    /// Number of live sessions.
    pub fn live(&self) -> usize {
        self.sessions.live()
    }

    /// Record that the transport reported the session as open.
    pub(crate) fn mark_open(&mut self, session: Handle) {
        if let Ok(entry) = self.sessions.lookup_mut(session) {
            entry.open = true;
        }
    }

    /// Remove a session whose stream already ended.
    pub(crate) fn finish(&mut self, session: Handle) {
        if let Ok(Some(entry)) = self.sessions.delete(session) {
            debug!(%session, endpoint = %entry.endpoint, "socket session ended");
        }
    }

    /// Close every live session.
    pub fn close_all(&mut self) {
        for (session, mut entry) in self.sessions.release_all() {
            entry.stream.close();
            debug!(%session, "socket session closed on teardown");
        }
    }
}

impl Drop for SocketManager {
    fn drop(&mut self) {
        self.close_all();
    }
}
