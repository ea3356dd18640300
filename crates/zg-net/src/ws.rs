//! WebSocket transport on `tungstenite`.
//!
//! Every session runs on its own worker thread with a blocking socket. Reads
//! time out after the configured poll interval so queued outbound messages
//! and close requests are serviced between reads.

use crate::transport::{MessageStream, OutboundMessage, SocketTransport};
use bytes::Bytes;
use std::io::ErrorKind;
use std::net::TcpStream;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, warn};
use tungstenite::client::IntoClientRequest;
use tungstenite::handshake::client::Request;
use tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tungstenite::http::HeaderValue;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};
use zg_core::{Error, EventSink, Handle, Result, SocketEvent, SocketSection};

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

/// Transport connecting sessions to `ws://` endpoints.
#[derive(Debug, Clone)]
pub struct WsTransport {
    poll_interval: Duration,
    max_message_bytes: usize,
}

impl WsTransport {
    pub fn new(config: &SocketSection) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            max_message_bytes: config.max_message_bytes,
        }
    }
}

impl Default for WsTransport {
    fn default() -> Self {
        Self::new(&SocketSection::default())
    }
}

impl SocketTransport for WsTransport {
    fn open(
        &mut self,
        session: Handle,
        endpoint: &str,
        subprotocols: &[String],
        events: EventSink,
    ) -> Result<Box<dyn MessageStream>> {
        let request = build_request(endpoint, subprotocols)?;
        let (commands, inbox) = mpsc::channel();
        let worker = Worker {
            session,
            events,
            inbox,
            poll_interval: self.poll_interval,
            max_message_bytes: self.max_message_bytes,
        };

        thread::Builder::new()
            .name(format!("zg-socket-{}", session.get()))
            .spawn(move || worker.run(request))?;

        Ok(Box::new(WsStream { commands }))
    }
}

fn build_request(endpoint: &str, subprotocols: &[String]) -> Result<Request> {
    let mut request = endpoint
        .into_client_request()
        .map_err(|e| Error::Transport(format!("invalid endpoint {}: {}", endpoint, e)))?;
    if !subprotocols.is_empty() {
        let value = HeaderValue::from_str(&subprotocols.join(", "))
            .map_err(|e| Error::Transport(format!("invalid subprotocol list: {}", e)))?;
        request.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, value);
    }
    Ok(request)
}

enum Command {
    Send(OutboundMessage),
    Close,
}

/// Handle kept by the session manager; talks to the worker thread.
struct WsStream {
    commands: Sender<Command>,
}

impl MessageStream for WsStream {
    fn send(&mut self, message: OutboundMessage) -> Result<()> {
        self.commands
            .send(Command::Send(message))
            .map_err(|_| Error::Transport("socket worker has exited".to_string()))
    }

    fn close(&mut self) {
        // The worker may already be gone after a remote close.
        let _ = self.commands.send(Command::Close);
    }
}

/// How a worker loop iteration ended.
enum Step {
    Continue,
    /// Stop and report this terminal event, if any.
    Stop(Option<SocketEvent>),
}

struct Worker {
    session: Handle,
    events: EventSink,
    inbox: Receiver<Command>,
    poll_interval: Duration,
    max_message_bytes: usize,
}

impl Worker {
    fn run(self, request: Request) {
        let session = self.session;
        let (mut socket, _response) = match tungstenite::connect(request) {
            Ok(connected) => connected,
            Err(err) => {
                error!(%session, "socket connect failed: {}", err);
                self.events.socket(session, SocketEvent::Error);
                return;
            }
        };

        if let MaybeTlsStream::Plain(stream) = socket.get_mut() {
            if let Err(err) = stream.set_read_timeout(Some(self.poll_interval)) {
                error!(%session, "failed to set socket read timeout: {}", err);
                self.events.socket(session, SocketEvent::Error);
                return;
            }
        }

        debug!(%session, "socket open");
        self.events.socket(session, SocketEvent::Open);

        let terminal = loop {
            if let Step::Stop(event) = self.drain_commands(&mut socket) {
                break event;
            }
            if let Step::Stop(event) = self.read_once(&mut socket) {
                break event;
            }
        };

        if let Some(event) = terminal {
            debug!(%session, ?event, "socket ended");
            self.events.socket(session, event);
        }
    }

    fn drain_commands(&self, socket: &mut Socket) -> Step {
        loop {
            match self.inbox.try_recv() {
                Ok(Command::Send(message)) => {
                    let message = match message {
                        OutboundMessage::Text(text) => Message::Text(text),
                        OutboundMessage::Binary(data) => Message::Binary(data.to_vec()),
                    };
                    if let Err(err) = socket.send(message) {
                        error!(session = %self.session, "socket send failed: {}", err);
                        return Step::Stop(Some(SocketEvent::Error));
                    }
                }
                // Local close: the session is already gone on the guest side.
                Ok(Command::Close) | Err(TryRecvError::Disconnected) => {
                    let _ = socket.close(None);
                    let _ = socket.flush();
                    return Step::Stop(None);
                }
                Err(TryRecvError::Empty) => return Step::Continue,
            }
        }
    }

    fn read_once(&self, socket: &mut Socket) -> Step {
        match socket.read() {
            Ok(Message::Text(text)) => self.deliver(false, Bytes::from(text.into_bytes())),
            Ok(Message::Binary(data)) => self.deliver(true, Bytes::from(data)),
            Ok(Message::Close(frame)) => {
                debug!(session = %self.session, ?frame, "socket closed by peer");
                // Flushes the queued close reply.
                let _ = socket.flush();
                return Step::Stop(Some(SocketEvent::Close));
            }
            // Pings are answered by tungstenite on the next write or flush.
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => {
                let _ = socket.flush();
            }
            Err(tungstenite::Error::Io(err))
                if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => {
                return Step::Stop(Some(SocketEvent::Close));
            }
            Err(err) => {
                error!(session = %self.session, "socket read failed: {}", err);
                return Step::Stop(Some(SocketEvent::Error));
            }
        }
        Step::Continue
    }

    fn deliver(&self, binary: bool, payload: Bytes) {
        if payload.len() > self.max_message_bytes {
            warn!(
                session = %self.session,
                len = payload.len(),
                max = self.max_message_bytes,
                "dropping oversized socket message"
            );
            return;
        }
        self.events
            .socket(self.session, SocketEvent::Message { binary, payload });
    }
}
