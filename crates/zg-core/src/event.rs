//! Host-originated events and the queue that carries them to the guest.
//!
//! Producers (socket transports, input sources) push into an [`EventSink`]
//! from any thread. The embedder drains the matching [`EventQueue`] between
//! guest calls, so an event is never delivered while the guest is running.

use crate::handle::Handle;
use bytes::Bytes;
use tokio::sync::mpsc::{self, error::TryRecvError};

/// Lifecycle and data events of one socket session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    Open,
    Message { binary: bool, payload: Bytes },
    Close,
    Error,
}

impl SocketEvent {
    /// Whether the event ends the session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SocketEvent::Close | SocketEvent::Error)
    }
}

/// Modifier keys held during a keyboard event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl Modifiers {
    pub(crate) fn as_args(self) -> [i32; 3] {
        [self.shift as i32, self.ctrl as i32, self.alt as i32]
    }
}

/// Keyboard and mouse input. Mouse buttons use 0 = left, 1 = middle, 2 = right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    MouseDown { x: i32, y: i32, button: i32 },
    MouseUp { x: i32, y: i32, button: i32 },
    MouseMotion { x: i32, y: i32 },
    KeyDown { scancode: u32, modifiers: Modifiers },
    KeyUp { scancode: u32, modifiers: Modifiers },
    TextInput { codepoint: char, modifiers: Modifiers },
}

impl InputEvent {
    /// Entry point and arguments the event is delivered with.
    pub fn guest_call(&self) -> (crate::GuestExport, Vec<i32>) {
        use crate::GuestExport;
        match *self {
            InputEvent::MouseDown { x, y, button } => (GuestExport::MouseDown, vec![x, y, button]),
            InputEvent::MouseUp { x, y, button } => (GuestExport::MouseUp, vec![x, y, button]),
            InputEvent::MouseMotion { x, y } => (GuestExport::MouseMotion, vec![x, y]),
            InputEvent::KeyDown {
                scancode,
                modifiers,
            } => key_call(GuestExport::KeyDown, scancode as i32, modifiers),
            InputEvent::KeyUp {
                scancode,
                modifiers,
            } => key_call(GuestExport::KeyUp, scancode as i32, modifiers),
            InputEvent::TextInput {
                codepoint,
                modifiers,
            } => key_call(GuestExport::TextInput, codepoint as i32, modifiers),
        }
    }
}

fn key_call(
    export: crate::GuestExport,
    code: i32,
    modifiers: Modifiers,
) -> (crate::GuestExport, Vec<i32>) {
    let mut args = vec![code];
    args.extend(modifiers.as_args());
    (export, args)
}

/// An event waiting for delivery to the guest.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Socket { session: Handle, event: SocketEvent },
    Input(InputEvent),
}

/// Create a connected sink/queue pair.
pub fn channel() -> (EventSink, EventQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSink { tx }, EventQueue { rx })
}

/// Sending half of the host event queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<HostEvent>,
}

impl EventSink {
    /// Queue an event. Returns `false` once the queue has been dropped.
    pub fn send(&self, event: HostEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Queue a socket event for `session`.
    pub fn socket(&self, session: Handle, event: SocketEvent) -> bool {
        self.send(HostEvent::Socket { session, event })
    }

    /// Queue an input event.
    pub fn input(&self, event: InputEvent) -> bool {
        self.send(HostEvent::Input(event))
    }
}

/// Receiving half of the host event queue, owned by the embedder.
#[derive(Debug)]
pub struct EventQueue {
    rx: mpsc::UnboundedReceiver<HostEvent>,
}

impl EventQueue {
    /// Take the next queued event without blocking.
    pub fn try_next(&mut self) -> Option<HostEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Take everything queued right now, in arrival order.
    pub fn drain(&mut self) -> Vec<HostEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }

    /// Refuse further events. Events already queued can still be taken.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GuestExport;

    #[test]
    fn queue_preserves_arrival_order() {
        let (sink, mut queue) = channel();
        let session = Handle::from_raw(1);
        sink.socket(session, SocketEvent::Open);
        sink.socket(
            session,
            SocketEvent::Message {
                binary: false,
                payload: Bytes::from_static(b"hi"),
            },
        );
        sink.socket(session, SocketEvent::Close);

        let events = queue.drain();
        assert_eq!(events.len(), 3);
        assert!(matches!(
            events[0],
            HostEvent::Socket {
                event: SocketEvent::Open,
                ..
            }
        ));
        assert!(matches!(
            events[2],
            HostEvent::Socket {
                event: SocketEvent::Close,
                ..
            }
        ));
        assert!(queue.try_next().is_none());
    }

    #[test]
    fn send_after_queue_drop_reports_false() {
        let (sink, queue) = channel();
        drop(queue);
        assert!(!sink.input(InputEvent::MouseMotion { x: 1, y: 2 }));
    }

    #[test]
    fn closed_queue_refuses_new_events() {
        let (sink, mut queue) = channel();
        sink.input(InputEvent::MouseMotion { x: 1, y: 1 });
        queue.close();

        assert!(!sink.input(InputEvent::MouseMotion { x: 2, y: 2 }));
        assert_eq!(queue.drain().len(), 1);
    }

    #[test]
    fn key_events_carry_modifier_flags() {
        let event = InputEvent::KeyDown {
            scancode: 42,
            modifiers: Modifiers {
                shift: true,
                ctrl: false,
                alt: true,
            },
        };
        assert_eq!(event.guest_call(), (GuestExport::KeyDown, vec![42, 1, 0, 1]));
    }
}
