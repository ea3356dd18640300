use proptest::prelude::*;
use std::sync::{Arc, Mutex};
use zg_core::event::{self, EventQueue};
use zg_core::memory::read_bytes;
use zg_core::{
    Error, EventSink, GuestExport, GuestInstance, Handle, HostEvent, Modifiers, ResourceKind,
    SocketEvent,
};
use zg_net::{
    EventRouter, InputSource, MessageStream, OutboundMessage, SocketManager, SocketTransport,
};

#[derive(Debug, Clone, PartialEq)]
enum StreamLog {
    Sent(u32, OutboundMessage),
    Closed(u32),
}

/// Transport that never touches the network. Endpoints starting with
/// `bad:` are rejected.
#[derive(Default)]
struct ScriptedTransport {
    log: Arc<Mutex<Vec<StreamLog>>>,
    opened: Arc<Mutex<Vec<(u32, String, Vec<String>)>>>,
}

struct ScriptedStream {
    session: u32,
    log: Arc<Mutex<Vec<StreamLog>>>,
}

impl MessageStream for ScriptedStream {
    fn send(&mut self, message: OutboundMessage) -> zg_core::Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(StreamLog::Sent(self.session, message));
        Ok(())
    }

    fn close(&mut self) {
        self.log.lock().unwrap().push(StreamLog::Closed(self.session));
    }
}

impl SocketTransport for ScriptedTransport {
    fn open(
        &mut self,
        session: Handle,
        endpoint: &str,
        subprotocols: &[String],
        _events: EventSink,
    ) -> zg_core::Result<Box<dyn MessageStream>> {
        if endpoint.starts_with("bad:") {
            return Err(Error::Transport(format!("refused {endpoint}")));
        }
        self.opened.lock().unwrap().push((
            session.get(),
            endpoint.to_string(),
            subprotocols.to_vec(),
        ));
        Ok(Box::new(ScriptedStream {
            session: session.get(),
            log: self.log.clone(),
        }))
    }
}

/// Guest double with a bump allocator. An allocator limit of zero bytes
/// makes every allocation fail.
struct RecordingGuest {
    memory: Vec<u8>,
    next_free: u32,
    alloc_limit: u32,
    calls: Vec<(GuestExport, Vec<i32>)>,
}

impl RecordingGuest {
    fn new() -> Self {
        Self {
            memory: vec![0; 4096],
            next_free: 1024,
            alloc_limit: u32::MAX,
            calls: Vec::new(),
        }
    }

    fn exports(&self) -> Vec<GuestExport> {
        self.calls.iter().map(|(export, _)| *export).collect()
    }
}

impl GuestInstance for RecordingGuest {
    fn memory(&mut self) -> zg_core::Result<&mut [u8]> {
        Ok(&mut self.memory)
    }

    fn invoke(&mut self, export: GuestExport, args: &[i32]) -> zg_core::Result<Option<i32>> {
        self.calls.push((export, args.to_vec()));
        if export != GuestExport::SocketAlloc {
            return Ok(None);
        }
        let len = args[0] as u32;
        if len > self.alloc_limit {
            return Ok(Some(0));
        }
        let ptr = self.next_free;
        self.next_free += len;
        Ok(Some(ptr as i32))
    }
}

fn manager() -> (SocketManager, EventSink, EventQueue, Arc<Mutex<Vec<StreamLog>>>) {
    let (sink, queue) = event::channel();
    let transport = ScriptedTransport::default();
    let log = transport.log.clone();
    (
        SocketManager::new(Box::new(transport), sink.clone()),
        sink,
        queue,
        log,
    )
}

fn message(text: &str) -> SocketEvent {
    SocketEvent::Message {
        binary: false,
        payload: bytes::Bytes::copy_from_slice(text.as_bytes()),
    }
}

fn pump(
    router: &mut EventRouter,
    sessions: &mut SocketManager,
    queue: &mut EventQueue,
    guest: &mut RecordingGuest,
) {
    while let Some(event) = queue.try_next() {
        router.route(sessions, Some(&mut *guest), event);
    }
}

#[test]
fn session_ids_increase_and_are_never_reused() {
    let (mut sockets, _, _, _) = manager();
    let first = sockets.connect("ws://a", &[]).unwrap();
    let second = sockets.connect("ws://b", &[]).unwrap();
    sockets.destroy(first);
    sockets.destroy(second);
    let third = sockets.connect("ws://c", &[]).unwrap();

    assert_eq!((first.get(), second.get(), third.get()), (1, 2, 3));
    assert_eq!(sockets.live(), 1);
}

#[test]
fn rejected_connect_consumes_no_id() {
    let (mut sockets, _, _, _) = manager();
    assert!(matches!(
        sockets.connect("bad:endpoint", &[]),
        Err(Error::Transport(_))
    ));
    assert_eq!(sockets.connect("ws://ok", &[]).unwrap().get(), 1);
}

#[test]
fn connect_passes_subprotocols() {
    let (sink, _queue) = event::channel();
    let transport = ScriptedTransport::default();
    let opened = transport.opened.clone();
    let mut sockets = SocketManager::new(Box::new(transport), sink);

    sockets
        .connect("ws://chat", &["v1.chat".to_string()])
        .unwrap();
    assert_eq!(
        opened.lock().unwrap()[0],
        (1, "ws://chat".to_string(), vec!["v1.chat".to_string()])
    );
    assert!(!sockets.session(1u32).unwrap().is_open());
}

#[test]
fn send_requires_a_live_session() {
    let (mut sockets, _, _, log) = manager();
    let session = sockets.connect("ws://a", &[]).unwrap();

    sockets.send(session, false, b"hi \xF0").unwrap();
    sockets.send(session, true, &[1, 2, 3]).unwrap();
    assert!(matches!(
        sockets.send(7u32, true, b"x"),
        Err(Error::InvalidHandle {
            kind: ResourceKind::SocketSession,
            handle: 7
        })
    ));

    let log = log.lock().unwrap();
    assert_eq!(
        log[0],
        StreamLog::Sent(1, OutboundMessage::Text("hi \u{FFFD}".to_string()))
    );
    assert_eq!(
        log[1],
        StreamLog::Sent(1, OutboundMessage::Binary(vec![1, 2, 3].into()))
    );
}

#[test]
fn destroy_closes_stream_and_ignores_unknown_ids() {
    let (mut sockets, _, _, log) = manager();
    let session = sockets.connect("ws://a", &[]).unwrap();

    sockets.destroy(session);
    sockets.destroy(session);
    sockets.destroy(99u32);

    assert_eq!(*log.lock().unwrap(), vec![StreamLog::Closed(1)]);
    assert!(matches!(
        sockets.send(session, false, b"late"),
        Err(Error::InvalidHandle { .. })
    ));
}

#[test]
fn message_for_destroyed_session_never_reaches_guest() {
    let (mut sockets, sink, mut queue, _) = manager();
    let mut router = EventRouter::new();
    let mut guest = RecordingGuest::new();

    let session = sockets.connect("ws://a", &[]).unwrap();
    sockets.destroy(session);
    sink.socket(session, message("too late"));

    pump(&mut router, &mut sockets, &mut queue, &mut guest);

    assert!(guest.calls.is_empty());
    assert_eq!(router.stats().dropped, 1);
}

#[test]
fn session_events_arrive_in_order_with_one_terminal() {
    let (mut sockets, sink, mut queue, _) = manager();
    let mut router = EventRouter::new();
    let mut guest = RecordingGuest::new();
    let session = sockets.connect("ws://a", &[]).unwrap();

    sink.socket(session, SocketEvent::Open);
    sink.socket(session, message("one"));
    sink.socket(session, message("two"));
    sink.socket(session, SocketEvent::Close);
    sink.socket(session, SocketEvent::Error);
    pump(&mut router, &mut sockets, &mut queue, &mut guest);

    assert_eq!(
        guest.exports(),
        vec![
            GuestExport::SocketOpen,
            GuestExport::SocketAlloc,
            GuestExport::SocketMessage,
            GuestExport::SocketAlloc,
            GuestExport::SocketMessage,
            GuestExport::SocketClose,
        ]
    );
    assert_eq!(guest.calls[2].1, vec![1, 0, 1024, 3]);
    assert_eq!(guest.calls[4].1, vec![1, 0, 1027, 3]);
    assert_eq!(read_bytes(&guest.memory, 1024, 6).unwrap(), b"onetwo");
    assert_eq!(sockets.live(), 0);
    assert_eq!(router.stats().delivered, 4);
    assert_eq!(router.stats().dropped, 1);
}

#[test]
fn open_event_marks_session_open() {
    let (mut sockets, sink, mut queue, _) = manager();
    let mut router = EventRouter::new();
    let mut guest = RecordingGuest::new();
    let session = sockets.connect("ws://a", &[]).unwrap();

    sink.socket(session, SocketEvent::Open);
    pump(&mut router, &mut sockets, &mut queue, &mut guest);

    assert!(sockets.session(session).unwrap().is_open());
}

#[test]
fn failed_allocation_drops_only_that_message() {
    let (mut sockets, sink, mut queue, _) = manager();
    let mut router = EventRouter::new();
    let mut guest = RecordingGuest::new();
    guest.alloc_limit = 4;
    let session = sockets.connect("ws://a", &[]).unwrap();

    sink.socket(
        session,
        SocketEvent::Message {
            binary: true,
            payload: bytes::Bytes::from_static(&[0; 16]),
        },
    );
    sink.socket(session, message("ok"));
    pump(&mut router, &mut sockets, &mut queue, &mut guest);

    assert_eq!(
        guest.exports(),
        vec![
            GuestExport::SocketAlloc,
            GuestExport::SocketAlloc,
            GuestExport::SocketMessage,
        ]
    );
    assert_eq!(guest.calls[0].1, vec![16]);
    assert_eq!(router.stats().dropped, 1);
    assert!(sockets.is_live(session));
}

#[test]
fn events_without_a_guest_are_dropped() {
    let (mut sockets, sink, mut queue, _) = manager();
    let mut router = EventRouter::new();
    let session = sockets.connect("ws://a", &[]).unwrap();

    sink.socket(session, SocketEvent::Error);
    while let Some(event) = queue.try_next() {
        assert!(!router.route::<RecordingGuest>(&mut sockets, None, event));
    }
    assert!(!sockets.is_live(session));
    assert_eq!(router.stats().dropped, 1);
}

#[test]
fn input_events_call_their_entry_points() {
    let (mut sockets, sink, mut queue, _) = manager();
    let mut router = EventRouter::new();
    let mut guest = RecordingGuest::new();
    let input = InputSource::new(sink);

    input.mouse_down(10, 20, 2);
    input.mouse_motion(11, 21);
    input.key_up(
        30,
        Modifiers {
            ctrl: true,
            ..Modifiers::default()
        },
    );
    input.text_input('é', Modifiers::default());
    pump(&mut router, &mut sockets, &mut queue, &mut guest);

    assert_eq!(
        guest.calls,
        vec![
            (GuestExport::MouseDown, vec![10, 20, 2]),
            (GuestExport::MouseMotion, vec![11, 21]),
            (GuestExport::KeyUp, vec![30, 0, 1, 0]),
            (GuestExport::TextInput, vec![0xE9, 0, 0, 0]),
        ]
    );
}

#[test]
fn input_after_teardown_is_refused() {
    let (sink, queue) = event::channel();
    let input = InputSource::new(sink);
    drop(queue);
    assert!(!input.mouse_up(0, 0, 0));
}

#[test]
fn close_all_closes_every_stream() {
    let (mut sockets, _, _, log) = manager();
    sockets.connect("ws://a", &[]).unwrap();
    sockets.connect("ws://b", &[]).unwrap();

    sockets.close_all();
    assert_eq!(sockets.live(), 0);
    assert_eq!(
        *log.lock().unwrap(),
        vec![StreamLog::Closed(1), StreamLog::Closed(2)]
    );
    assert_eq!(sockets.connect("ws://c", &[]).unwrap().get(), 3);
}

proptest! {
    #[test]
    fn ids_strictly_increase_across_any_destroy_pattern(destroys in prop::collection::vec(any::<bool>(), 1..40)) {
        let (mut sockets, _, _, _) = manager();
        let mut last = 0;
        for destroy in destroys {
            let session = sockets.connect("ws://x", &[]).unwrap();
            prop_assert!(session.get() > last);
            last = session.get();
            if destroy {
                sockets.destroy(session);
            }
        }
    }
}

#[test]
fn host_event_for_unknown_session_is_dropped() {
    let (mut sockets, _, _, _) = manager();
    let mut router = EventRouter::new();
    let event = HostEvent::Socket {
        session: Handle::from_raw(5),
        event: SocketEvent::Open,
    };
    assert!(router.admit(&mut sockets, event).is_none());
}
