use std::net::TcpListener;
use std::thread;
use std::time::{Duration, Instant};
use tungstenite::Message;
use zg_core::event::{self, EventQueue};
use zg_core::{HostEvent, SocketEvent, SocketSection};
use zg_net::{SocketManager, WsTransport};

/// Accept one client and echo every data message until it closes.
fn spawn_echo_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut socket = tungstenite::accept(stream).unwrap();
        loop {
            match socket.read() {
                Ok(message @ (Message::Text(_) | Message::Binary(_))) => {
                    if socket.send(message).is_err() {
                        break;
                    }
                }
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    });
    format!("ws://{}", addr)
}

/// Accept one client, send a greeting and close.
fn spawn_greeting_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut socket = tungstenite::accept(stream).unwrap();
        socket.send(Message::Text("welcome".to_string())).unwrap();
        socket.close(None).unwrap();
        while socket.read().is_ok() {}
    });
    format!("ws://{}", addr)
}

fn next_event(queue: &mut EventQueue) -> HostEvent {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(event) = queue.try_next() {
            return event;
        }
        assert!(Instant::now() < deadline, "timed out waiting for event");
        thread::sleep(Duration::from_millis(5));
    }
}

fn next_socket_event(queue: &mut EventQueue) -> SocketEvent {
    match next_event(queue) {
        HostEvent::Socket { event, .. } => event,
        other => panic!("unexpected event: {other:?}"),
    }
}

fn transport() -> Box<WsTransport> {
    let config = SocketSection {
        poll_interval_ms: 5,
        max_message_bytes: 64,
    };
    Box::new(WsTransport::new(&config))
}

#[test]
fn echo_round_trip() {
    let endpoint = spawn_echo_server();
    let (sink, mut queue) = event::channel();
    let mut sockets = SocketManager::new(transport(), sink);

    let session = sockets.connect(&endpoint, &[]).unwrap();
    assert_eq!(next_socket_event(&mut queue), SocketEvent::Open);

    sockets.send(session, false, b"hello").unwrap();
    sockets.send(session, true, &[7, 8, 9]).unwrap();

    assert_eq!(
        next_socket_event(&mut queue),
        SocketEvent::Message {
            binary: false,
            payload: bytes::Bytes::from_static(b"hello"),
        }
    );
    assert_eq!(
        next_socket_event(&mut queue),
        SocketEvent::Message {
            binary: true,
            payload: bytes::Bytes::from_static(&[7, 8, 9]),
        }
    );

    sockets.destroy(session);
}

#[test]
fn oversized_messages_are_dropped() {
    let endpoint = spawn_echo_server();
    let (sink, mut queue) = event::channel();
    let mut sockets = SocketManager::new(transport(), sink);

    let session = sockets.connect(&endpoint, &[]).unwrap();
    assert_eq!(next_socket_event(&mut queue), SocketEvent::Open);

    sockets.send(session, true, &[0; 100]).unwrap();
    sockets.send(session, false, b"small").unwrap();

    assert_eq!(
        next_socket_event(&mut queue),
        SocketEvent::Message {
            binary: false,
            payload: bytes::Bytes::from_static(b"small"),
        }
    );
    sockets.destroy(session);
}

#[test]
fn peer_close_is_reported_once() {
    let endpoint = spawn_greeting_server();
    let (sink, mut queue) = event::channel();
    let mut sockets = SocketManager::new(transport(), sink);

    sockets.connect(&endpoint, &[]).unwrap();
    assert_eq!(next_socket_event(&mut queue), SocketEvent::Open);
    assert_eq!(
        next_socket_event(&mut queue),
        SocketEvent::Message {
            binary: false,
            payload: bytes::Bytes::from_static(b"welcome"),
        }
    );
    assert_eq!(next_socket_event(&mut queue), SocketEvent::Close);

    thread::sleep(Duration::from_millis(50));
    assert!(queue.try_next().is_none());
}

#[test]
fn unreachable_endpoint_reports_error() {
    // Bind then drop to get a port nobody listens on.
    let port = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let (sink, mut queue) = event::channel();
    let mut sockets = SocketManager::new(transport(), sink);

    let session = sockets
        .connect(&format!("ws://127.0.0.1:{}", port), &[])
        .unwrap();
    assert_eq!(session.get(), 1);
    assert_eq!(next_socket_event(&mut queue), SocketEvent::Error);
}
