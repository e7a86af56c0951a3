//! Loopback tests driving a listener and an initiator against each other.

use std::{sync::Arc, time::Duration};

use murmur_cipher::{Encoding, Key, StreamCipher};
use murmur_net::{
    Endpoint, EndpointConfig, EndpointEvent, Initiator, InitiatorState, Listener, ListenerState,
    NetError, Role,
};
use tokio::{io::AsyncWriteExt, net::TcpStream, sync::mpsc};

const EVENT_WAIT: Duration = Duration::from_secs(5);

fn cipher(key: &str) -> Arc<StreamCipher> {
    Arc::new(StreamCipher::new(Key::new(key).unwrap()))
}

async fn next_event(events: &mut mpsc::Receiver<EndpointEvent>) -> EndpointEvent {
    tokio::time::timeout(EVENT_WAIT, events.recv())
        .await
        .expect("timed out waiting for endpoint event")
        .expect("event channel closed")
}

async fn start_listener(key: &str) -> (Listener, mpsc::Receiver<EndpointEvent>) {
    Listener::start("127.0.0.1", 0, cipher(key), EndpointConfig::loopback()).await.unwrap()
}

async fn connect(listener: &Listener, key: &str) -> (Initiator, mpsc::Receiver<EndpointEvent>) {
    let port = listener.local_addr().port();
    Initiator::connect("127.0.0.1", port, cipher(key), EndpointConfig::loopback()).await.unwrap()
}

fn message(text: &str, sender: &str, encoding: Encoding) -> EndpointEvent {
    EndpointEvent::Message { text: text.to_string(), sender: sender.to_string(), encoding }
}

#[tokio::test]
async fn exchange_messages_both_ways() {
    let (listener, mut server_events) = start_listener("key1").await;
    let (initiator, mut client_events) = connect(&listener, "key1").await;

    let EndpointEvent::PeerConnected { peer_addr } = next_event(&mut server_events).await else {
        panic!("expected PeerConnected");
    };
    assert_eq!(peer_addr, initiator.local_addr());
    assert!(listener.is_connected());
    assert!(initiator.is_connected());
    assert_eq!(initiator.state(), InitiatorState::Connected { peer: listener.local_addr() });

    initiator.send("hello").await.unwrap();
    assert_eq!(
        next_event(&mut server_events).await,
        message("hello", "Client(127.0.0.1)", Encoding::Cipher)
    );

    listener.send("hi there").await.unwrap();
    assert_eq!(next_event(&mut client_events).await, message("hi there", "Server", Encoding::Cipher));

    initiator.disconnect().await;
    listener.stop().await;
}

#[tokio::test]
async fn plaintext_peer_is_delivered_verbatim() {
    let (listener, mut events) = start_listener("key1").await;
    let mut raw = TcpStream::connect(listener.local_addr()).await.unwrap();
    assert!(matches!(next_event(&mut events).await, EndpointEvent::PeerConnected { .. }));

    raw.write_all(b"hello world").await.unwrap();
    assert_eq!(
        next_event(&mut events).await,
        message("hello world", "Client(127.0.0.1)", Encoding::Plaintext)
    );

    listener.stop().await;
}

#[tokio::test]
async fn invalid_utf8_after_unmasking_falls_back_to_raw_text() {
    // "lA==" is 0x94, XOR 'k' gives 0xFF
    let (listener, mut events) = start_listener("k").await;
    let mut raw = TcpStream::connect(listener.local_addr()).await.unwrap();
    assert!(matches!(next_event(&mut events).await, EndpointEvent::PeerConnected { .. }));

    raw.write_all(b"lA==").await.unwrap();
    assert_eq!(
        next_event(&mut events).await,
        message("lA==", "Client(127.0.0.1)", Encoding::Plaintext)
    );

    listener.stop().await;
}

#[tokio::test]
async fn undecodable_chunk_reports_error_and_keeps_connection() {
    let (listener, mut events) = start_listener("key1").await;
    let mut raw = TcpStream::connect(listener.local_addr()).await.unwrap();
    assert!(matches!(next_event(&mut events).await, EndpointEvent::PeerConnected { .. }));

    raw.write_all(&[0xff, 0xfe, 0x00]).await.unwrap();
    assert!(matches!(next_event(&mut events).await, EndpointEvent::Error { .. }));
    assert!(listener.is_connected());

    raw.write_all(b"still here").await.unwrap();
    assert_eq!(
        next_event(&mut events).await,
        message("still here", "Client(127.0.0.1)", Encoding::Plaintext)
    );
    assert!(listener.is_connected());

    listener.stop().await;
}

#[tokio::test]
async fn mismatched_keys_still_deliver_something() {
    let (listener, mut server_events) = start_listener("key1").await;
    let (initiator, _client_events) = connect(&listener, "another-key").await;
    assert!(matches!(next_event(&mut server_events).await, EndpointEvent::PeerConnected { .. }));

    initiator.send("secret").await.unwrap();
    match next_event(&mut server_events).await {
        EndpointEvent::Message { text, .. } => assert_ne!(text, "secret"),
        other => panic!("expected Message, got {other:?}"),
    }

    initiator.disconnect().await;
    listener.stop().await;
}

#[tokio::test]
async fn listener_stop_disconnects_initiator_once() {
    let (listener, mut server_events) = start_listener("key1").await;
    let (initiator, mut client_events) = connect(&listener, "key1").await;
    assert!(matches!(next_event(&mut server_events).await, EndpointEvent::PeerConnected { .. }));

    listener.send("closing now").await.unwrap();
    listener.stop().await;
    assert_eq!(listener.state(), ListenerState::Closed);
    assert!(!listener.is_running());

    assert_eq!(next_event(&mut client_events).await, message("closing now", "Server", Encoding::Cipher));
    assert_eq!(next_event(&mut client_events).await, EndpointEvent::PeerDisconnected);
    assert_eq!(initiator.state(), InitiatorState::Idle);
    assert!(!initiator.is_running());

    // The worker already reported the disconnect
    initiator.disconnect().await;
    assert!(client_events.try_recv().is_err());
    assert_eq!(initiator.send("late").await, Err(NetError::NotConnected));
}

#[tokio::test]
async fn disconnect_is_idempotent_and_notifies_once() {
    let (listener, mut server_events) = start_listener("key1").await;
    let (initiator, mut client_events) = connect(&listener, "key1").await;
    assert!(matches!(next_event(&mut server_events).await, EndpointEvent::PeerConnected { .. }));

    initiator.disconnect().await;
    initiator.disconnect().await;

    assert_eq!(next_event(&mut client_events).await, EndpointEvent::PeerDisconnected);
    assert!(client_events.try_recv().is_err());
    assert_eq!(next_event(&mut server_events).await, EndpointEvent::PeerDisconnected);
    assert_eq!(listener.state(), ListenerState::Accepting);

    listener.stop().await;
    listener.stop().await;
    assert_eq!(listener.state(), ListenerState::Closed);
}

#[tokio::test]
async fn listener_serves_next_peer_after_first_leaves() {
    let (listener, mut events) = start_listener("key1").await;

    let (first, _first_events) = connect(&listener, "key1").await;
    assert!(matches!(next_event(&mut events).await, EndpointEvent::PeerConnected { .. }));
    first.disconnect().await;
    assert_eq!(next_event(&mut events).await, EndpointEvent::PeerDisconnected);

    let (second, _second_events) = connect(&listener, "key1").await;
    let EndpointEvent::PeerConnected { peer_addr } = next_event(&mut events).await else {
        panic!("expected second PeerConnected");
    };
    assert_eq!(peer_addr, second.local_addr());

    second.send("again").await.unwrap();
    assert_eq!(
        next_event(&mut events).await,
        message("again", "Client(127.0.0.1)", Encoding::Cipher)
    );

    second.disconnect().await;
    listener.stop().await;
}

#[tokio::test]
async fn key_rotation_applies_to_next_message() {
    let (listener, mut server_events) = start_listener("key1").await;
    let (initiator, _client_events) = connect(&listener, "key1").await;
    assert!(matches!(next_event(&mut server_events).await, EndpointEvent::PeerConnected { .. }));

    listener.set_key(Key::new("key2").unwrap());
    initiator.set_key(Key::new("key2").unwrap());

    initiator.send("rotated").await.unwrap();
    assert_eq!(
        next_event(&mut server_events).await,
        message("rotated", "Client(127.0.0.1)", Encoding::Cipher)
    );

    initiator.disconnect().await;
    listener.stop().await;
}

#[tokio::test]
async fn endpoint_wraps_either_role() {
    let (listener, mut server_events) = start_listener("key1").await;
    let (initiator, mut client_events) = connect(&listener, "key1").await;
    assert!(matches!(next_event(&mut server_events).await, EndpointEvent::PeerConnected { .. }));

    let server = Endpoint::from(listener);
    let client = Endpoint::from(initiator);
    assert_eq!(server.role(), Role::Server);
    assert_eq!(client.role(), Role::Client);
    assert!(server.is_connected() && client.is_connected());

    server.send("via endpoint").await.unwrap();
    assert_eq!(
        next_event(&mut client_events).await,
        message("via endpoint", "Server", Encoding::Cipher)
    );

    client.stop().await;
    server.stop().await;
    assert!(!server.is_running());
    assert!(!client.is_running());
}

#[tokio::test]
async fn connect_to_closed_port_fails() {
    let port = {
        let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        probe.local_addr().unwrap().port()
    };

    let result =
        Initiator::connect("127.0.0.1", port, cipher("key1"), EndpointConfig::loopback()).await;
    assert!(matches!(result, Err(NetError::Connect { .. })));
}
