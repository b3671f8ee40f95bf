//! Integration tests: connection lifecycle, command frames and close
//! handling over a real WebSocket on localhost.

use std::time::Duration;

use tokio::net::TcpListener;
use tokio_test::{assert_err, assert_ok};

use airpointer_core::{Command, Connection, ConnectionInfo, Inbound};

// ── Helpers ──────────────────────────────────────────────────────

/// Listener on an OS-assigned port plus the info to dial it.
async fn ephemeral_listener() -> (TcpListener, ConnectionInfo) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let info = ConnectionInfo::new(addr.ip().to_string(), addr.port());
    (listener, info)
}

/// A connected (server, client) pair.
async fn pair(heartbeat: Option<Duration>) -> (Connection, Connection) {
    let (listener, info) = ephemeral_listener().await;

    let client = tokio::spawn(async move { Connection::connect(&info).await.unwrap() });

    let (stream, _) = listener.accept().await.unwrap();
    let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
    let server = Connection::new(ws, heartbeat);
    (server, client.await.unwrap())
}

async fn recv(conn: &mut Connection) -> Option<String> {
    tokio::time::timeout(Duration::from_secs(5), conn.recv())
        .await
        .expect("timeout")
}

// ── Tests ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_text_both_ways() {
    let (mut server, mut client) = pair(None).await;

    assert_ok!(client.send_text("admin@1234").await);
    assert_eq!(recv(&mut server).await.as_deref(), Some("admin@1234"));

    assert_ok!(server.send_text("AUTH_SUCCESS").await);
    assert_eq!(recv(&mut client).await.as_deref(), Some("AUTH_SUCCESS"));
}

#[tokio::test]
async fn test_commands_arrive_in_order() {
    let (mut server, client) = pair(None).await;

    let sent: Vec<Command> = (0..50)
        .map(|i| Command::mouse_move(i as f64, -(i as f64)))
        .chain([Command::MouseLeftClick, Command::RecenterMouse])
        .collect();
    for command in &sent {
        assert_ok!(client.send_command(command).await);
    }

    for expected in &sent {
        let frame = recv(&mut server).await.expect("closed early");
        match Command::parse(&frame).unwrap() {
            Inbound::Known(command) => assert_eq!(&command, expected),
            Inbound::Unknown(tag) => panic!("unknown tag {tag}"),
        }
    }
}

#[tokio::test]
async fn test_close_reaches_peer() {
    let (mut server, client) = pair(None).await;

    assert_ok!(client.send_text("last words").await);
    client.close().await;

    assert_eq!(recv(&mut server).await.as_deref(), Some("last words"));
    assert_eq!(recv(&mut server).await, None);

    tokio::time::timeout(Duration::from_secs(5), async {
        while !server.is_closed() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("server side never closed");
    assert_err!(server.send_text("too late").await);
}

#[tokio::test]
async fn test_abort_stops_sender() {
    let (_server, client) = pair(None).await;
    let sender = client.sender();

    sender.abort();
    assert!(client.is_closed());
    assert_err!(client.send_text("nope").await);
}

#[tokio::test]
async fn test_heartbeat_keeps_session_open() {
    let (mut server, mut client) = pair(Some(Duration::from_millis(20))).await;

    // pings are handled below the text queue
    let quiet = tokio::time::timeout(Duration::from_millis(150), client.recv()).await;
    assert!(quiet.is_err());
    assert!(!client.is_closed());

    assert_ok!(client.send_text("still here").await);
    assert_eq!(recv(&mut server).await.as_deref(), Some("still here"));
}

#[tokio::test]
async fn test_connect_refused() {
    let (listener, info) = ephemeral_listener().await;
    drop(listener);

    assert_err!(Connection::connect(&info).await);
}
