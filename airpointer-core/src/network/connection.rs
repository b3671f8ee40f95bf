use std::fmt;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::command::Command;
use crate::error::AirPointerError;

/// Capacity of the per-direction frame queues.
const QUEUE_DEPTH: usize = 100;

/// How long a locally initiated close waits for the peer's reply.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

enum Outbound {
    Text(String),
    Close,
}

/// A WebSocket session to a single peer.
///
/// The socket is split into a background writer task and a background reader
/// task. Inbound text frames are delivered in arrival order through
/// [`recv`](Self::recv); outbound frames are queued through a cloneable
/// [`ConnectionSender`]. Both tasks stop when either side closes or the
/// connection's cancellation token fires.
#[derive(Debug)]
pub struct Connection {
    sender: ConnectionSender,
    // Text frames from the background reader task
    rx: mpsc::Receiver<String>,
}

impl Connection {
    /// Wrap an established WebSocket.
    ///
    /// With `heartbeat` set, the writer task pings the peer at that interval.
    pub fn new<S>(ws: WebSocketStream<S>, heartbeat: Option<Duration>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut net_writer, mut net_reader) = ws.split();

        // User -> Network
        let (user_tx, mut network_rx) = mpsc::channel::<Outbound>(QUEUE_DEPTH);

        // Network -> User
        let (network_tx, user_rx) = mpsc::channel::<String>(QUEUE_DEPTH);

        let cancel = CancellationToken::new();

        // Writer task: User -> Network
        let writer_cancel = cancel.clone();
        tokio::spawn(async move {
            let mut heartbeat =
                heartbeat.map(|period| tokio::time::interval_at(Instant::now() + period, period));
            let mut closing = false;
            loop {
                let outbound = tokio::select! {
                    _ = writer_cancel.cancelled() => break,
                    _ = next_tick(&mut heartbeat) => {
                        if net_writer.send(Message::Ping(Vec::new().into())).await.is_err() {
                            break;
                        }
                        continue;
                    }
                    outbound = network_rx.recv() => outbound,
                };

                match outbound {
                    Some(Outbound::Text(text)) => {
                        if let Err(e) = net_writer.send(Message::text(text)).await {
                            warn!("websocket write error: {e}");
                            break;
                        }
                    }
                    Some(Outbound::Close) | None => {
                        let _ = net_writer.send(Message::Close(None)).await;
                        closing = true;
                        break;
                    }
                }
            }
            if closing {
                // Let the reader see the peer's close reply.
                let _ = tokio::time::timeout(CLOSE_GRACE, writer_cancel.cancelled()).await;
            }
            let _ = net_writer.close().await;
            writer_cancel.cancel();
        });

        // Reader task: Network -> User
        let reader_cancel = cancel.clone();
        tokio::spawn(async move {
            loop {
                let next = tokio::select! {
                    _ = reader_cancel.cancelled() => break,
                    next = net_reader.next() => next,
                };

                let text = match next {
                    Some(Ok(Message::Text(text))) => text.as_str().to_owned(),
                    Some(Ok(Message::Binary(bytes))) => {
                        String::from_utf8_lossy(&bytes).into_owned()
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    // Ping/pong are answered by tungstenite itself.
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        debug!("websocket read error: {e}");
                        break;
                    }
                };

                if network_tx.send(text).await.is_err() {
                    // user_rx was dropped, stop reading
                    break;
                }
            }
            reader_cancel.cancel();
        });

        Self {
            sender: ConnectionSender {
                tx: user_tx,
                cancel,
            },
            rx: user_rx,
        }
    }

    /// Dial a server and complete the WebSocket upgrade.
    pub async fn connect(conn_info: &ConnectionInfo) -> Result<Self, AirPointerError> {
        let (ws, _response) = tokio_tungstenite::connect_async(conn_info.url()).await?;
        Ok(Self::new(ws, None))
    }

    /// Next inbound text frame, or `None` once the peer is gone.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    pub async fn send_text(&self, text: impl Into<String>) -> Result<(), AirPointerError> {
        self.sender.send_text(text).await
    }

    pub async fn send_command(&self, command: &Command) -> Result<(), AirPointerError> {
        self.sender.send_command(command).await
    }

    /// Queue a close frame after everything already queued.
    pub async fn close(&self) {
        self.sender.close().await
    }

    /// A cloneable handle for writing to this connection.
    pub fn sender(&self) -> ConnectionSender {
        self.sender.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

// ── ConnectionSender ─────────────────────────────────────────────

/// Write half of a [`Connection`].
#[derive(Clone)]
pub struct ConnectionSender {
    tx: mpsc::Sender<Outbound>,
    cancel: CancellationToken,
}

impl ConnectionSender {
    pub async fn send_text(&self, text: impl Into<String>) -> Result<(), AirPointerError> {
        if self.cancel.is_cancelled() {
            return Err(AirPointerError::Closed);
        }
        self.tx
            .send(Outbound::Text(text.into()))
            .await
            .map_err(|_| AirPointerError::Closed)
    }

    pub async fn send_command(&self, command: &Command) -> Result<(), AirPointerError> {
        self.send_text(command.to_json()?).await
    }

    /// Queue a close frame. Frames queued earlier are still delivered first.
    pub async fn close(&self) {
        let _ = self.tx.send(Outbound::Close).await;
    }

    /// Stop both I/O tasks without a closing handshake.
    pub fn abort(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl fmt::Debug for ConnectionSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSender")
            .field("closed", &self.is_closed())
            .finish()
    }
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

// ── ConnectionInfo ───────────────────────────────────────────────

/// Where a controller should dial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    ip: String,
    port: u16,
}

impl ConnectionInfo {
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self {
            ip: ip.into(),
            port,
        }
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `ws://` URL for this endpoint.
    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.ip, self.port)
    }
}

impl fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_info_formats() {
        let info = ConnectionInfo::new("192.168.1.20", 5000);
        assert_eq!(info.url(), "ws://192.168.1.20:5000");
        assert_eq!(info.to_string(), "192.168.1.20:5000");
        assert_eq!(info.port(), 5000);
    }
}
