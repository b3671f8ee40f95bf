//! Server core: the listener, the single controller slot and the admin
//! handle.
//!
//! One actor task owns the [`Session`]. Everything that touches it arrives
//! as a message on one of two queues:
//!
//! ```text
//! accept loop ─┐
//! handshakes ──┼─► net queue ───┐
//! conn pumps ──┘                ├─► actor ──► Dispatcher ──► Actuator
//! ServerHandle ──► admin queue ─┘       └───► UI events
//! ```
//!
//! Claiming the slot on accept and releasing it on close therefore happen
//! in separate turns of one task and never race. Frames and close notices
//! carry the [`ConnectionId`] they came from; anything tagged with an id
//! that no longer holds the slot is dropped. Accepted sockets carry the
//! generation of the listener that produced them, so handshakes finishing
//! after a restart are closed instead of admitted.

use std::net::SocketAddr;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use airpointer_core::{
    AUTH_FAILED, AUTH_SUCCESS, Actuator, AirPointerError, AuthOutcome, CONNECTION_REJECTED,
    ClientSnapshot, Connection, ConnectionId, ConnectionSender, ListenAddress, Session,
};

use crate::config::ServerConfig;
use crate::discovery::ServerInfo;
use crate::dispatch::{self, Dispatcher};
use crate::event::{ConnectionStatus, ServerEvent};

const NET_QUEUE_DEPTH: usize = 256;
const ADMIN_QUEUE_DEPTH: usize = 16;

/// How long a turned-away socket is drained before it is dropped.
const REJECT_DRAIN: Duration = Duration::from_secs(2);

/// Deadline for a freshly accepted socket to finish the WebSocket upgrade.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

type WsStream = WebSocketStream<TcpStream>;

enum NetEvent {
    Opened {
        generation: u64,
        ws: Box<WsStream>,
        peer: SocketAddr,
    },
    Frame {
        id: ConnectionId,
        text: String,
    },
    Closed {
        id: ConnectionId,
    },
}

enum AdminRequest {
    Info {
        reply: oneshot::Sender<ServerInfo>,
    },
    Update {
        port: u16,
        password: String,
        reply: oneshot::Sender<Result<ServerInfo, AirPointerError>>,
    },
    Disconnect {
        reply: oneshot::Sender<bool>,
    },
    Snapshot {
        reply: oneshot::Sender<Option<ClientSnapshot>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

// ── ServerHandle ─────────────────────────────────────────────────

/// Administrative handle to a running server. Cheap to clone.
///
/// Dropping every handle stops the server as if [`shutdown`](Self::shutdown)
/// had been called.
#[derive(Debug, Clone)]
pub struct ServerHandle {
    tx: mpsc::Sender<AdminRequest>,
}

impl ServerHandle {
    async fn request<R>(
        &self,
        make: impl FnOnce(oneshot::Sender<R>) -> AdminRequest,
    ) -> Result<R, AirPointerError> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(make(reply)).await?;
        Ok(rx.await?)
    }

    /// Current `{ip, port, password}`.
    pub async fn server_info(&self) -> Result<ServerInfo, AirPointerError> {
        self.request(|reply| AdminRequest::Info { reply }).await
    }

    /// Replace port and password.
    ///
    /// Always restarts: the active controller is disconnected and the
    /// listener rebound, even when the values are unchanged. On a bind
    /// failure the server keeps running without a listener until the next
    /// successful update.
    pub async fn update_config(
        &self,
        port: u16,
        password: impl Into<String>,
    ) -> Result<ServerInfo, AirPointerError> {
        let password = password.into();
        self.request(|reply| AdminRequest::Update {
            port,
            password,
            reply,
        })
        .await?
    }

    /// Force the active controller off. Returns `false` if there was none.
    pub async fn disconnect_client(&self) -> Result<bool, AirPointerError> {
        self.request(|reply| AdminRequest::Disconnect { reply })
            .await
    }

    pub async fn active_client(&self) -> Result<Option<ClientSnapshot>, AirPointerError> {
        self.request(|reply| AdminRequest::Snapshot { reply }).await
    }

    /// Disconnect the controller, close the listener and stop the actor.
    pub async fn shutdown(&self) -> Result<(), AirPointerError> {
        self.request(|reply| AdminRequest::Shutdown { reply }).await
    }
}

/// Bind the listener and spawn the server actor.
///
/// UI events are sent on `ui`; a closed receiver is ignored.
pub async fn start(
    config: &ServerConfig,
    actuator: Arc<dyn Actuator>,
    ui: mpsc::UnboundedSender<ServerEvent>,
) -> Result<(ServerHandle, JoinHandle<()>), AirPointerError> {
    let (admin_tx, admin_rx) = mpsc::channel(ADMIN_QUEUE_DEPTH);
    let (net_tx, net_rx) = mpsc::channel(NET_QUEUE_DEPTH);

    let mut server = Server {
        session: Session::new(config.listen_address(), config.auth.password.clone()),
        heartbeat: config.heartbeat(),
        dispatcher: Dispatcher::new(actuator),
        ui,
        net_tx,
        listener: None,
        generation: 0,
        next_id: 0,
        active: None,
    };
    server.bind_listener().await?;

    let task = tokio::spawn(server.run(admin_rx, net_rx));
    Ok((ServerHandle { tx: admin_tx }, task))
}

// ── Actor ────────────────────────────────────────────────────────

struct ListenerTask {
    generation: u64,
    addr: SocketAddr,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Write side of the connection holding the slot.
struct ActiveIo {
    id: ConnectionId,
    sender: ConnectionSender,
}

struct Server {
    session: Session,
    heartbeat: Option<Duration>,
    dispatcher: Dispatcher,
    ui: mpsc::UnboundedSender<ServerEvent>,
    net_tx: mpsc::Sender<NetEvent>,
    listener: Option<ListenerTask>,
    generation: u64,
    next_id: u64,
    active: Option<ActiveIo>,
}

impl Server {
    async fn run(
        mut self,
        mut admin_rx: mpsc::Receiver<AdminRequest>,
        mut net_rx: mpsc::Receiver<NetEvent>,
    ) {
        loop {
            tokio::select! {
                request = admin_rx.recv() => match request {
                    Some(request) => {
                        if self.on_admin(request).await.is_break() {
                            return;
                        }
                    }
                    None => break,
                },
                Some(event) = net_rx.recv() => self.on_net(event).await,
            }
        }
        self.stop().await;
    }

    fn emit(&self, event: ServerEvent) {
        if self.ui.send(event).is_err() {
            trace!("ui receiver gone; event dropped");
        }
    }

    fn info(&self) -> ServerInfo {
        let listen = self.session.listen_address();
        let port = self
            .listener
            .as_ref()
            .map_or(listen.port, |l| l.addr.port());
        ServerInfo::new(&listen.host, port, self.session.secret())
    }

    // ── Listener ─────────────────────────────────────────────────

    async fn bind_listener(&mut self) -> Result<SocketAddr, AirPointerError> {
        self.generation += 1;
        let generation = self.generation;
        let listen = self.session.listen_address().clone();

        let listener = TcpListener::bind((listen.host.as_str(), listen.port)).await?;
        let addr = listener.local_addr()?;
        let cancel = CancellationToken::new();
        let task = tokio::spawn(accept_loop(
            listener,
            generation,
            cancel.clone(),
            self.net_tx.clone(),
        ));

        self.listener = Some(ListenerTask {
            generation,
            addr,
            cancel,
            task,
        });
        info!("listening on ws://{addr}");
        self.emit(ServerEvent::Listening { addr });
        Ok(addr)
    }

    async fn close_listener(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.cancel.cancel();
            if let Err(e) = listener.task.await {
                warn!("accept loop ended abnormally: {e}");
            }
            info!("listener on {} closed", listener.addr);
        }
    }

    async fn restart(
        &mut self,
        port: u16,
        password: String,
    ) -> Result<ServerInfo, AirPointerError> {
        info!(port, "configuration updated; restarting listener");
        self.evict("configuration changed").await;
        self.close_listener().await;

        let host = self.session.listen_address().host.clone();
        self.session = Session::new(ListenAddress::new(host, port), password);
        self.bind_listener().await?;
        Ok(self.info())
    }

    async fn stop(&mut self) {
        self.evict("server shutting down").await;
        self.close_listener().await;
        info!("server stopped");
    }

    // ── Slot ─────────────────────────────────────────────────────

    async fn evict(&mut self, reason: &str) -> bool {
        let Some(id) = self.session.evict() else {
            return false;
        };
        if let Some(active) = self.active.take() {
            active.sender.close().await;
        }
        info!(conn = %id, "disconnecting controller: {reason}");
        self.emit(ServerEvent::Status(ConnectionStatus::Disconnected));
        true
    }

    fn sender_for(&self, id: ConnectionId) -> Option<ConnectionSender> {
        self.active
            .as_ref()
            .filter(|a| a.id == id)
            .map(|a| a.sender.clone())
    }

    // ── Handlers ─────────────────────────────────────────────────

    /// Breaks once the server has stopped.
    async fn on_admin(&mut self, request: AdminRequest) -> ControlFlow<()> {
        match request {
            AdminRequest::Info { reply } => {
                let _ = reply.send(self.info());
            }
            AdminRequest::Update {
                port,
                password,
                reply,
            } => {
                let result = self.restart(port, password).await;
                if let Err(e) = &result {
                    warn!("restart failed: {e}");
                }
                let _ = reply.send(result);
            }
            AdminRequest::Disconnect { reply } => {
                let evicted = self.evict("disconnected by user").await;
                let _ = reply.send(evicted);
            }
            AdminRequest::Snapshot { reply } => {
                let _ = reply.send(self.session.snapshot());
            }
            AdminRequest::Shutdown { reply } => {
                self.stop().await;
                let _ = reply.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    async fn on_net(&mut self, event: NetEvent) {
        match event {
            NetEvent::Opened {
                generation,
                ws,
                peer,
            } => self.on_opened(generation, *ws, peer),
            NetEvent::Frame { id, text } => self.on_frame(id, text).await,
            NetEvent::Closed { id } => self.on_closed(id),
        }
    }

    fn on_opened(&mut self, generation: u64, ws: WsStream, peer: SocketAddr) {
        let current = self
            .listener
            .as_ref()
            .is_some_and(|l| l.generation == generation);
        if !current {
            debug!(%peer, "discarding handshake from a closed listener");
            tokio::spawn(drop_socket(ws));
            return;
        }

        self.next_id += 1;
        let id = ConnectionId(self.next_id);

        match self.session.claim(id, Some(peer)) {
            Ok(()) => {
                info!(conn = %id, %peer, "controller connected; awaiting auth");
                let conn = Connection::new(ws, self.heartbeat);
                self.active = Some(ActiveIo {
                    id,
                    sender: conn.sender(),
                });
                tokio::spawn(pump(id, conn, self.net_tx.clone()));
            }
            Err(AirPointerError::ConnectionRejected) => {
                info!(%peer, "rejecting controller: another one is active");
                self.emit(ServerEvent::ConnectionRejected { peer });
                tokio::spawn(reject(ws));
            }
            Err(e) => {
                warn!(%peer, "cannot admit controller: {e}");
                tokio::spawn(drop_socket(ws));
            }
        }
    }

    async fn on_frame(&mut self, id: ConnectionId, text: String) {
        let awaiting_auth = match self.session.phase_of(id) {
            Some(phase) => phase.is_awaiting_auth(),
            None => {
                trace!(conn = %id, "frame from released connection");
                return;
            }
        };

        if awaiting_auth {
            self.on_auth(id, &text).await;
            return;
        }

        let Some(command) = dispatch::decode(id, &text) else {
            return;
        };
        let event = self
            .dispatcher
            .dispatch(id, command, &mut self.session)
            .await;
        if let Some(event) = event {
            self.emit(event);
        }
    }

    async fn on_auth(&mut self, id: ConnectionId, frame: &str) {
        let Some(sender) = self.sender_for(id) else {
            return;
        };

        match self.session.authenticate(id, frame) {
            Ok(AuthOutcome::Accepted) => {
                info!(conn = %id, "controller authenticated");
                if let Err(e) = sender.send_text(AUTH_SUCCESS).await {
                    debug!(conn = %id, "could not confirm auth: {e}");
                }
                self.emit(ServerEvent::Status(ConnectionStatus::Authenticated));
            }
            Ok(AuthOutcome::Denied) => {
                warn!(conn = %id, "controller sent a wrong password");
                let _ = sender.send_text(AUTH_FAILED).await;
                sender.close().await;
                self.active = None;
                self.emit(ServerEvent::Status(ConnectionStatus::Disconnected));
            }
            Err(e) => warn!(conn = %id, "auth: {e}"),
        }
    }

    fn on_closed(&mut self, id: ConnectionId) {
        if self.session.release(id) {
            self.active = None;
            info!(conn = %id, "controller disconnected");
            self.emit(ServerEvent::Status(ConnectionStatus::Disconnected));
        } else {
            trace!(conn = %id, "close of released connection");
        }
    }
}

// ── Tasks ────────────────────────────────────────────────────────

async fn accept_loop(
    listener: TcpListener,
    generation: u64,
    cancel: CancellationToken,
    net_tx: mpsc::Sender<NetEvent>,
) {
    loop {
        let accepted = tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        let (stream, peer) = match accepted {
            Ok(pair) => pair,
            Err(e) => {
                warn!("accept error: {e}");
                continue;
            }
        };

        let net_tx = net_tx.clone();
        let handshake_cancel = cancel.clone();
        tokio::spawn(async move {
            let upgrade = tokio::time::timeout(
                HANDSHAKE_TIMEOUT,
                tokio_tungstenite::accept_async(stream),
            );
            let upgraded = tokio::select! {
                _ = handshake_cancel.cancelled() => {
                    debug!(%peer, "listener closed during websocket handshake");
                    return;
                }
                upgraded = upgrade => upgraded,
            };
            match upgraded {
                Ok(Ok(ws)) => {
                    let _ = net_tx
                        .send(NetEvent::Opened {
                            generation,
                            ws: Box::new(ws),
                            peer,
                        })
                        .await;
                }
                Ok(Err(e)) => debug!(%peer, "websocket handshake failed: {e}"),
                Err(_) => debug!(%peer, "websocket handshake timed out"),
            }
        });
    }
}

/// Forward one connection's frames to the actor, then report its close.
async fn pump(id: ConnectionId, mut conn: Connection, net_tx: mpsc::Sender<NetEvent>) {
    while let Some(text) = conn.recv().await {
        if net_tx.send(NetEvent::Frame { id, text }).await.is_err() {
            conn.sender().abort();
            return;
        }
    }
    let _ = net_tx.send(NetEvent::Closed { id }).await;
}

async fn reject(mut ws: WsStream) {
    if let Err(e) = ws.send(Message::text(CONNECTION_REJECTED)).await {
        debug!("could not send rejection: {e}");
        return;
    }
    let _ = ws.close(None).await;
    // Read until the peer acknowledges so the rejection is not lost to a reset.
    let _ = tokio::time::timeout(REJECT_DRAIN, async {
        while let Some(Ok(_)) = ws.next().await {}
    })
    .await;
}

async fn drop_socket(mut ws: WsStream) {
    let _ = ws.close(None).await;
}

// ── Tests ────────────────────────────────────────────────────────
