//! WebSocket session to the server, from the controller side.
//!
//! Handles the password handshake and provides a method to send commands.
//! There is no automatic reconnect: once the server closes the session the
//! caller decides whether to dial again.

use std::time::Duration;

use tracing::{debug, info};

use airpointer_core::{
    AirPointerError, Command, Connection, ConnectionInfo, ConnectionSender, HandshakeReply,
};

/// An authenticated session with the server.
#[derive(Debug)]
pub struct ClientEndpoint {
    conn: Connection,
    server: ConnectionInfo,
}

impl ClientEndpoint {
    /// Dial `server`, send the password and wait for the verdict.
    ///
    /// `timeout` bounds the dial and the wait for the reply separately.
    pub async fn connect(
        server: ConnectionInfo,
        password: &str,
        timeout: Duration,
    ) -> Result<Self, AirPointerError> {
        info!("connecting to {}", server.url());
        let mut conn = tokio::time::timeout(timeout, Connection::connect(&server))
            .await
            .map_err(|_| AirPointerError::Timeout(timeout))??;

        // A busy server may answer and close before the password is written,
        // so the reply decides the outcome.
        let sent = conn.send_text(password).await;

        let reply = tokio::time::timeout(timeout, conn.recv())
            .await
            .map_err(|_| AirPointerError::Timeout(timeout))?;
        let Some(reply) = reply else {
            sent?;
            return Err(AirPointerError::Closed);
        };

        match HandshakeReply::from_frame(&reply) {
            Some(HandshakeReply::Success) => {
                info!("authenticated with {server}");
                Ok(Self { conn, server })
            }
            Some(HandshakeReply::Failed) => Err(AirPointerError::AuthFailed),
            Some(HandshakeReply::Rejected) => Err(AirPointerError::ConnectionRejected),
            None => Err(AirPointerError::UnexpectedReply(reply)),
        }
    }

    pub fn server(&self) -> &ConnectionInfo {
        &self.server
    }

    pub async fn send(&self, command: &Command) -> Result<(), AirPointerError> {
        debug!(%command, "send");
        self.conn.send_command(command).await
    }

    /// Send a batch of commands in order.
    pub async fn send_all<'a>(
        &self,
        commands: impl IntoIterator<Item = &'a Command>,
    ) -> Result<(), AirPointerError> {
        for command in commands {
            self.send(command).await?;
        }
        Ok(())
    }

    /// A cloneable handle for sending from other tasks.
    pub fn sender(&self) -> ConnectionSender {
        self.conn.sender()
    }

    /// Resolve once the server ends the session.
    ///
    /// The server sends nothing after the handshake; stray frames are logged
    /// and discarded.
    pub async fn closed(&mut self) {
        while let Some(frame) = self.conn.recv().await {
            debug!("ignoring server frame: {frame}");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.conn.is_closed()
    }

    /// Close the session after flushing queued commands.
    pub async fn close(self) {
        self.conn.close().await;
    }
}
