//! Server-side session: the single controller slot and its auth state.
//!
//! A `Session` is plain data plus transitions; it performs no I/O. The
//! server owns exactly one and mutates it from a single task, so claiming
//! and releasing the slot never interleave.

use std::fmt;
use std::net::SocketAddr;

use crate::command::Command;
use crate::error::AirPointerError;
use crate::state::connection::{ConnectionId, ConnectionPhase};

// ── ListenAddress ────────────────────────────────────────────────

/// Host and port the server listens on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenAddress {
    pub host: String,
    pub port: u16,
}

impl ListenAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ListenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// ── ActiveConnection ─────────────────────────────────────────────

/// The connection currently holding the session slot.
#[derive(Debug, Clone)]
pub struct ActiveConnection {
    pub id: ConnectionId,
    pub peer: Option<SocketAddr>,
    pub phase: ConnectionPhase,
    /// Set by `DEVICE_INFO` after authentication.
    pub device_model: Option<String>,
    pub control_enabled: bool,
    pub air_mouse_enabled: bool,
}

impl ActiveConnection {
    fn new(id: ConnectionId, peer: Option<SocketAddr>) -> Self {
        Self {
            id,
            peer,
            phase: ConnectionPhase::Connecting,
            device_model: None,
            control_enabled: false,
            air_mouse_enabled: false,
        }
    }
}

/// Read-only view of the active client, for the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSnapshot {
    pub id: ConnectionId,
    pub peer: Option<SocketAddr>,
    pub authenticated: bool,
    pub device_model: Option<String>,
    pub control_enabled: bool,
    pub air_mouse_enabled: bool,
}

/// Verdict on the first frame of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Secret matched; the connection is now `Authenticated`.
    Accepted,
    /// Secret did not match; the connection is `Closed` and the slot is free.
    Denied,
}

// ── Session ──────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Session {
    listen: ListenAddress,
    secret: String,
    active: Option<ActiveConnection>,
}

impl Session {
    pub fn new(listen: ListenAddress, secret: impl Into<String>) -> Self {
        Self {
            listen,
            secret: secret.into(),
            active: None,
        }
    }

    pub fn listen_address(&self) -> &ListenAddress {
        &self.listen
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    // ── Slot ─────────────────────────────────────────────────────

    /// Claim the slot for a freshly accepted connection.
    ///
    /// Fails with [`AirPointerError::ConnectionRejected`] while another
    /// connection is awaiting auth or authenticated.
    pub fn claim(
        &mut self,
        id: ConnectionId,
        peer: Option<SocketAddr>,
    ) -> Result<(), AirPointerError> {
        if self.active.as_ref().is_some_and(|a| a.phase.is_live()) {
            return Err(AirPointerError::ConnectionRejected);
        }

        let mut conn = ActiveConnection::new(id, peer);
        conn.phase.begin_auth()?;
        self.active = Some(conn);
        Ok(())
    }

    /// Release the slot if `id` holds it. Returns `true` when it did.
    pub fn release(&mut self, id: ConnectionId) -> bool {
        if self.is_current(id) {
            if let Some(mut conn) = self.active.take() {
                conn.phase.close();
            }
            true
        } else {
            false
        }
    }

    /// Release the slot whoever holds it.
    pub fn evict(&mut self) -> Option<ConnectionId> {
        self.active.take().map(|mut conn| {
            conn.phase.close();
            conn.id
        })
    }

    /// Whether `id` currently holds the slot.
    pub fn is_current(&self, id: ConnectionId) -> bool {
        self.active.as_ref().is_some_and(|a| a.id == id)
    }

    pub fn active(&self) -> Option<&ActiveConnection> {
        self.active.as_ref()
    }

    pub fn active_id(&self) -> Option<ConnectionId> {
        self.active.as_ref().map(|a| a.id)
    }

    /// `true` when the slot holder has authenticated.
    pub fn is_authenticated(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| a.phase.is_authenticated())
    }

    pub fn phase_of(&self, id: ConnectionId) -> Option<&ConnectionPhase> {
        self.active
            .as_ref()
            .filter(|a| a.id == id)
            .map(|a| &a.phase)
    }

    // ── Auth ─────────────────────────────────────────────────────

    /// Check the first frame of `id` against the shared secret.
    ///
    /// Exactly one attempt is allowed: on mismatch the connection is closed
    /// and the slot released, so a later correct secret on the same socket
    /// is never looked at.
    pub fn authenticate(
        &mut self,
        id: ConnectionId,
        frame: &str,
    ) -> Result<AuthOutcome, AirPointerError> {
        let conn = match self.active.as_mut() {
            Some(conn) if conn.id == id => conn,
            _ => {
                return Err(AirPointerError::ProtocolViolation(
                    "cannot authenticate: connection does not hold the session",
                ));
            }
        };

        if !conn.phase.is_awaiting_auth() {
            return Err(AirPointerError::ProtocolViolation(
                "cannot authenticate: not in AwaitingAuth state",
            ));
        }

        if frame.as_bytes() == self.secret.as_bytes() {
            conn.phase.complete_auth()?;
            Ok(AuthOutcome::Accepted)
        } else {
            self.release(id);
            Ok(AuthOutcome::Denied)
        }
    }

    // ── Observable client state ──────────────────────────────────

    /// Record a status command from the authenticated client.
    ///
    /// Returns `true` if `command` was a status command and was applied.
    pub fn apply_status(&mut self, id: ConnectionId, command: &Command) -> bool {
        let Some(conn) = self
            .active
            .as_mut()
            .filter(|a| a.id == id && a.phase.is_authenticated())
        else {
            return false;
        };

        match command {
            Command::DeviceInfo { device_model } => {
                conn.device_model = Some(device_model.clone());
                true
            }
            Command::ControlStatus { control_on } => {
                conn.control_enabled = *control_on;
                true
            }
            Command::AirMouseStatus { air_mouse_on } => {
                conn.air_mouse_enabled = *air_mouse_on;
                true
            }
            _ => false,
        }
    }

    pub fn snapshot(&self) -> Option<ClientSnapshot> {
        self.active.as_ref().map(|a| ClientSnapshot {
            id: a.id,
            peer: a.peer,
            authenticated: a.phase.is_authenticated(),
            device_model: a.device_model.clone(),
            control_enabled: a.control_enabled,
            air_mouse_enabled: a.air_mouse_enabled,
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────
