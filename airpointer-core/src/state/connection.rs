//! Per-connection lifecycle state machine.
//!
//! Provides a `ConnectionPhase` enum that models the lifecycle of one
//! controller socket on the server, with validated transitions that return
//! `Result` instead of panicking.

use std::fmt;

use crate::error::AirPointerError;

// ── ConnectionId ─────────────────────────────────────────────────

/// Identifies one accepted socket for the lifetime of the server process.
///
/// Events carry the id of the connection that produced them so that events
/// from a connection the session has already released can be ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ── ConnectionPhase ──────────────────────────────────────────────

/// The current phase of a controller connection.
///
/// ```text
///  Connecting ──► AwaitingAuth ──► Authenticated
///       │               │                │
///       ▼               ▼                ▼
///       └──────────► Closed ◄────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    /// Socket accepted; the session has not decided on it yet.
    #[default]
    Connecting,

    /// Holds the session slot; waiting for the shared secret.
    AwaitingAuth,

    /// Secret accepted; commands are dispatched.
    Authenticated,

    /// Terminal state.
    Closed,
}

impl fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "Connecting"),
            Self::AwaitingAuth => write!(f, "AwaitingAuth"),
            Self::Authenticated => write!(f, "Authenticated"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

impl ConnectionPhase {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated)
    }

    pub fn is_awaiting_auth(&self) -> bool {
        matches!(self, Self::AwaitingAuth)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// A live phase occupies the session's single slot.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::AwaitingAuth | Self::Authenticated)
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `AwaitingAuth`.
    ///
    /// Valid from: `Connecting`.
    pub fn begin_auth(&mut self) -> Result<(), AirPointerError> {
        match self {
            Self::Connecting => {
                *self = Self::AwaitingAuth;
                Ok(())
            }
            _ => Err(AirPointerError::ProtocolViolation(
                "cannot await auth: not in Connecting state",
            )),
        }
    }

    /// Transition to `Authenticated`.
    ///
    /// Valid from: `AwaitingAuth`.
    pub fn complete_auth(&mut self) -> Result<(), AirPointerError> {
        match self {
            Self::AwaitingAuth => {
                *self = Self::Authenticated;
                Ok(())
            }
            _ => Err(AirPointerError::ProtocolViolation(
                "cannot authenticate: not in AwaitingAuth state",
            )),
        }
    }

    /// Transition to `Closed` from any phase.
    pub fn close(&mut self) {
        *self = Self::Closed;
    }
}

// ── Tests ────────────────────────────────────────────────────────
