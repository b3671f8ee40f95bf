//! # airpointer-core
//!
//! Core library for AirPointer, a handheld controller for the desktop pointer.
//!
//! This crate contains:
//! - **Command**: wire commands and handshake literals (`Command`, `HandshakeReply`)
//! - **Network**: `Connection`, a WebSocket session split into reader/writer tasks
//! - **State**: the per-connection phase machine and the single-slot `Session`
//! - **Signal**: drag, orientation and volume-key conditioning
//! - **Actuator**: the seam between dispatched commands and the OS pointer
//! - **Error**: `AirPointerError`, a `thiserror`-based error hierarchy

pub mod actuator;
pub mod command;
pub mod error;
pub mod network;
pub mod signal;
pub mod state;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use actuator::{Actuator, Key, LogActuator, WorkArea, platform_default};
pub use command::{
    AUTH_FAILED, AUTH_SUCCESS, CONNECTION_REJECTED, Command, CommandTag, HandshakeReply, Inbound,
};
pub use error::AirPointerError;
pub use network::{Connection, ConnectionInfo, ConnectionSender};
pub use signal::{
    ConditionedEvent, Conditioner, ConditionerParams, CursorDelta, DragConditioner,
    OrientationConditioner, VolumeTapListener,
};
pub use state::{
    ActiveConnection, AuthOutcome, ClientSnapshot, ConnectionId, ConnectionPhase, ListenAddress,
    Session,
};

#[cfg(target_os = "windows")]
pub use actuator::SendInputActuator;
