//! Domain-specific error types for AirPointer.
//!
//! All fallible operations return `Result<T, AirPointerError>`.
//! Payload-level problems (malformed JSON, unknown tags) are typed here
//! too, but the session layer absorbs them rather than surfacing them.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for AirPointer.
#[derive(Debug, Error)]
pub enum AirPointerError {
    // ── Protocol Errors ──────────────────────────────────────────
    /// A state transition was attempted from the wrong phase.
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),

    /// The server already has an active client.
    #[error("connection rejected: another client is active")]
    ConnectionRejected,

    /// The shared secret did not match.
    #[error("authentication failed")]
    AuthFailed,

    /// The peer answered the handshake with something unexpected.
    #[error("unexpected handshake reply: {0}")]
    UnexpectedReply(String),

    // ── Payload Errors ───────────────────────────────────────────
    /// A post-auth frame could not be parsed as a command.
    #[error("malformed command: {0}")]
    MalformedCommand(String),

    /// Encoding of an outbound command failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    // ── Connection Errors ────────────────────────────────────────
    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// The WebSocket layer reported an error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The peer closed the connection.
    #[error("connection closed")]
    Closed,

    /// An mpsc channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    // ── Actuation Errors ─────────────────────────────────────────
    /// The pointer or keyboard primitive refused the request.
    #[error("actuation failed: {0}")]
    Actuation(String),

    // ── Configuration Errors ─────────────────────────────────────
    /// A configuration value is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

impl AirPointerError {
    /// Returns `true` for errors that end the connection they occurred on.
    pub fn is_fatal_to_connection(&self) -> bool {
        matches!(
            self,
            Self::AuthFailed
                | Self::ConnectionRejected
                | Self::Closed
                | Self::Connection(_)
                | Self::WebSocket(_)
        )
    }
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for AirPointerError {
    fn from(s: String) -> Self {
        AirPointerError::Other(s)
    }
}

impl From<&str> for AirPointerError {
    fn from(s: &str) -> Self {
        AirPointerError::Other(s.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for AirPointerError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        AirPointerError::ChannelClosed
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for AirPointerError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        AirPointerError::ChannelClosed
    }
}

impl From<serde_json::Error> for AirPointerError {
    fn from(e: serde_json::Error) -> Self {
        AirPointerError::Encoding(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = AirPointerError::ProtocolViolation("cannot authenticate");
        assert!(e.to_string().contains("cannot authenticate"));

        let e = AirPointerError::Timeout(Duration::from_millis(500));
        assert!(e.to_string().contains("500ms"));
    }

    #[test]
    fn from_string() {
        let e: AirPointerError = "something broke".into();
        assert!(matches!(e, AirPointerError::Other(_)));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: AirPointerError = io_err.into();
        assert!(matches!(e, AirPointerError::Connection(_)));
        assert!(e.is_fatal_to_connection());
    }

    #[test]
    fn payload_errors_are_not_fatal() {
        assert!(!AirPointerError::MalformedCommand("x".into()).is_fatal_to_connection());
        assert!(!AirPointerError::Actuation("denied".into()).is_fatal_to_connection());
        assert!(AirPointerError::AuthFailed.is_fatal_to_connection());
    }
}
