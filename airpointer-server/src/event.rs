//! Events the server reports to its UI.

use std::fmt;
use std::net::SocketAddr;

/// Connection status as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Authenticated,
    Disconnected,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authenticated => f.write_str("authenticated"),
            Self::Disconnected => f.write_str("disconnected"),
        }
    }
}

/// Outbound notifications for the UI collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// The listener is (re)bound.
    Listening { addr: SocketAddr },
    Status(ConnectionStatus),
    /// A second controller was turned away.
    ConnectionRejected { peer: SocketAddr },
    DeviceInfo { device_model: String },
    ControlStatus { enabled: bool },
    AirMouseStatus { enabled: bool },
}
