//! What a controller needs to find this server.
//!
//! The payload is the JSON a pairing QR code encodes.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use serde::{Deserialize, Serialize};

use airpointer_core::{AirPointerError, ConnectionInfo};

/// Connection details advertised to controllers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub ip: String,
    pub port: u16,
    pub password: String,
}

impl ServerInfo {
    pub fn new(host: &str, port: u16, password: impl Into<String>) -> Self {
        Self {
            ip: advertised_ip(host),
            port,
            password: password.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, AirPointerError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo::new(self.ip.clone(), self.port)
    }
}

/// The address to advertise for a listener bound to `host`.
///
/// Unspecified hosts resolve to the primary LAN address, falling back to
/// loopback when the machine has no route.
pub fn advertised_ip(host: &str) -> String {
    match host.parse::<IpAddr>() {
        Ok(ip) if ip.is_unspecified() => local_ipv4()
            .unwrap_or(Ipv4Addr::LOCALHOST)
            .to_string(),
        _ => host.to_owned(),
    }
}

/// First non-loopback IPv4 address of this host.
///
/// Connecting a UDP socket sends nothing; it only asks the OS which local
/// address routes towards the target.
pub fn local_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect((Ipv4Addr::new(192, 0, 2, 1), 9)).ok()?;
    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(ip) if !ip.is_loopback() && !ip.is_unspecified() => Some(ip),
        _ => None,
    }
}
