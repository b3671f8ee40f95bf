//! Wire command definitions.
//!
//! Two kinds of frames travel over a session:
//!
//! - **Handshake literals**: the raw shared secret (client → server) and the
//!   plain-text markers [`AUTH_SUCCESS`], [`AUTH_FAILED`] and
//!   [`CONNECTION_REJECTED`] (server → client). These are never JSON.
//! - **Commands**: JSON objects discriminated by a `cmd` tag, exchanged only
//!   after authentication.
//!
//! Parsing distinguishes an unknown tag (ignored, forward-compatible) from a
//! payload that cannot be read at all (malformed).

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AirPointerError;

// ── Handshake literals ───────────────────────────────────────────

/// Sent by the server when the secret matched.
pub const AUTH_SUCCESS: &str = "AUTH_SUCCESS";

/// Sent by the server when the secret did not match, right before closing.
pub const AUTH_FAILED: &str = "AUTH_FAILED";

/// Sent to a second client while another one holds the session.
pub const CONNECTION_REJECTED: &str = "CONNECTION_REJECTED";

/// Server verdicts a client may receive during the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeReply {
    Success,
    Failed,
    Rejected,
}

impl HandshakeReply {
    /// Classify a server frame. Returns `None` for anything that is not one of
    /// the three literals.
    pub fn from_frame(frame: &str) -> Option<Self> {
        match frame {
            AUTH_SUCCESS => Some(Self::Success),
            AUTH_FAILED => Some(Self::Failed),
            CONNECTION_REJECTED => Some(Self::Rejected),
            _ => None,
        }
    }

    /// The literal sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => AUTH_SUCCESS,
            Self::Failed => AUTH_FAILED,
            Self::Rejected => CONNECTION_REJECTED,
        }
    }
}

// ── CommandTag ───────────────────────────────────────────────────

/// The `cmd` discriminator of every known command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandTag {
    DeviceInfo,
    ControlStatus,
    AirMouseStatus,
    MouseMove,
    MouseLeftClick,
    RecenterMouse,
    KeyboardEnter,
    KeyboardBackspace,
}

impl CommandTag {
    /// Map a wire tag to a known command, if any.
    pub fn from_wire(tag: &str) -> Option<Self> {
        match tag {
            "DEVICE_INFO" => Some(Self::DeviceInfo),
            "CONTROL_STATUS" => Some(Self::ControlStatus),
            "AIRMOUSE_STATUS" => Some(Self::AirMouseStatus),
            "MOUSE_MOVE" => Some(Self::MouseMove),
            "MOUSE_LEFT_CLICK" => Some(Self::MouseLeftClick),
            "RECENTER_MOUSE" => Some(Self::RecenterMouse),
            "KEYBOARD_ENTER" => Some(Self::KeyboardEnter),
            "KEYBOARD_BACKSPACE" => Some(Self::KeyboardBackspace),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeviceInfo => "DEVICE_INFO",
            Self::ControlStatus => "CONTROL_STATUS",
            Self::AirMouseStatus => "AIRMOUSE_STATUS",
            Self::MouseMove => "MOUSE_MOVE",
            Self::MouseLeftClick => "MOUSE_LEFT_CLICK",
            Self::RecenterMouse => "RECENTER_MOUSE",
            Self::KeyboardEnter => "KEYBOARD_ENTER",
            Self::KeyboardBackspace => "KEYBOARD_BACKSPACE",
        }
    }
}

impl fmt::Display for CommandTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Command ──────────────────────────────────────────────────────

/// A post-authentication command.
///
/// `MouseMove.y` follows the sender's convention: the controller negates its
/// screen-down-positive delta before sending, and the receiver negates it
/// back (see [`Command::mouse_move`] and [`Command::screen_delta`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd")]
pub enum Command {
    #[serde(rename = "DEVICE_INFO")]
    DeviceInfo {
        #[serde(rename = "deviceModel")]
        device_model: String,
    },

    #[serde(rename = "CONTROL_STATUS")]
    ControlStatus {
        #[serde(rename = "controlOn")]
        control_on: bool,
    },

    #[serde(rename = "AIRMOUSE_STATUS")]
    AirMouseStatus {
        #[serde(rename = "airMouseOn")]
        air_mouse_on: bool,
    },

    #[serde(rename = "MOUSE_MOVE")]
    MouseMove { x: f64, y: f64 },

    #[serde(rename = "MOUSE_LEFT_CLICK")]
    MouseLeftClick,

    #[serde(rename = "RECENTER_MOUSE")]
    RecenterMouse,

    #[serde(rename = "KEYBOARD_ENTER")]
    KeyboardEnter,

    #[serde(rename = "KEYBOARD_BACKSPACE")]
    KeyboardBackspace,
}

/// Result of parsing a post-auth frame that was at least valid enough to
/// carry a `cmd` tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A command this build understands.
    Known(Command),
    /// A well-formed frame with a tag this build does not know.
    Unknown(String),
}

impl Command {
    /// Build a `MOUSE_MOVE` from a screen-space delta (y grows downwards).
    pub fn mouse_move(screen_dx: f64, screen_dy: f64) -> Self {
        Command::MouseMove {
            x: screen_dx,
            y: -screen_dy,
        }
    }

    /// The screen-space delta carried by a `MOUSE_MOVE`.
    pub fn screen_delta(&self) -> Option<(f64, f64)> {
        match self {
            Command::MouseMove { x, y } => Some((*x, -*y)),
            _ => None,
        }
    }

    pub fn tag(&self) -> CommandTag {
        match self {
            Command::DeviceInfo { .. } => CommandTag::DeviceInfo,
            Command::ControlStatus { .. } => CommandTag::ControlStatus,
            Command::AirMouseStatus { .. } => CommandTag::AirMouseStatus,
            Command::MouseMove { .. } => CommandTag::MouseMove,
            Command::MouseLeftClick => CommandTag::MouseLeftClick,
            Command::RecenterMouse => CommandTag::RecenterMouse,
            Command::KeyboardEnter => CommandTag::KeyboardEnter,
            Command::KeyboardBackspace => CommandTag::KeyboardBackspace,
        }
    }

    /// Serialize to the JSON text frame.
    pub fn to_json(&self) -> Result<String, AirPointerError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a post-auth text frame.
    ///
    /// Frames that are not JSON objects with a string `cmd`, or whose fields do
    /// not match a known tag, are [`AirPointerError::MalformedCommand`].
    pub fn parse(frame: &str) -> Result<Inbound, AirPointerError> {
        let value: Value = serde_json::from_str(frame)
            .map_err(|e| AirPointerError::MalformedCommand(e.to_string()))?;

        let tag = value
            .get("cmd")
            .and_then(Value::as_str)
            .ok_or_else(|| AirPointerError::MalformedCommand("missing cmd tag".into()))?;

        if CommandTag::from_wire(tag).is_none() {
            return Ok(Inbound::Unknown(tag.to_owned()));
        }

        serde_json::from_value(value)
            .map(Inbound::Known)
            .map_err(|e| AirPointerError::MalformedCommand(e.to_string()))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.tag(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_info_uses_camel_case_fields() {
        let json = Command::DeviceInfo {
            device_model: "Pixel 8".into(),
        }
        .to_json()
        .unwrap();
        assert_eq!(json, r#"{"cmd":"DEVICE_INFO","deviceModel":"Pixel 8"}"#);
    }

    #[test]
    fn unit_commands_serialize_tag_only() {
        assert_eq!(
            Command::MouseLeftClick.to_json().unwrap(),
            r#"{"cmd":"MOUSE_LEFT_CLICK"}"#
        );
        assert_eq!(
            Command::RecenterMouse.to_json().unwrap(),
            r#"{"cmd":"RECENTER_MOUSE"}"#
        );
    }

    #[test]
    fn parses_status_commands() {
        let parsed = Command::parse(r#"{"cmd":"AIRMOUSE_STATUS","airMouseOn":true}"#).unwrap();
        assert_eq!(
            parsed,
            Inbound::Known(Command::AirMouseStatus { air_mouse_on: true })
        );

        let parsed = Command::parse(r#"{"cmd":"CONTROL_STATUS","controlOn":false}"#).unwrap();
        assert_eq!(
            parsed,
            Inbound::Known(Command::ControlStatus { control_on: false })
        );
    }

    #[test]
    fn mouse_move_accepts_integers() {
        let parsed = Command::parse(r#"{"cmd":"MOUSE_MOVE","x":10,"y":-5}"#).unwrap();
        let Inbound::Known(cmd) = parsed else {
            panic!("expected a known command");
        };
        assert_eq!(cmd.screen_delta(), Some((10.0, 5.0)));
    }

    #[test]
    fn mouse_move_negates_y_on_send() {
        let cmd = Command::mouse_move(3.0, 4.0);
        assert_eq!(cmd, Command::MouseMove { x: 3.0, y: -4.0 });
        assert_eq!(cmd.screen_delta(), Some((3.0, 4.0)));
    }

    #[test]
    fn unit_command_ignores_extra_fields() {
        let parsed = Command::parse(r#"{"cmd":"MOUSE_LEFT_CLICK","button":"left"}"#).unwrap();
        assert_eq!(parsed, Inbound::Known(Command::MouseLeftClick));
    }

    #[test]
    fn unknown_tag_is_not_an_error() {
        let parsed = Command::parse(r#"{"cmd":"SCROLL","dy":3}"#).unwrap();
        assert_eq!(parsed, Inbound::Unknown("SCROLL".into()));
    }

    #[test]
    fn malformed_frames() {
        assert!(matches!(
            Command::parse("not json"),
            Err(AirPointerError::MalformedCommand(_))
        ));
        assert!(matches!(
            Command::parse(r#"{"x":1}"#),
            Err(AirPointerError::MalformedCommand(_))
        ));
        assert!(matches!(
            Command::parse(r#"{"cmd":"MOUSE_MOVE","x":"far"}"#),
            Err(AirPointerError::MalformedCommand(_))
        ));
    }

    #[test]
    fn handshake_literals() {
        assert_eq!(
            HandshakeReply::from_frame("AUTH_SUCCESS"),
            Some(HandshakeReply::Success)
        );
        assert_eq!(
            HandshakeReply::from_frame("CONNECTION_REJECTED"),
            Some(HandshakeReply::Rejected)
        );
        assert_eq!(HandshakeReply::from_frame("auth_success"), None);
        assert_eq!(HandshakeReply::Failed.as_str(), AUTH_FAILED);
    }

    #[test]
    fn tag_roundtrip() {
        for tag in [
            CommandTag::DeviceInfo,
            CommandTag::ControlStatus,
            CommandTag::AirMouseStatus,
            CommandTag::MouseMove,
            CommandTag::MouseLeftClick,
            CommandTag::RecenterMouse,
            CommandTag::KeyboardEnter,
            CommandTag::KeyboardBackspace,
        ] {
            assert_eq!(CommandTag::from_wire(tag.as_str()), Some(tag));
        }
    }
}
