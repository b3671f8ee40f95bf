//! # airpointer-server: desktop side of AirPointer
//!
//! Listens for a single handheld controller over WebSocket, authenticates
//! it with a shared password and turns its commands into pointer motion,
//! clicks and key presses.
//!
//! The UI (a window, tray icon or the bundled console) talks to a running
//! server through a [`ServerHandle`] and receives [`ServerEvent`]s.

pub mod config;
pub mod discovery;
pub mod dispatch;
pub mod event;
pub mod service;

pub use config::ServerConfig;
pub use discovery::ServerInfo;
pub use event::{ConnectionStatus, ServerEvent};
pub use service::{ServerHandle, start};
