//! # airpointer-client: controller side of AirPointer
//!
//! Conditions trackpad, gyroscope and volume-key input into pointer
//! commands and streams them to an AirPointer server.
//!
//! - [`ClientEndpoint`]: authenticated WebSocket session
//! - [`Controller`]: toggles, gating and conditioning
//! - [`VolumeDriver`]: volume-key taps on the tokio clock
//! - [`replay`]: paced JSON-lines input

pub mod config;
pub mod connection;
pub mod controller;
pub mod replay;
pub mod volume;

pub use config::ClientConfig;
pub use connection::ClientEndpoint;
pub use controller::{ControlInput, Controller, volume_command};
pub use replay::{InputSample, Replayed};
pub use volume::{SimulatedVolume, VolumeControl, VolumeDriver};
