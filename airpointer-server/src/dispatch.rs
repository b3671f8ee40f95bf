//! Routing of authenticated frames.
//!
//! Status commands update the session and produce a UI event. Pointer and
//! key commands go to the [`Actuator`]. Nothing here ever closes the
//! connection: malformed frames are dropped, unknown tags ignored, and
//! actuation failures logged before the next command is processed.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use airpointer_core::{Actuator, AirPointerError, Command, ConnectionId, Inbound, Key, Session};

use crate::event::ServerEvent;

/// Parse a post-auth frame, logging and dropping anything unusable.
pub fn decode(id: ConnectionId, frame: &str) -> Option<Command> {
    match Command::parse(frame) {
        Ok(Inbound::Known(command)) => Some(command),
        Ok(Inbound::Unknown(tag)) => {
            trace!(conn = %id, %tag, "ignoring unknown command");
            None
        }
        Err(e) => {
            debug!(conn = %id, "dropping frame: {e}");
            None
        }
    }
}

pub struct Dispatcher {
    actuator: Arc<dyn Actuator>,
}

impl Dispatcher {
    pub fn new(actuator: Arc<dyn Actuator>) -> Self {
        Self { actuator }
    }

    /// Route one command from connection `id`.
    ///
    /// Returns the UI event a status command produced, if any.
    pub async fn dispatch(
        &self,
        id: ConnectionId,
        command: Command,
        session: &mut Session,
    ) -> Option<ServerEvent> {
        trace!(conn = %id, %command, "dispatch");

        let event = match &command {
            Command::DeviceInfo { device_model } => Some(ServerEvent::DeviceInfo {
                device_model: device_model.clone(),
            }),
            Command::ControlStatus { control_on } => Some(ServerEvent::ControlStatus {
                enabled: *control_on,
            }),
            Command::AirMouseStatus { air_mouse_on } => Some(ServerEvent::AirMouseStatus {
                enabled: *air_mouse_on,
            }),
            _ => None,
        };

        if event.is_some() {
            if !session.apply_status(id, &command) {
                return None;
            }
            return event;
        }

        if let Err(e) = self.actuate(&command).await {
            warn!(conn = %id, %command, "actuation failed: {e}");
        }
        None
    }

    async fn actuate(&self, command: &Command) -> Result<(), AirPointerError> {
        match command {
            Command::MouseMove { .. } => {
                if let Some((dx, dy)) = command.screen_delta() {
                    self.actuator.move_by(dx, dy).await?;
                }
            }
            Command::MouseLeftClick => self.actuator.left_click().await?,
            Command::RecenterMouse => {
                let area = self.actuator.work_area().await?;
                let (x, y) = area.center();
                self.actuator.set_position(x, y).await?;
            }
            Command::KeyboardEnter => self.actuator.press_key(Key::Enter).await?,
            Command::KeyboardBackspace => self.actuator.press_key(Key::Backspace).await?,
            Command::DeviceInfo { .. }
            | Command::ControlStatus { .. }
            | Command::AirMouseStatus { .. } => {}
        }
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
