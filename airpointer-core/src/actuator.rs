//! Pointer and keyboard actuation.
//!
//! The server never touches the OS directly; every dispatched command goes
//! through an [`Actuator`]. Two implementations ship:
//!
//! - `SendInputActuator` (Windows): `SetCursorPos`/`SendInput` against the
//!   interactive desktop.
//! - [`LogActuator`]: tracks a virtual cursor and logs every call. Used on
//!   other platforms and for dry runs.
//!
//! # Platform
//!
//! `SendInputActuator` requires the process to run in the same desktop
//! session as the user it controls.

use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::info;

use crate::error::AirPointerError;

/// Keys the controller can press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Backspace,
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Enter => f.write_str("Enter"),
            Key::Backspace => f.write_str("Backspace"),
        }
    }
}

/// Usable area of the primary display, in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkArea {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl WorkArea {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            left: 0,
            top: 0,
            width,
            height,
        }
    }

    /// Integer center of the area.
    pub fn center(&self) -> (i32, i32) {
        (self.left + self.width / 2, self.top + self.height / 2)
    }
}

/// The OS-facing side of the server.
#[async_trait]
pub trait Actuator: Send + Sync {
    /// Move the cursor relative to its current position.
    async fn move_by(&self, dx: f64, dy: f64) -> Result<(), AirPointerError>;

    async fn left_click(&self) -> Result<(), AirPointerError>;

    /// Move the cursor to an absolute position.
    async fn set_position(&self, x: i32, y: i32) -> Result<(), AirPointerError>;

    /// Primary display work area, read fresh on every call.
    async fn work_area(&self) -> Result<WorkArea, AirPointerError>;

    async fn press_key(&self, key: Key) -> Result<(), AirPointerError>;
}

/// The actuator for the current platform.
#[cfg(target_os = "windows")]
pub fn platform_default() -> Arc<dyn Actuator> {
    Arc::new(SendInputActuator::new())
}

/// The actuator for the current platform.
#[cfg(not(target_os = "windows"))]
pub fn platform_default() -> Arc<dyn Actuator> {
    Arc::new(LogActuator::default())
}

// ── LogActuator ──────────────────────────────────────────────────

/// Logs every call and keeps a virtual cursor inside a fixed work area.
#[derive(Debug)]
pub struct LogActuator {
    area: WorkArea,
    cursor: Mutex<(f64, f64)>,
}

impl LogActuator {
    pub fn new(area: WorkArea) -> Self {
        let (x, y) = area.center();
        Self {
            area,
            cursor: Mutex::new((x as f64, y as f64)),
        }
    }

    /// Current virtual cursor position.
    pub fn position(&self) -> (f64, f64) {
        match self.cursor.lock() {
            Ok(cursor) => *cursor,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn clamp(&self, x: f64, y: f64) -> (f64, f64) {
        let max_x = (self.area.left + self.area.width - 1) as f64;
        let max_y = (self.area.top + self.area.height - 1) as f64;
        (
            x.clamp(self.area.left as f64, max_x),
            y.clamp(self.area.top as f64, max_y),
        )
    }

    fn place(&self, x: f64, y: f64) -> Result<(f64, f64), AirPointerError> {
        let mut cursor = self
            .cursor
            .lock()
            .map_err(|_| AirPointerError::Actuation("virtual cursor poisoned".into()))?;
        *cursor = self.clamp(x, y);
        Ok(*cursor)
    }
}

impl Default for LogActuator {
    fn default() -> Self {
        Self::new(WorkArea::new(1920, 1080))
    }
}

#[async_trait]
impl Actuator for LogActuator {
    async fn move_by(&self, dx: f64, dy: f64) -> Result<(), AirPointerError> {
        let (x, y) = self.position();
        let (x, y) = self.place(x + dx, y + dy)?;
        info!(dx, dy, x, y, "move cursor");
        Ok(())
    }

    async fn left_click(&self) -> Result<(), AirPointerError> {
        let (x, y) = self.position();
        info!(x, y, "left click");
        Ok(())
    }

    async fn set_position(&self, x: i32, y: i32) -> Result<(), AirPointerError> {
        let (x, y) = self.place(x as f64, y as f64)?;
        info!(x, y, "set cursor position");
        Ok(())
    }

    async fn work_area(&self) -> Result<WorkArea, AirPointerError> {
        Ok(self.area)
    }

    async fn press_key(&self, key: Key) -> Result<(), AirPointerError> {
        info!(%key, "key press");
        Ok(())
    }
}

// ── Windows implementation ───────────────────────────────────────

#[cfg(target_os = "windows")]
pub use platform::SendInputActuator;

#[cfg(target_os = "windows")]
mod platform {
    use super::*;
    use windows::Win32::Foundation::{POINT, RECT};
    use windows::Win32::UI::Input::KeyboardAndMouse::*;
    use windows::Win32::UI::WindowsAndMessaging::{
        GetCursorPos, SPI_GETWORKAREA, SYSTEM_PARAMETERS_INFO_UPDATE_FLAGS, SetCursorPos,
        SystemParametersInfoW,
    };

    fn win_err(call: &str, e: windows::core::Error) -> AirPointerError {
        AirPointerError::Actuation(format!("{call}: {e}"))
    }

    /// Injects pointer and key events into the interactive desktop.
    #[derive(Debug, Default)]
    pub struct SendInputActuator {
        // Sub-pixel remainder carried between relative moves
        residual: Mutex<(f64, f64)>,
    }

    impl SendInputActuator {
        pub fn new() -> Self {
            Self::default()
        }

        fn send(&self, inputs: &[INPUT], what: &str) -> Result<(), AirPointerError> {
            let sent = unsafe { SendInput(inputs, std::mem::size_of::<INPUT>() as i32) };
            if sent as usize != inputs.len() {
                return Err(AirPointerError::Actuation(format!(
                    "SendInput ({what}) injected {sent} of {} events",
                    inputs.len()
                )));
            }
            Ok(())
        }

        fn mouse(flags: MOUSE_EVENT_FLAGS) -> INPUT {
            INPUT {
                r#type: INPUT_MOUSE,
                Anonymous: INPUT_0 {
                    mi: MOUSEINPUT {
                        dx: 0,
                        dy: 0,
                        mouseData: 0,
                        dwFlags: flags,
                        time: 0,
                        dwExtraInfo: 0,
                    },
                },
            }
        }

        fn key(vk: VIRTUAL_KEY, flags: KEYBD_EVENT_FLAGS) -> INPUT {
            INPUT {
                r#type: INPUT_KEYBOARD,
                Anonymous: INPUT_0 {
                    ki: KEYBDINPUT {
                        wVk: vk,
                        wScan: 0,
                        dwFlags: flags,
                        time: 0,
                        dwExtraInfo: 0,
                    },
                },
            }
        }
    }

    #[async_trait]
    impl Actuator for SendInputActuator {
        async fn move_by(&self, dx: f64, dy: f64) -> Result<(), AirPointerError> {
            let (step_x, step_y) = {
                let mut residual = self
                    .residual
                    .lock()
                    .map_err(|_| AirPointerError::Actuation("residual poisoned".into()))?;
                let (want_x, want_y) = (residual.0 + dx, residual.1 + dy);
                let (step_x, step_y) = (want_x.round(), want_y.round());
                *residual = (want_x - step_x, want_y - step_y);
                (step_x as i32, step_y as i32)
            };

            if step_x == 0 && step_y == 0 {
                return Ok(());
            }

            let mut point = POINT::default();
            unsafe { GetCursorPos(&mut point) }.map_err(|e| win_err("GetCursorPos", e))?;
            unsafe { SetCursorPos(point.x + step_x, point.y + step_y) }
                .map_err(|e| win_err("SetCursorPos", e))
        }

        async fn left_click(&self) -> Result<(), AirPointerError> {
            self.send(
                &[
                    Self::mouse(MOUSEEVENTF_LEFTDOWN),
                    Self::mouse(MOUSEEVENTF_LEFTUP),
                ],
                "click",
            )
        }

        async fn set_position(&self, x: i32, y: i32) -> Result<(), AirPointerError> {
            if let Ok(mut residual) = self.residual.lock() {
                *residual = (0.0, 0.0);
            }
            unsafe { SetCursorPos(x, y) }.map_err(|e| win_err("SetCursorPos", e))
        }

        async fn work_area(&self) -> Result<WorkArea, AirPointerError> {
            let mut rect = RECT::default();
            unsafe {
                SystemParametersInfoW(
                    SPI_GETWORKAREA,
                    0,
                    Some(&mut rect as *mut RECT as *mut _),
                    SYSTEM_PARAMETERS_INFO_UPDATE_FLAGS(0),
                )
            }
            .map_err(|e| win_err("SystemParametersInfoW", e))?;

            Ok(WorkArea {
                left: rect.left,
                top: rect.top,
                width: rect.right - rect.left,
                height: rect.bottom - rect.top,
            })
        }

        async fn press_key(&self, key: Key) -> Result<(), AirPointerError> {
            let vk = match key {
                Key::Enter => VK_RETURN,
                Key::Backspace => VK_BACK,
            };
            self.send(
                &[
                    Self::key(vk, KEYBD_EVENT_FLAGS(0)),
                    Self::key(vk, KEYEVENTF_KEYUP),
                ],
                "keyboard",
            )
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_area_center_uses_integer_division() {
        assert_eq!(WorkArea::new(1920, 1080).center(), (960, 540));
        assert_eq!(WorkArea::new(1366, 767).center(), (683, 383));
        let offset = WorkArea {
            left: 100,
            top: 40,
            width: 800,
            height: 600,
        };
        assert_eq!(offset.center(), (500, 340));
    }

    #[tokio::test]
    async fn log_actuator_tracks_virtual_cursor() {
        let act = LogActuator::new(WorkArea::new(800, 600));
        assert_eq!(act.position(), (400.0, 300.0));

        act.move_by(10.0, -5.0).await.unwrap();
        assert_eq!(act.position(), (410.0, 295.0));

        act.set_position(0, 0).await.unwrap();
        act.move_by(-50.0, -50.0).await.unwrap();
        assert_eq!(act.position(), (0.0, 0.0));

        act.move_by(5_000.0, 5_000.0).await.unwrap();
        assert_eq!(act.position(), (799.0, 599.0));
    }

    #[tokio::test]
    async fn log_actuator_accepts_clicks_and_keys() {
        let act = LogActuator::default();
        act.left_click().await.unwrap();
        act.press_key(Key::Enter).await.unwrap();
        assert_eq!(act.work_area().await.unwrap(), WorkArea::new(1920, 1080));
    }
}
