//! Recorded controller input, one JSON object per line.
//!
//! ```text
//! {"type":"control","t":0,"on":true}
//! {"type":"touch_start","t":10,"x":100,"y":200}
//! {"type":"touch_move","t":26,"x":104,"y":203}
//! {"type":"touch_end","t":40,"x":104,"y":203}
//! {"type":"gyro","t":60,"x":0.4,"y":0.0,"z":0.0}
//! {"type":"volume","t":80,"level":0.56}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. `t` is in
//! milliseconds and drives both pacing and the conditioners' time base.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

use airpointer_core::AirPointerError;
use airpointer_core::signal::{AngularRate, Point, TouchEvent};

use crate::controller::ControlInput;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputSample {
    TouchStart { t: u64, x: f64, y: f64 },
    TouchMove { t: u64, x: f64, y: f64 },
    TouchEnd { t: u64, x: f64, y: f64 },
    TouchCancel { t: u64 },
    Gyro { t: u64, x: f64, y: f64, z: f64 },
    Volume { t: u64, level: f64 },
    Control { t: u64, on: bool },
    AirMouse { t: u64, on: bool },
    Recenter { t: u64 },
}

/// Where a sample goes once it is due.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Replayed {
    Input(ControlInput),
    /// A level reported by the device volume control.
    Volume(f64),
}

impl InputSample {
    pub fn timestamp_ms(&self) -> u64 {
        match *self {
            Self::TouchStart { t, .. }
            | Self::TouchMove { t, .. }
            | Self::TouchEnd { t, .. }
            | Self::TouchCancel { t }
            | Self::Gyro { t, .. }
            | Self::Volume { t, .. }
            | Self::Control { t, .. }
            | Self::AirMouse { t, .. }
            | Self::Recenter { t } => t,
        }
    }

    pub fn replayed(self) -> Replayed {
        let input = match self {
            Self::TouchStart { t, x, y } => ControlInput::Touch(TouchEvent::Start {
                position: Point::new(x, y),
                timestamp_ms: t,
            }),
            Self::TouchMove { t, x, y } => ControlInput::Touch(TouchEvent::Move {
                position: Point::new(x, y),
                timestamp_ms: t,
            }),
            Self::TouchEnd { t, x, y } => ControlInput::Touch(TouchEvent::End {
                position: Point::new(x, y),
                timestamp_ms: t,
            }),
            Self::TouchCancel { .. } => ControlInput::Touch(TouchEvent::Cancel),
            Self::Gyro { t, x, y, z } => ControlInput::Gyro(AngularRate::new(x, y, z, t)),
            Self::Volume { level, .. } => return Replayed::Volume(level),
            Self::Control { on, .. } => ControlInput::SetControl(on),
            Self::AirMouse { on, .. } => ControlInput::SetAirMouse(on),
            Self::Recenter { .. } => ControlInput::Recenter,
        };
        Replayed::Input(input)
    }
}

/// Parse one line. Returns `None` for blanks, comments and malformed lines.
pub fn parse_line(line: &str) -> Option<InputSample> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(sample) => Some(sample),
        Err(e) => {
            warn!("skipping malformed input line {line:?}: {e}");
            None
        }
    }
}

/// Read samples from `reader` and forward each one when it is due.
///
/// The first sample is sent immediately; later ones keep their spacing
/// relative to it. Returns the number of samples sent. Stops early if the
/// receiver goes away.
pub async fn pace<R>(reader: R, tx: mpsc::Sender<InputSample>) -> Result<usize, AirPointerError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut origin: Option<(Instant, u64)> = None;
    let mut sent = 0;

    while let Some(line) = lines.next_line().await? {
        let Some(sample) = parse_line(&line) else {
            continue;
        };
        let t = sample.timestamp_ms();
        let (start, t0) = *origin.get_or_insert((Instant::now(), t));
        let due = start + Duration::from_millis(t.saturating_sub(t0));
        tokio::time::sleep_until(due).await;

        if tx.send(sample).await.is_err() {
            debug!("input receiver closed after {sent} samples");
            break;
        }
        sent += 1;
    }

    Ok(sent)
}

// ── Tests ────────────────────────────────────────────────────────
