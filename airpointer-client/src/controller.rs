//! Maps controller input to wire commands.
//!
//! The controller owns the conditioners and the two toggles. Trackpad input
//! only produces commands while control is on; gyroscope input only while
//! the air mouse is on. Toggling either one resets the matching conditioner
//! and yields the status command to send.

use airpointer_core::Command;
use airpointer_core::signal::{
    AngularRate, ConditionedEvent, Conditioner, ConditionerParams, DragConditioner,
    OrientationConditioner, TapEvent, TapKind, TouchEvent, VolumeDirection,
};

use crate::config::MotionConfig;

/// One input record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlInput {
    Touch(TouchEvent),
    Gyro(AngularRate),
    SetControl(bool),
    SetAirMouse(bool),
    Recenter,
}

#[derive(Debug)]
pub struct Controller {
    drag: DragConditioner,
    gyro: OrientationConditioner,
    trackpad_params: ConditionerParams,
    gyro_params: ConditionerParams,
    control_on: bool,
    air_mouse_on: bool,
}

impl Controller {
    pub fn new(motion: &MotionConfig, control_on: bool, air_mouse_on: bool) -> Self {
        Self {
            drag: DragConditioner::new(motion.tap_thresholds()),
            gyro: OrientationConditioner::default(),
            trackpad_params: motion.trackpad_params(),
            gyro_params: motion.gyro_params(),
            control_on,
            air_mouse_on,
        }
    }

    pub fn control_on(&self) -> bool {
        self.control_on
    }

    pub fn air_mouse_on(&self) -> bool {
        self.air_mouse_on
    }

    /// Change trackpad gain; applies from the next sample.
    pub fn set_trackpad_sensitivity(&mut self, sensitivity: f64) {
        self.trackpad_params = self.trackpad_params.with_sensitivity(sensitivity);
    }

    pub fn set_gyro_sensitivity(&mut self, sensitivity: f64) {
        self.gyro_params = self.gyro_params.with_sensitivity(sensitivity);
    }

    /// What to send right after authentication.
    pub fn announcement(&self, device_model: &str) -> Vec<Command> {
        vec![
            Command::DeviceInfo {
                device_model: device_model.to_owned(),
            },
            Command::ControlStatus {
                control_on: self.control_on,
            },
            Command::AirMouseStatus {
                air_mouse_on: self.air_mouse_on,
            },
        ]
    }

    /// Feed one input; returns the commands to send, in order.
    pub fn handle(&mut self, input: ControlInput) -> Vec<Command> {
        match input {
            ControlInput::Touch(event) => {
                if !self.control_on {
                    return Vec::new();
                }
                let params = self.trackpad_params;
                self.drag
                    .condition_one(event, &params)
                    .and_then(to_command)
                    .into_iter()
                    .collect()
            }
            ControlInput::Gyro(rate) => {
                if !self.air_mouse_on {
                    return Vec::new();
                }
                let params = self.gyro_params;
                self.gyro
                    .condition_one(rate, &params)
                    .and_then(to_command)
                    .into_iter()
                    .collect()
            }
            ControlInput::SetControl(on) => {
                if on == self.control_on {
                    return Vec::new();
                }
                self.control_on = on;
                self.drag.reset();
                vec![Command::ControlStatus { control_on: on }]
            }
            ControlInput::SetAirMouse(on) => {
                if on == self.air_mouse_on {
                    return Vec::new();
                }
                self.air_mouse_on = on;
                self.gyro.reset();
                vec![Command::AirMouseStatus { air_mouse_on: on }]
            }
            ControlInput::Recenter => vec![Command::RecenterMouse],
        }
    }
}

fn to_command(event: ConditionedEvent) -> Option<Command> {
    match event {
        ConditionedEvent::Move(delta) if delta.is_zero() => None,
        ConditionedEvent::Move(delta) => Some(Command::mouse_move(delta.dx, delta.dy)),
        ConditionedEvent::Tap => Some(Command::MouseLeftClick),
        ConditionedEvent::DragEnd => None,
    }
}

/// The command a volume-key tap stands for.
pub fn volume_command(tap: &TapEvent) -> Command {
    match (tap.direction, tap.kind) {
        (VolumeDirection::Up, TapKind::Single) => Command::KeyboardEnter,
        (VolumeDirection::Up, TapKind::Double) => Command::MouseLeftClick,
        (VolumeDirection::Down, _) => Command::KeyboardBackspace,
    }
}

// ── Tests ────────────────────────────────────────────────────────
