//! # Motion conditioning
//!
//! Turns raw controller input into cursor deltas and discrete events.
//!
//! ```text
//! touch positions ──► DragConditioner ──────┐
//!                                           ├──► ConditionedEvent ──► Command
//! angular rates ────► OrientationConditioner┘
//!
//! volume levels ────► VolumeTapListener ──► TapEvent
//! ```
//!
//! | Module        | Purpose                                              |
//! |---------------|------------------------------------------------------|
//! | `filter`      | Exponential smoothing, dead-zone, per-axis state      |
//! | `drag`        | Trackpad drags and tap classification                |
//! | `orientation` | Gyroscope rates to cursor deltas                     |
//! | `volume`      | Volume-key single/double tap detection               |
//!
//! Every tick takes its tuning through [`ConditionerParams`] so that a
//! sensitivity change applies to the very next sample.

pub mod drag;
pub mod filter;
pub mod orientation;
pub mod volume;

pub use drag::{DragConditioner, GestureOutcome, Point, TapThresholds, TouchEvent};
pub use filter::{FilterState, dead_zone, smooth};
pub use orientation::{AngularRate, Axis, AxisMapping, OrientationConditioner};
pub use volume::{TapEvent, TapKind, VolumeDirection, VolumeTapListener};

/// Default exponential smoothing factor.
pub const DEFAULT_SMOOTHING: f64 = 0.2;

/// Default orientation dead-zone.
pub const DEFAULT_DEAD_ZONE: f64 = 0.02;

// ── ConditionerParams ────────────────────────────────────────────

/// Tuning applied on every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConditionerParams {
    /// Output gain.
    pub sensitivity: f64,
    /// Smoothing factor α in `(0, 1]`; `1.0` disables smoothing.
    pub smoothing: f64,
    /// Magnitude at or below which a smoothed orientation value is zeroed.
    pub dead_zone: f64,
}

impl Default for ConditionerParams {
    fn default() -> Self {
        Self {
            sensitivity: 1.0,
            smoothing: DEFAULT_SMOOTHING,
            dead_zone: DEFAULT_DEAD_ZONE,
        }
    }
}

impl ConditionerParams {
    pub fn with_sensitivity(mut self, sensitivity: f64) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    /// Clamped into `(0, 1]`.
    pub fn with_smoothing(mut self, smoothing: f64) -> Self {
        self.smoothing = smoothing.clamp(f64::EPSILON, 1.0);
        self
    }

    pub fn with_dead_zone(mut self, dead_zone: f64) -> Self {
        self.dead_zone = dead_zone.max(0.0);
        self
    }
}

// ── Outputs ──────────────────────────────────────────────────────

/// Screen-space cursor delta (x right, y down).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CursorDelta {
    pub dx: f64,
    pub dy: f64,
}

impl CursorDelta {
    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    pub fn is_zero(&self) -> bool {
        self.dx == 0.0 && self.dy == 0.0
    }
}

/// One record of conditioner output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConditionedEvent {
    Move(CursorDelta),
    Tap,
    DragEnd,
}

// ── Conditioner ──────────────────────────────────────────────────

/// A stateful sample-to-event stage.
pub trait Conditioner {
    type Sample;

    /// Feed one sample; returns at most one output record.
    fn condition_one(
        &mut self,
        sample: Self::Sample,
        params: &ConditionerParams,
    ) -> Option<ConditionedEvent>;

    /// Forget all filter history.
    fn reset(&mut self);

    /// Lazily condition a sequence of samples.
    fn condition<I>(
        &mut self,
        samples: I,
        params: ConditionerParams,
    ) -> Conditioned<'_, Self, I::IntoIter>
    where
        Self: Sized,
        I: IntoIterator<Item = Self::Sample>,
    {
        Conditioned {
            conditioner: self,
            samples: samples.into_iter(),
            params,
        }
    }
}

/// Iterator returned by [`Conditioner::condition`].
pub struct Conditioned<'a, C, I> {
    conditioner: &'a mut C,
    samples: I,
    params: ConditionerParams,
}

impl<C, I> Iterator for Conditioned<'_, C, I>
where
    C: Conditioner,
    I: Iterator<Item = C::Sample>,
{
    type Item = ConditionedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        for sample in self.samples.by_ref() {
            if let Some(event) = self.conditioner.condition_one(sample, &self.params) {
                return Some(event);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params() {
        let p = ConditionerParams::default();
        assert_eq!(p.smoothing, 0.2);
        assert_eq!(p.dead_zone, 0.02);
        assert_eq!(p.sensitivity, 1.0);
    }

    #[test]
    fn smoothing_is_clamped() {
        assert_eq!(ConditionerParams::default().with_smoothing(3.0).smoothing, 1.0);
        assert!(ConditionerParams::default().with_smoothing(0.0).smoothing > 0.0);
    }
}
