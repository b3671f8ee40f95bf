//! Gyroscope conditioning.
//!
//! Each tick takes one angular-rate sample and yields one cursor delta:
//!
//! ```text
//! dt        = (t - t_prev) / 1000
//! adj_h     = h - v·coupling          adj_v = v - h·coupling
//! smoothed  = α·adj + (1-α)·smoothed_prev
//! delta     = dead_zone(smoothed) · -sensitivity · dt · 100
//! ```
//!
//! The first sample after a reset only establishes the time base.

use crate::signal::filter::{FilterState, dead_zone};
use crate::signal::{Conditioner, ConditionedEvent, ConditionerParams, CursorDelta};

/// Fraction of the other axis subtracted from each axis.
pub const CROSS_AXIS_COUPLING: f64 = 0.1;

/// Scale from rad/s·s to screen units.
const OUTPUT_SCALE: f64 = 100.0;

/// One of the sensor's three axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// A timestamped angular-rate reading.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AngularRate {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub timestamp_ms: u64,
}

impl AngularRate {
    pub fn new(x: f64, y: f64, z: f64, timestamp_ms: u64) -> Self {
        Self {
            x,
            y,
            z,
            timestamp_ms,
        }
    }

    pub fn axis(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }
}

/// Which sensor axes drive horizontal and vertical motion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisMapping {
    pub horizontal: Axis,
    pub vertical: Axis,
    pub coupling: f64,
}

impl Default for AxisMapping {
    fn default() -> Self {
        Self {
            horizontal: Axis::X,
            vertical: Axis::Y,
            coupling: CROSS_AXIS_COUPLING,
        }
    }
}

#[derive(Debug, Default)]
pub struct OrientationConditioner {
    mapping: AxisMapping,
    horizontal: FilterState,
    vertical: FilterState,
    last_timestamp_ms: Option<u64>,
}

impl OrientationConditioner {
    pub fn new(mapping: AxisMapping) -> Self {
        Self {
            mapping,
            ..Self::default()
        }
    }

    /// Condition one sample.
    ///
    /// Returns `None` for the first sample after construction or reset.
    pub fn update(
        &mut self,
        sample: &AngularRate,
        params: &ConditionerParams,
    ) -> Option<CursorDelta> {
        let previous = self.last_timestamp_ms.replace(sample.timestamp_ms)?;
        let dt = sample.timestamp_ms.saturating_sub(previous) as f64 / 1000.0;

        let h = sample.axis(self.mapping.horizontal);
        let v = sample.axis(self.mapping.vertical);
        let adj_h = h - v * self.mapping.coupling;
        let adj_v = v - h * self.mapping.coupling;

        let smooth_h = self
            .horizontal
            .update(adj_h, params.smoothing, sample.timestamp_ms);
        let smooth_v = self
            .vertical
            .update(adj_v, params.smoothing, sample.timestamp_ms);

        let gain = -params.sensitivity * dt * OUTPUT_SCALE;
        Some(CursorDelta::new(
            dead_zone(smooth_h, params.dead_zone) * gain,
            dead_zone(smooth_v, params.dead_zone) * gain,
        ))
    }

    /// Drop smoothing history and the time base. Called when the air mouse
    /// is switched on again.
    pub fn reset(&mut self) {
        self.horizontal.reset();
        self.vertical.reset();
        self.last_timestamp_ms = None;
    }
}

impl Conditioner for OrientationConditioner {
    type Sample = AngularRate;

    fn condition_one(
        &mut self,
        sample: AngularRate,
        params: &ConditionerParams,
    ) -> Option<ConditionedEvent> {
        self.update(&sample, params).map(ConditionedEvent::Move)
    }

    fn reset(&mut self) {
        OrientationConditioner::reset(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn immediate(sensitivity: f64) -> ConditionerParams {
        ConditionerParams::default()
            .with_smoothing(1.0)
            .with_sensitivity(sensitivity)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn first_sample_only_sets_time_base() {
        let mut gyro = OrientationConditioner::default();
        let params = immediate(20.0);
        assert!(gyro.update(&AngularRate::new(1.0, 1.0, 0.0, 0), &params).is_none());
        assert!(gyro.update(&AngularRate::new(1.0, 1.0, 0.0, 20), &params).is_some());
    }

    #[test]
    fn delta_formula_with_cross_axis_correction() {
        let mut gyro = OrientationConditioner::default();
        let params = immediate(20.0);
        gyro.update(&AngularRate::new(0.0, 0.0, 0.0, 1_000), &params);
        let d = gyro
            .update(&AngularRate::new(0.5, 0.0, 0.0, 1_020), &params)
            .unwrap();
        // adj_h = 0.5, adj_v = -0.05; gain = -20 · 0.02 · 100 = -40
        assert!(close(d.dx, -20.0), "dx = {}", d.dx);
        assert!(close(d.dy, 2.0), "dy = {}", d.dy);
    }

    #[test]
    fn dead_zone_suppresses_small_rates() {
        let mut gyro = OrientationConditioner::default();
        let params = immediate(20.0);
        gyro.update(&AngularRate::new(0.0, 0.0, 0.0, 0), &params);
        let d = gyro
            .update(&AngularRate::new(0.02, 0.0, 0.0, 16), &params)
            .unwrap();
        assert_eq!(d.dx, 0.0);
        assert_eq!(d.dy, 0.0);
    }

    #[test]
    fn smoothing_ramps_up() {
        let mut gyro = OrientationConditioner::default();
        let params = ConditionerParams::default().with_sensitivity(1.0);
        gyro.update(&AngularRate::new(0.0, 0.0, 0.0, 0), &params);
        let first = gyro
            .update(&AngularRate::new(0.0, 1.0, 0.0, 10), &params)
            .unwrap();
        let second = gyro
            .update(&AngularRate::new(0.0, 1.0, 0.0, 20), &params)
            .unwrap();
        // same dt, larger smoothed value
        assert!(second.dy.abs() > first.dy.abs());
        assert!(first.dy < 0.0);
    }

    #[test]
    fn backwards_timestamp_yields_zero_motion() {
        let mut gyro = OrientationConditioner::default();
        let params = immediate(20.0);
        gyro.update(&AngularRate::new(0.0, 0.0, 0.0, 500), &params);
        let d = gyro
            .update(&AngularRate::new(3.0, 3.0, 0.0, 400), &params)
            .unwrap();
        assert!(d.is_zero());
    }

    #[test]
    fn custom_mapping_reads_other_axes() {
        let mapping = AxisMapping {
            horizontal: Axis::Z,
            vertical: Axis::X,
            coupling: 0.0,
        };
        let mut gyro = OrientationConditioner::new(mapping);
        let params = immediate(1.0);
        gyro.update(&AngularRate::default(), &params);
        let d = gyro
            .update(&AngularRate::new(0.0, 9.0, 1.0, 1_000), &params)
            .unwrap();
        assert!(close(d.dx, -100.0));
        assert_eq!(d.dy, 0.0);
    }

    #[test]
    fn reset_restarts_time_base() {
        let mut gyro = OrientationConditioner::default();
        let params = immediate(20.0);
        gyro.update(&AngularRate::new(1.0, 0.0, 0.0, 0), &params);
        gyro.update(&AngularRate::new(1.0, 0.0, 0.0, 10), &params);
        gyro.reset();
        assert!(gyro.update(&AngularRate::new(1.0, 0.0, 0.0, 20), &params).is_none());
    }

    #[test]
    fn lazy_conditioning_emits_one_move_per_tick() {
        let mut gyro = OrientationConditioner::default();
        let samples = (0..5).map(|i| AngularRate::new(0.3, -0.2, 0.0, i * 16));
        let out: Vec<_> = gyro.condition(samples, immediate(20.0)).collect();
        assert_eq!(out.len(), 4);
        assert!(out.iter().all(|e| matches!(e, ConditionedEvent::Move(_))));
    }
}
