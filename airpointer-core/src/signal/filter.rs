//! Scalar filters shared by the drag and orientation conditioners.

/// Exponential smoothing: `α·sample + (1-α)·previous`.
///
/// `alpha = 1.0` passes samples through unchanged.
#[inline]
pub fn smooth(alpha: f64, sample: f64, previous: f64) -> f64 {
    alpha * sample + (1.0 - alpha) * previous
}

/// Clamp values whose magnitude is at or below `threshold` to zero.
#[inline]
pub fn dead_zone(value: f64, threshold: f64) -> f64 {
    if value.abs() <= threshold { 0.0 } else { value }
}

/// Per-axis smoothing accumulator.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FilterState {
    pub smoothed_value: f64,
    pub last_timestamp_ms: Option<u64>,
}

impl FilterState {
    /// Fold `sample` into the accumulator and return the new smoothed value.
    pub fn update(&mut self, sample: f64, alpha: f64, timestamp_ms: u64) -> f64 {
        self.smoothed_value = smooth(alpha, sample, self.smoothed_value);
        self.last_timestamp_ms = Some(timestamp_ms);
        self.smoothed_value
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoothing_converges_towards_constant_input() {
        let mut state = FilterState::default();
        let mut last = 0.0;
        for t in 0..50 {
            last = state.update(10.0, 0.2, t);
        }
        assert!((last - 10.0).abs() < 0.01);
        assert_eq!(state.last_timestamp_ms, Some(49));
    }

    #[test]
    fn alpha_one_is_immediate() {
        let mut state = FilterState::default();
        assert_eq!(state.update(7.5, 1.0, 0), 7.5);
        assert_eq!(state.update(-2.0, 1.0, 1), -2.0);
    }

    #[test]
    fn first_smoothed_step_is_a_fraction_of_the_sample() {
        assert!((smooth(0.2, 10.0, 0.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn dead_zone_boundary_is_inclusive() {
        assert_eq!(dead_zone(0.02, 0.02), 0.0);
        assert_eq!(dead_zone(-0.02, 0.02), 0.0);
        let above = 0.02 + 1e-9;
        assert_eq!(dead_zone(above, 0.02), above);
        assert_eq!(dead_zone(-above, 0.02), -above);
    }

    #[test]
    fn reset_clears_history() {
        let mut state = FilterState::default();
        state.update(5.0, 0.5, 100);
        state.reset();
        assert_eq!(state, FilterState::default());
    }
}
