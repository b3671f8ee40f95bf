//! Volume-key tap detection.
//!
//! The controller's volume rocker doubles as a pair of buttons. Each observed
//! level change is classified by its sign against a stored baseline, and
//! presses in the same direction are folded into single or double taps:
//!
//! - a second press within the window fires `Double` at once and cancels
//!   the pending single;
//! - otherwise `Single` fires when the window elapses.
//!
//! Up and down keep independent timers. The listener performs no I/O and
//! owns no clock; the caller feeds it timestamps, calls [`poll`] at
//! [`next_deadline`], and writes [`baseline`] back to the device after every
//! change so that the level never drifts.
//!
//! [`poll`]: VolumeTapListener::poll
//! [`next_deadline`]: VolumeTapListener::next_deadline
//! [`baseline`]: VolumeTapListener::baseline

/// Default double-tap window.
pub const DOUBLE_TAP_WINDOW_MS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VolumeDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapKind {
    Single,
    Double,
}

/// A classified press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapEvent {
    pub direction: VolumeDirection,
    pub kind: TapKind,
    /// When the tap fired.
    pub timestamp_ms: u64,
}

#[derive(Debug, Default, Clone, Copy)]
struct PendingTap {
    since_ms: Option<u64>,
}

impl PendingTap {
    fn deadline(&self, window_ms: u64) -> Option<u64> {
        self.since_ms.map(|t| t.saturating_add(window_ms))
    }
}

#[derive(Debug)]
pub struct VolumeTapListener {
    baseline: f64,
    window_ms: u64,
    up: PendingTap,
    down: PendingTap,
}

impl VolumeTapListener {
    pub fn new(baseline: f64, window_ms: u64) -> Self {
        Self {
            baseline,
            window_ms,
            up: PendingTap::default(),
            down: PendingTap::default(),
        }
    }

    /// The level the device should be restored to.
    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    /// Feed one observed level.
    ///
    /// Expired singles are flushed first, so the returned events are in
    /// firing order. A level equal to the baseline (e.g. the echo of the
    /// restoring write) is not a press.
    pub fn observe(&mut self, level: f64, now_ms: u64) -> Vec<TapEvent> {
        let mut fired = self.poll(now_ms);

        let direction = if level > self.baseline {
            VolumeDirection::Up
        } else if level < self.baseline {
            VolumeDirection::Down
        } else {
            return fired;
        };

        let window_ms = self.window_ms;
        let pending = self.pending_mut(direction);
        match pending.since_ms.take() {
            Some(since) if now_ms.saturating_sub(since) < window_ms => {
                fired.push(TapEvent {
                    direction,
                    kind: TapKind::Double,
                    timestamp_ms: now_ms,
                });
            }
            _ => pending.since_ms = Some(now_ms),
        }

        fired
    }

    /// Fire singles whose window has elapsed by `now_ms`.
    pub fn poll(&mut self, now_ms: u64) -> Vec<TapEvent> {
        let mut fired = Vec::new();
        for direction in [VolumeDirection::Up, VolumeDirection::Down] {
            let window_ms = self.window_ms;
            let pending = self.pending_mut(direction);
            if let Some(deadline) = pending.deadline(window_ms)
                && now_ms >= deadline
            {
                pending.since_ms = None;
                fired.push(TapEvent {
                    direction,
                    kind: TapKind::Single,
                    timestamp_ms: deadline,
                });
            }
        }
        fired.sort_by_key(|e| e.timestamp_ms);
        fired
    }

    /// Earliest time at which [`poll`](Self::poll) will fire something.
    pub fn next_deadline(&self) -> Option<u64> {
        [
            self.up.deadline(self.window_ms),
            self.down.deadline(self.window_ms),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    pub fn has_pending(&self) -> bool {
        self.next_deadline().is_some()
    }

    fn pending_mut(&mut self, direction: VolumeDirection) -> &mut PendingTap {
        match direction {
            VolumeDirection::Up => &mut self.up,
            VolumeDirection::Down => &mut self.down,
        }
    }
}

impl Default for VolumeTapListener {
    fn default() -> Self {
        Self::new(0.5, DOUBLE_TAP_WINDOW_MS)
    }
}
