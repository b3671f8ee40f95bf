//! Trackpad drag conditioning and tap classification.
//!
//! A gesture is `Start → Move* → End` (or `Cancel`). Moves produce smoothed
//! deltas between consecutive positions; the release classifies the whole
//! gesture as either a tap or the end of a drag, never both.

use crate::signal::filter::FilterState;
use crate::signal::{Conditioner, ConditionedEvent, ConditionerParams, CursorDelta};

/// A gesture shorter than this may be a tap.
pub const TAP_MAX_DURATION_MS: u64 = 200;

/// A gesture displaced less than this may be a tap, in input units.
pub const TAP_MAX_DISTANCE: f64 = 10.0;

/// Position in the touch surface's coordinate space.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn offset_from(self, origin: Point) -> Point {
        Point::new(self.x - origin.x, self.y - origin.y)
    }

    fn magnitude(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

/// Raw trackpad input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TouchEvent {
    Start { position: Point, timestamp_ms: u64 },
    Move { position: Point, timestamp_ms: u64 },
    End { position: Point, timestamp_ms: u64 },
    /// The gesture was taken away (e.g. by the OS); always a drag end.
    Cancel,
}

/// How a finished gesture was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    Tap,
    DragEnd,
}

/// Bounds for tap classification. Both must hold for a tap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TapThresholds {
    pub max_duration_ms: u64,
    pub max_distance: f64,
}

impl Default for TapThresholds {
    fn default() -> Self {
        Self {
            max_duration_ms: TAP_MAX_DURATION_MS,
            max_distance: TAP_MAX_DISTANCE,
        }
    }
}

impl TapThresholds {
    pub fn classify(&self, duration_ms: u64, displacement: f64) -> GestureOutcome {
        if duration_ms < self.max_duration_ms && displacement < self.max_distance {
            GestureOutcome::Tap
        } else {
            GestureOutcome::DragEnd
        }
    }
}

#[derive(Debug)]
struct Gesture {
    origin: Point,
    started_at_ms: u64,
    // Offset from origin at the previous tick
    previous: Point,
    x: FilterState,
    y: FilterState,
}

/// Conditioner for one trackpad.
#[derive(Debug, Default)]
pub struct DragConditioner {
    thresholds: TapThresholds,
    gesture: Option<Gesture>,
}

impl DragConditioner {
    pub fn new(thresholds: TapThresholds) -> Self {
        Self {
            thresholds,
            gesture: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.gesture.is_some()
    }

    /// Start a gesture. Any gesture in progress is discarded without an
    /// outcome; [`Conditioner::condition_one`] reports it as a drag-end.
    pub fn begin(&mut self, position: Point, timestamp_ms: u64) {
        self.gesture = Some(Gesture {
            origin: position,
            started_at_ms: timestamp_ms,
            previous: Point::default(),
            x: FilterState::default(),
            y: FilterState::default(),
        });
    }

    /// Smoothed delta since the previous position.
    ///
    /// Returns `None` when no gesture is in progress.
    pub fn update(
        &mut self,
        position: Point,
        timestamp_ms: u64,
        params: &ConditionerParams,
    ) -> Option<CursorDelta> {
        let gesture = self.gesture.as_mut()?;
        let offset = position.offset_from(gesture.origin);

        let raw_dx = (offset.x - gesture.previous.x) * params.sensitivity;
        let raw_dy = (offset.y - gesture.previous.y) * params.sensitivity;
        gesture.previous = offset;

        Some(CursorDelta::new(
            gesture.x.update(raw_dx, params.smoothing, timestamp_ms),
            gesture.y.update(raw_dy, params.smoothing, timestamp_ms),
        ))
    }

    /// Finish the gesture and classify it.
    pub fn end(&mut self, position: Point, timestamp_ms: u64) -> Option<GestureOutcome> {
        let gesture = self.gesture.take()?;
        let duration = timestamp_ms.saturating_sub(gesture.started_at_ms);
        let displacement = position.offset_from(gesture.origin).magnitude();
        Some(self.thresholds.classify(duration, displacement))
    }

    /// Abort the gesture.
    pub fn cancel(&mut self) -> Option<GestureOutcome> {
        self.gesture.take().map(|_| GestureOutcome::DragEnd)
    }
}

impl Conditioner for DragConditioner {
    type Sample = TouchEvent;

    fn condition_one(
        &mut self,
        sample: TouchEvent,
        params: &ConditionerParams,
    ) -> Option<ConditionedEvent> {
        let outcome = match sample {
            TouchEvent::Start {
                position,
                timestamp_ms,
            } => {
                // an unfinished gesture still ends with a drag-end
                let discarded = self.cancel();
                self.begin(position, timestamp_ms);
                discarded
            }
            TouchEvent::Move {
                position,
                timestamp_ms,
            } => {
                return self
                    .update(position, timestamp_ms, params)
                    .map(ConditionedEvent::Move);
            }
            TouchEvent::End {
                position,
                timestamp_ms,
            } => self.end(position, timestamp_ms),
            TouchEvent::Cancel => self.cancel(),
        };

        outcome.map(|o| match o {
            GestureOutcome::Tap => ConditionedEvent::Tap,
            GestureOutcome::DragEnd => ConditionedEvent::DragEnd,
        })
    }

    fn reset(&mut self) {
        self.gesture = None;
    }
}
