//! The clamped scalar angle every lever variant revolves around.

use crate::error::{LeverError, LeverResult};
use serde::{Deserialize, Serialize};

/// Default change threshold used by [`AngleState::set`], in angle units.
pub const DEFAULT_CHANGE_EPSILON: f32 = 0.01;

/// A bounded angle with a rest reference.
///
/// `min <= current <= max` holds after every write. `rest` is validated to lie within the
/// same range so that relaxing toward it can never push the angle out of bounds.
///
/// `published` is the angle last reported as a move. Change detection measures against it
/// rather than the previous write, so slow drift still crosses the threshold eventually.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AngleState {
    current: f32,
    min: f32,
    max: f32,
    rest: f32,
    epsilon: f32,
    published: f32,
}

impl AngleState {
    /// Creates a state resting at `rest`.
    ///
    /// Fails when the range is empty or inverted, or when `rest` falls outside it.
    pub fn new(min: f32, max: f32, rest: f32) -> LeverResult<Self> {
        if !(min.is_finite() && max.is_finite()) || min >= max {
            return Err(LeverError::InvalidRange { min, max });
        }
        if !rest.is_finite() || rest < min || rest > max {
            return Err(LeverError::RestOutOfRange { rest, min, max });
        }
        Ok(Self {
            current: rest,
            min,
            max,
            rest,
            epsilon: DEFAULT_CHANGE_EPSILON,
            published: rest,
        })
    }

    /// Overrides the change threshold reported by [`set`](Self::set).
    pub fn with_epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = epsilon.abs();
        self
    }

    /// Clamps and stores `angle`.
    ///
    /// Returns the stored value and whether it is more than the change threshold away from
    /// the last published angle. A `true` result marks the value as published.
    /// A NaN input leaves the state untouched.
    pub fn set(&mut self, angle: f32) -> (f32, bool) {
        if angle.is_nan() {
            return (self.current, false);
        }
        let clamped = angle.clamp(self.min, self.max);
        self.current = clamped;
        let changed = (clamped - self.published).abs() > self.epsilon;
        if changed {
            self.published = clamped;
        }
        (clamped, changed)
    }

    /// Marks the current angle as published regardless of the threshold.
    pub fn publish(&mut self) -> f32 {
        self.published = self.current;
        self.current
    }

    /// The current angle.
    pub fn get(&self) -> f32 {
        self.current
    }

    /// Lower bound of the range.
    pub fn min(&self) -> f32 {
        self.min
    }

    /// Upper bound of the range.
    pub fn max(&self) -> f32 {
        self.max
    }

    /// The angle the lever returns to when released.
    pub fn rest(&self) -> f32 {
        self.rest
    }

    /// Change threshold for [`set`](Self::set).
    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    /// The angle last reported as a move.
    pub fn published(&self) -> f32 {
        self.published
    }

    /// Position of the angle within its range, `0.0` at `min` and `1.0` at `max`.
    pub fn normalized(&self) -> f32 {
        let span = self.max - self.min;
        if span > 0.0 {
            ((self.current - self.min) / span).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Whether `angle` lies within `[min, max]`.
    pub fn contains(&self, angle: f32) -> bool {
        angle >= self.min && angle <= self.max
    }
}
