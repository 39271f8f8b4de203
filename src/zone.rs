//! Edge-triggered detection of the angle entering or leaving an activation sub-range.

use crate::error::{LeverError, LeverResult};
use serde::{Deserialize, Serialize};

/// A transition reported by [`ActivationZone::evaluate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZoneEdge {
    Entered,
    Exited,
}

/// A closed angle interval whose entry and exit are published exactly once per dwell.
///
/// `latched` is the last published inside/outside state and is the only memory carried
/// between ticks. There is no hysteresis band: the bounds themselves count as inside.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivationZone {
    threshold_min: f32,
    threshold_max: f32,
    latched: bool,
}

impl ActivationZone {
    /// Fails when either bound is not finite or the bounds are inverted.
    pub fn new(threshold_min: f32, threshold_max: f32) -> LeverResult<Self> {
        if !(threshold_min.is_finite() && threshold_max.is_finite())
            || threshold_min > threshold_max
        {
            return Err(LeverError::InvertedZone {
                min: threshold_min,
                max: threshold_max,
            });
        }
        Ok(Self {
            threshold_min,
            threshold_max,
            latched: false,
        })
    }

    /// Lower bound of the zone, inclusive.
    pub fn threshold_min(&self) -> f32 {
        self.threshold_min
    }

    /// Upper bound of the zone, inclusive.
    pub fn threshold_max(&self) -> f32 {
        self.threshold_max
    }

    /// Whether the angle was inside the zone at the last evaluation.
    pub fn is_latched(&self) -> bool {
        self.latched
    }

    /// Whether `angle` lies within the zone bounds.
    pub fn contains(&self, angle: f32) -> bool {
        angle >= self.threshold_min && angle <= self.threshold_max
    }

    /// Compares `angle` against the zone and updates the latch.
    ///
    /// Returns an edge only when the inside/outside state differs from the latch.
    pub fn evaluate(&mut self, angle: f32) -> Option<ZoneEdge> {
        let inside = self.contains(angle);
        match (inside, self.latched) {
            (true, false) => {
                self.latched = true;
                Some(ZoneEdge::Entered)
            }
            (false, true) => {
                self.latched = false;
                Some(ZoneEdge::Exited)
            }
            _ => None,
        }
    }
}
