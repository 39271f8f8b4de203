//! Frame-rate independent relaxation of the angle toward a rest or target value.

use crate::angle::AngleState;
use bevy_math::StableInterpolate;
use serde::{Deserialize, Serialize};

/// Distance from the target below which relaxation stops, in angle units.
pub const DEFAULT_SETTLE_TOLERANCE: f32 = 0.1;

/// Exponential approach toward a target.
///
/// Each step moves the angle by `1 - exp(-speed * dt)` of the remaining distance, so the
/// trajectory is the same whether the host ticks at 30 Hz or 240 Hz. Once the angle is within
/// the settle tolerance the controller stops touching it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReturnController {
    pub speed: f32,
    pub tolerance: f32,
}

impl Default for ReturnController {
    fn default() -> Self {
        Self {
            speed: 3.0,
            tolerance: DEFAULT_SETTLE_TOLERANCE,
        }
    }
}

impl ReturnController {
    pub fn new(speed: f32) -> Self {
        Self {
            speed,
            ..Default::default()
        }
    }

    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn is_settled(&self, current: f32, target: f32) -> bool {
        (current - target).abs() <= self.tolerance
    }

    /// Computes the next angle, or `None` if `current` has already settled on `target`.
    pub fn step(&self, current: f32, target: f32, dt: f32) -> Option<f32> {
        if self.is_settled(current, target) {
            return None;
        }
        let mut next = current;
        next.smooth_nudge(&target, self.speed.max(0.0), dt.max(0.0));
        Some(next)
    }

    /// Relaxes `state` toward its own rest angle.
    pub fn relax(&self, state: &mut AngleState, dt: f32) -> Option<f32> {
        let rest = state.rest();
        self.relax_toward(state, rest, dt)
    }

    /// Relaxes `state` toward `target`, returning the written angle if anything moved.
    pub fn relax_toward(&self, state: &mut AngleState, target: f32, dt: f32) -> Option<f32> {
        let next = self.step(state.get(), target, dt)?;
        state.set(next);
        Some(state.publish())
    }
}
