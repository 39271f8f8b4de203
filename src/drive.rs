//! The four strategies that decide how a lever's angle changes on a tick.
//!
//! A lever carries exactly one [`Drive`], chosen when it is built. The variants share the
//! same [`AngleState`] and append whatever they publish to the tick's event buffer; dispatch
//! to observers happens later in the pipeline.

use crate::angle::AngleState;
use crate::events::LeverEvent;
use crate::relax::ReturnController;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// What the drive did this tick, as far as the return-to-rest stage is concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriveState {
    /// Holding or moving the angle. Nothing else may touch it this tick.
    Driving,
    /// Not engaged. The return controller may relax the angle.
    Idle,
    /// The angle is owned by something outside the lever (physics or caller).
    External,
}

/// Pointer state for one tick, supplied by the host's input layer.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointerInput {
    /// The grab button went down this tick.
    pub pressed: bool,
    /// The grab button is down. Implied on the tick `pressed` is set.
    pub held: bool,
    /// The grab button went up this tick.
    pub released: bool,
    /// Pointer movement since the previous tick.
    pub delta: Vec2,
    /// Whether the host's pick ray hit the lever. `false` when picking is unavailable.
    pub over_lever: bool,
}

impl PointerInput {
    /// The grab button going down over the lever.
    pub fn press() -> Self {
        Self {
            pressed: true,
            held: true,
            over_lever: true,
            ..Default::default()
        }
    }

    /// A held grab moving by `delta`.
    pub fn hold(delta: Vec2) -> Self {
        Self {
            held: true,
            delta,
            over_lever: true,
            ..Default::default()
        }
    }

    /// The grab button going up.
    pub fn release() -> Self {
        Self {
            released: true,
            ..Default::default()
        }
    }

    pub fn with_over_lever(mut self, over_lever: bool) -> Self {
        self.over_lever = over_lever;
        self
    }
}

/// Drag the angle with vertical pointer motion while a grab is held.
#[derive(Clone, Debug, PartialEq)]
pub struct ManualDrag {
    /// Angle units per unit of vertical pointer motion. Negative inverts the drag.
    pub sensitivity: f32,
    /// Only start a grab when the pointer is over the lever.
    pub require_pointer_hit: bool,
    grabbed: bool,
}

impl ManualDrag {
    pub fn new(sensitivity: f32) -> Self {
        Self {
            sensitivity,
            require_pointer_hit: false,
            grabbed: false,
        }
    }

    pub fn with_pointer_hit(mut self, require: bool) -> Self {
        self.require_pointer_hit = require;
        self
    }

    /// Whether a grab is in progress.
    pub fn is_grabbed(&self) -> bool {
        self.grabbed
    }

    /// Ends a grab in progress. Returns `true` if there was one.
    pub fn release(&mut self, events: &mut Vec<LeverEvent>) -> bool {
        if !self.grabbed {
            return false;
        }
        self.grabbed = false;
        debug!("Lever released");
        events.push(LeverEvent::Released);
        true
    }

    pub fn update(
        &mut self,
        angle: &mut AngleState,
        pointer: &PointerInput,
        permitted: bool,
        events: &mut Vec<LeverEvent>,
    ) -> DriveState {
        let hit = !self.require_pointer_hit || pointer.over_lever;
        if pointer.pressed && !self.grabbed && permitted && hit {
            self.grabbed = true;
            debug!("Lever grabbed at {:.2}", angle.get());
            events.push(LeverEvent::Grabbed);
        }

        // A press counts as held on its own tick, for hosts that only report edges.
        let held = pointer.held || pointer.pressed;
        if self.grabbed && (pointer.released || !held) {
            self.release(events);
        }

        if !self.grabbed {
            return DriveState::Idle;
        }

        // Out of reach: keep the grab but freeze the angle.
        if permitted {
            let delta = pointer.delta.y * self.sensitivity;
            let (value, changed) = angle.set(angle.get() + delta);
            if changed {
                events.push(LeverEvent::Moved(value));
            }
        }
        DriveState::Driving
    }
}

/// Flip between two fixed angles, easing toward the current one every tick.
#[derive(Clone, Debug, PartialEq)]
pub struct DiscreteToggle {
    pub activated_angle: f32,
    pub deactivated_angle: f32,
    approach: ReturnController,
    activated: bool,
}

impl DiscreteToggle {
    pub fn new(activated_angle: f32, deactivated_angle: f32, rotation_speed: f32) -> Self {
        Self {
            activated_angle,
            deactivated_angle,
            approach: ReturnController::new(rotation_speed)
                .with_tolerance(crate::angle::DEFAULT_CHANGE_EPSILON),
            activated: false,
        }
    }

    /// The current toggle state.
    pub fn is_activated(&self) -> bool {
        self.activated
    }

    pub fn rotation_speed(&self) -> f32 {
        self.approach.speed
    }

    /// The angle the lever is currently easing toward.
    pub fn target(&self) -> f32 {
        if self.activated {
            self.activated_angle
        } else {
            self.deactivated_angle
        }
    }

    /// Whether the angle has reached the current target.
    pub fn is_settled(&self, angle: &AngleState) -> bool {
        self.approach.is_settled(angle.get(), self.target())
    }

    /// Flips the state and publishes `Toggled` followed by the new state.
    pub fn toggle(&mut self, events: &mut Vec<LeverEvent>) -> bool {
        self.activated = !self.activated;
        debug!(
            "Lever toggled {}",
            if self.activated { "on" } else { "off" }
        );
        events.push(LeverEvent::Toggled);
        events.push(if self.activated {
            LeverEvent::Activated
        } else {
            LeverEvent::Deactivated
        });
        self.activated
    }

    pub fn update(
        &mut self,
        angle: &mut AngleState,
        interact: bool,
        dt: f32,
        events: &mut Vec<LeverEvent>,
    ) -> DriveState {
        if interact {
            self.toggle(events);
        }
        if let Some(value) = self.approach.relax_toward(angle, self.target(), dt) {
            events.push(LeverEvent::Moved(value));
        }
        DriveState::Driving
    }
}

/// Spring-damper settings pushed to the hinge joint.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpringSettings {
    pub stiffness: f32,
    pub damping: f32,
    pub enabled: bool,
}

impl Default for SpringSettings {
    fn default() -> Self {
        Self {
            stiffness: 50.0,
            damping: 10.0,
            enabled: true,
        }
    }
}

/// Everything the physics engine needs to configure a lever's hinge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JointParams {
    pub min_limit: f32,
    pub max_limit: f32,
    pub stiffness: f32,
    pub damping: f32,
    pub target_angle: f32,
    pub spring_enabled: bool,
}

/// The host physics engine's hinge joint, seen from the lever.
pub trait HingeJoint {
    /// Applies limits and spring parameters. Limits are always sent unchanged.
    fn configure(&mut self, params: &JointParams);

    /// The joint's current angle, or `None` when the joint is not simulated yet.
    fn reported_angle(&self) -> Option<f32>;

    /// Kicks the lever around its hinge axis.
    fn apply_torque_impulse(&mut self, _torque: f32) {}
}

/// Read the angle back from a physically simulated hinge.
pub struct PhysicsSpring {
    joint: Box<dyn HingeJoint>,
    spring: SpringSettings,
    min_limit: f32,
    max_limit: f32,
    target_angle: f32,
}

impl fmt::Debug for PhysicsSpring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicsSpring")
            .field("spring", &self.spring)
            .field("min_limit", &self.min_limit)
            .field("max_limit", &self.max_limit)
            .field("target_angle", &self.target_angle)
            .finish_non_exhaustive()
    }
}

impl PhysicsSpring {
    /// Wraps `joint` and pushes the initial limits and spring to it.
    pub fn new(joint: Box<dyn HingeJoint>, angle: &AngleState, spring: SpringSettings) -> Self {
        let mut drive = Self {
            joint,
            spring,
            min_limit: angle.min(),
            max_limit: angle.max(),
            target_angle: angle.rest(),
        };
        drive.push();
        drive
    }

    /// The full parameter set the joint is configured with.
    pub fn params(&self) -> JointParams {
        JointParams {
            min_limit: self.min_limit,
            max_limit: self.max_limit,
            stiffness: self.spring.stiffness,
            damping: self.spring.damping,
            target_angle: self.target_angle,
            spring_enabled: self.spring.enabled,
        }
    }

    /// The spring settings last pushed to the joint.
    pub fn spring(&self) -> SpringSettings {
        self.spring
    }

    fn push(&mut self) {
        let params = self.params();
        self.joint.configure(&params);
    }

    pub fn set_spring_force(&mut self, stiffness: f32) {
        self.spring.stiffness = stiffness.max(0.0);
        self.push();
    }

    pub fn set_damping(&mut self, damping: f32) {
        self.spring.damping = damping.max(0.0);
        self.push();
    }

    pub fn set_spring_enabled(&mut self, enabled: bool) {
        self.spring.enabled = enabled;
        self.push();
    }

    pub fn apply_torque_impulse(&mut self, torque: f32) {
        self.joint.apply_torque_impulse(torque);
    }

    pub fn update(&mut self, angle: &mut AngleState, events: &mut Vec<LeverEvent>) -> DriveState {
        if let Some(reported) = self.joint.reported_angle() {
            let (value, changed) = angle.set(reported);
            if changed {
                events.push(LeverEvent::Moved(value));
            }
        }
        DriveState::External
    }
}

/// Angle written directly by scripts or the network.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ExternalSet {
    last_command: Option<f32>,
}

impl ExternalSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent requested angle, before clamping.
    pub fn last_command(&self) -> Option<f32> {
        self.last_command
    }

    /// Stores `requested` (clamped) and always publishes `Moved`.
    pub fn set_angle(
        &mut self,
        angle: &mut AngleState,
        requested: f32,
        events: &mut Vec<LeverEvent>,
    ) -> f32 {
        self.last_command = Some(requested);
        angle.set(requested);
        let value = angle.publish();
        events.push(LeverEvent::Moved(value));
        value
    }
}

/// The strategy attached to a lever.
#[derive(Debug)]
pub enum Drive {
    ManualDrag(ManualDrag),
    DiscreteToggle(DiscreteToggle),
    PhysicsSpring(PhysicsSpring),
    ExternalSet(ExternalSet),
}

impl Drive {
    /// Human-readable drive name used in errors and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Drive::ManualDrag(_) => "manual drag",
            Drive::DiscreteToggle(_) => "discrete toggle",
            Drive::PhysicsSpring(_) => "physics spring",
            Drive::ExternalSet(_) => "external set",
        }
    }
}
