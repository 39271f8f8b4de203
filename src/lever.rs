//! The lever instance and its per-tick pipeline.
//!
//! The entry point is [`Lever`]. Build it from a [`LeverConfig`], subscribe observers,
//! then call [`Lever::tick`] once per frame with a [`TickInput`]. Each tick runs, in order:
//!
//! 1. proximity gate refresh,
//! 2. drive update,
//! 3. return-to-rest (only when the drive is idle),
//! 4. activation zone evaluation,
//! 5. event dispatch,
//! 6. hardware output.
//!
//! The returned [`TickReport`] carries the resulting [`LeverPose`] for the host to apply to
//! its transform.

use crate::angle::AngleState;
use crate::config::{DriveConfig, LeverConfig};
use crate::drive::{
    DiscreteToggle, Drive, DriveState, ExternalSet, HingeJoint, ManualDrag, PhysicsSpring,
    PointerInput,
};
use crate::error::{LeverError, LeverResult};
use crate::events::{EventDispatch, EventKind, LeverEvent, ObserverId, ObserverResult};
use crate::hardware::{HardwareOutputAdapter, SerialSettings};
use crate::proximity::{ActorLocator, ProximityGate, ProximitySnapshot};
use crate::relax::ReturnController;
use crate::zone::{ActivationZone, ZoneEdge};
use glam::{Quat, Vec2, Vec3};
use tracing::{debug, info};

/// Everything the host supplies for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TickInput {
    /// Elapsed time since the previous tick, in seconds.
    pub dt: f32,
    /// The lever's world position.
    pub position: Vec3,
    /// The tracked actor's world position, `None` if it was not found.
    pub actor: Option<Vec3>,
    pub pointer: PointerInput,
    /// The interact action fired this tick (toggle levers).
    pub interact: bool,
}

impl TickInput {
    /// An empty input advancing time by `dt` seconds.
    pub fn new(dt: f32) -> Self {
        Self {
            dt,
            ..Default::default()
        }
    }

    /// Sets the lever's world position.
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Sets the tracked actor's world position.
    pub fn with_actor(mut self, actor: Option<Vec3>) -> Self {
        self.actor = actor;
        self
    }

    /// Resolves the actor position through the host's scene lookup.
    pub fn locate_actor(mut self, locator: &dyn ActorLocator, tag: &str) -> Self {
        self.actor = locator.locate(tag);
        self
    }

    /// Sets the pointer state.
    pub fn with_pointer(mut self, pointer: PointerInput) -> Self {
        self.pointer = pointer;
        self
    }

    /// Shorthand for a held grab moving the pointer by `delta_y`.
    pub fn dragging(self, delta_y: f32) -> Self {
        self.with_pointer(PointerInput::hold(Vec2::new(0.0, delta_y)))
    }

    /// Sets whether the interact action fired.
    pub fn with_interact(mut self, interact: bool) -> Self {
        self.interact = interact;
        self
    }
}

/// The orientation hand-off: a hinge axis and an angle in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LeverPose {
    pub axis: Vec3,
    pub angle: f32,
}

impl LeverPose {
    /// Rotation of `angle` degrees about `axis`.
    pub fn rotation(&self) -> Quat {
        Quat::from_axis_angle(self.axis.normalize_or(Vec3::X), self.angle.to_radians())
    }

    /// Applies the lever rotation on top of the rest orientation `base`.
    pub fn compose(&self, base: Quat) -> Quat {
        base * self.rotation()
    }
}

/// What happened during one tick.
#[derive(Clone, Debug, PartialEq)]
pub struct TickReport {
    pub angle: f32,
    pub pose: LeverPose,
    pub proximity: ProximitySnapshot,
    /// Events dispatched this tick, in dispatch order.
    pub events: Vec<LeverEvent>,
    /// Value written to the hardware output, if any.
    pub output: Option<u16>,
}

/// A single bounded rotational lever.
pub struct Lever {
    name: String,
    angle: AngleState,
    axis: Vec3,
    drive: Drive,
    relax: Option<ReturnController>,
    zone: Option<ActivationZone>,
    gate: Option<ProximityGate>,
    actor_tag: String,
    proximity: ProximitySnapshot,
    dispatch: EventDispatch,
    output_settings: Option<SerialSettings>,
    output: Option<HardwareOutputAdapter>,
    detached: bool,
}

impl std::fmt::Debug for Lever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lever")
            .field("name", &self.name)
            .field("angle", &self.angle)
            .field("drive", &self.drive)
            .field("zone", &self.zone)
            .field("gate", &self.gate)
            .field("output", &self.output)
            .field("detached", &self.detached)
            .finish_non_exhaustive()
    }
}

impl Lever {
    /// Builds a lever from a validated config.
    ///
    /// Physics spring levers must be built with [`with_joint`](Self::with_joint).
    pub fn new(config: LeverConfig) -> LeverResult<Self> {
        Self::build(config, None)
    }

    /// Builds a physics spring lever reading its angle from `joint`.
    ///
    /// The joint receives its limits and spring parameters before this returns.
    pub fn with_joint(config: LeverConfig, joint: Box<dyn HingeJoint>) -> LeverResult<Self> {
        if !matches!(config.drive, DriveConfig::PhysicsSpring { .. }) {
            return Err(LeverError::DriveMismatch {
                operation: "with_joint",
                expected: "physics spring",
                actual: drive_config_name(&config.drive),
            });
        }
        Self::build(config, Some(joint))
    }

    fn build(config: LeverConfig, joint: Option<Box<dyn HingeJoint>>) -> LeverResult<Self> {
        config.validate()?;

        let angle = AngleState::new(config.min_angle, config.max_angle, config.effective_rest())?
            .with_epsilon(config.change_epsilon);

        let drive = match config.drive {
            DriveConfig::ManualDrag {
                sensitivity,
                require_pointer_hit,
            } => Drive::ManualDrag(
                ManualDrag::new(sensitivity).with_pointer_hit(require_pointer_hit),
            ),
            DriveConfig::DiscreteToggle {
                activated_angle,
                deactivated_angle,
                rotation_speed,
            } => Drive::DiscreteToggle(DiscreteToggle::new(
                activated_angle,
                deactivated_angle,
                rotation_speed,
            )),
            DriveConfig::PhysicsSpring { spring } => {
                let joint = joint.ok_or(LeverError::MissingJoint)?;
                Drive::PhysicsSpring(PhysicsSpring::new(joint, &angle, spring))
            }
            DriveConfig::ExternalSet => Drive::ExternalSet(ExternalSet::new()),
        };

        // Physics and external levers own their angle; only grab levers relax.
        let relax = match drive {
            Drive::ManualDrag(_) if config.return_to_rest.enabled => Some(
                ReturnController::new(config.return_to_rest.speed)
                    .with_tolerance(config.return_to_rest.tolerance),
            ),
            _ => None,
        };

        let zone = if config.zone.enabled {
            Some(ActivationZone::new(
                config.zone.threshold_min,
                config.zone.threshold_max,
            )?)
        } else {
            None
        };

        let gate = config.proximity.required.then(|| {
            ProximityGate::new(config.proximity.radius).with_policy(config.proximity.when_missing)
        });

        debug!(
            "Lever '{}' built with {} drive over [{}, {}]",
            config.name,
            drive.name(),
            config.min_angle,
            config.max_angle
        );

        Ok(Self {
            name: config.name,
            angle,
            axis: config.axis.normalize(),
            drive,
            relax,
            zone,
            gate,
            actor_tag: config.proximity.actor_tag,
            proximity: ProximitySnapshot::default(),
            dispatch: EventDispatch::new(),
            output_settings: config.output,
            output: None,
            detached: false,
        })
    }

    /// The lever's configured name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The current angle in degrees.
    pub fn angle(&self) -> f32 {
        self.angle.get()
    }

    /// The angle mapped to `[0, 1]` across the range.
    pub fn normalized_angle(&self) -> f32 {
        self.angle.normalized()
    }

    /// The underlying angle state.
    pub fn state(&self) -> &AngleState {
        &self.angle
    }

    /// The drive attached at build time.
    pub fn drive(&self) -> &Drive {
        &self.drive
    }

    /// The normalized hinge axis in the lever's local frame.
    pub fn axis(&self) -> Vec3 {
        self.axis
    }

    /// The current orientation hand-off.
    pub fn pose(&self) -> LeverPose {
        LeverPose {
            axis: self.axis,
            angle: self.angle.get(),
        }
    }

    /// Tag of the actor whose distance gates interaction.
    pub fn actor_tag(&self) -> &str {
        &self.actor_tag
    }

    /// The gating radius, if the lever is gated. Useful for debug overlays.
    pub fn interaction_radius(&self) -> Option<f32> {
        self.gate.map(|g| g.radius)
    }

    /// Result of the most recent proximity check.
    pub fn is_in_range(&self) -> bool {
        self.proximity.in_range
    }

    /// Whether a drag lever is currently held.
    pub fn is_grabbed(&self) -> bool {
        matches!(&self.drive, Drive::ManualDrag(drag) if drag.is_grabbed())
    }

    /// Toggle state for toggle levers, zone latch for everything else.
    pub fn is_activated(&self) -> bool {
        match &self.drive {
            Drive::DiscreteToggle(toggle) => toggle.is_activated(),
            _ => self.zone.is_some_and(|z| z.is_latched()),
        }
    }

    /// Whether [`detach`](Self::detach) has run.
    pub fn is_detached(&self) -> bool {
        self.detached
    }

    /// Registers a fallible observer for `kind`.
    pub fn subscribe<F>(&mut self, kind: EventKind, observer: F) -> ObserverId
    where
        F: FnMut(&LeverEvent) -> ObserverResult + 'static,
    {
        self.dispatch.subscribe(kind, observer)
    }

    /// Registers an infallible observer for `kind`.
    pub fn on<F>(&mut self, kind: EventKind, observer: F) -> ObserverId
    where
        F: FnMut(&LeverEvent) + 'static,
    {
        self.dispatch.on(kind, observer)
    }

    /// Removes an observer. Returns `false` if the id was unknown.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.dispatch.unsubscribe(id)
    }

    /// Attaches an output stream. Any previously attached stream is closed first.
    pub fn attach_output(&mut self, mut adapter: HardwareOutputAdapter) {
        if let Some(settings) = &self.output_settings {
            adapter = adapter.with_full_scale(settings.full_scale);
        }
        if let Some(mut previous) = self.output.replace(adapter) {
            previous.close();
        }
    }

    /// Opens the serial port from the lever's `output` settings and attaches it.
    ///
    /// Returns `Ok(false)` when the lever has no output configured.
    #[cfg(feature = "serial")]
    pub fn connect_output(&mut self) -> LeverResult<bool> {
        let Some(settings) = self.output_settings.clone() else {
            return Ok(false);
        };
        let stream = crate::hardware::open_serial(&settings)?;
        self.attach_output(HardwareOutputAdapter::new(stream));
        Ok(true)
    }

    /// The attached hardware output, if any.
    pub fn output(&self) -> Option<&HardwareOutputAdapter> {
        self.output.as_ref()
    }

    /// Advances the lever by one tick.
    pub fn tick(&mut self, input: &TickInput) -> TickReport {
        if self.detached {
            return TickReport {
                angle: self.angle.get(),
                pose: self.pose(),
                proximity: self.proximity,
                events: Vec::new(),
                output: None,
            };
        }

        let mut events = Vec::new();

        self.proximity = match &self.gate {
            Some(gate) => gate.evaluate(input.actor, input.position),
            None => ProximitySnapshot {
                in_range: true,
                distance: input.actor.map(|a| a.distance(input.position)),
            },
        };
        let permitted = self.proximity.in_range;

        let state = match &mut self.drive {
            Drive::ManualDrag(drag) => {
                drag.update(&mut self.angle, &input.pointer, permitted, &mut events)
            }
            Drive::DiscreteToggle(toggle) => toggle.update(
                &mut self.angle,
                input.interact && permitted,
                input.dt,
                &mut events,
            ),
            Drive::PhysicsSpring(spring) => spring.update(&mut self.angle, &mut events),
            Drive::ExternalSet(_) => DriveState::External,
        };

        if state == DriveState::Idle
            && let Some(relax) = &self.relax
            && let Some(value) = relax.relax(&mut self.angle, input.dt)
        {
            events.push(LeverEvent::Moved(value));
        }

        if let Some(zone) = &mut self.zone {
            match zone.evaluate(self.angle.get()) {
                Some(ZoneEdge::Entered) => events.push(LeverEvent::Activated),
                Some(ZoneEdge::Exited) => events.push(LeverEvent::Deactivated),
                None => {}
            }
        }

        for event in &events {
            self.dispatch.emit(*event);
        }

        let output = self
            .output
            .as_mut()
            .and_then(|out| out.push(self.angle.normalized()));

        TickReport {
            angle: self.angle.get(),
            pose: self.pose(),
            proximity: self.proximity,
            events,
            output,
        }
    }

    fn publish(&mut self, events: Vec<LeverEvent>) {
        for event in events {
            self.dispatch.emit(event);
        }
    }

    fn mismatch(&self, operation: &'static str, expected: &'static str) -> LeverError {
        LeverError::DriveMismatch {
            operation,
            expected,
            actual: self.drive.name(),
        }
    }

    /// Ends a grab in progress, publishing `Released` immediately.
    ///
    /// Returns `false` when nothing was grabbed or the lever is not a drag lever.
    pub fn release(&mut self) -> bool {
        let mut events = Vec::new();
        let released = match &mut self.drive {
            Drive::ManualDrag(drag) => drag.release(&mut events),
            _ => false,
        };
        self.publish(events);
        released
    }

    /// Flips a toggle lever, bypassing the proximity gate. Returns the new state.
    pub fn toggle(&mut self) -> LeverResult<bool> {
        let mut events = Vec::new();
        let activated = match &mut self.drive {
            Drive::DiscreteToggle(toggle) => toggle.toggle(&mut events),
            _ => return Err(self.mismatch("toggle", "discrete toggle")),
        };
        self.publish(events);
        Ok(activated)
    }

    /// Toggles only if the lever is not already in the requested state.
    pub fn set_state(&mut self, activated: bool) -> LeverResult<bool> {
        let current = match &self.drive {
            Drive::DiscreteToggle(toggle) => toggle.is_activated(),
            _ => return Err(self.mismatch("set_state", "discrete toggle")),
        };
        if current == activated {
            Ok(activated)
        } else {
            self.toggle()
        }
    }

    /// Sets the angle of an external lever and publishes `Moved` immediately.
    pub fn set_angle(&mut self, angle: f32) -> LeverResult<f32> {
        let mut events = Vec::new();
        let value = match &mut self.drive {
            Drive::ExternalSet(external) => external.set_angle(&mut self.angle, angle, &mut events),
            _ => return Err(self.mismatch("set_angle", "external set")),
        };
        self.publish(events);
        Ok(value)
    }

    fn spring_mut(&mut self, operation: &'static str) -> LeverResult<&mut PhysicsSpring> {
        let actual = self.drive.name();
        match &mut self.drive {
            Drive::PhysicsSpring(spring) => Ok(spring),
            _ => Err(LeverError::DriveMismatch {
                operation,
                expected: "physics spring",
                actual,
            }),
        }
    }

    /// Sets the hinge spring stiffness of a physics lever.
    pub fn set_spring_force(&mut self, stiffness: f32) -> LeverResult<()> {
        self.spring_mut("set_spring_force")?
            .set_spring_force(stiffness);
        Ok(())
    }

    /// Sets the hinge spring damping of a physics lever.
    pub fn set_damping(&mut self, damping: f32) -> LeverResult<()> {
        self.spring_mut("set_damping")?.set_damping(damping);
        Ok(())
    }

    /// Switches the hinge spring of a physics lever on or off.
    pub fn set_spring_enabled(&mut self, enabled: bool) -> LeverResult<()> {
        self.spring_mut("set_spring_enabled")?
            .set_spring_enabled(enabled);
        Ok(())
    }

    /// Kicks a physics lever around its hinge.
    pub fn apply_torque_impulse(&mut self, torque: f32) -> LeverResult<()> {
        self.spring_mut("apply_torque_impulse")?
            .apply_torque_impulse(torque);
        Ok(())
    }

    /// Takes the lever out of service.
    ///
    /// Publishes `Released` if a grab was in progress and closes the hardware output.
    /// Later ticks leave the lever untouched. Safe to call more than once.
    pub fn detach(&mut self) {
        if self.detached {
            return;
        }
        self.release();
        if let Some(mut output) = self.output.take() {
            output.close();
        }
        self.detached = true;
        info!("Lever '{}' detached", self.name);
    }
}

impl Drop for Lever {
    fn drop(&mut self) {
        self.detach();
    }
}

fn drive_config_name(config: &DriveConfig) -> &'static str {
    match config {
        DriveConfig::ManualDrag { .. } => "manual drag",
        DriveConfig::DiscreteToggle { .. } => "discrete toggle",
        DriveConfig::PhysicsSpring { .. } => "physics spring",
        DriveConfig::ExternalSet => "external set",
    }
}
