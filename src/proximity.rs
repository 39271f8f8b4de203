//! Distance-based permission for player-driven interactions.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Looks up a tracked actor's world position by tag.
///
/// Implemented by the host's scene query layer. `None` means the actor does not exist
/// (yet), which the gate resolves through its [`MissingActorPolicy`].
pub trait ActorLocator {
    fn locate(&self, tag: &str) -> Option<Vec3>;
}

impl ActorLocator for HashMap<String, Vec3> {
    fn locate(&self, tag: &str) -> Option<Vec3> {
        self.get(tag).copied()
    }
}

impl<F> ActorLocator for F
where
    F: Fn(&str) -> Option<Vec3>,
{
    fn locate(&self, tag: &str) -> Option<Vec3> {
        self(tag)
    }
}

/// What the gate answers when the tracked actor cannot be found.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingActorPolicy {
    #[default]
    Deny,
    Permit,
}

/// Result of one gate evaluation. Lives for a single tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ProximitySnapshot {
    pub in_range: bool,
    /// Distance to the actor, if one was found.
    pub distance: Option<f32>,
}

/// Permits interaction only while the tracked actor is within `radius`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProximityGate {
    pub radius: f32,
    #[serde(default)]
    pub when_missing: MissingActorPolicy,
}

impl Default for ProximityGate {
    fn default() -> Self {
        Self {
            radius: 3.0,
            when_missing: MissingActorPolicy::Deny,
        }
    }
}

impl ProximityGate {
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            ..Default::default()
        }
    }

    pub fn with_policy(mut self, when_missing: MissingActorPolicy) -> Self {
        self.when_missing = when_missing;
        self
    }

    /// `distance(actor, origin) <= radius`; the boundary itself permits.
    pub fn is_permitted(&self, actor: Vec3, origin: Vec3) -> bool {
        actor.distance(origin) <= self.radius
    }

    pub fn evaluate(&self, actor: Option<Vec3>, origin: Vec3) -> ProximitySnapshot {
        match actor {
            Some(position) => {
                let distance = position.distance(origin);
                ProximitySnapshot {
                    in_range: distance <= self.radius,
                    distance: Some(distance),
                }
            }
            None => ProximitySnapshot {
                in_range: self.when_missing == MissingActorPolicy::Permit,
                distance: None,
            },
        }
    }
}
