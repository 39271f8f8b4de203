//! Serializable lever configuration and its validation.
//!
//! Every lever is described by a [`LeverConfig`]. Configs can be written in code (the preset
//! constructors mirror the classic lever setups) or loaded from TOML:
//!
//! ```toml
//! name = "sluice"
//! min_angle = -60.0
//! max_angle = 60.0
//! rest_angle = 0.0
//! axis = [1.0, 0.0, 0.0]
//!
//! [drive]
//! kind = "manual_drag"
//! sensitivity = 2.0
//!
//! [zone]
//! enabled = true
//! threshold_min = 40.0
//! threshold_max = 60.0
//!
//! [proximity]
//! required = true
//! radius = 3.0
//! ```

use crate::angle::DEFAULT_CHANGE_EPSILON;
use crate::drive::SpringSettings;
use crate::error::{LeverError, LeverResult};
use crate::hardware::SerialSettings;
use crate::proximity::MissingActorPolicy;
use crate::relax::DEFAULT_SETTLE_TOLERANCE;
use crate::zone::ActivationZone;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How the lever's angle is driven. Fixed for the lifetime of the lever.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DriveConfig {
    ManualDrag {
        #[serde(default = "default_sensitivity")]
        sensitivity: f32,
        #[serde(default)]
        require_pointer_hit: bool,
    },
    DiscreteToggle {
        activated_angle: f32,
        deactivated_angle: f32,
        #[serde(default = "default_rotation_speed")]
        rotation_speed: f32,
    },
    PhysicsSpring {
        #[serde(default)]
        spring: SpringSettings,
    },
    ExternalSet,
}

fn default_sensitivity() -> f32 {
    2.0
}

fn default_rotation_speed() -> f32 {
    5.0
}

impl Default for DriveConfig {
    fn default() -> Self {
        DriveConfig::ManualDrag {
            sensitivity: default_sensitivity(),
            require_pointer_hit: false,
        }
    }
}

/// Exponential return toward the rest angle when nothing is driving the lever.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReturnConfig {
    pub enabled: bool,
    pub speed: f32,
    pub tolerance: f32,
}

impl Default for ReturnConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            speed: 3.0,
            tolerance: DEFAULT_SETTLE_TOLERANCE,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    pub enabled: bool,
    pub threshold_min: f32,
    pub threshold_max: f32,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold_min: 40.0,
            threshold_max: 60.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityConfig {
    /// When `false`, interaction is always permitted.
    pub required: bool,
    pub actor_tag: String,
    pub radius: f32,
    pub when_missing: MissingActorPolicy,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            required: false,
            actor_tag: "Player".to_string(),
            radius: 3.0,
            when_missing: MissingActorPolicy::Deny,
        }
    }
}

/// Complete description of one lever.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeverConfig {
    pub name: String,
    pub min_angle: f32,
    pub max_angle: f32,
    /// Rest angle for the return controller and the spring target.
    /// Toggle levers rest at their deactivated angle instead.
    pub rest_angle: f32,
    /// Hinge axis in the lever's local space.
    pub axis: Vec3,
    /// Smallest angle change reported as movement.
    pub change_epsilon: f32,
    pub drive: DriveConfig,
    pub return_to_rest: ReturnConfig,
    pub zone: ZoneConfig,
    pub proximity: ProximityConfig,
    pub output: Option<SerialSettings>,
}

impl Default for LeverConfig {
    fn default() -> Self {
        Self {
            name: "lever".to_string(),
            min_angle: -60.0,
            max_angle: 60.0,
            rest_angle: 0.0,
            axis: Vec3::X,
            change_epsilon: DEFAULT_CHANGE_EPSILON,
            drive: DriveConfig::default(),
            return_to_rest: ReturnConfig::default(),
            zone: ZoneConfig::default(),
            proximity: ProximityConfig::default(),
            output: None,
        }
    }
}

fn check_param(name: &'static str, value: f32) -> LeverResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(LeverError::InvalidParameter { name, value })
    }
}

impl LeverConfig {
    /// A grabbable lever that springs back to center, fires on the upper zone and only
    /// reacts while the player stands nearby.
    pub fn interactive() -> Self {
        Self {
            zone: ZoneConfig {
                enabled: true,
                ..Default::default()
            },
            proximity: ProximityConfig {
                required: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// A lever picked with the mouse and dragged, staying where it is released.
    pub fn mouse_drag() -> Self {
        Self {
            min_angle: -45.0,
            max_angle: 45.0,
            drive: DriveConfig::ManualDrag {
                sensitivity: -1.0,
                require_pointer_hit: true,
            },
            return_to_rest: ReturnConfig {
                enabled: false,
                speed: 5.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// A two-state switch toggled by the interact action while the player is nearby.
    pub fn toggle(activated_angle: f32, deactivated_angle: f32) -> Self {
        Self {
            drive: DriveConfig::DiscreteToggle {
                activated_angle,
                deactivated_angle,
                rotation_speed: default_rotation_speed(),
            },
            rest_angle: deactivated_angle,
            proximity: ProximityConfig {
                required: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// A lever simulated on a spring-loaded hinge.
    pub fn physical() -> Self {
        Self {
            drive: DriveConfig::PhysicsSpring {
                spring: SpringSettings::default(),
            },
            return_to_rest: ReturnConfig {
                enabled: false,
                ..Default::default()
            },
            zone: ZoneConfig {
                enabled: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// A lever whose angle is set by scripts or the network.
    pub fn external() -> Self {
        Self {
            drive: DriveConfig::ExternalSet,
            return_to_rest: ReturnConfig {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_range(mut self, min_angle: f32, max_angle: f32, rest_angle: f32) -> Self {
        self.min_angle = min_angle;
        self.max_angle = max_angle;
        self.rest_angle = rest_angle;
        self
    }

    pub fn with_zone(mut self, threshold_min: f32, threshold_max: f32) -> Self {
        self.zone = ZoneConfig {
            enabled: true,
            threshold_min,
            threshold_max,
        };
        self
    }

    pub fn without_zone(mut self) -> Self {
        self.zone.enabled = false;
        self
    }

    pub fn with_proximity(mut self, radius: f32) -> Self {
        self.proximity.required = true;
        self.proximity.radius = radius;
        self
    }

    pub fn without_proximity(mut self) -> Self {
        self.proximity.required = false;
        self
    }

    pub fn with_return(mut self, speed: f32) -> Self {
        self.return_to_rest.enabled = true;
        self.return_to_rest.speed = speed;
        self
    }

    pub fn without_return(mut self) -> Self {
        self.return_to_rest.enabled = false;
        self
    }

    pub fn with_output(mut self, settings: SerialSettings) -> Self {
        self.output = Some(settings);
        self
    }

    /// The angle the lever starts at and relaxes toward.
    pub fn effective_rest(&self) -> f32 {
        match self.drive {
            DriveConfig::DiscreteToggle {
                deactivated_angle, ..
            } => deactivated_angle,
            _ => self.rest_angle,
        }
    }

    /// Checks every setup-time constraint. Called by the lever constructors.
    pub fn validate(&self) -> LeverResult<()> {
        let (min, max) = (self.min_angle, self.max_angle);
        if !(min.is_finite() && max.is_finite()) || min >= max {
            return Err(LeverError::InvalidRange { min, max });
        }
        let rest = self.effective_rest();
        if !rest.is_finite() || rest < min || rest > max {
            return Err(LeverError::RestOutOfRange { rest, min, max });
        }
        if !self.axis.is_finite() || self.axis.length_squared() <= f32::EPSILON {
            return Err(LeverError::InvalidAxis(self.axis));
        }
        check_param("change_epsilon", self.change_epsilon)?;

        match &self.drive {
            DriveConfig::ManualDrag { sensitivity, .. } => {
                if !sensitivity.is_finite() {
                    return Err(LeverError::InvalidParameter {
                        name: "sensitivity",
                        value: *sensitivity,
                    });
                }
            }
            DriveConfig::DiscreteToggle {
                activated_angle,
                deactivated_angle,
                rotation_speed,
            } => {
                for angle in [*activated_angle, *deactivated_angle] {
                    if !angle.is_finite() || angle < min || angle > max {
                        return Err(LeverError::ToggleOutOfRange { angle, min, max });
                    }
                }
                check_param("rotation_speed", *rotation_speed)?;
                if self.zone.enabled {
                    return Err(LeverError::ZoneOnToggle);
                }
            }
            DriveConfig::PhysicsSpring { spring } => {
                check_param("spring.stiffness", spring.stiffness)?;
                check_param("spring.damping", spring.damping)?;
            }
            DriveConfig::ExternalSet => {}
        }

        if self.return_to_rest.enabled {
            check_param("return_to_rest.speed", self.return_to_rest.speed)?;
            check_param("return_to_rest.tolerance", self.return_to_rest.tolerance)?;
        }
        if self.zone.enabled {
            ActivationZone::new(self.zone.threshold_min, self.zone.threshold_max)?;
        }
        if self.proximity.required {
            check_param("proximity.radius", self.proximity.radius)?;
        }
        Ok(())
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(source: &str) -> LeverResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> LeverResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn to_toml_string(&self) -> LeverResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
