//! Error types surfaced while configuring or operating a lever.

use thiserror::Error;

/// Everything that can go wrong when building or driving a [`Lever`](crate::Lever).
///
/// Configuration problems are reported once, at construction. Missing collaborators
/// (absent actor, closed output stream) are not errors; the pipeline degrades around them.
#[derive(Debug, Error)]
pub enum LeverError {
    #[error("invalid angle range: min {min} must be strictly below max {max}")]
    InvalidRange { min: f32, max: f32 },

    #[error("rest angle {rest} lies outside [{min}, {max}]")]
    RestOutOfRange { rest: f32, min: f32, max: f32 },

    #[error("activation zone is inverted: threshold_min {min} > threshold_max {max}")]
    InvertedZone { min: f32, max: f32 },

    #[error("toggle angle {angle} lies outside [{min}, {max}]")]
    ToggleOutOfRange { angle: f32, min: f32, max: f32 },

    #[error("hinge axis {0} has no direction")]
    InvalidAxis(glam::Vec3),

    #[error("physics spring levers need a hinge joint to read from")]
    MissingJoint,

    #[error("parameter `{name}` must be finite and non-negative, got {value}")]
    InvalidParameter { name: &'static str, value: f32 },

    #[error("toggle levers publish activation themselves and cannot carry an activation zone")]
    ZoneOnToggle,

    #[error("operation `{operation}` requires a {expected} drive, lever uses {actual}")]
    DriveMismatch {
        operation: &'static str,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("failed to parse lever configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize lever configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "serial")]
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

pub type LeverResult<T> = Result<T, LeverError>;
