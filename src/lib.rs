//! # lever-actuator
//!
//! An engine-agnostic angle and activation engine for bounded rotational levers.
//!
//! A [`Lever`] owns a clamped angle and advances it once per host tick through one of four
//! drives (pointer drag, two-state toggle, physics hinge, external set), relaxes it toward
//! rest when nobody is holding it, publishes edge-triggered activation events, and optionally
//! forwards its position to a servo over a byte stream.
//!
//! The crate never touches a scene graph, renderer, or physics solver directly. Hosts feed
//! it a [`TickInput`] and apply the returned [`LeverPose`] to their own transforms, whether
//! that is a Bevy entity, a custom engine, or a headless test.

#![deny(clippy::unwrap_used)]

pub mod angle;
pub mod config;
pub mod drive;
pub mod error;
pub mod events;
pub mod hardware;
pub mod lever;
pub mod proximity;
pub mod relax;
pub mod zone;

pub use angle::*;
pub use config::*;
pub use drive::*;
pub use error::*;
pub use events::*;
pub use hardware::*;
pub use lever::*;
pub use proximity::*;
pub use relax::*;
pub use zone::*;
