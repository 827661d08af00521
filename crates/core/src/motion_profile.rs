/*
This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
If a copy of the MPL was not distributed with this file,
You can obtain one at https://mozilla.org/MPL/2.0/.
*/
//! Motion profiles - authored, immutable descriptions of a single motion.
//!
//! A profile says *what* should happen (move there, jump, follow this path...), how long
//! it takes, how it is eased and whether it loops. It says nothing about *who* moves;
//! the same profile can be shared by any number of entities.
//!
//! Profiles are plain data. With the `profile_loader` feature on, they are also
//! serializable Assets, so they can be authored in any format the loader crate supports.
use bevy::prelude::*;

#[cfg(feature = "profile_loader")]
use serde::{Deserialize, Serialize};

use crate::errors::ProfileValidationError;
use crate::types::{EaseKey, INFINITE_LOOPS};

/// What kind of motion a profile describes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Reflect)]
#[cfg_attr(feature = "profile_loader", derive(Serialize, Deserialize))]
pub enum MotionKind {
    /// World-space translation to `target_vector`.
    #[default]
    Move,
    /// World-space translation along X only, to `scalar_target`.
    MoveAxisX,
    /// World-space translation along Y only, to `scalar_target`.
    MoveAxisY,
    /// Translation to `target_vector` with `jump_arcs` vertical hops of `jump_height` on the way.
    Jump,
    /// Rotation about the Z axis to `scalar_target` degrees.
    Rotate,
    /// Scale change to `target_vector`.
    Scale,
    /// Follows `waypoints` in the space selected by `path_space`.
    Path,
    /// Follows `waypoints` in the parent's (local) space.
    LocalPath,
}

impl MotionKind {
    pub fn is_path(&self) -> bool {
        matches!(self, Self::Path | Self::LocalPath)
    }
}

/// How consecutive waypoints are connected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Reflect)]
#[cfg_attr(feature = "profile_loader", derive(Serialize, Deserialize))]
pub enum PathInterpolation {
    /// Straight segments.
    #[default]
    Linear,
    /// A smooth Catmull-Rom spline through every waypoint.
    CatmullRom,
}

/// Which space a path's waypoints are expressed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Reflect)]
#[cfg_attr(feature = "profile_loader", derive(Serialize, Deserialize))]
pub enum PathSpace {
    #[default]
    World,
    Local,
}

/// What happens when a motion reaches its end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Reflect)]
#[cfg_attr(feature = "profile_loader", derive(Serialize, Deserialize))]
pub enum LoopPolicy {
    /// Play once and stop.
    #[default]
    None,
    /// Jump back to the start and play again.
    Repeat,
    /// Play backwards, then forwards, and so on. Each direction is one cycle.
    PingPong,
}

/// An authored motion.
///
/// Construct with the builder-ish helpers (`MotionProfile::move_to(...)` etc.)
/// or deserialize one. Call `validate()` to check it before use; the executor
/// does so too and refuses invalid profiles.
#[derive(Debug, Clone, PartialEq, Reflect)]
#[cfg_attr(feature = "profile_loader", derive(Serialize, Deserialize, bevy::asset::Asset))]
#[cfg_attr(feature = "profile_loader", serde(default))]
pub struct MotionProfile {
    pub kind: MotionKind,

    /// Target position (Move/Jump) or scale (Scale).
    pub target_vector: Vec3,

    /// Target coordinate (MoveAxisX/MoveAxisY) or angle in degrees (Rotate).
    pub scalar_target: f32,

    pub jump_height: f32,

    /// How many hops a Jump makes on its way to the target. Must be at least 1.
    pub jump_arcs: u32,

    /// Path waypoints; at least two for path motions.
    pub waypoints: Vec<Vec3>,
    pub path_interpolation: PathInterpolation,

    /// Only consulted for `MotionKind::Path`; `LocalPath` is always local.
    pub path_space: PathSpace,

    /// Seconds per cycle. Must be positive.
    pub duration: f32,

    /// Ease name, resolved when the motion is built. Empty means linear.
    pub ease: EaseKey,

    /// Seconds to wait before the first cycle.
    pub delay: f32,

    pub loop_policy: LoopPolicy,

    /// Total cycles to play: -1 for infinite, 0 or 1 for a single play.
    pub loop_count: i32,

    /// If set, targets and waypoints are offsets from the pose at start time.
    pub use_relative: bool,
}

impl Default for MotionProfile {
    fn default() -> Self {
        Self {
            kind: MotionKind::Move,
            target_vector: Vec3::ZERO,
            scalar_target: 0.,
            jump_height: 2.,
            jump_arcs: 1,
            waypoints: Vec::new(),
            path_interpolation: PathInterpolation::Linear,
            path_space: PathSpace::World,
            duration: 1.,
            ease: EaseKey::from("Linear"),
            delay: 0.,
            loop_policy: LoopPolicy::None,
            loop_count: 0,
            use_relative: false,
        }
    }
}

impl MotionProfile {
    pub fn move_to(target: Vec3, duration: f32) -> Self {
        Self { kind: MotionKind::Move, target_vector: target, duration, ..default() }
    }

    pub fn move_axis_x(target: f32, duration: f32) -> Self {
        Self { kind: MotionKind::MoveAxisX, scalar_target: target, duration, ..default() }
    }

    pub fn move_axis_y(target: f32, duration: f32) -> Self {
        Self { kind: MotionKind::MoveAxisY, scalar_target: target, duration, ..default() }
    }

    pub fn jump_to(target: Vec3, height: f32, arcs: u32, duration: f32) -> Self {
        Self {
            kind: MotionKind::Jump,
            target_vector: target,
            jump_height: height,
            jump_arcs: arcs,
            duration,
            ..default()
        }
    }

    /// Rotation about Z, in degrees.
    pub fn rotate_to(degrees: f32, duration: f32) -> Self {
        Self { kind: MotionKind::Rotate, scalar_target: degrees, duration, ..default() }
    }

    pub fn scale_to(target: Vec3, duration: f32) -> Self {
        Self { kind: MotionKind::Scale, target_vector: target, duration, ..default() }
    }

    pub fn path<I: IntoIterator<Item = Vec3>>(waypoints: I, duration: f32) -> Self {
        Self { kind: MotionKind::Path, waypoints: waypoints.into_iter().collect(), duration, ..default() }
    }

    pub fn local_path<I: IntoIterator<Item = Vec3>>(waypoints: I, duration: f32) -> Self {
        Self { kind: MotionKind::LocalPath, ..Self::path(waypoints, duration) }
    }

    pub fn with_ease<IS: Into<EaseKey>>(mut self, ease: IS) -> Self {
        self.ease = ease.into();
        self
    }

    pub fn with_delay(mut self, delay: f32) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_interpolation(mut self, interpolation: PathInterpolation) -> Self {
        self.path_interpolation = interpolation;
        self
    }

    pub fn in_space(mut self, space: PathSpace) -> Self {
        self.path_space = space;
        self
    }

    pub fn looping(mut self, policy: LoopPolicy, count: i32) -> Self {
        self.loop_policy = policy;
        self.loop_count = count;
        self
    }

    pub fn looping_forever(self, policy: LoopPolicy) -> Self {
        self.looping(policy, INFINITE_LOOPS)
    }

    pub fn relative(mut self) -> Self {
        self.use_relative = true;
        self
    }

    /// Checks the profile's invariants, reporting the first one violated.
    ///
    /// Checked in order: duration, path waypoints, jump arcs, delay, loop count.
    pub fn validate(&self) -> Result<(), ProfileValidationError> {
        if !(self.duration > 0.) {
            return Err(ProfileValidationError::NonPositiveDuration(self.duration));
        }

        if self.kind.is_path() && self.waypoints.len() < 2 {
            return Err(ProfileValidationError::InsufficientWaypoints(self.waypoints.len()));
        }

        if self.kind == MotionKind::Jump && self.jump_arcs < 1 {
            return Err(ProfileValidationError::InvalidJumpArcs(self.jump_arcs));
        }

        if !self.delay.is_finite() || self.delay < 0. {
            return Err(ProfileValidationError::InvalidDelay(self.delay));
        }

        if self.loop_count < INFINITE_LOOPS {
            return Err(ProfileValidationError::InvalidLoopCount(self.loop_count));
        }

        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// The space the path is followed in, taking the kind into account.
    pub fn effective_path_space(&self) -> PathSpace {
        match self.kind {
            MotionKind::LocalPath => PathSpace::Local,
            _ => self.path_space,
        }
    }

    /// Where a Move/Jump ends, given where the entity is now.
    pub fn resolve_target_position(&self, current: Vec3) -> Vec3 {
        match self.use_relative {
            true => current + self.target_vector,
            false => self.target_vector,
        }
    }

    /// The final value of a scalar motion (axis coordinate or Z angle in degrees).
    pub fn resolve_scalar_target(&self, current: f32) -> f32 {
        match self.use_relative {
            true => current + self.scalar_target,
            false => self.scalar_target,
        }
    }

    /// The final scale of a Scale motion.
    pub fn resolve_target_scale(&self, current: Vec3) -> Vec3 {
        self.resolve_target_position(current)
    }

    /// The waypoints to follow, offset by `origin` for relative profiles.
    pub fn resolve_waypoints(&self, origin: Vec3) -> Vec<Vec3> {
        match self.use_relative {
            true => self.waypoints.iter().map(|point| origin + *point).collect(),
            false => self.waypoints.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_targets_offset_from_current() {
        let profile = MotionProfile::move_to(Vec3::new(2., 0., 0.), 1.).relative();
        assert_eq!(profile.resolve_target_position(Vec3::new(5., 0., 0.)), Vec3::new(7., 0., 0.));

        let absolute = MotionProfile::move_to(Vec3::new(2., 0., 0.), 1.);
        assert_eq!(absolute.resolve_target_position(Vec3::new(5., 0., 0.)), Vec3::new(2., 0., 0.));
    }

    #[test]
    fn validation_reports_first_violation() {
        let bad_duration = MotionProfile::move_to(Vec3::ONE, 0.).with_delay(-1.);
        assert_eq!(bad_duration.validate(), Err(ProfileValidationError::NonPositiveDuration(0.)));

        let short_path = MotionProfile::path([Vec3::ZERO], 1.);
        assert_eq!(short_path.validate(), Err(ProfileValidationError::InsufficientWaypoints(1)));

        let no_arcs = MotionProfile::jump_to(Vec3::X, 1., 0, 1.);
        assert_eq!(no_arcs.validate(), Err(ProfileValidationError::InvalidJumpArcs(0)));

        let bad_delay = MotionProfile::move_to(Vec3::ONE, 1.).with_delay(-0.5);
        assert_eq!(bad_delay.validate(), Err(ProfileValidationError::InvalidDelay(-0.5)));

        let bad_loops = MotionProfile::move_to(Vec3::ONE, 1.).looping(LoopPolicy::Repeat, -3);
        assert_eq!(bad_loops.validate(), Err(ProfileValidationError::InvalidLoopCount(-3)));

        assert!(MotionProfile::move_to(Vec3::ONE, 1.).looping_forever(LoopPolicy::PingPong).is_valid());
    }

    #[test]
    fn nan_duration_is_rejected() {
        let profile = MotionProfile::move_to(Vec3::ONE, f32::NAN);
        assert!(!profile.is_valid());
    }

    #[test]
    fn local_path_is_always_local() {
        let world_path = MotionProfile::path([Vec3::ZERO, Vec3::X], 1.);
        assert_eq!(world_path.effective_path_space(), PathSpace::World);
        assert_eq!(world_path.clone().in_space(PathSpace::Local).effective_path_space(), PathSpace::Local);

        let local_path = MotionProfile::local_path([Vec3::ZERO, Vec3::X], 1.);
        assert_eq!(local_path.effective_path_space(), PathSpace::Local);
    }
}
