/*
This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
If a copy of the MPL was not distributed with this file,
You can obtain one at https://mozilla.org/MPL/2.0/.
*/
//! Turns (profile, current pose) into a ready-to-play MotionInstance.
//!
//! This is the only place where relative targets are resolved and ease names looked up,
//! so once an instance exists it is fully self-contained.
use bevy::prelude::*;

use crate::ease::EaseLookup;
use crate::errors::ProfileValidationError;
use crate::motion_instance::{LoopMode, MotionInstance, MotionTrack, TranslationAxis, WaypointPath};
use crate::motion_profile::{LoopPolicy, MotionKind, MotionProfile, PathSpace};
use crate::pose::MotionPose;
use crate::types::INFINITE_LOOPS;

/// A stateless factory for MotionInstances.
#[derive(Debug, Clone, Copy, Default)]
pub struct MotionExecutor;

impl MotionExecutor {
    /// Validates the profile and builds an Idle instance for it.
    ///
    /// Nothing is built (and nothing else happens) if validation or ease lookup fails.
    pub fn build(
        profile: &MotionProfile,
        pose: &MotionPose,
        eases: EaseLookup,
    ) -> Result<MotionInstance, ProfileValidationError> {
        profile.validate()?;
        let ease = eases.resolve(&profile.ease)?;
        let track = Self::resolve_track(profile, pose);

        Ok(MotionInstance::new(
            track,
            ease,
            profile.duration,
            profile.delay,
            Self::loop_mode(profile.loop_policy, profile.loop_count),
        ))
    }

    /// Maps an authored loop policy and count onto a LoopMode.
    ///
    /// Total over all inputs: counts of 0 and 1 both mean a single play,
    /// and anything at or below -1 means infinite.
    pub fn loop_mode(policy: LoopPolicy, count: i32) -> LoopMode {
        let cycles = match count {
            c if c <= INFINITE_LOOPS => None,
            0 => Some(1),
            c => Some(c.unsigned_abs()),
        };

        match policy {
            LoopPolicy::None => LoopMode::Once,
            LoopPolicy::Repeat => LoopMode::Restart { cycles },
            LoopPolicy::PingPong => LoopMode::Alternate { cycles },
        }
    }

    /// Bakes the pose into concrete start/end values.
    pub fn resolve_track(profile: &MotionProfile, pose: &MotionPose) -> MotionTrack {
        match profile.kind {
            MotionKind::Move => MotionTrack::Translate {
                from: pose.world_translation,
                to: profile.resolve_target_position(pose.world_translation),
            },
            MotionKind::MoveAxisX => MotionTrack::TranslateAxis {
                axis: TranslationAxis::X,
                from: pose.world_translation.x,
                to: profile.resolve_scalar_target(pose.world_translation.x),
            },
            MotionKind::MoveAxisY => MotionTrack::TranslateAxis {
                axis: TranslationAxis::Y,
                from: pose.world_translation.y,
                to: profile.resolve_scalar_target(pose.world_translation.y),
            },
            MotionKind::Jump => MotionTrack::Jump {
                from: pose.world_translation,
                to: profile.resolve_target_position(pose.world_translation),
                height: profile.jump_height,
                arcs: profile.jump_arcs,
            },
            MotionKind::Rotate => {
                let turn = Quat::from_rotation_z(profile.scalar_target.to_radians());
                let to = match profile.use_relative {
                    true => pose.rotation * turn,
                    false => turn,
                };
                MotionTrack::Rotate { from: pose.rotation, to }
            },
            MotionKind::Scale => MotionTrack::Scale {
                from: pose.scale,
                to: profile.resolve_target_scale(pose.scale),
            },
            MotionKind::Path | MotionKind::LocalPath => {
                let space = profile.effective_path_space();
                let origin = match space {
                    PathSpace::World => pose.world_translation,
                    PathSpace::Local => pose.local_translation,
                };
                MotionTrack::Path {
                    path: WaypointPath::new(profile.resolve_waypoints(origin), profile.path_interpolation),
                    space,
                }
            },
        }
    }
}
