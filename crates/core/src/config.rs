/*
This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
If a copy of the MPL was not distributed with this file,
You can obtain one at https://mozilla.org/MPL/2.0/.
*/
use bevy::prelude::*;

use crate::types::{
    InputActionName,
    DEFAULT_DISMOUNT_SIDE_OFFSET,
    DEFAULT_INTERACT_ACTION,
    DEFAULT_JUMP_SPEED_THRESHOLD,
    DEFAULT_MOVE_EPSILON,
};

/// App-wide tuning knobs.
///
/// Initialized with defaults by the plugins; overwrite it with `app.insert_resource()`
/// to tweak. Read every tick, so runtime changes apply immediately.
#[derive(Resource, Reflect, Debug, Clone)]
pub struct HelmsmanConfig {
    /// Horizontal speed above which an entity counts as moving (Walk / VehicleMove).
    pub move_epsilon: f32,

    /// Upwards speed above which a grounded entity counts as jumping.
    pub jump_speed_threshold: f32,

    /// The input action that mounts/dismounts.
    pub interact_action: InputActionName,

    /// Fallback dismount distance to the vehicle's right when it has no exit anchor.
    pub dismount_side_offset: f32,
}

impl Default for HelmsmanConfig {
    fn default() -> Self {
        Self {
            move_epsilon: DEFAULT_MOVE_EPSILON,
            jump_speed_threshold: DEFAULT_JUMP_SPEED_THRESHOLD,
            interact_action: DEFAULT_INTERACT_ACTION.to_owned(),
            dismount_side_offset: DEFAULT_DISMOUNT_SIDE_OFFSET,
        }
    }
}

impl HelmsmanConfig {
    pub fn with_interact_action<IS: Into<InputActionName>>(mut self, action: IS) -> Self {
        self.interact_action = action.into();
        self
    }

    pub fn with_move_epsilon(mut self, epsilon: f32) -> Self {
        self.move_epsilon = epsilon;
        self
    }

    pub fn with_dismount_side_offset(mut self, offset: f32) -> Self {
        self.dismount_side_offset = offset;
        self
    }
}

/// The fixed-step phases Helmsman runs in, in this order, when `HelmsmanPlugin` is used.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HelmsmanSystems {
    /// Vehicle interaction zones are (re)evaluated.
    Proximity,
    /// The interact action is sampled and mount/dismount queued.
    Interaction,
    /// Input bridges push forces/velocities into the active entity's body.
    Forces,
    /// Motion instances advance and write poses.
    Motion,
    /// Movement state machines re-evaluate from the resulting physics state.
    StateMachines,
    /// Per-tick input edges (just pressed / just released) are consumed.
    ConsumeInput,
}
