/*
This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
If a copy of the MPL was not distributed with this file,
You can obtain one at https://mozilla.org/MPL/2.0/.
*/
//! Type aliases and shared constants.

/// Keyed lookups used throughout the crate (ease registry, per-environment action sets, ...).
pub type HelmsmanKvMap<K, V> = bevy::platform::collections::HashMap<K, V>;

pub type EaseKey = String;

/// Names an input action as the host's input layer knows it (e.g. "Move", "Jump", "Interact").
pub type InputActionName = String;

// Type aliases - to express intent better.
pub type PlayerEntity = bevy::prelude::Entity;
pub type VehicleEntity = bevy::prelude::Entity;
pub type ControlledEntityId = bevy::prelude::Entity;

/// Horizontal speed (m/s) above which a grounded entity counts as walking/moving.
pub const DEFAULT_MOVE_EPSILON: f32 = 0.01;

/// Upwards speed (m/s) above which a grounded entity counts as jumping.
pub const DEFAULT_JUMP_SPEED_THRESHOLD: f32 = 0.5;

/// How far to the side of a vehicle a dismounting player lands when the vehicle has no exit anchor.
pub const DEFAULT_DISMOUNT_SIDE_OFFSET: f32 = 2.0;

/// The input action that toggles mounting/dismounting by default.
pub const DEFAULT_INTERACT_ACTION: &str = "Interact";

/// Loop count meaning "loop forever".
pub const INFINITE_LOOPS: i32 = -1;
