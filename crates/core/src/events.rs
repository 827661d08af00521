/*
This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
If a copy of the MPL was not distributed with this file,
You can obtain one at https://mozilla.org/MPL/2.0/.
*/
//! Events raised and consumed by Helmsman.
//!
//! Everything here is an EntityEvent, so you can observe it globally (`app.add_observer()`)
//! or per-entity (`commands.entity(e).observe()`). Events tied to one transition are fired
//! exactly once and in a fixed order: a superseded motion reports `MotionKilled` before the
//! new one reports `MotionStarted`; state machines exit the old state, enter the new one and
//! only then raise `ActionChanged`/`EnvironmentChanged`.
use bevy::prelude::*;

use crate::controlled::MotionCommand;
use crate::environment::{ActionKind, EnvironmentKind};

/// Asks a ControlledEntity to do something with its motion (start, stop, pause, ...).
#[derive(EntityEvent, Debug, Clone)]
pub struct MotionCommandIssued {
    /// The ControlledEntity to command.
    pub entity: Entity,
    pub command: MotionCommand,
}

impl MotionCommandIssued {
    pub fn new(entity: Entity, command: MotionCommand) -> Self {
        Self { entity, command }
    }
}

/// A ControlledEntity successfully started a new motion.
#[derive(EntityEvent, Debug, Clone, Copy)]
pub struct MotionStarted {
    pub entity: Entity,
}

/// A motion ran out of loops naturally. Never raised for loop boundaries.
#[derive(EntityEvent, Debug, Clone, Copy)]
pub struct MotionCompleted {
    pub entity: Entity,
}

/// A motion was stopped explicitly or superseded by a new one.
#[derive(EntityEvent, Debug, Clone, Copy)]
pub struct MotionKilled {
    pub entity: Entity,
}

/// The inner (action) state of a MovementStateMachine changed.
#[derive(EntityEvent, Debug, Clone, Copy)]
pub struct ActionChanged {
    pub entity: Entity,
    pub from: ActionKind,
    pub to: ActionKind,
}

/// The outer (environment) state of a MovementStateMachine changed.
#[derive(EntityEvent, Debug, Clone, Copy)]
pub struct EnvironmentChanged {
    pub entity: Entity,
    pub from: EnvironmentKind,
    pub to: EnvironmentKind,
}

/// Asks a MovementStateMachine to switch environments by name (e.g. a surface tag).
///
/// Unknown names are logged and ignored.
#[derive(EntityEvent, Debug, Clone)]
pub struct EnvironmentChangeRequested {
    pub entity: Entity,
    pub environment: String,
}

/// Control authority moved to a new entity.
#[derive(EntityEvent, Debug, Clone, Copy)]
pub struct ControlAuthorityChanged {
    /// The entity that now receives driving input.
    pub entity: Entity,
    /// The entity that held authority before; None on initialization.
    pub previous: Option<Entity>,
}

/// The player got into a vehicle.
#[derive(EntityEvent, Debug, Clone, Copy)]
pub struct VehicleMounted {
    /// The vehicle.
    pub entity: Entity,
    pub player: Entity,
}

/// The player got out of a vehicle.
#[derive(EntityEvent, Debug, Clone, Copy)]
pub struct VehicleDismounted {
    /// The vehicle.
    pub entity: Entity,
    pub player: Entity,
}

/// Something entered a vehicle's interaction zone.
///
/// Raised by the built-in `detect_proximity` system, but external trigger
/// backends (e.g. physics sensors) may raise it as well.
#[derive(EntityEvent, Debug, Clone, Copy)]
pub struct ProximityEntered {
    /// The vehicle owning the zone.
    pub entity: Entity,
    pub other: Entity,
}

/// Something left a vehicle's interaction zone.
#[derive(EntityEvent, Debug, Clone, Copy)]
pub struct ProximityExited {
    /// The vehicle owning the zone.
    pub entity: Entity,
    pub other: Entity,
}
