/*
This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
If a copy of the MPL was not distributed with this file,
You can obtain one at https://mozilla.org/MPL/2.0/.
*/

//! Core of Helmsman: declarative motion, movement state machines and control authority
//! for controllable entities in a Bevy world.
//!
//! Each subsystem comes with its own Plugin (`MotionPlugin`, `MovementStatePlugin`,
//! `InputForcePlugin`, `ControlAuthorityPlugin`, `ProximityPlugin`). Everything that runs
//! per-step lives in `FixedUpdate`, inside one of the `HelmsmanSystems` sets; the
//! `helmsman-bevy-plugin` crate orders those sets for you.

pub mod authority;
pub mod bridge;
pub mod config;
pub mod controlled;
pub mod ease;
pub mod environment;
pub mod errors;
pub mod events;
pub mod executor;
pub mod forces;
pub mod input;
pub mod motion_instance;
pub mod motion_profile;
pub mod physics;
pub mod pose;
pub mod proximity;
pub mod state_machine;
pub mod types;

pub mod prelude {
    pub use crate::authority::{ControlAuthority, ControlAuthorityCommandsExt, ControlAuthorityPlugin};
    pub use crate::bridge::{
        CameraConfig, CameraKind, ControlBindings, DirectionType, ForceConfig, InputForceBridge,
        LinearMode, MainCamera, MovementMode, RotationalMode,
    };
    pub use crate::config::{HelmsmanConfig, HelmsmanSystems};
    pub use crate::controlled::{ControlledEntity, MotionCommand, MotionPlugin};
    pub use crate::ease::EaseRegistry;
    pub use crate::errors::{AuthorityError, ProfileValidationError, UnknownEaseStrategy, UnknownEaseStrategyConfig};
    pub use crate::environment::{
        ActionKind, EnvironmentKind, GroundSensor, MovementStateMachine, MovementStatePlugin,
    };
    pub use crate::events::*;
    pub use crate::forces::InputForcePlugin;
    pub use crate::input::{ActionInputs, InputPhase, InputSignalKind, InputSource, InputValue, InteractionMode};
    pub use crate::motion_instance::MotionState;
    pub use crate::motion_profile::{LoopPolicy, MotionKind, MotionProfile, PathInterpolation, PathSpace};
    pub use crate::physics::{ForceMode, PhysicsBody};
    pub use crate::proximity::{InteractionVolume, InteractionZone, Player, ProximityPlugin, Vehicle};
}
