/*
This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
If a copy of the MPL was not distributed with this file,
You can obtain one at https://mozilla.org/MPL/2.0/.
*/
//! ControlledEntity - anything that can be driven by input or by authored motions.
//!
//! A ControlledEntity owns at most one MotionInstance at a time. Starting a new motion
//! always supersedes (kills) the old one. It also remembers a rest pose to snap back to
//! and whether it currently holds control authority.
//!
//! Lifecycle changes are buffered as notifications on the component and turned into
//! `MotionStarted`/`MotionCompleted`/`MotionKilled` events by the systems in this module,
//! in the order they happened.
use bevy::prelude::*;

use crate::config::HelmsmanSystems;
use crate::ease::{EaseLookup, EaseRegistry};
use crate::errors::{ProfileValidationError, UnknownEaseStrategyConfig};
use crate::events::{MotionCommandIssued, MotionCompleted, MotionKilled, MotionStarted};
use crate::executor::MotionExecutor;
use crate::motion_instance::{MotionInstance, MotionSample, MotionState, TickEvent, TranslationAxis};
use crate::motion_profile::{MotionProfile, PathSpace};
use crate::physics::PhysicsBody;
use crate::pose::{MotionPose, RestPose};

/// Something you can tell a ControlledEntity to do with its motion.
#[derive(Debug, Clone)]
pub enum MotionCommand {
    /// Supersede whatever is running with a new motion.
    Start(MotionProfile),
    Stop,
    Pause,
    Resume,
    /// Rewind the current motion, or rebuild the last profile if it was stopped.
    Restart,
    ResetToRestPose,
    RecacheRestPose,
}

/// A motion lifecycle edge waiting to be announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionNotification {
    Started,
    Completed,
    Killed,
}

/// Marks an entity as controllable and holds its motion state.
#[derive(Component, Debug, Default)]
#[require(Transform, PhysicsBody)]
pub struct ControlledEntity {
    rest_pose: Option<RestPose>,
    motion: Option<MotionInstance>,

    /// The last profile successfully started; used by `restart()` after a stop.
    last_profile: Option<MotionProfile>,

    is_moving: bool,
    is_active: bool,

    /// Played as soon as the entity is picked up by the motion systems.
    auto_start: Option<MotionProfile>,

    pending: Vec<MotionNotification>,
}

impl ControlledEntity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plays `profile` as soon as the entity is first seen by the motion systems.
    pub fn with_auto_start(profile: MotionProfile) -> Self {
        Self { auto_start: Some(profile), ..default() }
    }

    /// Whether this entity currently holds control authority.
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Only the ControlAuthority is supposed to flip this.
    pub(crate) fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }

    /// True while a started motion is still playing (including while paused).
    pub fn is_moving(&self) -> bool {
        self.is_moving && self.motion.as_ref().is_some_and(MotionInstance::is_live)
    }

    pub fn motion(&self) -> Option<&MotionInstance> {
        self.motion.as_ref()
    }

    pub fn motion_state(&self) -> Option<MotionState> {
        self.motion.as_ref().map(MotionInstance::state)
    }

    pub fn last_profile(&self) -> Option<&MotionProfile> {
        self.last_profile.as_ref()
    }

    pub fn rest_pose(&self) -> Option<&RestPose> {
        self.rest_pose.as_ref()
    }

    /// Fraction of the current motion played; 0 if there is none.
    pub fn progress(&self) -> f32 {
        match &self.motion {
            Some(motion) if motion.state() != MotionState::Killed => motion.progress(),
            _ => 0.,
        }
    }

    /// Builds and plays a new motion, killing the current one first.
    ///
    /// Invalid profiles are refused before anything is killed, so a bad request
    /// leaves the current motion untouched.
    pub fn start_motion(
        &mut self,
        profile: MotionProfile,
        pose: &MotionPose,
        eases: EaseLookup,
    ) -> Result<(), ProfileValidationError> {
        let mut instance = MotionExecutor::build(&profile, pose, eases)?;

        self.stop();
        instance.play();

        self.motion = Some(instance);
        self.last_profile = Some(profile);
        self.is_moving = true;
        self.pending.push(MotionNotification::Started);
        Ok(())
    }

    /// Kills the current motion, if any. Returns whether something was killed.
    pub fn stop(&mut self) -> bool {
        self.is_moving = false;
        match self.motion.take() {
            Some(mut motion) => {
                if motion.kill() {
                    self.pending.push(MotionNotification::Killed);
                    true
                } else {
                    false
                }
            },
            None => false,
        }
    }

    /// Only affects an Active motion.
    pub fn pause(&mut self) -> bool {
        self.motion.as_mut().is_some_and(MotionInstance::pause)
    }

    /// Only affects a Paused motion.
    pub fn resume(&mut self) -> bool {
        self.motion.as_mut().is_some_and(MotionInstance::resume)
    }

    /// Rewinds the current motion; if it was stopped, rebuilds it from the last profile.
    ///
    /// Rewinding a Completed motion starts a new run and announces it as Started. A motion
    /// that is still playing or paused keeps its run, so no second Started is announced.
    /// With neither a motion nor a last profile this is a logged no-op.
    pub fn restart(&mut self, pose: &MotionPose, eases: EaseLookup) -> Result<(), ProfileValidationError> {
        if let Some(motion) = self.motion.as_mut() {
            let was_live = motion.is_live();
            if motion.restart() {
                self.is_moving = true;
                if !was_live {
                    self.pending.push(MotionNotification::Started);
                }
                return Ok(());
            }
        }

        match self.last_profile.clone() {
            Some(profile) => self.start_motion(profile, pose, eases),
            None => {
                #[cfg(feature = "logging")]
                bevy::log::warn!("Restart requested, but nothing was ever started - ignoring.");
                Ok(())
            },
        }
    }

    pub fn recache_rest_pose(&mut self, transform: &Transform) {
        self.rest_pose = Some(RestPose::capture(transform));
    }

    /// Stops any motion and teleports back to the rest pose, at rest.
    pub fn reset_to_rest_pose(&mut self, transform: &mut Transform, body: Option<&mut PhysicsBody>) {
        self.stop();

        let Some(rest) = self.rest_pose else {
            #[cfg(feature = "logging")]
            bevy::log::warn!("Reset requested before a rest pose was cached - ignoring.");
            return;
        };

        rest.apply_to(transform);
        if let Some(body) = body {
            body.zero_motion();
        }
    }

    /// Advances the motion clock. Returns the pose sample to apply, if any.
    pub fn tick(&mut self, dt: f32) -> Option<MotionSample> {
        let motion = self.motion.as_mut()?;
        let outcome = motion.tick(dt);

        match outcome.event {
            Some(TickEvent::Completed) => {
                self.is_moving = false;
                self.pending.push(MotionNotification::Completed);
            },
            Some(TickEvent::LoopBoundary { cycle: _cycle, crossed: _crossed }) => {
                #[cfg(feature = "logging")]
                bevy::log::trace!("Motion entered cycle {} ({} boundaries crossed)", _cycle, _crossed);
            },
            None => {},
        }

        outcome.sample
    }

    /// Takes all buffered notifications, oldest first.
    pub fn drain_notifications(&mut self) -> impl Iterator<Item = MotionNotification> + '_ {
        self.pending.drain(..)
    }
}

/// Writes a motion sample into a Transform.
///
/// World-space translations of parented entities are converted through the parent's transform.
pub fn apply_motion_sample(sample: MotionSample, transform: &mut Transform, parent: Option<&GlobalTransform>) {
    let to_local = |world: Vec3| match parent {
        Some(parent) => parent.affine().inverse().transform_point3(world),
        None => world,
    };

    match sample {
        MotionSample::Translation { value, space: PathSpace::Local } => transform.translation = value,
        MotionSample::Translation { value, space: PathSpace::World } => transform.translation = to_local(value),
        MotionSample::TranslationAxis { axis, value } => {
            let mut world = match parent {
                Some(parent) => parent.transform_point(transform.translation),
                None => transform.translation,
            };
            match axis {
                TranslationAxis::X => world.x = value,
                TranslationAxis::Y => world.y = value,
            }
            transform.translation = to_local(world);
        },
        MotionSample::Rotation(rotation) => transform.rotation = rotation,
        MotionSample::Scale(scale) => transform.scale = scale,
    }
}

/// Announces buffered motion notifications as events.
pub fn dispatch_motion_notifications(entity: Entity, controlled: &mut ControlledEntity, commands: &mut Commands) {
    for notification in controlled.drain_notifications() {
        match notification {
            MotionNotification::Started => commands.trigger(MotionStarted { entity }),
            MotionNotification::Completed => commands.trigger(MotionCompleted { entity }),
            MotionNotification::Killed => commands.trigger(MotionKilled { entity }),
        }
    }
}

fn current_pose(transform: &Transform, parent: Option<&GlobalTransform>) -> MotionPose {
    match parent {
        Some(parent) => MotionPose::from_parented(transform, parent),
        None => MotionPose::from_transform(transform),
    }
}

/// Caches rest poses for new ControlledEntities and kicks off their auto-start motions.
pub fn init_controlled_entities(
    mut query: Query<(Entity, &mut ControlledEntity, &Transform), Added<ControlledEntity>>,
    mut commands: Commands,
) {
    for (entity, mut controlled, transform) in query.iter_mut() {
        if controlled.rest_pose.is_none() {
            controlled.recache_rest_pose(transform);
        }

        if let Some(profile) = controlled.auto_start.take() {
            #[cfg(feature = "logging")]
            bevy::log::debug!("Auto-starting a {:?} motion for {:?}", profile.kind, entity);
            commands.trigger(MotionCommandIssued::new(entity, MotionCommand::Start(profile)));
        }
    }
}

/// Advances every motion by one fixed step and writes the resulting poses.
pub fn tick_motions(
    time: Res<Time>,
    mut query: Query<(Entity, &mut ControlledEntity, &mut Transform, Option<&ChildOf>)>,
    parents: Query<&GlobalTransform>,
    mut commands: Commands,
) {
    let dt = time.delta_secs();

    for (entity, mut controlled, mut transform, child_of) in query.iter_mut() {
        let parent = child_of.and_then(|child_of| parents.get(child_of.parent()).ok());

        if let Some(sample) = controlled.tick(dt) {
            apply_motion_sample(sample, &mut transform, parent);
        }

        dispatch_motion_notifications(entity, &mut controlled, &mut commands);
    }
}

/// Executes MotionCommandIssued requests.
pub fn handle_motion_command(
    event: On<MotionCommandIssued>,
    mut query: Query<(&mut ControlledEntity, &mut Transform, Option<&mut PhysicsBody>, Option<&ChildOf>)>,
    parents: Query<&GlobalTransform>,
    ease_registry: Option<Res<EaseRegistry>>,
    ease_strategy: Option<Res<UnknownEaseStrategyConfig>>,
    mut commands: Commands,
) {
    let entity = event.entity;

    let Ok((mut controlled, mut transform, body, child_of)) = query.get_mut(entity) else {
        #[cfg(feature = "logging")]
        bevy::log::warn!("Motion command {:?} sent to {:?}, which is not a ControlledEntity - ignoring.", event.command, entity);
        return;
    };

    let parent = child_of.and_then(|child_of| parents.get(child_of.parent()).ok());
    let pose = current_pose(&transform, parent);
    let eases = EaseLookup::new(ease_registry.as_deref(), ease_strategy.as_deref().map(|config| &config.0));

    if controlled.rest_pose.is_none() {
        controlled.recache_rest_pose(&transform);
    }

    let result = match &event.command {
        MotionCommand::Start(profile) => controlled.start_motion(profile.clone(), &pose, eases),
        MotionCommand::Restart => controlled.restart(&pose, eases),
        MotionCommand::Stop => {
            controlled.stop();
            Ok(())
        },
        MotionCommand::Pause => {
            controlled.pause();
            Ok(())
        },
        MotionCommand::Resume => {
            controlled.resume();
            Ok(())
        },
        MotionCommand::ResetToRestPose => {
            controlled.reset_to_rest_pose(&mut transform, body.map(|body| body.into_inner()));
            Ok(())
        },
        MotionCommand::RecacheRestPose => {
            controlled.recache_rest_pose(&transform);
            Ok(())
        },
    };

    if let Err(_err) = result {
        #[cfg(feature = "logging")]
        bevy::log::error!("Refusing motion for {:?}: {}", entity, _err);
    }

    dispatch_motion_notifications(entity, &mut controlled, &mut commands);
}

/// Runs authored motions: command handling, ticking and lifecycle events.
pub struct MotionPlugin;

impl Plugin for MotionPlugin {
    fn build(&self, app: &mut App) {
        app
            .init_resource::<EaseRegistry>()
            .init_resource::<UnknownEaseStrategyConfig>()
            .add_observer(handle_motion_command)
            .add_systems(
                FixedUpdate,
                (init_controlled_entities, tick_motions)
                    .chain()
                    .in_set(HelmsmanSystems::Motion),
            );
    }
}
