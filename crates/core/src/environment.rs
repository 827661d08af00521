/*
This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
If a copy of the MPL was not distributed with this file,
You can obtain one at https://mozilla.org/MPL/2.0/.
*/
//! Hierarchical movement state: an outer *environment* (Land, Water, ...) machine whose
//! states each own an inner *action* (Idle, Walk, ...) machine.
//!
//! Environment changes come from outside (ground probes, trigger volumes, designer events).
//! Action changes are derived every tick from physics signals, by rules specific to the
//! current environment. Entities on foot and vehicles use different action sets.
//!
//! Ordering guarantee: on any change, the old state exits, the new state enters, and
//! only then is the change reported.
use core::fmt;
use core::str::FromStr;

use bevy::prelude::*;

#[cfg(feature = "profile_loader")]
use serde::{Deserialize, Serialize};

use crate::config::{HelmsmanConfig, HelmsmanSystems};
use crate::events::{ActionChanged, EnvironmentChangeRequested, EnvironmentChanged};
use crate::physics::PhysicsBody;
use crate::state_machine::{MachineState, StateMachine, Transition};
use crate::types::{DEFAULT_JUMP_SPEED_THRESHOLD, DEFAULT_MOVE_EPSILON};

/// The kind of terrain (or medium) an entity is moving through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Reflect)]
#[cfg_attr(feature = "profile_loader", derive(Serialize, Deserialize))]
pub enum EnvironmentKind {
    #[default]
    Land,
    Water,
    Ice,
    Grass,
    Road,
    Air,
}

impl EnvironmentKind {
    pub const ALL: [Self; 6] = [Self::Land, Self::Water, Self::Ice, Self::Grass, Self::Road, Self::Air];

    /// Maps a surface tag from a ground probe onto an environment.
    ///
    /// Unrecognized tags count as plain Land, since *something* was hit.
    pub fn from_surface_tag(tag: &str) -> Self {
        tag.parse().unwrap_or(Self::Land)
    }
}

impl fmt::Display for EnvironmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEnvironment(pub String);

impl fmt::Display for UnknownEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown environment {:?}", self.0)
    }
}

impl FromStr for EnvironmentKind {
    type Err = UnknownEnvironment;

    /// Case-insensitive.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.to_string().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| UnknownEnvironment(name.to_owned()))
    }
}

/// What an entity is doing within its environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Reflect)]
#[cfg_attr(feature = "profile_loader", derive(Serialize, Deserialize))]
pub enum ActionKind {
    #[default]
    Idle,
    Walk,
    Jump,
    Swim,
    VehicleIdle,
    VehicleMove,
}

/// Which family of action rules a machine runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Reflect)]
pub enum MovementFlavor {
    #[default]
    OnFoot,
    Vehicle,
}

impl MovementFlavor {
    /// The action an entity settles into in an environment when nothing else applies.
    pub fn resting_action(&self, environment: EnvironmentKind) -> ActionKind {
        match (self, environment) {
            (Self::Vehicle, _) => ActionKind::VehicleIdle,
            (Self::OnFoot, EnvironmentKind::Water) => ActionKind::Swim,
            (Self::OnFoot, EnvironmentKind::Air) => ActionKind::Jump,
            (Self::OnFoot, _) => ActionKind::Idle,
        }
    }

    /// The actions available in an environment, the first one being the resting action.
    pub fn legal_actions(&self, environment: EnvironmentKind) -> &'static [ActionKind] {
        match (self, environment) {
            (Self::Vehicle, _) => &[ActionKind::VehicleIdle, ActionKind::VehicleMove],
            (Self::OnFoot, EnvironmentKind::Land) => &[ActionKind::Idle, ActionKind::Walk, ActionKind::Jump],
            (Self::OnFoot, EnvironmentKind::Water) => &[ActionKind::Swim],
            (Self::OnFoot, EnvironmentKind::Air) => &[ActionKind::Jump],
            (Self::OnFoot, EnvironmentKind::Ice | EnvironmentKind::Grass | EnvironmentKind::Road) => {
                &[ActionKind::Idle, ActionKind::Walk]
            },
        }
    }
}

/// Physics readings the action rules are evaluated on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementSignals {
    pub horizontal_speed: f32,
    pub vertical_speed: f32,
    pub grounded: bool,
    pub dt: f32,
}

impl Default for MovementSignals {
    fn default() -> Self {
        Self { horizontal_speed: 0., vertical_speed: 0., grounded: true, dt: 0. }
    }
}

impl MovementSignals {
    pub fn from_body(body: &PhysicsBody, grounded: bool, dt: f32) -> Self {
        Self {
            horizontal_speed: body.horizontal_speed(),
            vertical_speed: body.vertical_speed(),
            grounded,
            dt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct MovementThresholds {
    pub move_epsilon: f32,
    pub jump_speed: f32,
}

impl Default for MovementThresholds {
    fn default() -> Self {
        Self { move_epsilon: DEFAULT_MOVE_EPSILON, jump_speed: DEFAULT_JUMP_SPEED_THRESHOLD }
    }
}

impl From<&HelmsmanConfig> for MovementThresholds {
    fn from(config: &HelmsmanConfig) -> Self {
        Self { move_epsilon: config.move_epsilon, jump_speed: config.jump_speed_threshold }
    }
}

/// A state change worth telling the world about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementStateChange {
    Action(Transition<ActionKind>),
    Environment(Transition<EnvironmentKind>),
}

/// What the hooks get to see. Changes are appended to `changes` in the order they happen.
#[derive(Debug)]
pub struct MovementContext<'a> {
    pub signals: MovementSignals,
    pub thresholds: MovementThresholds,
    pub changes: &'a mut Vec<MovementStateChange>,
}

/// An inner state. Keeps track of how long it has been running.
#[derive(Debug, Clone, Default, PartialEq, Reflect)]
pub struct ActionState {
    pub kind: ActionKind,
    pub time_in_state: f32,
    pub times_entered: u32,
}

impl ActionState {
    pub fn new(kind: ActionKind) -> Self {
        Self { kind, ..default() }
    }
}

impl MachineState<MovementContext<'_>> for ActionState {
    fn enter(&mut self, _ctx: &mut MovementContext<'_>) {
        self.time_in_state = 0.;
        self.times_entered += 1;
    }

    fn update(&mut self, ctx: &mut MovementContext<'_>) {
        self.time_in_state += ctx.signals.dt;
    }
}

/// An outer state, owning the inner action machine for its environment.
#[derive(Debug, Clone)]
pub struct EnvironmentState {
    kind: EnvironmentKind,
    flavor: MovementFlavor,
    actions: StateMachine<ActionKind, ActionState>,
}

impl EnvironmentState {
    pub fn new(kind: EnvironmentKind, flavor: MovementFlavor) -> Self {
        let resting = flavor.resting_action(kind);
        let others = flavor
            .legal_actions(kind)
            .iter()
            .filter(|action| **action != resting)
            .map(|action| (*action, ActionState::new(*action)));

        let actions = StateMachine::starting_with(resting, ActionState::new(resting), others);
        Self { kind, flavor, actions }
    }

    pub fn kind(&self) -> EnvironmentKind {
        self.kind
    }

    pub fn current_action(&self) -> ActionKind {
        self.actions.current()
    }

    pub fn action_state(&self) -> Option<&ActionState> {
        self.actions.current_state()
    }

    /// The action the rules pick for these signals. Always one of this environment's legal actions.
    pub fn determine_action(&self, signals: &MovementSignals, thresholds: &MovementThresholds) -> ActionKind {
        let moving = signals.horizontal_speed > thresholds.move_epsilon;

        match (self.flavor, self.kind) {
            (MovementFlavor::Vehicle, _) => match moving {
                true => ActionKind::VehicleMove,
                false => ActionKind::VehicleIdle,
            },
            (MovementFlavor::OnFoot, EnvironmentKind::Water) => ActionKind::Swim,
            (MovementFlavor::OnFoot, EnvironmentKind::Air) => ActionKind::Jump,
            (MovementFlavor::OnFoot, EnvironmentKind::Land)
                if !signals.grounded || signals.vertical_speed > thresholds.jump_speed => ActionKind::Jump,
            (MovementFlavor::OnFoot, _) => match moving {
                true => ActionKind::Walk,
                false => ActionKind::Idle,
            },
        }
    }
}

impl MachineState<MovementContext<'_>> for EnvironmentState {
    fn enter(&mut self, ctx: &mut MovementContext<'_>) {
        let desired = self.determine_action(&ctx.signals, &ctx.thresholds);
        self.actions.jump_to(desired);
        self.actions.enter_current(ctx);
    }

    fn exit(&mut self, ctx: &mut MovementContext<'_>) {
        self.actions.exit_current(ctx);
    }

    fn update(&mut self, ctx: &mut MovementContext<'_>) {
        let desired = self.determine_action(&ctx.signals, &ctx.thresholds);
        if let Some(transition) = self.actions.transition_to(desired, ctx) {
            ctx.changes.push(MovementStateChange::Action(transition));
        }
        self.actions.update(ctx);
    }
}

/// The two-level machine: environments outside, actions inside.
#[derive(Debug, Clone)]
pub struct HierarchicalStateMachine {
    environments: StateMachine<EnvironmentKind, EnvironmentState>,
    pub thresholds: MovementThresholds,
}

impl HierarchicalStateMachine {
    /// A machine covering the given environments, resting in Land/Idle (or its flavor's equivalent).
    ///
    /// Land is always included, as it is the initial environment.
    pub fn new<I: IntoIterator<Item = EnvironmentKind>>(flavor: MovementFlavor, environments: I) -> Self {
        let others = environments
            .into_iter()
            .filter(|env| *env != EnvironmentKind::Land)
            .map(|env| (env, EnvironmentState::new(env, flavor)));

        let environments = StateMachine::starting_with(
            EnvironmentKind::Land,
            EnvironmentState::new(EnvironmentKind::Land, flavor),
            others,
        );

        let mut machine = Self { environments, thresholds: MovementThresholds::default() };
        let mut discarded = Vec::new();
        let mut ctx = MovementContext {
            signals: MovementSignals::default(),
            thresholds: machine.thresholds,
            changes: &mut discarded,
        };
        machine.environments.enter_current(&mut ctx);
        machine
    }

    /// For walking/swimming characters, in every environment.
    pub fn on_foot() -> Self {
        Self::new(MovementFlavor::OnFoot, EnvironmentKind::ALL)
    }

    /// For vehicles, in every environment.
    pub fn vehicle() -> Self {
        Self::new(MovementFlavor::Vehicle, EnvironmentKind::ALL)
    }

    pub fn with_thresholds(mut self, thresholds: MovementThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn environment(&self) -> EnvironmentKind {
        self.environments.current()
    }

    pub fn action(&self) -> ActionKind {
        self.environments.current_state().map(EnvironmentState::current_action).unwrap_or_default()
    }

    pub fn action_state(&self) -> Option<&ActionState> {
        self.environments.current_state().and_then(EnvironmentState::action_state)
    }

    pub fn supports(&self, environment: EnvironmentKind) -> bool {
        self.environments.contains(environment)
    }

    /// What the current environment's rules would pick for `signals`.
    pub fn determine_action(&self, signals: &MovementSignals) -> ActionKind {
        self.environments
            .current_state()
            .map(|env| env.determine_action(signals, &self.thresholds))
            .unwrap_or_default()
    }

    /// Switches environments. Unsupported environments are ignored with a warning.
    pub fn change_environment(
        &mut self,
        environment: EnvironmentKind,
        signals: MovementSignals,
        changes: &mut Vec<MovementStateChange>,
    ) -> bool {
        if !self.supports(environment) {
            #[cfg(feature = "logging")]
            bevy::log::warn!("Environment {:?} is not supported by this state machine - ignoring.", environment);
            return false;
        }

        let old_action = self.action();
        let mut ctx = MovementContext { signals, thresholds: self.thresholds, changes };

        match self.environments.transition_to(environment, &mut ctx) {
            Some(transition) => {
                let new_action = self.action();
                ctx.changes.push(MovementStateChange::Environment(transition));
                if new_action != old_action {
                    ctx.changes.push(MovementStateChange::Action(Transition { from: old_action, to: new_action }));
                }
                true
            },
            None => false,
        }
    }

    /// Re-evaluates the current action from `signals` and advances state timers.
    pub fn tick(&mut self, signals: MovementSignals, changes: &mut Vec<MovementStateChange>) {
        let mut ctx = MovementContext { signals, thresholds: self.thresholds, changes };
        self.environments.update(&mut ctx);
    }
}

impl Default for HierarchicalStateMachine {
    fn default() -> Self {
        Self::on_foot()
    }
}

/// The ECS handle for a HierarchicalStateMachine.
#[derive(Component, Debug, Clone, Default, Deref, DerefMut)]
pub struct MovementStateMachine(pub HierarchicalStateMachine);

impl MovementStateMachine {
    pub fn on_foot() -> Self {
        Self(HierarchicalStateMachine::on_foot())
    }

    pub fn vehicle() -> Self {
        Self(HierarchicalStateMachine::vehicle())
    }
}

/// The latest ground probe result for an entity, written by whatever does the probing
/// (a raycast, a trigger volume, a designer script...).
///
/// Changing `environment` switches the entity's MovementStateMachine on the next tick.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
pub struct GroundSensor {
    pub environment: EnvironmentKind,
    pub grounded: bool,
}

impl Default for GroundSensor {
    fn default() -> Self {
        Self { environment: EnvironmentKind::Land, grounded: true }
    }
}

impl GroundSensor {
    /// Records a probe result: the tag of whatever was hit, or None if nothing was.
    ///
    /// A hit counts as grounded in the tagged environment; a miss means airborne.
    pub fn report_probe(&mut self, hit_surface_tag: Option<&str>) {
        let (environment, grounded) = match hit_surface_tag {
            Some(tag) => (EnvironmentKind::from_surface_tag(tag), true),
            None => (EnvironmentKind::Air, false),
        };

        // Avoid tripping change detection for identical readings.
        if self.environment != environment || self.grounded != grounded {
            self.environment = environment;
            self.grounded = grounded;
        }
    }
}

fn announce_changes(entity: Entity, changes: &mut Vec<MovementStateChange>, commands: &mut Commands) {
    for change in changes.drain(..) {
        match change {
            MovementStateChange::Action(Transition { from, to }) => {
                #[cfg(feature = "logging")]
                bevy::log::debug!("{:?}: action {:?} -> {:?}", entity, from, to);
                commands.trigger(ActionChanged { entity, from, to });
            },
            MovementStateChange::Environment(Transition { from, to }) => {
                #[cfg(feature = "logging")]
                bevy::log::debug!("{:?}: environment {:?} -> {:?}", entity, from, to);
                commands.trigger(EnvironmentChanged { entity, from, to });
            },
        }
    }
}

/// Feeds sensors and physics into every MovementStateMachine, once per fixed step.
pub fn update_movement_state_machines(
    time: Res<Time>,
    config: Option<Res<HelmsmanConfig>>,
    mut query: Query<(Entity, &mut MovementStateMachine, Option<&PhysicsBody>, Option<Ref<GroundSensor>>)>,
    mut commands: Commands,
) {
    let dt = time.delta_secs();
    let thresholds = config.as_deref().map(MovementThresholds::from);
    let mut changes = Vec::new();

    for (entity, mut machine, body, sensor) in query.iter_mut() {
        if let Some(thresholds) = thresholds {
            machine.thresholds = thresholds;
        }

        let grounded = sensor.as_ref().is_none_or(|sensor| sensor.grounded);
        let signals = match body {
            Some(body) => MovementSignals::from_body(body, grounded, dt),
            None => MovementSignals { grounded, dt, ..default() },
        };

        if let Some(sensor) = sensor.as_ref().filter(|sensor| sensor.is_changed()) {
            if sensor.environment != machine.environment() {
                machine.change_environment(sensor.environment, signals, &mut changes);
            }
        }

        machine.tick(signals, &mut changes);
        announce_changes(entity, &mut changes, &mut commands);
    }
}

/// Handles environment switches requested by name.
pub fn handle_environment_change_request(
    event: On<EnvironmentChangeRequested>,
    time: Res<Time>,
    mut query: Query<(&mut MovementStateMachine, Option<&PhysicsBody>, Option<&GroundSensor>)>,
    mut commands: Commands,
) {
    let entity = event.entity;

    let environment = match event.environment.parse::<EnvironmentKind>() {
        Ok(environment) => environment,
        Err(_err) => {
            #[cfg(feature = "logging")]
            bevy::log::warn!("{:?}: {} - ignoring.", entity, _err);
            return;
        }
    };

    let Ok((mut machine, body, sensor)) = query.get_mut(entity) else {
        #[cfg(feature = "logging")]
        bevy::log::warn!("{:?} has no MovementStateMachine - ignoring environment request.", entity);
        return;
    };

    let grounded = sensor.is_none_or(|sensor| sensor.grounded);
    let signals = match body {
        Some(body) => MovementSignals::from_body(body, grounded, time.delta_secs()),
        None => MovementSignals { grounded, ..default() },
    };

    let mut changes = Vec::new();
    machine.change_environment(environment, signals, &mut changes);
    announce_changes(entity, &mut changes, &mut commands);
}

/// Runs movement state machines.
pub struct MovementStatePlugin;

impl Plugin for MovementStatePlugin {
    fn build(&self, app: &mut App) {
        app
            .init_resource::<HelmsmanConfig>()
            .add_observer(handle_environment_change_request)
            .add_systems(
                FixedUpdate,
                update_movement_state_machines.in_set(HelmsmanSystems::StateMachines),
            );
    }
}

#[cfg(test)]
mod tests {
    use core::time::Duration;
    use super::*;

    fn walking(speed: f32) -> MovementSignals {
        MovementSignals { horizontal_speed: speed, ..default() }
    }

    #[test]
    fn starts_on_land_idle() {
        let machine = HierarchicalStateMachine::on_foot();
        assert_eq!(machine.environment(), EnvironmentKind::Land);
        assert_eq!(machine.action(), ActionKind::Idle);

        let vehicle = HierarchicalStateMachine::vehicle();
        assert_eq!(vehicle.action(), ActionKind::VehicleIdle);
    }

    #[test]
    fn land_rules_pick_walk_idle_and_jump() {
        let machine = HierarchicalStateMachine::on_foot();

        assert_eq!(machine.determine_action(&walking(0.02)), ActionKind::Walk);
        assert_eq!(machine.determine_action(&walking(0.)), ActionKind::Idle);
        assert_eq!(
            machine.determine_action(&MovementSignals { grounded: false, ..default() }),
            ActionKind::Jump
        );
        assert_eq!(
            machine.determine_action(&MovementSignals { vertical_speed: 3., ..walking(1.) }),
            ActionKind::Jump
        );
    }

    #[test]
    fn determined_actions_are_always_legal() {
        let samples = [walking(0.), walking(5.), MovementSignals { grounded: false, vertical_speed: 2., ..walking(5.) }];

        for flavor in [MovementFlavor::OnFoot, MovementFlavor::Vehicle] {
            for env in EnvironmentKind::ALL {
                let state = EnvironmentState::new(env, flavor);
                for signals in samples.iter() {
                    let picked = state.determine_action(signals, &MovementThresholds::default());
                    assert!(flavor.legal_actions(env).contains(&picked), "{:?}/{:?} picked {:?}", flavor, env, picked);
                }
            }
        }
    }

    #[test]
    fn entering_water_swims_and_reports_in_order() {
        let mut machine = HierarchicalStateMachine::on_foot();
        let mut changes = Vec::new();

        assert!(machine.change_environment(EnvironmentKind::Water, walking(1.), &mut changes));
        assert_eq!(machine.action(), ActionKind::Swim);
        assert_eq!(changes, vec![
            MovementStateChange::Environment(Transition { from: EnvironmentKind::Land, to: EnvironmentKind::Water }),
            MovementStateChange::Action(Transition { from: ActionKind::Idle, to: ActionKind::Swim }),
        ]);

        changes.clear();
        assert!(!machine.change_environment(EnvironmentKind::Water, walking(1.), &mut changes));
        assert!(changes.is_empty());
    }

    #[test]
    fn unsupported_environments_are_ignored() {
        let mut machine = HierarchicalStateMachine::new(MovementFlavor::OnFoot, [EnvironmentKind::Grass]);
        let mut changes = Vec::new();

        assert!(!machine.change_environment(EnvironmentKind::Ice, walking(0.), &mut changes));
        assert_eq!(machine.environment(), EnvironmentKind::Land);
        assert!(changes.is_empty());
    }

    #[test]
    fn ticking_tracks_time_in_state() {
        let mut machine = HierarchicalStateMachine::on_foot();
        let mut changes = Vec::new();

        machine.tick(MovementSignals { dt: 0.5, ..walking(1.) }, &mut changes);
        assert_eq!(changes, vec![MovementStateChange::Action(Transition { from: ActionKind::Idle, to: ActionKind::Walk })]);

        machine.tick(MovementSignals { dt: 0.5, ..walking(1.) }, &mut changes);
        let state = machine.action_state().unwrap();
        assert_eq!(state.kind, ActionKind::Walk);
        assert!((state.time_in_state - 1.).abs() < 1e-5);
    }

    #[test]
    fn surface_tags_map_onto_environments() {
        assert_eq!(EnvironmentKind::from_surface_tag("Ice"), EnvironmentKind::Ice);
        assert_eq!(EnvironmentKind::from_surface_tag("water"), EnvironmentKind::Water);
        assert_eq!(EnvironmentKind::from_surface_tag("Carpet"), EnvironmentKind::Land);
        assert!("Lava".parse::<EnvironmentKind>().is_err());

        let mut sensor = GroundSensor::default();
        sensor.report_probe(None);
        assert_eq!(sensor, GroundSensor { environment: EnvironmentKind::Air, grounded: false });
        sensor.report_probe(Some("Grass"));
        assert_eq!(sensor, GroundSensor { environment: EnvironmentKind::Grass, grounded: true });
    }

    #[derive(Resource, Default)]
    struct Seen(Vec<String>);

    #[test]
    fn sensors_and_requests_drive_the_component() {
        let mut app = App::new();
        app.init_resource::<Time>();
        app.init_resource::<Seen>();
        app.add_plugins(MovementStatePlugin);
        app.add_observer(|event: On<EnvironmentChanged>, mut seen: ResMut<Seen>| {
            seen.0.push(format!("env {:?}", event.to));
        });
        app.add_observer(|event: On<ActionChanged>, mut seen: ResMut<Seen>| {
            seen.0.push(format!("action {:?}", event.to));
        });

        let entity = app.world_mut()
            .spawn((MovementStateMachine::on_foot(), PhysicsBody::default(), GroundSensor::default()))
            .id();

        app.world_mut().resource_mut::<Time>().advance_by(Duration::from_millis(20));
        app.world_mut().run_schedule(FixedUpdate);
        assert!(app.world().resource::<Seen>().0.is_empty());

        app.world_mut().get_mut::<GroundSensor>(entity).unwrap().report_probe(Some("Ice"));
        app.world_mut().get_mut::<PhysicsBody>(entity).unwrap().linear_velocity = Vec3::X;
        app.world_mut().run_schedule(FixedUpdate);
        assert_eq!(app.world().resource::<Seen>().0, vec!["env Ice", "action Walk"]);

        app.world_mut().trigger(EnvironmentChangeRequested { entity, environment: "Magma".into() });
        app.world_mut().trigger(EnvironmentChangeRequested { entity, environment: "water".into() });
        app.world_mut().flush();

        let machine = app.world().get::<MovementStateMachine>(entity).unwrap();
        assert_eq!(machine.environment(), EnvironmentKind::Water);
        assert_eq!(machine.action(), ActionKind::Swim);
    }
}
