/*
This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
If a copy of the MPL was not distributed with this file,
You can obtain one at https://mozilla.org/MPL/2.0/.
*/
use core::time::Duration;

use bevy::prelude::*;
use helmsman_core::environment::{ActionKind, EnvironmentKind};
use helmsman_core::events::{
    ActionChanged, ControlAuthorityChanged, EnvironmentChanged, MotionCompleted, MotionKilled,
    MotionStarted, ProximityEntered, ProximityExited, VehicleDismounted, VehicleMounted,
};
use helmsman_core::input::{ActionInputs, InputValue, InteractionMode};

/// The default fixed step used by tests: 50Hz.
pub const TEST_STEP: Duration = Duration::from_millis(20);

/// Advances time by `dt` and runs one `FixedUpdate`.
pub fn step_fixed(app: &mut App, dt: Duration) {
    app.world_mut().get_resource_or_init::<Time>().advance_by(dt);
    app.world_mut().run_schedule(FixedUpdate);
}

pub fn step_fixed_n(app: &mut App, steps: usize, dt: Duration) {
    for _ in 0..steps {
        step_fixed(app, dt);
    }
}

/// Presses a button action; it is seen as just-pressed by the next step only.
pub fn press(app: &mut App, action: &str) {
    app.world_mut().get_resource_or_init::<ActionInputs>().press(action);
}

/// Holds an action at `value`, acting on every step until released.
pub fn hold(app: &mut App, action: &str, value: InputValue) {
    app.world_mut()
        .get_resource_or_init::<ActionInputs>()
        .configure(action, value.signal_kind(), InteractionMode::Hold)
        .set(action, value);
}

pub fn release(app: &mut App, action: &str) {
    app.world_mut().get_resource_or_init::<ActionInputs>().release(action);
}

/// One Helmsman event, as seen by the `EventLog`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordedEvent {
    MotionStarted(Entity),
    MotionCompleted(Entity),
    MotionKilled(Entity),
    ActionChanged { entity: Entity, from: ActionKind, to: ActionKind },
    EnvironmentChanged { entity: Entity, from: EnvironmentKind, to: EnvironmentKind },
    ControlAuthorityChanged { entity: Entity, previous: Option<Entity> },
    VehicleMounted { vehicle: Entity, player: Entity },
    VehicleDismounted { vehicle: Entity, player: Entity },
    ProximityEntered { vehicle: Entity, other: Entity },
    ProximityExited { vehicle: Entity, other: Entity },
}

/// Everything Helmsman announced, in order.
#[derive(Resource, Debug, Default)]
pub struct EventLog(pub Vec<RecordedEvent>);

impl EventLog {
    pub fn contains(&self, event: &RecordedEvent) -> bool {
        self.0.contains(event)
    }

    /// Position of the first occurrence, for ordering checks.
    pub fn position(&self, event: &RecordedEvent) -> Option<usize> {
        self.0.iter().position(|recorded| recorded == event)
    }

    pub fn count(&self, event: &RecordedEvent) -> usize {
        self.0.iter().filter(|recorded| *recorded == event).count()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

pub fn record_motion_started(event: On<MotionStarted>, mut log: ResMut<EventLog>) {
    log.0.push(RecordedEvent::MotionStarted(event.entity));
}

pub fn record_motion_completed(event: On<MotionCompleted>, mut log: ResMut<EventLog>) {
    log.0.push(RecordedEvent::MotionCompleted(event.entity));
}

pub fn record_motion_killed(event: On<MotionKilled>, mut log: ResMut<EventLog>) {
    log.0.push(RecordedEvent::MotionKilled(event.entity));
}

pub fn record_action_changed(event: On<ActionChanged>, mut log: ResMut<EventLog>) {
    log.0.push(RecordedEvent::ActionChanged { entity: event.entity, from: event.from, to: event.to });
}

pub fn record_environment_changed(event: On<EnvironmentChanged>, mut log: ResMut<EventLog>) {
    log.0.push(RecordedEvent::EnvironmentChanged { entity: event.entity, from: event.from, to: event.to });
}

pub fn record_authority_changed(event: On<ControlAuthorityChanged>, mut log: ResMut<EventLog>) {
    log.0.push(RecordedEvent::ControlAuthorityChanged { entity: event.entity, previous: event.previous });
}

pub fn record_vehicle_mounted(event: On<VehicleMounted>, mut log: ResMut<EventLog>) {
    log.0.push(RecordedEvent::VehicleMounted { vehicle: event.entity, player: event.player });
}

pub fn record_vehicle_dismounted(event: On<VehicleDismounted>, mut log: ResMut<EventLog>) {
    log.0.push(RecordedEvent::VehicleDismounted { vehicle: event.entity, player: event.player });
}

pub fn record_proximity_entered(event: On<ProximityEntered>, mut log: ResMut<EventLog>) {
    log.0.push(RecordedEvent::ProximityEntered { vehicle: event.entity, other: event.other });
}

pub fn record_proximity_exited(event: On<ProximityExited>, mut log: ResMut<EventLog>) {
    log.0.push(RecordedEvent::ProximityExited { vehicle: event.entity, other: event.other });
}

/// Stops a running (`app.run()`) test app after this many frames.
#[derive(Resource, Debug, Clone, Copy)]
pub struct FrameBudget(pub u32);

pub fn exit_when_frame_budget_spent(
    budget: Option<ResMut<FrameBudget>>,
    mut exit: MessageWriter<AppExit>,
) {
    let Some(mut budget) = budget else { return };

    budget.0 = budget.0.saturating_sub(1);
    if budget.0 == 0 {
        #[cfg(feature = "logging")]
        bevy::log::info!("Frame budget spent, exiting.");
        exit.write(AppExit::Success);
    }
}
