/*
This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
If a copy of the MPL was not distributed with this file,
You can obtain one at https://mozilla.org/MPL/2.0/.
*/

use bevy::prelude::*;
use helmsman_core::authority;
use helmsman_core::config::{HelmsmanConfig, HelmsmanSystems};
use helmsman_core::controlled;
use helmsman_core::environment;
use helmsman_core::forces;
use helmsman_core::proximity;

#[cfg(feature = "include_profile_loader")]
use helmsman_profile_loader::{ProfileAssetPlugin, json_support::JsonProfileLoader};

pub struct HelmsmanPlugin;

impl Plugin for HelmsmanPlugin {
    fn build(&self, app: &mut App) {
        #[cfg(feature = "include_profile_loader")]
        app
        .add_plugins((
            ProfileAssetPlugin::<helmsman_core::motion_profile::MotionProfile, JsonProfileLoader>::default(),
            ProfileAssetPlugin::<helmsman_core::bridge::ControlBindings, JsonProfileLoader>::default(),
        ));

        app
        .init_resource::<HelmsmanConfig>()
        .configure_sets(
            FixedUpdate,
            (
                HelmsmanSystems::Proximity,
                HelmsmanSystems::Interaction,
                HelmsmanSystems::Forces,
                HelmsmanSystems::Motion,
                HelmsmanSystems::StateMachines,
                HelmsmanSystems::ConsumeInput,
            ).chain()
        )
        .add_plugins((
            proximity::ProximityPlugin,
            authority::ControlAuthorityPlugin,
            forces::InputForcePlugin,
            controlled::MotionPlugin,
            environment::MovementStatePlugin,
        ))
        ;
    }
}

#[cfg(test)]
mod tests {
    use bevy::prelude::*;
    use helmsman_core::prelude::*;
    use helmsman_core::authority::init_control_authority;
    use helmsman_test_plugin::*;

    use super::HelmsmanPlugin;

    fn test_app() -> App {
        let mut app = App::new();
        app.add_plugins((HelmsmanTestPlugin, HelmsmanPlugin));
        app
    }

    fn drive_bindings() -> ControlBindings {
        ControlBindings::new([
            InputForceBridge::new("Move", ForceConfig::new(MovementMode::Linear(LinearMode::VelocitySet), 3.))
                .with_input_kind(InputSignalKind::Axis2D),
        ])
    }

    struct Scene {
        app: App,
        player: Entity,
        vehicle: Entity,
    }

    fn scene() -> Scene {
        let mut app = test_app();

        let player = app.world_mut()
            .spawn((
                Name::new("Player"),
                Player,
                ControlledEntity::new(),
                MovementStateMachine::on_foot(),
                drive_bindings(),
                Transform::default(),
            ))
            .id();

        let vehicle = app.world_mut()
            .spawn((
                Name::new("Buggy"),
                ControlledEntity::new(),
                MovementStateMachine::vehicle(),
                InteractionZone::sphere(2.),
                drive_bindings(),
                Transform::from_xyz(1., 0., 0.),
            ))
            .id();

        init_control_authority(app.world_mut(), player).unwrap();
        Scene { app, player, vehicle }
    }

    #[test]
    fn interact_mounts_and_input_follows_authority() {
        let Scene { mut app, player, vehicle } = scene();

        press(&mut app, "Interact");
        step_fixed(&mut app, TEST_STEP);
        release(&mut app, "Interact");

        let authority = app.world().resource::<ControlAuthority>().clone();
        assert_eq!(authority.active(), vehicle);
        assert_eq!(authority.driven_vehicle(), Some(vehicle));
        assert!(app.world().resource::<EventLog>().contains(&RecordedEvent::VehicleMounted { vehicle, player }));

        hold(&mut app, "Move", InputValue::Axis2D(Vec2::X));
        step_fixed(&mut app, TEST_STEP);

        assert_eq!(app.world().get::<PhysicsBody>(vehicle).unwrap().linear_velocity, Vec3::new(3., 0., 0.));
        assert_eq!(app.world().get::<PhysicsBody>(player).unwrap().linear_velocity, Vec3::ZERO);
        assert!(app.world().resource::<EventLog>().contains(&RecordedEvent::ActionChanged {
            entity: vehicle,
            from: ActionKind::VehicleIdle,
            to: ActionKind::VehicleMove,
        }));

        release(&mut app, "Move");
        press(&mut app, "Interact");
        step_fixed(&mut app, TEST_STEP);

        let authority = app.world().resource::<ControlAuthority>().clone();
        assert_eq!(authority.active(), player);
        assert_eq!(authority.driven_vehicle(), None);
        assert!(authority.can_interact());
        assert!(app.world().get::<ChildOf>(player).is_none());
        assert!(app.world().resource::<EventLog>().contains(&RecordedEvent::VehicleDismounted { vehicle, player }));
    }

    #[test]
    fn nothing_happens_out_of_range() {
        let Scene { mut app, player, vehicle } = scene();
        app.world_mut().get_mut::<Transform>(vehicle).unwrap().translation = Vec3::new(50., 0., 0.);

        press(&mut app, "Interact");
        step_fixed(&mut app, TEST_STEP);

        assert_eq!(app.world().resource::<ControlAuthority>().active(), player);
        assert!(!app.world().resource::<EventLog>().contains(&RecordedEvent::VehicleMounted { vehicle, player }));
    }

    #[test]
    fn motions_run_to_completion_on_the_fixed_step() {
        let mut app = test_app();
        let platform = app.world_mut().spawn((ControlledEntity::new(), Transform::default())).id();

        let profile = MotionProfile::move_to(Vec3::new(2., 0., 0.), 0.1);
        app.world_mut().trigger(MotionCommandIssued::new(platform, MotionCommand::Start(profile)));
        app.world_mut().flush();

        step_fixed_n(&mut app, 10, TEST_STEP);

        let translation = app.world().get::<Transform>(platform).unwrap().translation;
        assert!(translation.distance(Vec3::new(2., 0., 0.)) < 1e-4);

        let log = app.world().resource::<EventLog>();
        assert_eq!(log.count(&RecordedEvent::MotionStarted(platform)), 1);
        assert_eq!(log.count(&RecordedEvent::MotionCompleted(platform)), 1);
        assert!(log.position(&RecordedEvent::MotionStarted(platform)) < log.position(&RecordedEvent::MotionCompleted(platform)));
    }

    #[test]
    fn walking_is_detected_from_the_body() {
        let Scene { mut app, player, .. } = scene();

        hold(&mut app, "Move", InputValue::Axis2D(Vec2::Y));
        step_fixed(&mut app, TEST_STEP);

        assert_eq!(app.world().get::<PhysicsBody>(player).unwrap().linear_velocity, Vec3::new(0., 0., 3.));
        assert_eq!(app.world().get::<MovementStateMachine>(player).unwrap().action(), ActionKind::Walk);
        assert!(app.world().resource::<EventLog>().contains(&RecordedEvent::ActionChanged {
            entity: player,
            from: ActionKind::Idle,
            to: ActionKind::Walk,
        }));
    }
}
