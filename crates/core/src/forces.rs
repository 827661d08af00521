/*
This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
If a copy of the MPL was not distributed with this file,
You can obtain one at https://mozilla.org/MPL/2.0/.
*/
//! Applies input bridges to the entity holding control authority.
use bevy::prelude::*;

use crate::bridge::{ControlBindings, LinearMode, MainCamera, MovementMode, RotationalMode, validate_control_bindings};
use crate::config::HelmsmanSystems;
use crate::controlled::ControlledEntity;
use crate::input::{consume_input_edges, ActionInputs, InputSource};
use crate::physics::{ForceMode, PhysicsBody};

/// Pushes `direction` into a body the way `mode` says. Frozen bodies are left alone.
pub fn apply_bridge_force(
    mode: MovementMode,
    force_mode: ForceMode,
    direction: Vec3,
    body: &mut PhysicsBody,
    transform: &mut Transform,
    dt: f32,
) {
    if body.is_frozen() {
        return;
    }

    match mode {
        MovementMode::Linear(LinearMode::VelocitySet) => body.linear_velocity = direction,
        MovementMode::Linear(LinearMode::ForceAdd) => body.add_force(direction, force_mode),
        MovementMode::Linear(LinearMode::RelativeForceAdd) => body.add_force(transform.rotation * direction, force_mode),
        MovementMode::Linear(LinearMode::PositionDelta) => transform.translation += direction * dt,
        MovementMode::Rotational(RotationalMode::AngularVelocitySet) => body.angular_velocity = direction,
        MovementMode::Rotational(RotationalMode::TorqueAdd) => body.add_torque(direction, force_mode),
        MovementMode::Rotational(RotationalMode::LookRotationSet) => {
            if let Ok(facing) = Dir3::new(direction) {
                transform.look_to(facing, Dir3::Y);
            }
        },
    }
}

/// Samples every valid bridge of the active entity and applies the triggered ones.
pub fn apply_input_forces(
    time: Res<Time>,
    inputs: Option<Res<ActionInputs>>,
    mut query: Query<(&ControlledEntity, &ControlBindings, &mut PhysicsBody, &mut Transform)>,
    main_camera: Query<&GlobalTransform, With<MainCamera>>,
    cameras: Query<&GlobalTransform>,
) {
    let Some(inputs) = inputs else { return };
    let dt = time.delta_secs();
    let main_rotation = main_camera.iter().next().map(GlobalTransform::rotation);

    for (controlled, bindings, mut body, mut transform) in query.iter_mut() {
        if !controlled.is_active() {
            continue;
        }

        for bridge in bindings.valid_bridges() {
            let (Some(action), Some(force)) = (bridge.action(), bridge.force.as_ref()) else { continue };

            if !inputs.triggered(action) {
                continue;
            }

            let frame = bridge.reference_frame.and_then(|frame| match frame.camera {
                Some(camera) if !frame.use_main_camera => cameras.get(camera).ok().map(GlobalTransform::rotation),
                _ => main_rotation,
            });

            let direction = bridge.compute_direction(inputs.as_ref(), frame);
            apply_bridge_force(force.mode, force.force_mode, direction, &mut body, &mut transform, dt);
        }
    }
}

/// Drives the active entity from `ActionInputs` through its `ControlBindings`.
pub struct InputForcePlugin;

impl Plugin for InputForcePlugin {
    fn build(&self, app: &mut App) {
        app
            .init_resource::<ActionInputs>()
            .add_systems(
                FixedUpdate,
                (
                    (validate_control_bindings, apply_input_forces).chain().in_set(HelmsmanSystems::Forces),
                    consume_input_edges.in_set(HelmsmanSystems::ConsumeInput).after(HelmsmanSystems::Forces),
                ),
            );
    }
}

#[cfg(test)]
mod tests {
    use core::time::Duration;
    use super::*;
    use crate::bridge::{DirectionType, ForceConfig, InputForceBridge};
    use crate::input::{InputSignalKind, InteractionMode};

    #[test]
    fn look_rotation_ignores_zero_directions() {
        let mut body = PhysicsBody::default();
        let mut transform = Transform::from_rotation(Quat::from_rotation_y(1.));
        let before = transform.rotation;

        let mode = MovementMode::Rotational(RotationalMode::LookRotationSet);
        apply_bridge_force(mode, ForceMode::Force, Vec3::ZERO, &mut body, &mut transform, 0.02);
        assert_eq!(transform.rotation, before);
        assert!(transform.rotation.is_finite());

        apply_bridge_force(mode, ForceMode::Force, Vec3::X, &mut body, &mut transform, 0.02);
        assert!((transform.forward().as_vec3() - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn relative_force_follows_the_body() {
        let mut body = PhysicsBody::default();
        let mut transform = Transform::from_rotation(Quat::from_rotation_y(core::f32::consts::FRAC_PI_2));

        let mode = MovementMode::Linear(LinearMode::RelativeForceAdd);
        apply_bridge_force(mode, ForceMode::Force, Vec3::X, &mut body, &mut transform, 0.02);
        assert!(body.force.distance(Vec3::NEG_Z) < 1e-5);
    }

    #[test]
    fn position_delta_integrates_over_the_step() {
        let mut body = PhysicsBody::default();
        let mut transform = Transform::IDENTITY;

        let mode = MovementMode::Linear(LinearMode::PositionDelta);
        apply_bridge_force(mode, ForceMode::Force, Vec3::new(0., 0., 10.), &mut body, &mut transform, 0.5);
        assert_eq!(transform.translation, Vec3::new(0., 0., 5.));
    }

    fn test_app() -> App {
        let mut app = App::new();
        app.init_resource::<Time>();
        app.add_plugins(InputForcePlugin);
        app
    }

    fn step(app: &mut App) {
        app.world_mut().resource_mut::<Time>().advance_by(Duration::from_millis(20));
        app.world_mut().run_schedule(FixedUpdate);
    }

    fn bindings() -> ControlBindings {
        ControlBindings::new([
            InputForceBridge::new("Move", ForceConfig::new(MovementMode::Linear(LinearMode::VelocitySet), 3.))
                .with_input_kind(InputSignalKind::Axis2D),
            InputForceBridge::new(
                "Jump",
                ForceConfig::new(MovementMode::Linear(LinearMode::ForceAdd), 10.)
                    .with_direction(DirectionType::Up)
                    .with_force_mode(ForceMode::Impulse),
            ),
        ])
    }

    #[test]
    fn only_the_active_entity_is_pushed() {
        let mut app = test_app();
        let mut active = ControlledEntity::new();
        active.set_active(true);

        let driver = app.world_mut().spawn((active, bindings())).id();
        let bystander = app.world_mut().spawn((ControlledEntity::new(), bindings())).id();

        app.world_mut().resource_mut::<ActionInputs>()
            .configure("Move", InputSignalKind::Axis2D, InteractionMode::Hold)
            .set_axis_2d("Move", Vec2::new(1., 0.));
        step(&mut app);

        assert_eq!(app.world().get::<PhysicsBody>(driver).unwrap().linear_velocity, Vec3::new(3., 0., 0.));
        assert_eq!(app.world().get::<PhysicsBody>(bystander).unwrap().linear_velocity, Vec3::ZERO);
    }

    #[test]
    fn presses_fire_once_holds_fire_every_step() {
        let mut app = test_app();
        let mut active = ControlledEntity::new();
        active.set_active(true);
        let driver = app.world_mut().spawn((active, bindings())).id();

        app.world_mut().resource_mut::<ActionInputs>().press("Jump");
        step(&mut app);
        step(&mut app);

        // One impulse of 10 on a unit mass, not two.
        assert_eq!(app.world().get::<PhysicsBody>(driver).unwrap().linear_velocity, Vec3::new(0., 10., 0.));

        app.world_mut().resource_mut::<ActionInputs>()
            .configure("Jump", InputSignalKind::Button, InteractionMode::Hold);
        step(&mut app);
        step(&mut app);
        assert_eq!(app.world().get::<PhysicsBody>(driver).unwrap().linear_velocity, Vec3::new(0., 30., 0.));
    }
}
