//! A headless walk-up-and-drive scenario.
//!
//! A player walks to a buggy, gets in, drives it a bit and gets out again, while a lift
//! platform runs a looping path motion next to them. Input is scripted; a toy integrator
//! stands in for a physics backend.
use bevy::log::LogPlugin;
use bevy::{app::ScheduleRunnerPlugin, prelude::*};

use helmsman::prelude::*;
use helmsman_bevy_plugin::HelmsmanPlugin;

const WALK_SPEED: f32 = 4.;
const DRIVE_SPEED: f32 = 8.;
const DRIVE_STEPS: u32 = 60;
const COOLDOWN_STEPS: u32 = 30;

/// Velocity retained per fixed step by the toy integrator.
const DRAG: f32 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ScriptPhase {
    #[default]
    WalkToVehicle,
    Mounting,
    Driving,
    Dismounting,
    Cooldown,
}

#[derive(Resource, Debug, Default)]
struct DemoScript {
    phase: ScriptPhase,
    steps_in_phase: u32,
}

impl DemoScript {
    fn advance(&mut self, phase: ScriptPhase) {
        bevy::log::info!("Script: {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
        self.steps_in_phase = 0;
    }
}

fn setup(mut commands: Commands) {
    let player = commands.spawn((
        Name::new("Player"),
        Player,
        ControlledEntity::new(),
        MovementStateMachine::on_foot(),
        GroundSensor::default(),
        ControlBindings::new([
            InputForceBridge::new("Move", ForceConfig::new(MovementMode::Linear(LinearMode::VelocitySet), WALK_SPEED))
                .with_input_kind(InputSignalKind::Axis2D),
        ]),
        Transform::from_xyz(-8., 0., 0.),
    )).id();

    let buggy = commands.spawn((
        Name::new("Buggy"),
        ControlledEntity::new(),
        MovementStateMachine::vehicle(),
        InteractionZone::sphere(3.),
        ControlBindings::new([
            InputForceBridge::new("Move", ForceConfig::new(MovementMode::Linear(LinearMode::VelocitySet), DRIVE_SPEED))
                .with_input_kind(InputSignalKind::Axis2D),
            InputForceBridge::new("Move", ForceConfig::new(MovementMode::Rotational(RotationalMode::LookRotationSet), 1.))
                .with_input_kind(InputSignalKind::Axis2D),
        ]),
        Transform::default(),
    )).id();

    let seat = commands.spawn((Name::new("Seat"), Transform::from_xyz(0., 1., 0.), ChildOf(buggy))).id();
    let door = commands.spawn((Name::new("Door"), Transform::from_xyz(-2., 0., 0.), ChildOf(buggy))).id();
    commands.entity(buggy).insert(Vehicle::new().with_mount_anchor(seat).with_exit_anchor(door));

    commands.spawn((
        Name::new("Lift"),
        ControlledEntity::with_auto_start(
            MotionProfile::path([Vec3::new(5., 0., 5.), Vec3::new(5., 4., 5.), Vec3::new(5., 4., 9.)], 2.)
                .with_interpolation(PathInterpolation::CatmullRom)
                .with_ease("SineInOut")
                .looping_forever(LoopPolicy::PingPong),
        ),
        Transform::from_xyz(5., 0., 5.),
    ));

    commands.init_control_authority(player);
}

/// Feeds `ActionInputs` the way a player would.
fn run_script(
    mut script: ResMut<DemoScript>,
    mut inputs: ResMut<ActionInputs>,
    authority: Option<Res<ControlAuthority>>,
    mut exit: MessageWriter<AppExit>,
) {
    let Some(authority) = authority else { return };
    script.steps_in_phase += 1;

    match script.phase {
        ScriptPhase::WalkToVehicle => {
            if authority.registered_vehicle().is_some() {
                inputs.release("Move").press("Interact");
                script.advance(ScriptPhase::Mounting);
            } else if script.steps_in_phase == 1 {
                inputs
                    .configure("Move", InputSignalKind::Axis2D, InteractionMode::Hold)
                    .set_axis_2d("Move", Vec2::X);
            }
        },
        ScriptPhase::Mounting => {
            inputs.release("Interact");
            if authority.is_driving() {
                inputs.set_axis_2d("Move", Vec2::Y);
                script.advance(ScriptPhase::Driving);
            }
        },
        ScriptPhase::Driving => {
            if script.steps_in_phase >= DRIVE_STEPS {
                inputs.release("Move").press("Interact");
                script.advance(ScriptPhase::Dismounting);
            }
        },
        ScriptPhase::Dismounting => {
            inputs.release("Interact");
            if !authority.is_driving() {
                script.advance(ScriptPhase::Cooldown);
            }
        },
        ScriptPhase::Cooldown => {
            if script.steps_in_phase >= COOLDOWN_STEPS {
                exit.write(AppExit::Success);
            }
        },
    }
}

/// Stands in for a physics backend: integrates velocities and forces, with drag.
fn toy_integrator(time: Res<Time>, mut bodies: Query<(&mut PhysicsBody, &mut Transform)>) {
    let dt = time.delta_secs();

    for (mut body, mut transform) in bodies.iter_mut() {
        if body.is_frozen() {
            continue;
        }

        let acceleration = body.force / body.mass.max(f32::EPSILON);
        body.linear_velocity += acceleration * dt;
        transform.translation += body.linear_velocity * dt;
        body.linear_velocity *= DRAG;
        body.clear_accumulators();
    }
}

fn log_mounts(event: On<VehicleMounted>, names: Query<&Name>) {
    bevy::log::info!("{:?} got into {:?}", names.get(event.player).ok(), names.get(event.entity).ok());
}

fn log_dismounts(event: On<VehicleDismounted>, names: Query<&Name>, transforms: Query<&Transform>) {
    bevy::log::info!(
        "{:?} got out of {:?} at {:?}",
        names.get(event.player).ok(),
        names.get(event.entity).ok(),
        transforms.get(event.player).map(|transform| transform.translation).ok(),
    );
}

fn log_actions(event: On<ActionChanged>, names: Query<&Name>) {
    bevy::log::info!("{:?}: {:?} -> {:?}", names.get(event.entity).ok(), event.from, event.to);
}

fn log_motion_starts(event: On<MotionStarted>, names: Query<&Name>) {
    bevy::log::info!("{:?} started moving", names.get(event.entity).ok());
}

fn main() {
    let mut app = App::new();

    app
    .add_plugins((
        MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(core::time::Duration::from_millis(16))),
        LogPlugin {
            level: bevy::log::Level::DEBUG,
            custom_layer: |_| None,
            filter: "wgpu=error,bevy_render=info,bevy_ecs=info".to_string(),
            fmt_layer: |_| None,
        },
        HelmsmanPlugin,
    ))
    .init_resource::<DemoScript>()
    .add_systems(Startup, setup)
    .add_systems(FixedUpdate, (
        run_script.before(HelmsmanSystems::Proximity),
        toy_integrator.after(HelmsmanSystems::Forces).before(HelmsmanSystems::StateMachines),
    ))
    .add_observer(log_mounts)
    .add_observer(log_dismounts)
    .add_observer(log_actions)
    .add_observer(log_motion_starts)
    ;

    app.run();
}
