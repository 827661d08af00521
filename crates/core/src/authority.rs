/*
This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
If a copy of the MPL was not distributed with this file,
You can obtain one at https://mozilla.org/MPL/2.0/.
*/
//! Control authority - who receives driving input right now, and mounting/dismounting vehicles.
//!
//! Exactly one ControlledEntity is active at any time once authority is initialized.
//! The `ControlAuthority` resource is the only thing allowed to flip `is_active` flags,
//! and it always deactivates the previous holder before activating the next.
//!
//! Everything here operates on the World directly. From systems, use the
//! `ControlAuthorityCommandsExt` methods on `Commands`, which queue the same operations.
use bevy::prelude::*;

use crate::config::{HelmsmanConfig, HelmsmanSystems};
use crate::controlled::ControlledEntity;
use crate::errors::AuthorityError;
use crate::events::{ControlAuthorityChanged, VehicleDismounted, VehicleMounted};
use crate::input::{ActionInputs, InputSource};
use crate::physics::PhysicsBody;
use crate::pose::world_transform;
use crate::proximity::Vehicle;
use crate::types::{ControlledEntityId, PlayerEntity, VehicleEntity};

/// Who is in control.
///
/// Created once via `init_control_authority()`; there is no global instance.
#[derive(Resource, Debug, Clone, PartialEq, Eq)]
pub struct ControlAuthority {
    player: PlayerEntity,
    active: ControlledEntityId,

    /// The vehicle whose interaction zone the player is standing in, if any.
    registered_vehicle: Option<VehicleEntity>,

    /// The vehicle the player is sitting in, if any.
    driven_vehicle: Option<VehicleEntity>,
}

impl ControlAuthority {
    pub fn player(&self) -> PlayerEntity {
        self.player
    }

    pub fn active(&self) -> ControlledEntityId {
        self.active
    }

    pub fn registered_vehicle(&self) -> Option<VehicleEntity> {
        self.registered_vehicle
    }

    pub fn driven_vehicle(&self) -> Option<VehicleEntity> {
        self.driven_vehicle
    }

    pub fn is_driving(&self) -> bool {
        self.driven_vehicle.is_some()
    }

    /// Whether pressing the interact action would do anything.
    pub fn can_interact(&self) -> bool {
        self.driven_vehicle.is_some() || self.registered_vehicle.is_some()
    }

    /// Latest registration wins.
    pub fn register_vehicle(&mut self, vehicle: VehicleEntity) {
        self.registered_vehicle = Some(vehicle);
    }

    /// Clears the registration, but only if `vehicle` is the one registered.
    pub fn unregister_vehicle(&mut self, vehicle: VehicleEntity) -> bool {
        match self.registered_vehicle == Some(vehicle) {
            true => {
                self.registered_vehicle = None;
                true
            },
            false => false,
        }
    }
}

/// Creates the ControlAuthority resource with `player` in control.
///
/// Calling this again replaces the previous authority (and re-activates the player).
pub fn init_control_authority(world: &mut World, player: PlayerEntity) -> Result<(), AuthorityError> {
    if world.get::<ControlledEntity>(player).is_none() {
        return Err(AuthorityError::NotControlled(player));
    }

    let mut holders = world.query::<&mut ControlledEntity>();
    for mut controlled in holders.iter_mut(world) {
        controlled.set_active(false);
    }

    world.insert_resource(ControlAuthority {
        player,
        active: player,
        registered_vehicle: None,
        driven_vehicle: None,
    });

    if let Some(mut controlled) = world.get_mut::<ControlledEntity>(player) {
        controlled.set_active(true);
    }

    #[cfg(feature = "logging")]
    bevy::log::debug!("Control authority initialized with player {:?}", player);
    world.trigger(ControlAuthorityChanged { entity: player, previous: None });
    Ok(())
}

/// Hands control to `entity`. The previous holder is deactivated first.
pub fn set_active_controller(world: &mut World, entity: ControlledEntityId) -> Result<(), AuthorityError> {
    let previous = world
        .get_resource::<ControlAuthority>()
        .ok_or(AuthorityError::NotInitialized)?
        .active;

    if world.get::<ControlledEntity>(entity).is_none() {
        return Err(AuthorityError::NotControlled(entity));
    }

    if previous == entity {
        return Ok(());
    }

    if let Some(mut old) = world.get_mut::<ControlledEntity>(previous) {
        old.set_active(false);
    }

    if let Some(mut new) = world.get_mut::<ControlledEntity>(entity) {
        new.set_active(true);
    }

    if let Some(mut authority) = world.get_resource_mut::<ControlAuthority>() {
        authority.active = entity;
    }

    #[cfg(feature = "logging")]
    bevy::log::debug!("Control authority moved from {:?} to {:?}", previous, entity);
    world.trigger(ControlAuthorityChanged { entity, previous: Some(previous) });
    Ok(())
}

fn existing(world: &World, entity: Option<Entity>) -> Option<Entity> {
    entity.filter(|entity| world.get_entity(*entity).is_ok())
}

/// Seats the player in the vehicle and hands control to the vehicle.
///
/// The entity that gets re-parented and frozen is always `ControlAuthority::player()`. The
/// vehicle's `linked_player` only has to be set (it is what makes the vehicle mountable); if it
/// names a different entity, a warning is logged and the authority's player is seated anyway.
pub fn mount_vehicle(world: &mut World, vehicle: VehicleEntity) -> Result<(), AuthorityError> {
    let authority = world.get_resource::<ControlAuthority>().ok_or(AuthorityError::NotInitialized)?;
    let player = authority.player;

    if let Some(driven) = authority.driven_vehicle {
        return Err(AuthorityError::AlreadyDriven(driven));
    }

    let vehicle_data = world.get::<Vehicle>(vehicle).ok_or(AuthorityError::NotAVehicle(vehicle))?;
    let linked = vehicle_data.linked_player().ok_or(AuthorityError::NoLinkedPlayer(vehicle))?;
    let anchor = existing(world, vehicle_data.mount_anchor).unwrap_or(vehicle);

    if linked != player {
        #[cfg(feature = "logging")]
        bevy::log::warn!("Vehicle {:?} is linked to {:?}, not the player {:?}; seating the player anyway.", vehicle, linked, player);
    }

    if world.get::<ControlledEntity>(vehicle).is_none() {
        return Err(AuthorityError::NotControlled(vehicle));
    }

    world.entity_mut(player).insert(ChildOf(anchor));

    if let Some(mut transform) = world.get_mut::<Transform>(player) {
        transform.translation = Vec3::ZERO;
        transform.rotation = Quat::IDENTITY;
    }

    match world.get_mut::<PhysicsBody>(player) {
        Some(mut body) => body.freeze(),
        None => {
            #[cfg(feature = "logging")]
            bevy::log::warn!("Player {:?} has no PhysicsBody to freeze.", player);
        }
    }

    if let Some(mut authority) = world.get_resource_mut::<ControlAuthority>() {
        authority.driven_vehicle = Some(vehicle);
    }

    set_active_controller(world, vehicle)?;

    #[cfg(feature = "logging")]
    bevy::log::info!("Player {:?} mounted vehicle {:?}", player, vehicle);
    world.trigger(VehicleMounted { entity: vehicle, player });
    Ok(())
}

/// Takes the player out of the vehicle they are driving and hands control back to them.
pub fn dismount_vehicle(world: &mut World) -> Result<(), AuthorityError> {
    let authority = world.get_resource::<ControlAuthority>().ok_or(AuthorityError::NotInitialized)?;
    let player = authority.player;

    if authority.active == player {
        return Err(AuthorityError::NotMounted);
    }

    let vehicle = authority.driven_vehicle;

    if let Some(vehicle) = vehicle {
        let side_offset = world
            .get_resource::<HelmsmanConfig>()
            .map(|config| config.dismount_side_offset)
            .unwrap_or_else(|| HelmsmanConfig::default().dismount_side_offset);

        let exit_anchor = existing(world, world.get::<Vehicle>(vehicle).and_then(|data| data.exit_anchor));
        let exit_pose = match exit_anchor {
            Some(anchor) => world_transform(world, anchor),
            None => world_transform(world, vehicle).map(|vehicle_pose| Transform {
                translation: vehicle_pose.translation + vehicle_pose.right() * side_offset,
                ..vehicle_pose
            }),
        };

        world.entity_mut(player).remove::<ChildOf>();

        match (exit_pose, world.get_mut::<Transform>(player)) {
            (Some(exit_pose), Some(mut transform)) => {
                transform.translation = exit_pose.translation;
                transform.rotation = exit_pose.rotation;
            },
            _ => {
                #[cfg(feature = "logging")]
                bevy::log::warn!("Could not resolve an exit pose for vehicle {:?}; player stays put.", vehicle);
            },
        }
    }

    if let Some(mut body) = world.get_mut::<PhysicsBody>(player) {
        body.unfreeze();
    }

    if let Some(mut authority) = world.get_resource_mut::<ControlAuthority>() {
        authority.driven_vehicle = None;
    }

    set_active_controller(world, player)?;

    #[cfg(feature = "logging")]
    bevy::log::info!("Player {:?} dismounted {:?}", player, vehicle);
    if let Some(vehicle) = vehicle {
        world.trigger(VehicleDismounted { entity: vehicle, player });
    }
    Ok(())
}

fn log_authority_error(_operation: &str, result: Result<(), AuthorityError>) {
    if let Err(_err) = result {
        #[cfg(feature = "logging")]
        bevy::log::warn!("{} skipped: {}", _operation, _err);
    }
}

/// Queues control authority operations from systems.
pub trait ControlAuthorityCommandsExt {
    fn init_control_authority(&mut self, player: PlayerEntity);
    fn set_active_controller(&mut self, entity: ControlledEntityId);
    fn mount_vehicle(&mut self, vehicle: VehicleEntity);
    fn dismount_vehicle(&mut self);
}

impl ControlAuthorityCommandsExt for Commands<'_, '_> {
    fn init_control_authority(&mut self, player: PlayerEntity) {
        self.queue(move |world: &mut World| {
            log_authority_error("init_control_authority", init_control_authority(world, player))
        });
    }

    fn set_active_controller(&mut self, entity: ControlledEntityId) {
        self.queue(move |world: &mut World| {
            log_authority_error("set_active_controller", set_active_controller(world, entity))
        });
    }

    fn mount_vehicle(&mut self, vehicle: VehicleEntity) {
        self.queue(move |world: &mut World| {
            log_authority_error("mount_vehicle", mount_vehicle(world, vehicle))
        });
    }

    fn dismount_vehicle(&mut self) {
        self.queue(|world: &mut World| {
            log_authority_error("dismount_vehicle", dismount_vehicle(world))
        });
    }
}

/// Mounts or dismounts when the interact action is pressed.
pub fn process_interaction(
    inputs: Option<Res<ActionInputs>>,
    authority: Option<Res<ControlAuthority>>,
    config: Res<HelmsmanConfig>,
    mut commands: Commands,
) {
    let (Some(inputs), Some(authority)) = (inputs, authority) else { return };

    if !authority.can_interact() || !inputs.just_pressed(&config.interact_action) {
        return;
    }

    match (authority.driven_vehicle(), authority.registered_vehicle()) {
        (Some(_), _) => commands.dismount_vehicle(),
        (None, Some(vehicle)) => commands.mount_vehicle(vehicle),
        (None, None) => {},
    }
}

/// Mount/dismount handling. Proximity detection lives in `ProximityPlugin`.
pub struct ControlAuthorityPlugin;

impl Plugin for ControlAuthorityPlugin {
    fn build(&self, app: &mut App) {
        app
            .init_resource::<HelmsmanConfig>()
            .init_resource::<ActionInputs>()
            .add_systems(
                FixedUpdate,
                process_interaction
                    .in_set(HelmsmanSystems::Interaction)
                    .before(HelmsmanSystems::ConsumeInput),
            );
    }
}

#[cfg(test)]
mod tests {
    use core::f32::consts::{FRAC_PI_2, PI};
    use super::*;

    struct Scene {
        world: World,
        player: Entity,
        vehicle: Entity,
        seat: Entity,
    }

    fn scene() -> Scene {
        let mut world = World::new();
        let player = world.spawn((ControlledEntity::new(), Transform::from_xyz(3., 0., 0.))).id();
        let vehicle = world.spawn((ControlledEntity::new(), Transform::from_xyz(10., 0., 0.))).id();
        let seat = world.spawn((Transform::from_xyz(0., 1., 0.), ChildOf(vehicle))).id();

        world.entity_mut(vehicle).insert(Vehicle::new().with_mount_anchor(seat));
        init_control_authority(&mut world, player).unwrap();

        Scene { world, player, vehicle, seat }
    }

    fn active_count(world: &mut World) -> usize {
        let mut query = world.query::<&ControlledEntity>();
        query.iter(world).filter(|controlled| controlled.is_active()).count()
    }

    #[test]
    fn exactly_one_entity_is_ever_active() {
        let Scene { mut world, player, vehicle, .. } = scene();
        assert_eq!(active_count(&mut world), 1);
        assert!(world.get::<ControlledEntity>(player).unwrap().is_active());

        set_active_controller(&mut world, vehicle).unwrap();
        assert_eq!(active_count(&mut world), 1);
        assert!(world.get::<ControlledEntity>(vehicle).unwrap().is_active());

        let stranger = world.spawn(Transform::default()).id();
        assert_eq!(set_active_controller(&mut world, stranger), Err(AuthorityError::NotControlled(stranger)));
        assert_eq!(active_count(&mut world), 1);
    }

    #[test]
    fn mounting_requires_a_linked_player() {
        let Scene { mut world, player, vehicle, .. } = scene();

        assert_eq!(mount_vehicle(&mut world, vehicle), Err(AuthorityError::NoLinkedPlayer(vehicle)));
        assert_eq!(world.resource::<ControlAuthority>().active(), player);
        assert!(world.get::<ChildOf>(player).is_none());
    }

    #[test]
    fn mount_and_dismount_round_trip() {
        let Scene { mut world, player, vehicle, seat } = scene();
        world.get_mut::<Vehicle>(vehicle).unwrap().link_player(player);
        world.resource_mut::<ControlAuthority>().register_vehicle(vehicle);
        world.get_mut::<PhysicsBody>(player).unwrap().linear_velocity = Vec3::ONE;

        mount_vehicle(&mut world, vehicle).unwrap();

        let authority = world.resource::<ControlAuthority>().clone();
        assert_eq!(authority.active(), vehicle);
        assert_eq!(authority.driven_vehicle(), Some(vehicle));
        assert!(authority.can_interact());
        assert_eq!(world.get::<ChildOf>(player).map(ChildOf::parent), Some(seat));
        assert_eq!(world.get::<Transform>(player).unwrap().translation, Vec3::ZERO);

        let body = world.get::<PhysicsBody>(player).unwrap();
        assert!(body.is_frozen());
        assert_eq!(body.linear_velocity, Vec3::ZERO);

        assert_eq!(mount_vehicle(&mut world, vehicle), Err(AuthorityError::AlreadyDriven(vehicle)));

        world.resource_mut::<ControlAuthority>().unregister_vehicle(vehicle);
        dismount_vehicle(&mut world).unwrap();

        let authority = world.resource::<ControlAuthority>().clone();
        assert_eq!(authority.active(), player);
        assert_eq!(authority.driven_vehicle(), None);
        assert!(!authority.can_interact());
        assert!(world.get::<ChildOf>(player).is_none());
        assert!(!world.get::<PhysicsBody>(player).unwrap().is_frozen());

        // No exit anchor: land to the vehicle's right.
        let landed = world.get::<Transform>(player).unwrap().translation;
        assert!(landed.distance(Vec3::new(12., 0., 0.)) < 1e-5);

        assert_eq!(dismount_vehicle(&mut world), Err(AuthorityError::NotMounted));
    }

    #[test]
    fn dismount_prefers_the_exit_anchor() {
        let Scene { mut world, player, vehicle, .. } = scene();
        let exit = world.spawn((Transform::from_xyz(0., 0., -4.), ChildOf(vehicle))).id();
        world.entity_mut(vehicle).insert(
            Vehicle::new().with_exit_anchor(exit).linked_to(player)
        );

        mount_vehicle(&mut world, vehicle).unwrap();
        dismount_vehicle(&mut world).unwrap();

        let landed = world.get::<Transform>(player).unwrap().translation;
        assert!(landed.distance(Vec3::new(10., 0., -4.)) < 1e-5);
    }

    #[test]
    fn registration_is_latest_wins_and_guarded_on_clear() {
        let Scene { mut world, vehicle, .. } = scene();
        let other = world.spawn(Vehicle::new()).id();
        let mut authority = world.resource_mut::<ControlAuthority>();

        authority.register_vehicle(vehicle);
        authority.register_vehicle(other);
        assert!(!authority.unregister_vehicle(vehicle));
        assert_eq!(authority.registered_vehicle(), Some(other));
        assert!(authority.unregister_vehicle(other));
        assert_eq!(authority.registered_vehicle(), None);
    }

    #[test]
    fn mounting_resets_the_local_pose_and_dismounting_copies_the_exit_pose() {
        let Scene { mut world, player, vehicle, seat } = scene();
        world.get_mut::<Transform>(player).unwrap().rotation = Quat::from_rotation_z(0.7) * Quat::from_rotation_y(1.2);
        world.get_mut::<Transform>(vehicle).unwrap().rotation = Quat::from_rotation_y(FRAC_PI_2);

        let exit = world.spawn((
            Transform::from_xyz(0., 0., -4.).with_rotation(Quat::from_rotation_y(FRAC_PI_2)),
            ChildOf(vehicle),
        )).id();
        world.entity_mut(vehicle).insert(
            Vehicle::new().with_mount_anchor(seat).with_exit_anchor(exit).linked_to(player)
        );

        mount_vehicle(&mut world, vehicle).unwrap();

        let seated = *world.get::<Transform>(player).unwrap();
        assert_eq!(seated.translation, Vec3::ZERO);
        assert_eq!(seated.rotation, Quat::IDENTITY);

        dismount_vehicle(&mut world).unwrap();

        let exit_pose = world_transform(&world, exit).unwrap();
        let landed = world_transform(&world, player).unwrap();
        assert!(landed.translation.distance(Vec3::new(6., 0., 0.)) < 1e-4);
        assert!(landed.translation.distance(exit_pose.translation) < 1e-5);
        assert!(landed.rotation.angle_between(Quat::from_rotation_y(PI)) < 1e-4);
        assert!(landed.rotation.angle_between(exit_pose.rotation) < 1e-5);
    }

    #[test]
    fn mounting_seats_the_authority_player_even_if_another_is_linked() {
        let Scene { mut world, player, vehicle, seat } = scene();
        let bystander = world.spawn((ControlledEntity::new(), Transform::from_xyz(9., 0., 0.))).id();
        world.get_mut::<Vehicle>(vehicle).unwrap().link_player(bystander);

        mount_vehicle(&mut world, vehicle).unwrap();

        assert_eq!(world.get::<ChildOf>(player).map(ChildOf::parent), Some(seat));
        assert!(world.get::<ChildOf>(bystander).is_none());
        assert_eq!(world.get::<Transform>(bystander).unwrap().translation, Vec3::new(9., 0., 0.));
    }
}
