/*
This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
If a copy of the MPL was not distributed with this file,
You can obtain one at https://mozilla.org/MPL/2.0/.
*/
//! Vehicles and their interaction zones.
//!
//! A vehicle becomes mountable while a `Player` is inside its `InteractionZone`. Zone
//! entry/exit is reported as `ProximityEntered`/`ProximityExited` events, which the observers
//! here turn into linking the player and (un)registering the vehicle with the ControlAuthority.
//!
//! The built-in `detect_proximity` system does simple containment tests against the zone's
//! volume. If you have a physics backend with sensors, you may trigger the events from it
//! instead and leave the zone volume unused.
use bevy::ecs::entity::EntityHashSet;
use bevy::prelude::*;
use bevy::transform::helper::TransformHelper;

use crate::authority::ControlAuthority;
use crate::config::HelmsmanSystems;
use crate::events::{ProximityEntered, ProximityExited};
use crate::types::PlayerEntity;

/// Tags the entity that can mount vehicles.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Player;

/// A mountable vehicle.
#[derive(Component, Debug, Clone, Default, PartialEq)]
#[require(Transform)]
pub struct Vehicle {
    /// Where the player sits while mounted. Defaults to the vehicle root.
    pub mount_anchor: Option<Entity>,

    /// Where the player is placed when getting out. Defaults to the vehicle's right side.
    pub exit_anchor: Option<Entity>,

    linked_player: Option<PlayerEntity>,
}

impl Vehicle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mount_anchor(mut self, anchor: Entity) -> Self {
        self.mount_anchor = Some(anchor);
        self
    }

    pub fn with_exit_anchor(mut self, anchor: Entity) -> Self {
        self.exit_anchor = Some(anchor);
        self
    }

    pub fn linked_to(mut self, player: PlayerEntity) -> Self {
        self.linked_player = Some(player);
        self
    }

    /// The player currently in range, if any.
    pub fn linked_player(&self) -> Option<PlayerEntity> {
        self.linked_player
    }

    pub fn link_player(&mut self, player: PlayerEntity) {
        self.linked_player = Some(player);
    }

    pub fn unlink_player(&mut self) {
        self.linked_player = None;
    }
}

/// The shape of an interaction zone, in the zone's local space.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub enum InteractionVolume {
    Sphere { radius: f32 },
    Box { half_extents: Vec3 },
}

impl InteractionVolume {
    pub fn contains_point(&self, local: Vec3) -> bool {
        match self {
            Self::Sphere { radius } => local.length_squared() <= radius * radius,
            Self::Box { half_extents } => local.abs().cmple(*half_extents).all(),
        }
    }
}

/// A trigger volume around a vehicle. Lives on the vehicle entity itself.
#[derive(Component, Debug, Clone)]
#[require(Vehicle)]
pub struct InteractionZone {
    pub volume: InteractionVolume,

    /// Center of the volume relative to the vehicle.
    pub offset: Vec3,

    occupants: EntityHashSet,
}

impl InteractionZone {
    pub fn sphere(radius: f32) -> Self {
        Self::new(InteractionVolume::Sphere { radius })
    }

    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::new(InteractionVolume::Box { half_extents })
    }

    pub fn new(volume: InteractionVolume) -> Self {
        Self { volume, offset: Vec3::ZERO, occupants: EntityHashSet::default() }
    }

    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.occupants.contains(&entity)
    }

    /// Tests a world-space point against the volume, given the zone owner's world transform.
    pub fn contains_world_point(&self, owner: &GlobalTransform, point: Vec3) -> bool {
        let local = owner.affine().inverse().transform_point3(point) - self.offset;
        self.volume.contains_point(local)
    }
}

/// Edge-detects players entering and leaving interaction zones.
///
/// The zone of the vehicle currently being driven is skipped; the player sits inside it.
pub fn detect_proximity(
    mut zones: Query<(Entity, &mut InteractionZone)>,
    players: Query<Entity, With<Player>>,
    transforms: TransformHelper,
    authority: Option<Res<ControlAuthority>>,
    mut commands: Commands,
) {
    let driven = authority.as_ref().and_then(|authority| authority.driven_vehicle());

    for (vehicle, mut zone) in zones.iter_mut() {
        if Some(vehicle) == driven {
            continue;
        }

        let Ok(zone_pose) = transforms.compute_global_transform(vehicle) else { continue };

        for player in players.iter() {
            let Ok(player_pose) = transforms.compute_global_transform(player) else { continue };

            let inside = zone.contains_world_point(&zone_pose, player_pose.translation());
            let was_inside = zone.contains(player);

            match (was_inside, inside) {
                (false, true) => {
                    zone.occupants.insert(player);
                    commands.trigger(ProximityEntered { entity: vehicle, other: player });
                },
                (true, false) => {
                    zone.occupants.remove(&player);
                    commands.trigger(ProximityExited { entity: vehicle, other: player });
                },
                _ => {},
            }
        }
    }
}

/// Links the player and registers the vehicle.
pub fn on_proximity_entered(
    event: On<ProximityEntered>,
    players: Query<(), With<Player>>,
    mut vehicles: Query<&mut Vehicle>,
    authority: Option<ResMut<ControlAuthority>>,
) {
    if !players.contains(event.other) {
        return;
    }

    let Ok(mut vehicle) = vehicles.get_mut(event.entity) else {
        #[cfg(feature = "logging")]
        bevy::log::warn!("Proximity reported for {:?}, which is not a Vehicle.", event.entity);
        return;
    };

    vehicle.link_player(event.other);

    if let Some(mut authority) = authority {
        authority.register_vehicle(event.entity);
    }

    #[cfg(feature = "logging")]
    bevy::log::debug!("Player {:?} is in range of vehicle {:?}", event.other, event.entity);
}

/// Unlinks the player and unregisters the vehicle.
pub fn on_proximity_exited(
    event: On<ProximityExited>,
    players: Query<(), With<Player>>,
    mut vehicles: Query<&mut Vehicle>,
    authority: Option<ResMut<ControlAuthority>>,
) {
    if !players.contains(event.other) {
        return;
    }

    if let Ok(mut vehicle) = vehicles.get_mut(event.entity) {
        vehicle.unlink_player();
    }

    if let Some(mut authority) = authority {
        authority.unregister_vehicle(event.entity);
    }

    #[cfg(feature = "logging")]
    bevy::log::debug!("Player {:?} left the range of vehicle {:?}", event.other, event.entity);
}

/// Tracks players around vehicles.
pub struct ProximityPlugin;

impl Plugin for ProximityPlugin {
    fn build(&self, app: &mut App) {
        app
            .add_observer(on_proximity_entered)
            .add_observer(on_proximity_exited)
            .add_systems(FixedUpdate, detect_proximity.in_set(HelmsmanSystems::Proximity));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::{init_control_authority, mount_vehicle};
    use crate::controlled::ControlledEntity;

    #[test]
    fn volumes_contain_what_they_should() {
        let sphere = InteractionVolume::Sphere { radius: 2. };
        assert!(sphere.contains_point(Vec3::new(1., 1., 1.)));
        assert!(!sphere.contains_point(Vec3::new(2., 1., 0.)));

        let cuboid = InteractionVolume::Box { half_extents: Vec3::new(1., 2., 3.) };
        assert!(cuboid.contains_point(Vec3::new(-1., 2., 0.)));
        assert!(!cuboid.contains_point(Vec3::new(0., 0., 3.5)));
    }

    fn test_app() -> (App, Entity, Entity) {
        let mut app = App::new();
        app.add_plugins(ProximityPlugin);

        let player = app.world_mut()
            .spawn((Player, ControlledEntity::new(), Transform::from_xyz(50., 0., 0.)))
            .id();
        let vehicle = app.world_mut()
            .spawn((ControlledEntity::new(), InteractionZone::sphere(3.), Transform::from_xyz(10., 0., 0.)))
            .id();
        init_control_authority(app.world_mut(), player).unwrap();

        (app, player, vehicle)
    }

    fn move_to(app: &mut App, entity: Entity, x: f32) {
        app.world_mut().get_mut::<Transform>(entity).unwrap().translation.x = x;
        app.world_mut().run_schedule(FixedUpdate);
    }

    #[test]
    fn walking_in_and_out_registers_the_vehicle() {
        let (mut app, player, vehicle) = test_app();

        move_to(&mut app, player, 11.);
        assert_eq!(app.world().get::<Vehicle>(vehicle).unwrap().linked_player(), Some(player));
        assert_eq!(app.world().resource::<ControlAuthority>().registered_vehicle(), Some(vehicle));

        move_to(&mut app, player, 20.);
        assert_eq!(app.world().get::<Vehicle>(vehicle).unwrap().linked_player(), None);
        assert_eq!(app.world().resource::<ControlAuthority>().registered_vehicle(), None);
    }

    #[test]
    fn non_players_are_ignored() {
        let (mut app, _player, vehicle) = test_app();
        let crate_box = app.world_mut().spawn(Transform::from_xyz(10., 0., 0.)).id();

        app.world_mut().trigger(ProximityEntered { entity: vehicle, other: crate_box });
        app.world_mut().flush();

        assert_eq!(app.world().get::<Vehicle>(vehicle).unwrap().linked_player(), None);
        assert_eq!(app.world().resource::<ControlAuthority>().registered_vehicle(), None);
    }

    #[test]
    fn driven_vehicles_keep_their_registration() {
        let (mut app, player, vehicle) = test_app();

        move_to(&mut app, player, 10.5);
        mount_vehicle(app.world_mut(), vehicle).unwrap();

        // The seated player follows the vehicle; no exit must be reported.
        move_to(&mut app, vehicle, 100.);
        assert_eq!(app.world().get::<Vehicle>(vehicle).unwrap().linked_player(), Some(player));
        assert_eq!(app.world().resource::<ControlAuthority>().registered_vehicle(), Some(vehicle));
    }
}
