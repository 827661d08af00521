/*
This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
If a copy of the MPL was not distributed with this file,
You can obtain one at https://mozilla.org/MPL/2.0/.
*/
//! Snapshots of where an entity is, both for motion building and for rest poses.
use bevy::prelude::*;

/// The pose an entity should return to on `reset_to_rest_pose()`.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct RestPose {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl RestPose {
    pub fn capture(transform: &Transform) -> Self {
        Self {
            translation: transform.translation,
            rotation: transform.rotation,
            scale: transform.scale,
        }
    }

    pub fn apply_to(&self, transform: &mut Transform) {
        transform.translation = self.translation;
        transform.rotation = self.rotation;
        transform.scale = self.scale;
    }
}

/// What a motion is built from: the entity's current pose, in both spaces.
///
/// For root entities the world and local translations are the same thing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionPose {
    pub world_translation: Vec3,
    pub local_translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl MotionPose {
    /// A pose for an entity without a parent.
    pub fn from_transform(transform: &Transform) -> Self {
        Self {
            world_translation: transform.translation,
            local_translation: transform.translation,
            rotation: transform.rotation,
            scale: transform.scale,
        }
    }

    /// A pose for a child entity, given its parent's world transform.
    pub fn from_parented(transform: &Transform, parent: &GlobalTransform) -> Self {
        Self {
            world_translation: parent.transform_point(transform.translation),
            ..Self::from_transform(transform)
        }
    }
}

impl Default for MotionPose {
    fn default() -> Self {
        Self::from_transform(&Transform::IDENTITY)
    }
}

/// Computes an entity's world transform by walking its `ChildOf` chain.
///
/// Unlike `GlobalTransform`, this does not lag behind by a propagation pass,
/// which matters when reparenting and repositioning within the same tick.
pub fn world_transform(world: &World, entity: Entity) -> Option<Transform> {
    let local = *world.get::<Transform>(entity)?;
    match world.get::<ChildOf>(entity) {
        Some(child_of) => Some(world_transform(world, child_of.parent())?.mul_transform(local)),
        None => Some(local),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_transform_composes_parents() {
        let mut world = World::new();
        let root = world.spawn(Transform::from_xyz(10., 0., 0.)).id();
        let mid = world.spawn((Transform::from_xyz(0., 5., 0.), ChildOf(root))).id();
        let leaf = world.spawn((Transform::from_xyz(0., 0., 1.), ChildOf(mid))).id();

        let resolved = world_transform(&world, leaf).unwrap();
        assert_eq!(resolved.translation, Vec3::new(10., 5., 1.));
    }

    #[test]
    fn parented_pose_reports_world_translation() {
        let parent = GlobalTransform::from(Transform::from_xyz(1., 2., 3.));
        let pose = MotionPose::from_parented(&Transform::from_xyz(1., 0., 0.), &parent);

        assert_eq!(pose.world_translation, Vec3::new(2., 2., 3.));
        assert_eq!(pose.local_translation, Vec3::new(1., 0., 0.));
    }
}
