/*
This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
If a copy of the MPL was not distributed with this file,
You can obtain one at https://mozilla.org/MPL/2.0/.
*/
//! A minimal rigid-body surface for Helmsman to push on.
//!
//! Helmsman does not integrate physics itself. Your physics backend (or a tiny integrator
//! of your own) is expected to read the accumulated `force`/`torque` and the velocities
//! from `PhysicsBody`, step the simulation, and write the resulting velocities back.
//! Helmsman only writes intents into it and reads velocities out of it for state detection.
use bevy::prelude::*;

#[cfg(feature = "profile_loader")]
use serde::{Deserialize, Serialize};

/// How a force-like vector is applied to a body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Reflect)]
#[cfg_attr(feature = "profile_loader", derive(Serialize, Deserialize))]
pub enum ForceMode {
    /// Continuous force; accumulated, scaled by mass during integration.
    #[default]
    Force,
    /// Continuous acceleration; accumulated, mass-independent.
    Acceleration,
    /// Instant change of momentum.
    Impulse,
    /// Instant change of velocity, mass-independent.
    VelocityChange,
}

/// The physics-facing half of a controllable entity.
#[derive(Component, Reflect, Debug, Clone, PartialEq)]
#[require(Transform)]
pub struct PhysicsBody {
    pub mass: f32,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,

    /// Force accumulated since the backend last consumed it.
    pub force: Vec3,

    /// Torque accumulated since the backend last consumed it.
    pub torque: Vec3,

    frozen: bool,
}

impl Default for PhysicsBody {
    fn default() -> Self {
        Self {
            mass: 1.,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
            frozen: false,
        }
    }
}

impl PhysicsBody {
    pub fn with_mass(mass: f32) -> Self {
        Self { mass, ..default() }
    }

    /// Whether the body is currently kinematic (e.g. a player parented to a vehicle).
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Makes the body kinematic and discards all motion state.
    pub fn freeze(&mut self) {
        self.frozen = true;
        self.zero_motion();
    }

    /// Makes the body dynamic again. Velocities start from rest.
    pub fn unfreeze(&mut self) {
        self.frozen = false;
        self.zero_motion();
    }

    /// Zeroes velocities and the force accumulators.
    pub fn zero_motion(&mut self) {
        self.linear_velocity = Vec3::ZERO;
        self.angular_velocity = Vec3::ZERO;
        self.clear_accumulators();
    }

    pub fn clear_accumulators(&mut self) {
        self.force = Vec3::ZERO;
        self.torque = Vec3::ZERO;
    }

    fn inverse_mass(&self) -> f32 {
        match self.mass > 0. {
            true => self.mass.recip(),
            false => 0.,
        }
    }

    /// Applies a linear force-like vector. Ignored while frozen.
    pub fn add_force(&mut self, force: Vec3, mode: ForceMode) {
        if self.frozen { return }

        match mode {
            ForceMode::Force => self.force += force,
            ForceMode::Acceleration => self.force += force * self.mass,
            ForceMode::Impulse => self.linear_velocity += force * self.inverse_mass(),
            ForceMode::VelocityChange => self.linear_velocity += force,
        }
    }

    /// Applies a rotational force-like vector. Ignored while frozen.
    ///
    /// Bodies are treated as having a unit inertia tensor scaled by mass.
    pub fn add_torque(&mut self, torque: Vec3, mode: ForceMode) {
        if self.frozen { return }

        match mode {
            ForceMode::Force => self.torque += torque,
            ForceMode::Acceleration => self.torque += torque * self.mass,
            ForceMode::Impulse => self.angular_velocity += torque * self.inverse_mass(),
            ForceMode::VelocityChange => self.angular_velocity += torque,
        }
    }

    /// Speed along the XZ plane.
    pub fn horizontal_speed(&self) -> f32 {
        Vec2::new(self.linear_velocity.x, self.linear_velocity.z).length()
    }

    /// Signed speed along +Y.
    pub fn vertical_speed(&self) -> f32 {
        self.linear_velocity.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn force_modes_scale_by_mass_where_appropriate() {
        let mut body = PhysicsBody::with_mass(2.);

        body.add_force(Vec3::X, ForceMode::Force);
        body.add_force(Vec3::X, ForceMode::Acceleration);
        assert_eq!(body.force, Vec3::new(3., 0., 0.));

        body.add_force(Vec3::Z * 4., ForceMode::Impulse);
        assert_eq!(body.linear_velocity, Vec3::new(0., 0., 2.));

        body.add_force(Vec3::Z * 4., ForceMode::VelocityChange);
        assert_eq!(body.linear_velocity, Vec3::new(0., 0., 6.));
    }

    #[test]
    fn frozen_bodies_ignore_forces() {
        let mut body = PhysicsBody { linear_velocity: Vec3::X, ..default() };
        body.freeze();
        assert_eq!(body.linear_velocity, Vec3::ZERO);

        body.add_force(Vec3::Y, ForceMode::VelocityChange);
        body.add_torque(Vec3::Y, ForceMode::Force);
        assert_eq!(body.linear_velocity, Vec3::ZERO);
        assert_eq!(body.torque, Vec3::ZERO);

        body.unfreeze();
        body.add_force(Vec3::Y, ForceMode::VelocityChange);
        assert_eq!(body.vertical_speed(), 1.);
    }
}
