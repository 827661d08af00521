/*
This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
If a copy of the MPL was not distributed with this file,
You can obtain one at https://mozilla.org/MPL/2.0/.
*/
//! Input-to-force bridges: declarative bindings from a named input action to a physical effect.
//!
//! A bridge answers one question, "which way (and how hard) does this input push right now?",
//! as a pure function of the current input value and its configuration. Actually applying
//! the push is the job of the `forces` module.
//!
//! Bridges are plain data and (with `profile_loader`) serializable, so a whole control scheme
//! can be authored as a `ControlBindings` asset.
use std::sync::OnceLock;

use bevy::prelude::*;

#[cfg(feature = "profile_loader")]
use serde::{Deserialize, Serialize};

use crate::errors::BridgeValidationError;
use crate::input::{InputSignalKind, InputSource};
use crate::physics::ForceMode;
use crate::types::InputActionName;

/// A fixed unit direction, for inputs that carry no direction of their own.
///
/// Forward is +Z, matching how 2D sticks map onto the horizontal plane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Reflect)]
#[cfg_attr(feature = "profile_loader", derive(Serialize, Deserialize))]
pub enum DirectionType {
    Up,
    Down,
    Left,
    Right,
    #[default]
    Forward,
    Back,
}

impl DirectionType {
    pub fn as_vec3(&self) -> Vec3 {
        match self {
            Self::Up => Vec3::Y,
            Self::Down => Vec3::NEG_Y,
            Self::Left => Vec3::NEG_X,
            Self::Right => Vec3::X,
            Self::Forward => Vec3::Z,
            Self::Back => Vec3::NEG_Z,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Reflect)]
#[cfg_attr(feature = "profile_loader", derive(Serialize, Deserialize))]
pub enum LinearMode {
    #[default]
    VelocitySet,
    ForceAdd,
    /// Like ForceAdd, but the direction is taken in the body's local space.
    RelativeForceAdd,
    PositionDelta,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Reflect)]
#[cfg_attr(feature = "profile_loader", derive(Serialize, Deserialize))]
pub enum RotationalMode {
    #[default]
    AngularVelocitySet,
    TorqueAdd,
    /// Turns the body to face the direction. Zero directions are ignored.
    LookRotationSet,
}

/// How a bridge's direction is applied. Each category only admits its own modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
#[cfg_attr(feature = "profile_loader", derive(Serialize, Deserialize))]
pub enum MovementMode {
    Linear(LinearMode),
    Rotational(RotationalMode),
}

impl Default for MovementMode {
    fn default() -> Self {
        Self::Linear(LinearMode::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum MovementCategory {
    Linear,
    Rotational,
}

impl MovementMode {
    pub fn category(&self) -> MovementCategory {
        match self {
            Self::Linear(_) => MovementCategory::Linear,
            Self::Rotational(_) => MovementCategory::Rotational,
        }
    }
}

/// The "force" half of a bridge.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
#[cfg_attr(feature = "profile_loader", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "profile_loader", serde(default))]
pub struct ForceConfig {
    pub mode: MovementMode,

    /// Used by Button and Axis1D inputs.
    pub direction: DirectionType,

    pub magnitude: f32,

    /// How ForceAdd/RelativeForceAdd/TorqueAdd push on the body.
    pub force_mode: ForceMode,
}

impl Default for ForceConfig {
    fn default() -> Self {
        Self {
            mode: MovementMode::default(),
            direction: DirectionType::default(),
            magnitude: 1.,
            force_mode: ForceMode::default(),
        }
    }
}

impl ForceConfig {
    pub fn new(mode: MovementMode, magnitude: f32) -> Self {
        Self { mode, magnitude, ..default() }
    }

    pub fn with_direction(mut self, direction: DirectionType) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_force_mode(mut self, force_mode: ForceMode) -> Self {
        self.force_mode = force_mode;
        self
    }

    /// The fixed direction, scaled by magnitude.
    pub fn force_direction(&self) -> Vec3 {
        self.direction.as_vec3() * self.magnitude
    }
}

/// The style of camera steering. All kinds currently steer the same way,
/// by re-expressing the input in the camera's orientation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Reflect)]
#[cfg_attr(feature = "profile_loader", derive(Serialize, Deserialize))]
pub enum CameraKind {
    FirstPerson,
    #[default]
    ThirdPerson,
    TopDown,
}

/// Marks the camera that `use_main_camera` bridges steer relative to.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct MainCamera;

/// The reference frame a bridge's direction is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
#[cfg_attr(feature = "profile_loader", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "profile_loader", serde(default))]
pub struct CameraConfig {
    /// Steer relative to the entity tagged `MainCamera`.
    pub use_main_camera: bool,

    /// Steer relative to this entity instead. Runtime-only; not serialized.
    #[cfg_attr(feature = "profile_loader", serde(skip))]
    pub camera: Option<Entity>,

    pub kind: CameraKind,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self { use_main_camera: true, camera: None, kind: CameraKind::default() }
    }
}

impl CameraConfig {
    pub fn main_camera(kind: CameraKind) -> Self {
        Self { use_main_camera: true, camera: None, kind }
    }

    pub fn camera(camera: Entity, kind: CameraKind) -> Self {
        Self { use_main_camera: false, camera: Some(camera), kind }
    }
}

/// The "input" half of a bridge.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "profile_loader", derive(Serialize, Deserialize))]
pub struct InputBinding {
    pub action: InputActionName,

    /// The signal shape, if known up front. Otherwise asked from the input source once.
    #[cfg_attr(feature = "profile_loader", serde(default))]
    pub kind: Option<InputSignalKind>,

    #[cfg_attr(feature = "profile_loader", serde(skip))]
    resolved_kind: OnceLock<InputSignalKind>,
}

impl InputBinding {
    pub fn new<IS: Into<InputActionName>>(action: IS) -> Self {
        Self { action: action.into(), ..default() }
    }

    pub fn with_kind(mut self, kind: InputSignalKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// The signal shape, classified on first use and cached from then on.
    ///
    /// Actions the source does not know about yet are treated as buttons, uncached.
    pub fn signal_kind<I: InputSource + ?Sized>(&self, source: &I) -> InputSignalKind {
        if let Some(kind) = self.kind.or_else(|| self.resolved_kind.get().copied()) {
            return kind;
        }

        match source.signal_kind(&self.action) {
            Some(kind) => *self.resolved_kind.get_or_init(|| kind),
            None => InputSignalKind::Button,
        }
    }
}

/// A binding from a named input to a physical effect.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "profile_loader", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "profile_loader", serde(default))]
pub struct InputForceBridge {
    pub input: Option<InputBinding>,
    pub force: Option<ForceConfig>,

    /// None means the direction is used as-is, in world space.
    pub reference_frame: Option<CameraConfig>,
}

impl InputForceBridge {
    pub fn new<IS: Into<InputActionName>>(action: IS, force: ForceConfig) -> Self {
        Self {
            input: Some(InputBinding::new(action)),
            force: Some(force),
            reference_frame: None,
        }
    }

    pub fn with_input_kind(mut self, kind: InputSignalKind) -> Self {
        if let Some(input) = self.input.as_mut() {
            input.kind = Some(kind);
        }
        self
    }

    pub fn relative_to(mut self, frame: CameraConfig) -> Self {
        self.reference_frame = Some(frame);
        self
    }

    pub fn validate(&self) -> Result<(), BridgeValidationError> {
        match (&self.input, &self.force) {
            (None, _) => Err(BridgeValidationError::MissingInput),
            (Some(input), _) if input.action.is_empty() => Err(BridgeValidationError::MissingInput),
            (_, None) => Err(BridgeValidationError::MissingForce),
            (Some(_), Some(_)) => Ok(()),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn action(&self) -> Option<&str> {
        self.input.as_ref().map(|input| input.action.as_str())
    }

    pub fn mode(&self) -> Option<MovementMode> {
        self.force.as_ref().map(|force| force.mode)
    }

    /// Which way this bridge pushes right now, already scaled by magnitude.
    ///
    /// `frame` is the world rotation of the reference frame, if one is configured and found.
    /// Returns zero for incomplete bridges.
    pub fn compute_direction<I: InputSource + ?Sized>(&self, source: &I, frame: Option<Quat>) -> Vec3 {
        let (Some(input), Some(force)) = (&self.input, &self.force) else {
            return Vec3::ZERO;
        };

        let raw = match input.signal_kind(source) {
            InputSignalKind::Axis2D | InputSignalKind::PointerDelta => {
                let value = source.value(&input.action).map(|value| value.as_vec2()).unwrap_or_default();
                Vec3::new(value.x, 0., value.y) * force.magnitude
            },
            InputSignalKind::Button | InputSignalKind::Axis1D => force.force_direction(),
        };

        match (frame, &self.reference_frame) {
            (Some(rotation), Some(_)) => rotation * raw,
            _ => raw,
        }
    }
}

/// The full set of bridges driving one entity.
#[derive(Component, Debug, Clone, Default)]
#[cfg_attr(feature = "profile_loader", derive(Serialize, Deserialize, bevy::asset::Asset, bevy::reflect::TypePath))]
pub struct ControlBindings {
    pub bridges: Vec<InputForceBridge>,
}

impl ControlBindings {
    pub fn new<I: IntoIterator<Item = InputForceBridge>>(bridges: I) -> Self {
        Self { bridges: bridges.into_iter().collect() }
    }

    pub fn valid_bridges(&self) -> impl Iterator<Item = &InputForceBridge> {
        self.bridges.iter().filter(|bridge| bridge.is_valid())
    }
}

/// Reports bridges that will never fire, once, when bindings are attached.
pub fn validate_control_bindings(query: Query<(Entity, &ControlBindings), Added<ControlBindings>>) {
    for (_entity, bindings) in query.iter() {
        for (_idx, bridge) in bindings.bridges.iter().enumerate() {
            if let Err(_err) = bridge.validate() {
                #[cfg(feature = "logging")]
                bevy::log::warn!("{:?}: bridge #{} is invalid and will be skipped: {}", _entity, _idx, _err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use core::f32::consts::FRAC_PI_2;
    use super::*;
    use crate::input::{ActionInputs, InputValue};

    #[test]
    fn axis_2d_maps_onto_the_horizontal_plane() {
        let mut inputs = ActionInputs::default();
        inputs.set_axis_2d("Move", Vec2::new(1., 0.));

        let bridge = InputForceBridge::new("Move", ForceConfig::new(MovementMode::Linear(LinearMode::VelocitySet), 3.));
        assert_eq!(bridge.compute_direction(&inputs, None), Vec3::new(3., 0., 0.));

        inputs.set_axis_2d("Move", Vec2::new(0., 1.));
        assert_eq!(bridge.compute_direction(&inputs, None), Vec3::new(0., 0., 3.));
    }

    #[test]
    fn buttons_push_along_the_configured_direction() {
        let mut inputs = ActionInputs::default();
        inputs.press("Jump");

        let force = ForceConfig::new(MovementMode::Linear(LinearMode::ForceAdd), 5.)
            .with_direction(DirectionType::Up);
        let bridge = InputForceBridge::new("Jump", force);
        assert_eq!(bridge.compute_direction(&inputs, None), Vec3::new(0., 5., 0.));
    }

    #[test]
    fn reference_frames_rotate_the_direction() {
        let mut inputs = ActionInputs::default();
        inputs.set_axis_2d("Move", Vec2::new(1., 0.));

        let bridge = InputForceBridge::new("Move", ForceConfig::new(MovementMode::Linear(LinearMode::VelocitySet), 1.))
            .relative_to(CameraConfig::main_camera(CameraKind::TopDown));

        let turned = bridge.compute_direction(&inputs, Some(Quat::from_rotation_y(FRAC_PI_2)));
        assert!(turned.distance(Vec3::NEG_Z) < 1e-5);

        let unframed = InputForceBridge { reference_frame: None, ..bridge.clone() };
        assert_eq!(unframed.compute_direction(&inputs, Some(Quat::from_rotation_y(FRAC_PI_2))), Vec3::X);
    }

    #[test]
    fn incomplete_bridges_are_invalid_and_inert() {
        let inputs = ActionInputs::default();

        let no_input = InputForceBridge { force: Some(ForceConfig::default()), ..default() };
        assert_eq!(no_input.validate(), Err(BridgeValidationError::MissingInput));
        assert_eq!(no_input.compute_direction(&inputs, None), Vec3::ZERO);

        let no_force = InputForceBridge { input: Some(InputBinding::new("Move")), ..default() };
        assert_eq!(no_force.validate(), Err(BridgeValidationError::MissingForce));
        assert_eq!(no_force.compute_direction(&inputs, None), Vec3::ZERO);
    }

    #[test]
    fn signal_kind_is_classified_once() {
        let mut inputs = ActionInputs::default();
        let binding = InputBinding::new("Look");

        assert_eq!(binding.signal_kind(&inputs), InputSignalKind::Button);

        inputs.set("Look", InputValue::Axis2D(Vec2::ONE));
        assert_eq!(binding.signal_kind(&inputs), InputSignalKind::Axis2D);

        inputs.set("Look", InputValue::Axis1D(1.));
        assert_eq!(binding.signal_kind(&inputs), InputSignalKind::Axis2D);
    }
}
