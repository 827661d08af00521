/*
This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
If a copy of the MPL was not distributed with this file,
You can obtain one at https://mozilla.org/MPL/2.0/.
*/
//! The input surface Helmsman reads from.
//!
//! Helmsman does not talk to devices. The host's input layer (bevy_input, leafwing,
//! a network replica, a test...) writes named actions into `ActionInputs`, and Helmsman
//! samples them once per fixed step. Per-step edges (just pressed / just released) are
//! consumed at the end of each step, so every press is seen by exactly one step.
use bevy::prelude::*;

#[cfg(feature = "profile_loader")]
use serde::{Deserialize, Serialize};

use crate::types::{HelmsmanKvMap, InputActionName};

/// The shape of the value an input action produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Reflect)]
#[cfg_attr(feature = "profile_loader", derive(Serialize, Deserialize))]
pub enum InputSignalKind {
    #[default]
    Button,
    Axis1D,
    Axis2D,
    /// Mouse/touch deltas; treated like a 2D axis.
    PointerDelta,
}

/// The current value of an input action.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub enum InputValue {
    Button(bool),
    Axis1D(f32),
    Axis2D(Vec2),
}

impl Default for InputValue {
    fn default() -> Self {
        Self::Button(false)
    }
}

impl InputValue {
    pub fn signal_kind(&self) -> InputSignalKind {
        match self {
            Self::Button(_) => InputSignalKind::Button,
            Self::Axis1D(_) => InputSignalKind::Axis1D,
            Self::Axis2D(_) => InputSignalKind::Axis2D,
        }
    }

    /// The value as a scalar; 2D values report their length.
    pub fn as_f32(&self) -> f32 {
        match self {
            Self::Button(pressed) => match pressed {
                true => 1.,
                false => 0.,
            },
            Self::Axis1D(value) => *value,
            Self::Axis2D(value) => value.length(),
        }
    }

    /// The value as a 2D vector; scalars land on X.
    pub fn as_vec2(&self) -> Vec2 {
        match self {
            Self::Axis2D(value) => *value,
            other => Vec2::new(other.as_f32(), 0.),
        }
    }

    pub fn is_actuated(&self) -> bool {
        match self {
            Self::Button(pressed) => *pressed,
            Self::Axis1D(value) => *value != 0.,
            Self::Axis2D(value) => *value != Vec2::ZERO,
        }
    }
}

/// Whether an action fires once per press or continuously while held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Reflect)]
#[cfg_attr(feature = "profile_loader", derive(Serialize, Deserialize))]
pub enum InteractionMode {
    #[default]
    Press,
    Hold,
}

/// Where an action is in its press/release cycle, as of the current step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Reflect)]
pub enum InputPhase {
    #[default]
    Waiting,
    /// Pressed this step.
    Started,
    /// Held since an earlier step.
    Performed,
    /// Released this step.
    Canceled,
}

/// Anything Helmsman can sample named input actions from.
pub trait InputSource {
    fn value(&self, action: &str) -> Option<InputValue>;

    /// Pressed since the last fixed step.
    fn just_pressed(&self, action: &str) -> bool;

    /// Currently actuated.
    fn held(&self, action: &str) -> bool;

    /// Released since the last fixed step.
    fn just_released(&self, action: &str) -> bool;

    /// Whether the action is configured to act continuously while held.
    fn requires_hold(&self, action: &str) -> bool;

    fn signal_kind(&self, action: &str) -> Option<InputSignalKind> {
        self.value(action).map(|value| value.signal_kind())
    }

    fn phase(&self, action: &str) -> InputPhase {
        match (self.just_pressed(action), self.held(action)) {
            (true, _) => InputPhase::Started,
            (false, true) => InputPhase::Performed,
            (false, false) if self.just_released(action) => InputPhase::Canceled,
            (false, false) => InputPhase::Waiting,
        }
    }

    /// Whether this action should apply its effect this step.
    fn triggered(&self, action: &str) -> bool {
        match self.requires_hold(action) {
            true => self.held(action),
            false => self.just_pressed(action),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Reflect)]
pub struct ActionInputState {
    pub value: InputValue,
    pub declared_kind: Option<InputSignalKind>,
    pub interaction: InteractionMode,
    pub just_pressed: bool,
    pub just_released: bool,
}

/// The default InputSource: a map of action name to state, written by the host.
#[derive(Resource, Debug, Clone, Default)]
pub struct ActionInputs {
    actions: HelmsmanKvMap<InputActionName, ActionInputState>,
}

impl ActionInputs {
    fn entry(&mut self, action: &str) -> &mut ActionInputState {
        self.actions.entry(action.to_owned()).or_default()
    }

    /// Declares how an action behaves. Undeclared actions act on press and report
    /// whatever kind their current value has.
    pub fn configure<IS: Into<InputActionName>>(
        &mut self,
        action: IS,
        kind: InputSignalKind,
        interaction: InteractionMode,
    ) -> &mut Self {
        let action: InputActionName = action.into();
        let state = self.entry(&action);
        state.declared_kind = Some(kind);
        state.interaction = interaction;
        self
    }

    /// Writes a new value. Transitions from idle to actuated register as a press.
    pub fn set(&mut self, action: &str, value: InputValue) -> &mut Self {
        let state = self.entry(action);
        let was_actuated = state.value.is_actuated();
        let is_actuated = value.is_actuated();

        state.value = value;
        state.just_pressed |= !was_actuated && is_actuated;
        state.just_released |= was_actuated && !is_actuated;
        self
    }

    pub fn press(&mut self, action: &str) -> &mut Self {
        self.set(action, InputValue::Button(true))
    }

    pub fn release(&mut self, action: &str) -> &mut Self {
        let state = self.entry(action);
        let neutral = match state.value {
            InputValue::Button(_) => InputValue::Button(false),
            InputValue::Axis1D(_) => InputValue::Axis1D(0.),
            InputValue::Axis2D(_) => InputValue::Axis2D(Vec2::ZERO),
        };
        self.set(action, neutral)
    }

    pub fn set_axis(&mut self, action: &str, value: f32) -> &mut Self {
        self.set(action, InputValue::Axis1D(value))
    }

    pub fn set_axis_2d(&mut self, action: &str, value: Vec2) -> &mut Self {
        self.set(action, InputValue::Axis2D(value))
    }

    pub fn state(&self, action: &str) -> Option<&ActionInputState> {
        self.actions.get(action)
    }

    /// Forgets this step's press/release edges. Values are kept.
    pub fn consume_edges(&mut self) {
        for state in self.actions.values_mut() {
            state.just_pressed = false;
            state.just_released = false;
        }
    }
}

impl InputSource for ActionInputs {
    fn value(&self, action: &str) -> Option<InputValue> {
        self.actions.get(action).map(|state| state.value)
    }

    fn just_pressed(&self, action: &str) -> bool {
        self.actions.get(action).is_some_and(|state| state.just_pressed)
    }

    fn held(&self, action: &str) -> bool {
        self.actions.get(action).is_some_and(|state| state.value.is_actuated())
    }

    fn just_released(&self, action: &str) -> bool {
        self.actions.get(action).is_some_and(|state| state.just_released)
    }

    fn requires_hold(&self, action: &str) -> bool {
        self.actions.get(action).is_some_and(|state| state.interaction == InteractionMode::Hold)
    }

    fn signal_kind(&self, action: &str) -> Option<InputSignalKind> {
        let state = self.actions.get(action)?;
        Some(state.declared_kind.unwrap_or_else(|| state.value.signal_kind()))
    }
}

/// Clears per-step input edges; runs last in every fixed step.
pub fn consume_input_edges(inputs: Option<ResMut<ActionInputs>>) {
    if let Some(mut inputs) = inputs {
        inputs.consume_edges();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presses_are_edges_holds_are_levels() {
        let mut inputs = ActionInputs::default();
        inputs.press("Jump");
        assert!(inputs.just_pressed("Jump"));
        assert!(inputs.triggered("Jump"));

        inputs.consume_edges();
        assert!(!inputs.just_pressed("Jump"));
        assert!(inputs.held("Jump"));
        assert!(!inputs.triggered("Jump"));

        inputs.configure("Jump", InputSignalKind::Button, InteractionMode::Hold);
        assert!(inputs.triggered("Jump"));

        assert_eq!(inputs.phase("Jump"), InputPhase::Performed);

        inputs.release("Jump");
        assert!(inputs.just_released("Jump"));
        assert!(!inputs.triggered("Jump"));
        assert_eq!(inputs.phase("Jump"), InputPhase::Canceled);

        inputs.consume_edges();
        assert_eq!(inputs.phase("Jump"), InputPhase::Waiting);
    }

    #[test]
    fn declared_kinds_win_over_observed_ones() {
        let mut inputs = ActionInputs::default();
        inputs.set_axis_2d("Look", Vec2::new(0.5, 0.));
        assert_eq!(inputs.signal_kind("Look"), Some(InputSignalKind::Axis2D));

        inputs.configure("Look", InputSignalKind::PointerDelta, InteractionMode::Hold);
        assert_eq!(inputs.signal_kind("Look"), Some(InputSignalKind::PointerDelta));
        assert_eq!(inputs.signal_kind("Nope"), None);
    }

    #[test]
    fn axis_changes_while_held_are_not_new_presses() {
        let mut inputs = ActionInputs::default();
        inputs.set_axis_2d("Move", Vec2::X);
        inputs.consume_edges();
        inputs.set_axis_2d("Move", Vec2::Y);
        assert!(!inputs.just_pressed("Move"));
        assert_eq!(inputs.value("Move"), Some(InputValue::Axis2D(Vec2::Y)));
    }
}
