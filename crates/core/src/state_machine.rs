/*
This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
If a copy of the MPL was not distributed with this file,
You can obtain one at https://mozilla.org/MPL/2.0/.
*/
//! A small, generic finite state machine.
//!
//! States are stored up front and addressed by a key. The machine only guarantees
//! ordering: on a transition the old state's `exit()` runs, the key is swapped, and the new
//! state's `enter()` runs, in that order. Announcing the change is up to the caller, using
//! the returned `Transition`, which keeps notifications strictly after `enter()`.
//!
//! Machines nest naturally; a state may own another StateMachine (see `environment`).
use core::fmt::Debug;
use core::hash::Hash;

use crate::types::HelmsmanKvMap;

/// Behaviour hooks for one state. `C` is whatever context the owner passes around.
pub trait MachineState<C> {
    fn enter(&mut self, _ctx: &mut C) {}
    fn exit(&mut self, _ctx: &mut C) {}
    fn update(&mut self, _ctx: &mut C) {}
}

/// A completed state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Transition<K> {
    pub from: K,
    pub to: K,
}

/// Keyed state storage plus a current key.
#[derive(Debug, Clone)]
pub struct StateMachine<K, S> {
    states: HelmsmanKvMap<K, S>,
    current: K,
}

impl<K: Copy + Eq + Hash + Debug, S> StateMachine<K, S> {
    /// Builds a machine resting in `initial`. Returns None if `initial` has no state.
    ///
    /// Note that `initial` is *not* entered here; call `enter_current()` once the context is ready.
    pub fn new<I: IntoIterator<Item = (K, S)>>(initial: K, states: I) -> Option<Self> {
        let states: HelmsmanKvMap<K, S> = states.into_iter().collect();
        match states.contains_key(&initial) {
            true => Some(Self { states, current: initial }),
            false => None,
        }
    }

    /// Builds a machine resting in `initial`, which is always present.
    pub fn starting_with<I: IntoIterator<Item = (K, S)>>(initial: K, initial_state: S, others: I) -> Self {
        let mut states: HelmsmanKvMap<K, S> = others.into_iter().collect();
        states.insert(initial, initial_state);
        Self { states, current: initial }
    }

    pub fn current(&self) -> K {
        self.current
    }

    pub fn contains(&self, key: K) -> bool {
        self.states.contains_key(&key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.states.keys()
    }

    pub fn get(&self, key: K) -> Option<&S> {
        self.states.get(&key)
    }

    pub fn current_state(&self) -> Option<&S> {
        self.states.get(&self.current)
    }

    pub fn current_state_mut(&mut self) -> Option<&mut S> {
        self.states.get_mut(&self.current)
    }

    /// Points the machine at `key` without running any hooks.
    ///
    /// Useful when the owner is being (re)entered and will call `enter_current()` itself.
    pub fn jump_to(&mut self, key: K) -> bool {
        match self.states.contains_key(&key) {
            true => {
                self.current = key;
                true
            },
            false => false,
        }
    }

    pub fn enter_current<C>(&mut self, ctx: &mut C) where S: MachineState<C> {
        if let Some(state) = self.current_state_mut() {
            state.enter(ctx);
        }
    }

    pub fn exit_current<C>(&mut self, ctx: &mut C) where S: MachineState<C> {
        if let Some(state) = self.current_state_mut() {
            state.exit(ctx);
        }
    }

    pub fn update<C>(&mut self, ctx: &mut C) where S: MachineState<C> {
        if let Some(state) = self.current_state_mut() {
            state.update(ctx);
        }
    }

    /// Exits the current state and enters `next`.
    ///
    /// Returns None (and runs no hooks) if `next` is already current or has no state.
    pub fn transition_to<C>(&mut self, next: K, ctx: &mut C) -> Option<Transition<K>> where S: MachineState<C> {
        if next == self.current || !self.states.contains_key(&next) {
            return None;
        }

        let from = self.current;
        self.exit_current(ctx);
        self.current = next;
        self.enter_current(ctx);

        Some(Transition { from, to: next })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder(&'static str);

    impl MachineState<Vec<String>> for Recorder {
        fn enter(&mut self, log: &mut Vec<String>) {
            log.push(format!("enter {}", self.0));
        }

        fn exit(&mut self, log: &mut Vec<String>) {
            log.push(format!("exit {}", self.0));
        }

        fn update(&mut self, log: &mut Vec<String>) {
            log.push(format!("update {}", self.0));
        }
    }

    fn machine() -> StateMachine<u8, Recorder> {
        StateMachine::new(0, [(0, Recorder("a")), (1, Recorder("b"))]).unwrap()
    }

    #[test]
    fn transitions_exit_then_enter() {
        let mut fsm = machine();
        let mut log = Vec::new();

        let transition = fsm.transition_to(1, &mut log);
        assert_eq!(transition, Some(Transition { from: 0, to: 1 }));
        assert_eq!(log, vec!["exit a", "enter b"]);

        fsm.update(&mut log);
        assert_eq!(log.last().map(String::as_str), Some("update b"));
    }

    #[test]
    fn same_or_unknown_targets_do_nothing() {
        let mut fsm = machine();
        let mut log = Vec::new();

        assert_eq!(fsm.transition_to(0, &mut log), None);
        assert_eq!(fsm.transition_to(7, &mut log), None);
        assert!(log.is_empty());
        assert_eq!(fsm.current(), 0);
    }

    #[test]
    fn missing_initial_state_is_refused() {
        assert!(StateMachine::new(3u8, [(0u8, Recorder("a"))]).is_none());
    }
}
