/*
This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
If a copy of the MPL was not distributed with this file,
You can obtain one at https://mozilla.org/MPL/2.0/.
*/
use bevy::ecs::resource::Resource;
use bevy::prelude::Entity;
use thiserror::Error;

use crate::ease::EaseCurve;

/// Why a MotionProfile was refused by the executor.
///
/// Only the *first* violated invariant is reported; fix it and try again.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProfileValidationError {
    #[error("duration must be greater than 0 (got {0})")]
    NonPositiveDuration(f32),

    #[error("path movement requires at least 2 waypoints (got {0})")]
    InsufficientWaypoints(usize),

    #[error("jump arc count must be at least 1 (got {0})")]
    InvalidJumpArcs(u32),

    #[error("delay must be a finite, non-negative number of seconds (got {0})")]
    InvalidDelay(f32),

    #[error("loop count must be -1 (infinite), 0 (none) or positive (got {0})")]
    InvalidLoopCount(i32),

    #[error("no ease curve named {0:?} is built in or registered")]
    UnknownEase(String),
}

/// Why an InputForceBridge cannot be bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BridgeValidationError {
    #[error("bridge has no input action configured")]
    MissingInput,

    #[error("bridge has no force configuration")]
    MissingForce,
}

/// Recoverable problems hit while moving control authority around.
///
/// None of these are fatal; the offending operation is simply skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthorityError {
    #[error("control authority has not been initialized")]
    NotInitialized,

    #[error("entity {0:?} is not a vehicle")]
    NotAVehicle(Entity),

    #[error("vehicle {0:?} has no linked player")]
    NoLinkedPlayer(Entity),

    #[error("vehicle {0:?} is already being driven")]
    AlreadyDriven(Entity),

    #[error("entity {0:?} is not a controlled entity")]
    NotControlled(Entity),

    #[error("the player is already the active controller")]
    NotMounted,
}

pub trait EaseResolverFn: Send + Sync + Fn(&str) -> EaseCurve {}
impl<F: Send + Sync + Fn(&str) -> EaseCurve> EaseResolverFn for F {}

/// A config value indicating how the library should handle ease names that
/// do not correspond to any known curve (dynamically registered or built in).
///
/// By default the profile is rejected with a validation error, so a typo in
/// authored data results in a motionless entity and an error in the log rather
/// than a silently different animation.
#[derive(Default)]
pub enum UnknownEaseStrategy {
    #[default]
    RejectWithLog,
    Panic,
    DefaultEaseWithLog(Box<dyn EaseResolverFn>),
    DefaultEaseWithoutLog(Box<dyn EaseResolverFn>),
}

impl UnknownEaseStrategy {
    pub const fn reject() -> Self {
        Self::RejectWithLog
    }

    pub const fn panic() -> Self {
        Self::Panic
    }

    pub fn log_and_default_to<F: EaseResolverFn + 'static>(ease_fn: F) -> Self {
        Self::DefaultEaseWithLog(Box::new(ease_fn))
    }

    pub fn quietly_default_to<F: EaseResolverFn + 'static>(ease_fn: F) -> Self {
        Self::DefaultEaseWithoutLog(Box::new(ease_fn))
    }

    /// Applies the strategy to an ease name nobody recognized.
    pub fn handle(&self, ease_name: &str) -> Result<EaseCurve, ProfileValidationError> {
        match self {
            Self::RejectWithLog => {
                #[cfg(feature = "logging")]
                bevy::log::error!("Unknown ease curve {:?} - refusing to build the motion.", ease_name);
                Err(ProfileValidationError::UnknownEase(ease_name.to_owned()))
            },
            Self::Panic => panic!("Unknown ease curve {:?}!", ease_name),
            Self::DefaultEaseWithLog(resolver) => {
                let fallback = resolver(ease_name);
                #[cfg(feature = "logging")]
                bevy::log::warn!("Unknown ease curve {:?} - falling back to {:?}.", ease_name, fallback);
                Ok(fallback)
            },
            Self::DefaultEaseWithoutLog(resolver) => Ok(resolver(ease_name)),
        }
    }
}

impl core::fmt::Debug for UnknownEaseStrategy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::RejectWithLog => write!(f, "RejectWithLog"),
            Self::Panic => write!(f, "Panic"),
            Self::DefaultEaseWithLog(_) => write!(f, "DefaultEaseWithLog"),
            Self::DefaultEaseWithoutLog(_) => write!(f, "DefaultEaseWithoutLog"),
        }
    }
}

/// A Resource that represents app-wide configuration for how to handle bad ease names.
#[derive(Resource, Default)]
pub struct UnknownEaseStrategyConfig(pub UnknownEaseStrategy);

impl UnknownEaseStrategyConfig {
    /// Sets the handler to one of the supported strategies (reject, panic, default, etc.).
    pub fn set(&mut self, strategy: UnknownEaseStrategy) -> &mut Self {
        self.0 = strategy;
        self
    }

    /// Configures the app to refuse profiles with unknown ease names.
    ///
    /// This is the default behavior, so this method is only useful if something
    /// else has already modified the default settings.
    pub fn set_reject(&mut self) -> &mut Self {
        self.set(UnknownEaseStrategy::reject())
    }

    /// Configures the app to panic on unknown ease names.
    ///
    /// Handy in tests and CI asset validation, where bad data should fail loudly.
    pub fn set_panic(&mut self) -> &mut Self {
        self.set(UnknownEaseStrategy::panic())
    }

    /// Configures the app to log a warning and use the ease picked by the
    /// provided (`'static`!) mapping function instead.
    ///
    /// This keeps designer typos from freezing props in place, at the price
    /// of the motion looking subtly different from what was authored.
    pub fn set_log_and_use_default<F: EaseResolverFn + 'static>(&mut self, resolver: F) -> &mut Self {
        self.set(UnknownEaseStrategy::log_and_default_to(resolver))
    }

    /// Same as `set_log_and_use_default()`, minus the warning.
    pub fn set_silently_use_default<F: EaseResolverFn + 'static>(&mut self, resolver: F) -> &mut Self {
        self.set(UnknownEaseStrategy::quietly_default_to(resolver))
    }
}
