/*
This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
If a copy of the MPL was not distributed with this file,
You can obtain one at https://mozilla.org/MPL/2.0/.
*/
//! Ease curves - functions on a unit interval that shape how a motion progresses over time.
//!
//! Motion profiles refer to eases *by name* (e.g. `"InOutQuad"`), since they are authored
//! as data. Names are resolved once, when a `MotionInstance` is built.
//!
//! Built-in names follow the common tweening convention (`In`/`Out`/`InOut` + family),
//! and the Bevy-style spelling (`QuadraticInOut`) is accepted as well. Matching ignores case,
//! underscores, dashes and spaces, so `in_out_quad` works too.
//!
//! If you plan on using custom eases, register them with `app.register_ease_curve()`;
//! custom keys may not shadow a built-in name.
use bevy::math::curve::{Curve, EaseFunction};
use bevy::platform::sync::Arc;

use crate::errors::{ProfileValidationError, UnknownEaseStrategy};
use crate::types::{EaseKey, HelmsmanKvMap};

/// Something that can be used as a custom ease; any Bevy Curve over f32 qualifies.
///
/// The curve is sampled with `t` clamped to its own domain, so curves defined
/// over the unit interval behave the most predictably.
pub trait CustomEase: Curve<f32> + Send + Sync {}

impl<C: Curve<f32> + Send + Sync> CustomEase for C {}

/// A resolved ease, ready to be sampled.
#[derive(Clone)]
pub enum EaseCurve {
    Builtin(EaseFunction),

    /// A user-defined ease registered in the EaseRegistry.
    ///
    /// Due to the Arc<dyn T> overhead, these are a bit slower than built-ins.
    Custom(Arc<dyn CustomEase>),
}

impl EaseCurve {
    pub const LINEAR: Self = Self::Builtin(EaseFunction::Linear);

    /// Maps normalized time `t` (clamped to 0..=1) to eased progress.
    pub fn sample(&self, t: f32) -> f32 {
        let t = t.clamp(0., 1.);
        match self {
            Self::Builtin(ease) => ease.sample_clamped(t),
            Self::Custom(curve) => curve.sample_clamped(t),
        }
    }
}

impl Default for EaseCurve {
    fn default() -> Self {
        Self::LINEAR
    }
}

impl core::fmt::Debug for EaseCurve {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Builtin(ease) => f.debug_tuple("Builtin").field(ease).finish(),
            Self::Custom(_) => f.debug_tuple("Custom").finish(),
        }
    }
}

fn normalize_ease_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Retrieves a built-in ease based on a string(-ish) key.
///
/// This will only work for eases included with the library!
/// For custom ones, go through the `EaseRegistry`.
pub fn resolve_ease_from_name<S: core::borrow::Borrow<str>>(ease_name: S) -> Option<EaseCurve> {
    let ease = match normalize_ease_name(ease_name.borrow()).as_str() {
        "" | "linear" => EaseFunction::Linear,

        "insine" | "sinein" => EaseFunction::SineIn,
        "outsine" | "sineout" => EaseFunction::SineOut,
        "inoutsine" | "sineinout" => EaseFunction::SineInOut,

        "inquad" | "quadraticin" => EaseFunction::QuadraticIn,
        "outquad" | "quadraticout" => EaseFunction::QuadraticOut,
        "inoutquad" | "quadraticinout" => EaseFunction::QuadraticInOut,

        "incubic" | "cubicin" => EaseFunction::CubicIn,
        "outcubic" | "cubicout" => EaseFunction::CubicOut,
        "inoutcubic" | "cubicinout" => EaseFunction::CubicInOut,

        "inquart" | "quarticin" => EaseFunction::QuarticIn,
        "outquart" | "quarticout" => EaseFunction::QuarticOut,
        "inoutquart" | "quarticinout" => EaseFunction::QuarticInOut,

        "inquint" | "quinticin" => EaseFunction::QuinticIn,
        "outquint" | "quinticout" => EaseFunction::QuinticOut,
        "inoutquint" | "quinticinout" => EaseFunction::QuinticInOut,

        "inexpo" | "exponentialin" => EaseFunction::ExponentialIn,
        "outexpo" | "exponentialout" => EaseFunction::ExponentialOut,
        "inoutexpo" | "exponentialinout" => EaseFunction::ExponentialInOut,

        "incirc" | "circularin" => EaseFunction::CircularIn,
        "outcirc" | "circularout" => EaseFunction::CircularOut,
        "inoutcirc" | "circularinout" => EaseFunction::CircularInOut,

        "inelastic" | "elasticin" => EaseFunction::ElasticIn,
        "outelastic" | "elasticout" => EaseFunction::ElasticOut,
        "inoutelastic" | "elasticinout" => EaseFunction::ElasticInOut,

        "inback" | "backin" => EaseFunction::BackIn,
        "outback" | "backout" => EaseFunction::BackOut,
        "inoutback" | "backinout" => EaseFunction::BackInOut,

        "inbounce" | "bouncein" => EaseFunction::BounceIn,
        "outbounce" | "bounceout" => EaseFunction::BounceOut,
        "inoutbounce" | "bounceinout" => EaseFunction::BounceInOut,

        "smoothstep" => EaseFunction::SmoothStep,
        "smootherstep" => EaseFunction::SmootherStep,

        _ => return None,
    };
    Some(EaseCurve::Builtin(ease))
}

/// A map that lets us request eases by a string key and register new entries for custom eases.
#[derive(bevy::prelude::Resource, Clone, Default)]
pub struct EaseRegistry {
    mapping: HelmsmanKvMap<EaseKey, EaseCurve>
}

impl EaseRegistry {
    pub fn get_ease_by_name<S: core::borrow::Borrow<str>>(&self, name: S) -> Option<EaseCurve> {
        match resolve_ease_from_name(name.borrow()) {
            Some(builtin) => Some(builtin),
            None => self.mapping.get(name.borrow()).cloned()
        }
    }

    /// Registers a custom ease. Fails (returning the curve back) if the key names a built-in.
    pub fn register_ease<C: CustomEase + 'static>(
        &mut self,
        curve: C,
        name: EaseKey,
    ) -> Result<EaseCurve, C> {
        if resolve_ease_from_name(name.as_str()).is_some() {
            return Err(curve);
        }

        let wrapper = EaseCurve::Custom(Arc::new(curve));
        let old = self.mapping.insert(name, wrapper.clone());

        if old.is_some() {
            #[cfg(feature = "logging")]
            bevy::log::warn!("Detected an ease key collision. Ejecting previous registration...");
        }

        Ok(wrapper)
    }
}

/// Everything the executor needs to turn an ease *name* into an ease *curve*.
///
/// Both parts are optional so that code running outside of an App (or in an App
/// that never registered anything) still gets the built-ins and the default strategy.
#[derive(Clone, Copy, Default)]
pub struct EaseLookup<'a> {
    pub registry: Option<&'a EaseRegistry>,
    pub strategy: Option<&'a UnknownEaseStrategy>,
}

impl<'a> EaseLookup<'a> {
    pub fn new(registry: Option<&'a EaseRegistry>, strategy: Option<&'a UnknownEaseStrategy>) -> Self {
        Self { registry, strategy }
    }

    /// Built-in eases only, unknown names rejected.
    pub fn builtin() -> Self {
        Self::default()
    }

    pub fn resolve(&self, name: &str) -> Result<EaseCurve, ProfileValidationError> {
        let found = match self.registry {
            Some(registry) => registry.get_ease_by_name(name),
            None => resolve_ease_from_name(name),
        };

        match (found, self.strategy) {
            (Some(curve), _) => Ok(curve),
            (None, Some(strategy)) => strategy.handle(name),
            (None, None) => UnknownEaseStrategy::RejectWithLog.handle(name),
        }
    }
}


/// Something that allows us to register an ease curve to the World.
///
/// Note that for convenience, the first registration attempt
/// will initialize *an empty registry* if one does not exist yet.
pub trait AcceptsEaseRegistrations {
    fn register_ease_curve<
        C: CustomEase + 'static,
        IS: Into<String>
    >(
        &mut self,
        curve: C,
        key: IS,
    ) -> &mut Self;
}

impl AcceptsEaseRegistrations for bevy::prelude::World {
    fn register_ease_curve<
        C: CustomEase + 'static,
        IS: Into<String>
    >(
        &mut self,
        curve: C,
        key: IS,
    ) -> &mut Self {
        let mut registry = self.get_resource_or_init::<EaseRegistry>();
        let ease_key: EaseKey = key.into();

        if registry.register_ease(curve, ease_key.to_owned()).is_err() {
            #[cfg(feature = "logging")]
            bevy::log::error!(
                "Ease key {:?} collides with a built-in ease; registration ignored.",
                ease_key
            );
        }

        self
    }
}

impl AcceptsEaseRegistrations for bevy::prelude::App {
    fn register_ease_curve<
        C: CustomEase + 'static,
        IS: Into<String>
    >(
        &mut self,
        curve: C,
        key: IS,
    ) -> &mut Self {
        self.world_mut().register_ease_curve(curve, key);
        self
    }
}


#[cfg(test)]
mod tests {
    use bevy::math::curve::{FunctionCurve, Interval};
    use super::*;

    #[test]
    fn names_resolve_in_either_spelling() {
        for name in ["InOutQuad", "QuadraticInOut", "in_out_quad", "in-out quad"] {
            match resolve_ease_from_name(name) {
                Some(EaseCurve::Builtin(EaseFunction::QuadraticInOut)) => {},
                other => panic!("{:?} resolved to {:?}", name, other),
            }
        }
        assert!(resolve_ease_from_name("Wobbly").is_none());
    }

    #[test]
    fn eases_hit_both_endpoints() {
        let ease = resolve_ease_from_name("OutCubic").unwrap();
        assert!(ease.sample(0.).abs() < 1e-5);
        assert!((ease.sample(1.) - 1.).abs() < 1e-5);
        assert!((ease.sample(7.) - 1.).abs() < 1e-5);
    }

    #[test]
    fn custom_eases_cannot_shadow_builtins() {
        let mut registry = EaseRegistry::default();
        let square = FunctionCurve::new(Interval::UNIT, |t: f32| t * t);

        assert!(registry.register_ease(square.clone(), "Linear".into()).is_err());
        assert!(registry.register_ease(square, "Square".into()).is_ok());

        let resolved = registry.get_ease_by_name("Square").unwrap();
        assert!((resolved.sample(0.5) - 0.25).abs() < 1e-5);
    }

    #[test]
    fn unknown_names_follow_the_strategy() {
        let rejecting = EaseLookup::builtin();
        assert_eq!(
            rejecting.resolve("Wobbly").unwrap_err(),
            ProfileValidationError::UnknownEase("Wobbly".into())
        );

        let fallback = UnknownEaseStrategy::quietly_default_to(|_: &str| EaseCurve::LINEAR);
        let lenient = EaseLookup::new(None, Some(&fallback));
        let curve = lenient.resolve("Wobbly").unwrap();
        assert!((curve.sample(0.3) - 0.3).abs() < 1e-5);
    }
}
