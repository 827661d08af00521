/*
This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
If a copy of the MPL was not distributed with this file,
You can obtain one at https://mozilla.org/MPL/2.0/.
*/
//! Motion instances - the running, stateful counterpart of a MotionProfile.
//!
//! An instance owns a fully resolved track (concrete start and end values, a sampled path,
//! an ease curve) and a clock. Ticking it yields the pose sample to apply this frame, plus
//! any lifecycle edge (loop boundary, completion) the tick crossed.
//!
//! Instances never touch the ECS themselves; `ControlledEntity` applies their samples.
use bevy::math::cubic_splines::{CubicCardinalSpline, CubicCurve, CubicGenerator};
use bevy::prelude::*;

use crate::ease::EaseCurve;
use crate::motion_profile::{PathInterpolation, PathSpace};

/// Lifecycle of a MotionInstance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Reflect)]
pub enum MotionState {
    /// Built, but not playing yet.
    #[default]
    Idle,
    Active,
    Paused,
    /// Ran out of loops. Stays around (and queryable) until killed or restarted.
    Completed,
    /// Stopped explicitly; cannot be revived.
    Killed,
}

/// How many cycles to play and how consecutive cycles relate to each other.
///
/// `cycles` is the *total* number of cycles; None means infinite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Reflect)]
pub enum LoopMode {
    #[default]
    Once,
    Restart { cycles: Option<u32> },
    Alternate { cycles: Option<u32> },
}

impl LoopMode {
    pub fn total_cycles(&self) -> Option<u32> {
        match self {
            Self::Once => Some(1),
            Self::Restart { cycles } | Self::Alternate { cycles } => *cycles,
        }
    }

    /// Whether the given (0-based) cycle plays from end to start.
    pub fn is_backward(&self, cycle: u32) -> bool {
        matches!(self, Self::Alternate { .. }) && cycle % 2 == 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum TranslationAxis {
    X,
    Y,
}

/// A polyline or spline through waypoints, parameterized by arc length.
///
/// Sampling at `u` lands `u` of the way along the (chord) length of the path,
/// so motion speed is even across segments of different lengths.
///
/// CatmullRom paths are backed by a cardinal spline with one segment per pair of
/// neighbouring waypoints; the spline mirrors the end waypoints to get end tangents.
#[derive(Debug, Clone, PartialEq)]
pub struct WaypointPath {
    points: Vec<Vec3>,
    interpolation: PathInterpolation,
    cumulative: Vec<f32>,
    spline: Option<CubicCurve<Vec3>>,
}

impl WaypointPath {
    pub fn new(points: Vec<Vec3>, interpolation: PathInterpolation) -> Self {
        let mut cumulative = Vec::with_capacity(points.len());
        let mut total = 0.;
        for (idx, point) in points.iter().enumerate() {
            if idx > 0 {
                total += point.distance(points[idx - 1]);
            }
            cumulative.push(total);
        }

        let spline = match interpolation {
            PathInterpolation::CatmullRom => CubicCardinalSpline::new_catmull_rom(points.iter().copied())
                .to_curve()
                .ok(),
            PathInterpolation::Linear => None,
        };

        Self { points, interpolation, cumulative, spline }
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn interpolation(&self) -> PathInterpolation {
        self.interpolation
    }

    pub fn length(&self) -> f32 {
        self.cumulative.last().copied().unwrap_or(0.)
    }

    pub fn sample(&self, u: f32) -> Vec3 {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Vec3::ZERO,
        };

        let total = self.length();
        if total <= f32::EPSILON {
            return first;
        }

        let u = u.clamp(0., 1.);
        if u >= 1. {
            return last;
        }

        let travelled = u * total;
        let segment = self.cumulative
            .partition_point(|dist| *dist <= travelled)
            .saturating_sub(1)
            .min(self.points.len() - 2);

        let seg_start = self.cumulative[segment];
        let seg_len = self.cumulative[segment + 1] - seg_start;
        let local_t = match seg_len > f32::EPSILON {
            true => (travelled - seg_start) / seg_len,
            false => 0.,
        };

        match &self.spline {
            Some(spline) => spline.position(segment as f32 + local_t),
            None => self.points[segment].lerp(self.points[segment + 1], local_t),
        }
    }
}

/// The resolved "from/to" of a motion, with everything relative already baked in.
#[derive(Debug, Clone, PartialEq)]
pub enum MotionTrack {
    /// World-space translation.
    Translate { from: Vec3, to: Vec3 },
    /// World-space translation along one axis.
    TranslateAxis { axis: TranslationAxis, from: f32, to: f32 },
    /// World-space translation with `arcs` parabolic hops of `height` on top.
    Jump { from: Vec3, to: Vec3, height: f32, arcs: u32 },
    Rotate { from: Quat, to: Quat },
    Scale { from: Vec3, to: Vec3 },
    Path { path: WaypointPath, space: PathSpace },
}

/// One frame's worth of pose to write into a Transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionSample {
    Translation { value: Vec3, space: PathSpace },
    TranslationAxis { axis: TranslationAxis, value: f32 },
    Rotation(Quat),
    Scale(Vec3),
}

impl MotionTrack {
    /// Evaluates the track at eased progress `e`. Overshooting eases (Back, Elastic) may
    /// push `e` outside 0..=1, which extrapolates where that makes sense.
    pub fn sample(&self, e: f32) -> MotionSample {
        match self {
            Self::Translate { from, to } => MotionSample::Translation {
                value: from.lerp(*to, e),
                space: PathSpace::World,
            },
            Self::TranslateAxis { axis, from, to } => MotionSample::TranslationAxis {
                axis: *axis,
                value: from + (to - from) * e,
            },
            Self::Jump { from, to, height, arcs } => {
                let base = from.lerp(*to, e);
                let hop = match e >= 1. || e <= 0. {
                    true => 0.,
                    false => {
                        let s = (e * *arcs as f32).fract();
                        height * 4. * s * (1. - s)
                    },
                };
                MotionSample::Translation { value: base + Vec3::Y * hop, space: PathSpace::World }
            },
            Self::Rotate { from, to } => MotionSample::Rotation(from.slerp(*to, e)),
            Self::Scale { from, to } => MotionSample::Scale(from.lerp(*to, e)),
            Self::Path { path, space } => MotionSample::Translation {
                value: path.sample(e),
                space: *space,
            },
        }
    }
}

/// Lifecycle edges crossed during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickEvent {
    /// One or more cycles ended. `cycle` is the 0-based index of the cycle now playing,
    /// `crossed` how many boundaries this tick went over (more than one on large steps).
    LoopBoundary { cycle: u32, crossed: u32 },
    Completed,
}

/// The result of ticking a MotionInstance.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickOutcome {
    /// Pose to apply, if any. None while delayed, paused or finished.
    pub sample: Option<MotionSample>,
    pub event: Option<TickEvent>,
}

/// A running motion.
#[derive(Debug, Clone)]
pub struct MotionInstance {
    track: MotionTrack,
    ease: EaseCurve,
    duration: f32,
    delay: f32,
    loop_mode: LoopMode,

    state: MotionState,

    /// Seconds since (re)start, including the delay.
    elapsed: f32,
    cycle: u32,

    /// Set on restart so the next tick snaps back to the start pose even while delayed.
    rewind_pending: bool,
}

impl MotionInstance {
    /// Creates an Idle instance. `duration` is expected to be positive; the executor guarantees it.
    pub fn new(track: MotionTrack, ease: EaseCurve, duration: f32, delay: f32, loop_mode: LoopMode) -> Self {
        Self {
            track,
            ease,
            duration,
            delay: delay.max(0.),
            loop_mode,
            state: MotionState::Idle,
            elapsed: 0.,
            cycle: 0,
            rewind_pending: false,
        }
    }

    pub fn track(&self) -> &MotionTrack {
        &self.track
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn delay(&self) -> f32 {
        self.delay
    }

    /// Index of the cycle currently playing (0-based).
    pub fn current_cycle(&self) -> u32 {
        self.cycle
    }

    /// Active or Paused - i.e. the motion still has somewhere to go.
    pub fn is_live(&self) -> bool {
        matches!(self.state, MotionState::Active | MotionState::Paused)
    }

    /// Idle -> Active. Returns whether anything changed.
    pub fn play(&mut self) -> bool {
        match self.state {
            MotionState::Idle => {
                self.state = MotionState::Active;
                true
            },
            _ => false,
        }
    }

    /// Active -> Paused. Returns whether anything changed.
    pub fn pause(&mut self) -> bool {
        match self.state {
            MotionState::Active => {
                self.state = MotionState::Paused;
                true
            },
            _ => false,
        }
    }

    /// Paused -> Active. Returns whether anything changed.
    pub fn resume(&mut self) -> bool {
        match self.state {
            MotionState::Paused => {
                self.state = MotionState::Active;
                true
            },
            _ => false,
        }
    }

    /// Rewinds to the start (delay included) and plays. Killed instances stay dead.
    pub fn restart(&mut self) -> bool {
        if self.state == MotionState::Killed {
            return false;
        }

        self.elapsed = 0.;
        self.cycle = 0;
        self.rewind_pending = true;
        self.state = MotionState::Active;
        true
    }

    /// Terminates the instance. Returns false if it was already killed.
    pub fn kill(&mut self) -> bool {
        match self.state {
            MotionState::Killed => false,
            _ => {
                self.state = MotionState::Killed;
                true
            },
        }
    }

    fn active_time(&self) -> f32 {
        (self.elapsed - self.delay).max(0.)
    }

    /// Fraction of the motion played so far.
    ///
    /// For finite motions, this is the fraction of *all* cycles. For infinite ones,
    /// it is the fraction of the current cycle.
    pub fn progress(&self) -> f32 {
        match self.state {
            MotionState::Idle => 0.,
            MotionState::Completed => 1.,
            _ => {
                let played = self.active_time() / self.duration;
                match self.loop_mode.total_cycles() {
                    Some(total) => (played / total.max(1) as f32).clamp(0., 1.),
                    None => played.fract(),
                }
            },
        }
    }

    fn sample_at(&self, cycle: u32, local_t: f32) -> MotionSample {
        let t = match self.loop_mode.is_backward(cycle) {
            true => 1. - local_t,
            false => local_t,
        };
        self.track.sample(self.ease.sample(t))
    }

    /// Advances the clock by `dt` seconds.
    pub fn tick(&mut self, dt: f32) -> TickOutcome {
        if self.state != MotionState::Active {
            return TickOutcome::default();
        }

        self.elapsed += dt.max(0.);

        if self.elapsed < self.delay {
            let sample = match core::mem::take(&mut self.rewind_pending) {
                true => Some(self.sample_at(0, 0.)),
                false => None,
            };
            return TickOutcome { sample, event: None };
        }
        self.rewind_pending = false;

        let played = self.active_time() / self.duration;
        let cycle = played.floor() as u32;

        if let Some(total) = self.loop_mode.total_cycles() {
            let total = total.max(1);
            if cycle >= total {
                let last = total - 1;
                self.cycle = last;
                self.state = MotionState::Completed;
                return TickOutcome {
                    sample: Some(self.sample_at(last, 1.)),
                    event: Some(TickEvent::Completed),
                };
            }
        }

        let event = match cycle > self.cycle {
            true => Some(TickEvent::LoopBoundary { cycle, crossed: cycle - self.cycle }),
            false => None,
        };
        self.cycle = cycle;

        TickOutcome {
            sample: Some(self.sample_at(cycle, played - cycle as f32)),
            event,
        }
    }
}
