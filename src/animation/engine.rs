//! # Animation Engine
//!
//! Tracks the active animations of a scene and writes their sampled values
//! into the scene graph. Animations are kept in registration order; when two
//! of them drive the same node property the later one wins because it is
//! applied last.
//!
//! Time is wall-clock seconds as `f64`. Each state accumulates its own local
//! time so pausing and speed changes take effect from the moment they are
//! made.

use super::{
    clip::AnimationClip,
    interpolate::{sample, SampledValue},
};
use crate::{
    error::{Result, ViewerError},
    gfx::scene::graph::{NodeId, NodeState, SceneGraph},
};

/// Loop count meaning "repeat forever"
pub const LOOP_FOREVER: i32 = -1;

/// Per active animation bookkeeping
#[derive(Debug, Clone)]
pub struct AnimationState {
    pub clip: usize,
    pub start: f64,
    /// -1 for infinite
    pub loop_count: i32,
    pub paused: bool,
    pub speed: f32,
    local_time: f64,
    last_now: f64,
    snapshot: Vec<(NodeId, NodeState)>,
}

impl AnimationState {
    pub fn local_time(&self) -> f64 {
        self.local_time
    }

    fn is_finished(&self, duration: f32) -> bool {
        self.loop_count != LOOP_FOREVER
            && self.local_time.abs() >= self.loop_count as f64 * duration as f64
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnimationEngine {
    clips: Vec<AnimationClip>,
    active: Vec<AnimationState>,
    last_advance: Option<f64>,
}

impl AnimationEngine {
    pub fn new(clips: Vec<AnimationClip>) -> Self {
        Self {
            clips,
            active: Vec::new(),
            last_advance: None,
        }
    }

    pub fn clips(&self) -> &[AnimationClip] {
        &self.clips
    }

    /// Clip names in declaration order
    pub fn names(&self) -> Vec<String> {
        self.clips.iter().map(|c| c.name.clone()).collect()
    }

    /// Names of active animations in registration order
    pub fn active_animations(&self) -> Vec<String> {
        self.active
            .iter()
            .map(|s| self.clips[s.clip].name.clone())
            .collect()
    }

    pub fn state(&self, name: &str) -> Option<&AnimationState> {
        let clip = self.find_clip(name)?;
        self.active.iter().find(|s| s.clip == clip)
    }

    pub fn is_playing(&self, name: &str) -> bool {
        self.state(name).is_some()
    }

    fn find_clip(&self, name: &str) -> Option<usize> {
        self.clips.iter().position(|c| c.name == name)
    }

    fn require_clip(&self, name: &str) -> Result<usize> {
        self.find_clip(name)
            .ok_or_else(|| ViewerError::InvalidArgument(format!("no animation named '{}'", name)))
    }

    fn active_index(&self, clip: usize) -> Option<usize> {
        self.active.iter().position(|s| s.clip == clip)
    }

    /// Starts or restarts an animation at wall-clock time `now`
    ///
    /// A loop count of -1 repeats forever and 0 does not start (returns
    /// `Ok(false)`). Replaying an active animation restarts it, keeps the
    /// snapshot from the first play and moves it to the end of the order.
    pub fn play(&mut self, graph: &SceneGraph, name: &str, loop_count: i32, now: f64) -> Result<bool> {
        if loop_count < LOOP_FOREVER {
            return Err(ViewerError::InvalidArgument(format!(
                "loop count {} for '{}'",
                loop_count, name
            )));
        }
        let clip = self.require_clip(name)?;
        if loop_count == 0 {
            log::debug!("Animation '{}' requested with zero loops, not started", name);
            return Ok(false);
        }

        let state = match self.active_index(clip) {
            Some(index) => {
                let mut state = self.active.remove(index);
                state.start = now;
                state.local_time = 0.0;
                state.last_now = now;
                state.loop_count = loop_count;
                state.paused = false;
                state
            }
            None => {
                let snapshot = self.clips[clip]
                    .target_nodes()
                    .into_iter()
                    .filter(|&n| graph.contains(n))
                    .map(|n| (n, graph.capture_state(n)))
                    .collect();
                AnimationState {
                    clip,
                    start: now,
                    loop_count,
                    paused: false,
                    speed: 1.0,
                    local_time: 0.0,
                    last_now: now,
                    snapshot,
                }
            }
        };

        log::info!("Playing animation '{}' (loops: {})", name, loop_count);
        self.active.push(state);
        Ok(true)
    }

    /// Stops an animation and restores the properties it drove
    ///
    /// Returns false when the animation was not active.
    pub fn stop(&mut self, graph: &mut SceneGraph, name: &str) -> Result<bool> {
        let clip = self.require_clip(name)?;
        let Some(index) = self.active_index(clip) else {
            return Ok(false);
        };
        let state = self.active.remove(index);
        restore(graph, &state);
        log::info!("Stopped animation '{}'", name);
        Ok(true)
    }

    /// Stops every animation, restoring in reverse registration order
    pub fn stop_all(&mut self, graph: &mut SceneGraph) {
        while let Some(state) = self.active.pop() {
            restore(graph, &state);
        }
    }

    pub fn pause(&mut self, name: &str) -> Result<bool> {
        self.with_state(name, |s| s.paused = true)
    }

    pub fn resume(&mut self, name: &str) -> Result<bool> {
        self.with_state(name, |s| s.paused = false)
    }

    pub fn set_speed(&mut self, name: &str, speed: f32) -> Result<bool> {
        if !speed.is_finite() {
            return Err(ViewerError::InvalidArgument(format!("speed {}", speed)));
        }
        self.with_state(name, |s| s.speed = speed)
    }

    fn with_state(&mut self, name: &str, f: impl FnOnce(&mut AnimationState)) -> Result<bool> {
        let clip = self.require_clip(name)?;
        match self.active.iter_mut().find(|s| s.clip == clip) {
            Some(state) => {
                f(state);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Advances every active animation to `now` and writes the results
    ///
    /// Calling twice with the same `now` changes nothing. Animations whose
    /// loops are exhausted are removed and their snapshots restored before
    /// the remaining animations are applied. Returns the number of channel
    /// values written.
    pub fn advance(&mut self, graph: &mut SceneGraph, now: f64) -> usize {
        if self.last_advance == Some(now) {
            return 0;
        }
        self.last_advance = Some(now);

        for state in self.active.iter_mut() {
            if !state.paused {
                state.local_time += (now - state.last_now) * state.speed as f64;
            }
            state.last_now = now;
        }

        let clips = &self.clips;
        let (finished, running): (Vec<_>, Vec<_>) = self
            .active
            .drain(..)
            .partition(|s| s.is_finished(clips[s.clip].duration));

        for state in finished.iter().rev() {
            log::info!("Animation '{}' finished", clips[state.clip].name);
            restore(graph, state);
        }
        self.active = running;

        let mut written = 0;
        for state in &self.active {
            let clip = &self.clips[state.clip];
            let t = if clip.duration > 0.0 {
                state.local_time.rem_euclid(clip.duration as f64) as f32
            } else {
                0.0
            };
            written += apply_clip(graph, clip, t);
        }
        written
    }
}

fn restore(graph: &mut SceneGraph, state: &AnimationState) {
    for (node, saved) in &state.snapshot {
        graph.restore_state(*node, saved);
    }
}

/// Samples every channel of `clip` at `t` and writes into the graph
pub fn apply_clip(graph: &mut SceneGraph, clip: &AnimationClip, t: f32) -> usize {
    let mut written = 0;
    for channel in &clip.channels {
        if !graph.contains(channel.node) {
            continue;
        }
        let Some(sampler) = clip.samplers.get(channel.sampler) else {
            continue;
        };
        let Some(value) = sample(sampler, channel.path, t) else {
            continue;
        };

        match value {
            SampledValue::Translation(v) => graph.set_translation(channel.node, v),
            SampledValue::Rotation(q) => graph.set_rotation(channel.node, q),
            SampledValue::Scale(v) => graph.set_scale(channel.node, v),
            SampledValue::Weights(w) => graph.set_weights(channel.node, w),
        }
        written += 1;
    }
    written
}
