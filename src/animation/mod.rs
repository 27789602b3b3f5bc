//! # Animation
//!
//! Keyframe clips loaded from glTF, their interpolation and the engine that
//! plays them against a [`SceneGraph`](crate::gfx::scene::graph::SceneGraph).

pub mod clip;
pub mod engine;
pub mod interpolate;

pub use clip::{AnimationClip, AnimationSampler, Channel, Interpolation, TargetPath};
pub use engine::{AnimationEngine, AnimationState, LOOP_FOREVER};
