// src/lib.rs
//! Thistle glTF Viewer Core
//!
//! Loads glTF 2.0 models and renders them with physically based shading and
//! image-based lighting on wgpu. Skeletal, morph and node animations play
//! against a wall clock; an orbit camera frames the model.

pub mod animation;
pub mod asset;
pub mod engine;
pub mod error;
pub mod gfx;
pub mod ibl;
pub mod math;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use engine::{Clock, Engine, EngineConfig, EngineHandle, ManualClock, SystemClock};
pub use error::{ErrorKind, Result, ViewerError};
pub use gfx::camera::{OrbitCamera, SharedCamera};
pub use gfx::rendering::{RenderSettings, ToneMap};
pub use ibl::IblConfig;

/// Installs `env_logger` with an `info` default; `RUST_LOG` overrides it
///
/// Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();
}
