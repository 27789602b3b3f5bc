//! # Graphics Module
//!
//! Everything that ends up on the GPU: the camera, the in-memory scene, GPU
//! resources and the frame renderer.
//!
//! ## Architecture Overview
//!
//! - **Camera System** ([`camera`]) - orbit camera with scene fitting, shared with the host
//! - **Scene Management** ([`scene`]) - node graph, meshes, skins and the loaded asset
//! - **Resource Management** ([`resources`]) - handle table, textures, materials and bindings
//! - **Rendering Pipeline** ([`rendering`]) - shader variants, draw lists and the PBR/IBL renderer
//!
//! ## Usage
//!
//! Hosts normally go through [`Engine`](crate::engine::Engine), which owns a
//! [`RenderEngine`] and the current [`Scene`](scene::Scene):
//!
//! ```no_run
//! use thistle::{asset::NullResolver, Engine, EngineConfig};
//!
//! let mut engine = Engine::new(EngineConfig::default())?;
//! let bytes = std::fs::read("model.glb").unwrap_or_default();
//! if engine.load_model_from_bytes(&bytes, &NullResolver) {
//!     engine.render_frame(800, 600)?;
//! }
//! # Ok::<(), thistle::ViewerError>(())
//! ```

pub mod camera;
pub mod rendering;
pub mod resources;
pub mod scene;

pub use camera::{OrbitCamera, SharedCamera};
pub use rendering::RenderEngine;
