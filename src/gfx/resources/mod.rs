//! GPU resource management
//!
//! Handle table for buffers, textures, samplers and pipelines, plus the
//! texture, material and uniform binding types built on it.

pub mod global_bindings;
pub mod gpu_resources;
pub mod material;
pub mod texture_resource;

pub use global_bindings::{DrawUniform, FrameUniform, GlobalBindings, IblViews};
pub use gpu_resources::{GpuResourceManager, GpuResourceStats, ResourceHandle, ResourceKind};
pub use material::{AlphaMode, FeatureMask, Material, MaterialSlot};
pub use texture_resource::{TextureEncoding, TextureResource};
