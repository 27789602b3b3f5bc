//! # Asset Ingestion
//!
//! glTF 2.0 loading from text or binary containers. Everything here is CPU
//! work: the result is a [`Scene`](crate::gfx::scene::Scene) that the
//! renderer uploads separately.

pub mod accessor;
pub mod container;
pub mod image;
pub mod loader;
pub mod resolver;

#[cfg(test)]
pub(crate) mod testing;

pub use loader::{load_scene, load_scene_from_path, SUPPORTED_REQUIRED_EXTENSIONS};
pub use resolver::{FileResolver, MemoryResolver, NullResolver, ResourceResolver};
