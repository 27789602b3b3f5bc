//! # Scene Management Module
//!
//! In-memory representation of a loaded asset. The node hierarchy lives in
//! [`SceneGraph`], a structure-of-arrays store keyed by node index; meshes,
//! skins and materials are referenced from nodes by index.
//!
//! ## Key Components
//!
//! - [`Scene`] - the loaded asset and its GPU state
//! - [`SceneGraph`] - nodes, local and world transforms, dirty tracking
//! - [`Mesh`] / [`Primitive`] - geometry, morph targets and bounds
//! - [`Skin`] - joints and inverse bind matrices
//! - [`PunctualLight`] - lights carried by nodes
//! - [`Vertex`] - the interleaved vertex layout shared by every pipeline

pub mod graph;
pub mod light;
pub mod mesh;
pub mod scene;
pub mod skin;
pub mod vertex;

pub use graph::{LocalTransform, NodeDesc, NodeId, SceneGraph};
pub use light::{LightKind, PunctualLight};
pub use mesh::{Mesh, MorphTarget, Primitive, Topology};
pub use scene::{DrawInstance, SamplerDesc, Scene, SceneRoots, SceneStats, TextureDesc, UploadContext};
pub use skin::Skin;
pub use vertex::Vertex;
