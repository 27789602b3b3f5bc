//! Frame rendering
//!
//! Pipelines and shader variants, the per-frame draw list, output settings
//! and the [`RenderEngine`] that ties them to a wgpu device.

pub mod draw_list;
pub mod pipeline_manager;
pub mod render_engine;
pub mod render_pass_ext;
pub mod settings;

pub use draw_list::{DrawItem, DrawList};
pub use pipeline_manager::{PipelineConfig, PipelineManager, PipelineStats, VariantKey};
pub use render_engine::{FrameStats, RenderEngine, RenderTarget};
pub use settings::{RenderSettings, ToneMap};
