//! Render pass helpers for scene primitives

use wgpu::*;

use crate::gfx::{resources::gpu_resources::GpuResourceManager, scene::mesh::Primitive};

/// Extension trait for RenderPass to draw uploaded primitives
pub trait RenderPassExt {
    /// Binds the primitive's buffers and issues its draw
    ///
    /// Returns false, drawing nothing, when the primitive has no GPU buffers.
    fn draw_primitive(&mut self, gpu: &GpuResourceManager, primitive: &Primitive) -> bool;
}

impl RenderPassExt for RenderPass<'_> {
    fn draw_primitive(&mut self, gpu: &GpuResourceManager, primitive: &Primitive) -> bool {
        let Some(handles) = primitive.gpu else {
            return false;
        };
        let Some(vertex_buffer) = gpu.buffer(handles.vertex_buffer) else {
            return false;
        };

        self.set_vertex_buffer(0, vertex_buffer.slice(..));
        match handles.index_buffer.and_then(|h| gpu.buffer(h)) {
            Some(index_buffer) => {
                self.set_index_buffer(index_buffer.slice(..), IndexFormat::Uint32);
                self.draw_indexed(0..primitive.element_count(), 0, 0..1);
            }
            None if handles.index_buffer.is_some() => return false,
            None => self.draw(0..primitive.element_count(), 0..1),
        }
        true
    }
}
