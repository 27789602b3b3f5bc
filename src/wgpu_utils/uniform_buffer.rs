// src/wgpu_utils/uniform_buffer.rs
//! Typed uniform blocks
//!
//! Frame, draw and material uniforms are rewritten every frame from CPU
//! state that rarely changes, so [`UniformBuffer`] remembers the bytes of its
//! last write and drops identical ones.

use std::marker::PhantomData;

use wgpu::util::DeviceExt;

pub struct UniformBuffer<Content> {
    buffer: wgpu::Buffer,
    last_written: Vec<u8>,
    content: PhantomData<Content>,
}

impl<Content: bytemuck::Pod> UniformBuffer<Content> {
    /// Creates the buffer already holding `initial`
    pub fn new(device: &wgpu::Device, label: &str, initial: &Content) -> Self {
        let bytes = bytemuck::bytes_of(initial);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytes,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            buffer,
            last_written: bytes.to_vec(),
            content: PhantomData,
        }
    }

    /// Queues a write of `content`; returns false when it matches the last one
    pub fn update_content(&mut self, queue: &wgpu::Queue, content: Content) -> bool {
        let bytes = bytemuck::bytes_of(&content);
        if self.last_written == bytes {
            return false;
        }
        queue.write_buffer(&self.buffer, 0, bytes);
        self.last_written.clear();
        self.last_written.extend_from_slice(bytes);
        true
    }

    pub fn binding_resource(&self) -> wgpu::BindingResource<'_> {
        self.buffer.as_entire_binding()
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn byte_size(&self) -> u64 {
        std::mem::size_of::<Content>() as u64
    }
}
