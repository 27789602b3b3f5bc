//! # GPU Resource Manager
//!
//! Owns every GPU buffer, texture, sampler and compiled pipeline the viewer
//! creates. Callers hold [`ResourceHandle`]s, plain integers issued in
//! increasing order and never reused, and look resources up through the
//! manager.
//!
//! Buffer contents are queued when a buffer is created and written in one
//! batch by [`GpuResourceManager::flush`], which the renderer calls before
//! encoding the first draw of a frame.

use std::{collections::HashMap, sync::Arc};

use super::texture_resource::TextureResource;

/// Stable identifier of a GPU resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceHandle(u64);

impl ResourceHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Buffer,
    Texture,
    Sampler,
    Program,
}

/// Diagnostic record kept for every live handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceInfo {
    pub kind: ResourceKind,
    pub size: u64,
    pub created_frame: u64,
    pub label: String,
}

/// Live handle counts and byte totals per kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GpuResourceStats {
    pub buffers: usize,
    pub textures: usize,
    pub samplers: usize,
    pub programs: usize,
    pub buffer_bytes: u64,
    pub texture_bytes: u64,
}

impl GpuResourceStats {
    pub fn total_handles(&self) -> usize {
        self.buffers + self.textures + self.samplers + self.programs
    }

    pub fn total_bytes(&self) -> u64 {
        self.buffer_bytes + self.texture_bytes
    }
}

/// Handle-keyed table with monotonically increasing ids
///
/// Kept separate from the wgpu objects so the bookkeeping can be exercised
/// without a device.
#[derive(Debug)]
pub struct HandleTable<R> {
    entries: HashMap<ResourceHandle, (R, ResourceInfo)>,
    next_id: u64,
    frame: u64,
}

impl<R> Default for HandleTable<R> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            next_id: 1,
            frame: 0,
        }
    }
}

impl<R> HandleTable<R> {
    pub fn insert(&mut self, resource: R, kind: ResourceKind, size: u64, label: &str) -> ResourceHandle {
        let handle = ResourceHandle(self.next_id);
        self.next_id += 1;
        self.entries.insert(
            handle,
            (
                resource,
                ResourceInfo {
                    kind,
                    size,
                    created_frame: self.frame,
                    label: label.to_string(),
                },
            ),
        );
        handle
    }

    pub fn get(&self, handle: ResourceHandle) -> Option<&R> {
        self.entries.get(&handle).map(|(r, _)| r)
    }

    pub fn info(&self, handle: ResourceHandle) -> Option<&ResourceInfo> {
        self.entries.get(&handle).map(|(_, info)| info)
    }

    pub fn remove(&mut self, handle: ResourceHandle) -> Option<R> {
        self.entries.remove(&handle).map(|(r, _)| r)
    }

    pub fn contains(&self, handle: ResourceHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn advance_frame(&mut self) -> u64 {
        self.frame += 1;
        self.frame
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn stats(&self) -> GpuResourceStats {
        let mut stats = GpuResourceStats::default();
        for (_, info) in self.entries.values() {
            match info.kind {
                ResourceKind::Buffer => {
                    stats.buffers += 1;
                    stats.buffer_bytes += info.size;
                }
                ResourceKind::Texture => {
                    stats.textures += 1;
                    stats.texture_bytes += info.size;
                }
                ResourceKind::Sampler => stats.samplers += 1,
                ResourceKind::Program => stats.programs += 1,
            }
        }
        stats
    }
}

/// Resource stored behind a handle
#[derive(Debug)]
pub enum GpuResource {
    Buffer(wgpu::Buffer),
    Texture(TextureResource),
    Sampler(wgpu::Sampler),
    Program(wgpu::RenderPipeline),
    ComputeProgram(wgpu::ComputePipeline),
}

struct PendingWrite {
    handle: ResourceHandle,
    offset: u64,
    data: Vec<u8>,
}

pub struct GpuResourceManager {
    device: Arc<wgpu::Device>,
    table: HandleTable<GpuResource>,
    pending: Vec<PendingWrite>,
}

impl GpuResourceManager {
    pub fn new(device: Arc<wgpu::Device>) -> Self {
        Self {
            device,
            table: HandleTable::default(),
            pending: Vec::new(),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Starts a new frame for creation-frame bookkeeping
    pub fn begin_frame(&mut self) -> u64 {
        self.table.advance_frame()
    }

    pub fn frame(&self) -> u64 {
        self.table.frame()
    }

    /// Creates a buffer and queues `contents` for the next flush
    ///
    /// The size is rounded up to the 4-byte copy alignment.
    pub fn create_buffer(&mut self, label: &str, usage: wgpu::BufferUsages, contents: &[u8]) -> ResourceHandle {
        let size = (contents.len() as u64).max(4).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let handle = self
            .table
            .insert(GpuResource::Buffer(buffer), ResourceKind::Buffer, size, label);

        if !contents.is_empty() {
            let mut data = contents.to_vec();
            data.resize(size as usize, 0);
            self.pending.push(PendingWrite {
                handle,
                offset: 0,
                data,
            });
        }
        handle
    }

    pub fn insert_texture(&mut self, texture: TextureResource, label: &str) -> ResourceHandle {
        let size = texture.byte_size();
        self.table
            .insert(GpuResource::Texture(texture), ResourceKind::Texture, size, label)
    }

    pub fn create_sampler(&mut self, descriptor: &wgpu::SamplerDescriptor, label: &str) -> ResourceHandle {
        let sampler = self.device.create_sampler(descriptor);
        self.table
            .insert(GpuResource::Sampler(sampler), ResourceKind::Sampler, 0, label)
    }

    pub fn insert_program(&mut self, pipeline: wgpu::RenderPipeline, label: &str) -> ResourceHandle {
        self.table
            .insert(GpuResource::Program(pipeline), ResourceKind::Program, 0, label)
    }

    pub fn insert_compute_program(&mut self, pipeline: wgpu::ComputePipeline, label: &str) -> ResourceHandle {
        self.table
            .insert(GpuResource::ComputeProgram(pipeline), ResourceKind::Program, 0, label)
    }

    /// Queues a write into an existing buffer
    pub fn queue_write(&mut self, handle: ResourceHandle, offset: u64, data: &[u8]) {
        if self.buffer(handle).is_some() {
            self.pending.push(PendingWrite {
                handle,
                offset,
                data: data.to_vec(),
            });
        } else {
            log::warn!("Ignoring write to unknown buffer {:?}", handle);
        }
    }

    pub fn pending_writes(&self) -> usize {
        self.pending.len()
    }

    /// Writes every queued upload; returns the number of bytes written
    pub fn flush(&mut self, queue: &wgpu::Queue) -> u64 {
        let mut written = 0;
        for write in self.pending.drain(..) {
            // Released before the flush
            let Some((GpuResource::Buffer(buffer), _)) = self.table.entries.get(&write.handle) else {
                continue;
            };
            queue.write_buffer(buffer, write.offset, &write.data);
            written += write.data.len() as u64;
        }
        written
    }

    pub fn buffer(&self, handle: ResourceHandle) -> Option<&wgpu::Buffer> {
        match self.table.get(handle) {
            Some(GpuResource::Buffer(b)) => Some(b),
            _ => None,
        }
    }

    pub fn texture(&self, handle: ResourceHandle) -> Option<&TextureResource> {
        match self.table.get(handle) {
            Some(GpuResource::Texture(t)) => Some(t),
            _ => None,
        }
    }

    pub fn sampler(&self, handle: ResourceHandle) -> Option<&wgpu::Sampler> {
        match self.table.get(handle) {
            Some(GpuResource::Sampler(s)) => Some(s),
            _ => None,
        }
    }

    pub fn program(&self, handle: ResourceHandle) -> Option<&wgpu::RenderPipeline> {
        match self.table.get(handle) {
            Some(GpuResource::Program(p)) => Some(p),
            _ => None,
        }
    }

    pub fn compute_program(&self, handle: ResourceHandle) -> Option<&wgpu::ComputePipeline> {
        match self.table.get(handle) {
            Some(GpuResource::ComputeProgram(p)) => Some(p),
            _ => None,
        }
    }

    pub fn info(&self, handle: ResourceHandle) -> Option<&ResourceInfo> {
        self.table.info(handle)
    }

    /// Drops a resource; returns false for unknown handles
    ///
    /// wgpu keeps the object alive until submitted work that uses it, and
    /// any write staged on the queue, has completed.
    pub fn release(&mut self, handle: ResourceHandle) -> bool {
        self.pending.retain(|w| w.handle != handle);
        self.table.remove(handle).is_some()
    }

    pub fn release_all(&mut self, handles: impl IntoIterator<Item = ResourceHandle>) -> usize {
        handles.into_iter().filter(|&h| self.release(h)).count()
    }

    pub fn stats(&self) -> GpuResourceStats {
        self.table.stats()
    }
}
