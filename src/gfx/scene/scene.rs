//! # Scene
//!
//! A loaded asset: the node graph plus the meshes, materials, textures,
//! skins, lights and animations it references. The CPU side is produced by the
//! loader without touching the GPU; [`Scene::upload`] then creates every GPU
//! resource the renderer needs and [`Scene::release`] frees them again.
//!
//! GPU handles and the CPU descriptors they were built from live and die
//! together: a scene is either fully uploaded or holds no GPU state at all.

use std::collections::HashMap;

use cgmath::Matrix4;

use crate::{
    animation::{AnimationClip, AnimationEngine},
    asset::image::ImageData,
    error::{Result, ViewerError},
    gfx::{
        resources::{
            global_bindings::{DrawUniform, LightUniform},
            gpu_resources::{GpuResourceManager, ResourceHandle},
            material::{Material, MaterialSlot, MaterialUniform},
            texture_resource::{TextureEncoding, TextureResource},
        },
        scene::{
            graph::{NodeId, SceneGraph},
            light::PunctualLight,
            mesh::{Mesh, Primitive, PrimitiveGpu, MORPH_TEXTURE_WIDTH},
            skin::{joint_texels, joint_texture_height, Skin, JOINT_TEXTURE_WIDTH},
        },
    },
    math::Aabb,
    wgpu_utils::{binding_builder::BindGroupBuilder, capture_errors, BindGroupLayoutWithDesc},
};

/// Texture filtering and wrapping, mapped from glTF sampler state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerDesc {
    pub mag_filter: wgpu::FilterMode,
    pub min_filter: wgpu::FilterMode,
    pub mipmap_filter: wgpu::FilterMode,
    pub address_mode_u: wgpu::AddressMode,
    pub address_mode_v: wgpu::AddressMode,
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self {
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
        }
    }
}

impl SamplerDesc {
    pub fn to_wgpu<'a>(&self, label: &'a str) -> wgpu::SamplerDescriptor<'a> {
        wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: self.address_mode_u,
            address_mode_v: self.address_mode_v,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: self.mag_filter,
            min_filter: self.min_filter,
            mipmap_filter: self.mipmap_filter,
            ..Default::default()
        }
    }
}

/// A glTF texture: an image paired with a sampler
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextureDesc {
    pub name: Option<String>,
    /// `None` when the image format is not supported
    pub image: Option<usize>,
    pub sampler: Option<usize>,
}

/// A named set of root nodes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneRoots {
    pub name: Option<String>,
    pub nodes: Vec<NodeId>,
}

/// Element counts of a loaded scene
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneStats {
    pub nodes: usize,
    pub meshes: usize,
    pub primitives: usize,
    pub materials: usize,
    pub textures: usize,
    pub images: usize,
    pub skins: usize,
    pub lights: usize,
    pub animations: usize,
    pub scenes: usize,
    pub vertices: usize,
    pub indices: usize,
}

/// Layouts and queue needed to upload a scene
pub struct UploadContext<'a> {
    pub queue: &'a wgpu::Queue,
    pub draw_layout: &'a BindGroupLayoutWithDesc,
    pub material_layout: &'a BindGroupLayoutWithDesc,
}

/// GPU state of one mesh-carrying node
pub struct DrawInstance {
    pub node: NodeId,
    pub mesh: usize,
    /// One uniform buffer and one bind group per primitive of the mesh
    uniforms: Vec<ResourceHandle>,
    joint_texture: Option<ResourceHandle>,
    joint_count: u32,
    bind_groups: Vec<wgpu::BindGroup>,
}

impl DrawInstance {
    pub fn bind_group(&self, primitive: usize) -> Option<&wgpu::BindGroup> {
        self.bind_groups.get(primitive)
    }

    pub fn is_skinned(&self) -> bool {
        self.joint_texture.is_some()
    }
}

#[derive(Default)]
struct SceneGpu {
    handles: Vec<ResourceHandle>,
    instances: Vec<DrawInstance>,
}

pub struct Scene {
    pub graph: SceneGraph,
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
    /// Used by primitives without a material
    pub default_material: Material,
    pub textures: Vec<TextureDesc>,
    pub images: Vec<ImageData>,
    pub samplers: Vec<SamplerDesc>,
    pub skins: Vec<Skin>,
    pub lights: Vec<PunctualLight>,
    pub scenes: Vec<SceneRoots>,
    pub animator: AnimationEngine,
    current_scene: Option<usize>,
    gpu: Option<SceneGpu>,
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("stats", &self.stats())
            .field("current_scene", &self.current_scene)
            .field("uploaded", &self.is_uploaded())
            .finish()
    }
}

impl Scene {
    pub fn new(graph: SceneGraph) -> Self {
        Self {
            graph,
            meshes: Vec::new(),
            materials: Vec::new(),
            default_material: Material::default(),
            textures: Vec::new(),
            images: Vec::new(),
            samplers: Vec::new(),
            skins: Vec::new(),
            lights: Vec::new(),
            scenes: Vec::new(),
            animator: AnimationEngine::default(),
            current_scene: None,
            gpu: None,
        }
    }

    pub fn with_animations(mut self, clips: Vec<AnimationClip>) -> Self {
        self.animator = AnimationEngine::new(clips);
        self
    }

    /// Picks the initial scene: `default`, else scene 0, else every root
    pub fn select_initial_scene(&mut self, default: Option<usize>) {
        self.current_scene = default
            .filter(|&i| i < self.scenes.len())
            .or(if self.scenes.is_empty() { None } else { Some(0) });
    }

    pub fn current_scene(&self) -> Option<usize> {
        self.current_scene
    }

    pub fn set_current_scene(&mut self, index: usize) -> Result<()> {
        if index >= self.scenes.len() {
            return Err(ViewerError::InvalidArgument(format!(
                "scene {} out of range ({} scenes)",
                index,
                self.scenes.len()
            )));
        }
        self.current_scene = Some(index);
        Ok(())
    }

    /// Root nodes of the current scene
    pub fn roots(&self) -> Vec<NodeId> {
        match self.current_scene.and_then(|i| self.scenes.get(i)) {
            Some(scene) => scene.nodes.clone(),
            None => self.graph.roots().collect(),
        }
    }

    /// Every node reachable from the current scene's roots, parents first
    pub fn visible_nodes(&self) -> Vec<NodeId> {
        self.roots()
            .into_iter()
            .filter(|&root| self.graph.contains(root))
            .flat_map(|root| self.graph.iter_subtree(root))
            .collect()
    }

    pub fn animation_names(&self) -> Vec<String> {
        self.animator.names()
    }

    pub fn material(&self, index: Option<usize>) -> &Material {
        index
            .and_then(|i| self.materials.get(i))
            .unwrap_or(&self.default_material)
    }

    /// Morph weights of a node, falling back to its mesh defaults
    pub fn node_weights(&self, node: NodeId) -> &[f32] {
        if let Some(weights) = self.graph.weights(node) {
            return weights;
        }
        self.graph
            .mesh(node)
            .and_then(|m| self.meshes.get(m))
            .map(|m| m.weights.as_slice())
            .unwrap_or(&[])
    }

    /// Lights on visible nodes, placed in world space
    ///
    /// World transforms must be current.
    pub fn light_uniforms(&self) -> Vec<LightUniform> {
        if self.lights.is_empty() {
            return Vec::new();
        }
        self.visible_nodes()
            .into_iter()
            .filter_map(|node| {
                let light = self.lights.get(self.graph.light(node)?)?;
                Some(light.to_uniform(&self.graph.world(node)))
            })
            .collect()
    }

    /// Union of every visible primitive's bounds in world space
    ///
    /// World transforms must be current.
    pub fn world_bounds(&self) -> Aabb {
        self.visible_nodes()
            .into_iter()
            .filter_map(|node| {
                let mesh = self.meshes.get(self.graph.mesh(node)?)?;
                Some(mesh.bounds().transform(&self.graph.world(node)))
            })
            .fold(Aabb::empty(), |acc, b| acc.union(&b))
    }

    pub fn stats(&self) -> SceneStats {
        let primitives = self.meshes.iter().flat_map(|m| &m.primitives);
        let (mut count, mut vertices, mut indices) = (0, 0, 0);
        for p in primitives {
            count += 1;
            vertices += p.vertices.len();
            indices += p.indices.as_ref().map_or(0, Vec::len);
        }

        SceneStats {
            nodes: self.graph.len(),
            meshes: self.meshes.len(),
            primitives: count,
            materials: self.materials.len(),
            textures: self.textures.len(),
            images: self.images.len(),
            skins: self.skins.len(),
            lights: self.lights.len(),
            animations: self.animator.clips().len(),
            scenes: self.scenes.len(),
            vertices,
            indices,
        }
    }

    pub fn is_uploaded(&self) -> bool {
        self.gpu.is_some()
    }

    pub fn instances(&self) -> &[DrawInstance] {
        self.gpu.as_ref().map_or(&[], |gpu| gpu.instances.as_slice())
    }

    /// GPU state of a mesh node; instances are stored in node order
    pub fn instance(&self, node: NodeId) -> Option<&DrawInstance> {
        let instances = self.instances();
        instances
            .binary_search_by_key(&node, |i| i.node)
            .ok()
            .map(|i| &instances[i])
    }

    /// Creates every GPU resource of the scene
    ///
    /// On failure all handles created so far are released and the scene is
    /// left without GPU state. Returns the number of bytes queued for upload.
    pub fn upload(&mut self, gpu: &mut GpuResourceManager, ctx: &UploadContext<'_>) -> Result<u64> {
        if self.is_uploaded() {
            self.release(gpu);
        }

        let device = gpu.device().clone();
        let mut state = SceneGpu::default();
        let (result, error) = capture_errors(&device, || self.upload_inner(gpu, ctx, &mut state));

        let failure = match (result, error) {
            (Ok(bytes), None) => {
                self.gpu = Some(state);
                log::debug!("Scene upload queued {} bytes", bytes);
                return Ok(bytes);
            }
            (Err(e), _) => e,
            (Ok(_), Some(e)) => ViewerError::GpuUploadFailed(e.to_string()),
        };

        log::error!("Scene upload failed: {}", failure);
        self.gpu = Some(state);
        self.release(gpu);
        Err(failure)
    }

    fn upload_inner(&mut self, gpu: &mut GpuResourceManager, ctx: &UploadContext<'_>, state: &mut SceneGpu) -> Result<u64> {
        let device = gpu.device().clone();
        let mut bytes = 0u64;

        // Samplers, with a trailing default for textures that name none
        let mut samplers = Vec::with_capacity(self.samplers.len() + 1);
        for (i, desc) in self.samplers.iter().enumerate() {
            let label = format!("Sampler {}", i);
            samplers.push(gpu.create_sampler(&desc.to_wgpu(&label), &label));
        }
        let default_sampler = gpu.create_sampler(&SamplerDesc::default().to_wgpu("Default Sampler"), "Default Sampler");
        state.handles.extend(samplers.iter().copied());
        state.handles.push(default_sampler);

        let mut fallbacks = [default_sampler; 5];
        for (i, slot) in MaterialSlot::ALL.iter().enumerate() {
            let label = format!("Fallback {:?}", slot);
            let texture = TextureResource::solid(&device, ctx.queue, slot.fallback_texel(), slot.encoding(), &label);
            bytes += texture.byte_size();
            fallbacks[i] = gpu.insert_texture(texture, &label);
        }
        state.handles.extend(fallbacks);

        let empty_data = gpu.insert_texture(
            TextureResource::data_texture(&device, ctx.queue, 1, 1, &[[0.0; 4]], "Empty Data Texture"),
            "Empty Data Texture",
        );
        state.handles.push(empty_data);

        // Textures are created per encoding on first use
        let mut uploaded: HashMap<(usize, TextureEncoding), ResourceHandle> = HashMap::new();
        let mut material_slots = Vec::with_capacity(self.materials.len() + 1);
        for material in self.materials.iter().chain(std::iter::once(&self.default_material)) {
            let mut slots = [(empty_data, default_sampler); 5];
            for (i, slot) in MaterialSlot::ALL.iter().enumerate() {
                slots[i] = (fallbacks[i], default_sampler);
                let Some(reference) = material.texture(*slot) else {
                    continue;
                };
                let Some(desc) = self.textures.get(reference.texture) else {
                    continue;
                };
                let Some(image) = desc.image.and_then(|i| self.images.get(i)) else {
                    continue;
                };

                let key = (reference.texture, slot.encoding());
                let handle = match uploaded.get(&key) {
                    Some(&handle) => handle,
                    None => {
                        let label = format!("Texture {} ({:?})", reference.texture, slot.encoding());
                        let texture = TextureResource::from_image(&device, ctx.queue, image, slot.encoding(), &label);
                        bytes += texture.byte_size();
                        let handle = gpu.insert_texture(texture, &label);
                        state.handles.push(handle);
                        uploaded.insert(key, handle);
                        handle
                    }
                };
                let sampler = desc
                    .sampler
                    .and_then(|s| samplers.get(s).copied())
                    .unwrap_or(default_sampler);
                slots[i] = (handle, sampler);
            }
            material_slots.push(slots);
        }

        let materials = self.materials.iter_mut().chain(std::iter::once(&mut self.default_material));
        for (index, (material, slots)) in materials.zip(material_slots).enumerate() {
            let uniform = material
                .create_gpu_resources(gpu, ctx.material_layout, slots)
                .ok_or_else(|| ViewerError::GpuUploadFailed(format!("material {} lost a texture or sampler", index)))?;
            bytes += std::mem::size_of::<MaterialUniform>() as u64;
            state.handles.push(uniform);
        }

        for (m, mesh) in self.meshes.iter_mut().enumerate() {
            for (p, primitive) in mesh.primitives.iter_mut().enumerate() {
                let label = format!("Mesh {} primitive {}", m, p);
                let vertex_bytes: &[u8] = bytemuck::cast_slice(&primitive.vertices);
                bytes += vertex_bytes.len() as u64;
                let vertex_buffer = gpu.create_buffer(&format!("{} vertices", label), wgpu::BufferUsages::VERTEX, vertex_bytes);
                state.handles.push(vertex_buffer);

                let index_buffer = match &primitive.indices {
                    Some(indices) => {
                        let index_bytes: &[u8] = bytemuck::cast_slice(indices);
                        bytes += index_bytes.len() as u64;
                        let handle = gpu.create_buffer(&format!("{} indices", label), wgpu::BufferUsages::INDEX, index_bytes);
                        state.handles.push(handle);
                        Some(handle)
                    }
                    None => None,
                };

                let morph_texture = match primitive.morph_texels() {
                    Some((height, texels)) => {
                        let texture = TextureResource::data_texture(
                            &device,
                            ctx.queue,
                            MORPH_TEXTURE_WIDTH,
                            height,
                            &texels,
                            &format!("{} morph targets", label),
                        );
                        bytes += texture.byte_size();
                        let handle = gpu.insert_texture(texture, &label);
                        state.handles.push(handle);
                        Some(handle)
                    }
                    None => None,
                };

                primitive.gpu = Some(PrimitiveGpu {
                    vertex_buffer,
                    index_buffer,
                    morph_texture,
                });
            }
        }

        for node in 0..self.graph.len() {
            let Some(mesh_index) = self.graph.mesh(node) else {
                continue;
            };
            let Some(mesh) = self.meshes.get(mesh_index) else {
                continue;
            };

            let skin = self.graph.skin(node).and_then(|s| self.skins.get(s));
            let joint_count = skin.map_or(0, |s| s.joints.len());
            let joint_texture = match skin {
                Some(skin) => {
                    let texels = joint_texels(&skin.joint_matrices(&self.graph, node));
                    let label = format!("Node {} joints", node);
                    let texture = TextureResource::data_texture(
                        &device,
                        ctx.queue,
                        JOINT_TEXTURE_WIDTH,
                        joint_texture_height(joint_count),
                        &texels,
                        &label,
                    );
                    bytes += texture.byte_size();
                    let handle = gpu.insert_texture(texture, &label);
                    state.handles.push(handle);
                    Some(handle)
                }
                None => None,
            };

            let mut uniforms = Vec::with_capacity(mesh.primitives.len());
            let mut bind_groups = Vec::with_capacity(mesh.primitives.len());
            for (p, primitive) in mesh.primitives.iter().enumerate() {
                let content = self.draw_uniform(node, primitive, joint_count as u32);
                let uniform = gpu.create_buffer(
                    &format!("Node {} primitive {} uniform", node, p),
                    wgpu::BufferUsages::UNIFORM,
                    bytemuck::bytes_of(&content),
                );
                state.handles.push(uniform);
                bytes += std::mem::size_of::<DrawUniform>() as u64;

                let buffer = gpu
                    .buffer(uniform)
                    .ok_or_else(|| ViewerError::GpuUploadFailed(format!("draw uniform for node {}", node)))?;
                let joint_view = gpu
                    .texture(joint_texture.unwrap_or(empty_data))
                    .map(|t| &t.view)
                    .ok_or_else(|| ViewerError::GpuUploadFailed(format!("joint texture for node {}", node)))?;
                let morph = primitive
                    .gpu
                    .as_ref()
                    .and_then(|g| g.morph_texture)
                    .unwrap_or(empty_data);
                let morph_view = gpu
                    .texture(morph)
                    .map(|t| &t.view)
                    .ok_or_else(|| ViewerError::GpuUploadFailed(format!("morph texture for node {}", node)))?;

                bind_groups.push(
                    BindGroupBuilder::new(ctx.draw_layout)
                        .resource(buffer.as_entire_binding())
                        .texture(joint_view)
                        .texture(morph_view)
                        .create(&device, &format!("Node {} primitive {}", node, p)),
                );
                uniforms.push(uniform);
            }

            state.instances.push(DrawInstance {
                node,
                mesh: mesh_index,
                uniforms,
                joint_texture,
                joint_count: joint_count as u32,
                bind_groups,
            });
        }

        Ok(bytes)
    }

    /// Writes current node transforms, morph weights and joint matrices
    ///
    /// Uniform writes are queued on `gpu` and land with its next flush.
    /// World transforms must be current.
    pub fn update_gpu(&mut self, gpu: &mut GpuResourceManager, queue: &wgpu::Queue) {
        let Some(state) = self.gpu.take() else {
            return;
        };

        for instance in &state.instances {
            if let Some(mesh) = self.meshes.get(instance.mesh) {
                for (primitive, &uniform) in mesh.primitives.iter().zip(&instance.uniforms) {
                    let content = self.draw_uniform(instance.node, primitive, instance.joint_count);
                    gpu.queue_write(uniform, 0, bytemuck::bytes_of(&content));
                }
            }

            let skin = self.graph.skin(instance.node).and_then(|s| self.skins.get(s));
            if let (Some(skin), Some(handle)) = (skin, instance.joint_texture) {
                if let Some(texture) = gpu.texture(handle) {
                    let texels = joint_texels(&skin.joint_matrices(&self.graph, instance.node));
                    TextureResource::write_data_texels(queue, &texture.texture, JOINT_TEXTURE_WIDTH, &texels);
                }
            }
        }

        self.gpu = Some(state);
    }

    /// Releases every GPU resource; the CPU side stays intact
    pub fn release(&mut self, gpu: &mut GpuResourceManager) {
        let Some(state) = self.gpu.take() else {
            return;
        };

        let released = gpu.release_all(state.handles);
        for material in self.materials.iter_mut().chain(std::iter::once(&mut self.default_material)) {
            material.release_gpu_resources();
        }
        for primitive in self.meshes.iter_mut().flat_map(|m| m.primitives.iter_mut()) {
            primitive.gpu = None;
        }
        log::debug!("Released {} scene GPU handles", released);
    }

    fn draw_uniform(&self, node: NodeId, primitive: &Primitive, joint_count: u32) -> DrawUniform {
        let mut uniform = DrawUniform::new(
            self.graph.world(node),
            self.node_weights(node),
            primitive.vertex_count(),
            joint_count,
        );
        uniform.morph_target_count = uniform.morph_target_count.min(primitive.morph_target_count() as u32);
        uniform
    }

    /// World-space bounds of one primitive of a node
    pub fn primitive_world_bounds(&self, node: NodeId, mesh: usize, primitive: usize) -> Option<Aabb> {
        let bounds = self.meshes.get(mesh)?.primitives.get(primitive)?.bounds;
        Some(bounds.transform(&self.world(node)))
    }

    pub fn world(&self, node: NodeId) -> Matrix4<f32> {
        self.graph.world(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ErrorKind,
        gfx::scene::{
            graph::{LocalTransform, NodeDesc},
            mesh::{AttributeFlags, Primitive, Topology},
            vertex::Vertex,
        },
        math::Trs,
    };
    use cgmath::Vector3;

    fn triangle_mesh() -> Mesh {
        let vertex = |p: [f32; 3]| Vertex {
            position: p,
            ..Vertex::default()
        };
        Mesh {
            name: Some("tri".into()),
            primitives: vec![Primitive::new(
                vec![vertex([-1.0, 0.0, 0.0]), vertex([1.0, 0.0, 0.0]), vertex([0.0, 1.0, 0.0])],
                Some(vec![0, 1, 2]),
                None,
                Topology::Triangles,
                Vec::new(),
                AttributeFlags::default(),
            )],
            weights: vec![0.25],
        }
    }

    fn two_scene_fixture() -> Scene {
        let node = |mesh, x: f32| NodeDesc {
            mesh,
            local: LocalTransform::Trs(Trs {
                translation: Vector3::new(x, 0.0, 0.0),
                ..Trs::default()
            }),
            ..NodeDesc::default()
        };
        let graph = SceneGraph::from_nodes(vec![node(Some(0), 0.0), node(Some(0), 10.0)]).unwrap();
        let mut scene = Scene::new(graph);
        scene.meshes.push(triangle_mesh());
        scene.scenes = vec![
            SceneRoots {
                name: Some("first".into()),
                nodes: vec![0],
            },
            SceneRoots {
                name: Some("second".into()),
                nodes: vec![1],
            },
        ];
        scene
    }

    #[test]
    fn test_initial_scene_selection() {
        let mut scene = two_scene_fixture();
        scene.select_initial_scene(Some(1));
        assert_eq!(scene.current_scene(), Some(1));

        scene.select_initial_scene(Some(7));
        assert_eq!(scene.current_scene(), Some(0));

        scene.scenes.clear();
        scene.select_initial_scene(None);
        assert_eq!(scene.current_scene(), None);
        assert_eq!(scene.roots(), vec![0, 1]);
    }

    #[test]
    fn test_world_bounds_follow_current_scene() {
        let mut scene = two_scene_fixture();
        scene.select_initial_scene(None);
        let first = scene.world_bounds();
        assert_eq!(first.min, Vector3::new(-1.0, 0.0, 0.0));

        scene.set_current_scene(1).unwrap();
        let second = scene.world_bounds();
        assert_eq!(second.min, Vector3::new(9.0, 0.0, 0.0));
        assert_eq!(second.max, Vector3::new(11.0, 1.0, 0.0));

        let err = scene.set_current_scene(2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_node_weights_fall_back_to_mesh() {
        let mut scene = two_scene_fixture();
        assert_eq!(scene.node_weights(0), &[0.25]);
        scene.graph.set_weights(0, vec![0.75]);
        assert_eq!(scene.node_weights(0), &[0.75]);
    }

    #[test]
    fn test_stats_count_geometry() {
        let scene = two_scene_fixture();
        let stats = scene.stats();
        assert_eq!(stats.nodes, 2);
        assert_eq!(stats.meshes, 1);
        assert_eq!(stats.primitives, 1);
        assert_eq!(stats.vertices, 3);
        assert_eq!(stats.indices, 3);
        assert_eq!(stats.scenes, 2);
        assert!(!scene.is_uploaded());
        assert!(scene.instances().is_empty());
    }

    #[test]
    fn test_lights_follow_current_scene() {
        let mut scene = two_scene_fixture();
        let light_node = NodeDesc {
            light: Some(0),
            local: LocalTransform::Trs(Trs {
                translation: Vector3::new(0.0, 5.0, 0.0),
                ..Trs::default()
            }),
            ..NodeDesc::default()
        };
        scene.graph = SceneGraph::from_nodes(vec![
            NodeDesc {
                mesh: Some(0),
                ..NodeDesc::default()
            },
            light_node,
        ])
        .unwrap();
        scene.lights.push(PunctualLight {
            intensity: 2.0,
            ..PunctualLight::default()
        });
        scene.select_initial_scene(Some(0));
        assert!(scene.light_uniforms().is_empty());

        scene.set_current_scene(1).unwrap();
        let lights = scene.light_uniforms();
        assert_eq!(lights.len(), 1);
        assert_eq!(lights[0].position[..3], [0.0, 5.0, 0.0]);
        assert_eq!(lights[0].color[3], 2.0);
        assert_eq!(scene.stats().lights, 1);
    }

    #[test]
    fn test_missing_material_uses_default() {
        let scene = two_scene_fixture();
        assert_eq!(scene.material(None).base_color_factor, [1.0; 4]);
        assert_eq!(scene.material(Some(3)).roughness_factor, 1.0);
    }
}
