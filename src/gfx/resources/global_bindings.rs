//! Frame and per-draw uniform bindings
//!
//! Group 0 holds per-frame state shared by every draw: camera matrices, the
//! punctual lights, tone mapping parameters and the IBL textures. Group 1
//! holds per-draw state: the node transform, morph weights and the joint and
//! morph data textures.

use cgmath::{InnerSpace, Matrix, Matrix4, Quaternion, Rotation, SquareMatrix, Vector3};

use crate::wgpu_utils::{
    binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
    binding_types,
    uniform_buffer::UniformBuffer,
};

/// Upper bound on punctual lights per frame; extra lights are dropped
pub const MAX_LIGHTS: usize = 8;

/// Light kinds as encoded in [`LightUniform::position`]`.w`
pub const LIGHT_DIRECTIONAL: f32 = 0.0;
pub const LIGHT_POINT: f32 = 1.0;
pub const LIGHT_SPOT: f32 = 2.0;

/// One punctual light in world space
///
/// MUST match `Light` in `common.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    /// World position in xyz, kind in w
    pub position: [f32; 4],
    /// Direction the light travels in xyz, range in w (0 for unlimited)
    pub direction: [f32; 4],
    /// Linear color in rgb, intensity in w
    pub color: [f32; 4],
    /// Spot cone scale and offset applied to `cos(angle)`
    pub cone: [f32; 4],
}

impl LightUniform {
    pub fn directional(direction: Vector3<f32>, color: [f32; 3], intensity: f32) -> Self {
        let d = direction.normalize();
        Self {
            position: [0.0, 0.0, 0.0, LIGHT_DIRECTIONAL],
            direction: [d.x, d.y, d.z, 0.0],
            color: [color[0], color[1], color[2], intensity],
            cone: [0.0; 4],
        }
    }

    /// Key and fill lights used when nothing else lights the model
    ///
    /// Both start from `(1, 1, -1)` rotated by fixed quaternions; the key
    /// comes in from the left front, the fill from behind at half strength.
    pub fn default_rig() -> [LightUniform; 2] {
        let seed = Vector3::new(1.0, 1.0, -1.0);
        let key = Quaternion::new(0.853_553_4, -0.353_553_4, -0.353_553_38, -0.146_446_59);
        let fill = Quaternion::new(-0.353_553_44, -0.853_553_4, 0.146_446_65, -0.353_553_33);
        [
            LightUniform::directional(key.rotate_vector(seed), [1.0; 3], 1.0),
            LightUniform::directional(fill.rotate_vector(seed), [1.0; 3], 0.5),
        ]
    }
}

/// Per-frame uniform content
///
/// MUST match `FrameUniform` in the shaders exactly.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniform {
    pub view_proj: [[f32; 4]; 4],
    /// Rotation-only inverse used to reconstruct background view rays
    pub inv_view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    pub lights: [LightUniform; MAX_LIGHTS],
    pub exposure: f32,
    pub ibl_intensity: f32,
    pub specular_mip_count: f32,
    pub tone_map: u32,
    pub ibl_enabled: u32,
    pub light_count: u32,
    pub _padding: [u32; 2],
}

impl Default for FrameUniform {
    fn default() -> Self {
        let identity: [[f32; 4]; 4] = Matrix4::<f32>::identity().into();
        Self {
            view_proj: identity,
            inv_view_proj: identity,
            camera_position: [0.0, 0.0, 0.0, 1.0],
            lights: [LightUniform::default(); MAX_LIGHTS],
            exposure: 1.0,
            ibl_intensity: 1.0,
            specular_mip_count: 1.0,
            tone_map: 0,
            ibl_enabled: 0,
            light_count: 0,
            _padding: [0; 2],
        }
    }
}

impl FrameUniform {
    /// Copies up to [`MAX_LIGHTS`] lights and sets the count
    pub fn set_lights(&mut self, lights: &[LightUniform]) {
        let count = lights.len().min(MAX_LIGHTS);
        if lights.len() > MAX_LIGHTS {
            log::debug!("{} lights visible, only {} are used", lights.len(), MAX_LIGHTS);
        }
        self.lights = [LightUniform::default(); MAX_LIGHTS];
        self.lights[..count].copy_from_slice(&lights[..count]);
        self.light_count = count as u32;
    }
}

pub type FrameUBO = UniformBuffer<FrameUniform>;

/// Views bound into group 0
#[derive(Clone, Copy)]
pub struct IblViews<'a> {
    pub irradiance: &'a wgpu::TextureView,
    pub specular: &'a wgpu::TextureView,
    pub brdf_lut: &'a wgpu::TextureView,
    pub environment: &'a wgpu::TextureView,
}

/// Group 0 layout, uniform buffer and bind group
pub struct GlobalBindings {
    layout: BindGroupLayoutWithDesc,
    ubo: FrameUBO,
    sampler: wgpu::Sampler,
    bind_group: wgpu::BindGroup,
}

impl GlobalBindings {
    pub fn new(device: &wgpu::Device, views: IblViews<'_>) -> Self {
        let layout = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::uniform::<FrameUniform>())
            .next_binding_fragment(binding_types::texture_cube())
            .next_binding_fragment(binding_types::texture_cube())
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::texture_cube())
            .next_binding_fragment(binding_types::filtering_sampler())
            .create(device, "Frame Bind Group Layout");

        let ubo = FrameUBO::new(device, "Frame Uniform", &FrameUniform::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("IBL Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let bind_group = Self::build(device, &layout, &ubo, &sampler, views);

        Self {
            layout,
            ubo,
            sampler,
            bind_group,
        }
    }

    fn build(
        device: &wgpu::Device,
        layout: &BindGroupLayoutWithDesc,
        ubo: &FrameUBO,
        sampler: &wgpu::Sampler,
        views: IblViews<'_>,
    ) -> wgpu::BindGroup {
        BindGroupBuilder::new(layout)
            .resource(ubo.binding_resource())
            .texture(views.irradiance)
            .texture(views.specular)
            .texture(views.brdf_lut)
            .texture(views.environment)
            .sampler(sampler)
            .create(device, "Frame Bind Group")
    }

    /// Rebuilds the bind group after the IBL textures change
    pub fn rebind(&mut self, device: &wgpu::Device, views: IblViews<'_>) {
        self.bind_group = Self::build(device, &self.layout, &self.ubo, &self.sampler, views);
    }

    pub fn update(&mut self, queue: &wgpu::Queue, content: FrameUniform) {
        self.ubo.update_content(queue, content);
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout.layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

/// Per-draw uniform content
///
/// MUST match `DrawUniform` in the PBR shader exactly.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniform {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    pub morph_weights: [[f32; 4]; 2],
    pub vertex_count: u32,
    pub morph_target_count: u32,
    pub joint_count: u32,
    pub _padding: u32,
}

impl DrawUniform {
    pub fn new(model: Matrix4<f32>, weights: &[f32], vertex_count: u32, joint_count: u32) -> Self {
        let normal_matrix = model
            .invert()
            .map(|m| m.transpose())
            .unwrap_or_else(Matrix4::identity);

        let mut morph_weights = [[0.0f32; 4]; 2];
        let count = weights.len().min(8);
        for (i, w) in weights.iter().take(count).enumerate() {
            morph_weights[i / 4][i % 4] = *w;
        }

        Self {
            model: model.into(),
            normal_matrix: normal_matrix.into(),
            morph_weights,
            vertex_count,
            morph_target_count: count as u32,
            joint_count,
            _padding: 0,
        }
    }
}

/// Group 1 layout: draw uniform, joint texture, morph texture
pub fn draw_bind_group_layout(device: &wgpu::Device) -> BindGroupLayoutWithDesc {
    BindGroupLayoutBuilder::new()
        .next_binding_rendering(binding_types::uniform::<DrawUniform>())
        .next_binding_vertex(binding_types::data_texture_2d())
        .next_binding_vertex(binding_types::data_texture_2d())
        .create(device, "Draw Bind Group Layout")
}
