//! Material system for PBR rendering
//!
//! Materials follow the glTF metallic-roughness model, plus the unlit and
//! texture transform extensions. Each material has a uniform buffer, owned
//! by the [`GpuResourceManager`], and a bind group holding five
//! texture/sampler pairs (base color, metallic-roughness, normal, occlusion,
//! emissive); absent maps bind neutral 1x1 textures so every material fits
//! one layout.
//!
//! [`FeatureMask`] summarizes which optional paths a draw needs and keys the
//! compiled shader variants.

use crate::{
    gfx::resources::{
        gpu_resources::{GpuResourceManager, ResourceHandle},
        texture_resource::TextureEncoding,
    },
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AlphaMode {
    #[default]
    Opaque,
    Mask,
    Blend,
}

impl AlphaMode {
    pub fn bits(self) -> u32 {
        match self {
            AlphaMode::Opaque => 0,
            AlphaMode::Mask => 1,
            AlphaMode::Blend => 2,
        }
    }
}

/// Offset, rotation and scale applied to texture coordinates
///
/// Applied as translation, then rotation, then scale, matching
/// `KHR_texture_transform`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvTransform {
    pub offset: [f32; 2],
    /// Radians, counter-clockwise in UV space
    pub rotation: f32,
    pub scale: [f32; 2],
}

impl Default for UvTransform {
    fn default() -> Self {
        Self {
            offset: [0.0, 0.0],
            rotation: 0.0,
            scale: [1.0, 1.0],
        }
    }
}

impl UvTransform {
    /// Rows of the 2x3 matrix; `uv' = rows * (u, v, 1)`
    pub fn rows(&self) -> [[f32; 4]; 2] {
        let (s, c) = self.rotation.sin_cos();
        let [sx, sy] = self.scale;
        let [ox, oy] = self.offset;
        [[c * sx, s * sy, ox, 0.0], [-s * sx, c * sy, oy, 0.0]]
    }

    pub fn apply(&self, uv: [f32; 2]) -> [f32; 2] {
        let [u_row, v_row] = self.rows();
        [
            u_row[0] * uv[0] + u_row[1] * uv[1] + u_row[2],
            v_row[0] * uv[0] + v_row[1] * uv[1] + v_row[2],
        ]
    }
}

/// Reference from a material slot to a scene texture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureRef {
    pub texture: usize,
    pub tex_coord: u32,
    pub transform: Option<UvTransform>,
}

impl TextureRef {
    pub fn new(texture: usize, tex_coord: u32) -> Self {
        Self {
            texture,
            tex_coord,
            transform: None,
        }
    }
}

/// Material texture slots, in bind group order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialSlot {
    BaseColor,
    MetallicRoughness,
    Normal,
    Occlusion,
    Emissive,
}

impl MaterialSlot {
    pub const ALL: [MaterialSlot; 5] = [
        MaterialSlot::BaseColor,
        MaterialSlot::MetallicRoughness,
        MaterialSlot::Normal,
        MaterialSlot::Occlusion,
        MaterialSlot::Emissive,
    ];

    /// Color data is sRGB, everything else is linear
    pub fn encoding(self) -> TextureEncoding {
        match self {
            MaterialSlot::BaseColor | MaterialSlot::Emissive => TextureEncoding::Srgb,
            _ => TextureEncoding::Linear,
        }
    }

    /// Neutral texel bound when the slot has no texture
    pub fn fallback_texel(self) -> [u8; 4] {
        match self {
            MaterialSlot::Normal => [128, 128, 255, 255],
            _ => [255, 255, 255, 255],
        }
    }
}

/// Shader variant key
///
/// Bits 0-5 and 10-14 are flags, bits 6-7 hold the morph target bucket and
/// bits 8-9 the alpha mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct FeatureMask(u32);

impl FeatureMask {
    pub const BASE_COLOR_TEXTURE: FeatureMask = FeatureMask(1 << 0);
    pub const NORMAL_MAP: FeatureMask = FeatureMask(1 << 1);
    pub const METALLIC_ROUGHNESS_TEXTURE: FeatureMask = FeatureMask(1 << 2);
    pub const EMISSIVE: FeatureMask = FeatureMask(1 << 3);
    pub const OCCLUSION_TEXTURE: FeatureMask = FeatureMask(1 << 4);
    pub const SKINNING: FeatureMask = FeatureMask(1 << 5);
    pub const IBL: FeatureMask = FeatureMask(1 << 10);
    pub const DOUBLE_SIDED: FeatureMask = FeatureMask(1 << 11);
    pub const VERTEX_COLOR: FeatureMask = FeatureMask(1 << 12);
    pub const UNLIT: FeatureMask = FeatureMask(1 << 13);
    pub const TEXTURE_TRANSFORM: FeatureMask = FeatureMask(1 << 14);

    const MORPH_SHIFT: u32 = 6;
    const ALPHA_SHIFT: u32 = 8;

    pub const fn empty() -> Self {
        FeatureMask(0)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: FeatureMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn with(self, other: FeatureMask) -> Self {
        FeatureMask(self.0 | other.0)
    }

    pub fn without(self, other: FeatureMask) -> Self {
        FeatureMask(self.0 & !other.0)
    }

    pub fn set(self, other: FeatureMask, enabled: bool) -> Self {
        if enabled {
            self.with(other)
        } else {
            self.without(other)
        }
    }

    /// Buckets morph target counts: 0, up to 2, up to 4, up to 8
    pub fn with_morph_targets(self, count: usize) -> Self {
        let bucket = match count {
            0 => 0,
            1..=2 => 1,
            3..=4 => 2,
            _ => 3,
        };
        FeatureMask((self.0 & !(0b11 << Self::MORPH_SHIFT)) | (bucket << Self::MORPH_SHIFT))
    }

    /// Number of morph targets the variant blends
    pub fn morph_target_capacity(self) -> u32 {
        match (self.0 >> Self::MORPH_SHIFT) & 0b11 {
            0 => 0,
            1 => 2,
            2 => 4,
            _ => 8,
        }
    }

    pub fn with_alpha_mode(self, mode: AlphaMode) -> Self {
        FeatureMask((self.0 & !(0b11 << Self::ALPHA_SHIFT)) | (mode.bits() << Self::ALPHA_SHIFT))
    }

    pub fn alpha_mode(self) -> AlphaMode {
        match (self.0 >> Self::ALPHA_SHIFT) & 0b11 {
            1 => AlphaMode::Mask,
            2 => AlphaMode::Blend,
            _ => AlphaMode::Opaque,
        }
    }
}

impl std::ops::BitOr for FeatureMask {
    type Output = FeatureMask;

    fn bitor(self, rhs: FeatureMask) -> FeatureMask {
        self.with(rhs)
    }
}

/// GPU uniform data for materials
///
/// MUST match the `MaterialUniform` struct in `pbr.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub base_color: [f32; 4],
    /// Emissive factor pre-multiplied by the emissive strength
    pub emissive: [f32; 3],
    pub metallic: f32,
    pub roughness: f32,
    pub normal_scale: f32,
    pub occlusion_strength: f32,
    pub alpha_cutoff: f32,
    /// UV set per slot: base color, metallic-roughness, normal, occlusion
    pub uv_sets: [u32; 4],
    pub emissive_uv_set: u32,
    pub alpha_mode: u32,
    _padding: [u32; 2],
    /// [`UvTransform::rows`] per slot, in [`MaterialSlot::ALL`] order
    pub uv_transforms: [[f32; 4]; 10],
}

/// Creates the layout every material bind group is built against
///
/// Binding 0 is the uniform; bindings 1-10 alternate texture and sampler
/// for each [`MaterialSlot`].
pub fn material_bind_group_layout(device: &wgpu::Device) -> BindGroupLayoutWithDesc {
    let mut builder = BindGroupLayoutBuilder::new().next_binding_fragment(binding_types::uniform::<MaterialUniform>());
    for _ in MaterialSlot::ALL {
        builder = builder
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::filtering_sampler());
    }
    builder.create(device, "Material Bind Group")
}

/// GPU side of a material
pub struct MaterialGpu {
    uniform: ResourceHandle,
    bind_group: wgpu::BindGroup,
}

impl MaterialGpu {
    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub fn uniform(&self) -> ResourceHandle {
        self.uniform
    }
}

/// Material definition with PBR properties
pub struct Material {
    pub name: Option<String>,
    pub base_color_factor: [f32; 4],
    pub base_color_texture: Option<TextureRef>,
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub metallic_roughness_texture: Option<TextureRef>,
    pub normal_texture: Option<TextureRef>,
    pub normal_scale: f32,
    pub occlusion_texture: Option<TextureRef>,
    pub occlusion_strength: f32,
    pub emissive_factor: [f32; 3],
    pub emissive_texture: Option<TextureRef>,
    pub emissive_strength: f32,
    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: f32,
    pub double_sided: bool,
    /// Shades with the base color only
    pub unlit: bool,

    gpu: Option<MaterialGpu>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: None,
            base_color_factor: [1.0, 1.0, 1.0, 1.0],
            base_color_texture: None,
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            metallic_roughness_texture: None,
            normal_texture: None,
            normal_scale: 1.0,
            occlusion_texture: None,
            occlusion_strength: 1.0,
            emissive_factor: [0.0, 0.0, 0.0],
            emissive_texture: None,
            emissive_strength: 1.0,
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: 0.5,
            double_sided: false,
            unlit: false,
            gpu: None,
        }
    }
}

impl std::fmt::Debug for Material {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Material")
            .field("name", &self.name)
            .field("base_color_factor", &self.base_color_factor)
            .field("alpha_mode", &self.alpha_mode)
            .field("features", &self.features())
            .field("uploaded", &self.gpu.is_some())
            .finish()
    }
}

impl Material {
    /// Builder pattern: Set base color factor
    pub fn with_base_color(mut self, rgba: [f32; 4]) -> Self {
        self.base_color_factor = rgba;
        self
    }

    /// Builder pattern: Set metallic factor
    pub fn with_metallic(mut self, metallic: f32) -> Self {
        self.metallic_factor = metallic.clamp(0.0, 1.0);
        self
    }

    /// Builder pattern: Set roughness factor
    pub fn with_roughness(mut self, roughness: f32) -> Self {
        self.roughness_factor = roughness.clamp(0.0, 1.0);
        self
    }

    pub fn with_alpha_mode(mut self, mode: AlphaMode) -> Self {
        self.alpha_mode = mode;
        self
    }

    pub fn texture(&self, slot: MaterialSlot) -> Option<TextureRef> {
        match slot {
            MaterialSlot::BaseColor => self.base_color_texture,
            MaterialSlot::MetallicRoughness => self.metallic_roughness_texture,
            MaterialSlot::Normal => self.normal_texture,
            MaterialSlot::Occlusion => self.occlusion_texture,
            MaterialSlot::Emissive => self.emissive_texture,
        }
    }

    pub fn is_emissive(&self) -> bool {
        self.emissive_texture.is_some()
            || (self.emissive_strength > 0.0 && self.emissive_factor.iter().any(|&c| c > 0.0))
    }

    pub fn has_texture_transform(&self) -> bool {
        MaterialSlot::ALL
            .iter()
            .any(|&slot| self.texture(slot).is_some_and(|t| t.transform.is_some()))
    }

    /// Material-derived part of the shader variant key
    pub fn features(&self) -> FeatureMask {
        FeatureMask::empty()
            .set(FeatureMask::BASE_COLOR_TEXTURE, self.base_color_texture.is_some())
            .set(FeatureMask::NORMAL_MAP, self.normal_texture.is_some())
            .set(
                FeatureMask::METALLIC_ROUGHNESS_TEXTURE,
                self.metallic_roughness_texture.is_some(),
            )
            .set(FeatureMask::OCCLUSION_TEXTURE, self.occlusion_texture.is_some())
            .set(FeatureMask::EMISSIVE, self.is_emissive())
            .set(FeatureMask::DOUBLE_SIDED, self.double_sided)
            .set(FeatureMask::UNLIT, self.unlit)
            .set(FeatureMask::TEXTURE_TRANSFORM, self.has_texture_transform())
            .with_alpha_mode(self.alpha_mode)
    }

    pub fn uniform(&self) -> MaterialUniform {
        let uv = |t: Option<TextureRef>| t.map(|t| t.tex_coord).unwrap_or(0);
        let mut uv_transforms = [[0.0; 4]; 10];
        for (i, slot) in MaterialSlot::ALL.iter().enumerate() {
            let transform = self.texture(*slot).and_then(|t| t.transform).unwrap_or_default();
            let [u_row, v_row] = transform.rows();
            uv_transforms[2 * i] = u_row;
            uv_transforms[2 * i + 1] = v_row;
        }
        MaterialUniform {
            base_color: self.base_color_factor,
            emissive: self.emissive_factor.map(|c| c * self.emissive_strength),
            metallic: self.metallic_factor,
            roughness: self.roughness_factor,
            normal_scale: self.normal_scale,
            occlusion_strength: self.occlusion_strength,
            alpha_cutoff: self.alpha_cutoff,
            uv_sets: [
                uv(self.base_color_texture),
                uv(self.metallic_roughness_texture),
                uv(self.normal_texture),
                uv(self.occlusion_texture),
            ],
            emissive_uv_set: uv(self.emissive_texture),
            alpha_mode: self.alpha_mode.bits(),
            _padding: [0; 2],
            uv_transforms,
        }
    }

    /// Creates the uniform buffer and bind group
    ///
    /// `slots` supplies a view and sampler for each [`MaterialSlot`] in
    /// order. The returned uniform handle belongs to the caller, which
    /// releases it with the rest of the scene.
    pub fn create_gpu_resources(
        &mut self,
        gpu: &mut GpuResourceManager,
        layout: &BindGroupLayoutWithDesc,
        slots: [(ResourceHandle, ResourceHandle); 5],
    ) -> Option<ResourceHandle> {
        let uniform = gpu.create_buffer(
            "Material Uniform",
            wgpu::BufferUsages::UNIFORM,
            bytemuck::bytes_of(&self.uniform()),
        );

        let buffer = gpu.buffer(uniform)?;
        let mut builder = BindGroupBuilder::new(layout).resource(buffer.as_entire_binding());
        for (texture, sampler) in slots {
            builder = builder.texture(&gpu.texture(texture)?.view).sampler(gpu.sampler(sampler)?);
        }
        let label = format!("Material: {}", self.name.as_deref().unwrap_or("unnamed"));
        let bind_group = builder.create(gpu.device(), &label);

        self.gpu = Some(MaterialGpu { uniform, bind_group });
        Some(uniform)
    }

    pub fn gpu(&self) -> Option<&MaterialGpu> {
        self.gpu.as_ref()
    }

    /// Forgets the bind group; the uniform handle is released by its owner
    pub fn release_gpu_resources(&mut self) {
        self.gpu = None;
    }
}
