//! Render pipeline management for wgpu
//!
//! Named pipelines are registered as a [`PipelineConfig`] and created lazily
//! the first time they are prepared. PBR pipelines are additionally
//! specialized per [`VariantKey`]: the material feature mask is written out
//! as WGSL constants in front of the shader source, so each variant only
//! carries the paths it uses. Compiled pipelines are stored as programs in
//! the [`GpuResourceManager`].
//!
//! Compute pipelines are registered the same way as a [`ComputeConfig`]
//! naming a shader and entry point, and are cached alongside the render
//! pipelines.
//!
//! Rendering happens in two steps because a render pass borrows the
//! resource manager immutably: [`PipelineManager::prepare_variant`] compiles
//! whatever the frame needs, then [`PipelineManager::variant`] looks handles
//! up while the pass is recorded.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use wgpu::*;

use crate::{
    error::{Result, ViewerError},
    gfx::{
        resources::{
            gpu_resources::{GpuResourceManager, ResourceHandle},
            material::{AlphaMode, FeatureMask},
            texture_resource::TextureResource,
        },
        scene::{mesh::Topology, vertex::Vertex},
    },
    wgpu_utils::capture_errors,
};

/// Shader the PBR variants are specialized from
pub const PBR_SHADER: &str = "pbr";

/// Shader and pipeline drawing the environment behind the model
pub const BACKGROUND_SHADER: &str = "background";

/// Configuration for creating a compute pipeline
#[derive(Debug, Clone)]
pub struct ComputeConfig {
    pub label: String,
    pub shader: String,
    pub entry_point: String,
    pub bind_group_layouts: Vec<BindGroupLayout>,
}

impl ComputeConfig {
    pub fn new(shader: &str, entry_point: &str) -> Self {
        Self {
            label: format!("{}::{}", shader, entry_point),
            shader: shader.to_string(),
            entry_point: entry_point.to_string(),
            bind_group_layouts: Vec::new(),
        }
    }

    pub fn with_bind_group_layouts(mut self, layouts: Vec<BindGroupLayout>) -> Self {
        self.bind_group_layouts = layouts;
        self
    }
}

/// Configuration for creating a render pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub label: String,
    pub shader: String,
    pub bind_group_layouts: Vec<BindGroupLayout>,
    pub primitive_topology: PrimitiveTopology,
    pub strip_index_format: Option<IndexFormat>,
    pub cull_mode: Option<Face>,
    pub depth_format: Option<TextureFormat>,
    pub depth_write_enabled: bool,
    pub depth_compare: CompareFunction,
    pub multisample: MultisampleState,
    pub color_targets: Vec<Option<ColorTargetState>>,
    /// Fullscreen passes generate their vertices in the shader
    pub no_vertex_buffers: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            label: "Default Pipeline".to_string(),
            shader: PBR_SHADER.to_string(),
            bind_group_layouts: Vec::new(),
            primitive_topology: PrimitiveTopology::TriangleList,
            strip_index_format: None,
            cull_mode: Some(Face::Back),
            depth_format: Some(TextureResource::DEPTH_FORMAT),
            depth_write_enabled: true,
            depth_compare: CompareFunction::LessEqual,
            multisample: MultisampleState::default(),
            color_targets: vec![Some(ColorTargetState {
                format: TextureFormat::Rgba8UnormSrgb,
                blend: Some(BlendState::REPLACE),
                write_mask: ColorWrites::ALL,
            })],
            no_vertex_buffers: false,
        }
    }
}

impl PipelineConfig {
    pub fn default_with_shader(shader: &str) -> Self {
        Self {
            shader: shader.to_string(),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_owned();
        self
    }

    pub fn with_cull_mode(mut self, face: Option<Face>) -> Self {
        self.cull_mode = face;
        self
    }

    pub fn with_bind_group_layouts(mut self, layouts: Vec<BindGroupLayout>) -> Self {
        self.bind_group_layouts = layouts;
        self
    }

    /// Sets depth testing state (builder pattern)
    pub fn with_depth(mut self, format: Option<TextureFormat>, write: bool, compare: CompareFunction) -> Self {
        self.depth_format = format;
        self.depth_write_enabled = write;
        self.depth_compare = compare;
        self
    }

    /// Single color target of `format` with the given blending
    pub fn with_color_target(mut self, format: TextureFormat, blend: BlendState) -> Self {
        self.color_targets = vec![Some(ColorTargetState {
            format,
            blend: Some(blend),
            write_mask: ColorWrites::ALL,
        })];
        self
    }

    /// Sets primitive topology; strips restart on the `u32` index sentinel
    pub fn with_primitive_topology(mut self, topology: PrimitiveTopology) -> Self {
        self.primitive_topology = topology;
        self.strip_index_format = topology.is_strip().then_some(IndexFormat::Uint32);
        self
    }

    pub fn with_no_vertex_buffers(mut self) -> Self {
        self.no_vertex_buffers = true;
        self
    }

    fn color_format(&self) -> Option<TextureFormat> {
        self.color_targets.iter().flatten().map(|t| t.format).next()
    }
}

/// What a PBR pipeline is specialized on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariantKey {
    pub features: FeatureMask,
    pub topology: Topology,
}

/// Fixed-function state derived from a variant key
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariantState {
    pub topology: PrimitiveTopology,
    pub cull_mode: Option<Face>,
    pub blend: BlendState,
    pub depth_write_enabled: bool,
}

impl VariantState {
    pub fn for_key(key: VariantKey) -> Self {
        let blended = key.features.alpha_mode() == AlphaMode::Blend;
        let cull_mode = if key.features.contains(FeatureMask::DOUBLE_SIDED) || !key.topology.is_triangles() {
            None
        } else {
            Some(Face::Back)
        };

        Self {
            topology: key.topology.to_wgpu(),
            cull_mode,
            blend: if blended {
                BlendState::ALPHA_BLENDING
            } else {
                BlendState::REPLACE
            },
            depth_write_enabled: !blended,
        }
    }
}

/// WGSL constants selecting the code paths of a PBR variant
pub fn variant_defines(features: FeatureMask) -> String {
    let flags = [
        ("HAS_BASE_COLOR_TEXTURE", FeatureMask::BASE_COLOR_TEXTURE),
        ("HAS_NORMAL_MAP", FeatureMask::NORMAL_MAP),
        ("HAS_METALLIC_ROUGHNESS_TEXTURE", FeatureMask::METALLIC_ROUGHNESS_TEXTURE),
        ("HAS_OCCLUSION_TEXTURE", FeatureMask::OCCLUSION_TEXTURE),
        ("HAS_EMISSIVE", FeatureMask::EMISSIVE),
        ("HAS_SKINNING", FeatureMask::SKINNING),
        ("HAS_VERTEX_COLOR", FeatureMask::VERTEX_COLOR),
        ("HAS_TEXTURE_TRANSFORM", FeatureMask::TEXTURE_TRANSFORM),
        ("IS_UNLIT", FeatureMask::UNLIT),
        ("USE_IBL", FeatureMask::IBL),
    ];

    let mut defines = String::new();
    for (name, flag) in flags {
        defines.push_str(&format!("const {}: bool = {};\n", name, features.contains(flag)));
    }
    defines.push_str(&format!("const MORPH_TARGETS: u32 = {}u;\n", features.morph_target_capacity()));
    defines.push_str(&format!("const ALPHA_MODE: u32 = {}u;\n", features.alpha_mode().bits()));
    defines
}

/// Manages render pipelines with caching and lazy creation
pub struct PipelineManager {
    device: Arc<Device>,
    color_format: TextureFormat,
    shader_sources: HashMap<String, String>,
    pipeline_configs: HashMap<String, PipelineConfig>,
    pipelines: HashMap<String, ResourceHandle>,
    compute_configs: HashMap<String, ComputeConfig>,
    compute_pipelines: HashMap<String, ResourceHandle>,
    variant_base: Option<PipelineConfig>,
    variants: HashMap<VariantKey, ResourceHandle>,
    failed_pipelines: HashSet<String>,
    failed_variants: HashSet<VariantKey>,
}

impl PipelineManager {
    pub fn new(device: Arc<Device>, color_format: TextureFormat) -> Self {
        Self {
            device,
            color_format,
            shader_sources: HashMap::new(),
            pipeline_configs: HashMap::new(),
            pipelines: HashMap::new(),
            compute_configs: HashMap::new(),
            compute_pipelines: HashMap::new(),
            variant_base: None,
            variants: HashMap::new(),
            failed_pipelines: HashSet::new(),
            failed_variants: HashSet::new(),
        }
    }

    pub fn color_format(&self) -> TextureFormat {
        self.color_format
    }

    /// Stores WGSL source under `name`; compilation happens per pipeline
    pub fn load_shader(&mut self, name: &str, source: &str) {
        self.shader_sources.insert(name.to_string(), source.to_string());
    }

    /// Registers a pipeline configuration without creating it
    pub fn register_pipeline(&mut self, name: &str, config: PipelineConfig) {
        self.pipeline_configs.insert(name.to_string(), config);
    }

    /// Sets the configuration every PBR variant starts from
    ///
    /// Topology, culling, blending and the color format are overridden per
    /// variant.
    pub fn register_variant_base(&mut self, config: PipelineConfig) {
        self.variant_base = Some(config);
    }

    pub fn has_pipeline(&self, name: &str) -> bool {
        self.pipeline_configs.contains_key(name)
    }

    /// Gets or creates a named pipeline
    pub fn prepare_pipeline(&mut self, gpu: &mut GpuResourceManager, name: &str) -> Option<ResourceHandle> {
        if let Some(&handle) = self.pipelines.get(name) {
            return Some(handle);
        }
        if self.failed_pipelines.contains(name) {
            return None;
        }

        let config = self
            .pipeline_configs
            .get(name)?
            .clone()
            .with_color_target(self.color_format, BlendState::REPLACE);
        let source = self.shader_sources.get(&config.shader).cloned().unwrap_or_default();

        match self.compile(&config, &source) {
            Ok(pipeline) => {
                let handle = gpu.insert_program(pipeline, &config.label);
                self.pipelines.insert(name.to_string(), handle);
                Some(handle)
            }
            Err(e) => {
                log::error!("Failed to create pipeline '{}': {}", name, e);
                self.failed_pipelines.insert(name.to_string());
                None
            }
        }
    }

    pub fn pipeline(&self, name: &str) -> Option<ResourceHandle> {
        self.pipelines.get(name).copied()
    }

    /// Registers a compute pipeline configuration without creating it
    pub fn register_compute(&mut self, name: &str, config: ComputeConfig) {
        self.compute_configs.insert(name.to_string(), config);
    }

    /// Gets or creates a named compute pipeline
    pub fn prepare_compute(&mut self, gpu: &mut GpuResourceManager, name: &str) -> Option<ResourceHandle> {
        if let Some(&handle) = self.compute_pipelines.get(name) {
            return Some(handle);
        }
        if self.failed_pipelines.contains(name) {
            return None;
        }

        let config = self.compute_configs.get(name)?;
        let source = self.shader_sources.get(&config.shader).map(String::as_str).unwrap_or_default();

        match self.compile_compute(config, source) {
            Ok(pipeline) => {
                log::debug!("Compiled {}", config.label);
                let handle = gpu.insert_compute_program(pipeline, &config.label);
                self.compute_pipelines.insert(name.to_string(), handle);
                Some(handle)
            }
            Err(e) => {
                log::error!("Failed to create compute pipeline '{}': {}", name, e);
                self.failed_pipelines.insert(name.to_string());
                None
            }
        }
    }

    /// Gets or compiles the PBR variant for `key`
    ///
    /// A variant that fails to compile is logged once and then skipped
    /// until [`PipelineManager::clear_failures`] is called.
    pub fn prepare_variant(&mut self, gpu: &mut GpuResourceManager, key: VariantKey) -> Option<ResourceHandle> {
        if let Some(&handle) = self.variants.get(&key) {
            return Some(handle);
        }
        if self.failed_variants.contains(&key) {
            return None;
        }

        let config = self.variant_config(key)?;
        let source = match self.shader_sources.get(&config.shader) {
            Some(source) => format!("{}{}", variant_defines(key.features), source),
            None => String::new(),
        };

        match self.compile(&config, &source) {
            Ok(pipeline) => {
                log::debug!("Compiled {}", config.label);
                let handle = gpu.insert_program(pipeline, &config.label);
                self.variants.insert(key, handle);
                Some(handle)
            }
            Err(e) => {
                log::error!("Shader variant {:?} failed, its draws are skipped: {}", key, e);
                self.failed_variants.insert(key);
                None
            }
        }
    }

    pub fn variant(&self, key: VariantKey) -> Option<ResourceHandle> {
        self.variants.get(&key).copied()
    }

    fn variant_config(&self, key: VariantKey) -> Option<PipelineConfig> {
        let state = VariantState::for_key(key);
        let base = self.variant_base.clone()?;
        let mut config = base
            .with_label(&format!("PBR variant {:#06x} {:?}", key.features.bits(), key.topology))
            .with_primitive_topology(state.topology)
            .with_cull_mode(state.cull_mode)
            .with_color_target(self.color_format, state.blend);
        config.depth_write_enabled = state.depth_write_enabled;
        Some(config)
    }

    /// Forgets failed variants so the next frame retries them
    pub fn clear_failures(&mut self) {
        self.failed_variants.clear();
        self.failed_pipelines.clear();
    }

    /// Switches the output format, dropping every pipeline built for the old one
    pub fn set_color_format(&mut self, gpu: &mut GpuResourceManager, format: TextureFormat) {
        if format == self.color_format {
            return;
        }
        self.release_all(gpu);
        self.color_format = format;
    }

    /// Releases every compiled pipeline; configurations stay registered
    pub fn release_all(&mut self, gpu: &mut GpuResourceManager) {
        let handles: Vec<ResourceHandle> = self
            .pipelines
            .drain()
            .map(|(_, h)| h)
            .chain(self.variants.drain().map(|(_, h)| h))
            .chain(self.compute_pipelines.drain().map(|(_, h)| h))
            .collect();
        gpu.release_all(handles);
        self.clear_failures();
    }

    fn compile(&self, config: &PipelineConfig, source: &str) -> Result<RenderPipeline> {
        if source.is_empty() {
            return Err(ViewerError::ShaderCompileFailed(format!(
                "shader '{}' not loaded",
                config.shader
            )));
        }
        debug_assert_eq!(config.color_format(), Some(self.color_format));

        let (pipeline, error) = capture_errors(&self.device, || self.create_pipeline(config, source));
        match error {
            Some(e) => Err(ViewerError::ShaderCompileFailed(e.to_string())),
            None => Ok(pipeline),
        }
    }

    fn compile_compute(&self, config: &ComputeConfig, source: &str) -> Result<ComputePipeline> {
        if source.is_empty() {
            return Err(ViewerError::ShaderCompileFailed(format!(
                "shader '{}' not loaded",
                config.shader
            )));
        }

        let (pipeline, error) = capture_errors(&self.device, || {
            let shader = self.device.create_shader_module(ShaderModuleDescriptor {
                label: Some(&config.label),
                source: ShaderSource::Wgsl(source.into()),
            });
            let layouts: Vec<&BindGroupLayout> = config.bind_group_layouts.iter().collect();
            let pipeline_layout = self.device.create_pipeline_layout(&PipelineLayoutDescriptor {
                label: Some(&format!("{} Layout", config.label)),
                bind_group_layouts: &layouts,
                push_constant_ranges: &[],
            });
            self.device.create_compute_pipeline(&ComputePipelineDescriptor {
                label: Some(&config.label),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: Some(&config.entry_point),
                compilation_options: PipelineCompilationOptions::default(),
                cache: None,
            })
        });
        match error {
            Some(e) => Err(ViewerError::ShaderCompileFailed(e.to_string())),
            None => Ok(pipeline),
        }
    }

    fn create_pipeline(&self, config: &PipelineConfig, source: &str) -> RenderPipeline {
        let shader = self.device.create_shader_module(ShaderModuleDescriptor {
            label: Some(&config.label),
            source: ShaderSource::Wgsl(source.into()),
        });

        let bind_group_layout_refs: Vec<&BindGroupLayout> = config.bind_group_layouts.iter().collect();
        let pipeline_layout = self.device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some(&format!("{} Layout", config.label)),
            bind_group_layouts: &bind_group_layout_refs,
            push_constant_ranges: &[],
        });

        let vertex_buffers: &[VertexBufferLayout] = if config.no_vertex_buffers {
            &[]
        } else {
            &[Vertex::desc()]
        };

        let depth_stencil = config.depth_format.map(|format| DepthStencilState {
            format,
            depth_write_enabled: config.depth_write_enabled,
            depth_compare: config.depth_compare,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        });

        self.device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some(&config.label),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: vertex_buffers,
                compilation_options: PipelineCompilationOptions::default(),
            },
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &config.color_targets,
                compilation_options: PipelineCompilationOptions::default(),
            }),
            primitive: PrimitiveState {
                topology: config.primitive_topology,
                strip_index_format: config.strip_index_format,
                front_face: FrontFace::Ccw,
                cull_mode: config.cull_mode,
                polygon_mode: PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil,
            multisample: config.multisample,
            multiview: None,
            cache: None,
        })
    }

    pub fn get_stats(&self) -> PipelineStats {
        PipelineStats {
            named_pipelines: self.pipelines.len(),
            compute_pipelines: self.compute_pipelines.len(),
            variants: self.variants.len(),
            failed_variants: self.failed_variants.len(),
            loaded_shaders: self.shader_sources.len(),
        }
    }
}

/// Statistics about pipeline manager state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStats {
    pub named_pipelines: usize,
    pub compute_pipelines: usize,
    pub variants: usize,
    pub failed_variants: usize,
    pub loaded_shaders: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(features: FeatureMask, topology: Topology) -> VariantKey {
        VariantKey { features, topology }
    }

    #[test]
    fn test_defines_follow_feature_bits() {
        let features = (FeatureMask::BASE_COLOR_TEXTURE | FeatureMask::IBL)
            .with_morph_targets(3)
            .with_alpha_mode(AlphaMode::Mask);
        let defines = variant_defines(features);

        assert!(defines.contains("const HAS_BASE_COLOR_TEXTURE: bool = true;"));
        assert!(defines.contains("const USE_IBL: bool = true;"));
        assert!(defines.contains("const HAS_SKINNING: bool = false;"));
        assert!(defines.contains("const IS_UNLIT: bool = false;"));
        assert!(defines.contains("const HAS_TEXTURE_TRANSFORM: bool = false;"));
        assert!(defines.contains("const MORPH_TARGETS: u32 = 4u;"));
        assert!(defines.contains("const ALPHA_MODE: u32 = 1u;"));
    }

    #[test]
    fn test_double_sided_disables_culling() {
        let single = VariantState::for_key(key(FeatureMask::empty(), Topology::Triangles));
        let double = VariantState::for_key(key(FeatureMask::DOUBLE_SIDED, Topology::Triangles));
        assert_eq!(single.cull_mode, Some(Face::Back));
        assert_eq!(double.cull_mode, None);

        let lines = VariantState::for_key(key(FeatureMask::empty(), Topology::LineStrip));
        assert_eq!(lines.cull_mode, None);
        assert_eq!(lines.topology, PrimitiveTopology::LineStrip);
    }

    #[test]
    fn test_blend_variants_blend_without_depth_writes() {
        let blend = VariantState::for_key(key(
            FeatureMask::empty().with_alpha_mode(AlphaMode::Blend),
            Topology::Triangles,
        ));
        assert_eq!(blend.blend, BlendState::ALPHA_BLENDING);
        assert!(!blend.depth_write_enabled);

        let mask = VariantState::for_key(key(
            FeatureMask::empty().with_alpha_mode(AlphaMode::Mask),
            Topology::Triangles,
        ));
        assert_eq!(mask.blend, BlendState::REPLACE);
        assert!(mask.depth_write_enabled);
    }

    #[test]
    fn test_strip_topologies_get_index_format() {
        let strip = PipelineConfig::default().with_primitive_topology(PrimitiveTopology::TriangleStrip);
        assert_eq!(strip.strip_index_format, Some(IndexFormat::Uint32));

        let list = strip.with_primitive_topology(PrimitiveTopology::TriangleList);
        assert_eq!(list.strip_index_format, None);
    }
}
