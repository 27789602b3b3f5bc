//! Compute passes that prefilter an environment on the GPU
//!
//! The panorama is uploaded once as an `Rgba32Float` mip chain of box
//! filtered halvings. Each pass reads the level matching its footprint and
//! writes one mip of an `Rgba16Float` storage texture:
//!
//! | pass | output | reads level for width |
//! |---|---|---|
//! | environment | background cube | `cube_size * 4` |
//! | irradiance | cosine-weighted cube | 64 |
//! | specular | one GGX cube mip per roughness step | `face * 4`, at least 8 |
//! | brdf | split-sum table | - |
//!
//! Sample sets are rotated per face and mip by offsets from a `StdRng`
//! seeded with the configured seed, so a given image and [`IblConfig`]
//! always produce the same textures.

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    error::{Result, ViewerError},
    gfx::{
        rendering::pipeline_manager::{ComputeConfig, PipelineManager},
        resources::{
            gpu_resources::{GpuResourceManager, ResourceHandle},
            texture_resource::TextureResource,
        },
    },
    wgpu_utils::{binding_types, capture_errors, BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
};

use super::{IblConfig, IblData, IblTextures};

pub const PREFILTER_SHADER: &str = "ibl_prefilter";
pub const ENVIRONMENT_PASS: &str = "ibl_environment";
pub const IRRADIANCE_PASS: &str = "ibl_irradiance";
pub const SPECULAR_PASS: &str = "ibl_specular";
pub const BRDF_PASS: &str = "ibl_brdf";

const PREFILTER_WGSL: &str = include_str!("shaders/prefilter.wgsl");
const WORKGROUP_SIZE: u32 = 8;

/// Panorama width the irradiance pass reads
pub const IRRADIANCE_SOURCE_WIDTH: u32 = 64;

/// Mip index used for the irradiance offsets
pub const IRRADIANCE_MIP: u32 = u32::MAX;

/// Seeded rotation of the sample set for one (face, mip) pair
pub fn sample_offsets(seed: u64, face: usize, mip: u32) -> (f32, f32) {
    let mut rng = StdRng::seed_from_u64(seed ^ ((mip as u64) << 8 | face as u64));
    (rng.random::<f32>(), rng.random::<f32>())
}

/// Specular mips actually produced for a face size; the chain stops at 1x1
pub fn specular_levels(size: u32, mip_levels: u32) -> u32 {
    mip_levels.clamp(1, 32 - size.max(1).leading_zeros())
}

/// Roughness a specular mip is filtered for
pub fn mip_roughness(mip: u32, levels: u32) -> f32 {
    if levels > 1 {
        mip as f32 / (levels - 1) as f32
    } else {
        0.0
    }
}

/// Panorama width the specular pass reads for a face size
pub fn specular_source_width(face_size: u32) -> u32 {
    (face_size * 4).max(8)
}

/// MUST match `PrefilterParams` in `prefilter.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
struct PrefilterParams {
    offsets: [[f32; 4]; 6],
    face_size: u32,
    sample_count: u32,
    roughness: f32,
    source_level: u32,
}

impl PrefilterParams {
    fn new(face_size: u32, sample_count: u32, source_level: u32) -> Self {
        Self {
            face_size,
            sample_count,
            source_level,
            ..Self::default()
        }
    }

    fn with_offsets(mut self, seed: u64, mip: u32) -> Self {
        for (face, offset) in self.offsets.iter_mut().enumerate() {
            let (u, v) = sample_offsets(seed, face, mip);
            *offset = [u, v, 0.0, 0.0];
        }
        self
    }

    fn with_roughness(mut self, roughness: f32) -> Self {
        self.roughness = roughness;
        self
    }
}

/// One dispatch: a pass writing one mip of an output texture
struct Dispatch<'a> {
    pass: &'static str,
    params: PrefilterParams,
    output: &'a wgpu::Texture,
    mip: u32,
    layers: u32,
}

/// Compute layout and pipeline registration for the prefilter passes
pub struct Prefilter {
    layout: BindGroupLayoutWithDesc,
}

impl Prefilter {
    /// Loads the shader and registers the four passes with `pipelines`
    pub fn register(device: &wgpu::Device, pipelines: &mut PipelineManager) -> Self {
        let layout = BindGroupLayoutBuilder::new()
            .next_binding_compute(binding_types::uniform::<PrefilterParams>())
            .next_binding_compute(binding_types::data_texture_2d())
            .next_binding_compute(binding_types::storage_texture_2d_array(TextureResource::HDR_FORMAT))
            .create(device, "IBL Prefilter Bind Group Layout");

        pipelines.load_shader(PREFILTER_SHADER, PREFILTER_WGSL);
        for (name, entry_point) in [
            (ENVIRONMENT_PASS, "environment_main"),
            (IRRADIANCE_PASS, "irradiance_main"),
            (SPECULAR_PASS, "specular_main"),
            (BRDF_PASS, "brdf_main"),
        ] {
            pipelines.register_compute(
                name,
                ComputeConfig::new(PREFILTER_SHADER, entry_point).with_bind_group_layouts(vec![layout.layout.clone()]),
            );
        }

        Self { layout }
    }

    /// Prefilters `data` into a fresh set of IBL textures
    ///
    /// Failed pipelines or validation errors become `GpuUploadFailed`; no
    /// textures are returned in that case.
    pub fn run(
        &self,
        gpu: &mut GpuResourceManager,
        pipelines: &mut PipelineManager,
        queue: &wgpu::Queue,
        data: &IblData,
    ) -> Result<IblTextures> {
        let started = std::time::Instant::now();
        let device = gpu.device().clone();
        let mut handles = Vec::new();

        let (result, error) = capture_errors(&device, || self.encode(gpu, pipelines, queue, data, &mut handles));
        gpu.release_all(handles);

        let textures = match (result, error) {
            (Ok(textures), None) => textures,
            (Err(e), _) => return Err(e),
            (Ok(_), Some(e)) => return Err(ViewerError::GpuUploadFailed(e.to_string())),
        };

        log::info!(
            "Prefiltered {}x{} environment on the GPU in {:.2?} ({} specular mips)",
            data.image.width,
            data.image.height,
            started.elapsed(),
            textures.specular_mip_count
        );
        Ok(textures)
    }

    fn encode(
        &self,
        gpu: &mut GpuResourceManager,
        pipelines: &mut PipelineManager,
        queue: &wgpu::Queue,
        data: &IblData,
        handles: &mut Vec<ResourceHandle>,
    ) -> Result<IblTextures> {
        let device = gpu.device().clone();
        let config: &IblConfig = &data.config;
        let image = &data.image;
        let levels = specular_levels(config.specular_size, config.specular_mip_levels);

        let environment_level = image.downsample_steps(config.cube_size * 4);
        let irradiance_level = image.downsample_steps(IRRADIANCE_SOURCE_WIDTH);
        let specular_sources: Vec<u32> = (0..levels)
            .map(|mip| image.downsample_steps(specular_source_width((config.specular_size >> mip).max(1))))
            .collect();
        let deepest = specular_sources
            .iter()
            .copied()
            .chain([environment_level, irradiance_level])
            .max()
            .unwrap_or(0);
        let panorama = panorama_texture(&device, queue, data, deepest);

        let environment = TextureResource::storage_cube(&device, config.cube_size, 1, "IBL Environment");
        let irradiance = TextureResource::storage_cube(&device, config.irradiance_size, 1, "IBL Irradiance");
        let specular = TextureResource::storage_cube(&device, config.specular_size, levels, "IBL Specular");
        let brdf_lut = TextureResource::storage_2d(&device, config.lut_size, "IBL BRDF LUT");

        let mut dispatches = vec![
            Dispatch {
                pass: ENVIRONMENT_PASS,
                params: PrefilterParams::new(config.cube_size, 1, environment_level),
                output: &environment.texture,
                mip: 0,
                layers: 6,
            },
            Dispatch {
                pass: IRRADIANCE_PASS,
                params: PrefilterParams::new(config.irradiance_size, config.lambertian_sample_count, irradiance_level)
                    .with_offsets(config.seed, IRRADIANCE_MIP),
                output: &irradiance.texture,
                mip: 0,
                layers: 6,
            },
            Dispatch {
                pass: BRDF_PASS,
                params: PrefilterParams::new(config.lut_size, config.lut_sample_count, 0),
                output: &brdf_lut.texture,
                mip: 0,
                layers: 1,
            },
        ];
        for (mip, &source_level) in specular_sources.iter().enumerate() {
            let mip = mip as u32;
            let face_size = (config.specular_size >> mip).max(1);
            // Mip 0 is the mirror reflection
            let (pass, params) = if mip == 0 {
                (ENVIRONMENT_PASS, PrefilterParams::new(face_size, 1, source_level))
            } else {
                let params = PrefilterParams::new(face_size, config.ggx_sample_count, source_level)
                    .with_offsets(config.seed, mip)
                    .with_roughness(mip_roughness(mip, levels));
                (SPECULAR_PASS, params)
            };
            dispatches.push(Dispatch {
                pass,
                params,
                output: &specular.texture,
                mip,
                layers: 6,
            });
        }

        // Buffers first; the bind groups below borrow them from `gpu`
        let mut uniforms = Vec::with_capacity(dispatches.len());
        for dispatch in &dispatches {
            let handle = gpu.create_buffer(
                &format!("{} mip {} params", dispatch.pass, dispatch.mip),
                wgpu::BufferUsages::UNIFORM,
                bytemuck::bytes_of(&dispatch.params),
            );
            handles.push(handle);
            uniforms.push(handle);
        }
        let mut programs = Vec::with_capacity(dispatches.len());
        for dispatch in &dispatches {
            let program = pipelines.prepare_compute(gpu, dispatch.pass).ok_or_else(|| {
                ViewerError::GpuUploadFailed(format!("prefilter pass '{}' is unavailable", dispatch.pass))
            })?;
            programs.push(program);
        }
        gpu.flush(queue);

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("IBL Prefilter Encoder"),
        });
        for ((dispatch, &uniform), &program) in dispatches.iter().zip(&uniforms).zip(&programs) {
            let (Some(buffer), Some(pipeline)) = (gpu.buffer(uniform), gpu.compute_program(program)) else {
                return Err(ViewerError::GpuUploadFailed(format!(
                    "prefilter pass '{}' lost its resources",
                    dispatch.pass
                )));
            };
            let view = dispatch.output.create_view(&wgpu::TextureViewDescriptor {
                label: Some(dispatch.pass),
                dimension: Some(wgpu::TextureViewDimension::D2Array),
                base_mip_level: dispatch.mip,
                mip_level_count: Some(1),
                base_array_layer: 0,
                array_layer_count: Some(dispatch.layers),
                ..Default::default()
            });
            let bind_group = BindGroupBuilder::new(&self.layout)
                .buffer(buffer)
                .texture(&panorama.view)
                .texture(&view)
                .create(&device, dispatch.pass);

            let groups = dispatch.params.face_size.div_ceil(WORKGROUP_SIZE);
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(dispatch.pass),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(pipeline);
            compute_pass.set_bind_group(0, &bind_group, &[]);
            compute_pass.dispatch_workgroups(groups, groups, dispatch.layers);
        }
        queue.submit(std::iter::once(encoder.finish()));

        Ok(IblTextures {
            environment,
            irradiance,
            specular,
            brdf_lut,
            specular_mip_count: levels,
            loaded: true,
        })
    }
}

/// The panorama and its first `steps` halvings as one mipmapped texture
fn panorama_texture(device: &wgpu::Device, queue: &wgpu::Queue, data: &IblData, steps: u32) -> TextureResource {
    let chain = data.image.mip_chain(steps);
    let texels: Vec<Vec<[f32; 4]>> = chain
        .iter()
        .map(|level| level.pixels.iter().map(|p| [p[0], p[1], p[2], 1.0]).collect())
        .collect();
    TextureResource::data_mips(device, queue, data.image.width, data.image.height, &texels, "IBL Panorama")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        gfx::rendering::render_engine::RenderEngine,
        ibl::{
            hdr::sky_and_ground,
            sampler::{self, CubeFaces},
        },
    };
    use half::f16;

    fn renderer() -> Option<RenderEngine> {
        match pollster::block_on(RenderEngine::new_headless(4, 4)) {
            Ok(renderer) => Some(renderer),
            Err(e) => {
                eprintln!("skipping GPU test: {}", e);
                None
            }
        }
    }

    /// Reads one mip of every layer of an `Rgba16Float` texture
    fn read_layers(renderer: &RenderEngine, texture: &wgpu::Texture, mip: u32) -> Vec<Vec<[f32; 4]>> {
        let device = renderer.device();
        let size = (texture.width() >> mip).max(1);
        let layers = texture.depth_or_array_layers();
        let unpadded = size * 8;
        let padded = unpadded.next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Prefilter Readback"),
            size: (padded * size * layers) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: mip,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(size),
                },
            },
            wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: layers,
            },
        );
        renderer.queue().submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        slice.map_async(wgpu::MapMode::Read, |result| result.unwrap());
        device.poll(wgpu::PollType::Wait).unwrap();

        let data = slice.get_mapped_range();
        let halves: &[f16] = bytemuck::cast_slice(&data[..]);
        (0..layers)
            .map(|layer| {
                let mut texels = Vec::with_capacity((size * size) as usize);
                for y in 0..size {
                    let row = ((layer * size + y) * padded / 2) as usize;
                    for x in 0..size as usize {
                        let t = &halves[row + x * 4..row + x * 4 + 4];
                        texels.push([t[0].to_f32(), t[1].to_f32(), t[2].to_f32(), t[3].to_f32()]);
                    }
                }
                texels
            })
            .collect()
    }

    fn assert_close(gpu: &[Vec<[f32; 4]>], cpu: &[Vec<[f32; 4]>], what: &str) {
        assert_eq!(gpu.len(), cpu.len(), "{}", what);
        for (layer, (g, c)) in gpu.iter().zip(cpu).enumerate() {
            assert_eq!(g.len(), c.len(), "{}", what);
            for (i, (g, c)) in g.iter().zip(c).enumerate() {
                for channel in 0..3 {
                    let tolerance = 0.02 + 0.02 * c[channel].abs();
                    assert!(
                        (g[channel] - c[channel]).abs() <= tolerance,
                        "{} layer {} texel {}: gpu {:?} cpu {:?}",
                        what,
                        layer,
                        i,
                        g,
                        c
                    );
                }
            }
        }
    }

    #[test]
    fn test_gpu_prefilter_matches_cpu_reference() {
        let Some(mut renderer) = renderer() else {
            return;
        };
        let data = IblData::from_image(sky_and_ground(64, 32), &IblConfig::preview());
        let textures = renderer.prefilter_environment(&data).unwrap();
        let reference = sampler::prefilter(&data);

        assert_eq!(textures.specular_mip_count, reference.specular.len() as u32);
        let faces = |faces: &CubeFaces| faces.to_vec();
        assert_close(
            &read_layers(&renderer, &textures.environment.texture, 0),
            &faces(&reference.environment),
            "environment",
        );
        assert_close(
            &read_layers(&renderer, &textures.irradiance.texture, 0),
            &faces(&reference.irradiance),
            "irradiance",
        );
        for (mip, expected) in reference.specular.iter().enumerate() {
            assert_close(
                &read_layers(&renderer, &textures.specular.texture, mip as u32),
                &faces(expected),
                &format!("specular mip {}", mip),
            );
        }
        assert_close(
            &read_layers(&renderer, &textures.brdf_lut.texture, 0),
            &[reference.brdf_lut],
            "brdf",
        );
    }

    #[test]
    fn test_gpu_prefilter_is_deterministic() {
        let Some(mut renderer) = renderer() else {
            return;
        };
        let data = IblData::from_image(sky_and_ground(32, 16), &IblConfig::preview());
        let a = renderer.prefilter_environment(&data).unwrap();
        let b = renderer.prefilter_environment(&data).unwrap();
        for mip in 0..a.specular_mip_count {
            assert_eq!(
                read_layers(&renderer, &a.specular.texture, mip),
                read_layers(&renderer, &b.specular.texture, mip)
            );
        }
        assert_eq!(
            read_layers(&renderer, &a.irradiance.texture, 0),
            read_layers(&renderer, &b.irradiance.texture, 0)
        );
        // Transient parameter buffers go back to the manager
        let handles = renderer.gpu_stats().total_handles();
        renderer.prefilter_environment(&data).unwrap();
        assert_eq!(renderer.gpu_stats().total_handles(), handles);
    }

    #[test]
    fn test_seed_only_moves_sampled_passes() {
        let Some(mut renderer) = renderer() else {
            return;
        };
        let image = sky_and_ground(32, 16);
        let a = renderer
            .prefilter_environment(&IblData::from_image(image.clone(), &IblConfig::preview()))
            .unwrap();
        let b = renderer
            .prefilter_environment(&IblData::from_image(image, &IblConfig::preview().with_seed(1)))
            .unwrap();

        assert_eq!(
            read_layers(&renderer, &a.environment.texture, 0),
            read_layers(&renderer, &b.environment.texture, 0)
        );
        assert_eq!(
            read_layers(&renderer, &a.brdf_lut.texture, 0),
            read_layers(&renderer, &b.brdf_lut.texture, 0)
        );
        assert_ne!(
            read_layers(&renderer, &a.specular.texture, 1),
            read_layers(&renderer, &b.specular.texture, 1)
        );
    }

    #[test]
    fn test_specular_levels_stop_at_one_texel() {
        assert_eq!(specular_levels(8, 10), 4);
        assert_eq!(specular_levels(128, 5), 5);
        assert_eq!(specular_levels(1, 0), 1);
        assert_eq!(mip_roughness(2, 5), 0.5);
        assert_eq!(mip_roughness(0, 1), 0.0);
    }

    #[test]
    fn test_offsets_follow_seed() {
        assert_eq!(sample_offsets(7, 2, 1), sample_offsets(7, 2, 1));
        assert_ne!(sample_offsets(7, 2, 1), sample_offsets(8, 2, 1));
        assert_ne!(sample_offsets(7, 2, 1), sample_offsets(7, 3, 1));
        let params = PrefilterParams::new(4, 8, 0).with_offsets(7, 1);
        assert_eq!(params.offsets[2][..2], [sample_offsets(7, 2, 1).0, sample_offsets(7, 2, 1).1]);
    }

    #[test]
    fn test_params_layout_size() {
        assert_eq!(std::mem::size_of::<PrefilterParams>(), 112);
    }
}
