//! WGPU-based frame renderer
//!
//! Owns the device and everything created on it: the resource manager, the
//! pipeline cache, frame bindings and the IBL textures. Output goes either
//! to a window surface or to an offscreen texture that can be read back.
//!
//! A frame updates the frame uniform from a camera snapshot, writes the
//! scene's per-draw state, builds a [`DrawList`], compiles any missing shader
//! variants, then records a single pass: optional environment background,
//! opaque, masked and finally blended primitives.

use std::sync::Arc;

use wgpu::TextureFormat;

use crate::{
    asset::image::ImageData,
    error::{Result, ViewerError},
    gfx::{
        camera::CameraSnapshot,
        resources::{
            global_bindings::{draw_bind_group_layout, FrameUniform, GlobalBindings, LightUniform},
            gpu_resources::{GpuResourceManager, GpuResourceStats},
            material::material_bind_group_layout,
            texture_resource::TextureResource,
        },
        scene::{Scene, UploadContext},
    },
    ibl::{prefilter::Prefilter, IblData, IblTextures},
    wgpu_utils::BindGroupLayoutWithDesc,
};

use super::{
    draw_list::{DrawItem, DrawList},
    pipeline_manager::{PipelineConfig, PipelineManager, BACKGROUND_SHADER, PBR_SHADER},
    render_pass_ext::RenderPassExt,
    settings::RenderSettings,
};

const COMMON_WGSL: &str = include_str!("shaders/common.wgsl");
const PBR_WGSL: &str = include_str!("shaders/pbr.wgsl");
const BACKGROUND_WGSL: &str = include_str!("shaders/background.wgsl");

/// Color format of the offscreen target; readback yields sRGB-encoded RGBA8
pub const OFFSCREEN_FORMAT: TextureFormat = TextureFormat::Rgba8UnormSrgb;

/// Where frames are drawn
pub enum RenderTarget {
    Offscreen(TextureResource),
    Surface {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
}

impl RenderTarget {
    pub fn format(&self) -> TextureFormat {
        match self {
            RenderTarget::Offscreen(texture) => texture.texture.format(),
            RenderTarget::Surface { config, .. } => config.format,
        }
    }

    pub fn is_offscreen(&self) -> bool {
        matches!(self, RenderTarget::Offscreen(_))
    }
}

/// What happened during one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub draws: usize,
    pub culled: usize,
    /// Draws dropped because their variant failed or GPU state was missing
    pub skipped: usize,
    pub background: bool,
}

/// Builds the frame uniform from the camera, scene lights and output settings
///
/// Without scene lights or IBL the key and fill rig lights the model, unless
/// the settings turn that fallback off.
pub fn frame_uniform(
    camera: &CameraSnapshot,
    settings: &RenderSettings,
    scene_lights: &[LightUniform],
    specular_mip_count: u32,
    ibl_active: bool,
) -> FrameUniform {
    let mut uniform = FrameUniform {
        view_proj: camera.view_proj.into(),
        inv_view_proj: camera.inverse_rotation_view_proj().into(),
        camera_position: camera.eye.extend(1.0).into(),
        exposure: settings.exposure,
        ibl_intensity: settings.ibl_intensity,
        specular_mip_count: specular_mip_count.max(1) as f32,
        tone_map: settings.tone_map.shader_index(),
        ibl_enabled: ibl_active as u32,
        ..FrameUniform::default()
    };
    if !scene_lights.is_empty() {
        uniform.set_lights(scene_lights);
    } else if settings.directional_light_fallback && !ibl_active {
        uniform.set_lights(&LightUniform::default_rig());
    }
    uniform
}

/// Core rendering engine managing GPU resources and draw calls
pub struct RenderEngine {
    instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    target: RenderTarget,
    size: (u32, u32),
    depth_texture: TextureResource,
    gpu: GpuResourceManager,
    pub pipeline_manager: PipelineManager,
    global_bindings: GlobalBindings,
    draw_layout: BindGroupLayoutWithDesc,
    material_layout: BindGroupLayoutWithDesc,
    prefilter: Prefilter,
    ibl: IblTextures,
}

impl RenderEngine {
    /// Creates a renderer drawing into an offscreen texture
    pub async fn new_headless(width: u32, height: u32) -> Result<RenderEngine> {
        let instance = create_instance();
        let adapter = request_adapter(&instance, None).await?;
        let (device, queue) = request_device(&adapter).await?;

        let (width, height) = (width.max(1), height.max(1));
        let target = RenderTarget::Offscreen(TextureResource::create_color_target(
            &device,
            width,
            height,
            OFFSCREEN_FORMAT,
            "Offscreen Target",
        ));
        Ok(Self::from_parts(instance, adapter, device, queue, target, (width, height)))
    }

    /// Creates a renderer presenting to a window surface
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
    ) -> Result<RenderEngine> {
        let instance = create_instance();
        let surface = instance
            .create_surface(window)
            .map_err(|e| ViewerError::GpuUploadFailed(format!("cannot create surface: {}", e)))?;
        let adapter = request_adapter(&instance, Some(&surface)).await?;
        let (device, queue) = request_device(&adapter).await?;

        let (width, height) = (width.max(1), height.max(1));
        let config = surface_config(&surface, &adapter, width, height)?;
        surface.configure(&device, &config);

        let target = RenderTarget::Surface { surface, config };
        Ok(Self::from_parts(instance, adapter, device, queue, target, (width, height)))
    }

    fn from_parts(
        instance: wgpu::Instance,
        adapter: wgpu::Adapter,
        device: wgpu::Device,
        queue: wgpu::Queue,
        target: RenderTarget,
        size: (u32, u32),
    ) -> Self {
        let device = Arc::new(device);
        let queue = Arc::new(queue);
        device.on_uncaptured_error(Box::new(|error| {
            log::error!("Uncaptured wgpu error: {}", error);
        }));

        let info = adapter.get_info();
        log::info!("Rendering with {} ({:?}) to {:?}", info.name, info.backend, target.format());

        let ibl = IblTextures::placeholder(&device, &queue);
        let global_bindings = GlobalBindings::new(&device, ibl.views());
        let draw_layout = draw_bind_group_layout(&device);
        let material_layout = material_bind_group_layout(&device);
        let depth_texture = TextureResource::create_depth_texture(&device, size.0, size.1, "Depth Texture");

        let mut pipeline_manager = PipelineManager::new(device.clone(), target.format());
        pipeline_manager.load_shader(PBR_SHADER, &format!("{}\n{}", COMMON_WGSL, PBR_WGSL));
        pipeline_manager.load_shader(BACKGROUND_SHADER, &format!("{}\n{}", COMMON_WGSL, BACKGROUND_WGSL));
        pipeline_manager.register_variant_base(
            PipelineConfig::default_with_shader(PBR_SHADER).with_bind_group_layouts(vec![
                global_bindings.layout().clone(),
                draw_layout.layout.clone(),
                material_layout.layout.clone(),
            ]),
        );
        pipeline_manager.register_pipeline(
            BACKGROUND_SHADER,
            PipelineConfig::default_with_shader(BACKGROUND_SHADER)
                .with_label("Background")
                .with_bind_group_layouts(vec![global_bindings.layout().clone()])
                .with_no_vertex_buffers()
                .with_cull_mode(None)
                .with_depth(
                    Some(TextureResource::DEPTH_FORMAT),
                    false,
                    wgpu::CompareFunction::Always,
                ),
        );
        let prefilter = Prefilter::register(&device, &mut pipeline_manager);

        Self {
            instance,
            adapter,
            gpu: GpuResourceManager::new(device.clone()),
            device,
            queue,
            target,
            size,
            depth_texture,
            pipeline_manager,
            global_bindings,
            draw_layout,
            material_layout,
            prefilter,
            ibl,
        }
    }

    /// Redirects output to a window surface created on this renderer's instance
    pub fn attach_surface(
        &mut self,
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
    ) -> Result<()> {
        let surface = self
            .instance
            .create_surface(window)
            .map_err(|e| ViewerError::GpuUploadFailed(format!("cannot create surface: {}", e)))?;
        let (width, height) = (width.max(1), height.max(1));
        let config = surface_config(&surface, &self.adapter, width, height)?;
        surface.configure(&self.device, &config);

        self.pipeline_manager.set_color_format(&mut self.gpu, config.format);
        self.target = RenderTarget::Surface { surface, config };
        self.size = (0, 0);
        self.resize(width, height);
        Ok(())
    }

    /// Resizes the target and depth buffer; no-op when the size is unchanged
    pub fn resize(&mut self, width: u32, height: u32) {
        let size = (width.max(1), height.max(1));
        if size == self.size {
            return;
        }
        self.size = size;

        match &mut self.target {
            RenderTarget::Offscreen(texture) => {
                *texture =
                    TextureResource::create_color_target(&self.device, size.0, size.1, OFFSCREEN_FORMAT, "Offscreen Target");
            }
            RenderTarget::Surface { surface, config } => {
                config.width = size.0;
                config.height = size.1;
                surface.configure(&self.device, config);
            }
        }

        self.depth_texture = TextureResource::create_depth_texture(&self.device, size.0, size.1, "Depth Texture");
        log::debug!("Render target resized to {}x{}", size.0, size.1);
    }

    /// Creates the scene's GPU resources and forgets failed shader variants
    pub fn upload_scene(&mut self, scene: &mut Scene) -> Result<u64> {
        let ctx = UploadContext {
            queue: &self.queue,
            draw_layout: &self.draw_layout,
            material_layout: &self.material_layout,
        };
        let bytes = scene.upload(&mut self.gpu, &ctx)?;
        self.pipeline_manager.clear_failures();
        Ok(bytes)
    }

    pub fn release_scene(&mut self, scene: &mut Scene) {
        scene.release(&mut self.gpu);
    }

    /// Replaces the bound environment
    ///
    /// The previous textures are dropped; wgpu frees them once no submitted
    /// work uses them.
    pub fn set_ibl(&mut self, ibl: IblTextures) {
        self.ibl = ibl;
        self.global_bindings.rebind(&self.device, self.ibl.views());
    }

    /// Runs the prefilter passes for `data` without binding the result
    pub fn prefilter_environment(&mut self, data: &IblData) -> Result<IblTextures> {
        self.prefilter
            .run(&mut self.gpu, &mut self.pipeline_manager, &self.queue, data)
    }

    /// Prefilters `data` and binds it in place of the current environment
    pub fn load_environment(&mut self, data: &IblData) -> Result<()> {
        let textures = self.prefilter_environment(data)?;
        self.set_ibl(textures);
        Ok(())
    }

    pub fn ibl_loaded(&self) -> bool {
        self.ibl.loaded
    }

    /// Draws one frame
    ///
    /// World transforms of `scene` must be current. A lost or outdated
    /// surface is reconfigured and the frame is dropped.
    pub fn render_frame(
        &mut self,
        mut scene: Option<&mut Scene>,
        camera: &CameraSnapshot,
        settings: &RenderSettings,
        ibl_enabled: bool,
    ) -> Result<FrameStats> {
        self.gpu.begin_frame();
        let ibl_active = ibl_enabled && self.ibl.loaded;
        let scene_lights = scene.as_deref().map(Scene::light_uniforms).unwrap_or_default();
        self.global_bindings.update(
            &self.queue,
            frame_uniform(camera, settings, &scene_lights, self.ibl.specular_mip_count, ibl_active),
        );

        if let Some(scene) = scene.as_deref_mut() {
            scene.update_gpu(&mut self.gpu, &self.queue);
        }
        let scene = scene.as_deref();

        let list = scene
            .map(|s| DrawList::build(s, camera, ibl_active))
            .unwrap_or_default();
        for item in list.iter() {
            self.pipeline_manager.prepare_variant(&mut self.gpu, item.key);
        }
        let background = if ibl_active && settings.render_environment {
            self.pipeline_manager.prepare_pipeline(&mut self.gpu, BACKGROUND_SHADER)
        } else {
            None
        };
        self.gpu.flush(&self.queue);

        let Some((view, frame)) = self.acquire()? else {
            return Ok(FrameStats::default());
        };

        let mut stats = FrameStats {
            culled: list.culled,
            ..FrameStats::default()
        };

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(settings.wgpu_clear_color()),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_bind_group(0, self.global_bindings.bind_group(), &[]);

            if let Some(pipeline) = background.and_then(|h| self.gpu.program(h)) {
                render_pass.set_pipeline(pipeline);
                render_pass.draw(0..3, 0..1);
                stats.background = true;
            }

            if let Some(scene) = scene {
                for item in list.iter() {
                    if self.draw_item(&mut render_pass, scene, item) {
                        stats.draws += 1;
                    } else {
                        stats.skipped += 1;
                    }
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        if let Some(frame) = frame {
            frame.present();
        }

        log::trace!("Frame {}: {:?}", self.gpu.frame(), stats);
        Ok(stats)
    }

    fn draw_item(&self, render_pass: &mut wgpu::RenderPass<'_>, scene: &Scene, item: &DrawItem) -> bool {
        let Some(pipeline) = self
            .pipeline_manager
            .variant(item.key)
            .and_then(|h| self.gpu.program(h))
        else {
            return false;
        };
        let Some(draw_group) = scene.instance(item.node).and_then(|i| i.bind_group(item.primitive)) else {
            return false;
        };
        let Some(primitive) = scene
            .meshes
            .get(item.mesh)
            .and_then(|m| m.primitives.get(item.primitive))
        else {
            return false;
        };
        let Some(material) = scene.material(primitive.material).gpu() else {
            return false;
        };

        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(1, draw_group, &[]);
        render_pass.set_bind_group(2, material.bind_group(), &[]);
        render_pass.draw_primitive(&self.gpu, primitive)
    }

    /// View to draw into, plus the surface frame to present afterwards
    fn acquire(&mut self) -> Result<Option<(wgpu::TextureView, Option<wgpu::SurfaceTexture>)>> {
        match &self.target {
            RenderTarget::Offscreen(texture) => {
                let view = texture.texture.create_view(&wgpu::TextureViewDescriptor::default());
                Ok(Some((view, None)))
            }
            RenderTarget::Surface { surface, config } => match surface.get_current_texture() {
                Ok(frame) => {
                    let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
                    Ok(Some((view, Some(frame))))
                }
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    surface.configure(&self.device, config);
                    Ok(None)
                }
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    Err(ViewerError::GpuUploadFailed("out of memory acquiring surface".into()))
                }
                Err(e) => {
                    log::warn!("Dropping frame: {}", e);
                    Ok(None)
                }
            },
        }
    }

    /// Copies the offscreen target back as tightly packed RGBA8 rows
    pub fn read_pixels(&self) -> Result<ImageData> {
        let RenderTarget::Offscreen(target) = &self.target else {
            return Err(ViewerError::InvalidArgument(
                "pixels can only be read from an offscreen target".into(),
            ));
        };

        let (width, height) = (target.texture.width(), target.texture.height());
        let unpadded = width * 4;
        let padded = unpadded.next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size: (padded * height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (sender, receiver) = futures::channel::oneshot::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device
            .poll(wgpu::PollType::Wait)
            .map_err(|e| ViewerError::GpuUploadFailed(format!("readback poll failed: {}", e)))?;
        futures::executor::block_on(receiver)
            .map_err(|e| ViewerError::GpuUploadFailed(format!("readback never completed: {}", e)))?
            .map_err(|e| ViewerError::GpuUploadFailed(format!("readback map failed: {}", e)))?;

        let mut pixels = Vec::with_capacity((unpadded * height) as usize);
        {
            let data = slice.get_mapped_range();
            for row in data.chunks(padded as usize) {
                pixels.extend_from_slice(&row[..unpadded as usize]);
            }
        }
        buffer.unmap();

        Ok(ImageData {
            width,
            height,
            pixels,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn target(&self) -> &RenderTarget {
        &self.target
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn gpu_stats(&self) -> GpuResourceStats {
        self.gpu.stats()
    }

    /// Releases every pipeline and swaps the environment for the placeholder
    pub fn destroy(&mut self) {
        self.pipeline_manager.release_all(&mut self.gpu);
        if self.ibl.loaded {
            self.set_ibl(IblTextures::placeholder(&self.device, &self.queue));
        }
    }
}

fn create_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    })
}

async fn request_adapter(instance: &wgpu::Instance, surface: Option<&wgpu::Surface<'_>>) -> Result<wgpu::Adapter> {
    instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: surface,
            force_fallback_adapter: false,
        })
        .await
        .map_err(|e| ViewerError::GpuUploadFailed(format!("no suitable GPU adapter: {}", e)))
}

async fn request_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue)> {
    adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("Thistle Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::Off,
        })
        .await
        .map_err(|e| ViewerError::GpuUploadFailed(format!("cannot create device: {}", e)))
}

/// Prefers an sRGB surface format so shader output is gamma encoded on write
fn surface_config(
    surface: &wgpu::Surface<'_>,
    adapter: &wgpu::Adapter,
    width: u32,
    height: u32,
) -> Result<wgpu::SurfaceConfiguration> {
    let capabilities = surface.get_capabilities(adapter);
    let format = capabilities
        .formats
        .iter()
        .copied()
        .find(|f| f.is_srgb())
        .or_else(|| capabilities.formats.first().copied())
        .ok_or_else(|| ViewerError::GpuUploadFailed("surface is not supported by the adapter".into()))?;
    let alpha_mode = capabilities
        .alpha_modes
        .first()
        .copied()
        .unwrap_or(wgpu::CompositeAlphaMode::Auto);

    Ok(wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width,
        height,
        present_mode: wgpu::PresentMode::AutoVsync,
        alpha_mode,
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::{camera::OrbitCamera, rendering::settings::ToneMap};
    use cgmath::Vector3;

    fn snapshot() -> CameraSnapshot {
        let mut camera = OrbitCamera::default();
        camera.look_at(Vector3::new(0.0, 1.0, 4.0), Vector3::new(0.0, 0.0, 0.0));
        CameraSnapshot::from_camera(&camera)
    }

    #[test]
    fn test_light_falls_back_only_without_ibl() {
        let settings = RenderSettings::default();
        let lit = frame_uniform(&snapshot(), &settings, &[], 5, false);
        assert_eq!(lit.light_count, 2);
        assert_eq!(lit.lights[..2], LightUniform::default_rig());
        assert_eq!(lit.ibl_enabled, 0);

        let ibl = frame_uniform(&snapshot(), &settings, &[], 5, true);
        assert_eq!(ibl.light_count, 0);
        assert_eq!(ibl.ibl_enabled, 1);
        assert_eq!(ibl.specular_mip_count, 5.0);

        let dark = RenderSettings {
            directional_light_fallback: false,
            ..settings
        };
        assert_eq!(frame_uniform(&snapshot(), &dark, &[], 1, false).light_count, 0);
    }

    #[test]
    fn test_scene_lights_replace_the_rig() {
        let settings = RenderSettings::default();
        let sun = LightUniform::directional(Vector3::new(0.0, -1.0, 0.0), [1.0, 0.5, 0.25], 4.0);

        let uniform = frame_uniform(&snapshot(), &settings, &[sun], 1, false);
        assert_eq!(uniform.light_count, 1);
        assert_eq!(uniform.lights[0], sun);
        assert_eq!(uniform.lights[1], LightUniform::default());

        let with_ibl = frame_uniform(&snapshot(), &settings, &[sun, sun], 1, true);
        assert_eq!(with_ibl.light_count, 2);
    }

    #[test]
    fn test_frame_uniform_carries_camera_and_settings() {
        let settings = RenderSettings::default()
            .with_exposure(2.0)
            .with_tone_map(ToneMap::AcesNarkowicz);
        let camera = snapshot();
        let uniform = frame_uniform(&camera, &settings, &[], 0, false);

        let expected = [0.0, 1.0, 4.0, 1.0];
        for (actual, expected) in uniform.camera_position.iter().zip(expected) {
            assert!((actual - expected).abs() < 1e-5, "{:?}", uniform.camera_position);
        }
        assert_eq!(uniform.exposure, 2.0);
        assert_eq!(uniform.tone_map, 1);
        assert_eq!(uniform.specular_mip_count, 1.0);
        let view_proj: [[f32; 4]; 4] = camera.view_proj.into();
        assert_eq!(uniform.view_proj, view_proj);
    }

    #[test]
    fn test_shaders_declare_entry_points() {
        for source in [PBR_WGSL, BACKGROUND_WGSL] {
            assert!(source.contains("fn vs_main"));
            assert!(source.contains("fn fs_main"));
        }
        assert!(COMMON_WGSL.contains("struct FrameUniform"));
    }
}
