//! Engine facade
//!
//! [`Engine`] owns the renderer, the loaded scene and its animations, and is
//! driven from a single render thread. Other threads talk to it through an
//! [`EngineHandle`], whose commands are queued and executed at the start of
//! the next frame in submission order. The camera is shared separately
//! through a [`SharedCamera`].

use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use serde::Deserialize;

use crate::{
    asset::{self, image::ImageData, FileResolver, ResourceResolver},
    error::{ErrorKind, Result, ViewerError},
    gfx::{
        camera::SharedCamera,
        rendering::{FrameStats, RenderEngine, RenderSettings},
        scene::Scene,
    },
    ibl::{IblConfig, IblData},
};

/// Source of wall-clock time in seconds for animations
pub trait Clock: Send {
    fn now(&self) -> f64;
}

/// Monotonic time since creation
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self { start: Instant::now() }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Clock that only moves when told to; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(seconds: f64) -> Self {
        let clock = Self::default();
        clock.set(seconds);
        clock
    }

    pub fn set(&self, seconds: f64) {
        self.bits.store(seconds.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: f64) {
        self.set(self.now() + seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub ibl: IblConfig,
    pub render: RenderSettings,
    /// Frame the camera on every newly loaded model
    pub fit_view_on_load: bool,
    /// Commands an [`EngineHandle`] can queue between two frames
    pub command_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ibl: IblConfig::default(),
            render: RenderSettings::default(),
            fit_view_on_load: true,
            command_queue_capacity: 256,
        }
    }
}

impl EngineConfig {
    /// Parses a JSON document; absent fields keep their defaults
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| ViewerError::InvalidArgument(format!("engine config: {}", e)))
    }

    pub fn with_ibl(mut self, ibl: IblConfig) -> Self {
        self.ibl = ibl;
        self
    }

    pub fn with_render(mut self, render: RenderSettings) -> Self {
        self.render = render;
        self
    }

    pub fn with_fit_view_on_load(mut self, enabled: bool) -> Self {
        self.fit_view_on_load = enabled;
        self
    }

    pub fn with_command_queue_capacity(mut self, capacity: usize) -> Self {
        self.command_queue_capacity = capacity.max(1);
        self
    }
}

/// Work queued from other threads
enum Command {
    LoadModel {
        bytes: Vec<u8>,
        resolver: Box<dyn ResourceResolver + Send>,
    },
    LoadModelFromPath(PathBuf),
    LoadEnvironment(Vec<u8>),
    SetIblEnabled(bool),
    PlayAnimation { name: String, loop_count: i32 },
    StopAnimation(String),
    PauseAnimation(String),
    ResumeAnimation(String),
    SetAnimationSpeed { name: String, speed: f32 },
}

/// Cloneable sender for commands executed at the start of the next frame
///
/// Failures while executing a queued command are reported through
/// [`Engine::last_error`].
#[derive(Clone)]
pub struct EngineHandle {
    sender: Sender<Command>,
}

impl EngineHandle {
    fn submit(&self, command: Command) -> Result<()> {
        self.sender.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => ViewerError::InvalidArgument("command queue is full".to_string()),
            TrySendError::Disconnected(_) => ViewerError::NotInitialized,
        })
    }

    pub fn load_model_from_bytes(&self, bytes: Vec<u8>, resolver: impl ResourceResolver + Send + 'static) -> Result<()> {
        self.submit(Command::LoadModel {
            bytes,
            resolver: Box::new(resolver),
        })
    }

    pub fn load_model_from_path(&self, path: impl Into<PathBuf>) -> Result<()> {
        self.submit(Command::LoadModelFromPath(path.into()))
    }

    pub fn load_environment_ibl(&self, hdr_bytes: Vec<u8>) -> Result<()> {
        self.submit(Command::LoadEnvironment(hdr_bytes))
    }

    pub fn set_ibl_enabled(&self, enabled: bool) -> Result<()> {
        self.submit(Command::SetIblEnabled(enabled))
    }

    pub fn play_animation(&self, name: &str, loop_count: i32) -> Result<()> {
        self.submit(Command::PlayAnimation {
            name: name.to_string(),
            loop_count,
        })
    }

    pub fn stop_animation(&self, name: &str) -> Result<()> {
        self.submit(Command::StopAnimation(name.to_string()))
    }

    pub fn pause_animation(&self, name: &str) -> Result<()> {
        self.submit(Command::PauseAnimation(name.to_string()))
    }

    pub fn resume_animation(&self, name: &str) -> Result<()> {
        self.submit(Command::ResumeAnimation(name.to_string()))
    }

    pub fn set_animation_speed(&self, name: &str, speed: f32) -> Result<()> {
        self.submit(Command::SetAnimationSpeed {
            name: name.to_string(),
            speed,
        })
    }
}

/// The viewer core
///
/// Created headless with [`Engine::new`], which renders into an offscreen
/// target until a window surface is bound, or without any GPU through
/// [`Engine::detached`] for loading and animating models only. After
/// [`Engine::destroy`] every operation fails with `NotInitialized`.
pub struct Engine {
    config: EngineConfig,
    renderer: Option<RenderEngine>,
    scene: Option<Scene>,
    camera: SharedCamera,
    clock: Box<dyn Clock>,
    ibl_enabled: bool,
    /// Prefiltered environment waiting for a renderer
    pending_ibl: Option<IblData>,
    sender: Option<Sender<Command>>,
    commands: Option<Receiver<Command>>,
    last_error: Option<ViewerError>,
    destroyed: bool,
}

impl Engine {
    /// Creates an engine with a headless GPU renderer
    pub fn new(config: EngineConfig) -> Result<Self> {
        let renderer = pollster::block_on(RenderEngine::new_headless(1, 1))?;
        let mut engine = Self::detached(config);
        engine.renderer = Some(renderer);
        Ok(engine)
    }

    /// Creates an engine without a renderer
    ///
    /// Models load and animate but frames draw nothing until a surface is
    /// bound with [`Engine::bind_surface`].
    pub fn detached(config: EngineConfig) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(config.command_queue_capacity.max(1));
        Self {
            config,
            renderer: None,
            scene: None,
            camera: SharedCamera::default(),
            clock: Box::new(SystemClock::default()),
            ibl_enabled: true,
            pending_ibl: None,
            sender: Some(sender),
            commands: Some(receiver),
            last_error: None,
            destroyed: false,
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Releases every GPU resource and shuts the command queue
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        if let Some(mut scene) = self.scene.take() {
            if let Some(renderer) = self.renderer.as_mut() {
                renderer.release_scene(&mut scene);
            }
        }
        if let Some(mut renderer) = self.renderer.take() {
            renderer.destroy();
        }
        self.sender = None;
        self.commands = None;
        self.pending_ibl = None;
        self.destroyed = true;
        log::info!("Engine destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.destroyed {
            Err(ViewerError::NotInitialized)
        } else {
            Ok(())
        }
    }

    fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            log::warn!("{}", e);
            self.last_error = Some(e.clone());
        }
        result
    }

    /// Kind and message of the most recent failure
    pub fn last_error(&self) -> Option<(ErrorKind, String)> {
        self.last_error.as_ref().map(|e| (e.kind(), e.to_string()))
    }

    pub fn handle(&self) -> Result<EngineHandle> {
        self.sender
            .clone()
            .map(|sender| EngineHandle { sender })
            .ok_or(ViewerError::NotInitialized)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn render_settings_mut(&mut self) -> &mut RenderSettings {
        &mut self.config.render
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn renderer(&self) -> Option<&RenderEngine> {
        self.renderer.as_ref()
    }

    // Loading

    /// Parses and uploads a model, replacing the current one on success
    ///
    /// On failure the previous model stays loaded and the error is kept
    /// for [`Engine::last_error`].
    pub fn load_model_from_bytes(&mut self, bytes: &[u8], resolver: &dyn ResourceResolver) -> bool {
        let result = self.try_load_model(bytes, resolver);
        self.record(result).is_ok()
    }

    /// Loads a file, resolving external resources next to it
    pub fn load_model_from_path(&mut self, path: impl AsRef<Path>) -> bool {
        let result = self.try_load_model_from_path(path.as_ref());
        self.record(result).is_ok()
    }

    fn try_load_model_from_path(&mut self, path: &Path) -> Result<()> {
        self.ensure_alive()?;
        let bytes = std::fs::read(path)
            .map_err(|e| ViewerError::MissingResource(format!("{}: {}", path.display(), e)))?;
        self.try_load_model(&bytes, &FileResolver::for_file(path))
    }

    fn try_load_model(&mut self, bytes: &[u8], resolver: &dyn ResourceResolver) -> Result<()> {
        self.ensure_alive()?;
        let scene = asset::load_scene(bytes, resolver)?;
        self.install_scene(scene)
    }

    fn install_scene(&mut self, mut scene: Scene) -> Result<()> {
        scene.graph.update_world_transforms();
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.upload_scene(&mut scene)?;
        }

        if let Some(mut previous) = self.scene.take() {
            previous.animator.stop_all(&mut previous.graph);
            if let Some(renderer) = self.renderer.as_mut() {
                renderer.release_scene(&mut previous);
            }
        }

        if self.config.fit_view_on_load {
            let bounds = scene.world_bounds();
            if !bounds.is_empty() {
                self.camera.update(|c| c.fit_view_to_scene(&bounds));
            }
        }

        let stats = scene.stats();
        log::info!(
            "Model ready: {} primitives, {} vertices, {} animations",
            stats.primitives,
            stats.vertices,
            stats.animations
        );
        self.scene = Some(scene);
        Ok(())
    }

    /// Decodes and prefilters an equirectangular HDR environment
    pub fn load_environment_ibl(&mut self, hdr_bytes: &[u8]) -> bool {
        let result = self.try_load_environment(hdr_bytes);
        self.record(result).is_ok()
    }

    fn try_load_environment(&mut self, hdr_bytes: &[u8]) -> Result<()> {
        self.ensure_alive()?;
        let data = IblData::from_hdr_bytes(hdr_bytes, &self.config.ibl)?;
        match self.renderer.as_mut() {
            Some(renderer) => {
                renderer.load_environment(&data)?;
                log::info!("Environment loaded ({} specular mips)", data.specular_mip_count());
            }
            None => self.pending_ibl = Some(data),
        }
        Ok(())
    }

    pub fn set_ibl_enabled(&mut self, enabled: bool) -> Result<()> {
        self.ensure_alive()?;
        self.ibl_enabled = enabled;
        Ok(())
    }

    /// True once an environment has been loaded, whether or not it is enabled
    pub fn has_environment(&self) -> bool {
        self.pending_ibl.is_some() || self.renderer.as_ref().is_some_and(|r| r.ibl_loaded())
    }

    // Output

    /// Renders to a window from now on
    ///
    /// A detached engine creates its renderer here and uploads whatever was
    /// loaded before.
    pub fn bind_surface(
        &mut self,
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
    ) -> Result<()> {
        let result = self.try_bind_surface(window, width, height);
        self.record(result)
    }

    fn try_bind_surface(
        &mut self,
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
    ) -> Result<()> {
        self.ensure_alive()?;
        if let Some(renderer) = self.renderer.as_mut() {
            return renderer.attach_surface(window, width, height);
        }

        let mut renderer = pollster::block_on(RenderEngine::new(window, width, height))?;
        if let Some(scene) = self.scene.as_mut() {
            renderer.upload_scene(scene)?;
        }
        if let Some(data) = self.pending_ibl.take() {
            renderer.load_environment(&data)?;
        }
        self.renderer = Some(renderer);
        Ok(())
    }

    /// Replaces the camera the renderer reads from
    pub fn bind_camera(&mut self, camera: SharedCamera) -> Result<()> {
        self.ensure_alive()?;
        self.camera = camera;
        Ok(())
    }

    pub fn camera(&self) -> SharedCamera {
        self.camera.clone()
    }

    /// Frames the current model keeping the camera's orientation
    pub fn fit_view(&mut self) -> Result<()> {
        self.ensure_alive()?;
        if let Some(scene) = &self.scene {
            let bounds = scene.world_bounds();
            self.camera.update(|c| c.fit_view_to_scene(&bounds));
        }
        Ok(())
    }

    /// Returns the camera to the front view of the current model
    pub fn reset_view(&mut self) -> Result<()> {
        self.ensure_alive()?;
        if let Some(scene) = &self.scene {
            let bounds = scene.world_bounds();
            self.camera.update(|c| c.reset_view(&bounds));
        }
        Ok(())
    }

    // Frame

    /// Runs queued commands, advances animations and updates transforms
    pub fn update(&mut self) -> Result<()> {
        self.ensure_alive()?;
        self.drain_commands();

        let now = self.clock.now();
        if let Some(scene) = self.scene.as_mut() {
            scene.animator.advance(&mut scene.graph, now);
            scene.graph.update_world_transforms();
        }
        Ok(())
    }

    /// Updates the scene and draws one frame of `width` x `height` pixels
    ///
    /// A detached engine updates but draws nothing.
    pub fn render_frame(&mut self, width: u32, height: u32) -> Result<FrameStats> {
        let result = self.try_render_frame(width, height);
        self.record(result)
    }

    fn try_render_frame(&mut self, width: u32, height: u32) -> Result<FrameStats> {
        if width == 0 || height == 0 {
            return Err(ViewerError::InvalidArgument(format!("frame size {}x{}", width, height)));
        }
        self.update()?;

        self.camera.update(|c| c.resize_projection(width, height));
        let camera = self.camera.snapshot();

        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(FrameStats::default());
        };
        renderer.resize(width, height);
        renderer.render_frame(self.scene.as_mut(), &camera, &self.config.render, self.ibl_enabled)
    }

    /// Reads back the last offscreen frame
    pub fn read_pixels(&mut self) -> Result<ImageData> {
        let result = self.ensure_alive().and_then(|_| match self.renderer.as_ref() {
            Some(renderer) => renderer.read_pixels(),
            None => Err(ViewerError::InvalidArgument("engine has no renderer".to_string())),
        });
        self.record(result)
    }

    fn drain_commands(&mut self) {
        let Some(commands) = self.commands.clone() else {
            return;
        };
        while let Ok(command) = commands.try_recv() {
            let result = self.execute(command);
            let _ = self.record(result);
        }
    }

    fn execute(&mut self, command: Command) -> Result<()> {
        match command {
            Command::LoadModel { bytes, resolver } => self.try_load_model(&bytes, resolver.as_ref()),
            Command::LoadModelFromPath(path) => self.try_load_model_from_path(&path),
            Command::LoadEnvironment(bytes) => self.try_load_environment(&bytes),
            Command::SetIblEnabled(enabled) => self.set_ibl_enabled(enabled),
            Command::PlayAnimation { name, loop_count } => self.play_animation(&name, loop_count).map(|_| ()),
            Command::StopAnimation(name) => self.stop_animation(&name).map(|_| ()),
            Command::PauseAnimation(name) => self.pause_animation(&name).map(|_| ()),
            Command::ResumeAnimation(name) => self.resume_animation(&name).map(|_| ()),
            Command::SetAnimationSpeed { name, speed } => self.set_animation_speed(&name, speed).map(|_| ()),
        }
    }

    // Animation

    fn scene_mut(&mut self) -> Result<&mut Scene> {
        self.ensure_alive()?;
        self.scene
            .as_mut()
            .ok_or_else(|| ViewerError::InvalidArgument("no model loaded".to_string()))
    }

    /// Animation names in declaration order; empty without a model
    pub fn get_animation_names(&self) -> Result<Vec<String>> {
        self.ensure_alive()?;
        Ok(self.scene.as_ref().map(Scene::animation_names).unwrap_or_default())
    }

    /// Names of playing or paused animations in registration order
    pub fn active_animations(&self) -> Result<Vec<String>> {
        self.ensure_alive()?;
        Ok(self
            .scene
            .as_ref()
            .map(|s| s.animator.active_animations())
            .unwrap_or_default())
    }

    /// Starts `name` now; `-1` loops forever and `0` does nothing
    pub fn play_animation(&mut self, name: &str, loop_count: i32) -> Result<bool> {
        let now = self.clock.now();
        let scene = self.scene_mut()?;
        scene.animator.play(&scene.graph, name, loop_count, now)
    }

    /// Stops `name` and restores what it animated
    pub fn stop_animation(&mut self, name: &str) -> Result<bool> {
        let scene = self.scene_mut()?;
        let stopped = scene.animator.stop(&mut scene.graph, name)?;
        scene.graph.update_world_transforms();
        Ok(stopped)
    }

    pub fn pause_animation(&mut self, name: &str) -> Result<bool> {
        self.scene_mut()?.animator.pause(name)
    }

    pub fn resume_animation(&mut self, name: &str) -> Result<bool> {
        self.scene_mut()?.animator.resume(name)
    }

    pub fn set_animation_speed(&mut self, name: &str, speed: f32) -> Result<bool> {
        self.scene_mut()?.animator.set_speed(name, speed)
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.destroy();
    }
}
