//! Interactive viewer
//!
//! ```text
//! cargo run --example viewer -- model.glb [environment.hdr]
//! ```
//!
//! Drag to orbit, Shift + drag to pan, scroll to zoom, Shift + C to reset the
//! view. `I` toggles image-based lighting, `Space` plays or stops the first
//! animation and `Escape` quits.

use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context};
use thistle::{gfx::camera::CameraController, Engine, EngineConfig};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes, WindowId},
};

struct ViewerState {
    model: PathBuf,
    environment: Option<Vec<u8>>,
    window: Option<Arc<Window>>,
    engine: Engine,
    controller: CameraController,
    ibl_enabled: bool,
}

impl ViewerState {
    fn start(&mut self, window: Arc<Window>) -> anyhow::Result<()> {
        let PhysicalSize { width, height } = window.inner_size();
        self.engine
            .bind_surface(window.clone(), width, height)
            .context("binding window surface")?;

        if !self.engine.load_model_from_path(&self.model) {
            let (kind, message) = self.engine.last_error().unwrap_or((thistle::ErrorKind::InvalidArgument, String::new()));
            bail!("cannot load {}: {:?} {}", self.model.display(), kind, message);
        }
        if let Some(scene) = self.engine.scene() {
            self.controller.set_scene_bounds(scene.world_bounds());
        }

        if let Some(hdr) = self.environment.take() {
            if !self.engine.load_environment_ibl(&hdr) {
                log::warn!("Environment failed to load, using the default light rig");
            }
        }

        self.window = Some(window);
        Ok(())
    }

    fn toggle_first_animation(&mut self) {
        let Ok(names) = self.engine.get_animation_names() else {
            return;
        };
        let Some(name) = names.first() else {
            log::info!("Model has no animations");
            return;
        };
        let playing = self
            .engine
            .active_animations()
            .is_ok_and(|active| active.contains(name));
        let result = if playing {
            self.engine.stop_animation(name)
        } else {
            self.engine.play_animation(name, thistle::animation::LOOP_FOREVER)
        };
        if let Err(e) = result {
            log::warn!("{}", e);
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        let camera = self.engine.camera();
        if self.controller.process_keyed_events(event, &camera) {
            return;
        }
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        match event.physical_key {
            PhysicalKey::Code(KeyCode::Escape) => event_loop.exit(),
            PhysicalKey::Code(KeyCode::KeyI) => {
                self.ibl_enabled = !self.ibl_enabled;
                log::info!("IBL {}", if self.ibl_enabled { "on" } else { "off" });
                let _ = self.engine.set_ibl_enabled(self.ibl_enabled);
            }
            PhysicalKey::Code(KeyCode::Space) => self.toggle_first_animation(),
            _ => (),
        }
    }
}

impl ApplicationHandler for ViewerState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = WindowAttributes::default()
            .with_title("Thistle")
            .with_inner_size(winit::dpi::LogicalSize::new(1200, 800));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Cannot create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        if let Err(e) = self.start(window) {
            log::error!("{:#}", e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(event_loop, &event),
            WindowEvent::RedrawRequested => {
                let Some(window) = self.window.as_ref() else {
                    return;
                };
                let PhysicalSize { width, height } = window.inner_size();
                if width == 0 || height == 0 {
                    return;
                }
                if let Err(e) = self.engine.render_frame(width, height) {
                    log::error!("Frame failed: {}", e);
                }
            }
            _ => (),
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if self.window.is_none() {
            return;
        }
        let camera = self.engine.camera();
        self.controller.process_events(&event, &camera);
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}

fn main() -> anyhow::Result<()> {
    thistle::init_logging();

    let mut args = std::env::args_os().skip(1);
    let Some(model) = args.next().map(PathBuf::from) else {
        bail!("usage: viewer <model.gltf|model.glb> [environment.hdr]");
    };
    let environment = args
        .next()
        .map(|path| std::fs::read(&path).with_context(|| format!("reading {:?}", path)))
        .transpose()?;

    let event_loop = EventLoop::new().context("creating event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut state = ViewerState {
        model,
        environment,
        window: None,
        engine: Engine::detached(EngineConfig::default()),
        controller: CameraController::new(0.005, 0.1),
        ibl_enabled: true,
    };
    event_loop.run_app(&mut state).context("running event loop")?;
    Ok(())
}
