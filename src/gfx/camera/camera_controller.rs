use winit::{
    dpi::PhysicalPosition,
    event::{DeviceEvent, ElementState, KeyEvent, MouseScrollDelta},
    keyboard::{KeyCode, PhysicalKey},
};

use super::camera_utils::SharedCamera;
use crate::math::Aabb;

/// Turns raw winit input into orbit, pan and zoom calls on a shared camera
///
/// Drag orbits, Shift + drag pans, the wheel zooms and Shift + C resets the
/// view to the last bounds handed over with [`CameraController::set_scene_bounds`].
/// Every `process_*` method returns true when the camera changed.
pub struct CameraController {
    /// Radians per pixel of drag
    pub rotate_speed: f32,
    /// `zoom_by` units per wheel line
    pub zoom_speed: f32,
    is_shift_held: bool,
    is_mouse_pressed: bool,
    scene_bounds: Option<Aabb>,
}

impl CameraController {
    pub fn new(rotate_speed: f32, zoom_speed: f32) -> Self {
        Self {
            rotate_speed,
            zoom_speed,
            is_shift_held: false,
            is_mouse_pressed: false,
            scene_bounds: None,
        }
    }

    pub fn set_scene_bounds(&mut self, bounds: Aabb) {
        self.scene_bounds = Some(bounds);
    }

    pub fn set_shift_held(&mut self, held: bool) {
        self.is_shift_held = held;
    }

    pub fn process_events(&mut self, event: &DeviceEvent, camera: &SharedCamera) -> bool {
        match event {
            DeviceEvent::Button {
                button: 0, // Left Mouse Button
                state,
            } => {
                self.is_mouse_pressed = *state == ElementState::Pressed;
                false
            }
            DeviceEvent::MouseWheel { delta } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, scroll) => *scroll,
                    MouseScrollDelta::PixelDelta(PhysicalPosition { y: scroll, .. }) => {
                        *scroll as f32 / 40.0
                    }
                };
                let amount = scroll * self.zoom_speed;
                camera.update(|c| c.zoom_by(amount));
                true
            }
            DeviceEvent::MouseMotion { delta } => {
                if !self.is_mouse_pressed {
                    return false;
                }
                let (dx, dy) = (delta.0 as f32, delta.1 as f32);
                if self.is_shift_held {
                    camera.update(|c| c.pan(-dx, dy));
                } else {
                    let speed = self.rotate_speed;
                    camera.update(|c| c.orbit(-dx * speed, dy * speed));
                }
                true
            }
            _ => false,
        }
    }

    pub fn process_keyed_events(&mut self, event: &KeyEvent, camera: &SharedCamera) -> bool {
        match event {
            KeyEvent {
                physical_key: PhysicalKey::Code(KeyCode::ShiftLeft | KeyCode::ShiftRight),
                state,
                ..
            } => {
                self.is_shift_held = *state == ElementState::Pressed;
                false
            }
            KeyEvent {
                physical_key: PhysicalKey::Code(KeyCode::KeyC),
                state: ElementState::Pressed,
                ..
            } => match (self.is_shift_held, self.scene_bounds) {
                (true, Some(bounds)) => {
                    log::debug!("Resetting camera view");
                    camera.update(|c| c.reset_view(&bounds));
                    true
                }
                _ => false,
            },
            _ => false,
        }
    }

    /// Returns true if currently panning
    pub fn is_panning(&self) -> bool {
        self.is_mouse_pressed && self.is_shift_held
    }

    /// Returns true if currently rotating
    pub fn is_rotating(&self) -> bool {
        self.is_mouse_pressed && !self.is_shift_held
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(controller: &mut CameraController, camera: &SharedCamera) {
        controller.process_events(
            &DeviceEvent::Button {
                button: 0,
                state: ElementState::Pressed,
            },
            camera,
        );
    }

    #[test]
    fn test_motion_without_press_is_ignored() {
        let camera = SharedCamera::default();
        let mut controller = CameraController::new(0.01, 0.1);
        let before = camera.get();
        assert!(!controller.process_events(&DeviceEvent::MouseMotion { delta: (10.0, 5.0) }, &camera));
        assert_eq!(camera.get(), before);
    }

    #[test]
    fn test_drag_orbits_and_shift_drag_pans() {
        let camera = SharedCamera::default();
        let mut controller = CameraController::new(0.01, 0.1);
        press(&mut controller, &camera);
        assert!(controller.is_rotating());

        controller.process_events(&DeviceEvent::MouseMotion { delta: (-50.0, 0.0) }, &camera);
        assert!((camera.get().yaw() - 0.5).abs() < 1e-6);

        controller.set_shift_held(true);
        assert!(controller.is_panning());
        let target = camera.get().target();
        controller.process_events(&DeviceEvent::MouseMotion { delta: (100.0, 0.0) }, &camera);
        assert!(camera.get().target() != target);
    }

    #[test]
    fn test_wheel_zooms() {
        let camera = SharedCamera::default();
        let mut controller = CameraController::new(0.01, 0.5);
        let wheel = DeviceEvent::MouseWheel {
            delta: MouseScrollDelta::LineDelta(0.0, 1.0),
        };
        assert!(controller.process_events(&wheel, &camera));
        assert!(camera.get().distance() < 3.0);
    }
}
