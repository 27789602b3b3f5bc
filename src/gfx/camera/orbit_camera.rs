use cgmath::*;

use super::camera_utils::Camera;
use crate::math::{Aabb, Frustum};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Longest scene axis divided by this gives the pan speed
pub const PAN_SPEED_DENOMINATOR: f32 = 3500.0;
/// Upper bound on `far / near` after any fit
pub const MAX_DEPTH_RATIO: f32 = 10000.0;
/// Distance between the pitch limit and the poles
pub const PITCH_EPSILON: f32 = 0.01;
/// Extra room around the bounding sphere when picking clip planes
pub const PLANE_MARGIN: f32 = 1.2;

/// Range the orbit distance is held to; zoom past either end is remembered
/// but the eye stops moving
pub const MIN_DISTANCE: f32 = 1e-6;
pub const MAX_DISTANCE: f32 = 1e7;
const MIN_RADIUS: f32 = 1e-3;
const MIN_FOV: f32 = 1e-4;

/// Camera orbiting a target point with world Y up
///
/// The eye is always derived from `target`, `yaw`, `pitch` and `distance`.
/// Yaw 0 and pitch 0 put the eye on the +Z side of the target looking down -Z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    distance: f32,
    /// Unclamped natural log of the requested distance; zoom adds to it
    log_distance: f64,
    pitch: f32,
    yaw: f32,
    eye: Vector3<f32>,
    target: Vector3<f32>,
    up: Vector3<f32>,
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
    pan_speed: f32,
    /// Distance chosen by the last distance fit; pan scales relative to it
    base_distance: f32,
}

impl Camera for OrbitCamera {
    fn build_view_projection_matrix(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(3.0, 0.0, 0.0, Vector3::zero(), 1.0)
    }
}

impl OrbitCamera {
    pub fn new(distance: f32, pitch: f32, yaw: f32, target: Vector3<f32>, aspect: f32) -> Self {
        let mut camera = Self {
            distance: MIN_DISTANCE,
            log_distance: (MIN_DISTANCE as f64).ln(),
            pitch: clamp_pitch(pitch),
            yaw,
            eye: Vector3::zero(), // Derived in `update()`
            target,
            up: Vector3::unit_y(),
            aspect: if aspect > 0.0 { aspect } else { 1.0 },
            fovy: Rad(std::f32::consts::FRAC_PI_4),
            znear: 0.1,
            zfar: 100.0,
            pan_speed: 1.0 / PAN_SPEED_DENOMINATOR,
            base_distance: MIN_DISTANCE,
        };
        camera.set_distance(distance);
        camera.base_distance = camera.distance;
        camera.update();
        camera
    }

    pub fn eye(&self) -> Vector3<f32> {
        self.eye
    }

    pub fn target(&self) -> Vector3<f32> {
        self.target
    }

    pub fn up(&self) -> Vector3<f32> {
        self.up
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn vertical_fov(&self) -> Rad<f32> {
        self.fovy
    }

    /// Horizontal field of view derived from the vertical one and the aspect
    pub fn horizontal_fov(&self) -> Rad<f32> {
        Rad(2.0 * ((self.fovy.0 * 0.5).tan() * self.aspect).atan())
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn near(&self) -> f32 {
        self.znear
    }

    pub fn far(&self) -> f32 {
        self.zfar
    }

    pub fn pan_speed(&self) -> f32 {
        self.pan_speed
    }

    /// Places the eye at `from` looking at `to`; up stays world Y
    pub fn look_at(&mut self, from: Vector3<f32>, to: Vector3<f32>) {
        let offset = from - to;
        let distance = offset.magnitude();
        self.target = to;
        if distance > MIN_DISTANCE {
            self.set_distance(distance);
            self.pitch = clamp_pitch((offset.y / distance).clamp(-1.0, 1.0).asin());
            self.yaw = offset.x.atan2(offset.z);
        } else {
            self.set_distance(MIN_DISTANCE);
        }
        self.update();
    }

    /// Sets the vertical field of view, clamped to the open interval (0, π)
    pub fn set_vertical_fov(&mut self, radians: f32) {
        if radians.is_nan() {
            return;
        }
        self.fovy = Rad(radians.clamp(MIN_FOV, std::f32::consts::PI - MIN_FOV));
    }

    pub fn set_rotation(&mut self, yaw: f32, pitch: f32) {
        self.yaw = yaw;
        self.pitch = clamp_pitch(pitch);
        self.update();
    }

    /// Keeps the current orientation and places the eye `distance` away from `target`
    pub fn set_distance_from_target(&mut self, distance: f32, target: Vector3<f32>) {
        self.target = target;
        self.set_distance(distance);
        self.update();
    }

    /// Scales the orbit distance by `exp(-v)`: positive values move closer
    ///
    /// The requested distance is tracked in log space, so `zoom_by(v)` then
    /// `zoom_by(-v)` restores the distance even when the first call hit
    /// [`MIN_DISTANCE`] or [`MAX_DISTANCE`]. Non-finite `v` is ignored.
    pub fn zoom_by(&mut self, v: f32) {
        let log_distance = self.log_distance - v as f64;
        if !log_distance.is_finite() {
            log::debug!("Ignoring zoom by {}", v);
            return;
        }
        self.log_distance = log_distance;
        self.distance = clamp_distance(log_distance.exp());
        self.update();
    }

    fn set_distance(&mut self, distance: f32) {
        if !distance.is_finite() {
            return;
        }
        self.distance = clamp_distance(distance as f64);
        self.log_distance = (self.distance as f64).ln();
    }

    pub fn orbit(&mut self, dx: f32, dy: f32) {
        self.set_rotation(self.yaw + dx, self.pitch + dy);
    }

    /// Pans the camera relative to the current view direction
    /// dx = horizontal pan (along camera right)
    /// dy = vertical pan (along camera up)
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let forward = (self.target - self.eye).normalize();
        let right = forward.cross(self.up).normalize();
        let up = right.cross(forward).normalize();

        let scale = self.pan_speed * self.distance / self.base_distance;
        let movement = (right * dx + up * dy) * scale;

        self.eye += movement;
        self.target += movement;
    }

    pub fn fit_pan_speed_to_scene(&mut self, bounds: &Aabb) {
        if bounds.is_empty() {
            return;
        }
        self.pan_speed = bounds.longest_axis() / PAN_SPEED_DENOMINATOR;
    }

    /// Picks the distance at which the bounding sphere fits the narrower field of view
    pub fn fit_distance_to_extents(&mut self, bounds: &Aabb) {
        if bounds.is_empty() {
            return;
        }
        let radius = bounds.radius().max(MIN_RADIUS);
        let fov = self.fovy.0.min(self.horizontal_fov().0);
        self.set_distance(radius / (fov * 0.5).sin());
        self.base_distance = self.distance;
        self.update();
    }

    pub fn fit_camera_target_to_extents(&mut self, bounds: &Aabb) {
        if bounds.is_empty() {
            return;
        }
        self.target = bounds.center();
        self.update();
    }

    pub fn fit_camera_planes_to_extents(&mut self, bounds: &Aabb) {
        if bounds.is_empty() {
            return;
        }
        let radius = bounds.radius().max(MIN_RADIUS) * PLANE_MARGIN;
        let distance = (self.eye - bounds.center()).magnitude();

        let far = (distance + radius).max(MIN_RADIUS);
        let near = (distance - radius).max(far / MAX_DEPTH_RATIO);
        self.znear = near;
        self.zfar = far;
    }

    /// Frames `bounds` without touching yaw or pitch
    pub fn fit_view_to_scene(&mut self, bounds: &Aabb) {
        self.fit_camera_target_to_extents(bounds);
        self.fit_distance_to_extents(bounds);
        self.fit_pan_speed_to_scene(bounds);
        self.fit_camera_planes_to_extents(bounds);
    }

    /// Returns to the front-facing pose and frames `bounds`
    pub fn reset_view(&mut self, bounds: &Aabb) {
        self.yaw = 0.0;
        self.pitch = 0.0;
        self.update();
        self.fit_view_to_scene(bounds);
    }

    pub fn resize_projection(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(
            Point3::from_vec(self.eye),
            Point3::from_vec(self.target),
            self.up,
        )
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }

    pub fn frustum(&self) -> Frustum {
        Frustum::from_view_projection(&self.build_view_projection_matrix())
    }

    /// Updates the eye after changing `distance`, `pitch`, `yaw` or `target`.
    fn update(&mut self) {
        self.eye =
            calculate_cartesian_eye_position(self.pitch, self.yaw, self.distance, self.target);
    }
}

fn clamp_distance(distance: f64) -> f32 {
    if distance.is_nan() {
        return MIN_DISTANCE;
    }
    distance.clamp(MIN_DISTANCE as f64, MAX_DISTANCE as f64) as f32
}

fn clamp_pitch(pitch: f32) -> f32 {
    let limit = std::f32::consts::FRAC_PI_2 - PITCH_EPSILON;
    if pitch.is_nan() {
        return 0.0;
    }
    pitch.clamp(-limit, limit)
}

fn calculate_cartesian_eye_position(
    pitch: f32,
    yaw: f32,
    distance: f32,
    target: Vector3<f32>,
) -> Vector3<f32> {
    Vector3::new(
        distance * yaw.sin() * pitch.cos(),
        distance * pitch.sin(),
        distance * yaw.cos() * pitch.cos(),
    ) + target
}
