use std::sync::{Arc, Mutex, MutexGuard};

use cgmath::{Matrix4, SquareMatrix, Vector3};

use super::orbit_camera::OrbitCamera;
use crate::math::Frustum;

pub trait Camera: Sized {
    fn build_view_projection_matrix(&self) -> Matrix4<f32>;
}

/// Immutable copy of the camera taken once at the top of a frame
#[derive(Debug, Clone, Copy)]
pub struct CameraSnapshot {
    pub eye: Vector3<f32>,
    pub target: Vector3<f32>,
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
    pub view_proj: Matrix4<f32>,
    pub near: f32,
    pub far: f32,
}

impl CameraSnapshot {
    pub fn from_camera(camera: &OrbitCamera) -> Self {
        let view = camera.view_matrix();
        let projection = camera.projection_matrix();
        Self {
            eye: camera.eye(),
            target: camera.target(),
            view,
            projection,
            view_proj: projection * view,
            near: camera.near(),
            far: camera.far(),
        }
    }

    pub fn frustum(&self) -> Frustum {
        Frustum::from_view_projection(&self.view_proj)
    }

    /// Inverse of the view-projection with the translation removed
    ///
    /// Maps clip-space positions to world-space view directions for the
    /// environment background.
    pub fn inverse_rotation_view_proj(&self) -> Matrix4<f32> {
        let mut rotation = self.view;
        rotation.w = cgmath::Vector4::new(0.0, 0.0, 0.0, 1.0);
        (self.projection * rotation)
            .invert()
            .unwrap_or_else(Matrix4::identity)
    }
}

/// Camera handle shared between the host thread and the render thread
///
/// The lock is held only for a single operation; the renderer reads the
/// camera through [`SharedCamera::snapshot`].
#[derive(Debug, Clone, Default)]
pub struct SharedCamera {
    inner: Arc<Mutex<OrbitCamera>>,
}

impl SharedCamera {
    pub fn new(camera: OrbitCamera) -> Self {
        Self {
            inner: Arc::new(Mutex::new(camera)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, OrbitCamera> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Runs one camera operation under the lock
    pub fn update<R>(&self, f: impl FnOnce(&mut OrbitCamera) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn get(&self) -> OrbitCamera {
        *self.lock()
    }

    pub fn snapshot(&self) -> CameraSnapshot {
        CameraSnapshot::from_camera(&self.lock())
    }

    pub fn same_camera(&self, other: &SharedCamera) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Vector4};

    #[test]
    fn test_shared_camera_updates_visible_to_clones() {
        let shared = SharedCamera::new(OrbitCamera::default());
        let host = shared.clone();
        host.update(|camera| camera.zoom_by(1.0));
        assert_eq!(shared.get().distance(), host.get().distance());
        assert!(shared.same_camera(&host));
        assert!(!shared.same_camera(&SharedCamera::default()));
    }

    #[test]
    fn test_snapshot_matches_camera() {
        let shared = SharedCamera::default();
        let camera = shared.get();
        let snapshot = shared.snapshot();
        assert_eq!(snapshot.view_proj, camera.build_view_projection_matrix());
        assert_eq!(snapshot.eye, camera.eye());
    }

    #[test]
    fn test_inverse_rotation_points_forward() {
        let snapshot = SharedCamera::default().snapshot();
        let inv = snapshot.inverse_rotation_view_proj();
        let far_center = inv * Vector4::new(0.0, 0.0, 1.0, 1.0);
        let dir = (far_center.truncate() / far_center.w).normalize();
        assert!((dir - Vector3::new(0.0, 0.0, -1.0)).magnitude() < 1e-3);
    }
}
