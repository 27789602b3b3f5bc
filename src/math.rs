//! # Math Core
//!
//! Pure geometry helpers shared by the loader, scene graph, animation engine
//! and camera: axis-aligned bounding boxes, TRS transforms, shortest-arc
//! quaternion interpolation and view frustum planes.
//!
//! All types are built on `cgmath` and use `f32`. glTF stores quaternions in
//! `[x, y, z, w]` order while `cgmath::Quaternion::new` takes `(w, x, y, z)`;
//! [`quat_from_xyzw`] and [`quat_to_xyzw`] convert at the boundary.

use cgmath::{InnerSpace, Matrix, Matrix3, Matrix4, Quaternion, SquareMatrix, Vector3, Vector4};

/// Axis-aligned bounding box
///
/// An empty box has `min > max` on every axis and absorbs nothing when
/// transformed; [`Aabb::union`] with an empty box returns the other operand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

impl Aabb {
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    pub fn empty() -> Self {
        Self {
            min: Vector3::new(f32::MAX, f32::MAX, f32::MAX),
            max: Vector3::new(-f32::MAX, -f32::MAX, -f32::MAX),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Builds the tightest box around a point list; empty input yields an empty box
    pub fn from_points(points: &[[f32; 3]]) -> Self {
        let mut aabb = Self::empty();
        for p in points {
            aabb.extend_point(Vector3::new(p[0], p[1], p[2]));
        }
        aabb
    }

    pub fn extend_point(&mut self, p: Vector3<f32>) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let mut out = *self;
        out.extend_point(other.min);
        out.extend_point(other.max);
        out
    }

    pub fn center(&self) -> Vector3<f32> {
        (self.min + self.max) * 0.5
    }

    /// Full edge lengths along each axis
    pub fn extent(&self) -> Vector3<f32> {
        self.max - self.min
    }

    pub fn longest_axis(&self) -> f32 {
        let e = self.extent();
        e.x.max(e.y).max(e.z)
    }

    /// Radius of the bounding sphere centred on [`Aabb::center`]
    pub fn radius(&self) -> f32 {
        self.extent().magnitude() * 0.5
    }

    pub fn corners(&self) -> [Vector3<f32>; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vector3::new(a.x, a.y, a.z),
            Vector3::new(b.x, a.y, a.z),
            Vector3::new(a.x, b.y, a.z),
            Vector3::new(a.x, a.y, b.z),
            Vector3::new(b.x, b.y, a.z),
            Vector3::new(b.x, a.y, b.z),
            Vector3::new(a.x, b.y, b.z),
            Vector3::new(b.x, b.y, b.z),
        ]
    }

    /// Transforms all eight corners and re-fits an axis-aligned box around them
    pub fn transform(&self, matrix: &Matrix4<f32>) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        let mut out = Aabb::empty();
        for corner in self.corners() {
            let p = matrix * corner.extend(1.0);
            out.extend_point(p.truncate() / p.w);
        }
        out
    }
}

/// Local transform as translation, rotation and scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trs {
    pub translation: Vector3<f32>,
    pub rotation: Quaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Default for Trs {
    fn default() -> Self {
        Self {
            translation: Vector3::new(0.0, 0.0, 0.0),
            rotation: Quaternion::new(1.0, 0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Trs {
    /// Composes `T * R * S`
    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.translation)
            * Matrix4::from(self.rotation)
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    /// Splits an affine matrix into TRS; shear is discarded
    pub fn from_matrix(m: &Matrix4<f32>) -> Trs {
        let translation = m.w.truncate();
        let mut scale = Vector3::new(
            m.x.truncate().magnitude(),
            m.y.truncate().magnitude(),
            m.z.truncate().magnitude(),
        );
        if m.determinant() < 0.0 {
            scale.x = -scale.x;
        }

        let safe = |s: f32| if s.abs() > f32::EPSILON { s } else { 1.0 };
        let rot = Matrix3::from_cols(
            m.x.truncate() / safe(scale.x),
            m.y.truncate() / safe(scale.y),
            m.z.truncate() / safe(scale.z),
        );

        Trs {
            translation,
            rotation: Quaternion::from(rot).normalize(),
            scale,
        }
    }
}

pub fn quat_from_xyzw(q: [f32; 4]) -> Quaternion<f32> {
    Quaternion::new(q[3], q[0], q[1], q[2])
}

pub fn quat_to_xyzw(q: Quaternion<f32>) -> [f32; 4] {
    [q.v.x, q.v.y, q.v.z, q.s]
}

/// Spherical interpolation along the shorter arc
///
/// Inputs are normalized first. When the quaternions are nearly parallel
/// the result falls back to a normalized lerp.
pub fn slerp_shortest(a: Quaternion<f32>, b: Quaternion<f32>, t: f32) -> Quaternion<f32> {
    let a = a.normalize();
    let mut b = b.normalize();
    let mut cos_theta = a.dot(b);

    if cos_theta < 0.0 {
        b = -b;
        cos_theta = -cos_theta;
    }

    if cos_theta > 0.9995 {
        return (a + (b - a) * t).normalize();
    }

    let theta_0 = cos_theta.acos();
    let theta = theta_0 * t;
    let sin_theta_0 = theta_0.sin();
    let s0 = theta.cos() - cos_theta * theta.sin() / sin_theta_0;
    let s1 = theta.sin() / sin_theta_0;

    (a * s0 + b * s1).normalize()
}

/// Frobenius norm of `a - b`
pub fn frobenius_distance(a: &Matrix4<f32>, b: &Matrix4<f32>) -> f32 {
    let mut sum = 0.0;
    for c in 0..4 {
        for r in 0..4 {
            let d = a[c][r] - b[c][r];
            sum += d * d;
        }
    }
    sum.sqrt()
}

/// Six clip planes extracted from a view-projection matrix
///
/// Assumes the wgpu clip volume where depth runs from 0 to `w`.
#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    planes: [Vector4<f32>; 6],
}

impl Frustum {
    pub fn from_view_projection(m: &Matrix4<f32>) -> Self {
        let t = m.transpose();
        let (r0, r1, r2, r3) = (t.x, t.y, t.z, t.w);

        let mut planes = [r3 + r0, r3 - r0, r3 + r1, r3 - r1, r2, r3 - r2];
        for plane in planes.iter_mut() {
            let len = plane.truncate().magnitude();
            if len > 0.0 {
                *plane /= len;
            }
        }

        Self { planes }
    }

    /// Conservative test: true unless the box is fully outside one plane
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        if aabb.is_empty() {
            return false;
        }
        self.planes.iter().all(|plane| {
            let p = Vector3::new(
                if plane.x >= 0.0 { aabb.max.x } else { aabb.min.x },
                if plane.y >= 0.0 { aabb.max.y } else { aabb.min.y },
                if plane.z >= 0.0 { aabb.max.z } else { aabb.min.z },
            );
            plane.truncate().dot(p) + plane.w >= 0.0
        })
    }

    pub fn contains_point(&self, p: Vector3<f32>) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.truncate().dot(p) + plane.w >= -1e-4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, Rad, Rotation3};

    #[test]
    fn test_aabb_from_points() {
        let aabb = Aabb::from_points(&[[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [-1.0, -2.0, -1.0]]);

        assert_eq!(aabb.min, Vector3::new(-1.0, -2.0, -1.0));
        assert_eq!(aabb.max, Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(aabb.longest_axis(), 3.0);
        assert!(Aabb::from_points(&[]).is_empty());
    }

    #[test]
    fn test_union_with_empty_is_identity() {
        let aabb = Aabb::new(Vector3::new(-1.0, -1.0, -1.0), Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(aabb.union(&Aabb::empty()), aabb);
        assert_eq!(Aabb::empty().union(&aabb), aabb);
    }

    #[test]
    fn test_aabb_transform_translates() {
        let aabb = Aabb::new(Vector3::new(-1.0, -1.0, -1.0), Vector3::new(1.0, 1.0, 1.0));
        let moved = aabb.transform(&Matrix4::from_translation(Vector3::new(5.0, 0.0, 0.0)));
        assert_eq!(moved.min, Vector3::new(4.0, -1.0, -1.0));
        assert_eq!(moved.max, Vector3::new(6.0, 1.0, 1.0));
    }

    #[test]
    fn test_trs_round_trip() {
        let trs = Trs {
            translation: Vector3::new(1.0, 2.0, 3.0),
            rotation: Quaternion::from_angle_y(Deg(30.0)),
            scale: Vector3::new(2.0, 0.5, 1.5),
        };
        let back = Trs::from_matrix(&trs.to_matrix());
        assert!(frobenius_distance(&trs.to_matrix(), &back.to_matrix()) < 1e-5);
    }

    #[test]
    fn test_slerp_antipodal_matches_identity_slerp() {
        let q = Quaternion::from_angle_z(Rad(0.7));
        for t in [0.0, 0.25, 0.5, 1.0] {
            assert_eq!(slerp_shortest(q, -q, t), slerp_shortest(q, q, t));
        }
    }

    #[test]
    fn test_slerp_halfway() {
        let a = Quaternion::from_angle_y(Deg(0.0));
        let b = Quaternion::from_angle_y(Deg(90.0));
        let mid = slerp_shortest(a, b, 0.5);
        let expected = Quaternion::from_angle_y(Deg(45.0));
        assert!((mid.dot(expected).abs() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_frustum_culls_box_behind_camera() {
        let view = Matrix4::look_at_rh(
            cgmath::Point3::new(0.0, 0.0, 5.0),
            cgmath::Point3::new(0.0, 0.0, 0.0),
            Vector3::unit_y(),
        );
        let proj = cgmath::perspective(Deg(45.0), 1.0, 0.1, 100.0);
        let frustum = Frustum::from_view_projection(&(proj * view));

        let in_front = Aabb::new(Vector3::new(-1.0, -1.0, -1.0), Vector3::new(1.0, 1.0, 1.0));
        let behind = Aabb::new(Vector3::new(-1.0, -1.0, 9.0), Vector3::new(1.0, 1.0, 11.0));
        assert!(frustum.intersects_aabb(&in_front));
        assert!(!frustum.intersects_aabb(&behind));
    }
}
