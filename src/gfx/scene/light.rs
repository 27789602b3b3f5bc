//! Punctual lights attached to scene nodes
//!
//! A light shines down its node's local -Z axis from the node's origin.
//! [`PunctualLight::to_uniform`] places it in world space for one frame.

use cgmath::{InnerSpace, Matrix4, Vector3, Vector4};

use crate::gfx::resources::global_bindings::{LightUniform, LIGHT_DIRECTIONAL, LIGHT_POINT, LIGHT_SPOT};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Directional,
    Point,
    /// Cone angles in radians from the light's axis
    Spot { inner_cone_angle: f32, outer_cone_angle: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PunctualLight {
    pub name: Option<String>,
    pub kind: LightKind,
    /// Linear RGB
    pub color: [f32; 3],
    pub intensity: f32,
    /// Distance where the light reaches zero; `None` is unlimited
    pub range: Option<f32>,
}

impl Default for PunctualLight {
    fn default() -> Self {
        Self {
            name: None,
            kind: LightKind::Point,
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
            range: None,
        }
    }
}

impl PunctualLight {
    pub fn to_uniform(&self, world: &Matrix4<f32>) -> LightUniform {
        let world = *world;
        let position = world * Vector4::new(0.0, 0.0, 0.0, 1.0);
        let axis = (world * Vector4::new(0.0, 0.0, -1.0, 0.0)).truncate();
        let direction = if axis.magnitude2() > 0.0 {
            axis.normalize()
        } else {
            -Vector3::unit_z()
        };

        let (kind, cone) = match self.kind {
            LightKind::Directional => (LIGHT_DIRECTIONAL, [0.0; 4]),
            LightKind::Point => (LIGHT_POINT, [0.0; 4]),
            LightKind::Spot {
                inner_cone_angle,
                outer_cone_angle,
            } => {
                let (scale, offset) = spot_scale_offset(inner_cone_angle, outer_cone_angle);
                (LIGHT_SPOT, [scale, offset, 0.0, 0.0])
            }
        };

        LightUniform {
            position: [position.x, position.y, position.z, kind],
            direction: [direction.x, direction.y, direction.z, self.range.unwrap_or(0.0).max(0.0)],
            color: [self.color[0], self.color[1], self.color[2], self.intensity],
            cone,
        }
    }
}

/// Scale and offset turning `cos(angle)` into a 0..1 cone factor
///
/// The factor is 1 inside the inner cone and 0 outside the outer one.
pub fn spot_scale_offset(inner_cone_angle: f32, outer_cone_angle: f32) -> (f32, f32) {
    let cos_outer = outer_cone_angle.cos();
    let cos_inner = inner_cone_angle.cos();
    let scale = 1.0 / (cos_inner - cos_outer).max(0.001);
    (scale, -cos_outer * scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Deg;

    #[test]
    fn test_light_follows_node_transform() {
        let light = PunctualLight {
            kind: LightKind::Directional,
            intensity: 3.0,
            ..PunctualLight::default()
        };
        let world = Matrix4::from_translation(Vector3::new(1.0, 2.0, 3.0)) * Matrix4::from_angle_x(Deg(-90.0));
        let uniform = light.to_uniform(&world);

        assert_eq!(uniform.position[..3], [1.0, 2.0, 3.0]);
        assert_eq!(uniform.position[3], LIGHT_DIRECTIONAL);
        // -Z tipped down by -90 degrees about X points along -Y
        assert!((uniform.direction[1] + 1.0).abs() < 1e-6, "{:?}", uniform.direction);
        assert_eq!(uniform.color[3], 3.0);
        assert_eq!(uniform.direction[3], 0.0);
    }

    #[test]
    fn test_spot_cone_factor() {
        let (scale, offset) = spot_scale_offset(0.2, 0.6);
        let factor = |angle: f32| (angle.cos() * scale + offset).clamp(0.0, 1.0);
        assert_eq!(factor(0.0), 1.0);
        assert!((factor(0.2) - 1.0).abs() < 1e-5);
        assert!(factor(0.4) > 0.0 && factor(0.4) < 1.0);
        assert_eq!(factor(0.7), 0.0);

        let light = PunctualLight {
            kind: LightKind::Spot {
                inner_cone_angle: 0.2,
                outer_cone_angle: 0.6,
            },
            range: Some(5.0),
            ..PunctualLight::default()
        };
        let uniform = light.to_uniform(&Matrix4::from_scale(1.0));
        assert_eq!(uniform.position[3], LIGHT_SPOT);
        assert_eq!(uniform.direction, [0.0, 0.0, -1.0, 5.0]);
        assert_eq!(uniform.cone[0], scale);
    }
}
