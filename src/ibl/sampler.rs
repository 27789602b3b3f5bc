//! CPU reference for the prefilter passes
//!
//! Mirrors `prefilter.wgsl` texel for texel: the same Hammersley sets with
//! the same seeded rotations, sampling the same box-filtered panorama level.
//! GPU output is checked against it.

use std::f32::consts::PI;

use cgmath::{InnerSpace, Vector3};
use super::{
    hdr::HdrImage,
    prefilter::{self, sample_offsets, IRRADIANCE_MIP, IRRADIANCE_SOURCE_WIDTH},
    IblData,
};

/// Texels of the six faces of one cube mip, ordered +X, -X, +Y, -Y, +Z, -Z
pub type CubeFaces = [Vec<[f32; 4]>; 6];

/// World direction through texel `(x, y)` of a cube face
///
/// Follows the wgpu cube layout: `y` grows downwards on every face.
pub fn cube_texel_direction(face: usize, x: u32, y: u32, size: u32) -> Vector3<f32> {
    let s = 2.0 * (x as f32 + 0.5) / size as f32 - 1.0;
    let t = 2.0 * (y as f32 + 0.5) / size as f32 - 1.0;
    let dir = match face {
        0 => Vector3::new(1.0, -t, -s),
        1 => Vector3::new(-1.0, -t, s),
        2 => Vector3::new(s, 1.0, t),
        3 => Vector3::new(s, -1.0, -t),
        4 => Vector3::new(s, -t, 1.0),
        _ => Vector3::new(-s, -t, -1.0),
    };
    dir.normalize()
}

/// Point `i` of an `n`-point Hammersley set on the unit square
pub fn hammersley(i: u32, n: u32) -> (f32, f32) {
    let radical_inverse = i.reverse_bits() as f32 * 2.328_306_4e-10;
    (i as f32 / n.max(1) as f32, radical_inverse)
}

fn tangent_frame(n: Vector3<f32>) -> (Vector3<f32>, Vector3<f32>) {
    let up = if n.y.abs() < 0.999 {
        Vector3::unit_y()
    } else {
        Vector3::unit_x()
    };
    let tangent = up.cross(n).normalize();
    let bitangent = n.cross(tangent);
    (tangent, bitangent)
}

fn cosine_sample(u: f32, v: f32) -> Vector3<f32> {
    let r = u.sqrt();
    let phi = 2.0 * PI * v;
    Vector3::new(r * phi.cos(), r * phi.sin(), (1.0 - u).max(0.0).sqrt())
}

/// GGX half vector in tangent space for roughness `alpha = roughness^2`
fn ggx_sample(u: f32, v: f32, roughness: f32) -> Vector3<f32> {
    let alpha = roughness * roughness;
    let phi = 2.0 * PI * v;
    let cos_theta = ((1.0 - u) / (1.0 + (alpha * alpha - 1.0) * u)).max(0.0).sqrt();
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    Vector3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}

fn to_world(local: Vector3<f32>, n: Vector3<f32>) -> Vector3<f32> {
    let (t, b) = tangent_frame(n);
    t * local.x + b * local.y + n * local.z
}

fn rotated(point: (f32, f32), offset: (f32, f32)) -> (f32, f32) {
    ((point.0 + offset.0).fract(), (point.1 + offset.1).fract())
}

fn cube_faces(size: u32, mut texel: impl FnMut(usize, Vector3<f32>) -> [f32; 4]) -> CubeFaces {
    std::array::from_fn(|face| {
        let mut texels = Vec::with_capacity((size * size) as usize);
        for y in 0..size {
            for x in 0..size {
                texels.push(texel(face, cube_texel_direction(face, x, y, size)));
            }
        }
        texels
    })
}

fn rgba(rgb: [f32; 3]) -> [f32; 4] {
    [rgb[0], rgb[1], rgb[2], 1.0]
}

/// Resamples the panorama onto a cube
pub fn environment_cube(source: &HdrImage, size: u32) -> CubeFaces {
    let filtered = source.downsampled(size * 4);
    cube_faces(size, |_, dir| rgba(filtered.sample_direction(dir)))
}

/// Cosine-weighted hemisphere average of incoming radiance
pub fn irradiance_cube(source: &HdrImage, size: u32, sample_count: u32, seed: u64) -> CubeFaces {
    let filtered = source.downsampled(IRRADIANCE_SOURCE_WIDTH);
    let count = sample_count.max(1);
    let offsets: [(f32, f32); 6] = std::array::from_fn(|face| sample_offsets(seed, face, IRRADIANCE_MIP));

    cube_faces(size, |face, n| {
        let mut sum = [0.0f32; 3];
        for i in 0..count {
            let (u, v) = rotated(hammersley(i, count), offsets[face]);
            let l = to_world(cosine_sample(u, v), n);
            let radiance = filtered.sample_direction(l);
            for c in 0..3 {
                sum[c] += radiance[c];
            }
        }
        rgba(sum.map(|s| s / count as f32))
    })
}

/// GGX prefiltered radiance, one mip per roughness step from 0 to 1
///
/// Mip 0 is the mirror reflection. Each level is sampled from a panorama
/// box-filtered to roughly match its footprint.
pub fn specular_mips(
    source: &HdrImage,
    size: u32,
    mip_levels: u32,
    sample_count: u32,
    seed: u64,
) -> Vec<CubeFaces> {
    let levels = prefilter::specular_levels(size, mip_levels);
    let count = sample_count.max(1);

    (0..levels)
        .map(|mip| {
            let face_size = (size >> mip).max(1);
            let roughness = prefilter::mip_roughness(mip, levels);
            let filtered = source.downsampled(prefilter::specular_source_width(face_size));

            if mip == 0 {
                return cube_faces(face_size, |_, dir| rgba(filtered.sample_direction(dir)));
            }

            let offsets: [(f32, f32); 6] = std::array::from_fn(|face| sample_offsets(seed, face, mip));
            cube_faces(face_size, |face, n| {
                let mut sum = [0.0f32; 3];
                let mut weight = 0.0f32;
                for i in 0..count {
                    let (u, v) = rotated(hammersley(i, count), offsets[face]);
                    let h = to_world(ggx_sample(u, v, roughness), n);
                    let l = (h * (2.0 * n.dot(h)) - n).normalize();
                    let n_dot_l = n.dot(l);
                    if n_dot_l > 0.0 {
                        let radiance = filtered.sample_direction(l);
                        for c in 0..3 {
                            sum[c] += radiance[c] * n_dot_l;
                        }
                        weight += n_dot_l;
                    }
                }
                if weight > 0.0 {
                    rgba(sum.map(|s| s / weight))
                } else {
                    rgba(filtered.sample_direction(n))
                }
            })
        })
        .collect()
}

fn geometry_smith_ibl(n_dot_v: f32, n_dot_l: f32, roughness: f32) -> f32 {
    let k = roughness * roughness / 2.0;
    let g_v = n_dot_v / (n_dot_v * (1.0 - k) + k);
    let g_l = n_dot_l / (n_dot_l * (1.0 - k) + k);
    g_v * g_l
}

/// Split-sum BRDF table: x is `N·V`, y is roughness; texels hold (scale, bias, 0, 1)
pub fn brdf_lut(size: u32, sample_count: u32) -> Vec<[f32; 4]> {
    let count = sample_count.max(1);
    let mut texels = Vec::with_capacity((size * size) as usize);

    for y in 0..size {
        let roughness = (y as f32 + 0.5) / size as f32;
        for x in 0..size {
            let n_dot_v = ((x as f32 + 0.5) / size as f32).max(1e-4);
            let v = Vector3::new((1.0 - n_dot_v * n_dot_v).sqrt(), 0.0, n_dot_v);

            let (mut a, mut b) = (0.0f32, 0.0f32);
            for i in 0..count {
                let (u1, u2) = hammersley(i, count);
                let h = ggx_sample(u1, u2, roughness);
                let l = (h * (2.0 * v.dot(h)) - v).normalize();
                let n_dot_l = l.z.max(0.0);
                let n_dot_h = h.z.max(0.0);
                let v_dot_h = v.dot(h).max(0.0);
                if n_dot_l > 0.0 {
                    let g = geometry_smith_ibl(n_dot_v, n_dot_l, roughness);
                    let g_vis = g * v_dot_h / (n_dot_h * n_dot_v).max(1e-6);
                    let fc = (1.0 - v_dot_h).powi(5);
                    a += (1.0 - fc) * g_vis;
                    b += fc * g_vis;
                }
            }
            texels.push([a / count as f32, b / count as f32, 0.0, 1.0]);
        }
    }
    texels
}

/// Every table the prefilter passes produce
pub struct CpuPrefiltered {
    pub environment: CubeFaces,
    pub irradiance: CubeFaces,
    pub specular: Vec<CubeFaces>,
    pub brdf_lut: Vec<[f32; 4]>,
}

pub fn prefilter(data: &IblData) -> CpuPrefiltered {
    let config = &data.config;
    CpuPrefiltered {
        environment: environment_cube(&data.image, config.cube_size),
        irradiance: irradiance_cube(
            &data.image,
            config.irradiance_size,
            config.lambertian_sample_count,
            config.seed,
        ),
        specular: specular_mips(
            &data.image,
            config.specular_size,
            config.specular_mip_levels,
            config.ggx_sample_count,
            config.seed,
        ),
        brdf_lut: brdf_lut(config.lut_size, config.lut_sample_count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ibl::hdr::sky_and_ground;

    #[test]
    fn test_face_centers() {
        let expected = [
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(-1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, -1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(0.0, 0.0, -1.0),
        ];
        for (face, e) in expected.iter().enumerate() {
            // 3x3 face: texel (1, 1) is the center
            assert!((cube_texel_direction(face, 1, 1, 3) - e).magnitude() < 1e-6);
        }
        // +Y face: top row looks towards -Z
        assert!(cube_texel_direction(2, 1, 0, 3).z < 0.0);
    }

    #[test]
    fn test_hammersley_in_unit_square() {
        for i in 0..64 {
            let (u, v) = hammersley(i, 64);
            assert!((0.0..1.0).contains(&u) && (0.0..1.0).contains(&v));
        }
        assert_eq!(hammersley(1, 2), (0.5, 0.5));
    }

    #[test]
    fn test_constant_environment_irradiance_is_constant() {
        let source = HdrImage::constant(16, 8, [2.0, 1.0, 0.5]);
        let faces = irradiance_cube(&source, 2, 32, 1);
        for texel in faces.iter().flatten() {
            assert!((texel[0] - 2.0).abs() < 1e-4);
            assert!((texel[2] - 0.5).abs() < 1e-4);
        }
    }

    #[test]
    fn test_irradiance_top_brighter_than_bottom() {
        let source = sky_and_ground(32, 16);
        let faces = irradiance_cube(&source, 2, 64, 1);
        // +Y sees sky, -Y sees ground
        assert!(faces[2][0][2] > faces[3][0][2]);
    }

    #[test]
    fn test_specular_mip_sizes() {
        let source = sky_and_ground(32, 16);
        let mips = specular_mips(&source, 8, 10, 8, 3);
        assert_eq!(mips.len(), 4);
        assert_eq!(mips[0][0].len(), 64);
        assert_eq!(mips[3][5].len(), 1);
    }

    #[test]
    fn test_brdf_lut_ranges() {
        let lut = brdf_lut(8, 64);
        assert_eq!(lut.len(), 64);
        for texel in &lut {
            assert!(texel[0] >= 0.0 && texel[0] + texel[1] <= 1.05);
        }
        // Smooth surfaces viewed head-on reflect almost everything through the scale term
        assert!(lut[7][0] > 0.8);
    }

    #[test]
    fn test_same_seed_same_texels() {
        let mut source = HdrImage::constant(32, 16, [0.0; 3]);
        for (i, p) in source.pixels.iter_mut().enumerate() {
            *p = [i as f32, (i % 32) as f32, 1.0];
        }
        assert_eq!(
            specular_mips(&source, 4, 3, 16, 9),
            specular_mips(&source, 4, 3, 16, 9)
        );
        assert_ne!(
            irradiance_cube(&source, 2, 4, 1),
            irradiance_cube(&source, 2, 4, 2)
        );
    }
}
