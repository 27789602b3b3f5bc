//! Equirectangular HDR environment images

use std::io::Cursor;

use cgmath::{InnerSpace, Vector3};

use crate::error::{Result, ViewerError};

/// Linear RGB pixels of an equirectangular panorama, row 0 at the zenith
#[derive(Debug, Clone, PartialEq)]
pub struct HdrImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<[f32; 3]>,
}

impl HdrImage {
    /// Uniformly colored panorama
    pub fn constant(width: u32, height: u32, rgb: [f32; 3]) -> Self {
        Self {
            width,
            height,
            pixels: vec![rgb; (width * height) as usize],
        }
    }

    fn texel(&self, x: i64, y: i64) -> [f32; 3] {
        let w = self.width as i64;
        let h = self.height as i64;
        let x = x.rem_euclid(w);
        let y = y.clamp(0, h - 1);
        self.pixels[(y * w + x) as usize]
    }

    /// Bilinear lookup at texture coordinates; u wraps, v clamps
    pub fn sample_uv(&self, u: f32, v: f32) -> [f32; 3] {
        let fx = u * self.width as f32 - 0.5;
        let fy = v * self.height as f32 - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let a = self.texel(x0, y0);
        let b = self.texel(x0 + 1, y0);
        let c = self.texel(x0, y0 + 1);
        let d = self.texel(x0 + 1, y0 + 1);

        let mut out = [0.0; 3];
        for i in 0..3 {
            let top = a[i] + (b[i] - a[i]) * tx;
            let bottom = c[i] + (d[i] - c[i]) * tx;
            out[i] = top + (bottom - top) * ty;
        }
        out
    }

    /// Radiance arriving from world direction `dir`
    pub fn sample_direction(&self, dir: Vector3<f32>) -> [f32; 3] {
        let (u, v) = direction_to_equirect(dir);
        self.sample_uv(u, v)
    }

    /// Number of halvings that bring the panorama to at most `max_width`
    pub fn downsample_steps(&self, max_width: u32) -> u32 {
        let (mut width, mut height, mut steps) = (self.width, self.height, 0);
        while width > max_width.max(2) && height > 1 {
            width = (width / 2).max(1);
            height = (height / 2).max(1);
            steps += 1;
        }
        steps
    }

    /// Box-filters the panorama down until it is at most `max_width` wide
    pub fn downsampled(&self, max_width: u32) -> HdrImage {
        let mut image = self.clone();
        for _ in 0..self.downsample_steps(max_width) {
            image = image.half();
        }
        image
    }

    /// The panorama followed by `steps` successive halvings
    pub fn mip_chain(&self, steps: u32) -> Vec<HdrImage> {
        let mut chain = vec![self.clone()];
        for _ in 0..steps {
            if let Some(next) = chain.last().map(HdrImage::half) {
                chain.push(next);
            }
        }
        chain
    }

    fn half(&self) -> HdrImage {
        let width = (self.width / 2).max(1);
        let height = (self.height / 2).max(1);
        let mut pixels = Vec::with_capacity((width * height) as usize);
        for y in 0..height as i64 {
            for x in 0..width as i64 {
                let mut sum = [0.0f32; 3];
                for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                    let p = self.texel(x * 2 + dx, y * 2 + dy);
                    for i in 0..3 {
                        sum[i] += p[i] * 0.25;
                    }
                }
                pixels.push(sum);
            }
        }
        HdrImage {
            width,
            height,
            pixels,
        }
    }
}

/// Maps a direction to equirectangular coordinates
///
/// -Z sits at the horizontal center, +Y at `v = 0`.
pub fn direction_to_equirect(dir: Vector3<f32>) -> (f32, f32) {
    let d = if dir.magnitude2() > 0.0 {
        dir.normalize()
    } else {
        Vector3::new(0.0, 0.0, -1.0)
    };
    let u = 0.5 + d.x.atan2(-d.z) / (2.0 * std::f32::consts::PI);
    let v = d.y.clamp(-1.0, 1.0).acos() / std::f32::consts::PI;
    (u, v)
}

/// Decodes Radiance RGBE (`.hdr`) data, or any float or 8-bit image the
/// `image` crate recognises, into linear RGB
pub fn decode_hdr(bytes: &[u8]) -> Result<HdrImage> {
    if bytes.is_empty() {
        return Err(ViewerError::HdrDecodeFailed("empty input".to_string()));
    }
    let decoded =
        image::load_from_memory(bytes).map_err(|e| ViewerError::HdrDecodeFailed(e.to_string()))?;
    let rgb = decoded.to_rgb32f();
    let (width, height) = rgb.dimensions();
    if width == 0 || height == 0 {
        return Err(ViewerError::HdrDecodeFailed(format!(
            "degenerate image {}x{}",
            width, height
        )));
    }

    let pixels: Vec<[f32; 3]> = rgb
        .pixels()
        .map(|p| p.0.map(|c| if c.is_finite() { c.max(0.0) } else { 0.0 }))
        .collect();
    log::debug!("Decoded {}x{} environment image", width, height);

    Ok(HdrImage {
        width,
        height,
        pixels,
    })
}

/// Encodes an image as Radiance RGBE
pub fn encode_hdr(image: &HdrImage) -> Result<Vec<u8>> {
    let raw: Vec<f32> = image.pixels.iter().flatten().copied().collect();
    let buffer = image::Rgb32FImage::from_raw(image.width, image.height, raw)
        .ok_or_else(|| ViewerError::InvalidArgument("pixel count does not match size".to_string()))?;

    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb32F(buffer)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Hdr)
        .map_err(|e| ViewerError::HdrDecodeFailed(e.to_string()))?;
    Ok(bytes)
}

#[cfg(test)]
/// Sky above the horizon, ground below
pub(crate) fn sky_and_ground(width: u32, height: u32) -> HdrImage {
    let mut image = HdrImage::constant(width, height, [0.0; 3]);
    for y in 0..height {
        let rgb = if y < height / 2 {
            [0.4, 0.6, 1.0]
        } else {
            [0.3, 0.2, 0.1]
        };
        for x in 0..width {
            image.pixels[(y * width + x) as usize] = rgb;
        }
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_hdr_round_trip_keeps_radiance() {
        let image = sky_and_ground(16, 8);
        let decoded = decode_hdr(&encode_hdr(&image).unwrap()).unwrap();
        assert_eq!((decoded.width, decoded.height), (16, 8));
        // RGBE keeps roughly 8 bits of mantissa
        let p = decoded.pixels[0];
        assert!((p[2] - 1.0).abs() < 0.01 && (p[0] - 0.4).abs() < 0.01);
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert_eq!(decode_hdr(&[]).unwrap_err().kind(), ErrorKind::HdrDecodeFailed);
        assert_eq!(
            decode_hdr(b"#?RADIANCE\nnot really").unwrap_err().kind(),
            ErrorKind::HdrDecodeFailed
        );
    }

    #[test]
    fn test_direction_mapping() {
        let (u, v) = direction_to_equirect(Vector3::new(0.0, 0.0, -1.0));
        assert!((u - 0.5).abs() < 1e-6 && (v - 0.5).abs() < 1e-6);
        let (_, v) = direction_to_equirect(Vector3::new(0.0, 1.0, 0.0));
        assert!(v.abs() < 1e-6);

        let image = sky_and_ground(16, 8);
        assert_eq!(image.sample_direction(Vector3::new(0.0, 1.0, 0.0)), [0.4, 0.6, 1.0]);
        assert_eq!(image.sample_direction(Vector3::new(0.0, -1.0, 0.0)), [0.3, 0.2, 0.1]);
    }

    #[test]
    fn test_downsample_preserves_mean() {
        let image = sky_and_ground(64, 32);
        let small = image.downsampled(8);
        assert_eq!(small.width, 8);
        assert_eq!(image.downsample_steps(8), 3);
        assert_eq!(image.mip_chain(3)[3], small);
        let mean = |img: &HdrImage| img.pixels.iter().map(|p| p[0]).sum::<f32>() / img.pixels.len() as f32;
        assert!((mean(&image) - mean(&small)).abs() < 1e-5);
    }
}
