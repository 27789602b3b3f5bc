//! # Image-Based Lighting
//!
//! An equirectangular HDR panorama is turned into the three lookups the PBR
//! shader samples: a diffuse irradiance cube, a GGX-prefiltered specular
//! cube whose mip level encodes roughness, and a split-sum BRDF table. The
//! environment itself is also resampled onto a cube for the background.
//!
//! Prefiltering runs as compute passes ([`prefilter`]) and is a pure
//! function of the input pixels and [`IblConfig`], so loading the same file
//! twice yields identical textures. [`gpu`] holds the results.

pub mod gpu;
pub mod hdr;
pub mod prefilter;
#[cfg(test)]
pub mod sampler;

use serde::Deserialize;

use crate::error::Result;
use hdr::HdrImage;

pub use gpu::IblTextures;

/// Sizes, sample counts and seed used when prefiltering an environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IblConfig {
    pub cube_size: u32,
    pub irradiance_size: u32,
    pub specular_size: u32,
    pub specular_mip_levels: u32,
    pub lambertian_sample_count: u32,
    pub ggx_sample_count: u32,
    pub lut_size: u32,
    pub lut_sample_count: u32,
    pub seed: u64,
}

impl Default for IblConfig {
    fn default() -> Self {
        Self {
            cube_size: 256,
            irradiance_size: 32,
            specular_size: 128,
            specular_mip_levels: 5,
            lambertian_sample_count: 256,
            ggx_sample_count: 256,
            lut_size: 128,
            lut_sample_count: 512,
            seed: 0x5eed,
        }
    }
}

impl IblConfig {
    /// Small sizes and sample counts for quick previews and tests
    pub fn preview() -> Self {
        Self {
            cube_size: 16,
            irradiance_size: 4,
            specular_size: 16,
            specular_mip_levels: 3,
            lambertian_sample_count: 32,
            ggx_sample_count: 32,
            lut_size: 16,
            lut_sample_count: 64,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn sanitized(self) -> Self {
        Self {
            cube_size: self.cube_size.max(1),
            irradiance_size: self.irradiance_size.max(1),
            specular_size: self.specular_size.max(1),
            specular_mip_levels: self.specular_mip_levels.max(1),
            lambertian_sample_count: self.lambertian_sample_count.max(1),
            ggx_sample_count: self.ggx_sample_count.max(1),
            lut_size: self.lut_size.max(1),
            lut_sample_count: self.lut_sample_count.max(1),
            seed: self.seed,
        }
    }
}

/// A decoded environment and the settings it will be prefiltered with
#[derive(Debug, Clone, PartialEq)]
pub struct IblData {
    pub image: HdrImage,
    /// Sizes and sample counts, each at least 1
    pub config: IblConfig,
}

impl IblData {
    /// Decodes `hdr_bytes`
    pub fn from_hdr_bytes(hdr_bytes: &[u8], config: &IblConfig) -> Result<Self> {
        let image = hdr::decode_hdr(hdr_bytes)?;
        Ok(Self::from_image(image, config))
    }

    pub fn from_image(image: HdrImage, config: &IblConfig) -> Self {
        Self {
            image,
            config: config.sanitized(),
        }
    }

    /// Number of specular mips the prefilter produces
    pub fn specular_mip_count(&self) -> u32 {
        prefilter::specular_levels(self.config.specular_size, self.config.specular_mip_levels)
    }
}
