//! GPU textures for a prefiltered environment
//!
//! Textures are released by dropping them; wgpu keeps them alive until
//! submitted work that samples them has completed.

use crate::gfx::resources::{global_bindings::IblViews, texture_resource::TextureResource};

/// The four textures bound into the frame bind group
pub struct IblTextures {
    pub environment: TextureResource,
    pub irradiance: TextureResource,
    pub specular: TextureResource,
    pub brdf_lut: TextureResource,
    pub specular_mip_count: u32,
    /// False for the black placeholder bound before any environment loads
    pub loaded: bool,
}

impl IblTextures {
    /// Black cubes and a neutral table; lighting from them is zero
    pub fn placeholder(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self {
            environment: TextureResource::black_cube(device, queue, "Placeholder Environment"),
            irradiance: TextureResource::black_cube(device, queue, "Placeholder Irradiance"),
            specular: TextureResource::black_cube(device, queue, "Placeholder Specular"),
            brdf_lut: TextureResource::hdr_2d(device, queue, 1, &[[1.0, 0.0, 0.0, 1.0]], "Placeholder BRDF LUT"),
            specular_mip_count: 1,
            loaded: false,
        }
    }

    pub fn views(&self) -> IblViews<'_> {
        IblViews {
            irradiance: &self.irradiance.view,
            specular: &self.specular.view,
            brdf_lut: &self.brdf_lut.view,
            environment: &self.environment.view,
        }
    }

    pub fn byte_size(&self) -> u64 {
        [&self.environment, &self.irradiance, &self.specular, &self.brdf_lut]
            .iter()
            .map(|t| t.byte_size())
            .sum()
    }
}
