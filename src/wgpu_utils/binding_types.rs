// src/wgpu_utils/binding_types.rs
//! Binding types used by the frame, draw, material and prefilter layouts

use std::num::NonZeroU64;

/// Uniform block validated against the size of `T` when bound
pub fn uniform<T>() -> wgpu::BindingType {
    wgpu::BindingType::Buffer {
        ty: wgpu::BufferBindingType::Uniform,
        has_dynamic_offset: false,
        min_binding_size: NonZeroU64::new(std::mem::size_of::<T>() as u64),
    }
}

pub fn filtering_sampler() -> wgpu::BindingType {
    wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering)
}

fn float_texture(view_dimension: wgpu::TextureViewDimension, filterable: bool) -> wgpu::BindingType {
    wgpu::BindingType::Texture {
        sample_type: wgpu::TextureSampleType::Float { filterable },
        view_dimension,
        multisampled: false,
    }
}

pub fn texture_2d() -> wgpu::BindingType {
    float_texture(wgpu::TextureViewDimension::D2, true)
}

pub fn texture_cube() -> wgpu::BindingType {
    float_texture(wgpu::TextureViewDimension::Cube, true)
}

/// Rgba32Float joint and morph data, read with `textureLoad`
pub fn data_texture_2d() -> wgpu::BindingType {
    float_texture(wgpu::TextureViewDimension::D2, false)
}

/// Write-only storage view over the layers of one mip
pub fn storage_texture_2d_array(format: wgpu::TextureFormat) -> wgpu::BindingType {
    wgpu::BindingType::StorageTexture {
        access: wgpu::StorageTextureAccess::WriteOnly,
        format,
        view_dimension: wgpu::TextureViewDimension::D2Array,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_min_size_follows_type() {
        match uniform::<[[f32; 4]; 4]>() {
            wgpu::BindingType::Buffer { min_binding_size, .. } => {
                assert_eq!(min_binding_size.map(NonZeroU64::get), Some(64));
            }
            other => panic!("unexpected binding {:?}", other),
        }
    }

    #[test]
    fn test_data_textures_are_unfilterable() {
        assert!(matches!(
            data_texture_2d(),
            wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                ..
            }
        ));
    }
}
