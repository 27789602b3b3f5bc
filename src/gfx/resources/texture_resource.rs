//! Texture resource management for wgpu
//!
//! Creates the textures the viewer needs: depth and color targets, material
//! textures with a CPU-built mip chain, float data textures for joints and
//! morph targets, and half-float cubemaps for image-based lighting.

use half::f16;

use crate::asset::image::ImageData;

/// Color encoding of a texture, fixed when the texture is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureEncoding {
    Srgb,
    Linear,
}

impl TextureEncoding {
    pub fn rgba8_format(self) -> wgpu::TextureFormat {
        match self {
            TextureEncoding::Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            TextureEncoding::Linear => wgpu::TextureFormat::Rgba8Unorm,
        }
    }
}

/// GPU texture resource containing the texture and its default view
#[derive(Debug, Clone)]
pub struct TextureResource {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub encoding: TextureEncoding,
}

impl TextureResource {
    /// Standard depth buffer format used throughout the engine
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Format of float data textures (joints, morph displacements, BRDF LUT)
    pub const DATA_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

    /// Format of the IBL cubemaps
    pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

    /// Size of the texture's GPU allocation including mips, in bytes
    pub fn byte_size(&self) -> u64 {
        let size = self.texture.size();
        let block = self
            .texture
            .format()
            .block_copy_size(Some(wgpu::TextureAspect::All))
            .unwrap_or(4) as u64;

        (0..self.texture.mip_level_count())
            .map(|mip| {
                let w = (size.width >> mip).max(1) as u64;
                let h = (size.height >> mip).max(1) as u64;
                w * h * size.depth_or_array_layers as u64 * block
            })
            .sum()
    }

    /// Creates a depth buffer of the given dimensions
    pub fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32, label: &str) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            encoding: TextureEncoding::Linear,
        }
    }

    /// Creates an offscreen color target that can be copied back to the CPU
    pub fn create_color_target(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let encoding = if format.is_srgb() {
            TextureEncoding::Srgb
        } else {
            TextureEncoding::Linear
        };

        Self {
            texture,
            view,
            encoding,
        }
    }

    /// Creates a mipmapped RGBA8 texture from decoded image data
    ///
    /// Mip levels are produced on the CPU with a triangle filter.
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &ImageData,
        encoding: TextureEncoding,
        label: &str,
    ) -> Self {
        let levels = mip_chain(image);

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: image.width,
                height: image.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: levels.len() as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: encoding.rgba8_format(),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (mip, level) in levels.iter().enumerate() {
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: mip as u32,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                &level.pixels,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * level.width),
                    rows_per_image: Some(level.height),
                },
                wgpu::Extent3d {
                    width: level.width,
                    height: level.height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            encoding,
        }
    }

    /// A 1x1 texture of a single color; stands in for absent material maps
    pub fn solid(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: [u8; 4],
        encoding: TextureEncoding,
        label: &str,
    ) -> Self {
        Self::from_image(device, queue, &ImageData::solid(rgba), encoding, label)
    }

    /// Creates an unfilterable `Rgba32Float` texture read with `textureLoad`
    pub fn data_texture(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
        texels: &[[f32; 4]],
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DATA_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        if !texels.is_empty() {
            Self::write_data_texels(queue, &texture, width, texels);
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            encoding: TextureEncoding::Linear,
        }
    }

    /// Rewrites the leading rows of a data texture
    pub fn write_data_texels(queue: &wgpu::Queue, texture: &wgpu::Texture, width: u32, texels: &[[f32; 4]]) {
        let rows = (texels.len() as u32).div_ceil(width.max(1));
        let needed = (rows * width) as usize;
        let mut padded;
        let data: &[[f32; 4]] = if texels.len() == needed {
            texels
        } else {
            padded = texels.to_vec();
            padded.resize(needed, [0.0; 4]);
            &padded
        };

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(data),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(16 * width),
                rows_per_image: Some(rows),
            },
            wgpu::Extent3d {
                width,
                height: rows,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Creates an `Rgba32Float` texture holding a mip chain
    ///
    /// `levels[m]` holds `(width >> m) x (height >> m)` texels, each size
    /// clamped to 1.
    pub fn data_mips(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
        levels: &[Vec<[f32; 4]>],
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: levels.len().max(1) as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DATA_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (mip, texels) in levels.iter().enumerate() {
            let w = (width >> mip).max(1);
            let h = (height >> mip).max(1);
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: mip as u32,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                bytemuck::cast_slice(texels),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(16 * w),
                    rows_per_image: Some(h),
                },
                wgpu::Extent3d {
                    width: w,
                    height: h,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            encoding: TextureEncoding::Linear,
        }
    }

    /// An `Rgba16Float` cubemap written by compute passes
    ///
    /// The default view is a cube over every mip; passes write through
    /// their own 2D array views.
    pub fn storage_cube(device: &wgpu::Device, size: u32, mip_level_count: u32, label: &str) -> Self {
        let texture = Self::storage_texture(device, size, 6, mip_level_count, label);
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });

        Self {
            texture,
            view,
            encoding: TextureEncoding::Linear,
        }
    }

    /// A single-level `Rgba16Float` 2D texture written by a compute pass
    pub fn storage_2d(device: &wgpu::Device, size: u32, label: &str) -> Self {
        let texture = Self::storage_texture(device, size, 1, 1, label);
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::D2),
            ..Default::default()
        });

        Self {
            texture,
            view,
            encoding: TextureEncoding::Linear,
        }
    }

    fn storage_texture(device: &wgpu::Device, size: u32, layers: u32, mip_level_count: u32, label: &str) -> wgpu::Texture {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size.max(1),
                height: size.max(1),
                depth_or_array_layers: layers,
            },
            mip_level_count: mip_level_count.max(1),
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::HDR_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        })
    }

    /// Creates a 2D `Rgba16Float` texture from linear float texels
    pub fn hdr_2d(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        size: u32,
        texels: &[[f32; 4]],
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::HDR_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(&to_half(texels)),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(8 * size),
                rows_per_image: Some(size),
            },
            wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            encoding: TextureEncoding::Linear,
        }
    }

    /// Creates an `Rgba16Float` cubemap
    ///
    /// `mips[level][face]` holds `(size >> level)^2` texels per face, faces
    /// ordered +X, -X, +Y, -Y, +Z, -Z.
    pub fn hdr_cube(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        size: u32,
        mips: &[[Vec<[f32; 4]>; 6]],
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 6,
            },
            mip_level_count: mips.len().max(1) as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::HDR_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (mip, faces) in mips.iter().enumerate() {
            let face_size = (size >> mip).max(1);
            for (face, texels) in faces.iter().enumerate() {
                queue.write_texture(
                    wgpu::TexelCopyTextureInfo {
                        texture: &texture,
                        mip_level: mip as u32,
                        origin: wgpu::Origin3d {
                            x: 0,
                            y: 0,
                            z: face as u32,
                        },
                        aspect: wgpu::TextureAspect::All,
                    },
                    bytemuck::cast_slice(&to_half(texels)),
                    wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(8 * face_size),
                        rows_per_image: Some(face_size),
                    },
                    wgpu::Extent3d {
                        width: face_size,
                        height: face_size,
                        depth_or_array_layers: 1,
                    },
                );
            }
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });

        Self {
            texture,
            view,
            encoding: TextureEncoding::Linear,
        }
    }

    /// A 1x1 black cubemap bound when no environment is loaded
    pub fn black_cube(device: &wgpu::Device, queue: &wgpu::Queue, label: &str) -> Self {
        let face = vec![[0.0, 0.0, 0.0, 1.0]];
        let faces = [
            face.clone(),
            face.clone(),
            face.clone(),
            face.clone(),
            face.clone(),
            face,
        ];
        Self::hdr_cube(device, queue, 1, &[faces], label)
    }
}

fn to_half(texels: &[[f32; 4]]) -> Vec<[f16; 4]> {
    texels
        .iter()
        .map(|t| t.map(f16::from_f32))
        .collect()
}

/// Full mip chain of an RGBA8 image down to 1x1, level 0 first
pub fn mip_chain(image: &ImageData) -> Vec<ImageData> {
    let mut levels = vec![image.clone()];

    let Some(base) = image::RgbaImage::from_raw(image.width, image.height, image.pixels.clone())
    else {
        return levels;
    };

    let (mut w, mut h) = (image.width, image.height);
    while w > 1 || h > 1 {
        w = (w / 2).max(1);
        h = (h / 2).max(1);
        let level = image::imageops::resize(&base, w, h, image::imageops::FilterType::Triangle);
        levels.push(ImageData {
            width: w,
            height: h,
            pixels: level.into_raw(),
        });
    }

    levels
}
