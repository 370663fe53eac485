//! GPU textures and texture creation utilities.
//!
//! This module provides [`Texture`], a wrapper around WGPU texture
//! resources, with helpers for depth buffers, 2D images, cube maps and the
//! 1x1 placeholders bound to empty texture units.

use crate::{data_structures::mesh::TextureKind, error::GpuError};

/// A GPU texture with its default view.
///
/// Cloning shares the underlying GPU objects.
#[derive(Clone, Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub kind: TextureKind,
}

impl Texture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Color format of sampled color textures.
    pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    /// Normal maps hold vectors, not colors, and must not be gamma decoded.
    pub const NORMAL_MAP_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    /// Create a depth texture for depth-testing during rendering.
    ///
    /// # Arguments
    ///
    /// * `size` is [width, height] of the texture in pixels
    /// * `label` is used as a debug label for the GPU resource
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[Self::DEPTH_FORMAT],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            kind: TextureKind::D2,
        }
    }

    /// Upload an RGBA image as a 2D texture.
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &image::RgbaImage,
        label: &str,
        is_normal_map: bool,
    ) -> Result<Self, GpuError> {
        let (width, height) = img.dimensions();
        check_extent(device, width, height, label)?;

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let format = if is_normal_map {
            Self::NORMAL_MAP_FORMAT
        } else {
            Self::COLOR_FORMAT
        };
        let texture = create_color_texture(device, size, format, label);
        write_layer(queue, &texture, img, 0);

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(Self {
            texture,
            view,
            kind: TextureKind::D2,
        })
    }

    /// Upload six square faces (+X, -X, +Y, -Y, +Z, -Z) as a cube map.
    pub fn cube_from_images(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        faces: &[image::RgbaImage; 6],
        label: &str,
    ) -> Result<Self, GpuError> {
        let (width, height) = faces[0].dimensions();
        check_extent(device, width, height, label)?;

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 6,
        };
        let texture = create_color_texture(device, size, Self::COLOR_FORMAT, label);
        for (layer, face) in faces.iter().enumerate() {
            write_layer(queue, &texture, face, layer as u32);
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        Ok(Self {
            texture,
            view,
            kind: TextureKind::CubeMap,
        })
    }

    /// A 1x1 texture (or cube map) filled with a single color.
    ///
    /// Bound to texture units that hold nothing so the pipeline layout never
    /// changes.
    pub fn solid(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        color: [u8; 4],
        kind: TextureKind,
        label: &str,
    ) -> Self {
        let pixel = image::RgbaImage::from_pixel(1, 1, image::Rgba(color));
        let layers = match kind {
            TextureKind::D2 => 1,
            TextureKind::CubeMap => 6,
        };
        let size = wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: layers,
        };
        let texture = create_color_texture(device, size, Self::COLOR_FORMAT, label);
        for layer in 0..layers {
            write_layer(queue, &texture, &pixel, layer);
        }

        let dimension = match kind {
            TextureKind::D2 => wgpu::TextureViewDimension::D2,
            TextureKind::CubeMap => wgpu::TextureViewDimension::Cube,
        };
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(dimension),
            ..Default::default()
        });
        Self {
            texture,
            view,
            kind,
        }
    }
}

pub fn create_default_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("texture unit sampler"),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}

fn check_extent(device: &wgpu::Device, width: u32, height: u32, label: &str) -> Result<(), GpuError> {
    if width == 0 || height == 0 {
        return Err(GpuError::EmptyTexture(label.to_string()));
    }
    let limit = device.limits().max_texture_dimension_2d;
    let largest = width.max(height);
    if largest > limit {
        return Err(GpuError::TooLarge {
            label: label.to_string(),
            size: largest as u64,
            limit: limit as u64,
        });
    }
    Ok(())
}

fn create_color_texture(
    device: &wgpu::Device,
    size: wgpu::Extent3d,
    format: wgpu::TextureFormat,
    label: &str,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    })
}

fn write_layer(queue: &wgpu::Queue, texture: &wgpu::Texture, img: &image::RgbaImage, layer: u32) {
    let (width, height) = img.dimensions();
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d {
                x: 0,
                y: 0,
                z: layer,
            },
        },
        img.as_raw(),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}
