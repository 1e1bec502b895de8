//! Uploading scene textures

use crate::device::GpuContext;
use boxshot_core::{Error, FilterMode, Result, Texture, WrapMode};

/// A scene texture resident on the GPU
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl GpuTexture {
    /// Upload raw RGBA8 pixels at the image's own shape
    pub fn upload(gpu: &GpuContext, texture: &Texture) -> Result<Self> {
        let image = &texture.image;
        let max = gpu.max_texture_dimension();
        if image.width() > max || image.height() > max {
            return Err(Error::Render(format!(
                "texture of {}x{} exceeds the device limit of {}",
                image.width(),
                image.height(),
                max
            )));
        }

        let size = wgpu::Extent3d {
            width: image.width(),
            height: image.height(),
            depth_or_array_layers: 1,
        };

        let gpu_texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Slab Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        gpu.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &gpu_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.pixels(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width()),
                rows_per_image: Some(image.height()),
            },
            size,
        );

        let view = gpu_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = gpu.device.create_sampler(&sampler_descriptor(texture));

        Ok(Self {
            texture: gpu_texture,
            view,
            sampler,
        })
    }
}

/// Sampler matching the texture's filter and wrap settings
pub fn sampler_descriptor(texture: &Texture) -> wgpu::SamplerDescriptor<'static> {
    wgpu::SamplerDescriptor {
        label: Some("Slab Texture Sampler"),
        address_mode_u: address_mode(texture.wrap_s),
        address_mode_v: address_mode(texture.wrap_t),
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: filter_mode(texture.mag_filter),
        min_filter: filter_mode(texture.min_filter),
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    }
}

fn filter_mode(mode: FilterMode) -> wgpu::FilterMode {
    match mode {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}

fn address_mode(mode: WrapMode) -> wgpu::AddressMode {
    match mode {
        WrapMode::Repeat => wgpu::AddressMode::Repeat,
        WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
    }
}
