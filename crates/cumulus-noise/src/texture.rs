use cumulus_core::FieldKey;

use crate::field::NoiseField;

/// Density texel format. Must stay filterable for 3D textures without
/// optional device features.
pub const NOISE_TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R16Float;

const TEXEL_BYTES: u32 = 2;

/// A noise field uploaded as a 3D `R16Float` texture, with a linear sampler
/// in repeat mode so the cloud shader can tile it.
pub struct NoiseTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    key: FieldKey,
}

impl NoiseTexture {
    pub fn upload(device: &wgpu::Device, queue: &wgpu::Queue, field: &NoiseField) -> Self {
        let side = field.side();
        let size = texture_extent(side);

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("noise-texture-3d"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D3,
            format: NOISE_TEXTURE_FORMAT,
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
            bytemuck::cast_slice(&field.to_f16()),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(side * TEXEL_BYTES),
                rows_per_image: Some(side),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("noise-texture-3d-view"),
            dimension: Some(wgpu::TextureViewDimension::D3),
            ..Default::default()
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("noise-sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        log::info!(
            "NoiseTexture: uploaded {0}x{0}x{0} field (epoch {1})",
            side,
            field.key().epoch
        );

        Self {
            texture,
            view,
            sampler,
            key: field.key(),
        }
    }

    /// Cache key of the field this texture was built from.
    pub fn key(&self) -> FieldKey {
        self.key
    }
}

fn texture_extent(side: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: side,
        height: side,
        depth_or_array_layers: side,
    }
}
