use cumulus_core::constants::NOISE_LAYER_COUNT;
use cumulus_core::math::normalized_weights;
use cumulus_core::TextureHandle;
use cumulus_noise::NoiseField;
use glam::{Vec3, Vec4};

use crate::light::LightVector;
use crate::settings::CloudSettings;

/// Per-layer values as the shader reads them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerBlock {
    /// xyz = sample scale, w = normalized weight fraction.
    pub scale_weight: Vec4,
    /// Texture-space scroll velocity.
    pub scroll: Vec3,
}

/// Immutable snapshot of everything the cloud shader needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBlock {
    pub noise: NoiseField,
    pub layers: [LayerBlock; NOISE_LAYER_COUNT],
    pub volume_position: Vec3,
    pub half_extent: Vec3,
    pub cloud_color: Vec3,
    pub density_offset: f32,
    pub density_multiplier: f32,
    pub light_direction: Vec3,
    pub light_color: Vec3,
    pub light_absorption: f32,
    pub light_attenuation: f32,
    pub forward_scattering: f32,
    pub back_scattering: f32,
    pub cloud_steps: u32,
    pub light_steps: u32,
    pub max_distance: f32,
    pub dither: Option<TextureHandle>,
    pub dither_strength: f32,
}

impl ParameterBlock {
    /// Assemble a block from already-sanitized settings.
    pub(crate) fn build(
        settings: &CloudSettings,
        noise: NoiseField,
        light: LightVector,
        dither: Option<TextureHandle>,
    ) -> Self {
        let fractions = normalized_weights(settings.layer_weights());
        let mut layers = [LayerBlock {
            scale_weight: Vec4::ZERO,
            scroll: Vec3::ZERO,
        }; NOISE_LAYER_COUNT];
        for ((block, layer), fraction) in layers.iter_mut().zip(&settings.layers).zip(fractions) {
            *block = LayerBlock {
                scale_weight: layer.scale.extend(fraction),
                scroll: layer.scroll_velocity(settings.speed_multiplier),
            };
        }

        Self {
            noise,
            layers,
            volume_position: settings.position,
            half_extent: settings.volume_size * 0.5,
            cloud_color: settings.cloud_color,
            density_offset: settings.density_offset,
            density_multiplier: settings.density_multiplier,
            light_direction: light.direction,
            light_color: light.color,
            light_absorption: settings.light_absorption,
            light_attenuation: settings.light_attenuation,
            forward_scattering: settings.forward_scattering,
            back_scattering: settings.back_scattering,
            cloud_steps: settings.cloud_steps,
            light_steps: settings.light_steps,
            max_distance: settings.max_distance,
            dither: bound_dither(dither, settings.dither_strength),
            dither_strength: settings.dither_strength,
        }
    }

    /// Weight fraction of each layer; sums to 1, or to 0 when every weight is 0.
    pub fn weight_fractions(&self) -> [f32; NOISE_LAYER_COUNT] {
        self.layers.map(|l| l.scale_weight.w)
    }

    /// GPU uniform layout of this block (the noise and dither textures are
    /// bound separately).
    pub fn to_uniforms(&self) -> CloudUniforms {
        CloudUniforms {
            noise_scale: self.layers.map(|l| l.scale_weight.to_array()),
            noise_scroll: self.layers.map(|l| l.scroll.extend(0.0).to_array()),
            volume_position: self.volume_position.extend(1.0).to_array(),
            half_extent: self.half_extent.extend(0.0).to_array(),
            cloud_color: self.cloud_color.extend(1.0).to_array(),
            light_direction: self.light_direction.extend(0.0).to_array(),
            light_color: self.light_color.extend(1.0).to_array(),
            density: [
                self.density_offset,
                self.density_multiplier,
                self.max_distance,
                self.dither_strength,
            ],
            lighting: [
                self.light_absorption,
                self.light_attenuation,
                self.forward_scattering,
                self.back_scattering,
            ],
            steps: [
                self.cloud_steps,
                self.light_steps,
                self.dither.is_some() as u32,
                0,
            ],
        }
    }
}

/// A dither texture is only worth binding when it has any strength.
fn bound_dither(dither: Option<TextureHandle>, strength: f32) -> Option<TextureHandle> {
    dither.filter(|_| strength > 0.0)
}

/// Cloud uniform block (224 bytes, every row 16-byte aligned).
/// Must match CloudUniforms in the cloud raymarch shader.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CloudUniforms {
    /// xyz scale, w weight fraction, per layer.
    pub noise_scale: [[f32; 4]; NOISE_LAYER_COUNT],
    /// xyz scroll velocity per layer.
    pub noise_scroll: [[f32; 4]; NOISE_LAYER_COUNT],
    pub volume_position: [f32; 4],
    pub half_extent: [f32; 4],
    pub cloud_color: [f32; 4],
    pub light_direction: [f32; 4],
    pub light_color: [f32; 4],
    /// density offset, density multiplier, max distance, dither strength
    pub density: [f32; 4],
    /// absorption, attenuation, forward scatter, back scatter
    pub lighting: [f32; 4],
    /// cloud steps, light steps, dither bound (0/1), unused
    pub steps: [u32; 4],
}
