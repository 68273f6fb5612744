use cumulus_core::constants::NOISE_LAYER_COUNT;
use cumulus_core::math::{clamp_in_place, finite_or, finite_vec3_or, non_negative};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// One octave of the cloud density: the shared noise texture sampled at its
/// own scale, scrolling in its own direction, blended by weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseLayer {
    /// Texture repeats per unit of volume space along each axis.
    pub scale: Vec3,
    pub scroll_direction: Vec3,
    pub scroll_speed: f32,
    /// Relative contribution. Negative weights are clamped to 0.
    pub weight: f32,
}

impl NoiseLayer {
    /// Full-weight layer at unit scale.
    pub fn primary() -> Self {
        Self {
            scale: Vec3::ONE,
            scroll_direction: Vec3::ZERO,
            scroll_speed: 1.0,
            weight: 1.0,
        }
    }

    /// Zero-weight layer at unit scale; contributes nothing until weighted.
    pub fn silent() -> Self {
        Self {
            weight: 0.0,
            ..Self::primary()
        }
    }

    /// Texture-space scroll velocity handed to the shader.
    pub fn scroll_velocity(&self, speed_multiplier: f32) -> Vec3 {
        self.scroll_direction * self.scroll_speed * speed_multiplier
    }

    /// Clamp the weight to be non-negative and replace non-finite scale or
    /// scroll values. Returns true if anything changed.
    pub(crate) fn sanitize(&mut self) -> bool {
        let mut changed = clamp_in_place(&mut self.weight, non_negative);
        changed |= clamp_in_place(&mut self.scale, |s| finite_vec3_or(s, Vec3::ONE));
        changed |= clamp_in_place(&mut self.scroll_direction, |d| finite_vec3_or(d, Vec3::ZERO));
        changed |= clamp_in_place(&mut self.scroll_speed, |s| finite_or(s, 0.0));
        changed
    }
}

impl Default for NoiseLayer {
    fn default() -> Self {
        Self::silent()
    }
}

/// The starting layer stack: one primary layer, the rest silent.
pub fn default_layers() -> [NoiseLayer; NOISE_LAYER_COUNT] {
    [NoiseLayer::primary(), NoiseLayer::silent(), NoiseLayer::silent()]
}
