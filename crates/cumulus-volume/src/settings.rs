use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use cumulus_core::constants::{
    DEFAULT_MAX_DISTANCE, MAX_CLOUD_STEPS, MAX_LIGHT_STEPS, MIN_CELL_COUNT, MIN_CLOUD_STEPS,
    MIN_LIGHT_STEPS, NOISE_LAYER_COUNT,
};
use cumulus_core::math::{
    clamp_cell_count, clamp_extent, clamp_in_place, finite_or, finite_vec3_or, non_negative,
    unit_interval,
};
use cumulus_core::Resolution;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layer::{default_layers, NoiseLayer};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to parse cloud settings RON: {0}")]
    ParseError(String),
    #[error("Failed to serialize cloud settings to RON: {0}")]
    SerializeError(String),
    #[error("Failed to read cloud settings from {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// The settings that determine the generated noise field. Changing any of
/// them makes the cached field stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseSettings {
    pub resolution: Resolution,
    /// Seed points per axis, clamped to [1, 16].
    pub cell_count: u32,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            resolution: Resolution::R64,
            cell_count: MIN_CELL_COUNT,
        }
    }
}

impl NoiseSettings {
    /// Hash of the generation inputs, compared against the hash the cached
    /// field was built from.
    pub fn content_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    pub(crate) fn sanitize(&mut self) -> bool {
        let cell_count = clamp_cell_count(self.cell_count);
        let changed = cell_count != self.cell_count;
        self.cell_count = cell_count;
        changed
    }
}

/// Everything a cloud volume is configured with, as loaded from RON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudSettings {
    pub noise: NoiseSettings,
    pub layers: [NoiseLayer; NOISE_LAYER_COUNT],

    /// World-space centre of the volume.
    pub position: Vec3,
    /// Full extent of the volume; each axis at least 0.01.
    pub volume_size: Vec3,
    /// Subtracted from the sampled density, in [0, 1].
    pub density_offset: f32,
    pub density_multiplier: f32,
    /// Scales every layer's scroll speed.
    pub speed_multiplier: f32,
    pub cloud_color: Vec3,

    /// Extinction along the secondary ray toward the light.
    pub light_absorption: f32,
    /// Extinction along the primary view ray.
    pub light_attenuation: f32,
    pub forward_scattering: f32,
    pub back_scattering: f32,

    pub cloud_steps: u32,
    pub light_steps: u32,
    pub max_distance: f32,
    /// Strength of the per-frame ray start jitter, in [0, 1].
    pub dither_strength: f32,
    pub render_enabled: bool,
}

impl Default for CloudSettings {
    fn default() -> Self {
        Self {
            noise: NoiseSettings::default(),
            layers: default_layers(),
            position: Vec3::ZERO,
            volume_size: Vec3::ONE,
            density_offset: 0.0,
            density_multiplier: 1.0,
            speed_multiplier: 1.0,
            cloud_color: Vec3::ONE,
            light_absorption: 1.0,
            light_attenuation: 1.0,
            forward_scattering: 0.5,
            back_scattering: 0.3,
            cloud_steps: MIN_CLOUD_STEPS,
            light_steps: MIN_LIGHT_STEPS,
            max_distance: DEFAULT_MAX_DISTANCE,
            dither_strength: 0.0,
            render_enabled: true,
        }
    }
}

impl CloudSettings {
    /// Clamp every numeric setting into its valid range and replace
    /// non-finite values that have no range. Idempotent.
    /// Returns true if any value was changed.
    pub fn sanitize(&mut self) -> bool {
        let mut changed = self.noise.sanitize();
        for layer in &mut self.layers {
            changed |= layer.sanitize();
        }
        changed |= clamp_in_place(&mut self.position, |p| finite_vec3_or(p, Vec3::ZERO));
        changed |= clamp_in_place(&mut self.volume_size, clamp_extent);
        changed |= clamp_in_place(&mut self.density_offset, unit_interval);
        changed |= clamp_in_place(&mut self.density_multiplier, non_negative);
        changed |= clamp_in_place(&mut self.speed_multiplier, |m| finite_or(m, 1.0));
        changed |= clamp_in_place(&mut self.cloud_color, |c| c.max(Vec3::ZERO));
        changed |= clamp_in_place(&mut self.light_absorption, non_negative);
        changed |= clamp_in_place(&mut self.light_attenuation, non_negative);
        changed |= clamp_in_place(&mut self.forward_scattering, unit_interval);
        changed |= clamp_in_place(&mut self.back_scattering, unit_interval);
        changed |= clamp_in_place(&mut self.cloud_steps, |n| {
            n.clamp(MIN_CLOUD_STEPS, MAX_CLOUD_STEPS)
        });
        changed |= clamp_in_place(&mut self.light_steps, |n| {
            n.clamp(MIN_LIGHT_STEPS, MAX_LIGHT_STEPS)
        });
        changed |= clamp_in_place(&mut self.max_distance, non_negative);
        changed |= clamp_in_place(&mut self.dither_strength, unit_interval);
        changed
    }

    /// Layer weights, each clamped to be non-negative.
    pub fn layer_weights(&self) -> [f32; NOISE_LAYER_COUNT] {
        self.layers.map(|l| non_negative(l.weight))
    }
}

/// Parse cloud settings from a RON string. Missing fields take defaults.
pub fn load_settings_from_str(ron_str: &str) -> Result<CloudSettings, SettingsError> {
    let options = ron::Options::default();
    options
        .from_str(ron_str)
        .map_err(|e| SettingsError::ParseError(e.to_string()))
}

/// Read and parse a RON settings file.
pub fn load_settings(path: &Path) -> Result<CloudSettings, SettingsError> {
    let contents = std::fs::read_to_string(path).map_err(|source| SettingsError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    load_settings_from_str(&contents)
}

/// The built-in cumulus preset shipped with the crate.
pub fn default_preset() -> Result<CloudSettings, SettingsError> {
    load_settings_from_str(include_str!("../../../data/clouds/default.ron"))
}

/// Serialize settings back to pretty RON.
pub fn to_ron_string(settings: &CloudSettings) -> Result<String, SettingsError> {
    ron::ser::to_string_pretty(settings, ron::ser::PrettyConfig::default())
        .map_err(|e| SettingsError::SerializeError(e.to_string()))
}
