use std::sync::Arc;

use cumulus_core::math::{unit_interval, voxel_index};
use cumulus_core::{CloudError, FieldKey, Resolution};
use glam::Vec3;

/// A generated Worley density field: `side^3` values in [0, 1], stored
/// x-fastest. Cloning shares the voxel storage.
#[derive(Debug, Clone)]
pub struct NoiseField {
    key: FieldKey,
    values: Arc<[f32]>,
}

/// Summary statistics of a field's densities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldStats {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
}

impl NoiseField {
    /// Normalize raw nearest-point distances into densities:
    /// `1 - d / max(d)`, so seed voxels read 1 and the farthest voxel reads 0.
    /// A field whose distances are all zero maps to all ones.
    pub fn from_distances(key: FieldKey, distances: &[f32]) -> Result<Self, CloudError> {
        let expected = key.resolution.voxel_count();
        if distances.len() != expected {
            return Err(CloudError::DistanceCountMismatch {
                expected,
                actual: distances.len(),
            });
        }

        let max_distance = distances.iter().copied().fold(0.0f32, f32::max);
        let values: Arc<[f32]> = if max_distance > 0.0 {
            distances
                .iter()
                .map(|d| (1.0 - d / max_distance).clamp(0.0, 1.0))
                .collect()
        } else {
            vec![1.0; expected].into()
        };

        Ok(Self { key, values })
    }

    /// Rebuild a field from densities saved earlier, e.g. a field file
    /// written by a previous run. Values are clamped into [0, 1].
    pub fn from_values(key: FieldKey, values: Vec<f32>) -> Result<Self, CloudError> {
        let expected = key.resolution.voxel_count();
        if values.len() != expected {
            return Err(CloudError::DistanceCountMismatch {
                expected,
                actual: values.len(),
            });
        }
        let values: Arc<[f32]> = values.into_iter().map(unit_interval).collect();
        Ok(Self { key, values })
    }

    pub fn key(&self) -> FieldKey {
        self.key
    }

    pub fn resolution(&self) -> Resolution {
        self.key.resolution
    }

    pub fn side(&self) -> u32 {
        self.key.resolution.side()
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Density at an in-range voxel coordinate.
    pub fn voxel(&self, x: u32, y: u32, z: u32) -> f32 {
        self.values[voxel_index(x, y, z, self.side())]
    }

    /// Density at any integer coordinate, wrapping around each axis
    /// (repeat addressing).
    pub fn voxel_wrapped(&self, x: i64, y: i64, z: i64) -> f32 {
        let side = self.side() as i64;
        self.voxel(
            x.rem_euclid(side) as u32,
            y.rem_euclid(side) as u32,
            z.rem_euclid(side) as u32,
        )
    }

    /// Trilinear sample at normalized coordinates with repeat addressing,
    /// matching a linear-filtered sampler in wrap mode.
    pub fn sample_repeat(&self, uvw: Vec3) -> f32 {
        let texel = uvw * self.side() as f32 - Vec3::splat(0.5);
        let base = texel.floor();
        let t = texel - base;
        let (x0, y0, z0) = (base.x as i64, base.y as i64, base.z as i64);

        let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;
        let row = |y: i64, z: i64| {
            lerp(
                self.voxel_wrapped(x0, y, z),
                self.voxel_wrapped(x0 + 1, y, z),
                t.x,
            )
        };
        let plane = |z: i64| lerp(row(y0, z), row(y0 + 1, z), t.y);
        lerp(plane(z0), plane(z0 + 1), t.z)
    }

    pub fn stats(&self) -> FieldStats {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut sum = 0.0f64;
        for &v in self.values.iter() {
            min = min.min(v);
            max = max.max(v);
            sum += v as f64;
        }
        FieldStats {
            min,
            max,
            mean: (sum / self.values.len().max(1) as f64) as f32,
        }
    }

    /// Half-float texels, one per voxel, for an `R16Float` texture.
    pub fn to_f16(&self) -> Vec<half::f16> {
        self.values
            .iter()
            .map(|v| half::f16::from_f32(v.clamp(0.0, 1.0)))
            .collect()
    }
}

impl PartialEq for NoiseField {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && (Arc::ptr_eq(&self.values, &other.values) || self.values == other.values)
    }
}
