use glam::Vec3;

use crate::constants::{MAX_CELL_COUNT, MIN_CELL_COUNT, MIN_VOLUME_EXTENT};

/// Normalized position of the centre of voxel `index` along an axis of
/// `side` voxels. Every sampler and every snapped seed point goes through
/// this function so that a seed voxel evaluates to a distance of exactly 0.
pub fn voxel_center(index: u32, side: u32) -> f32 {
    (index as f32 + 0.5) / side as f32
}

/// Flatten a voxel coordinate into the x-fastest storage index.
pub fn voxel_index(x: u32, y: u32, z: u32, side: u32) -> usize {
    let side = side as usize;
    x as usize + y as usize * side + z as usize * side * side
}

/// Clamp a requested cell lattice density into [MIN_CELL_COUNT, MAX_CELL_COUNT].
pub fn clamp_cell_count(cell_count: u32) -> u32 {
    cell_count.clamp(MIN_CELL_COUNT, MAX_CELL_COUNT)
}

/// Clamp each axis of a volume extent to at least MIN_VOLUME_EXTENT.
pub fn clamp_extent(extent: Vec3) -> Vec3 {
    extent.max(Vec3::splat(MIN_VOLUME_EXTENT))
}

/// Clamp to zero from below. NaN collapses to zero as well.
pub fn non_negative(value: f32) -> f32 {
    if value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Clamp into [0, 1]. NaN collapses to zero.
pub fn unit_interval(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// `value` if it is finite, otherwise `fallback`.
pub fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Per-axis [`finite_or`].
pub fn finite_vec3_or(value: Vec3, fallback: Vec3) -> Vec3 {
    Vec3::new(
        finite_or(value.x, fallback.x),
        finite_or(value.y, fallback.y),
        finite_or(value.z, fallback.z),
    )
}

/// Replace `slot` with `clamp(slot)`. Returns true only if the stored value
/// actually changed, so a value that is already in range (or left alone by
/// `clamp`) never reports a change.
pub fn clamp_in_place<T: Copy + PartialEq>(slot: &mut T, clamp: impl FnOnce(T) -> T) -> bool {
    let clamped = clamp(*slot);
    let changed = *slot != clamped;
    *slot = clamped;
    changed
}

/// Divide each weight by the total. A zero (or negative) total yields all zeros
/// instead of NaN.
pub fn normalized_weights<const N: usize>(weights: [f32; N]) -> [f32; N] {
    let total: f32 = weights.iter().map(|w| non_negative(*w)).sum();
    if total <= 0.0 {
        return [0.0; N];
    }
    weights.map(|w| non_negative(w) / total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voxel_center() {
        assert_eq!(voxel_center(0, 64), 0.5 / 64.0);
        assert_eq!(voxel_center(63, 64), 63.5 / 64.0);
        assert!(voxel_center(255, 256) < 1.0);
    }

    #[test]
    fn test_voxel_index_x_fastest() {
        assert_eq!(voxel_index(0, 0, 0, 64), 0);
        assert_eq!(voxel_index(1, 0, 0, 64), 1);
        assert_eq!(voxel_index(0, 1, 0, 64), 64);
        assert_eq!(voxel_index(0, 0, 1, 64), 4096);
        assert_eq!(voxel_index(63, 63, 63, 64), 262_143);
    }

    #[test]
    fn test_clamp_cell_count() {
        assert_eq!(clamp_cell_count(0), 1);
        assert_eq!(clamp_cell_count(7), 7);
        assert_eq!(clamp_cell_count(40), 16);
    }

    #[test]
    fn test_clamp_extent() {
        let clamped = clamp_extent(Vec3::new(-5.0, 0.0, 3.0));
        assert_eq!(clamped, Vec3::new(0.01, 0.01, 3.0));
    }

    #[test]
    fn test_scalar_clamps() {
        assert_eq!(non_negative(-1.0), 0.0);
        assert_eq!(non_negative(2.5), 2.5);
        assert_eq!(non_negative(f32::NAN), 0.0);
        assert_eq!(unit_interval(1.5), 1.0);
        assert_eq!(unit_interval(-0.2), 0.0);
        assert_eq!(unit_interval(0.3), 0.3);
        assert_eq!(unit_interval(f32::NAN), 0.0);
    }

    #[test]
    fn test_finite_or() {
        assert_eq!(finite_or(2.0, 1.0), 2.0);
        assert_eq!(finite_or(f32::NAN, 1.0), 1.0);
        assert_eq!(finite_or(f32::INFINITY, 1.0), 1.0);
        assert_eq!(
            finite_vec3_or(Vec3::new(f32::NAN, 3.0, f32::NEG_INFINITY), Vec3::ONE),
            Vec3::new(1.0, 3.0, 1.0)
        );
    }

    #[test]
    fn test_clamp_in_place_reports_changes() {
        let mut value = 1.5f32;
        assert!(clamp_in_place(&mut value, unit_interval));
        assert_eq!(value, 1.0);
        assert!(!clamp_in_place(&mut value, unit_interval));

        let mut nan = f32::NAN;
        assert!(clamp_in_place(&mut nan, non_negative));
        assert_eq!(nan, 0.0);
        assert!(!clamp_in_place(&mut nan, non_negative));
    }

    #[test]
    fn test_weights_single_layer() {
        assert_eq!(normalized_weights([1.0, 0.0, 0.0]), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_weights_zero_total() {
        assert_eq!(normalized_weights([0.0, 0.0, 0.0]), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_weights_mixed() {
        assert_eq!(normalized_weights([1.0, 1.0, 2.0]), [0.25, 0.25, 0.5]);
    }

    #[test]
    fn test_negative_weights_ignored() {
        assert_eq!(normalized_weights([-3.0, 2.0, 2.0]), [0.0, 0.5, 0.5]);
    }
}
