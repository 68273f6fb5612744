use cumulus_core::math::voxel_center;
use cumulus_core::Resolution;
use glam::Vec3;

use crate::rng::{cell_hash, hash_to_float, stream_seed};

/// Scatter one jittered point per cell of a `cell_count^3` lattice over the
/// unit cube: `point = (cell + offset) * (1 / cell_count)` with the offset
/// drawn uniformly from [0, 1)^3.
///
/// Points are emitted x-fastest, then y, then z. `seed` and `epoch` select
/// the jitter; every epoch yields a fresh point set.
pub fn jittered_points(cell_count: u32, seed: u32, epoch: u64) -> Vec<Vec3> {
    let cell_size = 1.0 / cell_count as f32;
    let stream = stream_seed(seed, epoch);
    let mut points = Vec::with_capacity((cell_count * cell_count * cell_count) as usize);

    for z in 0..cell_count {
        for y in 0..cell_count {
            for x in 0..cell_count {
                let cell = [x, y, z];
                let offset = Vec3::new(
                    hash_to_float(cell_hash(cell, stream, 0)),
                    hash_to_float(cell_hash(cell, stream, 1)),
                    hash_to_float(cell_hash(cell, stream, 2)),
                );
                let corner = Vec3::new(x as f32, y as f32, z as f32);
                points.push((corner + offset) * cell_size);
            }
        }
    }

    points
}

/// Move each point onto the nearest voxel centre that lies inside the
/// point's own cell, so the distance pass sees an exact zero at every seed
/// voxel and every cell still holds exactly one point.
///
/// `points` must be in the order [`jittered_points`] emits them for the same
/// `cell_count`.
pub fn snap_to_voxel_centers(points: &[Vec3], cell_count: u32, resolution: Resolution) -> Vec<Vec3> {
    debug_assert_eq!(points.len(), (cell_count * cell_count * cell_count) as usize);
    let side = resolution.side();
    let snap = |v: f32, cell: u32| {
        let nearest = ((v * side as f32).floor().max(0.0) as u32).min(side - 1);
        let (first, end) = cell_voxel_range(cell, cell_count, side);
        voxel_center(nearest.clamp(first, end - 1), side)
    };
    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let i = i as u32;
            let x = i % cell_count;
            let y = (i / cell_count) % cell_count;
            let z = i / (cell_count * cell_count);
            Vec3::new(snap(p.x, x), snap(p.y, y), snap(p.z, z))
        })
        .collect()
}

/// Voxels `[first, end)` along one axis whose centres fall inside
/// `[cell, cell + 1) / cell_count`. Never empty while `side >= cell_count`.
fn cell_voxel_range(cell: u32, cell_count: u32, side: u32) -> (u32, u32) {
    // (i + 0.5) / side >= c / n  <=>  i >= (2 c side - n) / 2n
    let bound = |c: u32| (2 * c * side + cell_count - 1) / (2 * cell_count);
    (bound(cell), bound(cell + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_count() {
        assert_eq!(jittered_points(1, 0, 0).len(), 1);
        assert_eq!(jittered_points(4, 0, 0).len(), 64);
        assert_eq!(jittered_points(16, 0, 0).len(), 4096);
    }

    #[test]
    fn test_each_point_inside_its_cell() {
        let cell_count = 5;
        let cell_size = 1.0 / cell_count as f32;
        let points = jittered_points(cell_count, 11, 2);
        let mut index = 0;
        for z in 0..cell_count {
            for y in 0..cell_count {
                for x in 0..cell_count {
                    let p = points[index];
                    let slack = Vec3::splat(1e-6);
                    let lo = Vec3::new(x as f32, y as f32, z as f32) * cell_size - slack;
                    let hi = lo + Vec3::splat(cell_size) + slack * 2.0;
                    assert!(
                        p.cmpge(lo).all() && p.cmple(hi).all(),
                        "point {p} escaped cell ({x},{y},{z})"
                    );
                    index += 1;
                }
            }
        }
    }

    #[test]
    fn test_same_seed_and_epoch_repeat() {
        assert_eq!(jittered_points(3, 99, 5), jittered_points(3, 99, 5));
    }

    #[test]
    fn test_new_epoch_moves_points() {
        assert_ne!(jittered_points(3, 99, 5), jittered_points(3, 99, 6));
    }

    #[test]
    fn test_snap_lands_on_voxel_centers() {
        let points = jittered_points(4, 3, 0);
        let snapped = snap_to_voxel_centers(&points, 4, Resolution::R64);
        assert_eq!(snapped.len(), points.len());
        for (raw, s) in points.iter().zip(&snapped) {
            // Within half a voxel of the original on every axis.
            assert!((*raw - *s).abs().max_element() <= 0.5 / 64.0 + f32::EPSILON);
            let index = (s.x * 64.0 - 0.5).round() as u32;
            assert_eq!(s.x, voxel_center(index, 64));
        }
    }

    #[test]
    fn test_snap_clamps_upper_edge() {
        let snapped = snap_to_voxel_centers(&[Vec3::ONE], 1, Resolution::R64);
        assert_eq!(snapped[0], Vec3::splat(voxel_center(63, 64)));
        let snapped = snap_to_voxel_centers(&[Vec3::ZERO], 1, Resolution::R64);
        assert_eq!(snapped[0], Vec3::splat(voxel_center(0, 64)));
    }

    #[test]
    fn test_cell_voxel_range() {
        assert_eq!(cell_voxel_range(0, 16, 64), (0, 4));
        assert_eq!(cell_voxel_range(15, 16, 64), (60, 64));
        // 64 / 6: boundary at 10.67 voxels; voxel 10 centre (10.5) is outside cell 1.
        assert_eq!(cell_voxel_range(0, 6, 64), (0, 11));
        assert_eq!(cell_voxel_range(1, 6, 64), (11, 21));
        assert_eq!(cell_voxel_range(5, 6, 64), (53, 64));
    }

    #[test]
    fn test_snapped_points_stay_in_their_cells() {
        for resolution in Resolution::ALL {
            for cell_count in [3, 6, 7, 11, 16] {
                let points = jittered_points(cell_count, 77, 4);
                let snapped = snap_to_voxel_centers(&points, cell_count, resolution);
                let n = cell_count as f32;
                for (i, s) in snapped.iter().enumerate() {
                    let i = i as u32;
                    let cell = Vec3::new(
                        (i % cell_count) as f32,
                        ((i / cell_count) % cell_count) as f32,
                        (i / (cell_count * cell_count)) as f32,
                    );
                    let lo = cell / n;
                    let hi = (cell + Vec3::ONE) / n;
                    assert!(
                        s.cmpge(lo).all() && s.cmplt(hi).all(),
                        "point {s} left cell {cell} ({cell_count} cells at {}^3)",
                        resolution.side()
                    );
                }
            }
        }
    }
}
