use cumulus_core::constants::{MAX_CELL_COUNT, MIN_CELL_COUNT};
use cumulus_core::{CloudError, FieldKey, Resolution};

use crate::compute::{DistanceRequest, WorleyCompute};
use crate::field::NoiseField;
use crate::points::{jittered_points, snap_to_voxel_centers};

/// Produces Worley noise fields through a compute backend.
///
/// Each call to [`generate`](Self::generate) scatters a fresh point set: the
/// jitter is keyed by the generator seed and an epoch that advances on every
/// call. Two generators with the same seed produce the same sequence of fields.
///
/// Points are snapped to voxel centres by default, which guarantees a density
/// of exactly 1 at every seed voxel. Disable snapping to keep the continuous
/// jitter.
pub struct NoiseFieldGenerator {
    compute: Box<dyn WorleyCompute>,
    seed: u32,
    epoch: u64,
    snap_points: bool,
}

impl NoiseFieldGenerator {
    /// Generator with a seed drawn from OS entropy.
    pub fn new(compute: Box<dyn WorleyCompute>) -> Self {
        Self::with_seed(compute, rand::random())
    }

    pub fn with_seed(compute: Box<dyn WorleyCompute>, seed: u32) -> Self {
        Self {
            compute,
            seed,
            epoch: 0,
            snap_points: true,
        }
    }

    pub fn set_voxel_snapping(&mut self, enabled: bool) {
        self.snap_points = enabled;
    }

    pub fn voxel_snapping(&self) -> bool {
        self.snap_points
    }

    /// Continue a sequence from a previous session: the next generation
    /// uses `epoch`.
    pub fn resume_at_epoch(&mut self, epoch: u64) {
        self.epoch = epoch;
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Epoch the next generation will use.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn backend_label(&self) -> &str {
        self.compute.label()
    }

    /// Generate a `resolution^3` field over a `cell_count^3` point lattice.
    ///
    /// `cell_count` must already be within [1, 16]; callers clamp it.
    pub fn generate(
        &mut self,
        resolution: Resolution,
        cell_count: u32,
    ) -> Result<NoiseField, CloudError> {
        debug_assert!(
            (MIN_CELL_COUNT..=MAX_CELL_COUNT).contains(&cell_count),
            "cell_count {cell_count} outside [{MIN_CELL_COUNT}, {MAX_CELL_COUNT}]"
        );

        let epoch = self.epoch;
        self.epoch += 1;

        let mut points = jittered_points(cell_count, self.seed, epoch);
        if self.snap_points {
            points = snap_to_voxel_centers(&points, cell_count, resolution);
        }
        let request = DistanceRequest {
            points: &points,
            cell_count,
            resolution,
        };

        log::info!(
            "Generating {0}^3 Worley field: {1} points, {2:?} work-groups via {3}",
            resolution.side(),
            points.len(),
            request.workgroups(),
            self.compute.label()
        );

        let distances = self.compute.compute_distances(&request)?;
        let key = FieldKey {
            resolution,
            cell_count,
            epoch,
        };
        NoiseField::from_distances(key, &distances)
    }
}
