use cumulus_core::constants::WORKGROUP_SIZE;
use cumulus_core::{CloudError, Resolution};
use glam::Vec3;

/// Input of one Worley distance pass.
#[derive(Debug, Clone, Copy)]
pub struct DistanceRequest<'a> {
    /// Seed points in normalized [0, 1]^3 cube space.
    pub points: &'a [Vec3],
    /// Lattice density the points were scattered over.
    pub cell_count: u32,
    pub resolution: Resolution,
}

impl DistanceRequest<'_> {
    /// Work-group grid covering the volume, `ceil(side / 4)` per axis.
    pub fn workgroups(&self) -> [u32; 3] {
        let n = self.resolution.workgroups_per_axis();
        [n, n, n]
    }

    /// Invocations per work-group along each axis.
    pub fn workgroup_size(&self) -> u32 {
        WORKGROUP_SIZE
    }
}

/// The compute collaborator behind noise generation.
///
/// Implementations return, for every voxel in x-fastest order, the Euclidean
/// distance from the voxel centre `(i + 0.5) / side` to the nearest point.
/// The call blocks until the distances are available. Any transient resources
/// must be released before returning, on success and on failure.
pub trait WorleyCompute {
    /// Short name for logs.
    fn label(&self) -> &str;

    fn compute_distances(&mut self, request: &DistanceRequest<'_>) -> Result<Vec<f32>, CloudError>;
}

impl<T: WorleyCompute + ?Sized> WorleyCompute for Box<T> {
    fn label(&self) -> &str {
        (**self).label()
    }

    fn compute_distances(&mut self, request: &DistanceRequest<'_>) -> Result<Vec<f32>, CloudError> {
        (**self).compute_distances(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workgroups_cover_volume() {
        for resolution in Resolution::ALL {
            let request = DistanceRequest {
                points: &[],
                cell_count: 1,
                resolution,
            };
            let [x, y, z] = request.workgroups();
            assert_eq!(x, y);
            assert_eq!(y, z);
            assert!(x * request.workgroup_size() >= resolution.side());
        }
    }

    #[test]
    fn test_workgroups_for_64() {
        let request = DistanceRequest {
            points: &[],
            cell_count: 4,
            resolution: Resolution::R64,
        };
        assert_eq!(request.workgroups(), [16, 16, 16]);
    }
}
