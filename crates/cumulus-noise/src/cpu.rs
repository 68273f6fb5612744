use cumulus_core::math::voxel_center;
use cumulus_core::CloudError;
use glam::{IVec3, Vec3};
use rayon::prelude::*;

use crate::compute::{DistanceRequest, WorleyCompute};

/// Exact CPU reference for the Worley distance pass.
///
/// Points are bucketed by lattice cell and each voxel searches outward in
/// Chebyshev shells around its own cell, stopping once no unvisited cell can
/// hold a closer point. Voxels are processed in parallel with rayon.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuWorley;

impl CpuWorley {
    pub fn new() -> Self {
        Self
    }
}

impl WorleyCompute for CpuWorley {
    fn label(&self) -> &str {
        "cpu"
    }

    fn compute_distances(&mut self, request: &DistanceRequest<'_>) -> Result<Vec<f32>, CloudError> {
        let side = request.resolution.side();
        let buckets = CellBuckets::new(request.points, request.cell_count.max(1));

        let distances = (0..request.resolution.voxel_count())
            .into_par_iter()
            .map(|index| {
                let index = index as u32;
                let x = index % side;
                let y = (index / side) % side;
                let z = index / (side * side);
                let p = Vec3::new(
                    voxel_center(x, side),
                    voxel_center(y, side),
                    voxel_center(z, side),
                );
                buckets.nearest_distance(p)
            })
            .collect();

        Ok(distances)
    }
}

/// Seed points grouped by the lattice cell that contains them.
struct CellBuckets {
    cell_count: i32,
    cell_size: f32,
    cells: Vec<Vec<Vec3>>,
}

impl CellBuckets {
    fn new(points: &[Vec3], cell_count: u32) -> Self {
        let n = cell_count as usize;
        let mut buckets = Self {
            cell_count: cell_count as i32,
            cell_size: 1.0 / cell_count as f32,
            cells: vec![Vec::new(); n * n * n],
        };
        for &p in points {
            let slot = buckets.slot(buckets.cell_of(p));
            buckets.cells[slot].push(p);
        }
        buckets
    }

    fn cell_of(&self, p: Vec3) -> IVec3 {
        (p / self.cell_size)
            .floor()
            .as_ivec3()
            .clamp(IVec3::ZERO, IVec3::splat(self.cell_count - 1))
    }

    fn slot(&self, cell: IVec3) -> usize {
        let n = self.cell_count as usize;
        cell.x as usize + cell.y as usize * n + cell.z as usize * n * n
    }

    fn nearest_distance(&self, p: Vec3) -> f32 {
        let home = self.cell_of(p);
        let mut best = f32::INFINITY;
        let mut radius = 0;

        loop {
            self.visit_shell(home, radius, |q| best = best.min(p.distance(q)));
            // Any unvisited cell is at least `radius` whole cells away from `p`.
            if radius >= self.cell_count - 1 || best <= radius as f32 * self.cell_size {
                return best;
            }
            radius += 1;
        }
    }

    fn visit_shell(&self, home: IVec3, radius: i32, mut visit: impl FnMut(Vec3)) {
        for dz in -radius..=radius {
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    if dx.abs().max(dy.abs()).max(dz.abs()) != radius {
                        continue;
                    }
                    let cell = home + IVec3::new(dx, dy, dz);
                    if cell.cmplt(IVec3::ZERO).any() || cell.cmpge(IVec3::splat(self.cell_count)).any() {
                        continue;
                    }
                    for &q in &self.cells[self.slot(cell)] {
                        visit(q);
                    }
                }
            }
        }
    }
}
