use serde::{Deserialize, Serialize};

use crate::constants::WORKGROUP_SIZE;
use crate::error::CloudError;

/// Edge length of a cubic noise field. Only the three texture sizes the
/// volume shader is tuned for are representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Resolution {
    #[default]
    R64,
    R128,
    R256,
}

impl Resolution {
    pub const ALL: [Resolution; 3] = [Resolution::R64, Resolution::R128, Resolution::R256];

    /// Voxels along one axis.
    pub fn side(self) -> u32 {
        match self {
            Resolution::R64 => 64,
            Resolution::R128 => 128,
            Resolution::R256 => 256,
        }
    }

    /// Total voxels in the cube (side^3).
    pub fn voxel_count(self) -> usize {
        let side = self.side() as usize;
        side * side * side
    }

    /// Work-groups per axis needed to cover the cube: ceil(side / WORKGROUP_SIZE).
    pub fn workgroups_per_axis(self) -> u32 {
        self.side().div_ceil(WORKGROUP_SIZE)
    }
}

impl TryFrom<u32> for Resolution {
    type Error = CloudError;

    fn try_from(side: u32) -> Result<Self, Self::Error> {
        match side {
            64 => Ok(Resolution::R64),
            128 => Ok(Resolution::R128),
            256 => Ok(Resolution::R256),
            other => Err(CloudError::UnsupportedResolution(other)),
        }
    }
}

impl From<Resolution> for u32 {
    fn from(resolution: Resolution) -> u32 {
        resolution.side()
    }
}

/// Cache identity of a generated noise field.
///
/// `epoch` advances on every generation, so two fields built from identical
/// settings still compare unequal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldKey {
    pub resolution: Resolution,
    pub cell_count: u32,
    pub epoch: u64,
}

/// Opaque handle to a texture owned by the renderer (e.g. a blue-noise
/// dither map). The core never dereferences it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_sides() {
        assert_eq!(Resolution::R64.side(), 64);
        assert_eq!(Resolution::R128.side(), 128);
        assert_eq!(Resolution::R256.side(), 256);
    }

    #[test]
    fn test_voxel_count() {
        assert_eq!(Resolution::R64.voxel_count(), 262_144);
        assert_eq!(Resolution::R256.voxel_count(), 16_777_216);
    }

    #[test]
    fn test_workgroups_per_axis() {
        assert_eq!(Resolution::R64.workgroups_per_axis(), 16);
        assert_eq!(Resolution::R128.workgroups_per_axis(), 32);
        assert_eq!(Resolution::R256.workgroups_per_axis(), 64);
    }

    #[test]
    fn test_try_from_rejects_unsupported() {
        assert_eq!(Resolution::try_from(128).ok(), Some(Resolution::R128));
        assert!(matches!(
            Resolution::try_from(96),
            Err(CloudError::UnsupportedResolution(96))
        ));
        assert!(Resolution::try_from(0).is_err());
    }

    #[test]
    fn test_default_is_smallest() {
        assert_eq!(Resolution::default(), Resolution::R64);
    }
}
