//! Single source of truth for shared constants.
//! The work-group size is injected into the Worley kernel preamble so the
//! Rust dispatch math and the WGSL `@workgroup_size` can never disagree.

/// Edge length of a compute work-group (4x4x4 invocations).
pub const WORKGROUP_SIZE: u32 = 4;

/// Smallest cell lattice: a single jittered point for the whole volume.
pub const MIN_CELL_COUNT: u32 = 1;

/// Largest cell lattice (16^3 = 4096 points saturates the point budget).
pub const MAX_CELL_COUNT: u32 = 16;

/// Number of weighted noise layers a cloud volume blends.
pub const NOISE_LAYER_COUNT: usize = 3;

/// Minimum extent of the cloud volume along any axis.
pub const MIN_VOLUME_EXTENT: f32 = 0.01;

/// Bounds on the primary (view ray) march step count.
pub const MIN_CLOUD_STEPS: u32 = 4;
pub const MAX_CLOUD_STEPS: u32 = 128;

/// Bounds on the secondary (toward the sun) march step count.
pub const MIN_LIGHT_STEPS: u32 = 4;
pub const MAX_LIGHT_STEPS: u32 = 16;

/// Default far limit of the view ray march, in world units.
pub const DEFAULT_MAX_DISTANCE: f32 = 100.0;
