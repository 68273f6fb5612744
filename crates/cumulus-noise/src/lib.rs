//! Worley noise field generation.
//!
//! A [`NoiseFieldGenerator`] scatters one jittered seed point per cell of a
//! `cell_count^3` lattice, hands the points to a [`WorleyCompute`] backend for
//! the nearest-point distance pass, and normalizes the result into a
//! [`NoiseField`] of densities in [0, 1].

pub mod compute;
pub mod cpu;
pub mod field;
pub mod generator;
pub mod gpu;
pub mod points;
pub mod texture;

mod buffers;
mod rng;

pub use compute::{DistanceRequest, WorleyCompute};
pub use cpu::CpuWorley;
pub use field::{FieldStats, NoiseField};
pub use generator::NoiseFieldGenerator;
pub use gpu::GpuWorley;
pub use texture::NoiseTexture;
