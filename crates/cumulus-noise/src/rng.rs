//! Stateless hash used to jitter seed points.
//!
//! `cell_hash(cell, stream, axis) -> u32` is a pure function: the same cell,
//! stream and axis always give the same value, so a fixed generator seed
//! reproduces a whole sequence of fields bit for bit.

/// Fold a generator seed and a generation epoch into one 32-bit stream id.
pub(crate) fn stream_seed(seed: u32, epoch: u64) -> u32 {
    let lo = epoch as u32;
    let hi = (epoch >> 32) as u32;
    mix(seed.wrapping_mul(0x2545F491) ^ mix(lo.wrapping_add(0x9E3779B9)) ^ hi.rotate_left(16))
}

/// Hash a lattice cell, a stream id and an axis into a pseudo-random u32.
pub(crate) fn cell_hash(cell: [u32; 3], stream: u32, axis: u32) -> u32 {
    let state = cell[0]
        .wrapping_mul(0x9E3779B9)
        .wrapping_add(cell[1].wrapping_mul(0x517CC1B7))
        .wrapping_add(cell[2].wrapping_mul(0x6C62272E))
        .wrapping_add(axis.wrapping_mul(0x27D4EB2F));
    mix(state ^ mix(stream))
}

/// Convert a hash value to a float in [0, 1).
pub(crate) fn hash_to_float(hash: u32) -> f32 {
    (hash >> 8) as f32 / 16_777_216.0 // 2^24
}

fn mix(mut state: u32) -> u32 {
    state ^= state >> 16;
    state = state.wrapping_mul(0x45D9F3B);
    state ^= state >> 16;
    state = state.wrapping_mul(0x45D9F3B);
    state ^= state >> 16;
    state
}
