use thiserror::Error;

/// Errors that can occur while generating or uploading a noise field.
///
/// Out-of-range settings and degenerate layer weights are resolved by
/// substitution and never show up here.
#[derive(Debug, Error)]
pub enum CloudError {
    #[error("compute resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("unsupported noise resolution {0} (expected 64, 128 or 256)")]
    UnsupportedResolution(u32),

    #[error("buffer of {requested} bytes exceeds device limit of {limit} bytes")]
    BufferTooLarge { requested: u64, limit: u64 },

    #[error("distance buffer has {actual} values, expected {expected}")]
    DistanceCountMismatch { expected: usize, actual: usize },

    #[error("distance readback failed: {0}")]
    ReadbackFailed(String),
}
