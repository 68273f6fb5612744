pub mod constants;
pub mod error;
pub mod math;
pub mod types;

pub use error::CloudError;
pub use types::{FieldKey, Resolution, TextureHandle};
